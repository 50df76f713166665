// Spend circuit model
//
// Spends part of a coin and leaves a new coin for the rest:
// 1. withdrawnBalance + broadcasterFee <= balance, on integers
// 2. coin = Poseidon3(COIN_PREFIX, burnKey, balance)
// 3. remainingCoin = Poseidon3(COIN_PREFIX, burnKey, balance - withdrawnBalance - broadcasterFee)
// 4. commitment = PublicCommitment(configured spend fields)

use alloy_primitives::{Address, U256};
use log::debug;
use serde::Serialize;

use crate::config::{CircuitParams, ProtocolConfig, SpendCommitmentField};
use crate::error::{Classify, ErrorKind, Verdict};
use crate::field::{FieldElement, FieldError};
use crate::utils::commitment::{coin, public_commitment, CommitmentError};

/// Inputs for the Spend circuit
#[derive(Debug, Clone)]
pub struct SpendInputs {
    /// Secret burn key the coin was derived from
    pub burn_key: FieldElement,

    /// Balance held by the coin being spent
    pub balance: U256,

    /// Amount being withdrawn to the receiver
    pub withdrawn_balance: U256,

    pub broadcaster_fee: U256,

    pub receiver: Address,

    pub extra_commitment: U256,
}

/// Public outputs from the Spend circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendOutputs {
    pub commitment: FieldElement,

    /// The coin being spent
    pub coin: FieldElement,

    /// The new coin with the remaining balance
    pub remaining_coin: FieldElement,

    #[serde(with = "crate::utils::serde_decimal")]
    pub remaining_balance: U256,
}

pub struct SpendCircuit {
    inputs: SpendInputs,
    config: ProtocolConfig,
    remaining_balance: U256,
}

impl SpendCircuit {
    pub fn new(inputs: SpendInputs, config: ProtocolConfig, params: &CircuitParams) -> Result<Self, SpendError> {
        let max_amount = params.max_amount();
        let amounts = [
            ("balance", inputs.balance),
            ("withdrawnBalance", inputs.withdrawn_balance),
            ("broadcasterFeeAmount", inputs.broadcaster_fee),
        ];
        for (name, value) in amounts {
            if value > max_amount {
                return Err(SpendError::AmountTooLarge { name, value, bytes: params.amount_bytes });
            }
        }

        FieldElement::try_from_u256(inputs.extra_commitment)
            .map_err(|source| SpendError::ExtraCommitment { source })?;

        if !config.spend_binds(SpendCommitmentField::BroadcasterFee) && !inputs.broadcaster_fee.is_zero() {
            return Err(SpendError::UnboundBroadcasterFee { fee: inputs.broadcaster_fee });
        }

        // never wraps: an overdraft is rejected, not reduced modulo p
        let remaining_balance = inputs
            .withdrawn_balance
            .checked_add(inputs.broadcaster_fee)
            .and_then(|spent| inputs.balance.checked_sub(spent))
            .ok_or(SpendError::InsufficientBalance {
                balance: inputs.balance,
                withdrawn: inputs.withdrawn_balance,
                fee: inputs.broadcaster_fee,
            })?;

        Ok(Self { inputs, config, remaining_balance })
    }

    pub fn remaining_balance(&self) -> U256 {
        self.remaining_balance
    }

    /// Compute the circuit outputs
    pub fn compute_outputs(&self) -> Result<SpendOutputs, SpendError> {
        let inputs = &self.inputs;
        let coin_value = coin(inputs.burn_key, inputs.balance)?;
        let remaining_coin = coin(inputs.burn_key, self.remaining_balance)?;

        let words: Vec<U256> = self
            .config
            .spend_commitment
            .iter()
            .map(|field| match field {
                SpendCommitmentField::Coin => coin_value.to_u256(),
                SpendCommitmentField::Withdrawn => inputs.withdrawn_balance,
                SpendCommitmentField::RemainingCoin => remaining_coin.to_u256(),
                SpendCommitmentField::BroadcasterFee => inputs.broadcaster_fee,
                SpendCommitmentField::Receiver => U256::from_be_slice(inputs.receiver.as_slice()),
                SpendCommitmentField::ExtraCommitment => inputs.extra_commitment,
            })
            .collect();
        let commitment = public_commitment(&words);

        debug!(
            "spend of {} from coin {coin_value} accepted, {} remaining",
            inputs.withdrawn_balance, self.remaining_balance
        );

        Ok(SpendOutputs {
            commitment,
            coin: coin_value,
            remaining_coin,
            remaining_balance: self.remaining_balance,
        })
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::from_result(&self.compute_outputs())
    }
}

/// Construct and evaluate in one step.
pub fn check_spend(
    inputs: SpendInputs,
    config: ProtocolConfig,
    params: &CircuitParams,
) -> Result<SpendOutputs, SpendError> {
    SpendCircuit::new(inputs, config, params)?.compute_outputs()
}

#[derive(Debug, thiserror::Error)]
pub enum SpendError {
    #[error("Insufficient balance: balance={balance}, withdrawn={withdrawn}, fee={fee}")]
    InsufficientBalance { balance: U256, withdrawn: U256, fee: U256 },

    #[error("Amount too large: {name} {value} does not fit in {bytes} bytes")]
    AmountTooLarge { name: &'static str, value: U256, bytes: usize },

    #[error("Extra commitment: {source}")]
    ExtraCommitment { source: FieldError },

    #[error("Broadcaster fee {fee} is not bound by this protocol version")]
    UnboundBroadcasterFee { fee: U256 },

    #[error(transparent)]
    Commitment(#[from] CommitmentError),
}

impl Classify for SpendError {
    fn kind(&self) -> ErrorKind {
        match self {
            SpendError::InsufficientBalance { .. } => ErrorKind::ArithmeticUnderflow,
            SpendError::AmountTooLarge { .. } => ErrorKind::RangeViolation,
            SpendError::ExtraCommitment { source } => source.kind(),
            SpendError::UnboundBroadcasterFee { .. } => ErrorKind::StructuralViolation,
            SpendError::Commitment(e) => e.kind(),
        }
    }
}
