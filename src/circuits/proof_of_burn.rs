// Proof of Burn circuit model
//
// Off-circuit evaluation of every constraint the burn circuit enforces. An
// accepted witness yields the same public outputs the circuit would expose.
//
// Constraints, in evaluation order:
// 1. amount widths, balance limit, fee + reveal <= balance
// 2. header and layer capacities, leaf nibble security
// 3. burn address from the burn key and the bound public values
// 4. block root = keccak(header), state root taken from the header
// 5. account proof for keccak(burnAddress) against the state root
// 6. proven balance equals the claimed balance
// 7. PoW with powMinimumZeroBytes + byteSecurityRelax zero bytes
// 8. nullifier, remaining coin and the public commitment

use alloy_primitives::{Address, B256, U256};
use log::debug;
use serde::Serialize;

use crate::config::{BurnCommitmentField, CircuitParams, ProtocolConfig, PublicInput};
use crate::error::{Classify, ErrorKind, Verdict};
use crate::field::{FieldElement, FieldError};
use crate::utils::burn_address::{burn_address_hash, derive_burn_address, BurnAddressError, BurnParams};
use crate::utils::commitment::{coin, nullifier, public_commitment, CommitmentError};
use crate::utils::header::{state_root_from_rlp, HeaderError};
use crate::utils::keccak::keccak256;
use crate::utils::mpt::{verify_account_proof, AccountProof, MptError};
use crate::utils::poseidon::HashError;
use crate::utils::pow::verify_pow;

/// Private witness of a burn proof
#[derive(Debug, Clone)]
pub struct ProofOfBurnInputs {
    /// Secret burn key from which address and nullifier are derived
    pub burn_key: FieldElement,

    /// Balance of the burn address, as stored in the account leaf
    pub balance: U256,

    /// Receiver, fees, reveal amount and extra commitment
    pub params: BurnParams,

    /// Merkle-Patricia-Trie proof layers, possibly padded
    pub proof: AccountProof,

    /// RLP-encoded block header containing the state root
    pub block_header: Vec<u8>,

    /// Number of address-hash nibbles in the leaf key
    pub num_leaf_address_nibbles: usize,

    /// Trades leaf nibbles for PoW: each relaxed byte lowers the leaf
    /// requirement by two nibbles and raises the PoW by one zero byte
    pub byte_security_relax: usize,
}

/// Public outputs of the burn circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofOfBurnOutputs {
    pub commitment: FieldElement,
    pub block_root: B256,
    pub nullifier: FieldElement,
    pub remaining_coin: FieldElement,
    pub burn_address: Address,
}

pub struct ProofOfBurnCircuit {
    inputs: ProofOfBurnInputs,
    config: ProtocolConfig,
    params: CircuitParams,
}

impl ProofOfBurnCircuit {
    /// Run the checks that need no hashing.
    pub fn new(
        inputs: ProofOfBurnInputs,
        config: ProtocolConfig,
        params: CircuitParams,
    ) -> Result<Self, ProofOfBurnError> {
        let max_amount = params.max_amount();
        let amounts = [
            ("balance", inputs.balance),
            ("proverFeeAmount", inputs.params.prover_fee),
            ("broadcasterFeeAmount", inputs.params.broadcaster_fee),
            ("revealAmount", inputs.params.reveal_amount),
        ];
        for (name, value) in amounts {
            if value > max_amount {
                return Err(ProofOfBurnError::AmountTooWide { name, value, bytes: params.amount_bytes });
            }
        }

        if inputs.balance > params.max_balance {
            return Err(ProofOfBurnError::BalanceTooHigh { value: inputs.balance, max: params.max_balance });
        }

        FieldElement::try_from_u256(inputs.params.extra_commitment)
            .map_err(|source| ProofOfBurnError::ExtraCommitment { source })?;

        for input in [PublicInput::ProverFee, PublicInput::BroadcasterFee] {
            if !config.binds(input) && !inputs.params.value(input).is_zero() {
                return Err(ProofOfBurnError::UnboundParameter { input });
            }
        }

        // fees and reveal are taken out of the burnt balance
        remaining_balance(&inputs)?;

        let relax = inputs.byte_security_relax;
        if params.pow_minimum_zero_bytes + relax > 32 {
            return Err(ProofOfBurnError::SecurityRelaxTooLarge { relax });
        }
        let required = params.min_leaf_address_nibbles.saturating_sub(2 * relax);
        if inputs.num_leaf_address_nibbles < required {
            return Err(ProofOfBurnError::InsufficientNibbles {
                provided: inputs.num_leaf_address_nibbles,
                required,
            });
        }

        if inputs.block_header.len() > params.max_header_bytes() {
            return Err(ProofOfBurnError::HeaderTooLarge {
                size: inputs.block_header.len(),
                max: params.max_header_bytes(),
            });
        }

        Ok(Self { inputs, config, params })
    }

    pub fn inputs(&self) -> &ProofOfBurnInputs {
        &self.inputs
    }

    /// Compute the circuit outputs
    pub fn compute_outputs(&self) -> Result<ProofOfBurnOutputs, ProofOfBurnError> {
        let inputs = &self.inputs;

        let burn_address = derive_burn_address(inputs.burn_key, &inputs.params, &self.config)?;
        let address_hash = burn_address_hash(&burn_address);

        let block_root = keccak256(&inputs.block_header);
        let state_root = state_root_from_rlp(&inputs.block_header)?;

        let account = verify_account_proof(&inputs.proof, &state_root, &address_hash, &self.params)?;
        if account.balance != inputs.balance {
            return Err(ProofOfBurnError::BalanceMismatch { claimed: inputs.balance, proven: account.balance });
        }
        if account.leaf_key_nibbles != inputs.num_leaf_address_nibbles {
            return Err(ProofOfBurnError::NibbleCountMismatch {
                declared: inputs.num_leaf_address_nibbles,
                leaf: account.leaf_key_nibbles,
            });
        }

        let pow_zero_bytes = self.params.pow_minimum_zero_bytes + inputs.byte_security_relax;
        if !verify_pow(inputs.burn_key, &inputs.params, &self.config, pow_zero_bytes) {
            return Err(ProofOfBurnError::PowVerificationFailed { required_zeros: pow_zero_bytes });
        }

        let nullifier = nullifier(inputs.burn_key)?;
        let remaining_coin = coin(inputs.burn_key, remaining_balance(inputs)?)?;

        let words: Vec<U256> = self
            .config
            .burn_commitment
            .iter()
            .map(|field| match field {
                BurnCommitmentField::BlockRoot => U256::from_be_bytes(block_root),
                BurnCommitmentField::Nullifier => nullifier.to_u256(),
                BurnCommitmentField::RemainingCoin => remaining_coin.to_u256(),
                BurnCommitmentField::ProverFee => inputs.params.prover_fee,
                BurnCommitmentField::BroadcasterFee => inputs.params.broadcaster_fee,
                BurnCommitmentField::RevealAmount => inputs.params.reveal_amount,
                BurnCommitmentField::Receiver => inputs.params.value(PublicInput::Receiver),
                BurnCommitmentField::ExtraCommitment => inputs.params.extra_commitment,
            })
            .collect();
        let commitment = public_commitment(&words);

        debug!("burn proof for {burn_address} accepted, commitment {commitment}");

        Ok(ProofOfBurnOutputs {
            commitment,
            block_root: B256::from(block_root),
            nullifier,
            remaining_coin,
            burn_address,
        })
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::from_result(&self.compute_outputs())
    }
}

/// Construct and evaluate in one step.
pub fn check_burn(
    inputs: ProofOfBurnInputs,
    config: ProtocolConfig,
    params: CircuitParams,
) -> Result<ProofOfBurnOutputs, ProofOfBurnError> {
    ProofOfBurnCircuit::new(inputs, config, params)?.compute_outputs()
}

/// balance - proverFee - broadcasterFee - revealAmount, on integers
fn remaining_balance(inputs: &ProofOfBurnInputs) -> Result<U256, ProofOfBurnError> {
    let p = &inputs.params;
    let spent = p
        .prover_fee
        .checked_add(p.broadcaster_fee)
        .and_then(|s| s.checked_add(p.reveal_amount));
    spent
        .and_then(|spent| inputs.balance.checked_sub(spent))
        .ok_or(ProofOfBurnError::Overspend {
            balance: inputs.balance,
            prover_fee: p.prover_fee,
            broadcaster_fee: p.broadcaster_fee,
            reveal: p.reveal_amount,
        })
}

#[derive(Debug, thiserror::Error)]
pub enum ProofOfBurnError {
    #[error("{name} {value} does not fit in {bytes} bytes")]
    AmountTooWide { name: &'static str, value: U256, bytes: usize },

    #[error("Balance too high: {value}, max: {max}")]
    BalanceTooHigh { value: U256, max: U256 },

    #[error("Extra commitment: {source}")]
    ExtraCommitment { source: FieldError },

    #[error("{input:?} must be zero, it is not bound by this protocol version")]
    UnboundParameter { input: PublicInput },

    #[error(
        "Fees and reveal exceed balance {balance}: prover fee {prover_fee}, broadcaster fee {broadcaster_fee}, reveal {reveal}"
    )]
    Overspend { balance: U256, prover_fee: U256, broadcaster_fee: U256, reveal: U256 },

    #[error("Byte security relax {relax} pushes the PoW beyond 32 bytes")]
    SecurityRelaxTooLarge { relax: usize },

    #[error("Insufficient nibbles: provided {provided}, required {required}")]
    InsufficientNibbles { provided: usize, required: usize },

    #[error("Declared {declared} leaf address nibbles, leaf key has {leaf}")]
    NibbleCountMismatch { declared: usize, leaf: usize },

    #[error("Header too large: {size} bytes, max: {max}")]
    HeaderTooLarge { size: usize, max: usize },

    #[error("Invalid block header: {0}")]
    Header(#[from] HeaderError),

    #[error("Burn address: {0}")]
    Address(#[from] BurnAddressError),

    #[error("MPT verification failed: {0}")]
    Mpt(#[from] MptError),

    #[error("Proven balance {proven} differs from claimed balance {claimed}")]
    BalanceMismatch { claimed: U256, proven: U256 },

    #[error("PoW verification failed: requires {required_zeros} zero bytes")]
    PowVerificationFailed { required_zeros: usize },

    #[error(transparent)]
    Commitment(#[from] CommitmentError),

    #[error(transparent)]
    Hash(#[from] HashError),
}

impl Classify for ProofOfBurnError {
    fn kind(&self) -> ErrorKind {
        use ProofOfBurnError::*;
        match self {
            AmountTooWide { .. }
            | BalanceTooHigh { .. }
            | SecurityRelaxTooLarge { .. }
            | HeaderTooLarge { .. }
            | PowVerificationFailed { .. } => ErrorKind::RangeViolation,
            ExtraCommitment { source } => source.kind(),
            Overspend { .. } => ErrorKind::ArithmeticUnderflow,
            UnboundParameter { .. }
            | InsufficientNibbles { .. }
            | NibbleCountMismatch { .. }
            | BalanceMismatch { .. } => ErrorKind::StructuralViolation,
            Header(e) => e.kind(),
            Address(e) => e.kind(),
            Mpt(e) => e.kind(),
            Commitment(e) => e.kind(),
            Hash(e) => e.kind(),
        }
    }
}
