// Burn address computation
//
// The burn address is 20 bytes of a Poseidon digest over the burn key and the
// public parameters the protocol revision binds, e.g. for the latest one:
//   Poseidon6(prefix, burnKey, receiver, proverFee, broadcasterFee, revealAmount)[..20]

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::config::{AddressBytes, AddressInput, ProtocolConfig, PublicInput};
use crate::constants::poseidon_burn_address_prefix;
use crate::error::{Classify, ErrorKind};
use crate::field::{FieldElement, FieldError};
use crate::utils::keccak::keccak256;
use crate::utils::poseidon::{poseidon_hash, HashError};
use crate::utils::serde_decimal;

/// Public values a burn is bound to. Which of them matter depends on the
/// protocol revision; unused ones are expected to be zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BurnParams {
    pub receiver: Address,
    #[serde(with = "serde_decimal")]
    pub prover_fee: U256,
    #[serde(with = "serde_decimal")]
    pub broadcaster_fee: U256,
    #[serde(with = "serde_decimal")]
    pub reveal_amount: U256,
    #[serde(with = "serde_decimal")]
    pub extra_commitment: U256,
}

impl BurnParams {
    pub fn new(receiver: Address) -> Self {
        Self { receiver, ..Self::default() }
    }

    pub fn with_prover_fee(mut self, fee: U256) -> Self {
        self.prover_fee = fee;
        self
    }

    pub fn with_broadcaster_fee(mut self, fee: U256) -> Self {
        self.broadcaster_fee = fee;
        self
    }

    pub fn with_reveal_amount(mut self, amount: U256) -> Self {
        self.reveal_amount = amount;
        self
    }

    pub fn with_extra_commitment(mut self, extra: U256) -> Self {
        self.extra_commitment = extra;
        self
    }

    /// Integer value of a public input. The receiver is read as a 160-bit
    /// big-endian integer.
    pub fn value(&self, input: PublicInput) -> U256 {
        match input {
            PublicInput::Receiver => U256::from_be_slice(self.receiver.as_slice()),
            PublicInput::ProverFee => self.prover_fee,
            PublicInput::BroadcasterFee => self.broadcaster_fee,
            PublicInput::RevealAmount => self.reveal_amount,
            PublicInput::ExtraCommitment => self.extra_commitment,
        }
    }

    /// Field value of a public input, rejected when not below the modulus.
    pub fn field(&self, input: PublicInput) -> Result<FieldElement, BurnAddressError> {
        FieldElement::try_from_u256(self.value(input))
            .map_err(|source| BurnAddressError::Field { input, source })
    }
}

/// Ordered Poseidon inputs of the burn-address hash.
pub fn address_preimage(
    burn_key: FieldElement,
    params: &BurnParams,
    config: &ProtocolConfig,
) -> Result<Vec<FieldElement>, BurnAddressError> {
    config
        .address_inputs
        .iter()
        .map(|input| match input {
            AddressInput::Prefix => Ok(poseidon_burn_address_prefix()),
            AddressInput::BurnKey => Ok(burn_key),
            AddressInput::Public(public) => params.field(*public),
        })
        .collect()
}

/// Derive the address the user burns funds to.
pub fn derive_burn_address(
    burn_key: FieldElement,
    params: &BurnParams,
    config: &ProtocolConfig,
) -> Result<Address, BurnAddressError> {
    let inputs = address_preimage(burn_key, params, config)?;
    let mut digest = poseidon_hash(&inputs)?.to_be_bytes();
    if config.keccak_rehash {
        digest = keccak256(&digest);
    }

    let bytes = match config.address_bytes {
        AddressBytes::Leading => &digest[..20],
        AddressBytes::Trailing => &digest[12..],
    };
    Ok(Address::from_slice(bytes))
}

/// keccak256 of the address, the account's key in the state trie
pub fn burn_address_hash(address: &Address) -> [u8; 32] {
    keccak256(address.as_slice())
}

#[derive(Debug, thiserror::Error)]
pub enum BurnAddressError {
    #[error("{input:?} is out of field range: {source}")]
    Field {
        input: PublicInput,
        #[source]
        source: FieldError,
    },

    #[error(transparent)]
    Hash(#[from] HashError),
}

impl Classify for BurnAddressError {
    fn kind(&self) -> ErrorKind {
        match self {
            BurnAddressError::Field { source, .. } => source.kind(),
            BurnAddressError::Hash(e) => e.kind(),
        }
    }
}
