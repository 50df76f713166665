//! Protocol and circuit configuration.
//!
//! The burn protocol changed shape across revisions: which public values are
//! bound into the burn address, in which order, how the Poseidon digest is
//! turned into 20 bytes, and which values the public commitments cover.
//! [`ProtocolConfig`] captures one revision as data; [`ProtocolVersion`]
//! names the known presets.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::circuit_params::*;

/// Public burn parameters that can be bound into an address, a PoW tag or
/// a commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PublicInput {
    Receiver,
    ProverFee,
    BroadcasterFee,
    RevealAmount,
    ExtraCommitment,
}

impl PublicInput {
    /// Width of the value inside a proof-of-work preimage.
    pub fn pow_width(&self) -> usize {
        match self {
            PublicInput::Receiver => 20,
            _ => 32,
        }
    }
}

/// One Poseidon input of the burn-address hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AddressInput {
    Prefix,
    BurnKey,
    Public(PublicInput),
}

/// Which 20 bytes of the 32-byte digest form the address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AddressBytes {
    Leading,
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BurnCommitmentField {
    BlockRoot,
    Nullifier,
    RemainingCoin,
    ProverFee,
    BroadcasterFee,
    RevealAmount,
    Receiver,
    ExtraCommitment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpendCommitmentField {
    Coin,
    Withdrawn,
    RemainingCoin,
    BroadcasterFee,
    Receiver,
    ExtraCommitment,
}

/// Known protocol revisions, named by the arity of their address hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Poseidon2(burnKey, receiver), trailing 20 bytes
    V1,
    /// Poseidon3(burnKey, receiver, fee), leading 20 bytes
    V2,
    /// Poseidon4(prefix, burnKey, reveal, extra), keccak rehash
    V3,
    /// Poseidon6(prefix, burnKey, receiver, proverFee, broadcasterFee, reveal)
    #[default]
    V4,
}

impl ProtocolVersion {
    pub const ALL: [ProtocolVersion; 4] = [
        ProtocolVersion::V1,
        ProtocolVersion::V2,
        ProtocolVersion::V3,
        ProtocolVersion::V4,
    ];

    pub fn config(self) -> ProtocolConfig {
        use AddressInput::{BurnKey, Prefix, Public};
        use BurnCommitmentField as B;
        use PublicInput::*;
        use SpendCommitmentField as S;

        let spend_with_receiver = vec![
            S::Coin,
            S::Withdrawn,
            S::RemainingCoin,
            S::BroadcasterFee,
            S::Receiver,
        ];
        let burn_single_fee = vec![
            B::BlockRoot,
            B::Nullifier,
            B::RemainingCoin,
            B::ProverFee,
            B::RevealAmount,
            B::Receiver,
        ];

        match self {
            ProtocolVersion::V1 => ProtocolConfig {
                version: self,
                address_inputs: vec![BurnKey, Public(Receiver)],
                keccak_rehash: false,
                address_bytes: AddressBytes::Trailing,
                pow_inputs: vec![Receiver, ProverFee],
                burn_commitment: burn_single_fee,
                spend_commitment: spend_with_receiver,
            },
            ProtocolVersion::V2 => ProtocolConfig {
                version: self,
                address_inputs: vec![BurnKey, Public(Receiver), Public(ProverFee)],
                keccak_rehash: false,
                address_bytes: AddressBytes::Leading,
                pow_inputs: vec![Receiver, ProverFee],
                burn_commitment: burn_single_fee,
                spend_commitment: spend_with_receiver,
            },
            ProtocolVersion::V3 => ProtocolConfig {
                version: self,
                address_inputs: vec![
                    Prefix,
                    BurnKey,
                    Public(RevealAmount),
                    Public(ExtraCommitment),
                ],
                keccak_rehash: true,
                address_bytes: AddressBytes::Leading,
                pow_inputs: vec![RevealAmount, ExtraCommitment],
                burn_commitment: vec![
                    B::BlockRoot,
                    B::Nullifier,
                    B::RemainingCoin,
                    B::RevealAmount,
                    B::ExtraCommitment,
                ],
                spend_commitment: vec![
                    S::Coin,
                    S::Withdrawn,
                    S::RemainingCoin,
                    S::ExtraCommitment,
                ],
            },
            ProtocolVersion::V4 => ProtocolConfig {
                version: self,
                address_inputs: vec![
                    Prefix,
                    BurnKey,
                    Public(Receiver),
                    Public(ProverFee),
                    Public(BroadcasterFee),
                    Public(RevealAmount),
                ],
                keccak_rehash: false,
                address_bytes: AddressBytes::Leading,
                pow_inputs: vec![RevealAmount, ExtraCommitment],
                burn_commitment: vec![
                    B::BlockRoot,
                    B::Nullifier,
                    B::RemainingCoin,
                    B::ProverFee,
                    B::BroadcasterFee,
                    B::RevealAmount,
                    B::Receiver,
                    B::ExtraCommitment,
                ],
                spend_commitment: spend_with_receiver,
            },
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolVersion::V1 => "v1",
            ProtocolVersion::V2 => "v2",
            ProtocolVersion::V3 => "v3",
            ProtocolVersion::V4 => "v4",
        };
        f.write_str(name)
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(ProtocolVersion::V1),
            "v2" | "2" => Ok(ProtocolVersion::V2),
            "v3" | "3" => Ok(ProtocolVersion::V3),
            "v4" | "4" => Ok(ProtocolVersion::V4),
            other => Err(format!("unknown protocol version {other:?}, expected v1..v4")),
        }
    }
}

/// One protocol revision expressed as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolConfig {
    pub version: ProtocolVersion,
    /// Ordered Poseidon inputs of the burn-address hash
    pub address_inputs: Vec<AddressInput>,
    /// Hash the Poseidon digest with keccak before truncating
    pub keccak_rehash: bool,
    pub address_bytes: AddressBytes,
    /// Values following the burn key in the proof-of-work preimage
    pub pow_inputs: Vec<PublicInput>,
    pub burn_commitment: Vec<BurnCommitmentField>,
    pub spend_commitment: Vec<SpendCommitmentField>,
}

impl ProtocolConfig {
    pub fn address_arity(&self) -> usize {
        self.address_inputs.len()
    }

    /// Whether `input` influences the burn proof's public commitment,
    /// directly or through the burn address.
    pub fn binds(&self, input: PublicInput) -> bool {
        let in_address = self.address_inputs.contains(&AddressInput::Public(input));
        let in_pow = self.pow_inputs.contains(&input);
        let in_commitment = self.burn_commitment.iter().any(|field| {
            matches!(
                (field, input),
                (BurnCommitmentField::Receiver, PublicInput::Receiver)
                    | (BurnCommitmentField::ProverFee, PublicInput::ProverFee)
                    | (BurnCommitmentField::BroadcasterFee, PublicInput::BroadcasterFee)
                    | (BurnCommitmentField::RevealAmount, PublicInput::RevealAmount)
                    | (BurnCommitmentField::ExtraCommitment, PublicInput::ExtraCommitment)
            )
        });
        in_address || in_pow || in_commitment
    }

    pub fn spend_binds(&self, field: SpendCommitmentField) -> bool {
        self.spend_commitment.contains(&field)
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolVersion::default().config()
    }
}

/// Size and security limits of the circuits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircuitParams {
    pub max_num_layers: usize,
    pub max_node_blocks: usize,
    pub max_header_blocks: usize,
    pub min_leaf_address_nibbles: usize,
    pub amount_bytes: usize,
    pub pow_minimum_zero_bytes: usize,
    #[serde(with = "crate::utils::serde_decimal")]
    pub max_balance: U256,
}

impl Default for CircuitParams {
    fn default() -> Self {
        Self {
            max_num_layers: MAX_NUM_LAYERS,
            max_node_blocks: MAX_NODE_BLOCKS,
            max_header_blocks: MAX_HEADER_BLOCKS,
            min_leaf_address_nibbles: MIN_LEAF_ADDRESS_NIBBLES,
            amount_bytes: AMOUNT_BYTES,
            pow_minimum_zero_bytes: POW_MINIMUM_ZERO_BYTES,
            max_balance: U256::from(MAX_BALANCE),
        }
    }
}

impl CircuitParams {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let params: CircuitParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.amount_bytes == 0 || self.amount_bytes > 31 {
            return Err(ConfigError::Invalid {
                reason: format!("amountBytes must be in 1..=31, got {}", self.amount_bytes),
            });
        }
        if self.max_num_layers == 0 {
            return Err(ConfigError::Invalid {
                reason: "maxNumLayers must be positive".to_string(),
            });
        }
        if self.min_leaf_address_nibbles > 64 {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "minLeafAddressNibbles cannot exceed 64, got {}",
                    self.min_leaf_address_nibbles
                ),
            });
        }
        if self.pow_minimum_zero_bytes > 32 {
            return Err(ConfigError::Invalid {
                reason: "powMinimumZeroBytes cannot exceed 32".to_string(),
            });
        }
        if self.max_balance > self.max_amount() {
            return Err(ConfigError::Invalid {
                reason: "maxBalance does not fit in amountBytes".to_string(),
            });
        }
        Ok(())
    }

    pub fn max_layer_bytes(&self) -> usize {
        self.max_node_blocks * KECCAK_BLOCK_BYTES
    }

    pub fn max_header_bytes(&self) -> usize {
        self.max_header_blocks * KECCAK_BLOCK_BYTES
    }

    /// Largest integer representable in `amount_bytes` bytes
    pub fn max_amount(&self) -> U256 {
        (U256::from(1) << (8 * self.amount_bytes)) - U256::from(1)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid circuit parameters: {reason}")]
    Invalid { reason: String },

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}
