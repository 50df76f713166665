//! Circuit input files.
//!
//! Witnesses are exchanged with the proving toolchain as JSON: integers that
//! may exceed 53 bits are decimal strings, byte vectors are arrays of small
//! integers zero-padded to the circuit's capacity, and every padded vector
//! has a sibling `*Len` (or `numLayers`) giving its true length.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::circuits::{ProofOfBurnInputs, SpendInputs};
use crate::config::CircuitParams;
use crate::constants::circuit_params::PADDING_LAYER_LEN;
use crate::error::{Classify, ErrorKind};
use crate::field::FieldElement;
use crate::utils::burn_address::BurnParams;
use crate::utils::mpt::AccountProof;
use crate::utils::padded::{Padded, PaddedError};
use crate::utils::serde_decimal;

/// Input of the proof-of-burn circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnWitness {
    pub burn_key: FieldElement,
    #[serde(with = "serde_decimal")]
    pub receiver_address: U256,
    #[serde(with = "serde_decimal")]
    pub prover_fee_amount: U256,
    #[serde(with = "serde_decimal")]
    pub broadcaster_fee_amount: U256,
    #[serde(with = "serde_decimal")]
    pub reveal_amount: U256,
    #[serde(with = "serde_decimal")]
    pub burn_extra_commitment: U256,
    #[serde(with = "serde_decimal")]
    pub balance: U256,
    pub num_layers: usize,
    pub layers: Vec<Vec<u8>>,
    pub layer_lens: Vec<usize>,
    pub block_header: Vec<u8>,
    pub block_header_len: usize,
    pub num_leaf_address_nibbles: usize,
    pub byte_security_relax: usize,
}

impl BurnWitness {
    /// Pad the proof and header to the circuit's capacities.
    pub fn from_inputs(inputs: &ProofOfBurnInputs, params: &CircuitParams) -> Result<Self, WitnessError> {
        let proof = &inputs.proof;
        if proof.num_layers > params.max_num_layers {
            return Err(WitnessError::TooManyLayers { num_layers: proof.num_layers, max: params.max_num_layers });
        }

        let capacity = params.max_layer_bytes();
        let padding_len = PADDING_LAYER_LEN.min(capacity);
        let mut layers = Vec::with_capacity(params.max_num_layers);
        let mut layer_lens = Vec::with_capacity(params.max_num_layers);
        for slot in 0..params.max_num_layers {
            match proof.in_range().get(slot) {
                Some(layer) => {
                    let (data, len) = Padded::new(layer, capacity)?.into_parts();
                    layers.push(data);
                    layer_lens.push(len);
                }
                None => {
                    layers.push(vec![0u8; capacity]);
                    layer_lens.push(padding_len);
                }
            }
        }

        let (block_header, block_header_len) =
            Padded::new(&inputs.block_header, params.max_header_bytes())?.into_parts();

        Ok(Self {
            burn_key: inputs.burn_key,
            receiver_address: U256::from_be_slice(inputs.params.receiver.as_slice()),
            prover_fee_amount: inputs.params.prover_fee,
            broadcaster_fee_amount: inputs.params.broadcaster_fee,
            reveal_amount: inputs.params.reveal_amount,
            burn_extra_commitment: inputs.params.extra_commitment,
            balance: inputs.balance,
            num_layers: proof.num_layers,
            layers,
            layer_lens,
            block_header,
            block_header_len,
            num_leaf_address_nibbles: inputs.num_leaf_address_nibbles,
            byte_security_relax: inputs.byte_security_relax,
        })
    }

    /// Strip the padding again. Layers past `numLayers` are kept, trimmed to
    /// their declared length, so the verifier sees exactly what the circuit sees.
    pub fn to_inputs(&self) -> Result<ProofOfBurnInputs, WitnessError> {
        if self.layers.len() != self.layer_lens.len() {
            return Err(WitnessError::LengthMismatch { layers: self.layers.len(), lens: self.layer_lens.len() });
        }
        if self.num_layers > self.layers.len() {
            return Err(WitnessError::TooManyLayers { num_layers: self.num_layers, max: self.layers.len() });
        }

        let layers = self
            .layers
            .iter()
            .zip(&self.layer_lens)
            .map(|(data, &len)| Ok(Padded::from_parts(data.clone(), len)?.as_slice().to_vec()))
            .collect::<Result<Vec<_>, WitnessError>>()?;
        let header = Padded::from_parts(self.block_header.clone(), self.block_header_len)?;

        let params = BurnParams {
            receiver: address_from_u256(self.receiver_address)?,
            prover_fee: self.prover_fee_amount,
            broadcaster_fee: self.broadcaster_fee_amount,
            reveal_amount: self.reveal_amount,
            extra_commitment: self.burn_extra_commitment,
        };

        Ok(ProofOfBurnInputs {
            burn_key: self.burn_key,
            balance: self.balance,
            params,
            proof: AccountProof { layers, num_layers: self.num_layers },
            block_header: header.as_slice().to_vec(),
            num_leaf_address_nibbles: self.num_leaf_address_nibbles,
            byte_security_relax: self.byte_security_relax,
        })
    }

    pub fn to_json(&self) -> Result<String, WitnessError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, WitnessError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Input of the spend circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendWitness {
    pub burn_key: FieldElement,
    #[serde(with = "serde_decimal")]
    pub balance: U256,
    #[serde(with = "serde_decimal")]
    pub withdrawn_balance: U256,
    #[serde(with = "serde_decimal")]
    pub broadcaster_fee_amount: U256,
    #[serde(with = "serde_decimal")]
    pub receiver_address: U256,
    #[serde(with = "serde_decimal", default)]
    pub extra_commitment: U256,
}

impl SpendWitness {
    pub fn from_inputs(inputs: &SpendInputs) -> Self {
        Self {
            burn_key: inputs.burn_key,
            balance: inputs.balance,
            withdrawn_balance: inputs.withdrawn_balance,
            broadcaster_fee_amount: inputs.broadcaster_fee,
            receiver_address: U256::from_be_slice(inputs.receiver.as_slice()),
            extra_commitment: inputs.extra_commitment,
        }
    }

    pub fn to_inputs(&self) -> Result<SpendInputs, WitnessError> {
        Ok(SpendInputs {
            burn_key: self.burn_key,
            balance: self.balance,
            withdrawn_balance: self.withdrawn_balance,
            broadcaster_fee: self.broadcaster_fee_amount,
            receiver: address_from_u256(self.receiver_address)?,
            extra_commitment: self.extra_commitment,
        })
    }

    pub fn to_json(&self) -> Result<String, WitnessError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, WitnessError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn address_from_u256(value: U256) -> Result<Address, WitnessError> {
    if value.bit_len() > 160 {
        return Err(WitnessError::AddressTooWide { value });
    }
    let word = value.to_be_bytes::<32>();
    Ok(Address::from_slice(&word[12..]))
}

#[derive(Debug, thiserror::Error)]
pub enum WitnessError {
    #[error(transparent)]
    Padded(#[from] PaddedError),

    #[error("{num_layers} layers exceed the {max} available slots")]
    TooManyLayers { num_layers: usize, max: usize },

    #[error("{layers} layers but {lens} layer lengths")]
    LengthMismatch { layers: usize, lens: usize },

    #[error("receiver {value} does not fit in 20 bytes")]
    AddressTooWide { value: U256 },

    #[error("witness json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Classify for WitnessError {
    fn kind(&self) -> ErrorKind {
        match self {
            WitnessError::Padded(e) => e.kind(),
            WitnessError::TooManyLayers { .. } | WitnessError::AddressTooWide { .. } => ErrorKind::RangeViolation,
            WitnessError::LengthMismatch { .. } => ErrorKind::StructuralViolation,
            WitnessError::Json(_) => ErrorKind::MalformedEncoding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn sample_inputs() -> ProofOfBurnInputs {
        ProofOfBurnInputs {
            burn_key: FieldElement::from(47109u64),
            balance: U256::from(10).pow(U256::from(18)),
            params: BurnParams::new(address!("90F8bf6A479f320ead074411a4B0e7944Ea8c9C1"))
                .with_prover_fee(U256::from(123))
                .with_reveal_amount(U256::from(234)),
            proof: AccountProof::new(vec![vec![0xc1, 0x80], vec![0xc2, 0x01, 0x02]]),
            block_header: vec![0xc0],
            num_leaf_address_nibbles: 62,
            byte_security_relax: 0,
        }
    }

    #[test]
    fn test_burn_witness_padding() {
        let params = CircuitParams::default();
        let witness = BurnWitness::from_inputs(&sample_inputs(), &params).unwrap();

        assert_eq!(witness.layers.len(), params.max_num_layers);
        assert!(witness.layers.iter().all(|l| l.len() == params.max_layer_bytes()));
        assert_eq!(&witness.layer_lens[..3], &[2, 3, PADDING_LAYER_LEN]);
        assert_eq!(witness.num_layers, 2);
        assert_eq!(witness.block_header.len(), params.max_header_bytes());
        assert_eq!(witness.block_header_len, 1);
    }

    #[test]
    fn test_burn_witness_json_shape() {
        let witness = BurnWitness::from_inputs(&sample_inputs(), &CircuitParams::default()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&witness.to_json().unwrap()).unwrap();

        assert_eq!(json["balance"], "1000000000000000000");
        assert_eq!(json["burnKey"], "47109");
        assert_eq!(json["proverFeeAmount"], "123");
        assert_eq!(json["numLayers"], 2);
        assert_eq!(json["layers"][0][0], 0xc1);
        assert_eq!(
            json["receiverAddress"],
            U256::from_str_radix("90F8bf6A479f320ead074411a4B0e7944Ea8c9C1", 16).unwrap().to_string()
        );
    }

    #[test]
    fn test_burn_witness_back_to_inputs() {
        let inputs = sample_inputs();
        let witness = BurnWitness::from_inputs(&inputs, &CircuitParams::default()).unwrap();
        let parsed = BurnWitness::from_json(&witness.to_json().unwrap()).unwrap();
        let back = parsed.to_inputs().unwrap();

        assert_eq!(back.proof.num_layers, 2);
        assert_eq!(back.proof.in_range(), inputs.proof.in_range());
        assert_eq!(back.block_header, inputs.block_header);
        assert_eq!(back.params, inputs.params);
    }

    #[test]
    fn test_oversized_layer_rejected() {
        let mut inputs = sample_inputs();
        inputs.proof = AccountProof::new(vec![vec![0u8; 545]]);
        let err = BurnWitness::from_inputs(&inputs, &CircuitParams::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeViolation);
    }

    #[test]
    fn test_inconsistent_witness_rejected() {
        let mut witness = BurnWitness::from_inputs(&sample_inputs(), &CircuitParams::default()).unwrap();
        witness.layer_lens.pop();
        assert!(matches!(witness.to_inputs(), Err(WitnessError::LengthMismatch { .. })));

        let mut witness = BurnWitness::from_inputs(&sample_inputs(), &CircuitParams::default()).unwrap();
        witness.receiver_address = U256::from(1) << 160usize;
        assert_eq!(witness.to_inputs().unwrap_err().kind(), ErrorKind::RangeViolation);
    }

    #[test]
    fn test_spend_witness() {
        let inputs = SpendInputs {
            burn_key: FieldElement::from(5u64),
            balance: U256::from(1000),
            withdrawn_balance: U256::from(321),
            broadcaster_fee: U256::from(12),
            receiver: address!("90F8bf6A479f320ead074411a4B0e7944Ea8c9C1"),
            extra_commitment: U256::ZERO,
        };
        let witness = SpendWitness::from_inputs(&inputs);
        let json = witness.to_json().unwrap();
        assert!(json.contains("\"withdrawnBalance\": \"321\""));

        let back = SpendWitness::from_json(&json).unwrap().to_inputs().unwrap();
        assert_eq!(back.receiver, inputs.receiver);
        assert_eq!(back.broadcaster_fee, U256::from(12));
    }
}
