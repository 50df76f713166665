// Merkle-Patricia-Trie account proof verification
//
// Walks the proof layers from the state root towards the account leaf:
// every in-range layer must hash to the reference held by its parent,
// branch nodes consume one nibble of keccak(address), extension and leaf
// nodes consume their hex-prefix path, and the walk must end in a leaf that
// consumes the final nibble. Layers at or beyond `num_layers` are padding
// and are never inspected.

use alloy_primitives::{B256, U256};
use log::{debug, trace};

use crate::config::CircuitParams;
use crate::constants::circuit_params::EMPTY_STORAGE_ROOT;
use crate::error::{Classify, ErrorKind};
use crate::utils::keccak::keccak256;
use crate::utils::nibbles::{bytes_to_nibbles, decode_path, NibbleError, PathKind};
use crate::utils::rlp::{decode_list, fixed_32, Account, RlpError};

const ADDRESS_HASH_NIBBLES: usize = 64;

/// Proof layers as handed to the circuit: possibly padded past `num_layers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountProof {
    pub layers: Vec<Vec<u8>>,
    pub num_layers: usize,
}

impl AccountProof {
    /// A proof whose every layer is meaningful
    pub fn new(layers: Vec<Vec<u8>>) -> Self {
        let num_layers = layers.len();
        Self { layers, num_layers }
    }

    /// Append empty padding layers up to `max_layers` slots.
    pub fn padded_to(mut self, max_layers: usize) -> Self {
        if self.layers.len() < max_layers {
            self.layers.resize(max_layers, Vec::new());
        }
        self
    }

    /// The layers that participate in verification
    pub fn in_range(&self) -> &[Vec<u8>] {
        &self.layers[..self.num_layers.min(self.layers.len())]
    }
}

/// What an accepted proof tells about the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedAccount {
    pub balance: U256,
    /// Address-hash nibbles consumed by the whole walk (always 64)
    pub consumed_nibbles: usize,
    /// Nibbles carried by the leaf's own key
    pub leaf_key_nibbles: usize,
}

/// Verify that `proof` shows an empty externally-owned account under
/// `address_hash` in the trie committed to by `state_root`.
pub fn verify_account_proof(
    proof: &AccountProof,
    state_root: &[u8; 32],
    address_hash: &[u8; 32],
    params: &CircuitParams,
) -> Result<VerifiedAccount, MptError> {
    let num_layers = proof.num_layers;
    if num_layers == 0 {
        return Err(MptError::EmptyProof);
    }
    if num_layers > params.max_num_layers || num_layers > proof.layers.len() {
        return Err(MptError::LayerCount {
            num_layers,
            available: proof.layers.len(),
            max: params.max_num_layers,
        });
    }

    let path = bytes_to_nibbles(address_hash);
    let mut expected = *state_root;
    let mut consumed = 0usize;

    for (layer, node) in proof.in_range().iter().enumerate() {
        if node.len() > params.max_layer_bytes() {
            return Err(MptError::LayerTooLarge {
                layer,
                len: node.len(),
                max: params.max_layer_bytes(),
            });
        }

        let computed = keccak256(node);
        if computed != expected {
            return Err(MptError::HashMismatch {
                layer,
                expected: B256::from(expected),
                computed: B256::from(computed),
            });
        }

        let items = decode_list(node).map_err(|source| MptError::Rlp { layer, source })?;
        match items.len() {
            17 => {
                let nibble = *path.get(consumed).ok_or(MptError::PathExhausted { layer })?;
                let child = items[nibble as usize]
                    .as_bytes()
                    .map_err(|source| MptError::Rlp { layer, source })?;
                expected = child_hash(child, layer)?;
                consumed += 1;
                trace!("layer {layer}: branch, took child {nibble:x}");
            }
            2 => {
                let key = items[0].as_bytes().map_err(|source| MptError::Rlp { layer, source })?;
                let (kind, key_path) = decode_path(key).map_err(|source| MptError::Key { layer, source })?;

                if !path[consumed..].starts_with(&key_path) {
                    return Err(MptError::PathMismatch { layer });
                }
                consumed += key_path.len();

                let value = items[1].as_bytes().map_err(|source| MptError::Rlp { layer, source })?;
                match kind {
                    PathKind::Extension => {
                        if key_path.is_empty() {
                            return Err(MptError::EmptyExtension { layer });
                        }
                        expected = child_hash(value, layer)?;
                        trace!("layer {layer}: extension over {} nibbles", key_path.len());
                    }
                    PathKind::Leaf => {
                        if consumed != ADDRESS_HASH_NIBBLES {
                            return Err(MptError::NonTerminalLeaf {
                                layer,
                                remaining: ADDRESS_HASH_NIBBLES - consumed,
                            });
                        }
                        if layer + 1 != num_layers {
                            return Err(MptError::LeafNotLast { layer, num_layers });
                        }

                        let balance = check_account(value, params.amount_bytes)?;
                        debug!(
                            "account proof accepted: {num_layers} layers, leaf key {} nibbles, balance {balance}",
                            key_path.len()
                        );
                        return Ok(VerifiedAccount {
                            balance,
                            consumed_nibbles: consumed,
                            leaf_key_nibbles: key_path.len(),
                        });
                    }
                }
            }
            items => return Err(MptError::UnexpectedNode { layer, items }),
        }
    }

    Err(MptError::MissingLeaf { num_layers })
}

fn child_hash(reference: &[u8], layer: usize) -> Result<[u8; 32], MptError> {
    fixed_32(reference).map_err(|_| MptError::InvalidChildReference { layer, len: reference.len() })
}

fn check_account(value: &[u8], amount_bytes: usize) -> Result<U256, MptError> {
    let account = Account::decode(value, amount_bytes).map_err(|source| MptError::Account { source })?;

    if account.nonce != 0 {
        return Err(MptError::NonZeroNonce { nonce: account.nonce });
    }
    if !account.is_empty_eoa() {
        if account.storage_root != EMPTY_STORAGE_ROOT {
            return Err(MptError::UnexpectedStorageRoot { root: B256::from(account.storage_root) });
        }
        return Err(MptError::UnexpectedCodeHash { hash: B256::from(account.code_hash) });
    }
    Ok(account.balance)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MptError {
    #[error("Empty proof")]
    EmptyProof,

    #[error("numLayers {num_layers} invalid: {available} layers supplied, maximum {max}")]
    LayerCount { num_layers: usize, available: usize, max: usize },

    #[error("Layer {layer} is {len} bytes, maximum {max}")]
    LayerTooLarge { layer: usize, len: usize, max: usize },

    #[error("Layer {layer} hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch { layer: usize, expected: B256, computed: B256 },

    #[error("Layer {layer} is not a valid node: {source}")]
    Rlp { layer: usize, source: RlpError },

    #[error("Layer {layer} has an invalid key: {source}")]
    Key { layer: usize, source: NibbleError },

    #[error("Layer {layer} has {items} items, expected a branch (17) or leaf/extension (2)")]
    UnexpectedNode { layer: usize, items: usize },

    #[error("Layer {layer} references a child of {len} bytes instead of a 32-byte hash")]
    InvalidChildReference { layer: usize, len: usize },

    #[error("Layer {layer} is a branch but the address hash is fully consumed")]
    PathExhausted { layer: usize },

    #[error("Layer {layer} key does not match the address hash")]
    PathMismatch { layer: usize },

    #[error("Layer {layer} is an extension with an empty path")]
    EmptyExtension { layer: usize },

    #[error("Layer {layer} is a leaf but {remaining} address nibbles remain")]
    NonTerminalLeaf { layer: usize, remaining: usize },

    #[error("Leaf found at layer {layer} but proof declares {num_layers} layers")]
    LeafNotLast { layer: usize, num_layers: usize },

    #[error("No leaf within the first {num_layers} layers")]
    MissingLeaf { num_layers: usize },

    #[error("Invalid account encoding: {source}")]
    Account { source: RlpError },

    #[error("Account nonce is {nonce}, burn addresses never send transactions")]
    NonZeroNonce { nonce: u64 },

    #[error("Account has storage root {root}")]
    UnexpectedStorageRoot { root: B256 },

    #[error("Account has code hash {hash}")]
    UnexpectedCodeHash { hash: B256 },
}

impl Classify for MptError {
    fn kind(&self) -> ErrorKind {
        match self {
            MptError::HashMismatch { .. } => ErrorKind::HashMismatch,
            MptError::Rlp { source, .. } | MptError::Account { source } => source.kind(),
            MptError::Key { source, .. } => source.kind(),
            MptError::LayerCount { .. } | MptError::LayerTooLarge { .. } => ErrorKind::RangeViolation,
            _ => ErrorKind::StructuralViolation,
        }
    }
}
