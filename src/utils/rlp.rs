// RLP encoding utilities for Ethereum data structures
// Headers are parsed and written with alloy-rlp; the item tree, integer
// width rules and the account shape live here.

use alloy_primitives::U256;
use alloy_rlp::Header;

use crate::constants::circuit_params::{EMPTY_CODE_HASH, EMPTY_STORAGE_ROOT};
use crate::error::{Classify, ErrorKind};

/// Decoded RLP value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpItem {
    String(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    pub fn as_bytes(&self) -> Result<&[u8], RlpError> {
        match self {
            RlpItem::String(bytes) => Ok(bytes),
            RlpItem::List(_) => Err(RlpError::UnexpectedList),
        }
    }

    pub fn as_list(&self) -> Result<&[RlpItem], RlpError> {
        match self {
            RlpItem::List(items) => Ok(items),
            RlpItem::String(_) => Err(RlpError::UnexpectedString),
        }
    }

    /// Re-encode this item canonically
    pub fn encode(&self) -> Vec<u8> {
        match self {
            RlpItem::String(bytes) => encode_bytes(bytes),
            RlpItem::List(items) => {
                let encoded: Vec<Vec<u8>> = items.iter().map(RlpItem::encode).collect();
                encode_list(&encoded)
            }
        }
    }
}

/// Decode exactly one item spanning the whole input.
pub fn decode(bytes: &[u8]) -> Result<RlpItem, RlpError> {
    let mut buf = bytes;
    let item = decode_item(&mut buf)?;
    if !buf.is_empty() {
        return Err(RlpError::TrailingBytes { remaining: buf.len() });
    }
    Ok(item)
}

/// Decode a list and return its items, rejecting a bare string.
pub fn decode_list(bytes: &[u8]) -> Result<Vec<RlpItem>, RlpError> {
    match decode(bytes)? {
        RlpItem::List(items) => Ok(items),
        RlpItem::String(_) => Err(RlpError::UnexpectedString),
    }
}

fn decode_item(buf: &mut &[u8]) -> Result<RlpItem, RlpError> {
    let header = Header::decode(buf)?;
    let (payload, rest) = buf.split_at(header.payload_length);
    *buf = rest;

    if !header.list {
        return Ok(RlpItem::String(payload.to_vec()));
    }

    let mut inner = payload;
    let mut items = Vec::new();
    while !inner.is_empty() {
        items.push(decode_item(&mut inner)?);
    }
    Ok(RlpItem::List(items))
}

/// Encode a byte string
pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() == 1 && bytes[0] < 0x80 {
        return vec![bytes[0]];
    }
    let mut out = Vec::with_capacity(bytes.len() + 9);
    Header { list: false, payload_length: bytes.len() }.encode(&mut out);
    out.extend_from_slice(bytes);
    out
}

/// Encode a list from already-encoded items
pub fn encode_list<T: AsRef<[u8]>>(encoded_items: &[T]) -> Vec<u8> {
    let payload_length = encoded_items.iter().map(|item| item.as_ref().len()).sum();
    let mut out = Vec::with_capacity(payload_length + 9);
    Header { list: true, payload_length }.encode(&mut out);
    for item in encoded_items {
        out.extend_from_slice(item.as_ref());
    }
    out
}

/// Minimal big-endian bytes of `n`; zero is the empty string.
pub fn integer_bytes(n: U256) -> Vec<u8> {
    let bytes = n.to_be_bytes::<32>();
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(32);
    bytes[first..].to_vec()
}

/// Encode an unsigned integer whose minimal width may not exceed `max_bytes`.
///
/// Zero encodes as the empty string (`0x80`), never as `0x00`.
pub fn encode_integer(n: U256, max_bytes: usize) -> Result<Vec<u8>, RlpError> {
    let bytes = integer_bytes(n);
    if bytes.len() > max_bytes {
        return Err(RlpError::IntegerTooWide { width: bytes.len(), max: max_bytes });
    }
    Ok(encode_bytes(&bytes))
}

/// Interpret a decoded string as a canonical integer of at most `max_bytes`.
pub fn decode_integer(bytes: &[u8], max_bytes: usize) -> Result<U256, RlpError> {
    if bytes.len() > max_bytes || bytes.len() > 32 {
        return Err(RlpError::IntegerTooWide { width: bytes.len(), max: max_bytes.min(32) });
    }
    if bytes.first() == Some(&0) {
        return Err(RlpError::LeadingZero);
    }
    Ok(U256::from_be_slice(bytes))
}

/// Ethereum account state
/// RLP encoding: [nonce, balance, storage_root, code_hash]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: [u8; 32],
    pub code_hash: [u8; 32],
}

impl Account {
    /// Create a new account with given balance
    /// Uses empty storage root and code hash for burn addresses
    pub fn burn_account(balance: U256) -> Self {
        Self {
            nonce: 0,
            balance,
            storage_root: EMPTY_STORAGE_ROOT,
            code_hash: EMPTY_CODE_HASH,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let fields = [
            encode_bytes(&integer_bytes(U256::from(self.nonce))),
            encode_bytes(&integer_bytes(self.balance)),
            encode_bytes(&self.storage_root),
            encode_bytes(&self.code_hash),
        ];
        encode_list(&fields)
    }

    /// Decode an account whose balance is at most `amount_bytes` wide.
    pub fn decode(bytes: &[u8], amount_bytes: usize) -> Result<Self, RlpError> {
        let items = decode_list(bytes)?;
        if items.len() != 4 {
            return Err(RlpError::ListLength { expected: 4, got: items.len() });
        }

        let nonce = decode_integer(items[0].as_bytes()?, 8)?;
        let balance = decode_integer(items[1].as_bytes()?, amount_bytes)?;
        let storage_root = fixed_32(items[2].as_bytes()?)?;
        let code_hash = fixed_32(items[3].as_bytes()?)?;

        Ok(Self {
            nonce: nonce.to::<u64>(),
            balance,
            storage_root,
            code_hash,
        })
    }

    /// Burn addresses never sent a transaction and hold no code or storage.
    pub fn is_empty_eoa(&self) -> bool {
        self.nonce == 0 && self.storage_root == EMPTY_STORAGE_ROOT && self.code_hash == EMPTY_CODE_HASH
    }
}

pub(crate) fn fixed_32(bytes: &[u8]) -> Result<[u8; 32], RlpError> {
    bytes
        .try_into()
        .map_err(|_| RlpError::UnexpectedLength { expected: 32, got: bytes.len() })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RlpError {
    #[error("rlp header: {0}")]
    Header(#[from] alloy_rlp::Error),

    #[error("{remaining} trailing bytes after rlp item")]
    TrailingBytes { remaining: usize },

    #[error("expected a string, found a list")]
    UnexpectedList,

    #[error("expected a list, found a string")]
    UnexpectedString,

    #[error("expected {expected} list items, found {got}")]
    ListLength { expected: usize, got: usize },

    #[error("expected {expected} bytes, found {got}")]
    UnexpectedLength { expected: usize, got: usize },

    #[error("integer has leading zero bytes")]
    LeadingZero,

    #[error("integer is {width} bytes wide, maximum is {max}")]
    IntegerTooWide { width: usize, max: usize },
}

impl Classify for RlpError {
    fn kind(&self) -> ErrorKind {
        match self {
            RlpError::IntegerTooWide { .. } => ErrorKind::RangeViolation,
            _ => ErrorKind::MalformedEncoding,
        }
    }
}
