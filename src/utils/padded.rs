// Fixed-capacity byte arrays with an explicit length, the shape circuits
// expect for trie layers and block headers.

use crate::error::{Classify, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Padded {
    data: Vec<u8>,
    len: usize,
}

impl Padded {
    /// Copy `bytes` into a zero-filled buffer of `capacity` bytes.
    pub fn new(bytes: &[u8], capacity: usize) -> Result<Self, PaddedError> {
        if bytes.len() > capacity {
            return Err(PaddedError::CapacityExceeded { len: bytes.len(), capacity });
        }
        let mut data = vec![0u8; capacity];
        data[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { data, len: bytes.len() })
    }

    /// Rebuild from a padded buffer and its declared length.
    pub fn from_parts(data: Vec<u8>, len: usize) -> Result<Self, PaddedError> {
        if len > data.len() {
            return Err(PaddedError::LengthBeyondData { len, capacity: data.len() });
        }
        Ok(Self { data, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The meaningful prefix
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The whole buffer including padding
    pub fn padded(&self) -> &[u8] {
        &self.data
    }

    pub fn into_parts(self) -> (Vec<u8>, usize) {
        (self.data, self.len)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaddedError {
    #[error("{len} bytes do not fit in a capacity of {capacity}")]
    CapacityExceeded { len: usize, capacity: usize },

    #[error("declared length {len} exceeds buffer of {capacity} bytes")]
    LengthBeyondData { len: usize, capacity: usize },
}

impl Classify for PaddedError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::RangeViolation
    }
}
