// Hex-prefix ("compact") encoding of trie paths
// Leaf and extension nodes store their partial path as a flag nibble
// followed by the path nibbles packed two per byte:
//
//   flag 0x0 / 0x2  extension / leaf, even length, low nibble of byte 0 is padding
//   flag 0x1 / 0x3  extension / leaf, odd length, low nibble of byte 0 is the first path nibble

use itertools::Itertools;

use crate::error::{Classify, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Leaf,
    Extension,
}

/// Result of reading a hex-prefix flag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathHeader {
    pub kind: PathKind,
    /// Number of path nibbles carried by the encoded key
    pub nibble_count: usize,
}

/// Fixed-width encoding of a key together with its meaningful length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexPrefixKey {
    /// Encoded key, zero-padded to the fixed width
    pub bytes: Vec<u8>,
    /// Number of meaningful bytes at the front of `bytes`
    pub len: usize,
}

impl HexPrefixKey {
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Split bytes into nibbles, high nibble first
pub fn bytes_to_nibbles(bytes: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(bytes.len() * 2);
    for byte in bytes {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0F);
    }
    nibbles
}

/// Compact-encode a path (unpadded).
pub fn compact_encode(path: &[u8], kind: PathKind) -> Result<Vec<u8>, NibbleError> {
    if let Some(&bad) = path.iter().find(|&&n| n > 0x0F) {
        return Err(NibbleError::InvalidNibble { value: bad });
    }

    let flag: u8 = match kind {
        PathKind::Leaf => 0x2,
        PathKind::Extension => 0x0,
    };

    let mut out = Vec::with_capacity(path.len() / 2 + 1);
    let rest = if path.len() % 2 == 1 {
        out.push(((flag + 1) << 4) | path[0]);
        &path[1..]
    } else {
        out.push(flag << 4);
        path
    };
    out.extend(rest.iter().tuples().map(|(&hi, &lo)| (hi << 4) | lo));
    Ok(out)
}

/// Encode the last `len` nibbles of `nibbles` as a leaf or extension key.
///
/// The output is always `nibbles.len() / 2 + 1` bytes wide, zero-padded,
/// with `len / 2 + 1` meaningful bytes.
pub fn encode_leaf_key(nibbles: &[u8], len: usize, kind: PathKind) -> Result<HexPrefixKey, NibbleError> {
    if len > nibbles.len() {
        return Err(NibbleError::LengthOutOfRange { len, max: nibbles.len() });
    }

    let suffix = &nibbles[nibbles.len() - len..];
    let mut bytes = compact_encode(suffix, kind)?;
    let meaningful = bytes.len();
    bytes.resize(nibbles.len() / 2 + 1, 0);

    Ok(HexPrefixKey { bytes, len: meaningful })
}

/// Interpret the flag of a key whose encoding is `byte_len` bytes long.
pub fn decode_flag(first_byte: u8, byte_len: usize) -> Result<PathHeader, NibbleError> {
    if byte_len == 0 {
        return Err(NibbleError::EmptyKey);
    }

    let (kind, odd) = match first_byte & 0xF0 {
        0x00 => (PathKind::Extension, false),
        0x10 => (PathKind::Extension, true),
        0x20 => (PathKind::Leaf, false),
        0x30 => (PathKind::Leaf, true),
        _ => return Err(NibbleError::InvalidNodeType { flag: first_byte >> 4 }),
    };

    let nibble_count = if odd { 2 * byte_len - 1 } else { 2 * byte_len - 2 };
    Ok(PathHeader { kind, nibble_count })
}

/// Decode a compact key into its kind and path nibbles.
pub fn decode_path(encoded: &[u8]) -> Result<(PathKind, Vec<u8>), NibbleError> {
    let first = *encoded.first().ok_or(NibbleError::EmptyKey)?;
    let header = decode_flag(first, encoded.len())?;

    let mut path = Vec::with_capacity(header.nibble_count);
    if header.nibble_count % 2 == 1 {
        path.push(first & 0x0F);
    } else if first & 0x0F != 0 {
        return Err(NibbleError::NonZeroPadding { byte: first });
    }
    path.extend(bytes_to_nibbles(&encoded[1..]));

    Ok((header.kind, path))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NibbleError {
    #[error("invalid node type: flag nibble {flag:#x}")]
    InvalidNodeType { flag: u8 },

    #[error("empty hex-prefix key")]
    EmptyKey,

    #[error("even-length key has non-zero padding nibble in {byte:#04x}")]
    NonZeroPadding { byte: u8 },

    #[error("{value:#x} is not a nibble")]
    InvalidNibble { value: u8 },

    #[error("key length {len} exceeds {max} available nibbles")]
    LengthOutOfRange { len: usize, max: usize },
}

impl Classify for NibbleError {
    fn kind(&self) -> ErrorKind {
        match self {
            NibbleError::LengthOutOfRange { .. } | NibbleError::InvalidNibble { .. } => {
                ErrorKind::RangeViolation
            }
            _ => ErrorKind::MalformedEncoding,
        }
    }
}
