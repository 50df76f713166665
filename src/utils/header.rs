// Block header RLP codec
//
// The block root a burn proof commits to is keccak256(rlp(header)); the
// state root the account proof is checked against is the header's fourth
// field. Post-merge forks append optional fields, and a later one may only
// be present when every earlier one is.

use alloy_primitives::{Address, Bytes, B256, B64, U256};
use serde::{Deserialize, Serialize};

use crate::error::{Classify, ErrorKind};
use crate::utils::keccak::keccak256;
use crate::utils::rlp::{
    decode_integer, decode_list, encode_bytes, encode_integer, encode_list, fixed_32, integer_bytes, RlpError,
    RlpItem,
};

/// Fields every header carries
pub const CANONICAL_FIELDS: usize = 15;
/// Fields including the full optional tail
pub const MAX_FIELDS: usize = CANONICAL_FIELDS + 6;

const LOGS_BLOOM_BYTES: usize = 256;
const STATE_ROOT_INDEX: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub parent_hash: B256,
    #[serde(alias = "sha3Uncles")]
    pub uncles_hash: B256,
    pub miner: Address,
    pub state_root: B256,
    pub transactions_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bytes,
    pub difficulty: U256,
    pub number: U256,
    pub gas_limit: U256,
    pub gas_used: U256,
    pub timestamp: U256,
    pub extra_data: Bytes,
    pub mix_hash: B256,
    pub nonce: B64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals_root: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_gas_used: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excess_blob_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_hash: Option<B256>,
}

impl BlockHeader {
    /// Optional tail in fork order, `None` for absent fields.
    fn optional_fields(&self) -> [(&'static str, Option<Vec<u8>>); 6] {
        let int = |v: &Option<U256>| v.map(|n| encode_bytes(&integer_bytes(n)));
        let hash = |v: &Option<B256>| v.map(|h| encode_bytes(h.as_slice()));
        [
            ("baseFeePerGas", int(&self.base_fee_per_gas)),
            ("withdrawalsRoot", hash(&self.withdrawals_root)),
            ("blobGasUsed", int(&self.blob_gas_used)),
            ("excessBlobGas", int(&self.excess_blob_gas)),
            ("parentBeaconBlockRoot", hash(&self.parent_beacon_block_root)),
            ("requestsHash", hash(&self.requests_hash)),
        ]
    }

    /// Canonical RLP encoding. Zero integers encode as the empty string.
    pub fn encode(&self) -> Result<Vec<u8>, HeaderError> {
        if self.logs_bloom.len() != LOGS_BLOOM_BYTES {
            return Err(HeaderError::FieldLength {
                field: "logsBloom",
                expected: LOGS_BLOOM_BYTES,
                got: self.logs_bloom.len(),
            });
        }

        let mut items = vec![
            encode_bytes(self.parent_hash.as_slice()),
            encode_bytes(self.uncles_hash.as_slice()),
            encode_bytes(self.miner.as_slice()),
            encode_bytes(self.state_root.as_slice()),
            encode_bytes(self.transactions_root.as_slice()),
            encode_bytes(self.receipts_root.as_slice()),
            encode_bytes(&self.logs_bloom),
            encode_integer(self.difficulty, 32)?,
            encode_integer(self.number, 32)?,
            encode_integer(self.gas_limit, 32)?,
            encode_integer(self.gas_used, 32)?,
            encode_integer(self.timestamp, 32)?,
            encode_bytes(&self.extra_data),
            encode_bytes(self.mix_hash.as_slice()),
            encode_bytes(self.nonce.as_slice()),
        ];

        let mut gap: Option<&'static str> = None;
        for (name, field) in self.optional_fields() {
            match (field, gap) {
                (Some(_), Some(missing)) => {
                    return Err(HeaderError::NonContiguousTail { field: name, missing });
                }
                (Some(encoded), None) => items.push(encoded),
                (None, None) => gap = Some(name),
                (None, Some(_)) => {}
            }
        }

        Ok(encode_list(&items))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, HeaderError> {
        let items = decode_list(bytes)?;
        if !(CANONICAL_FIELDS..=MAX_FIELDS).contains(&items.len()) {
            return Err(HeaderError::FieldCount { count: items.len() });
        }

        let string = |i: usize| items[i].as_bytes();
        let hash = |i: usize, field: &'static str| -> Result<B256, HeaderError> {
            let bytes = string(i)?;
            fixed_32(bytes)
                .map(B256::from)
                .map_err(|_| HeaderError::FieldLength { field, expected: 32, got: bytes.len() })
        };
        let int = |i: usize| -> Result<U256, HeaderError> { Ok(decode_integer(string(i)?, 32)?) };

        let miner = string(2)?;
        if miner.len() != 20 {
            return Err(HeaderError::FieldLength { field: "miner", expected: 20, got: miner.len() });
        }
        let logs_bloom = string(6)?;
        if logs_bloom.len() != LOGS_BLOOM_BYTES {
            return Err(HeaderError::FieldLength {
                field: "logsBloom",
                expected: LOGS_BLOOM_BYTES,
                got: logs_bloom.len(),
            });
        }
        let nonce = string(14)?;
        let nonce: [u8; 8] = nonce
            .try_into()
            .map_err(|_| HeaderError::FieldLength { field: "nonce", expected: 8, got: nonce.len() })?;

        let optional = |i: usize| i < items.len();
        Ok(BlockHeader {
            parent_hash: hash(0, "parentHash")?,
            uncles_hash: hash(1, "unclesHash")?,
            miner: Address::from_slice(miner),
            state_root: hash(STATE_ROOT_INDEX, "stateRoot")?,
            transactions_root: hash(4, "transactionsRoot")?,
            receipts_root: hash(5, "receiptsRoot")?,
            logs_bloom: Bytes::copy_from_slice(logs_bloom),
            difficulty: int(7)?,
            number: int(8)?,
            gas_limit: int(9)?,
            gas_used: int(10)?,
            timestamp: int(11)?,
            extra_data: Bytes::copy_from_slice(string(12)?),
            mix_hash: hash(13, "mixHash")?,
            nonce: B64::from(nonce),
            base_fee_per_gas: optional(15).then(|| int(15)).transpose()?,
            withdrawals_root: optional(16).then(|| hash(16, "withdrawalsRoot")).transpose()?,
            blob_gas_used: optional(17).then(|| int(17)).transpose()?,
            excess_blob_gas: optional(18).then(|| int(18)).transpose()?,
            parent_beacon_block_root: optional(19).then(|| hash(19, "parentBeaconBlockRoot")).transpose()?,
            requests_hash: optional(20).then(|| hash(20, "requestsHash")).transpose()?,
        })
    }

    /// Block hash, keccak256 of the canonical encoding
    pub fn hash(&self) -> Result<B256, HeaderError> {
        Ok(B256::from(keccak256(&self.encode()?)))
    }
}

/// Read the state root straight from an encoded header without decoding
/// the remaining fields.
pub fn state_root_from_rlp(bytes: &[u8]) -> Result<B256, HeaderError> {
    let items = decode_list(bytes)?;
    if items.len() < CANONICAL_FIELDS {
        return Err(HeaderError::FieldCount { count: items.len() });
    }
    match &items[STATE_ROOT_INDEX] {
        RlpItem::String(root) => fixed_32(root).map(B256::from).map_err(|_| HeaderError::FieldLength {
            field: "stateRoot",
            expected: 32,
            got: root.len(),
        }),
        RlpItem::List(_) => Err(RlpError::UnexpectedList.into()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error(transparent)]
    Rlp(#[from] RlpError),

    #[error("header has {count} fields, expected {CANONICAL_FIELDS}..={MAX_FIELDS}")]
    FieldCount { count: usize },

    #[error("{field} must be {expected} bytes, got {got}")]
    FieldLength { field: &'static str, expected: usize, got: usize },

    #[error("{field} is set but the earlier optional field {missing} is not")]
    NonContiguousTail { field: &'static str, missing: &'static str },
}

impl Classify for HeaderError {
    fn kind(&self) -> ErrorKind {
        match self {
            HeaderError::Rlp(e) => e.kind(),
            _ => ErrorKind::StructuralViolation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    const EMPTY_ROOT: B256 = b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

    fn genesis() -> BlockHeader {
        BlockHeader {
            uncles_hash: b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347"),
            state_root: b256!("d7f8974fb5ac78d9ac099b9ad5018bedc2ce0a72dad1827a1709da30580f0544"),
            transactions_root: EMPTY_ROOT,
            receipts_root: EMPTY_ROOT,
            logs_bloom: Bytes::from(vec![0u8; 256]),
            difficulty: U256::from(17179869184u64),
            gas_limit: U256::from(5000),
            extra_data: Bytes::from(
                hex::decode("11bbe8db4e347b4e8c937c1c8370e4b5ed33adb3db69cbdb7a38e1e50b1b82fa").unwrap(),
            ),
            nonce: B64::from([0, 0, 0, 0, 0, 0, 0, 0x42]),
            ..Default::default()
        }
    }

    #[test]
    fn test_mainnet_genesis_hash() {
        let header = genesis();
        let encoded = header.encode().unwrap();
        assert_eq!(encoded.len(), 535);
        assert_eq!(
            header.hash().unwrap(),
            b256!("d4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3")
        );
    }

    #[test]
    fn test_zero_integers_are_empty_strings() {
        let encoded = genesis().encode().unwrap();
        let items = decode_list(&encoded).unwrap();
        // number, gasUsed, timestamp
        for i in [8, 10, 11] {
            assert_eq!(items[i], RlpItem::String(vec![]));
        }
        assert_eq!(items[9], RlpItem::String(vec![0x13, 0x88]));
    }

    #[test]
    fn test_decode_roundtrip_and_state_root() {
        let mut header = genesis();
        header.base_fee_per_gas = Some(U256::from(7));
        header.withdrawals_root = Some(EMPTY_ROOT);
        let encoded = header.encode().unwrap();

        assert_eq!(BlockHeader::decode(&encoded).unwrap(), header);
        assert_eq!(state_root_from_rlp(&encoded).unwrap(), header.state_root);
    }

    #[test]
    fn test_optional_tail_must_be_contiguous() {
        let mut header = genesis();
        header.blob_gas_used = Some(U256::ZERO);
        let err = header.encode().unwrap_err();
        assert_eq!(
            err,
            HeaderError::NonContiguousTail { field: "blobGasUsed", missing: "baseFeePerGas" }
        );
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        let encoded = genesis().encode().unwrap();
        let mut items = decode_list(&encoded).unwrap();

        // zero difficulty written as 0x00 instead of the empty string
        items[7] = RlpItem::String(vec![0x00]);
        let non_canonical = RlpItem::List(items.clone()).encode();
        assert_eq!(
            BlockHeader::decode(&non_canonical).unwrap_err().kind(),
            ErrorKind::MalformedEncoding
        );

        items.truncate(14);
        let short = RlpItem::List(items).encode();
        assert_eq!(BlockHeader::decode(&short).unwrap_err(), HeaderError::FieldCount { count: 14 });
        assert!(state_root_from_rlp(&short).is_err());
    }

    #[test]
    fn test_fixture_json() {
        let json = serde_json::to_string(&genesis()).unwrap();
        assert!(json.contains("\"stateRoot\""));
        assert!(!json.contains("baseFeePerGas"));
        let back: BlockHeader = serde_json::from_str(&json).unwrap();
        assert_eq!(back, genesis());
    }
}
