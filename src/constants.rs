// Constants for Proof of Burn circuits
// Poseidon domain prefixes, the proof-of-work domain tag and the default
// circuit limits.

use crate::field::FieldElement;
use crate::utils::keccak::keccak256;

/// keccak256("EIP-7503") reduced modulo the BN254 scalar field
pub const POSEIDON_PREFIX_STR: &str =
    "5265656504298861414514317065875120428884240036965045859626767452974705356670";

/// Appended to every proof-of-work preimage
pub const POW_DOMAIN_TAG: &[u8] = b"EIP-7503";

/// Base Poseidon prefix derived from keccak256("EIP-7503") mod P
pub fn poseidon_prefix() -> FieldElement {
    FieldElement::from_be_bytes_mod_order(&keccak256(POW_DOMAIN_TAG))
}

/// POSEIDON_PREFIX + 0
pub fn poseidon_burn_address_prefix() -> FieldElement {
    poseidon_prefix()
}

/// POSEIDON_PREFIX + 1
pub fn poseidon_nullifier_prefix() -> FieldElement {
    poseidon_prefix() + FieldElement::one()
}

/// POSEIDON_PREFIX + 2
pub fn poseidon_coin_prefix() -> FieldElement {
    poseidon_prefix() + FieldElement::from(2u64)
}

/// Default circuit limits
pub mod circuit_params {
    /// Keccak absorbs 136 bytes per block
    pub const KECCAK_BLOCK_BYTES: usize = 136;

    /// Maximum number of Merkle-Patricia-Trie proof nodes supported
    pub const MAX_NUM_LAYERS: usize = 16;

    /// Keccak blocks are 136 bytes. MPT nodes are maximum 532 bytes ~ 3.91 blocks
    pub const MAX_NODE_BLOCKS: usize = 4;

    /// Average header length of the last 100 blocks ~ 643 bytes ~ 4.72 blocks
    pub const MAX_HEADER_BLOCKS: usize = 8;

    /// Minimum number of address-hash nibbles (4 * 50 = 200 bits of security)
    pub const MIN_LEAF_ADDRESS_NIBBLES: usize = 50;

    /// Amount bytes (248-bits to disallow field overflows)
    pub const AMOUNT_BYTES: usize = 31;

    /// Adds 8 * powMinimumZeroBytes extra bits of security
    pub const POW_MINIMUM_ZERO_BYTES: usize = 2;

    /// Maximum provable balance: 100 ETH
    pub const MAX_BALANCE: u128 = 100_000_000_000_000_000_000;

    /// Length reported for unused layer slots in a padded witness
    pub const PADDING_LAYER_LEN: usize = 256;

    /// keccak256(rlp("")), storage root of an account without storage
    pub const EMPTY_STORAGE_ROOT: [u8; 32] = [
        0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6,
        0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
        0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0,
        0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
    ];

    /// keccak256(""), code hash of an account without code
    pub const EMPTY_CODE_HASH: [u8; 32] = [
        0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c,
        0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
        0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b,
        0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
    ];
}
