// Boundary and Edge Case Tests
// Field limits, integer widths, encodings at their edges and circuit capacities

use alloy_primitives::{Address, U256};
use proof_of_burn_model::circuits::{check_spend, SpendError, SpendInputs};
use proof_of_burn_model::config::{CircuitParams, ProtocolConfig, ProtocolVersion};
use proof_of_burn_model::error::{Classify, ErrorKind};
use proof_of_burn_model::field::FieldElement;
use proof_of_burn_model::utils::burn_address::{burn_address_hash, derive_burn_address, BurnParams};
use proof_of_burn_model::utils::commitment::{coin, public_commitment};
use proof_of_burn_model::utils::mpt::{verify_account_proof, AccountProof};
use proof_of_burn_model::utils::nibbles::{compact_encode, decode_path, encode_leaf_key, PathKind};
use proof_of_burn_model::utils::pow::{check_leading_zero_bytes, leading_zero_bytes};
use proof_of_burn_model::utils::rlp::{decode, decode_integer, encode_bytes, encode_integer, Account, RlpItem};
use proof_of_burn_model::utils::trie::StateTrie;

fn p() -> U256 {
    FieldElement::modulus()
}

#[cfg(test)]
mod field_boundary_tests {
    use super::*;

    #[test]
    fn test_modulus_minus_one_is_a_valid_key() {
        let key = FieldElement::try_from_u256(p() - U256::from(1)).unwrap();
        let params = BurnParams::new(Address::ZERO);
        assert!(derive_burn_address(key, &params, &ProtocolConfig::default()).is_ok());
        assert!(coin(key, U256::ZERO).is_ok());
    }

    #[test]
    fn test_modulus_is_not_a_key() {
        let err = FieldElement::try_from_u256(p()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeViolation);
        assert!(p().to_string().parse::<FieldElement>().is_err());
    }

    #[test]
    fn test_public_input_at_modulus_is_rejected() {
        let params = BurnParams::new(Address::ZERO).with_reveal_amount(p());
        let err = derive_burn_address(FieldElement::one(), &params, &ProtocolConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeViolation);
    }

    #[test]
    fn test_commitment_fits_the_field() {
        let commitment = public_commitment(&[U256::MAX, U256::MAX, U256::MAX]);
        assert!(commitment.to_u256() < U256::from(1) << 248usize);
        assert!(commitment.to_u256() < p());
    }
}

#[cfg(test)]
mod rlp_boundary_tests {
    use super::*;

    #[test]
    fn test_single_byte_boundary() {
        assert_eq!(encode_bytes(&[0x7f]), vec![0x7f]);
        assert_eq!(encode_bytes(&[0x80]), vec![0x81, 0x80]);
        assert_eq!(encode_bytes(&[]), vec![0x80]);
    }

    #[test]
    fn test_long_string_boundary() {
        let short = encode_bytes(&[0xaa; 55]);
        assert_eq!(short[0], 0x80 + 55);
        let long = encode_bytes(&[0xaa; 56]);
        assert_eq!(&long[..2], &[0xb8, 56]);
        assert_eq!(decode(&long).unwrap(), RlpItem::String(vec![0xaa; 56]));
    }

    #[test]
    fn test_non_canonical_single_byte() {
        assert!(decode(&[0x81, 0x05]).is_err());
        assert_eq!(decode(&[0x81, 0x80]).unwrap(), RlpItem::String(vec![0x80]));
    }

    #[test]
    fn test_integer_width_limits() {
        let max31 = (U256::from(1) << 248usize) - U256::from(1);
        assert_eq!(encode_integer(max31, 31).unwrap().len(), 32);
        let err = encode_integer(U256::from(1) << 248usize, 31).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeViolation);

        assert_eq!(encode_integer(U256::ZERO, 31).unwrap(), vec![0x80]);
        assert_eq!(decode_integer(&[], 31).unwrap(), U256::ZERO);
        assert!(decode_integer(&[0x00], 31).is_err());
        assert!(decode_integer(&[0x00, 0x01], 31).is_err());
        assert!(decode_integer(&[0xff; 32], 31).is_err());
    }

    #[test]
    fn test_truncated_payload() {
        let encoded = encode_bytes(&[0x11; 10]);
        let err = decode(&encoded[..encoded.len() - 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEncoding);
        assert!(decode(&[]).is_err());
    }
}

#[cfg(test)]
mod hex_prefix_boundary_tests {
    use super::*;

    #[test]
    fn test_empty_paths() {
        assert_eq!(compact_encode(&[], PathKind::Leaf).unwrap(), vec![0x20]);
        assert_eq!(compact_encode(&[], PathKind::Extension).unwrap(), vec![0x00]);
        assert_eq!(decode_path(&[0x20]).unwrap(), (PathKind::Leaf, vec![]));
    }

    #[test]
    fn test_full_address_hash_key() {
        let nibbles: Vec<u8> = (0..64).map(|i| (i % 16) as u8).collect();
        let key = encode_leaf_key(&nibbles, 64, PathKind::Leaf).unwrap();
        assert_eq!(key.len, 33);
        assert_eq!(key.bytes.len(), 33);
        assert_eq!(key.as_slice()[0], 0x20);

        let key = encode_leaf_key(&nibbles, 0, PathKind::Leaf).unwrap();
        assert_eq!(key.len, 1);
        assert!(key.bytes[1..].iter().all(|&b| b == 0));

        assert!(encode_leaf_key(&nibbles, 65, PathKind::Leaf).is_err());
    }

    #[test]
    fn test_bad_flags_and_padding() {
        assert!(decode_path(&[0x40]).is_err());
        assert!(decode_path(&[0x21]).is_err());
        assert!(decode_path(&[]).is_err());
        assert!(compact_encode(&[0x10], PathKind::Leaf).is_err());
    }
}

#[cfg(test)]
mod capacity_boundary_tests {
    use super::*;

    #[test]
    fn test_pow_zero_byte_limits() {
        let zero = [0u8; 32];
        assert_eq!(leading_zero_bytes(&zero), 32);
        assert!(check_leading_zero_bytes(&zero, 32));
        assert!(!check_leading_zero_bytes(&zero, 33));

        let mut hash = [0u8; 32];
        hash[2] = 1;
        assert!(check_leading_zero_bytes(&hash, 2));
        assert!(!check_leading_zero_bytes(&hash, 3));
        assert!(check_leading_zero_bytes(&[0xff; 32], 0));
    }

    #[test]
    fn test_proof_at_layer_limit() {
        let mut trie = StateTrie::new();
        let target = Address::repeat_byte(0x42);
        trie.insert_account(target, &Account::burn_account(U256::from(9)));
        for i in (0..=255u8).filter(|&i| i != 0x42) {
            trie.insert_account(Address::repeat_byte(i), &Account::burn_account(U256::from(1)));
        }
        let layers = trie.account_proof(target).unwrap();
        let depth = layers.len();
        assert!(depth >= 2);

        let root = trie.root().unwrap();
        let hash = burn_address_hash(&target);
        let proof = AccountProof::new(layers);

        let exact = CircuitParams { max_num_layers: depth, ..CircuitParams::default() };
        assert_eq!(verify_account_proof(&proof, &root, &hash, &exact).unwrap().balance, U256::from(9));

        let short = CircuitParams { max_num_layers: depth - 1, ..CircuitParams::default() };
        let err = verify_account_proof(&proof, &root, &hash, &short).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeViolation);
    }

    #[test]
    fn test_max_balance_spend() {
        let params = CircuitParams::default();
        let inputs = SpendInputs {
            burn_key: FieldElement::from(7u64),
            balance: params.max_amount(),
            withdrawn_balance: params.max_amount(),
            broadcaster_fee: U256::ZERO,
            receiver: Address::ZERO,
            extra_commitment: U256::ZERO,
        };
        let outputs = check_spend(inputs.clone(), ProtocolConfig::default(), &params).unwrap();
        assert_eq!(outputs.remaining_balance, U256::ZERO);

        let mut wide = inputs;
        wide.balance = params.max_amount() + U256::from(1);
        let err = check_spend(wide, ProtocolConfig::default(), &params).unwrap_err();
        assert!(matches!(err, SpendError::AmountTooLarge { name: "balance", .. }));
    }

    #[test]
    fn test_unbound_broadcaster_fee_on_spend() {
        let inputs = SpendInputs {
            burn_key: FieldElement::from(7u64),
            balance: U256::from(100),
            withdrawn_balance: U256::from(10),
            broadcaster_fee: U256::from(1),
            receiver: Address::ZERO,
            extra_commitment: U256::ZERO,
        };
        let err = check_spend(inputs, ProtocolVersion::V3.config(), &CircuitParams::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    }
}
