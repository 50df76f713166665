// Integration Tests
// End-to-end burn and spend flows against the in-memory chain and fixtures

use alloy_primitives::{Address, U256};
use proof_of_burn_model::circuits::{check_burn, check_spend, ProofOfBurnError, SpendInputs};
use proof_of_burn_model::config::{CircuitParams, ProtocolConfig, ProtocolVersion, PublicInput};
use proof_of_burn_model::error::{Classify, ErrorKind, Verdict};
use proof_of_burn_model::field::FieldElement;
use proof_of_burn_model::interfaces::{
    prepare_burn_inputs, CircuitSink, FixtureSource, JsonFileSink, LocalChain, ProofSource, TransactionBroadcaster,
};
use proof_of_burn_model::utils::burn_address::{derive_burn_address, BurnParams};
use proof_of_burn_model::utils::commitment::{coin, nullifier};
use proof_of_burn_model::utils::pow::{find_burn_key, SearchOptions};
use proof_of_burn_model::witness::{BurnWitness, SpendWitness};

const ONE_ETH: u64 = 1_000_000_000_000_000_000;

fn receiver() -> Address {
    Address::repeat_byte(0x90)
}

/// Burn parameters using every value the revision binds
fn burn_params(config: &ProtocolConfig) -> BurnParams {
    let mut params = BurnParams::new(receiver())
        .with_reveal_amount(U256::from(234))
        .with_extra_commitment(U256::from(345));
    if config.binds(PublicInput::ProverFee) {
        params.prover_fee = U256::from(123);
    }
    if config.binds(PublicInput::BroadcasterFee) {
        params.broadcaster_fee = U256::from(456);
    }
    params
}

fn search_key(params: &BurnParams, config: &ProtocolConfig) -> FieldElement {
    let options = SearchOptions { start: Some(FieldElement::zero()), max_attempts: Some(5_000_000) };
    find_burn_key(params, config, CircuitParams::default().pow_minimum_zero_bytes, &options)
        .expect("a key within the attempt budget")
        .burn_key
}

/// Burn `amount` on a fresh chain and return the chain, the key and the block
fn burn_on_chain(config: &ProtocolConfig, params: &BurnParams, amount: U256) -> (LocalChain, FieldElement, u64) {
    let chain = LocalChain::new(48).unwrap();
    let burn_key = search_key(params, config);
    let address = derive_burn_address(burn_key, params, config).unwrap();
    assert!(chain.send_value(address, amount).unwrap());
    let block = chain.latest_block().unwrap();
    (chain, burn_key, block)
}

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("pob-{name}-{}", std::process::id()))
}

#[cfg(test)]
mod end_to_end_burn_tests {
    use super::*;

    #[test]
    fn test_burn_flow_every_version() {
        let circuit = CircuitParams::default();
        for version in ProtocolVersion::ALL {
            let config = version.config();
            let params = burn_params(&config);
            let (chain, burn_key, block) = burn_on_chain(&config, &params, U256::from(ONE_ETH));

            let inputs = prepare_burn_inputs(&chain, burn_key, &params, &config, &circuit, block, 0).unwrap();
            let outputs = check_burn(inputs, config.clone(), circuit.clone())
                .unwrap_or_else(|e| panic!("{version} burn rejected: {e}"));

            let remaining = U256::from(ONE_ETH) - params.prover_fee - params.broadcaster_fee - params.reveal_amount;
            assert_eq!(outputs.nullifier, nullifier(burn_key).unwrap());
            assert_eq!(outputs.remaining_coin, coin(burn_key, remaining).unwrap());
            assert_eq!(outputs.burn_address, derive_burn_address(burn_key, &params, &config).unwrap());
        }
    }

    #[test]
    fn test_burn_then_spend() {
        let config = ProtocolConfig::default();
        let circuit = CircuitParams::default();
        let params = burn_params(&config);
        let (chain, burn_key, block) = burn_on_chain(&config, &params, U256::from(ONE_ETH));

        let inputs = prepare_burn_inputs(&chain, burn_key, &params, &config, &circuit, block, 0).unwrap();
        let burnt = check_burn(inputs, config.clone(), circuit.clone()).unwrap();

        let balance = U256::from(ONE_ETH) - U256::from(123 + 456 + 234);
        let first = check_spend(
            SpendInputs {
                burn_key,
                balance,
                withdrawn_balance: U256::from(ONE_ETH / 4),
                broadcaster_fee: U256::from(10),
                receiver: receiver(),
                extra_commitment: U256::ZERO,
            },
            config.clone(),
            &circuit,
        )
        .unwrap();
        assert_eq!(first.coin, burnt.remaining_coin);

        // the remaining coin can be spent down to zero
        let second = check_spend(
            SpendInputs {
                burn_key,
                balance: first.remaining_balance,
                withdrawn_balance: first.remaining_balance,
                broadcaster_fee: U256::ZERO,
                receiver: receiver(),
                extra_commitment: U256::ZERO,
            },
            config.clone(),
            &circuit,
        )
        .unwrap();
        assert_eq!(second.coin, first.remaining_coin);
        assert_eq!(second.remaining_balance, U256::ZERO);

        let overdraft = check_spend(
            SpendInputs {
                burn_key,
                balance: first.remaining_balance,
                withdrawn_balance: first.remaining_balance,
                broadcaster_fee: U256::from(1),
                receiver: receiver(),
                extra_commitment: U256::ZERO,
            },
            config,
            &circuit,
        );
        assert_eq!(Verdict::from_result(&overdraft), Verdict::Reject(ErrorKind::ArithmeticUnderflow));
    }

    #[test]
    fn test_nullifier_is_stable_across_blocks() {
        let config = ProtocolConfig::default();
        let circuit = CircuitParams::default();
        let params = burn_params(&config);
        let (chain, burn_key, first_block) = burn_on_chain(&config, &params, U256::from(ONE_ETH));

        // unrelated transfer mines another block
        assert!(chain.send_value(Address::repeat_byte(0x11), U256::from(5)).unwrap());
        let second_block = chain.latest_block().unwrap();
        assert_eq!(second_block, first_block + 1);

        let at = |block| {
            let inputs = prepare_burn_inputs(&chain, burn_key, &params, &config, &circuit, block, 0).unwrap();
            check_burn(inputs, config.clone(), circuit.clone()).unwrap()
        };
        let first = at(first_block);
        let second = at(second_block);

        assert_eq!(first.nullifier, second.nullifier);
        assert_ne!(first.block_root, second.block_root);
        assert_ne!(first.commitment, second.commitment);
    }

    #[test]
    fn test_unfunded_address_has_no_proof() {
        let config = ProtocolConfig::default();
        let circuit = CircuitParams::default();
        let params = burn_params(&config);
        let (chain, burn_key, block) = burn_on_chain(&config, &params, U256::from(ONE_ETH));

        // the genesis trie does not contain the burn address
        assert!(prepare_burn_inputs(&chain, burn_key, &params, &config, &circuit, 0, 0).is_err());
        assert!(prepare_burn_inputs(&chain, burn_key, &params, &config, &circuit, block + 1, 0).is_err());
    }

    #[test]
    fn test_header_from_another_block_is_rejected() {
        let config = ProtocolConfig::default();
        let circuit = CircuitParams::default();
        let params = burn_params(&config);
        let (chain, burn_key, block) = burn_on_chain(&config, &params, U256::from(ONE_ETH));

        let mut inputs = prepare_burn_inputs(&chain, burn_key, &params, &config, &circuit, block, 0).unwrap();
        inputs.block_header = chain.get_block_header(0).unwrap().encode().unwrap();
        let err = check_burn(inputs, config, circuit).unwrap_err();
        assert!(matches!(err, ProofOfBurnError::Mpt(_)));
        assert_eq!(err.kind(), ErrorKind::HashMismatch);
    }
}

#[cfg(test)]
mod fixture_replay_tests {
    use super::*;

    #[test]
    fn test_fixture_replays_local_chain() {
        let config = ProtocolConfig::default();
        let circuit = CircuitParams::default();
        let params = burn_params(&config);
        let (chain, burn_key, block) = burn_on_chain(&config, &params, U256::from(2 * ONE_ETH));
        let address = derive_burn_address(burn_key, &params, &config).unwrap();

        let fixture = chain.fixture(block, &[address]).unwrap();
        let json = serde_json::to_string_pretty(&fixture).unwrap();
        let source = FixtureSource::from_json(&json).unwrap();

        let live = prepare_burn_inputs(&chain, burn_key, &params, &config, &circuit, block, 0).unwrap();
        let replayed = prepare_burn_inputs(&source, burn_key, &params, &config, &circuit, block, 0).unwrap();
        assert_eq!(replayed.block_header, live.block_header);
        assert_eq!(replayed.proof, live.proof);

        let live = check_burn(live, config.clone(), circuit.clone()).unwrap();
        let replayed = check_burn(replayed, config, circuit).unwrap();
        assert_eq!(live, replayed);
    }

    #[test]
    fn test_fixture_without_block_fails() {
        let source = FixtureSource::from_json(r#"{"blocks": []}"#).unwrap();
        assert!(source.get_block_header(1).is_err());
        assert!(source.get_account_proof(Address::ZERO, 1).is_err());
    }
}

#[cfg(test)]
mod witness_file_tests {
    use super::*;

    #[test]
    fn test_burn_witness_file_reverifies() {
        let config = ProtocolConfig::default();
        let circuit = CircuitParams::default();
        let params = burn_params(&config);
        let (chain, burn_key, block) = burn_on_chain(&config, &params, U256::from(ONE_ETH));

        let inputs = prepare_burn_inputs(&chain, burn_key, &params, &config, &circuit, block, 0).unwrap();
        let expected = check_burn(inputs.clone(), config.clone(), circuit.clone()).unwrap();

        let dir = temp_dir("burn-witness");
        let sink = JsonFileSink::new(&dir);
        let witness = BurnWitness::from_inputs(&inputs, &circuit).unwrap();
        sink.submit("proof_of_burn", &witness.to_json().unwrap()).unwrap();

        let json = std::fs::read_to_string(sink.path_for("proof_of_burn")).unwrap();
        let restored = BurnWitness::from_json(&json).unwrap().to_inputs().unwrap();
        assert_eq!(check_burn(restored, config, circuit).unwrap(), expected);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_spend_witness_file_reverifies() {
        let config = ProtocolConfig::default();
        let circuit = CircuitParams::default();
        let inputs = SpendInputs {
            burn_key: FieldElement::from(47109u64),
            balance: U256::from(ONE_ETH),
            withdrawn_balance: U256::from(ONE_ETH / 2),
            broadcaster_fee: U256::from(77),
            receiver: receiver(),
            extra_commitment: U256::ZERO,
        };
        let expected = check_spend(inputs.clone(), config.clone(), &circuit).unwrap();

        let dir = temp_dir("spend-witness");
        let sink = JsonFileSink::new(&dir);
        sink.submit("spend", &SpendWitness::from_inputs(&inputs).to_json().unwrap()).unwrap();

        let json = std::fs::read_to_string(dir.join("spend_input.json")).unwrap();
        let restored = SpendWitness::from_json(&json).unwrap().to_inputs().unwrap();
        assert_eq!(check_spend(restored, config, &circuit).unwrap(), expected);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_sink_rejects_path_names() {
        let sink = JsonFileSink::new(temp_dir("sink-names"));
        assert!(sink.submit("../escape", "{}").is_err());
        assert!(sink.submit("", "{}").is_err());
    }
}
