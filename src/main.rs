//! Proof of Burn reference model
//!
//! Command line front end: burn key search, burn addresses, circuit input
//! generation and local verification of burn and spend witnesses.

use alloy_primitives::{Address, U256};
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use log::info;
use proof_of_burn_model::{
    circuits::{check_burn, check_spend, SpendInputs},
    config::{CircuitParams, ProtocolConfig, ProtocolVersion, PublicInput, SpendCommitmentField},
    constants::POSEIDON_PREFIX_STR,
    error::Verdict,
    field::FieldElement,
    interfaces::{prepare_burn_inputs, CircuitSink, FixtureSource, JsonFileSink, LocalChain, TransactionBroadcaster},
    utils::{
        burn_address::{burn_address_hash, derive_burn_address, BurnParams},
        pow::{find_burn_key, find_burn_key_parallel, SearchOptions},
        serde_decimal,
    },
    witness::{BurnWitness, SpendWitness},
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "pob",
    about = "Reference model for EIP-7503 proof-of-burn",
    version,
    long_about = r#"Off-circuit model of the proof-of-burn and spend circuits.

Finds burn keys that satisfy the proof-of-work, derives burn addresses,
assembles circuit inputs from an account proof and a block header, and
checks burn and spend witnesses exactly as the circuits would.

Protocol revisions differ in which public values the burn address binds;
select one with --protocol (v1..v4, default v4)."#
)]
struct Cli {
    /// Protocol revision
    #[arg(long, global = true, default_value_t = ProtocolVersion::V4)]
    protocol: ProtocolVersion,

    /// JSON file overriding circuit limits (maxNumLayers, amountBytes, ...)
    #[arg(long, global = true, value_name = "FILE")]
    params: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Public values a burn is bound to
#[derive(Args, Clone)]
struct BurnArgs {
    /// Address that receives the minted funds
    #[arg(long, default_value_t = Address::ZERO)]
    receiver: Address,

    /// Prover fee in wei
    #[arg(long, default_value = "0", value_parser = serde_decimal::parse)]
    prover_fee: U256,

    /// Broadcaster fee in wei
    #[arg(long, default_value = "0", value_parser = serde_decimal::parse)]
    broadcaster_fee: U256,

    /// Amount revealed by the burn proof, in wei
    #[arg(long, default_value = "0", value_parser = serde_decimal::parse)]
    reveal: U256,

    /// Extra commitment bound into the PoW and commitment
    #[arg(long, default_value = "0", value_parser = serde_decimal::parse)]
    extra: U256,
}

impl BurnArgs {
    fn to_params(&self) -> BurnParams {
        BurnParams {
            receiver: self.receiver,
            prover_fee: self.prover_fee,
            broadcaster_fee: self.broadcaster_fee,
            reveal_amount: self.reveal,
            extra_commitment: self.extra,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a burn key that satisfies the proof-of-work
    #[command(long_about = r#"Search for a burn key whose PoW tag starts with enough zero bytes.

The search starts at a random field element (or --start) and increments
until keccak(burnKey || bound values || "EIP-7503") has the required
number of leading zero bytes. With --workers > 1 the key space is split
into disjoint shards and the first worker to succeed stops the rest."#)]
    FindKey {
        #[command(flatten)]
        burn: BurnArgs,

        /// Required leading zero bytes (defaults to the circuit's PoW minimum)
        #[arg(long)]
        min_zero_bytes: Option<usize>,

        /// First candidate, decimal
        #[arg(long)]
        start: Option<FieldElement>,

        /// Give up after this many candidates
        #[arg(long)]
        max_attempts: Option<u64>,

        /// Worker threads
        #[arg(long, default_value_t = 1)]
        workers: usize,
    },

    /// Derive the burn address for a burn key
    Address {
        #[arg(long)]
        burn_key: FieldElement,

        #[command(flatten)]
        burn: BurnArgs,
    },

    /// Assemble and check the proof-of-burn circuit input
    #[command(long_about = r#"Assemble the proof-of-burn circuit input.

Reads the account proof and block header from a fixture file, checks every
circuit constraint, and writes proof_of_burn_input.json to the output
directory. Prints the public outputs on success."#)]
    GenerateBurn {
        /// Fixture with headers and account proofs
        #[arg(short, long, value_name = "FILE")]
        fixture: PathBuf,

        #[arg(long)]
        block: u64,

        #[arg(long)]
        burn_key: FieldElement,

        #[command(flatten)]
        burn: BurnArgs,

        /// Trade leaf nibbles for PoW bytes
        #[arg(long, default_value_t = 0)]
        byte_security_relax: usize,

        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },

    /// Assemble and check the spend circuit input
    GenerateSpend {
        #[arg(long)]
        burn_key: FieldElement,

        /// Balance of the coin being spent
        #[arg(long, value_parser = serde_decimal::parse)]
        balance: U256,

        #[arg(long, value_parser = serde_decimal::parse)]
        withdrawn: U256,

        #[arg(long, default_value = "0", value_parser = serde_decimal::parse)]
        broadcaster_fee: U256,

        #[arg(long, default_value_t = Address::ZERO)]
        receiver: Address,

        #[arg(long, default_value = "0", value_parser = serde_decimal::parse)]
        extra: U256,

        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },

    /// Check a circuit input file and print the verdict
    Verify {
        /// Circuit input JSON
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// "burn" or "spend"
        #[arg(short = 't', long, value_name = "TYPE")]
        circuit: String,
    },

    /// Burn and spend end to end on an in-memory chain
    Demo {
        /// Burnt amount in wei
        #[arg(long, default_value = "1000000000000000000", value_parser = serde_decimal::parse)]
        amount: U256,

        /// Write the circuit inputs and a fixture here
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[arg(long, default_value_t = 4)]
        workers: usize,
    },

    /// Show circuit parameters and the selected protocol revision
    Info,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = cli.protocol.config();
    let params = load_params(cli.params.as_deref())?;

    match cli.command {
        Commands::FindKey { burn, min_zero_bytes, start, max_attempts, workers } => {
            let min = min_zero_bytes.unwrap_or(params.pow_minimum_zero_bytes);
            find_key(&burn.to_params(), &config, min, SearchOptions { start, max_attempts }, workers)?;
        }
        Commands::Address { burn_key, burn } => {
            let address = derive_burn_address(burn_key, &burn.to_params(), &config)?;
            println!("Burn address:      {address}");
            println!("Address hash:      0x{}", hex::encode(burn_address_hash(&address)));
        }
        Commands::GenerateBurn { fixture, block, burn_key, burn, byte_security_relax, output } => {
            let source = FixtureSource::from_file(&fixture)?;
            let inputs = prepare_burn_inputs(
                &source,
                burn_key,
                &burn.to_params(),
                &config,
                &params,
                block,
                byte_security_relax,
            )?;
            let witness = BurnWitness::from_inputs(&inputs, &params)?;
            let outputs = check_burn(inputs, config, params).context("Burn witness is rejected")?;
            JsonFileSink::new(output).submit("proof_of_burn", &witness.to_json()?)?;
            println!("{}", serde_json::to_string_pretty(&outputs)?);
        }
        Commands::GenerateSpend { burn_key, balance, withdrawn, broadcaster_fee, receiver, extra, output } => {
            let inputs = SpendInputs {
                burn_key,
                balance,
                withdrawn_balance: withdrawn,
                broadcaster_fee,
                receiver,
                extra_commitment: extra,
            };
            let witness = SpendWitness::from_inputs(&inputs);
            let outputs = check_spend(inputs, config, &params).context("Spend witness is rejected")?;
            JsonFileSink::new(output).submit("spend", &witness.to_json()?)?;
            println!("{}", serde_json::to_string_pretty(&outputs)?);
        }
        Commands::Verify { input, circuit } => {
            verify(&input, &circuit, config, params)?;
        }
        Commands::Demo { amount, output, workers } => {
            demo(amount, output.as_deref(), workers, config, params)?;
        }
        Commands::Info => {
            show_system_info(&config, &params);
        }
    }

    Ok(())
}

fn load_params(path: Option<&Path>) -> anyhow::Result<CircuitParams> {
    let Some(path) = path else {
        return Ok(CircuitParams::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read params file: {}", path.display()))?;
    CircuitParams::from_json(&json).with_context(|| format!("Invalid params file: {}", path.display()))
}

fn find_key(
    params: &BurnParams,
    config: &ProtocolConfig,
    min_zero_bytes: usize,
    options: SearchOptions,
    workers: usize,
) -> anyhow::Result<()> {
    info!("Searching for a burn key with {min_zero_bytes} leading zero bytes");
    let solution = if workers > 1 {
        find_burn_key_parallel(params, config, min_zero_bytes, &options, workers)
    } else {
        find_burn_key(params, config, min_zero_bytes, &options)
    };
    let Some(solution) = solution else {
        bail!("No burn key found within the attempt budget");
    };

    let address = derive_burn_address(solution.burn_key, params, config)?;
    println!("Burn key:          {}", solution.burn_key);
    println!("PoW hash:          0x{}", hex::encode(solution.hash));
    println!("Attempts:          {}", solution.attempts);
    println!("Burn address:      {address}");
    Ok(())
}

fn verify(input: &Path, circuit: &str, config: ProtocolConfig, params: CircuitParams) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;

    let (verdict, outputs) = match circuit {
        "burn" => {
            let inputs = BurnWitness::from_json(&json)?.to_inputs()?;
            let result = check_burn(inputs, config, params);
            let outputs = result.as_ref().ok().map(serde_json::to_value).transpose()?;
            if let Err(e) = &result {
                info!("Rejected: {e}");
            }
            (Verdict::from_result(&result), outputs)
        }
        "spend" => {
            let inputs = SpendWitness::from_json(&json)?.to_inputs()?;
            let result = check_spend(inputs, config, &params);
            let outputs = result.as_ref().ok().map(serde_json::to_value).transpose()?;
            if let Err(e) = &result {
                info!("Rejected: {e}");
            }
            (Verdict::from_result(&result), outputs)
        }
        other => bail!("Unsupported circuit: {other}. Supported circuits: 'burn', 'spend'"),
    };

    println!("{verdict}");
    if let Some(outputs) = outputs {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
    }
    if !verdict.is_accept() {
        bail!("{circuit} witness rejected");
    }
    Ok(())
}

fn demo(
    amount: U256,
    output: Option<&Path>,
    workers: usize,
    config: ProtocolConfig,
    params: CircuitParams,
) -> anyhow::Result<()> {
    let chain = LocalChain::new(64)?;
    let receiver = Address::repeat_byte(0x90);

    // fees and reveal out of the burnt amount; fees the revision does not bind stay zero
    let tenth = amount / U256::from(10);
    let mut burn = BurnParams::new(receiver).with_reveal_amount(tenth).with_extra_commitment(U256::from(345));
    if config.binds(PublicInput::ProverFee) {
        burn.prover_fee = U256::from(1_000);
    }
    if config.binds(PublicInput::BroadcasterFee) {
        burn.broadcaster_fee = U256::from(500);
    }

    println!("1. Searching burn key ({} zero bytes, {workers} workers)", params.pow_minimum_zero_bytes);
    let solution = find_burn_key_parallel(&burn, &config, params.pow_minimum_zero_bytes, &SearchOptions::default(), workers)
        .context("PoW search ended without a key")?;
    let address = derive_burn_address(solution.burn_key, &burn, &config)?;
    println!("   burn key {} after {} attempts", solution.burn_key, solution.attempts);

    println!("2. Burning {amount} wei to {address}");
    if !chain.send_value(address, amount)? {
        bail!("Burn transfer was not confirmed");
    }
    let block = chain.latest_block()?;

    println!("3. Proving the burn at block {block}");
    let inputs = prepare_burn_inputs(&chain, solution.burn_key, &burn, &config, &params, block, 0)?;
    let burn_witness = BurnWitness::from_inputs(&inputs, &params)?;
    let burn_outputs = check_burn(inputs, config.clone(), params.clone())?;
    println!("   commitment {}", burn_outputs.commitment);
    println!("   nullifier  {}", burn_outputs.nullifier);

    let coin_balance = amount - burn.prover_fee - burn.broadcaster_fee - burn.reveal_amount;
    let spend_fee = if config.spend_binds(SpendCommitmentField::BroadcasterFee) {
        U256::from(100)
    } else {
        U256::ZERO
    };
    let spend = SpendInputs {
        burn_key: solution.burn_key,
        balance: coin_balance,
        withdrawn_balance: coin_balance / U256::from(2),
        broadcaster_fee: spend_fee,
        receiver,
        extra_commitment: U256::from(345),
    };
    println!("4. Spending {} of {coin_balance} wei", spend.withdrawn_balance);
    let spend_witness = SpendWitness::from_inputs(&spend);
    let spend_outputs = check_spend(spend, config, &params)?;
    if spend_outputs.coin != burn_outputs.remaining_coin {
        bail!("Spent coin does not match the coin minted by the burn");
    }
    println!("   commitment {}", spend_outputs.commitment);
    println!("   {} wei left in the remaining coin", spend_outputs.remaining_balance);

    if let Some(dir) = output {
        let sink = JsonFileSink::new(dir);
        sink.submit("proof_of_burn", &burn_witness.to_json()?)?;
        sink.submit("spend", &spend_witness.to_json()?)?;
        let fixture = chain.fixture(block, &[address])?;
        let path = dir.join("fixture.json");
        std::fs::write(&path, serde_json::to_string_pretty(&fixture)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("5. Wrote circuit inputs and fixture to {}", dir.display());
    }
    Ok(())
}

fn show_system_info(config: &ProtocolConfig, params: &CircuitParams) {
    println!("Proof of Burn - System Information");
    println!("==================================");
    println!();

    println!("Circuit Parameters:");
    println!("  Max MPT Layers:           {}", params.max_num_layers);
    println!("  Max Layer Bytes:          {}", params.max_layer_bytes());
    println!("  Max Header Bytes:         {}", params.max_header_bytes());
    println!("  Min Leaf Address Nibbles: {}", params.min_leaf_address_nibbles);
    println!("  Amount Bytes:             {}", params.amount_bytes);
    println!("  PoW Min Zero Bytes:       {}", params.pow_minimum_zero_bytes);
    println!("  Max Balance:              {} wei", params.max_balance);
    println!();

    println!("Protocol {}:", config.version);
    println!("  Address Inputs:           {:?}", config.address_inputs);
    println!("  Keccak Rehash:            {}", config.keccak_rehash);
    println!("  Address Bytes:            {:?}", config.address_bytes);
    println!("  PoW Inputs:               {:?}", config.pow_inputs);
    println!("  Burn Commitment:          {:?}", config.burn_commitment);
    println!("  Spend Commitment:         {:?}", config.spend_commitment);
    println!();

    println!("Cryptographic Parameters:");
    println!("  Field:                    BN254 scalar field");
    println!("  Hash Function:            Poseidon (circom parameters)");
    println!("  Ethereum Hash:            Keccak256");
    println!("  Poseidon Prefix:          {POSEIDON_PREFIX_STR}");
    println!();

    println!("Security Analysis:");
    println!(
        "  Address Hash Security:    {} bits ({} nibbles)",
        4 * params.min_leaf_address_nibbles,
        params.min_leaf_address_nibbles
    );
    println!(
        "  PoW Additional Security:  {} bits ({} zero bytes)",
        8 * params.pow_minimum_zero_bytes,
        params.pow_minimum_zero_bytes
    );
}
