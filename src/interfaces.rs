//! Boundaries to the outside world.
//!
//! The burn flow needs an Ethereum node for account proofs and headers, a
//! wallet that sends the burn transaction and a proving toolchain that takes
//! circuit inputs. Each is a narrow trait so the flow runs against fixtures
//! or [`LocalChain`] without a network.

use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::circuits::ProofOfBurnInputs;
use crate::config::{CircuitParams, ProtocolConfig};
use crate::constants::circuit_params::EMPTY_STORAGE_ROOT;
use crate::field::FieldElement;
use crate::utils::burn_address::{burn_address_hash, derive_burn_address, BurnParams};
use crate::utils::header::BlockHeader;
use crate::utils::keccak::keccak256;
use crate::utils::mpt::{verify_account_proof, AccountProof};
use crate::utils::rlp::Account;
use crate::utils::serde_decimal;
use crate::utils::trie::StateTrie;

/// Result of an `eth_getProof`-style query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountProofResponse {
    /// Trie nodes from the state root down to the account leaf
    pub layers: Vec<Vec<u8>>,
    pub balance: U256,
}

pub trait ProofSource {
    fn get_account_proof(&self, address: Address, block: u64) -> Result<AccountProofResponse>;

    fn get_block_header(&self, block: u64) -> Result<BlockHeader>;
}

pub trait TransactionBroadcaster {
    /// Send `amount` wei to `to`; `true` once the transfer is confirmed.
    fn send_value(&self, to: Address, amount: U256) -> Result<bool>;
}

/// Consumer of circuit inputs, e.g. a witness generator or prover.
pub trait CircuitSink {
    fn submit(&self, circuit_name: &str, witness_json: &str) -> Result<()>;
}

/// Fetch the proof and header for a burn and assemble the circuit inputs.
///
/// The proof is verified against the header here as well; the leaf key
/// length it reports becomes `numLeafAddressNibbles`.
pub fn prepare_burn_inputs(
    source: &dyn ProofSource,
    burn_key: FieldElement,
    params: &BurnParams,
    config: &ProtocolConfig,
    circuit: &CircuitParams,
    block: u64,
    byte_security_relax: usize,
) -> Result<ProofOfBurnInputs> {
    let address = derive_burn_address(burn_key, params, config)?;
    let header = source.get_block_header(block)?;
    let response = source.get_account_proof(address, block)?;

    let proof = AccountProof::new(response.layers);
    let account = verify_account_proof(&proof, &header.state_root.0, &burn_address_hash(&address), circuit)
        .with_context(|| format!("Account proof for {address} at block {block} does not verify"))?;
    if account.balance != response.balance {
        bail!("Source reports balance {} but the proof shows {}", response.balance, account.balance);
    }
    debug!(
        "Burn address {address} holds {} wei at block {block}, leaf key {} nibbles",
        account.balance, account.leaf_key_nibbles
    );

    Ok(ProofOfBurnInputs {
        burn_key,
        balance: account.balance,
        params: params.clone(),
        proof: proof.padded_to(circuit.max_num_layers),
        block_header: header.encode()?,
        num_leaf_address_nibbles: account.leaf_key_nibbles,
        byte_security_relax,
    })
}

/// Recorded chain data for offline runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    pub blocks: Vec<FixtureBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureBlock {
    pub number: u64,
    pub header: BlockHeader,
    #[serde(default)]
    pub accounts: Vec<FixtureAccount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureAccount {
    pub address: Address,
    #[serde(with = "serde_decimal")]
    pub balance: U256,
    pub account_proof: Vec<Bytes>,
}

/// [`ProofSource`] backed by a JSON fixture
#[derive(Debug, Clone)]
pub struct FixtureSource {
    fixture: Fixture,
}

impl FixtureSource {
    pub fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let fixture: Fixture = serde_json::from_str(json).context("Failed to parse fixture")?;
        Ok(Self::new(fixture))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&json)
    }

    fn block(&self, number: u64) -> Result<&FixtureBlock> {
        self.fixture
            .blocks
            .iter()
            .find(|b| b.number == number)
            .ok_or_else(|| anyhow!("Block {number} is not in the fixture"))
    }
}

impl ProofSource for FixtureSource {
    fn get_account_proof(&self, address: Address, block: u64) -> Result<AccountProofResponse> {
        let account = self
            .block(block)?
            .accounts
            .iter()
            .find(|a| a.address == address)
            .ok_or_else(|| anyhow!("No proof for {address} at block {block}"))?;
        Ok(AccountProofResponse {
            layers: account.account_proof.iter().map(|node| node.to_vec()).collect(),
            balance: account.balance,
        })
    }

    fn get_block_header(&self, block: u64) -> Result<BlockHeader> {
        Ok(self.block(block)?.header.clone())
    }
}

/// Writes `<circuit>_input.json` files into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, circuit_name: &str) -> PathBuf {
        self.dir.join(format!("{circuit_name}_input.json"))
    }
}

impl CircuitSink for JsonFileSink {
    fn submit(&self, circuit_name: &str, witness_json: &str) -> Result<()> {
        if circuit_name.is_empty() || circuit_name.contains(['/', '\\']) {
            bail!("Invalid circuit name {circuit_name:?}");
        }
        fs::create_dir_all(&self.dir).with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(circuit_name);
        fs::write(&path, witness_json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {circuit_name} input to {}", path.display());
        Ok(())
    }
}

struct Snapshot {
    header: BlockHeader,
    trie: StateTrie,
    balances: BTreeMap<Address, U256>,
}

/// In-memory devnet. Every transfer mines a block whose header commits to
/// the state trie of all balances, so proofs fetched from it verify exactly
/// like mainnet proofs.
pub struct LocalChain {
    blocks: Mutex<Vec<Snapshot>>,
}

impl LocalChain {
    /// Genesis block with `filler_accounts` unrelated accounts, which give
    /// the trie some depth.
    pub fn new(filler_accounts: usize) -> Result<Self> {
        let balances: BTreeMap<Address, U256> = (0..filler_accounts as u64)
            .map(|i| {
                let seed = keccak256(&i.to_be_bytes());
                (Address::from_slice(&seed[12..]), U256::from(1_000_000 + i))
            })
            .collect();
        let genesis = seal(None, balances)?;
        Ok(Self { blocks: Mutex::new(vec![genesis]) })
    }

    pub fn latest_block(&self) -> Result<u64> {
        let blocks = self.lock()?;
        Ok(blocks.len() as u64 - 1)
    }

    pub fn balance(&self, address: Address, block: u64) -> Result<U256> {
        let blocks = self.lock()?;
        let snapshot = get_block(&blocks, block)?;
        Ok(snapshot.balances.get(&address).copied().unwrap_or_default())
    }

    /// Export proofs for `addresses` at `block` as a fixture.
    pub fn fixture(&self, block: u64, addresses: &[Address]) -> Result<Fixture> {
        let accounts = addresses
            .iter()
            .map(|&address| {
                let response = self.get_account_proof(address, block)?;
                Ok(FixtureAccount {
                    address,
                    balance: response.balance,
                    account_proof: response.layers.into_iter().map(Bytes::from).collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Fixture {
            blocks: vec![FixtureBlock { number: block, header: self.get_block_header(block)?, accounts }],
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Snapshot>>> {
        self.blocks.lock().map_err(|_| anyhow!("Local chain state is poisoned"))
    }
}

fn get_block(blocks: &[Snapshot], number: u64) -> Result<&Snapshot> {
    usize::try_from(number)
        .ok()
        .and_then(|i| blocks.get(i))
        .ok_or_else(|| anyhow!("Block {number} does not exist, head is {}", blocks.len().saturating_sub(1)))
}

/// Build the next block on top of `parent`.
fn seal(parent: Option<&Snapshot>, balances: BTreeMap<Address, U256>) -> Result<Snapshot> {
    let mut trie = StateTrie::new();
    for (address, balance) in &balances {
        trie.insert_account(*address, &Account::burn_account(*balance));
    }

    let (parent_hash, number) = match parent {
        Some(p) => {
            let hash = p.header.hash().context("Failed to hash the parent header")?;
            (hash, p.header.number + U256::from(1))
        }
        None => (B256::ZERO, U256::ZERO),
    };
    let header = BlockHeader {
        parent_hash,
        state_root: B256::from(trie.root()?),
        transactions_root: B256::from(EMPTY_STORAGE_ROOT),
        receipts_root: B256::from(EMPTY_STORAGE_ROOT),
        logs_bloom: Bytes::from(vec![0u8; 256]),
        number,
        gas_limit: U256::from(30_000_000u64),
        timestamp: U256::from(1_700_000_000u64) + number * U256::from(12),
        base_fee_per_gas: Some(U256::from(7)),
        withdrawals_root: Some(B256::from(EMPTY_STORAGE_ROOT)),
        ..Default::default()
    };
    Ok(Snapshot { header, trie, balances })
}

impl ProofSource for LocalChain {
    fn get_account_proof(&self, address: Address, block: u64) -> Result<AccountProofResponse> {
        let blocks = self.lock()?;
        let snapshot = get_block(&blocks, block)?;
        let layers = snapshot.trie.account_proof(address)?;
        debug!("Account proof for {address} at block {block}: {} layers", layers.len());
        Ok(AccountProofResponse {
            layers,
            balance: snapshot.balances.get(&address).copied().unwrap_or_default(),
        })
    }

    fn get_block_header(&self, block: u64) -> Result<BlockHeader> {
        let blocks = self.lock()?;
        Ok(get_block(&blocks, block)?.header.clone())
    }
}

impl TransactionBroadcaster for LocalChain {
    fn send_value(&self, to: Address, amount: U256) -> Result<bool> {
        let mut blocks = self.lock()?;
        let parent = blocks.last().ok_or_else(|| anyhow!("Local chain has no genesis block"))?;

        let mut balances = parent.balances.clone();
        let entry = balances.entry(to).or_default();
        let Some(credited) = entry.checked_add(amount) else {
            return Ok(false);
        };
        *entry = credited;

        let next = seal(Some(parent), balances)?;
        info!("Block {}: sent {amount} wei to {to}", next.header.number);
        blocks.push(next);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_chain_proofs_verify() {
        let chain = LocalChain::new(32).unwrap();
        let target = Address::repeat_byte(0xab);
        assert!(chain.send_value(target, U256::from(5000)).unwrap());
        assert_eq!(chain.latest_block().unwrap(), 1);

        let header = chain.get_block_header(1).unwrap();
        let response = chain.get_account_proof(target, 1).unwrap();
        assert_eq!(response.balance, U256::from(5000));

        let account = verify_account_proof(
            &AccountProof::new(response.layers),
            &header.state_root.0,
            &keccak256(target.as_slice()),
            &CircuitParams::default(),
        )
        .unwrap();
        assert_eq!(account.balance, U256::from(5000));
    }

    #[test]
    fn test_blocks_are_chained() {
        let chain = LocalChain::new(4).unwrap();
        chain.send_value(Address::repeat_byte(1), U256::from(1)).unwrap();
        chain.send_value(Address::repeat_byte(1), U256::from(2)).unwrap();

        let genesis = chain.get_block_header(0).unwrap();
        let first = chain.get_block_header(1).unwrap();
        let second = chain.get_block_header(2).unwrap();
        assert_eq!(first.parent_hash, genesis.hash().unwrap());
        assert_eq!(second.parent_hash, first.hash().unwrap());
        assert_eq!(chain.balance(Address::repeat_byte(1), 2).unwrap(), U256::from(3));
        assert_eq!(chain.balance(Address::repeat_byte(1), 0).unwrap(), U256::ZERO);
        assert!(chain.get_block_header(3).is_err());
    }

    #[test]
    fn test_seal_rejects_unencodable_parent() {
        let mut parent = seal(None, BTreeMap::new()).unwrap();
        parent.header.logs_bloom = Bytes::new();

        let err = seal(Some(&parent), BTreeMap::new()).err().unwrap();
        assert!(format!("{err:#}").contains("logsBloom"));
    }

    #[test]
    fn test_fixture_source_replays_local_chain() {
        let chain = LocalChain::new(8).unwrap();
        let target = Address::repeat_byte(0x42);
        chain.send_value(target, U256::from(77)).unwrap();

        let fixture = chain.fixture(1, &[target]).unwrap();
        let json = serde_json::to_string(&fixture).unwrap();
        let source = FixtureSource::from_json(&json).unwrap();

        assert_eq!(source.get_account_proof(target, 1).unwrap(), chain.get_account_proof(target, 1).unwrap());
        assert_eq!(source.get_block_header(1).unwrap(), chain.get_block_header(1).unwrap());
        assert!(source.get_block_header(2).is_err());
        assert!(source.get_account_proof(Address::ZERO, 1).is_err());
    }

    #[test]
    fn test_json_file_sink() {
        let dir = std::env::temp_dir().join(format!("pob-sink-{}", std::process::id()));
        let sink = JsonFileSink::new(&dir);
        sink.submit("spend", "{}").unwrap();
        assert_eq!(fs::read_to_string(sink.path_for("spend")).unwrap(), "{}");
        assert!(sink.submit("../escape", "{}").is_err());
        fs::remove_dir_all(&dir).ok();
    }
}
