// In-memory secure state trie
// Accounts are kept under their keccak'd address and committed into an
// `eth_trie` Merkle-Patricia trie whenever a root or a proof is requested,
// so the nodes are the ones an Ethereum client would serve.

use alloy_primitives::Address;
use eth_trie::{EthTrie, MemoryDB, Trie};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::utils::keccak::keccak256;
use crate::utils::rlp::Account;

#[derive(Debug, Clone, Default)]
pub struct StateTrie {
    entries: BTreeMap<[u8; 32], Vec<u8>>,
}

impl StateTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw value under an already hashed key.
    pub fn insert(&mut self, key: [u8; 32], value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    pub fn insert_account(&mut self, address: Address, account: &Account) {
        self.insert(keccak256(address.as_slice()), account.encode());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn root(&self) -> Result<[u8; 32], TrieError> {
        let mut trie = self.commit()?;
        Ok(trie.root_hash().map_err(TrieError::backend)?.0)
    }

    /// Nodes on the path to `key`, root first. Embedded nodes are part of
    /// their parent and never appear on their own.
    pub fn proof(&self, key: &[u8; 32]) -> Result<Vec<Vec<u8>>, TrieError> {
        let mut trie = self.commit()?;
        trie.root_hash().map_err(TrieError::backend)?;
        trie.get_proof(key).map_err(TrieError::backend)
    }

    pub fn account_proof(&self, address: Address) -> Result<Vec<Vec<u8>>, TrieError> {
        self.proof(&keccak256(address.as_slice()))
    }

    fn commit(&self) -> Result<EthTrie<MemoryDB>, TrieError> {
        let mut trie = EthTrie::new(Arc::new(MemoryDB::new(true)));
        for (key, value) in &self.entries {
            trie.insert(key, value).map_err(TrieError::backend)?;
        }
        Ok(trie)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrieError {
    #[error("{0}")]
    Backend(String),
}

impl TrieError {
    fn backend(err: impl std::fmt::Display) -> Self {
        TrieError::Backend(err.to_string())
    }
}
