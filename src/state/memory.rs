use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::common::{account::Account, address::Address, word::Word};
use crate::state::{State, trie};

#[derive(Debug)]
enum Entry {
    Account(Address, Option<Account>),
    Storage(Address, Word, Word),
    Destroyed(Address, Option<Account>, HashMap<Word, Word>),
}

/// In-memory state with an undo journal.
///
/// Changes are journaled only while a checkpoint is open; the outermost
/// commit discards the journal.
#[derive(Debug, Default)]
pub struct MemoryState {
    accounts: HashMap<Address, Account>,
    storage: HashMap<Address, HashMap<Word, Word>>,
    journal: Vec<Entry>,
    checkpoints: Vec<usize>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account, bypassing the journal.
    pub fn insert(&mut self, address: Address, account: Account, storage: BTreeMap<Word, Word>) {
        self.accounts.insert(address, account);
        let storage = storage
            .into_iter()
            .filter(|(_, value)| !value.is_zero())
            .collect::<HashMap<_, _>>();
        if storage.is_empty() {
            self.storage.remove(&address);
        } else {
            self.storage.insert(address, storage);
        }
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    /// Non-zero slots of one account, sorted.
    pub fn storage_of(&self, address: &Address) -> BTreeMap<Word, Word> {
        self.storage
            .get(address)
            .map(|slots| slots.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default()
    }

    /// Number of open checkpoints.
    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }

    fn record(&mut self, entry: Entry) {
        if !self.checkpoints.is_empty() {
            self.journal.push(entry);
        }
    }

    fn save_account(&mut self, address: &Address) {
        let prev = self.accounts.get(address).cloned();
        self.record(Entry::Account(*address, prev));
    }

    fn account_mut(&mut self, address: &Address) -> &mut Account {
        self.save_account(address);
        self.accounts.entry(*address).or_default()
    }

    fn undo(&mut self, entry: Entry) {
        match entry {
            Entry::Account(address, Some(account)) => {
                self.accounts.insert(address, account);
            }
            Entry::Account(address, None) => {
                self.accounts.remove(&address);
            }
            Entry::Storage(address, key, prev) => {
                let slots = self.storage.entry(address).or_default();
                if prev.is_zero() {
                    slots.remove(&key);
                } else {
                    slots.insert(key, prev);
                }
                if slots.is_empty() {
                    self.storage.remove(&address);
                }
            }
            Entry::Destroyed(address, account, slots) => {
                if let Some(account) = account {
                    self.accounts.insert(address, account);
                }
                if !slots.is_empty() {
                    self.storage.insert(address, slots);
                }
            }
        }
    }
}

impl State for MemoryState {
    fn account(&self, address: &Address) -> Option<Account> {
        self.accounts.get(address).cloned()
    }

    fn storage(&self, address: &Address, key: &Word) -> Word {
        self.storage
            .get(address)
            .and_then(|slots| slots.get(key))
            .copied()
            .unwrap_or_default()
    }

    fn set_balance(&mut self, address: &Address, balance: Word) {
        self.account_mut(address).balance = balance;
    }

    fn set_nonce(&mut self, address: &Address, nonce: u64) {
        self.account_mut(address).nonce = nonce;
    }

    fn set_code(&mut self, address: &Address, code: Arc<[u8]>) {
        self.account_mut(address).code = code;
    }

    fn set_storage(&mut self, address: &Address, key: &Word, value: Word) {
        let prev = self.storage(address, key);
        if prev == value {
            return;
        }
        self.record(Entry::Storage(*address, *key, prev));
        let slots = self.storage.entry(*address).or_default();
        if value.is_zero() {
            slots.remove(key);
        } else {
            slots.insert(*key, value);
        }
        if slots.is_empty() {
            self.storage.remove(address);
        }
    }

    fn destroy(&mut self, address: &Address) {
        let account = self.accounts.remove(address);
        let slots = self.storage.remove(address).unwrap_or_default();
        self.record(Entry::Destroyed(*address, account, slots));
    }

    fn clear_storage(&mut self, address: &Address) {
        if let Some(slots) = self.storage.remove(address) {
            self.record(Entry::Destroyed(*address, None, slots));
        }
    }

    fn begin(&mut self) {
        self.checkpoints.push(self.journal.len());
        tracing::trace!(depth = self.checkpoints.len(), "state: begin");
    }

    fn commit(&mut self) {
        self.checkpoints.pop();
        if self.checkpoints.is_empty() {
            self.journal.clear();
        }
        tracing::trace!(depth = self.checkpoints.len(), "state: commit");
    }

    fn rollback(&mut self) {
        let Some(mark) = self.checkpoints.pop() else {
            return;
        };
        while self.journal.len() > mark {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        tracing::trace!(depth = self.checkpoints.len(), "state: rollback");
    }

    fn root(&self) -> [u8; 32] {
        trie::state_root(
            self.accounts
                .iter()
                .map(|(address, account)| (address, account, self.storage.get(address))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::address::addr;

    const A: Address = addr("0x00000000000000000000000000000000000000aa");
    const B: Address = addr("0x00000000000000000000000000000000000000bb");

    #[test]
    fn test_rollback_restores_everything() {
        let mut state = MemoryState::new();
        state.insert(A, Account::with_balance(Word::from(10u8)), BTreeMap::new());
        state.set_storage(&A, &Word::one(), Word::from(5u8));

        state.begin();
        state.transfer(&A, &B, Word::from(3u8));
        state.set_storage(&A, &Word::one(), Word::zero());
        state.set_storage(&A, &Word::from(2u8), Word::from(7u8));
        state.increment_nonce(&A);
        assert_eq!(state.balance(&B), Word::from(3u8));
        state.rollback();

        assert_eq!(state.balance(&A), Word::from(10u8));
        assert!(!state.exists(&B));
        assert_eq!(state.nonce(&A), 0);
        assert_eq!(state.storage(&A, &Word::one()), Word::from(5u8));
        assert_eq!(state.storage(&A, &Word::from(2u8)), Word::zero());
    }

    #[test]
    fn test_nested_checkpoints() {
        let mut state = MemoryState::new();
        state.begin();
        state.set_balance(&A, Word::from(1u8));
        state.begin();
        state.set_balance(&A, Word::from(2u8));
        state.begin();
        state.set_balance(&A, Word::from(3u8));
        assert_eq!(state.depth(), 3);
        state.rollback();
        assert_eq!(state.balance(&A), Word::from(2u8));
        state.commit();
        assert_eq!(state.balance(&A), Word::from(2u8));
        state.rollback();
        assert!(!state.exists(&A));
        assert_eq!(state.depth(), 0);
    }

    #[test]
    fn test_destroy_and_undo() {
        let mut state = MemoryState::new();
        state.insert(
            A,
            Account::new(1, Word::from(9u8), vec![0x00]),
            BTreeMap::from([(Word::one(), Word::one())]),
        );
        state.begin();
        state.destroy(&A);
        assert!(!state.exists(&A));
        assert_eq!(state.storage(&A, &Word::one()), Word::zero());
        state.rollback();
        assert_eq!(state.nonce(&A), 1);
        assert_eq!(state.storage(&A, &Word::one()), Word::one());
    }

    #[test]
    fn test_empty_accounts() {
        let mut state = MemoryState::new();
        assert!(state.is_empty(&A));
        state.touch(&A);
        assert!(state.exists(&A));
        assert!(state.is_empty(&A));
        state.set_nonce(&A, 1);
        assert!(!state.is_empty(&A));
    }
}
