use std::collections::{HashMap, HashSet};

use crate::common::{address::Address, word::Word};

#[derive(Debug)]
enum Entry {
    WarmAccount(Address),
    WarmSlot(Address, Word),
    Transient(Address, Word, Word),
    Touched(Address),
    Created(Address),
}

/// Transaction-scoped bookkeeping that is not part of the state trie:
/// EIP-2929 access sets, EIP-1153 transient storage, EIP-161 touched
/// accounts and contracts created in this transaction.
///
/// Checkpoints follow the same discipline as [`crate::state::State`].
/// Original storage values (EIP-2200) never change within a transaction
/// and are kept outside the journal.
#[derive(Debug, Default)]
pub struct Substate {
    warm_accounts: HashSet<Address>,
    warm_slots: HashSet<(Address, Word)>,
    transient: HashMap<(Address, Word), Word>,
    touched: HashSet<Address>,
    created: HashSet<Address>,
    original: HashMap<(Address, Word), Word>,
    journal: Vec<Entry>,
    checkpoints: Vec<usize>,
}

impl Substate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the account warm; returns true when it was cold.
    pub fn access_account(&mut self, address: &Address) -> bool {
        let cold = self.warm_accounts.insert(*address);
        if cold {
            self.record(Entry::WarmAccount(*address));
        }
        cold
    }

    /// Marks the slot warm; returns true when it was cold.
    pub fn access_slot(&mut self, address: &Address, key: &Word) -> bool {
        let cold = self.warm_slots.insert((*address, *key));
        if cold {
            self.record(Entry::WarmSlot(*address, *key));
        }
        cold
    }

    pub fn is_warm(&self, address: &Address) -> bool {
        self.warm_accounts.contains(address)
    }

    pub fn tload(&self, address: &Address, key: &Word) -> Word {
        self.transient
            .get(&(*address, *key))
            .copied()
            .unwrap_or_default()
    }

    pub fn tstore(&mut self, address: &Address, key: &Word, value: Word) {
        let prev = self.tload(address, key);
        if prev == value {
            return;
        }
        self.record(Entry::Transient(*address, *key, prev));
        if value.is_zero() {
            self.transient.remove(&(*address, *key));
        } else {
            self.transient.insert((*address, *key), value);
        }
    }

    pub fn touch(&mut self, address: &Address) {
        if self.touched.insert(*address) {
            self.record(Entry::Touched(*address));
        }
    }

    pub fn touched(&self) -> impl Iterator<Item = &Address> {
        self.touched.iter()
    }

    pub fn mark_created(&mut self, address: &Address) {
        if self.created.insert(*address) {
            self.record(Entry::Created(*address));
        }
    }

    pub fn is_created(&self, address: &Address) -> bool {
        self.created.contains(address)
    }

    /// Value of the slot at the start of the transaction; `current` is
    /// remembered as the original on first access.
    pub fn original(&mut self, address: &Address, key: &Word, current: Word) -> Word {
        *self.original.entry((*address, *key)).or_insert(current)
    }

    fn record(&mut self, entry: Entry) {
        if !self.checkpoints.is_empty() {
            self.journal.push(entry);
        }
    }

    pub fn begin(&mut self) {
        self.checkpoints.push(self.journal.len());
    }

    pub fn commit(&mut self) {
        self.checkpoints.pop();
        if self.checkpoints.is_empty() {
            self.journal.clear();
        }
    }

    pub fn rollback(&mut self) {
        let Some(mark) = self.checkpoints.pop() else {
            return;
        };
        while self.journal.len() > mark {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry {
                Entry::WarmAccount(address) => {
                    self.warm_accounts.remove(&address);
                }
                Entry::WarmSlot(address, key) => {
                    self.warm_slots.remove(&(address, key));
                }
                Entry::Transient(address, key, prev) => {
                    if prev.is_zero() {
                        self.transient.remove(&(address, key));
                    } else {
                        self.transient.insert((address, key), prev);
                    }
                }
                Entry::Touched(address) => {
                    self.touched.remove(&address);
                }
                Entry::Created(address) => {
                    self.created.remove(&address);
                }
            }
        }
    }

    /// Forgets everything: called between transactions.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
