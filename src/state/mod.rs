use std::sync::Arc;

use crate::common::{account::Account, address::Address, word::Word};

mod memory;
mod substate;
pub mod trie;

pub use memory::MemoryState;
pub use substate::Substate;

/// Account and storage database used by the executor.
///
/// Checkpoints nest: every `begin` is matched by exactly one `commit` or
/// `rollback`, and a rollback undoes every change since its `begin`.
pub trait State {
    /// `None` when the account does not exist.
    fn account(&self, address: &Address) -> Option<Account>;

    fn storage(&self, address: &Address, key: &Word) -> Word;

    /// Creates the account when missing.
    fn set_balance(&mut self, address: &Address, balance: Word);

    fn set_nonce(&mut self, address: &Address, nonce: u64);

    fn set_code(&mut self, address: &Address, code: Arc<[u8]>);

    fn set_storage(&mut self, address: &Address, key: &Word, value: Word);

    /// Removes the account together with its storage.
    fn destroy(&mut self, address: &Address);

    /// Drops the storage of an account about to be (re)created.
    fn clear_storage(&mut self, address: &Address);

    fn begin(&mut self);

    fn commit(&mut self);

    fn rollback(&mut self);

    /// Merkle-Patricia root of the whole state.
    fn root(&self) -> [u8; 32];

    fn exists(&self, address: &Address) -> bool {
        self.account(address).is_some()
    }

    /// Missing or EIP-161 empty.
    fn is_empty(&self, address: &Address) -> bool {
        self.account(address).is_none_or(|account| account.is_empty())
    }

    fn balance(&self, address: &Address) -> Word {
        self.account(address)
            .map(|account| account.balance)
            .unwrap_or_default()
    }

    fn nonce(&self, address: &Address) -> u64 {
        self.account(address)
            .map(|account| account.nonce)
            .unwrap_or_default()
    }

    fn code(&self, address: &Address) -> Arc<[u8]> {
        self.account(address)
            .map(|account| account.code)
            .unwrap_or_default()
    }

    fn increment_nonce(&mut self, address: &Address) {
        let nonce = self.nonce(address);
        self.set_nonce(address, nonce.saturating_add(1));
    }

    /// Brings a missing account into existence without changing it otherwise.
    fn touch(&mut self, address: &Address) {
        let balance = self.balance(address);
        self.set_balance(address, balance);
    }

    /// Moves `value` between accounts; the caller has checked the balance.
    fn transfer(&mut self, from: &Address, to: &Address, value: Word) {
        let from_balance = self.balance(from);
        self.set_balance(from, from_balance.saturating_sub(value));
        let to_balance = self.balance(to);
        self.set_balance(to, to_balance.saturating_add(value));
    }
}
