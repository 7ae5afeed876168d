use std::sync::Arc;

use crate::common::{
    hash::{EMPTY_CODE_HASH, keccak256},
    word::Word,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub nonce: u64,
    pub balance: Word,
    pub code: Arc<[u8]>,
}

impl Account {
    pub fn new(nonce: u64, balance: Word, code: Vec<u8>) -> Self {
        Self {
            nonce,
            balance,
            code: code.into(),
        }
    }

    pub fn with_balance(balance: Word) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    /// EIP-161: no code, zero nonce, zero balance.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.nonce == 0 && self.balance.is_zero()
    }

    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }

    pub fn code_hash(&self) -> [u8; 32] {
        if self.code.is_empty() {
            EMPTY_CODE_HASH
        } else {
            keccak256(&self.code)
        }
    }
}
