use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::{address::Address, word::Word};

/// Blob gas consumed by one blob (EIP-4844).
pub const GAS_PER_BLOB: u64 = 1 << 17;
pub const MIN_BLOB_BASE_FEE: u64 = 1;

/// Block-level parameters visible to executing code.
#[derive(Clone, Debug, Default)]
pub struct Env {
    pub coinbase: Address,
    pub number: u64,
    pub timestamp: u64,
    pub gas_limit: u64,
    pub difficulty: Word,
    pub prev_randao: Option<Word>,
    pub base_fee: Word,
    pub chain_id: u64,
    pub excess_blob_gas: Option<u64>,
    pub block_hashes: BTreeMap<u64, Word>,
}

impl Env {
    /// Hash of one of the 256 most recent complete blocks, zero otherwise.
    pub fn block_hash(&self, number: u64) -> Word {
        let lowest = self.number.saturating_sub(256);
        if number >= self.number || number < lowest {
            return Word::zero();
        }
        self.block_hashes.get(&number).copied().unwrap_or_default()
    }

    /// EIP-4844 blob base fee for the given update fraction.
    pub fn blob_gas_price(&self, update_fraction: u64) -> Word {
        fake_exponential(
            Word::from(MIN_BLOB_BASE_FEE),
            Word::from(self.excess_blob_gas.unwrap_or_default()),
            Word::from(update_fraction),
        )
    }
}

/// `factor * e ** (numerator / denominator)` approximated by Taylor expansion.
pub fn fake_exponential(factor: Word, numerator: Word, denominator: Word) -> Word {
    if denominator.is_zero() {
        return Word::zero();
    }
    let mut i = Word::one();
    let mut output = Word::zero();
    let mut accum = factor.saturating_mul(denominator);
    while !accum.is_zero() {
        output = output.saturating_add(accum);
        accum = accum
            .saturating_mul(numerator)
            .div(denominator.saturating_mul(i));
        i = i + Word::one();
    }
    output.div(denominator)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessListItem {
    pub address: Address,
    #[serde(rename = "storageKeys", default)]
    pub storage_keys: Vec<Word>,
}

#[derive(Clone, Debug, Default)]
pub struct TxGas {
    pub price: Option<Word>,
    pub max_fee: Option<Word>,
    pub max_priority_fee: Option<Word>,
    pub max_fee_per_blob: Option<Word>,
}

/// A validated-by-signature transaction: the sender is already recovered.
#[derive(Clone, Debug, Default)]
pub struct Tx {
    pub sender: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub gas_limit: u64,
    pub value: Word,
    pub data: Vec<u8>,
    pub gas: TxGas,
    pub access_list: Vec<AccessListItem>,
    pub blob_versioned_hashes: Vec<Word>,
}

impl Tx {
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }

    pub fn is_dynamic_fee(&self) -> bool {
        self.gas.max_fee.is_some()
    }

    /// For EIP-1559: min(maxFeePerGas, baseFeePerGas + maxPriorityFeePerGas).
    /// For legacy: gasPrice.
    pub fn effective_gas_price(&self, base_fee: Word) -> Word {
        if let Some(max_fee) = self.gas.max_fee {
            let max_priority = self.gas.max_priority_fee.unwrap_or_default();
            Word::min(max_fee, base_fee.saturating_add(max_priority))
        } else {
            self.gas.price.unwrap_or_default()
        }
    }

    /// Price used for the upfront balance check.
    pub fn max_gas_price(&self) -> Word {
        self.gas
            .max_fee
            .or(self.gas.price)
            .unwrap_or_default()
    }

    pub fn is_blob_transaction(&self) -> bool {
        !self.blob_versioned_hashes.is_empty()
    }

    pub fn blob_gas(&self) -> u64 {
        GAS_PER_BLOB * self.blob_versioned_hashes.len() as u64
    }
}
