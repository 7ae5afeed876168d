use crate::error::ExceptionalHalt;
use crate::fork::Fork;

pub const ZERO: u64 = 0;
pub const JUMPDEST: u64 = 1;
pub const BASE: u64 = 2;
pub const VERY_LOW: u64 = 3;
pub const LOW: u64 = 5;
pub const MID: u64 = 8;
pub const HIGH: u64 = 10;
pub const EXP: u64 = 10;
pub const BLOCKHASH: u64 = 20;
pub const KECCAK256: u64 = 30;
pub const KECCAK256_WORD: u64 = 6;
pub const COPY_WORD: u64 = 3;
pub const LOG: u64 = 375;
pub const LOG_TOPIC: u64 = 375;
pub const LOG_DATA: u64 = 8;
pub const CREATE: u64 = 32000;
pub const CODE_DEPOSIT: u64 = 200;
pub const CALL_VALUE: u64 = 9000;
pub const CALL_STIPEND: u64 = 2300;
pub const NEW_ACCOUNT: u64 = 25000;
pub const SELFBALANCE: u64 = 5;
pub const BLOBHASH: u64 = 3;
pub const TRANSIENT: u64 = 100;
pub const MEMORY_WORD: u64 = 3;
pub const QUAD_COEFF_DIV: u64 = 512;

pub const WARM_STORAGE_READ: u64 = 100;
pub const COLD_SLOAD: u64 = 2100;
pub const COLD_ACCOUNT_ACCESS: u64 = 2600;

pub const SSTORE_SET: u64 = 20000;
pub const SSTORE_RESET: u64 = 5000;
pub const SSTORE_CLEARS_REFUND: u64 = 15000;
pub const SSTORE_STIPEND: u64 = CALL_STIPEND;
pub const SELFDESTRUCT_REFUND: u64 = 24000;

pub const TX: u64 = 21000;
pub const TX_CREATE: u64 = 32000;
pub const TX_DATA_ZERO: u64 = 4;
pub const TX_ACCESS_LIST_ADDRESS: u64 = 2400;
pub const TX_ACCESS_LIST_STORAGE_KEY: u64 = 1900;
pub const INITCODE_WORD: u64 = 2;
pub const TOTAL_COST_FLOOR_PER_TOKEN: u64 = 10;

/// Gas available to a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Gas {
    pub limit: u64,
    pub used: u64,
}

impl Gas {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// Gives back gas a child frame did not consume.
    pub fn add(&mut self, gas: u64) {
        self.used = self.used.saturating_sub(gas);
    }

    /// Deducts `gas`; on failure nothing is deducted.
    pub fn sub(&mut self, gas: u64) -> Result<(), ExceptionalHalt> {
        if gas > self.remaining() {
            return Err(ExceptionalHalt::OutOfGas);
        }
        self.used += gas;
        Ok(())
    }

    pub fn consume_all(&mut self) {
        self.used = self.limit;
    }
}

/// Fork-dependent prices of the operations whose cost changed over time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasSchedule {
    pub sload: u64,
    pub balance: u64,
    pub extcode: u64,
    pub extcodehash: u64,
    pub call: u64,
    pub selfdestruct: u64,
    /// Whether SELFDESTRUCT to a fresh beneficiary pays NEW_ACCOUNT.
    pub selfdestruct_new_account: bool,
    pub selfdestruct_refund: u64,
    pub exp_byte: u64,
    pub sstore_reset: u64,
    pub sstore_clears_refund: u64,
    pub tx_data_non_zero: u64,
    pub tx_create: u64,
}

impl GasSchedule {
    pub fn new(fork: Fork) -> Self {
        let eip150 = fork >= Fork::TangerineWhistle;
        let istanbul = fork >= Fork::Istanbul;
        let berlin = fork >= Fork::Berlin;
        Self {
            sload: if berlin {
                WARM_STORAGE_READ
            } else if istanbul {
                800
            } else if eip150 {
                200
            } else {
                50
            },
            balance: if istanbul {
                700
            } else if eip150 {
                400
            } else {
                20
            },
            extcode: if eip150 { 700 } else { 20 },
            extcodehash: if istanbul { 700 } else { 400 },
            call: if eip150 { 700 } else { 40 },
            selfdestruct: if eip150 { 5000 } else { 0 },
            selfdestruct_new_account: eip150,
            selfdestruct_refund: if fork >= Fork::London {
                0
            } else {
                SELFDESTRUCT_REFUND
            },
            exp_byte: if fork >= Fork::SpuriousDragon { 50 } else { 10 },
            sstore_reset: if berlin {
                SSTORE_RESET - COLD_SLOAD
            } else {
                SSTORE_RESET
            },
            sstore_clears_refund: if fork >= Fork::London {
                SSTORE_RESET - COLD_SLOAD + TX_ACCESS_LIST_STORAGE_KEY
            } else {
                SSTORE_CLEARS_REFUND
            },
            tx_data_non_zero: if istanbul { 16 } else { 68 },
            tx_create: if fork >= Fork::Homestead { TX_CREATE } else { 0 },
        }
    }
}

pub fn words(size: u64) -> u64 {
    size.div_ceil(32)
}

/// cost(n) = 3·words + words²/512
pub fn memory_cost(size: u64) -> u64 {
    let words = words(size);
    MEMORY_WORD
        .saturating_mul(words)
        .saturating_add(words.saturating_mul(words) / QUAD_COEFF_DIV)
}

/// Expansion from `current` to `new` bytes; zero when not growing.
pub fn memory_expansion_cost(current: usize, new: usize) -> u64 {
    if new <= current {
        return 0;
    }
    memory_cost(new as u64) - memory_cost(current as u64)
}

pub fn copy_cost(size: u64) -> u64 {
    COPY_WORD.saturating_mul(words(size))
}

pub fn keccak256_cost(size: u64) -> u64 {
    KECCAK256.saturating_add(KECCAK256_WORD.saturating_mul(words(size)))
}

pub fn log_cost(topics: u64, size: u64) -> u64 {
    LOG.saturating_add(LOG_TOPIC * topics)
        .saturating_add(LOG_DATA.saturating_mul(size))
}

pub fn initcode_cost(size: u64) -> u64 {
    INITCODE_WORD.saturating_mul(words(size))
}

/// EIP-150: all but one 64th.
pub fn max_call_gas(remaining: u64) -> u64 {
    remaining - remaining / 64
}

/// Calldata tokens as counted by EIP-7623: zero bytes count once, others four times.
pub fn calldata_tokens(data: &[u8]) -> u64 {
    let zeros = data.iter().filter(|b| **b == 0).count() as u64;
    let non_zeros = data.len() as u64 - zeros;
    zeros + non_zeros * 4
}

/// EIP-7623 minimum gas a transaction pays.
pub fn calldata_floor(data: &[u8]) -> u64 {
    TX + TOTAL_COST_FLOOR_PER_TOKEN * calldata_tokens(data)
}
