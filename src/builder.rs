use crate::common::{
    address::Address,
    block::{AccessListItem, Tx, TxGas},
    hash::keccak256,
    word::Word,
};
use crate::error::ExecutorError;
use crate::executor::{Executor, TxResult};
use crate::state::State;
use crate::tracer::EventTracer;

pub const DEFAULT_GAS: u64 = 1_000_000;

/// Entry point for building transactions fluently.
#[derive(Default)]
pub struct Ethvm {}

impl Ethvm {
    pub fn new() -> Self {
        Self {}
    }

    pub fn create(&self, code: Vec<u8>) -> CreateBuilder {
        CreateBuilder {
            tx: Tx {
                data: code,
                gas_limit: DEFAULT_GAS,
                ..Default::default()
            },
        }
    }

    /// Call with ABI selector of `method` prepended to `args`; an empty method sends `args` as is.
    pub fn execute(&self, to: Address, method: &str, args: &[u8]) -> ExecuteBuilder {
        let mut data = Vec::with_capacity(args.len() + 4);
        if !method.is_empty() {
            let hash = keccak256(method.as_bytes());
            data.extend_from_slice(&hash[..4]);
        }
        data.extend_from_slice(args);
        ExecuteBuilder {
            tx: Tx {
                to: Some(to),
                data,
                gas_limit: DEFAULT_GAS,
                ..Default::default()
            },
        }
    }

    pub fn transfer(&self, to: Address, value: Word) -> TransferBuilder {
        TransferBuilder {
            tx: Tx {
                to: Some(to),
                value,
                gas_limit: crate::gas::TX,
                ..Default::default()
            },
        }
    }
}

pub trait Builder: Sized {
    fn tx_mut(&mut self) -> &mut Tx;

    fn ready(self) -> Tx;

    fn with_sender(mut self, sender: Address) -> Self {
        self.tx_mut().sender = sender;
        self
    }

    fn with_value(mut self, value: Word) -> Self {
        self.tx_mut().value = value;
        self
    }

    fn with_gas(mut self, gas: u64) -> Self {
        self.tx_mut().gas_limit = gas;
        self
    }

    fn with_nonce(mut self, nonce: u64) -> Self {
        self.tx_mut().nonce = nonce;
        self
    }

    fn with_gas_price(mut self, price: Word) -> Self {
        self.tx_mut().gas = TxGas {
            price: Some(price),
            ..Default::default()
        };
        self
    }

    /// EIP-1559 fee caps; replaces any legacy gas price.
    fn with_fees(mut self, max_fee: Word, max_priority_fee: Word) -> Self {
        self.tx_mut().gas = TxGas {
            max_fee: Some(max_fee),
            max_priority_fee: Some(max_priority_fee),
            ..Default::default()
        };
        self
    }

    fn with_access_list(mut self, access_list: Vec<AccessListItem>) -> Self {
        self.tx_mut().access_list = access_list;
        self
    }

    /// Builds the transaction and runs it against `executor`.
    fn apply<S: State, T: EventTracer>(
        self,
        executor: &mut Executor<S, T>,
    ) -> Result<TxResult, ExecutorError> {
        executor.transact(&self.ready())
    }
}

pub struct CreateBuilder {
    tx: Tx,
}

impl Builder for CreateBuilder {
    fn tx_mut(&mut self) -> &mut Tx {
        &mut self.tx
    }

    fn ready(self) -> Tx {
        self.tx
    }
}

pub struct ExecuteBuilder {
    tx: Tx,
}

impl ExecuteBuilder {
    pub fn with_blob_hashes(mut self, hashes: Vec<Word>) -> Self {
        self.tx.blob_versioned_hashes = hashes;
        self
    }

    pub fn with_max_fee_per_blob_gas(mut self, fee: Word) -> Self {
        self.tx.gas.max_fee_per_blob = Some(fee);
        self
    }
}

impl Builder for ExecuteBuilder {
    fn tx_mut(&mut self) -> &mut Tx {
        &mut self.tx
    }

    fn ready(self) -> Tx {
        self.tx
    }
}

pub struct TransferBuilder {
    tx: Tx,
}

impl Builder for TransferBuilder {
    fn tx_mut(&mut self) -> &mut Tx {
        &mut self.tx
    }

    fn ready(self) -> Tx {
        self.tx
    }
}
