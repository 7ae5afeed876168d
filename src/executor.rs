use std::sync::Arc;

use crate::common::{
    address::Address,
    block::{Env, Tx},
    message::{CallKind, Message},
    word::Word,
};
use crate::error::{ExceptionalHalt, ExecutorError, TxError};
use crate::evm::{Evm, ExitStatus, FrameResult, Log};
use crate::fork::Config;
use crate::gas;
use crate::interpreter::{self, Context, Step, TxContext};
use crate::state::{State, Substate};
use crate::tracer::{Event, EventData, EventTracer, NoopTracer};

/// Outcome of one transaction, as seen by the block builder.
#[derive(Clone, Debug)]
pub struct TxResult {
    pub status: ExitStatus,
    pub gas_used: u64,
    pub logs: Vec<Log>,
    pub created: Option<Address>,
}

impl TxResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn output(&self) -> &[u8] {
        self.status.output()
    }
}

enum Enter {
    Run(Box<Evm>),
    Done(FrameResult),
}

pub struct Executor<S: State, T: EventTracer = NoopTracer> {
    state: S,
    substate: Substate,
    config: Config,
    env: Env,
    tracer: T,
}

impl<S: State> Executor<S, NoopTracer> {
    pub fn new(state: S, config: Config, env: Env) -> Self {
        Self {
            state,
            substate: Substate::new(),
            config,
            env,
            tracer: NoopTracer,
        }
    }
}

impl<S: State, T: EventTracer> Executor<S, T> {
    pub fn with_tracer<G: EventTracer>(self, tracer: G) -> Executor<S, G> {
        Executor {
            state: self.state,
            substate: self.substate,
            config: self.config,
            env: self.env,
            tracer,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn tracer(&self) -> &T {
        &self.tracer
    }

    pub fn take_tracer(&mut self) -> T {
        std::mem::take(&mut self.tracer)
    }

    /// Runs `message` and every call it makes to completion.
    ///
    /// Frames live on an explicit stack: a frame that calls is suspended
    /// until its child is done, then resumed with the child's result.
    pub fn execute_message(
        &mut self,
        message: Message,
        tx: &TxContext,
    ) -> Result<FrameResult, ExecutorError> {
        let mut frames = match self.enter(message) {
            Enter::Run(evm) => vec![*evm],
            Enter::Done(result) => return Ok(result),
        };
        while let Some(evm) = frames.last_mut() {
            match self.run(evm, tx) {
                Step::Call(message) => match self.enter(*message) {
                    Enter::Run(child) => frames.push(*child),
                    Enter::Done(result) => evm.resume(result),
                },
                Step::Done(result) => {
                    let result = self.exit(evm, result);
                    frames.pop();
                    match frames.last_mut() {
                        Some(parent) => parent.resume(result),
                        None => return Ok(result),
                    }
                }
            }
        }
        Err(ExecutorError::Internal("frame stack emptied without a result"))
    }

    fn run(&mut self, evm: &mut Evm, tx: &TxContext) -> Step {
        let mut ctx = Context {
            evm,
            state: &mut self.state,
            substate: &mut self.substate,
            env: &self.env,
            tx,
            config: &self.config,
        };
        interpreter::run(&mut ctx, &mut self.tracer)
    }

    /// Opens the checkpoint of a new frame and applies everything that
    /// happens before its first instruction.
    fn enter(&mut self, message: Message) -> Enter {
        self.tracer.add(Event {
            data: EventData::Enter {
                kind: message.kind,
                from: message.caller,
                to: message.current_target,
                gas: message.gas,
                value: message.value,
                input: message.data.to_vec(),
            },
            depth: message.depth,
        });
        tracing::trace!(
            depth = message.depth,
            kind = %message.kind,
            to = %message.current_target,
            gas = message.gas,
            "enter"
        );
        self.state.begin();
        self.substate.begin();

        let target = message.current_target;
        if message.is_create() {
            let collision = self
                .state
                .account(&target)
                .is_some_and(|account| account.nonce != 0 || account.has_code());
            if collision {
                let result = FrameResult::errored(ExceptionalHalt::AddressCollision);
                return Enter::Done(self.settle(result, message.depth));
            }
            self.state.clear_storage(&target);
            self.state.set_nonce(&target, self.config.create_nonce);
            self.substate.mark_created(&target);
        } else if message.kind == CallKind::Call
            && self.config.empty_account_semantics
            && message.value.is_zero()
            && !self.config.is_precompile(&message.code_address)
            && !self.state.exists(&target)
        {
            let result = FrameResult::halted(Vec::new(), message.gas);
            return Enter::Done(self.settle(result, message.depth));
        }

        if message.should_transfer_value {
            self.state.transfer(&message.caller, &target, message.value);
            self.substate.touch(&target);
        }

        if let Some(precompile) = self.config.precompiles.get(&message.code_address) {
            let result = match precompile(&message.data, message.gas, self.config.fork) {
                Ok(output) => {
                    FrameResult::halted(output.output, message.gas - output.gas_used)
                }
                Err(error) => {
                    tracing::trace!(address = %message.code_address, %error, "precompile failed");
                    FrameResult::errored(ExceptionalHalt::PrecompileFailure)
                }
            };
            return Enter::Done(self.settle(result, message.depth));
        }

        Enter::Run(Box::new(Evm::new(message)))
    }

    fn exit(&mut self, evm: &Evm, result: FrameResult) -> FrameResult {
        let result = if evm.message.is_create() && result.status.is_success() {
            self.deposit(&evm.message, result)
        } else {
            result
        };
        self.settle(result, evm.message.depth)
    }

    /// Installs the code returned by initcode, charging 200 gas per byte.
    fn deposit(&mut self, message: &Message, mut result: FrameResult) -> FrameResult {
        let address = message.current_target;
        let code = result.status.output().to_vec();
        if self.config.max_code_size.is_some_and(|max| code.len() > max) {
            return FrameResult::errored(ExceptionalHalt::CodeSizeLimit);
        }
        if self.config.reject_ef_code && code.first() == Some(&0xef) {
            return FrameResult::errored(ExceptionalHalt::InvalidCodePrefix);
        }
        let cost = gas::CODE_DEPOSIT * code.len() as u64;
        result.created = Some(address);
        if cost > result.gas_left {
            if self.config.code_deposit_oog_fails {
                return FrameResult::errored(ExceptionalHalt::OutOfGas);
            }
            // Frontier keeps the account, without code
            return result;
        }
        self.state.set_code(&address, Arc::from(code));
        result.gas_left -= cost;
        result
    }

    /// Closes the frame checkpoint: kept on success, undone otherwise.
    fn settle(&mut self, result: FrameResult, depth: usize) -> FrameResult {
        if result.status.is_success() {
            self.state.commit();
            self.substate.commit();
        } else {
            self.state.rollback();
            self.substate.rollback();
        }
        tracing::trace!(depth, status = ?result.status, gas_left = result.gas_left, "exit");
        self.tracer.add(Event {
            data: EventData::Exit {
                status: result.status.clone(),
                gas_left: result.gas_left,
            },
            depth,
        });
        result
    }

    fn intrinsic_gas(&self, tx: &Tx) -> u64 {
        let schedule = &self.config.gas;
        let zeros = tx.data.iter().filter(|b| **b == 0).count() as u64;
        let non_zeros = tx.data.len() as u64 - zeros;
        let mut cost = gas::TX
            + zeros * gas::TX_DATA_ZERO
            + non_zeros * schedule.tx_data_non_zero;
        if tx.is_create() {
            cost += schedule.tx_create;
            if self.config.max_initcode_size.is_some() {
                cost += gas::initcode_cost(tx.data.len() as u64);
            }
        }
        for item in &tx.access_list {
            cost += gas::TX_ACCESS_LIST_ADDRESS
                + gas::TX_ACCESS_LIST_STORAGE_KEY * item.storage_keys.len() as u64;
        }
        cost
    }

    fn blob_gas_price(&self) -> Word {
        self.config
            .blob_base_fee_update_fraction
            .map(|fraction| self.env.blob_gas_price(fraction))
            .unwrap_or_default()
    }

    /// Checks everything that makes a transaction invalid; returns its intrinsic gas.
    pub fn validate(&self, tx: &Tx) -> Result<u64, TxError> {
        let config = &self.config;
        if (tx.is_dynamic_fee() && !config.base_fee)
            || (tx.is_blob_transaction() && !config.has_blobs())
            || (!tx.access_list.is_empty() && !config.access_lists)
        {
            return Err(TxError::TypeNotSupported);
        }
        if tx.is_blob_transaction() {
            if tx.is_create() {
                return Err(TxError::BlobCreate);
            }
            let count = tx.blob_versioned_hashes.len();
            if count > config.max_blobs_per_block {
                return Err(TxError::TooManyBlobs(count));
            }
            if tx.blob_versioned_hashes.iter().any(|hash| hash.byte(31) != 0x01) {
                return Err(TxError::InvalidBlobHash);
            }
            if tx.gas.max_fee_per_blob.unwrap_or_default() < self.blob_gas_price() {
                return Err(TxError::BlobFeeCapTooLow);
            }
        } else if tx.gas.max_fee_per_blob.is_some() {
            return Err(TxError::NoBlobs);
        }

        let sender = self.state.account(&tx.sender).unwrap_or_default();
        if sender.nonce == u64::MAX {
            return Err(TxError::NonceOverflow(tx.sender));
        }
        if sender.nonce != tx.nonce {
            return Err(TxError::NonceMismatch {
                sender: tx.sender,
                expected: sender.nonce,
                got: tx.nonce,
            });
        }
        if sender.has_code() {
            return Err(TxError::SenderNotEoa(tx.sender));
        }
        if tx.gas_limit > self.env.gas_limit {
            return Err(TxError::GasLimitExceedsBlock(tx.gas_limit, self.env.gas_limit));
        }
        if config.base_fee {
            let max_fee = tx.max_gas_price();
            if max_fee < self.env.base_fee {
                return Err(TxError::FeeCapTooLow {
                    max_fee,
                    base_fee: self.env.base_fee,
                });
            }
            if tx.gas.max_priority_fee.is_some_and(|tip| tip > max_fee) {
                return Err(TxError::TipAboveFeeCap);
            }
        }
        if tx.is_create()
            && let Some(max) = config.max_initcode_size
            && tx.data.len() > max
        {
            return Err(TxError::InitcodeTooLarge(tx.data.len()));
        }

        let intrinsic = self.intrinsic_gas(tx);
        let required = if config.calldata_floor {
            intrinsic.max(gas::calldata_floor(&tx.data))
        } else {
            intrinsic
        };
        if tx.gas_limit < required {
            return Err(TxError::IntrinsicGasTooLow {
                have: tx.gas_limit,
                want: required,
            });
        }

        let blob_fee = Word::from(tx.blob_gas())
            .saturating_mul(tx.gas.max_fee_per_blob.unwrap_or_default());
        let want = Word::from(tx.gas_limit)
            .saturating_mul(tx.max_gas_price())
            .saturating_add(tx.value)
            .saturating_add(blob_fee);
        if sender.balance < want {
            return Err(TxError::InsufficientFunds {
                have: sender.balance,
                want,
            });
        }
        Ok(intrinsic)
    }

    /// Validates and executes a transaction, applying its effects to the state.
    pub fn transact(&mut self, tx: &Tx) -> Result<TxResult, ExecutorError> {
        let intrinsic = match self.validate(tx) {
            Ok(intrinsic) => intrinsic,
            Err(error) => {
                tracing::warn!(sender = %tx.sender, nonce = tx.nonce, %error, "transaction rejected");
                return Err(error.into());
            }
        };
        self.substate.clear();

        let gas_price = if self.config.base_fee {
            tx.effective_gas_price(self.env.base_fee)
        } else {
            tx.max_gas_price()
        };
        let blob_fee = Word::from(tx.blob_gas()).saturating_mul(self.blob_gas_price());
        let upfront = Word::from(tx.gas_limit)
            .saturating_mul(gas_price)
            .saturating_add(blob_fee);
        let balance = self.state.balance(&tx.sender);
        self.state.set_balance(&tx.sender, balance.saturating_sub(upfront));
        self.state.increment_nonce(&tx.sender);

        let target = match tx.to {
            Some(to) => to,
            None => tx.sender.create(tx.nonce),
        };
        if self.config.access_lists {
            self.substate.access_account(&tx.sender);
            self.substate.access_account(&target);
            for address in self.config.precompiles.keys() {
                self.substate.access_account(address);
            }
            for item in &tx.access_list {
                self.substate.access_account(&item.address);
                for key in &item.storage_keys {
                    self.substate.access_slot(&item.address, key);
                }
            }
            if self.config.warm_coinbase {
                self.substate.access_account(&self.env.coinbase);
            }
        }

        let (kind, code, data) = match tx.to {
            Some(to) => (
                CallKind::Call,
                self.state.code(&to),
                Arc::from(tx.data.as_slice()),
            ),
            None => (
                CallKind::Create,
                Arc::from(tx.data.as_slice()),
                Arc::from(Vec::new()),
            ),
        };
        let message = Message {
            kind,
            caller: tx.sender,
            target: Some(target),
            current_target: target,
            code_address: target,
            code,
            data,
            gas: tx.gas_limit - intrinsic,
            value: tx.value,
            depth: 0,
            is_static: false,
            should_transfer_value: true,
        };
        let context = TxContext {
            origin: tx.sender,
            gas_price,
            blob_hashes: tx.blob_versioned_hashes.clone(),
        };
        let result = self.execute_message(message, &context)?;

        let mut gas_used = tx.gas_limit - result.gas_left;
        if result.status.is_success() {
            let refund = (result.refund.max(0) as u64).min(gas_used / self.config.max_refund_quotient);
            gas_used -= refund;
        }
        if self.config.calldata_floor {
            gas_used = gas_used.max(gas::calldata_floor(&tx.data));
        }

        let balance = self.state.balance(&tx.sender);
        let change = Word::from(tx.gas_limit - gas_used).saturating_mul(gas_price);
        self.state.set_balance(&tx.sender, balance.saturating_add(change));

        let tip = if self.config.base_fee {
            gas_price.saturating_sub(self.env.base_fee)
        } else {
            gas_price
        };
        let coinbase = self.env.coinbase;
        let reward = Word::from(gas_used).saturating_mul(tip);
        let balance = self.state.balance(&coinbase);
        self.state.set_balance(&coinbase, balance.saturating_add(reward));
        self.substate.touch(&coinbase);

        if result.status.is_success() {
            for address in &result.accounts_to_delete {
                self.state.destroy(address);
            }
        }
        if self.config.empty_account_semantics {
            let touched: Vec<Address> = self.substate.touched().copied().collect();
            for address in touched {
                if self.state.account(&address).is_some_and(|a| a.is_empty()) {
                    self.state.destroy(&address);
                }
            }
        }
        self.substate.clear();

        let error = match &result.status {
            ExitStatus::Errored(error) => Some(error.to_string()),
            ExitStatus::Reverted(_) => Some("execution reverted".to_string()),
            ExitStatus::Halted(_) => None,
        };
        self.tracer.add(Event {
            data: EventData::Summary {
                output: result.status.output().to_vec(),
                gas_used,
                error: error.clone(),
            },
            depth: 0,
        });
        tracing::debug!(sender = %tx.sender, gas_used, error = error.as_deref().unwrap_or("none"), "transaction done");

        let created = if tx.is_create() { result.created } else { None };
        let logs = if result.status.is_success() {
            result.logs
        } else {
            Vec::new()
        };
        Ok(TxResult {
            status: result.status,
            gas_used,
            logs,
            created,
        })
    }
}
