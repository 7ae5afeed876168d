use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::common::{Hex, address::Address, message::Message, word::Word};
use crate::decoder::Bytecode;
use crate::error::ExceptionalHalt;
use crate::gas::{self, Gas};
use crate::memory::{Memory, Region};
use crate::stack::Stack;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<Word>,
    pub data: Hex,
}

/// How a frame ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// STOP, RETURN, SELFDESTRUCT or running off the end of the code.
    Halted(Vec<u8>),
    /// REVERT: state is rolled back, unused gas is returned.
    Reverted(Vec<u8>),
    /// Exceptional halt: state is rolled back, all gas is consumed.
    Errored(ExceptionalHalt),
}

impl ExitStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitStatus::Halted(_))
    }

    pub fn output(&self) -> &[u8] {
        match self {
            ExitStatus::Halted(output) | ExitStatus::Reverted(output) => output,
            ExitStatus::Errored(_) => &[],
        }
    }
}

/// What a finished frame hands back to its caller.
#[derive(Clone, Debug)]
pub struct FrameResult {
    pub status: ExitStatus,
    pub gas_left: u64,
    pub refund: i64,
    pub logs: Vec<Log>,
    pub accounts_to_delete: BTreeSet<Address>,
    pub created: Option<Address>,
}

impl FrameResult {
    pub fn errored(error: ExceptionalHalt) -> Self {
        Self {
            status: ExitStatus::Errored(error),
            gas_left: 0,
            refund: 0,
            logs: Vec::new(),
            accounts_to_delete: BTreeSet::new(),
            created: None,
        }
    }

    pub fn halted(output: Vec<u8>, gas_left: u64) -> Self {
        Self {
            status: ExitStatus::Halted(output),
            gas_left,
            refund: 0,
            logs: Vec::new(),
            accounts_to_delete: BTreeSet::new(),
            created: None,
        }
    }
}

/// A call or create issued by a frame, awaiting the child's result.
#[derive(Clone, Copy, Debug)]
pub struct PendingCall {
    pub is_create: bool,
    pub ret: Option<Region>,
}

/// Execution record of one message.
#[derive(Debug)]
pub struct Evm {
    pub message: Message,
    pub code: Bytecode,
    pub pc: usize,
    pub stack: Stack,
    pub memory: Memory,
    pub gas: Gas,
    pub refund: i64,
    pub logs: Vec<Log>,
    pub output: Vec<u8>,
    pub return_data: Vec<u8>,
    pub accounts_to_delete: BTreeSet<Address>,
    pub running: bool,
    pub reverted: bool,
    pub error: Option<ExceptionalHalt>,
    pub pending: Option<PendingCall>,
}

impl Evm {
    pub fn new(message: Message) -> Self {
        let code = Bytecode::analyze(message.code.clone());
        let gas = Gas::new(message.gas);
        Self {
            message,
            code,
            pc: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            gas,
            refund: 0,
            logs: Vec::new(),
            output: Vec::new(),
            return_data: Vec::new(),
            accounts_to_delete: BTreeSet::new(),
            running: true,
            reverted: false,
            error: None,
            pending: None,
        }
    }

    pub fn address(&self) -> Address {
        self.message.current_target
    }

    pub fn push(&mut self, word: Word) -> Result<(), ExceptionalHalt> {
        self.stack.push(word)
    }

    pub fn pop(&mut self) -> Result<Word, ExceptionalHalt> {
        self.stack.pop()
    }

    pub fn pop_n<const N: usize>(&mut self) -> Result<[Word; N], ExceptionalHalt> {
        self.stack.pop_n::<N>()
    }

    pub fn charge(&mut self, gas: u64) -> Result<(), ExceptionalHalt> {
        self.gas.sub(gas)
    }

    /// Grows memory to cover every region, charging the expansion once.
    pub fn expand_memory(&mut self, regions: &[Option<Region>]) -> Result<(), ExceptionalHalt> {
        let Some(end) = regions.iter().flatten().map(Region::end).max() else {
            return Ok(());
        };
        let size = self.memory.size_for(end);
        let cost = gas::memory_expansion_cost(self.memory.len(), size);
        self.charge(cost)?;
        self.memory.resize(size);
        Ok(())
    }

    pub fn halt(&mut self, output: Vec<u8>) {
        self.output = output;
        self.running = false;
    }

    pub fn revert(&mut self, output: Vec<u8>) {
        self.output = output;
        self.running = false;
        self.reverted = true;
    }

    /// Turns the stopped frame into its result.
    pub fn finish(&mut self, error: Option<ExceptionalHalt>) -> FrameResult {
        let output = std::mem::take(&mut self.output);
        match error {
            Some(error) => FrameResult::errored(error),
            None if self.reverted => FrameResult {
                status: ExitStatus::Reverted(output),
                gas_left: self.gas.remaining(),
                refund: 0,
                logs: Vec::new(),
                accounts_to_delete: BTreeSet::new(),
                created: None,
            },
            None => FrameResult {
                status: ExitStatus::Halted(output),
                gas_left: self.gas.remaining(),
                refund: self.refund,
                logs: std::mem::take(&mut self.logs),
                accounts_to_delete: std::mem::take(&mut self.accounts_to_delete),
                created: None,
            },
        }
    }

    /// Folds a successful child result into this frame.
    pub fn merge(&mut self, child: &mut FrameResult) {
        self.refund += child.refund;
        self.logs.append(&mut child.logs);
        self.accounts_to_delete.append(&mut child.accounts_to_delete);
    }

    /// Continues after the pending call or create finished with `child`.
    pub fn resume(&mut self, mut child: FrameResult) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.gas.add(child.gas_left);
        let word = match &child.status {
            ExitStatus::Halted(_) if pending.is_create => {
                child.created.map(|address| address.as_word()).unwrap_or_default()
            }
            ExitStatus::Halted(_) => Word::one(),
            _ => Word::zero(),
        };
        self.return_data = match &child.status {
            ExitStatus::Halted(_) if pending.is_create => Vec::new(),
            ExitStatus::Errored(_) => Vec::new(),
            status => status.output().to_vec(),
        };
        if child.status.is_success() {
            self.merge(&mut child);
        }
        if let Some(region) = pending.ret {
            self.memory.write_truncated(region, &self.return_data);
        }
        if let Err(error) = self.push(word) {
            self.error = Some(error);
            self.running = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::common::message::CallKind;

    fn message(gas: u64) -> Message {
        Message {
            kind: CallKind::Call,
            caller: Address::zero(),
            target: Some(Address::zero()),
            current_target: Address::zero(),
            code_address: Address::zero(),
            code: Arc::from(vec![0x00]),
            data: Arc::from(vec![]),
            gas,
            value: Word::zero(),
            depth: 0,
            is_static: false,
            should_transfer_value: false,
        }
    }

    #[test]
    fn test_memory_expansion_charged_once() {
        let mut evm = Evm::new(message(100));
        let region = Region::resolve(Word::zero(), Word::from(64u8)).unwrap();
        evm.expand_memory(&[region]).unwrap();
        assert_eq!(evm.gas.remaining(), 94);
        evm.expand_memory(&[region]).unwrap();
        assert_eq!(evm.gas.remaining(), 94);
        let smaller = Region::resolve(Word::from(10u8), Word::from(1u8)).unwrap();
        evm.expand_memory(&[smaller, None]).unwrap();
        assert_eq!(evm.gas.remaining(), 94);
        assert_eq!(evm.memory.len(), 64);
    }

    #[test]
    fn test_regions_charged_together() {
        let mut evm = Evm::new(message(1000));
        let a = Region::resolve(Word::zero(), Word::from(32u8)).unwrap();
        let b = Region::resolve(Word::from(32u8 * 4), Word::from(32u8)).unwrap();
        evm.expand_memory(&[b, a]).unwrap();
        assert_eq!(evm.gas.remaining(), 1000 - gas::memory_cost(160));
    }

    #[test]
    fn test_expansion_out_of_gas() {
        let mut evm = Evm::new(message(2));
        let region = Region::resolve(Word::zero(), Word::one()).unwrap();
        assert_eq!(evm.expand_memory(&[region]), Err(ExceptionalHalt::OutOfGas));
        assert_eq!(evm.memory.len(), 0);
        assert_eq!(evm.gas.remaining(), 2);
    }

    #[test]
    fn test_finish() {
        let mut evm = Evm::new(message(100));
        evm.charge(10).unwrap();
        evm.revert(vec![1, 2]);
        let result = evm.finish(None);
        assert_eq!(result.status, ExitStatus::Reverted(vec![1, 2]));
        assert_eq!(result.gas_left, 90);

        let mut evm = Evm::new(message(100));
        let result = evm.finish(Some(ExceptionalHalt::StackUnderflow));
        assert_eq!(result.gas_left, 0);
        assert_eq!(result.status.output(), &[] as &[u8]);
    }

    #[test]
    fn test_resume_after_revert() {
        let mut evm = Evm::new(message(100));
        evm.charge(60).unwrap();
        let ret = Region::resolve(Word::zero(), Word::one()).unwrap();
        evm.expand_memory(&[ret]).unwrap();
        evm.pending = Some(PendingCall {
            is_create: false,
            ret,
        });
        let mut child = FrameResult::halted(vec![0xaa, 0xbb], 20);
        child.status = ExitStatus::Reverted(vec![0xaa, 0xbb]);
        evm.resume(child);
        assert_eq!(evm.gas.remaining(), 100 - 60 - 3 + 20);
        assert_eq!(evm.return_data, vec![0xaa, 0xbb]);
        assert_eq!(evm.memory.data()[0], 0xaa);
        assert_eq!(evm.memory.data()[1], 0);
        assert_eq!(evm.stack.data(), &[Word::zero()]);
        assert!(evm.pending.is_none());
    }

    #[test]
    fn test_resume_after_create() {
        let mut evm = Evm::new(message(100));
        evm.charge(50).unwrap();
        evm.pending = Some(PendingCall {
            is_create: true,
            ret: None,
        });
        let mut child = FrameResult::halted(vec![0x00], 10);
        child.created = Some(Address::from([0x11; 20]));
        child.refund = 5;
        evm.resume(child);
        assert_eq!(evm.stack.data(), &[Address::from([0x11; 20]).as_word()]);
        assert!(evm.return_data.is_empty());
        assert_eq!(evm.refund, 5);
        assert_eq!(evm.gas.remaining(), 60);
    }
}
