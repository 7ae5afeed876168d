//! Opcode handlers grouped by semantic class, and the per-fork dispatch table.

use crate::fork::Fork;
use crate::gas;
use crate::interpreter::{Handler, Instruction};
use crate::opcodes::get_opcode;

mod arithmetic;
mod bitwise;
mod block;
mod call;
mod control;
mod environment;
mod log;
mod memory;
mod stack;
mod storage;

pub type InstructionTable = [Option<Instruction>; 256];

fn op(code: u8, handler: Handler, gas: u64) -> (u8, Handler, u64) {
    (code, handler, gas)
}

/// Every handler with its static gas; dynamic parts are charged by the handler.
fn handlers() -> Vec<(u8, Handler, u64)> {
    let mut all = vec![
        op(0x00, control::stop, gas::ZERO),
        op(0x01, arithmetic::add, gas::VERY_LOW),
        op(0x02, arithmetic::mul, gas::LOW),
        op(0x03, arithmetic::sub, gas::VERY_LOW),
        op(0x04, arithmetic::div, gas::LOW),
        op(0x05, arithmetic::sdiv, gas::LOW),
        op(0x06, arithmetic::rem, gas::LOW),
        op(0x07, arithmetic::smod, gas::LOW),
        op(0x08, arithmetic::addmod, gas::MID),
        op(0x09, arithmetic::mulmod, gas::MID),
        op(0x0a, arithmetic::exp, gas::EXP),
        op(0x0b, arithmetic::signextend, gas::LOW),
        op(0x10, bitwise::lt, gas::VERY_LOW),
        op(0x11, bitwise::gt, gas::VERY_LOW),
        op(0x12, bitwise::slt, gas::VERY_LOW),
        op(0x13, bitwise::sgt, gas::VERY_LOW),
        op(0x14, bitwise::eq, gas::VERY_LOW),
        op(0x15, bitwise::iszero, gas::VERY_LOW),
        op(0x16, bitwise::and, gas::VERY_LOW),
        op(0x17, bitwise::or, gas::VERY_LOW),
        op(0x18, bitwise::xor, gas::VERY_LOW),
        op(0x19, bitwise::not, gas::VERY_LOW),
        op(0x1a, bitwise::byte, gas::VERY_LOW),
        op(0x1b, bitwise::shl, gas::VERY_LOW),
        op(0x1c, bitwise::shr, gas::VERY_LOW),
        op(0x1d, bitwise::sar, gas::VERY_LOW),
        op(0x20, environment::keccak256_op, gas::KECCAK256),
        op(0x30, environment::address, gas::BASE),
        op(0x31, environment::balance, gas::ZERO),
        op(0x32, environment::origin, gas::BASE),
        op(0x33, environment::caller, gas::BASE),
        op(0x34, environment::callvalue, gas::BASE),
        op(0x35, environment::calldataload, gas::VERY_LOW),
        op(0x36, environment::calldatasize, gas::BASE),
        op(0x37, environment::calldatacopy, gas::VERY_LOW),
        op(0x38, environment::codesize, gas::BASE),
        op(0x39, environment::codecopy, gas::VERY_LOW),
        op(0x3a, environment::gasprice, gas::BASE),
        op(0x3b, environment::extcodesize, gas::ZERO),
        op(0x3c, environment::extcodecopy, gas::ZERO),
        op(0x3d, environment::returndatasize, gas::BASE),
        op(0x3e, environment::returndatacopy, gas::VERY_LOW),
        op(0x3f, environment::extcodehash, gas::ZERO),
        op(0x40, block::blockhash, gas::BLOCKHASH),
        op(0x41, block::coinbase, gas::BASE),
        op(0x42, block::timestamp, gas::BASE),
        op(0x43, block::number, gas::BASE),
        op(0x44, block::difficulty, gas::BASE),
        op(0x45, block::gaslimit, gas::BASE),
        op(0x46, block::chainid, gas::BASE),
        op(0x47, block::selfbalance, gas::SELFBALANCE),
        op(0x48, block::basefee, gas::BASE),
        op(0x49, block::blobhash, gas::BLOBHASH),
        op(0x4a, block::blobbasefee, gas::BASE),
        op(0x50, stack::pop, gas::BASE),
        op(0x51, memory::mload, gas::VERY_LOW),
        op(0x52, memory::mstore, gas::VERY_LOW),
        op(0x53, memory::mstore8, gas::VERY_LOW),
        op(0x54, storage::sload, gas::ZERO),
        op(0x55, storage::sstore, gas::ZERO),
        op(0x56, control::jump, gas::MID),
        op(0x57, control::jumpi, gas::HIGH),
        op(0x58, control::pc, gas::BASE),
        op(0x59, memory::msize, gas::BASE),
        op(0x5a, control::gas, gas::BASE),
        op(0x5b, control::jumpdest, gas::JUMPDEST),
        op(0x5c, storage::tload, gas::TRANSIENT),
        op(0x5d, storage::tstore, gas::TRANSIENT),
        op(0x5e, memory::mcopy, gas::VERY_LOW),
        op(0x5f, stack::push0, gas::BASE),
        op(0xa0, log::log::<0>, gas::LOG),
        op(0xa1, log::log::<1>, gas::LOG),
        op(0xa2, log::log::<2>, gas::LOG),
        op(0xa3, log::log::<3>, gas::LOG),
        op(0xa4, log::log::<4>, gas::LOG),
        op(0xf0, call::create, gas::CREATE),
        op(0xf1, call::call, gas::ZERO),
        op(0xf2, call::callcode, gas::ZERO),
        op(0xf3, control::ret, gas::ZERO),
        op(0xf4, call::delegatecall, gas::ZERO),
        op(0xf5, call::create2, gas::CREATE),
        op(0xfa, call::staticcall, gas::ZERO),
        op(0xfd, control::revert, gas::ZERO),
        op(0xfe, control::invalid, gas::ZERO),
        op(0xff, call::selfdestruct, gas::ZERO),
    ];
    for code in 0x60..=0x7fu8 {
        all.push(op(code, stack::push, gas::VERY_LOW));
    }
    for code in 0x80..=0x8fu8 {
        all.push(op(code, stack::dup, gas::VERY_LOW));
    }
    for code in 0x90..=0x9fu8 {
        all.push(op(code, stack::swap, gas::VERY_LOW));
    }
    all
}

/// Dispatch table of `fork`: opcodes introduced later stay `None`.
pub fn table(fork: Fork) -> InstructionTable {
    let mut table: InstructionTable = [None; 256];
    for (code, handler, gas) in handlers() {
        if get_opcode(code).is_active(fork) {
            table[code as usize] = Some(Instruction { handler, gas });
        }
    }
    table
}

/// The opcode byte being executed (`pc` has already moved past it).
fn current_op(ctx: &crate::interpreter::Context<'_>) -> u8 {
    ctx.evm.code.code()[ctx.evm.pc - 1]
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::sync::Arc;

    use crate::common::{
        address::{Address, addr},
        block::Env,
        message::{CallKind, Message},
        word::Word,
    };
    use crate::evm::{Evm, FrameResult};
    use crate::fork::{Config, Fork};
    use crate::interpreter::{self, Context, Step, TxContext};
    use crate::state::{MemoryState, Substate};
    use crate::tracer::NoopTracer;

    pub const CONTRACT: Address = addr("0x00000000000000000000000000000000c0ffee00");

    pub fn message(code: &[u8], gas: u64) -> Message {
        Message {
            kind: CallKind::Call,
            caller: Address::zero(),
            target: Some(CONTRACT),
            current_target: CONTRACT,
            code_address: CONTRACT,
            code: Arc::from(code.to_vec()),
            data: Arc::from(vec![]),
            gas,
            value: Word::zero(),
            depth: 0,
            is_static: false,
            should_transfer_value: false,
        }
    }

    /// Runs one frame to completion; calls are not expected.
    pub fn run(fork: Fork, code: &[u8], gas: u64) -> (Evm, FrameResult, MemoryState) {
        run_message(fork, message(code, gas))
    }

    pub fn run_message(fork: Fork, message: Message) -> (Evm, FrameResult, MemoryState) {
        let config = Config::new(fork);
        let mut state = MemoryState::new();
        let mut substate = Substate::new();
        let env = Env::default();
        let tx = TxContext::default();
        let mut evm = Evm::new(message);
        let step = {
            let mut ctx = Context {
                evm: &mut evm,
                state: &mut state,
                substate: &mut substate,
                env: &env,
                tx: &tx,
                config: &config,
            };
            interpreter::run(&mut ctx, &mut NoopTracer)
        };
        match step {
            Step::Done(result) => (evm, result, state),
            Step::Call(_) => panic!("unexpected call"),
        }
    }
}
