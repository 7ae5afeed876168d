use crate::common::{address::Address, block::Env, message::Message, word::Word};
use crate::error::ExceptionalHalt;
use crate::evm::{Evm, FrameResult};
use crate::fork::Config;
use crate::opcodes::get_opcode;
use crate::state::{State, Substate};
use crate::tracer::{Event, EventData, EventTracer};

/// Transaction-wide values readable by code.
#[derive(Clone, Debug, Default)]
pub struct TxContext {
    pub origin: Address,
    pub gas_price: Word,
    pub blob_hashes: Vec<Word>,
}

/// Everything an opcode handler may read or mutate.
pub struct Context<'a> {
    pub evm: &'a mut Evm,
    pub state: &'a mut dyn State,
    pub substate: &'a mut Substate,
    pub env: &'a Env,
    pub tx: &'a TxContext,
    pub config: &'a Config,
}

/// What the dispatch loop does after a handler returns.
#[derive(Debug)]
pub enum Control {
    Continue,
    /// Suspend this frame until the child message completes.
    Call(Box<Message>),
}

/// Handlers run with `pc` already past the opcode byte and the static gas paid.
pub type Handler = fn(&mut Context<'_>) -> Result<Control, ExceptionalHalt>;

#[derive(Clone, Copy)]
pub struct Instruction {
    pub handler: Handler,
    pub gas: u64,
}

impl std::fmt::Debug for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instruction(gas={})", self.gas)
    }
}

pub enum Step {
    Done(FrameResult),
    Call(Box<Message>),
}

impl Context<'_> {
    /// Account access price: EIP-2929 warm/cold from Berlin, `flat` before.
    pub fn account_access_cost(&mut self, address: &Address, flat: u64) -> u64 {
        if !self.config.access_lists {
            return flat;
        }
        if self.substate.access_account(address) {
            crate::gas::COLD_ACCOUNT_ACCESS
        } else {
            crate::gas::WARM_STORAGE_READ
        }
    }

    pub fn require_non_static(&self, op: u8) -> Result<(), ExceptionalHalt> {
        if self.evm.message.is_static {
            return Err(ExceptionalHalt::WriteInStaticContext(op));
        }
        Ok(())
    }
}

/// Runs the frame until it stops or issues a call.
pub fn run<T: EventTracer>(ctx: &mut Context<'_>, tracer: &mut T) -> Step {
    loop {
        if !ctx.evm.running {
            let error = ctx.evm.error.take();
            return Step::Done(ctx.evm.finish(error));
        }
        let pc = ctx.evm.pc;
        let Some(&op) = ctx.evm.code.code().get(pc) else {
            ctx.evm.halt(Vec::new());
            continue;
        };

        let snapshot = tracer.is_enabled().then(|| {
            (
                ctx.evm.gas.remaining(),
                ctx.evm.stack.data().to_vec(),
                ctx.evm.memory.len(),
                ctx.evm.refund,
            )
        });

        let instruction = ctx.config.instructions[op as usize];
        let result = match instruction {
            Some(instruction) => {
                ctx.evm.pc += 1;
                ctx.evm
                    .charge(instruction.gas)
                    .and_then(|_| (instruction.handler)(ctx))
            }
            None => Err(ExceptionalHalt::InvalidOpcode(op)),
        };

        if let Some((gas, stack, memory_size, refund)) = snapshot {
            tracer.add(Event {
                data: EventData::Opcode {
                    pc,
                    op,
                    name: get_opcode(op).name(),
                    gas,
                    gas_cost: gas.saturating_sub(ctx.evm.gas.remaining()),
                    stack,
                    memory_size,
                    refund,
                    error: result.as_ref().err().map(|e| e.to_string()),
                },
                depth: ctx.evm.message.depth + 1,
            });
        }

        match result {
            Ok(Control::Continue) => (),
            Ok(Control::Call(message)) => return Step::Call(message),
            Err(error) => {
                tracing::trace!(pc, op, %error, "exceptional halt");
                return Step::Done(ctx.evm.finish(Some(error)));
            }
        }
    }
}
