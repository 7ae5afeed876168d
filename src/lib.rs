pub mod builder;
pub mod common;
pub mod decoder;
pub mod error;
pub mod evm;
pub mod executor;
pub mod fork;
pub mod gas;
pub mod instructions;
pub mod interpreter;
pub mod memory;
pub mod opcodes;
pub mod precompiles;
pub mod stack;
pub mod state;
pub mod tracer;

pub use crate::{
    builder::{Builder, Ethvm},
    common::{Address, Word},
    error::{ExceptionalHalt, ExecutorError, TxError},
    evm::{ExitStatus, FrameResult, Log},
    executor::{Executor, TxResult},
    fork::{Config, Fork},
    state::{MemoryState, State},
};
