use std::collections::BTreeMap;

use clap::Parser;
use eyre::Context;
use tracing_subscriber::EnvFilter;

use ethvm::{
    Builder as _, Ethvm, ExecutorError, Executor, ExitStatus, Fork, MemoryState, TxResult, Word,
    common::{Hex, account::Account, address::addr, block::Env, word::decode_error_string},
    decoder::Decoder,
    fork::Config,
    tracer::{EventTracer, JsonTracer, LoggingTracer},
};

const SENDER: ethvm::Address = addr("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
const CONTRACT: ethvm::Address = addr("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");

/// Runs bytecode as the code of a contract called by a funded account.
#[derive(Parser)]
#[command(name = "evm")]
struct Args {
    /// Hex-encoded runtime bytecode.
    bytecode: String,

    /// Hex-encoded calldata.
    #[arg(default_value = "")]
    calldata: String,

    #[arg(long, default_value = "Prague")]
    fork: Fork,

    #[arg(long, default_value_t = 10_000_000)]
    gas: u64,

    /// Print one JSON object per executed opcode.
    #[arg(long)]
    trace: bool,

    /// Print the disassembly before running.
    #[arg(long)]
    disasm: bool,
}

fn dump(code: &[u8]) -> eyre::Result<()> {
    let instructions = Decoder::decode(code)?;
    println!("{:<6} {:<15} Argument", "PC", "OpCode");
    println!("{}", "─".repeat(40));
    for instruction in instructions {
        let pc = format!("{:#06x}", instruction.offset);
        let argument = instruction
            .argument
            .map(|arg| format!("0x{}", hex::encode(arg)))
            .unwrap_or_default();
        println!("{pc:<6} {:<15} {argument}", instruction.opcode.name());
    }
    println!();
    Ok(())
}

fn call<T: EventTracer>(
    executor: &mut Executor<MemoryState, T>,
    calldata: &[u8],
    gas: u64,
) -> Result<TxResult, ExecutorError> {
    Ethvm::new()
        .execute(CONTRACT, "", calldata)
        .with_sender(SENDER)
        .with_gas(gas)
        .apply(executor)
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let code: Hex = args.bytecode.parse().wrap_err("invalid bytecode")?;
    let calldata: Hex = args.calldata.parse().wrap_err("invalid calldata")?;

    if args.disasm {
        dump(code.as_slice())?;
    }

    let mut state = MemoryState::new();
    state.insert(SENDER, Account::with_balance(Word::max()), BTreeMap::new());
    state.insert(CONTRACT, Account::new(1, Word::zero(), code.into_inner()), BTreeMap::new());

    let env = Env {
        gas_limit: args.gas.max(30_000_000),
        chain_id: 1,
        ..Default::default()
    };
    let executor = Executor::new(state, Config::new(args.fork), env);

    // frame boundaries go to the log at TRACE level unless a full trace is requested
    let result = if args.trace {
        let mut executor = executor.with_tracer(JsonTracer::default());
        let result = call(&mut executor, calldata.as_slice(), args.gas)?;
        for line in executor.tracer().lines() {
            println!("{line}");
        }
        result
    } else {
        let mut executor = executor.with_tracer(LoggingTracer);
        call(&mut executor, calldata.as_slice(), args.gas)?
    };

    tracing::info!(gas_used = result.gas_used, logs = result.logs.len(), "done");
    let output = Hex::from(result.output());
    match &result.status {
        ExitStatus::Halted(_) => println!("OK: {output}"),
        ExitStatus::Reverted(data) => match decode_error_string(data) {
            Some(reason) => println!("REVERTED: {output} ({reason})"),
            None => println!("REVERTED: {output}"),
        },
        ExitStatus::Errored(error) => println!("FAILED: {error}"),
    }
    Ok(())
}
