use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::{Context, eyre};
use serde::{Serialize, de::DeserializeOwned};
use tracing_subscriber::EnvFilter;

use ethvm::{
    Address, ExecutorError, Executor, Fork, Log, MemoryState, State, Word,
    common::{Hex, block::Env},
    fork::Config,
    tracer::{EventTracer, JsonTracer},
};

mod input;
mod receipt;

use input::{Alloc, JsonEnv, JsonTx};
use receipt::{JsonReceipt, Receipt};

/// State transition tool: applies a list of transactions to a pre-state.
#[derive(Parser)]
#[command(name = "ethvm-t8n", version)]
struct Args {
    #[arg(long = "input.alloc")]
    input_alloc: PathBuf,

    #[arg(long = "input.txs")]
    input_txs: PathBuf,

    #[arg(long = "input.env")]
    input_env: PathBuf,

    #[arg(long = "output.basedir", default_value = ".")]
    output_basedir: PathBuf,

    /// File name under the base directory, or `stdout`.
    #[arg(long = "output.result", default_value = "result.json")]
    output_result: String,

    /// File name under the base directory, or `stdout`.
    #[arg(long = "output.alloc", default_value = "alloc.json")]
    output_alloc: String,

    #[arg(long = "state.fork", default_value = "Prague")]
    fork: Fork,

    #[arg(long = "state.chainid", default_value_t = 1)]
    chain_id: u64,

    /// Accepted for compatibility; block rewards are not applied.
    #[arg(long = "state.reward", default_value = "0")]
    reward: i64,

    /// Write `trace-<index>.jsonl` for every transaction.
    #[arg(long = "trace")]
    trace: bool,
}

#[derive(Serialize)]
struct RejectedTx {
    index: usize,
    error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockResult {
    state_root: Hex,
    receipts_root: Hex,
    logs_hash: Hex,
    logs_bloom: Hex,
    receipts: Vec<JsonReceipt>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rejected: Vec<RejectedTx>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_difficulty: Option<Word>,
    gas_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_base_fee: Option<Word>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_excess_blob_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blob_gas_used: Option<String>,
}

#[derive(Serialize)]
struct AllocAccount {
    balance: Word,
    nonce: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<Hex>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    storage: BTreeMap<Word, Word>,
}

#[derive(Default)]
struct Block {
    receipts: Vec<Receipt>,
    rejected: Vec<RejectedTx>,
    gas_used: u64,
    blob_gas_used: u64,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> eyre::Result<T> {
    let text = fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).wrap_err_with(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize>(basedir: &Path, name: &str, value: &T) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    if name == "stdout" {
        println!("{json}");
        return Ok(());
    }
    let path = basedir.join(name);
    fs::write(&path, json).wrap_err_with(|| format!("writing {}", path.display()))
}

/// Runs `txs` in order; `after` is invoked once per included transaction.
fn apply<T, F>(
    executor: &mut Executor<MemoryState, T>,
    txs: &[JsonTx],
    mut after: F,
) -> eyre::Result<Block>
where
    T: EventTracer,
    F: FnMut(usize, &mut Executor<MemoryState, T>) -> eyre::Result<()>,
{
    let block_gas_limit = executor.env().gas_limit;
    let fork = executor.config().fork;
    let mut block = Block::default();

    for (index, json) in txs.iter().enumerate() {
        let (tx, tx_type) = match json.to_tx().and_then(|tx| Ok((tx, json.tx_type()?))) {
            Ok(parsed) => parsed,
            Err(error) => {
                block.rejected.push(RejectedTx {
                    index,
                    error: error.to_string(),
                });
                continue;
            }
        };
        if block.gas_used + tx.gas_limit > block_gas_limit {
            block.rejected.push(RejectedTx {
                index,
                error: format!(
                    "gas limit reached: {} + {} > {block_gas_limit}",
                    block.gas_used, tx.gas_limit
                ),
            });
            continue;
        }

        let result = match executor.transact(&tx) {
            Ok(result) => result,
            Err(ExecutorError::Tx(error)) => {
                block.rejected.push(RejectedTx {
                    index,
                    error: error.to_string(),
                });
                continue;
            }
            Err(error) => return Err(error.into()),
        };
        tracing::debug!(index, gas_used = result.gas_used, status = ?result.status, "applied");

        block.gas_used += result.gas_used;
        block.blob_gas_used += tx.blob_gas();
        let root = (fork < Fork::Byzantium).then(|| executor.state().root());
        block.receipts.push(Receipt {
            tx_type,
            success: result.is_success(),
            root,
            cumulative_gas_used: block.gas_used,
            gas_used: result.gas_used,
            logs: result.logs,
            contract_address: tx.is_create().then(|| tx.sender.create(tx.nonce)),
            index,
        });
        after(index, executor)?;
    }
    Ok(block)
}

fn post_alloc(state: &MemoryState) -> BTreeMap<Address, AllocAccount> {
    state
        .accounts()
        .map(|(address, account)| {
            (
                *address,
                AllocAccount {
                    balance: account.balance,
                    nonce: format!("{:#x}", account.nonce),
                    code: account.has_code().then(|| Hex::from(&account.code[..])),
                    storage: state
                        .storage_of(address)
                        .into_iter()
                        .filter(|(_, value)| !value.is_zero())
                        .collect(),
                },
            )
        })
        .collect()
}

fn block_result(env: &Env, fork: Fork, state: &MemoryState, block: Block) -> BlockResult {
    let encoded: Vec<Vec<u8>> = block.receipts.iter().map(Receipt::encode).collect();
    let logs: Vec<Log> = block
        .receipts
        .iter()
        .flat_map(|receipt| receipt.logs.iter().cloned())
        .collect();

    let mut first_log = 0;
    let receipts = block
        .receipts
        .iter()
        .map(|receipt| {
            let json = JsonReceipt::new(receipt, env.number, first_log);
            first_log += receipt.logs.len();
            json
        })
        .collect();

    let config = Config::new(fork);
    BlockResult {
        state_root: Hex::from(state.root()),
        receipts_root: Hex::from(ethvm::state::trie::ordered_trie_root(&encoded)),
        logs_hash: Hex::from(receipt::logs_hash(&logs)),
        logs_bloom: Hex::from(receipt::bloom(&logs)),
        receipts,
        rejected: block.rejected,
        current_difficulty: (!config.prev_randao).then_some(env.difficulty),
        gas_used: format!("{:#x}", block.gas_used),
        current_base_fee: config.base_fee.then_some(env.base_fee),
        current_excess_blob_gas: config
            .has_blobs()
            .then(|| format!("{:#x}", env.excess_blob_gas.unwrap_or_default())),
        blob_gas_used: config
            .has_blobs()
            .then(|| format!("{:#x}", block.blob_gas_used)),
    }
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.reward != 0 {
        tracing::warn!(reward = args.reward, "block reward ignored");
    }

    let alloc: Alloc = read_json(&args.input_alloc)?;
    let env: JsonEnv = read_json(&args.input_env)?;
    let txs: Vec<JsonTx> = read_json(&args.input_txs)?;

    let env = env.into_env(args.chain_id)?;
    if Config::new(args.fork).prev_randao && env.prev_randao.is_none() {
        return Err(eyre!("currentRandom is required from {}", Fork::Paris));
    }
    let state = input::load_state(alloc)?;
    let executor = Executor::new(state, Config::new(args.fork), env.clone());
    tracing::info!(fork = %args.fork, txs = txs.len(), "transition");

    let (state, block) = if args.trace {
        let mut executor = executor.with_tracer(JsonTracer::default());
        let basedir = args.output_basedir.clone();
        let block = apply(&mut executor, &txs, |index, executor| {
            let mut lines = executor.take_tracer().lines().join("\n");
            lines.push('\n');
            let path = basedir.join(format!("trace-{index}.jsonl"));
            fs::write(&path, lines).wrap_err_with(|| format!("writing {}", path.display()))
        })?;
        (executor.into_state(), block)
    } else {
        let mut executor = executor;
        let block = apply(&mut executor, &txs, |_, _| Ok(()))?;
        (executor.into_state(), block)
    };

    let result = block_result(&env, args.fork, &state, block);
    write_json(&args.output_basedir, &args.output_alloc, &post_alloc(&state))?;
    write_json(&args.output_basedir, &args.output_result, &result)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_reward_is_accepted() {
        let args = Args::try_parse_from([
            "ethvm-t8n",
            "--input.alloc=alloc.json",
            "--input.txs=txs.json",
            "--input.env=env.json",
            "--state.fork=London",
            "--state.reward=2000000000000000000",
        ])
        .unwrap();
        assert_eq!(args.reward, 2_000_000_000_000_000_000);
        assert_eq!(args.fork, Fork::London);
        assert_eq!(args.output_result, "result.json");

        let args = Args::try_parse_from([
            "ethvm-t8n",
            "--input.alloc=alloc.json",
            "--input.txs=txs.json",
            "--input.env=env.json",
            "--state.reward=-1",
        ])
        .unwrap();
        assert_eq!(args.reward, -1);
    }
}
