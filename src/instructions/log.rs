use crate::common::Hex;
use crate::error::ExceptionalHalt;
use crate::evm::Log;
use crate::gas;
use crate::interpreter::{Context, Control};
use crate::memory::Region;

use super::current_op;

// LOG0..LOG4
pub fn log<const N: usize>(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.require_non_static(current_op(ctx))?;
    let [offset, size] = ctx.evm.pop_n()?;
    let topics = ctx.evm.pop_n::<N>()?;
    let region = Region::resolve(offset, size)?;
    let len = region.map(|r| r.size as u64).unwrap_or_default();
    ctx.evm.charge(gas::log_cost(N as u64, len) - gas::LOG)?;
    ctx.evm.expand_memory(&[region])?;
    let data = ctx.evm.memory.get(region).to_vec();
    let address = ctx.evm.address();
    ctx.evm.logs.push(Log {
        address,
        topics: topics.to_vec(),
        data: Hex::from(data),
    });
    Ok(Control::Continue)
}
