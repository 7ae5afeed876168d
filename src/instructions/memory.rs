use crate::common::word::Word;
use crate::error::ExceptionalHalt;
use crate::gas;
use crate::interpreter::{Context, Control};
use crate::memory::Region;

// MLOAD
pub fn mload(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let offset = ctx.evm.pop()?;
    let region = Region::resolve(offset, Word::from(32u8))?;
    ctx.evm.expand_memory(&[region])?;
    let word = region
        .map(|region| ctx.evm.memory.load(region.offset))
        .unwrap_or_default();
    ctx.evm.push(word)?;
    Ok(Control::Continue)
}

// MSTORE
pub fn mstore(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let [offset, value] = ctx.evm.pop_n()?;
    let region = Region::resolve(offset, Word::from(32u8))?;
    ctx.evm.expand_memory(&[region])?;
    if let Some(region) = region {
        ctx.evm.memory.store(region.offset, &value);
    }
    Ok(Control::Continue)
}

// MSTORE8
pub fn mstore8(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let [offset, value] = ctx.evm.pop_n()?;
    let region = Region::resolve(offset, Word::one())?;
    ctx.evm.expand_memory(&[region])?;
    if let Some(region) = region {
        ctx.evm.memory.store_byte(region.offset, value.byte(0));
    }
    Ok(Control::Continue)
}

// MSIZE
pub fn msize(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let size = ctx.evm.memory.len();
    ctx.evm.push(Word::from(size))?;
    Ok(Control::Continue)
}

// MCOPY
pub fn mcopy(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let [dest, src, size] = ctx.evm.pop_n()?;
    let to = Region::resolve(dest, size)?;
    let from = Region::resolve(src, size)?;
    let (Some(to), Some(from)) = (to, from) else {
        return Ok(Control::Continue);
    };
    ctx.evm.charge(gas::copy_cost(to.size as u64))?;
    ctx.evm.expand_memory(&[Some(to), Some(from)])?;
    ctx.evm.memory.copy_within(from.offset, to.offset, to.size);
    Ok(Control::Continue)
}
