use crate::common::word::Word;
use crate::error::ExceptionalHalt;
use crate::interpreter::{Context, Control};

// BLOCKHASH
pub fn blockhash(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let number = ctx.evm.pop()?;
    let hash = number
        .to_u64()
        .map(|number| ctx.env.block_hash(number))
        .unwrap_or_default();
    ctx.evm.push(hash)?;
    Ok(Control::Continue)
}

// COINBASE
pub fn coinbase(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.evm.push(ctx.env.coinbase.as_word())?;
    Ok(Control::Continue)
}

// TIMESTAMP
pub fn timestamp(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.evm.push(Word::from(ctx.env.timestamp))?;
    Ok(Control::Continue)
}

// NUMBER
pub fn number(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.evm.push(Word::from(ctx.env.number))?;
    Ok(Control::Continue)
}

// DIFFICULTY, PREVRANDAO after the merge
pub fn difficulty(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let value = match ctx.env.prev_randao {
        Some(randao) if ctx.config.prev_randao => randao,
        _ => ctx.env.difficulty,
    };
    ctx.evm.push(value)?;
    Ok(Control::Continue)
}

// GASLIMIT
pub fn gaslimit(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.evm.push(Word::from(ctx.env.gas_limit))?;
    Ok(Control::Continue)
}

// CHAINID
pub fn chainid(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.evm.push(Word::from(ctx.env.chain_id))?;
    Ok(Control::Continue)
}

// SELFBALANCE
pub fn selfbalance(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let balance = ctx.state.balance(&ctx.evm.address());
    ctx.evm.push(balance)?;
    Ok(Control::Continue)
}

// BASEFEE
pub fn basefee(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.evm.push(ctx.env.base_fee)?;
    Ok(Control::Continue)
}

// BLOBHASH
pub fn blobhash(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let index = ctx.evm.pop()?;
    let hash = index
        .to_usize()
        .and_then(|index| ctx.tx.blob_hashes.get(index).copied())
        .unwrap_or_default();
    ctx.evm.push(hash)?;
    Ok(Control::Continue)
}

// BLOBBASEFEE
pub fn blobbasefee(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let price = ctx
        .config
        .blob_base_fee_update_fraction
        .map(|fraction| ctx.env.blob_gas_price(fraction))
        .unwrap_or_default();
    ctx.evm.push(price)?;
    Ok(Control::Continue)
}
