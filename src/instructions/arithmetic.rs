use crate::common::word::Word;
use crate::error::ExceptionalHalt;
use crate::interpreter::{Context, Control};

fn binary(
    ctx: &mut Context<'_>,
    f: impl FnOnce(Word, Word) -> Word,
) -> Result<Control, ExceptionalHalt> {
    let [a, b] = ctx.evm.pop_n()?;
    ctx.evm.push(f(a, b))?;
    Ok(Control::Continue)
}

fn ternary(
    ctx: &mut Context<'_>,
    f: impl FnOnce(Word, Word, Word) -> Word,
) -> Result<Control, ExceptionalHalt> {
    let [a, b, n] = ctx.evm.pop_n()?;
    ctx.evm.push(f(a, b, n))?;
    Ok(Control::Continue)
}

// ADD
pub fn add(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |a, b| a + b)
}

// MUL
pub fn mul(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |a, b| a * b)
}

// SUB
pub fn sub(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |a, b| a - b)
}

// DIV
pub fn div(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |a, b| a.div(b))
}

// SDIV
pub fn sdiv(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |a, b| a.sdiv(b))
}

// MOD
pub fn rem(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |a, b| a.rem(b))
}

// SMOD
pub fn smod(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |a, b| a.smod(b))
}

// ADDMOD
pub fn addmod(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ternary(ctx, |a, b, n| a.add_modulo(&b, &n))
}

// MULMOD
pub fn mulmod(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ternary(ctx, |a, b, n| a.mul_modulo(&b, &n))
}

// EXP
pub fn exp(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let [base, exponent] = ctx.evm.pop_n()?;
    let bytes = exponent.bits().div_ceil(8) as u64;
    ctx.evm.charge(ctx.config.gas.exp_byte * bytes)?;
    ctx.evm.push(base.pow(exponent))?;
    Ok(Control::Continue)
}

// SIGNEXTEND
pub fn signextend(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |byte, value| value.signextend(&byte))
}
