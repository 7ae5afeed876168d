use crate::common::word::Word;
use crate::error::ExceptionalHalt;
use crate::fork::SstoreRegime;
use crate::gas;
use crate::interpreter::{Context, Control};

use super::current_op;

/// EIP-2929 surcharge for a first access to the slot, zero before Berlin.
fn slot_access_cost(ctx: &mut Context<'_>, key: &Word) -> u64 {
    if !ctx.config.access_lists {
        return 0;
    }
    let address = ctx.evm.address();
    if ctx.substate.access_slot(&address, key) {
        gas::COLD_SLOAD
    } else {
        0
    }
}

// SLOAD
pub fn sload(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let key = ctx.evm.pop()?;
    let cold = slot_access_cost(ctx, &key);
    let cost = if cold > 0 { cold } else { ctx.config.gas.sload };
    ctx.evm.charge(cost)?;
    let value = ctx.state.storage(&ctx.evm.address(), &key);
    ctx.evm.push(value)?;
    Ok(Control::Continue)
}

/// Gas and refund delta of writing `new` over `current`.
fn sstore_cost(ctx: &Context<'_>, original: Word, current: Word, new: Word) -> (u64, i64) {
    let schedule = &ctx.config.gas;
    let clears = schedule.sstore_clears_refund as i64;
    match ctx.config.sstore {
        SstoreRegime::Legacy => {
            let cost = if current.is_zero() && !new.is_zero() {
                gas::SSTORE_SET
            } else {
                gas::SSTORE_RESET
            };
            let refund = if !current.is_zero() && new.is_zero() {
                clears
            } else {
                0
            };
            (cost, refund)
        }
        SstoreRegime::NetMetered => {
            if current == new {
                return (schedule.sload, 0);
            }
            if original == current {
                if original.is_zero() {
                    return (gas::SSTORE_SET, 0);
                }
                let refund = if new.is_zero() { clears } else { 0 };
                return (schedule.sstore_reset, refund);
            }
            let mut refund = 0;
            if !original.is_zero() {
                if current.is_zero() {
                    refund -= clears;
                }
                if new.is_zero() {
                    refund += clears;
                }
            }
            if original == new {
                let restored = if original.is_zero() {
                    gas::SSTORE_SET
                } else {
                    schedule.sstore_reset
                };
                refund += (restored - schedule.sload) as i64;
            }
            (schedule.sload, refund)
        }
    }
}

// SSTORE
pub fn sstore(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.require_non_static(current_op(ctx))?;
    let [key, new] = ctx.evm.pop_n()?;
    if ctx.config.sstore == SstoreRegime::NetMetered
        && ctx.evm.gas.remaining() <= gas::SSTORE_STIPEND
    {
        return Err(ExceptionalHalt::OutOfGas);
    }

    let address = ctx.evm.address();
    let current = ctx.state.storage(&address, &key);
    let original = ctx.substate.original(&address, &key, current);
    let cold = slot_access_cost(ctx, &key);
    let (cost, refund) = sstore_cost(ctx, original, current, new);
    ctx.evm.charge(cold + cost)?;
    ctx.evm.refund += refund;
    ctx.state.set_storage(&address, &key, new);
    Ok(Control::Continue)
}

// TLOAD
pub fn tload(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let key = ctx.evm.pop()?;
    let value = ctx.substate.tload(&ctx.evm.address(), &key);
    ctx.evm.push(value)?;
    Ok(Control::Continue)
}

// TSTORE
pub fn tstore(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.require_non_static(current_op(ctx))?;
    let [key, value] = ctx.evm.pop_n()?;
    let address = ctx.evm.address();
    ctx.substate.tstore(&address, &key, value);
    Ok(Control::Continue)
}
