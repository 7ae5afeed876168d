use std::sync::Arc;

use crate::common::{
    address::Address,
    message::{CallKind, Message},
    word::Word,
};
use crate::error::ExceptionalHalt;
use crate::evm::PendingCall;
use crate::gas;
use crate::interpreter::{Context, Control};
use crate::memory::Region;

use super::current_op;

pub const STACK_DEPTH_LIMIT: usize = 1024;

/// A call that never starts a frame: the forwarded gas goes back and 0 is pushed.
fn light_failure(ctx: &mut Context<'_>, gas: u64) -> Result<Control, ExceptionalHalt> {
    ctx.evm.gas.add(gas);
    ctx.evm.return_data.clear();
    ctx.evm.push(Word::zero())?;
    Ok(Control::Continue)
}

fn transfers_value(kind: CallKind) -> bool {
    matches!(kind, CallKind::Call | CallKind::CallCode)
}

fn call_kind(ctx: &mut Context<'_>, kind: CallKind) -> Result<Control, ExceptionalHalt> {
    let [requested, to] = ctx.evm.pop_n()?;
    let value = if transfers_value(kind) {
        ctx.evm.pop()?
    } else {
        Word::zero()
    };
    let [in_offset, in_size, out_offset, out_size] = ctx.evm.pop_n()?;
    let to = Address::from(to);

    if kind == CallKind::Call && ctx.evm.message.is_static && !value.is_zero() {
        return Err(ExceptionalHalt::WriteInStaticContext(current_op(ctx)));
    }

    let input = Region::resolve(in_offset, in_size)?;
    let ret = Region::resolve(out_offset, out_size)?;

    let mut cost = ctx.account_access_cost(&to, ctx.config.gas.call);
    let with_value = transfers_value(kind) && !value.is_zero();
    if with_value {
        cost += gas::CALL_VALUE;
    }
    if kind == CallKind::Call {
        let new_account = if ctx.config.empty_account_semantics {
            with_value && ctx.state.is_empty(&to)
        } else {
            !ctx.state.exists(&to)
        };
        if new_account {
            cost += gas::NEW_ACCOUNT;
        }
    }
    ctx.evm.expand_memory(&[input, ret])?;
    ctx.evm.charge(cost)?;

    let remaining = ctx.evm.gas.remaining();
    let forwarded = if ctx.config.all_but_one_64th {
        requested.saturating_u64().min(gas::max_call_gas(remaining))
    } else {
        requested.to_u64().ok_or(ExceptionalHalt::OutOfGas)?
    };
    ctx.evm.charge(forwarded)?;
    let gas = if with_value {
        forwarded + gas::CALL_STIPEND
    } else {
        forwarded
    };

    let this = ctx.evm.address();
    if ctx.evm.message.depth >= STACK_DEPTH_LIMIT
        || (with_value && ctx.state.balance(&this) < value)
    {
        return light_failure(ctx, gas);
    }

    let parent = &ctx.evm.message;
    let (caller, current_target, value) = match kind {
        CallKind::DelegateCall => (parent.caller, this, parent.value),
        CallKind::CallCode => (this, this, value),
        _ => (this, to, value),
    };
    let message = Message {
        kind,
        caller,
        target: Some(to),
        current_target,
        code_address: to,
        code: ctx.state.code(&to),
        data: Arc::from(ctx.evm.memory.get(input)),
        gas,
        value,
        depth: parent.depth + 1,
        is_static: parent.is_static || kind == CallKind::StaticCall,
        should_transfer_value: kind != CallKind::DelegateCall,
    };
    ctx.evm.pending = Some(PendingCall {
        is_create: false,
        ret,
    });
    Ok(Control::Call(Box::new(message)))
}

fn create_kind(ctx: &mut Context<'_>, kind: CallKind) -> Result<Control, ExceptionalHalt> {
    ctx.require_non_static(current_op(ctx))?;
    let [value, offset, size] = ctx.evm.pop_n()?;
    let salt = if kind == CallKind::Create2 {
        Some(ctx.evm.pop()?)
    } else {
        None
    };

    let region = Region::resolve(offset, size)?;
    let len = region.map(|r| r.size).unwrap_or_default();
    if ctx.config.max_initcode_size.is_some_and(|max| len > max) {
        return Err(ExceptionalHalt::InitcodeSizeLimit);
    }
    let mut cost = 0;
    if ctx.config.max_initcode_size.is_some() {
        cost += gas::initcode_cost(len as u64);
    }
    if salt.is_some() {
        cost += gas::KECCAK256_WORD * gas::words(len as u64);
    }
    ctx.evm.expand_memory(&[region])?;
    ctx.evm.charge(cost)?;

    let remaining = ctx.evm.gas.remaining();
    let gas = if ctx.config.all_but_one_64th {
        gas::max_call_gas(remaining)
    } else {
        remaining
    };
    ctx.evm.charge(gas)?;

    let this = ctx.evm.address();
    let nonce = ctx.state.nonce(&this);
    if ctx.evm.message.depth >= STACK_DEPTH_LIMIT
        || ctx.state.balance(&this) < value
        || nonce == u64::MAX
    {
        return light_failure(ctx, gas);
    }
    ctx.state.set_nonce(&this, nonce + 1);

    let initcode = ctx.evm.memory.get(region).to_vec();
    let address = match salt {
        Some(salt) => this.create2(&salt, &initcode),
        None => this.create(nonce),
    };
    if ctx.config.access_lists {
        ctx.substate.access_account(&address);
    }

    let parent = &ctx.evm.message;
    let message = Message {
        kind,
        caller: this,
        target: Some(address),
        current_target: address,
        code_address: address,
        code: Arc::from(initcode),
        data: Arc::from(Vec::new()),
        gas,
        value,
        depth: parent.depth + 1,
        is_static: false,
        should_transfer_value: true,
    };
    ctx.evm.pending = Some(PendingCall {
        is_create: true,
        ret: None,
    });
    Ok(Control::Call(Box::new(message)))
}

// CREATE
pub fn create(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    create_kind(ctx, CallKind::Create)
}

// CALL
pub fn call(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    call_kind(ctx, CallKind::Call)
}

// CALLCODE
pub fn callcode(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    call_kind(ctx, CallKind::CallCode)
}

// DELEGATECALL
pub fn delegatecall(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    call_kind(ctx, CallKind::DelegateCall)
}

// CREATE2
pub fn create2(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    create_kind(ctx, CallKind::Create2)
}

// STATICCALL
pub fn staticcall(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    call_kind(ctx, CallKind::StaticCall)
}

// SELFDESTRUCT
pub fn selfdestruct(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.require_non_static(current_op(ctx))?;
    let beneficiary = Address::from(ctx.evm.pop()?);
    let this = ctx.evm.address();
    let balance = ctx.state.balance(&this);

    let mut cost = ctx.config.gas.selfdestruct;
    if ctx.config.access_lists && ctx.substate.access_account(&beneficiary) {
        cost += gas::COLD_ACCOUNT_ACCESS;
    }
    if ctx.config.gas.selfdestruct_new_account {
        let new_account = if ctx.config.empty_account_semantics {
            !balance.is_zero() && ctx.state.is_empty(&beneficiary)
        } else {
            !ctx.state.exists(&beneficiary)
        };
        if new_account {
            cost += gas::NEW_ACCOUNT;
        }
    }
    ctx.evm.charge(cost)?;

    let deletes = !ctx.config.selfdestruct_only_created || ctx.substate.is_created(&this);
    if deletes && !ctx.evm.accounts_to_delete.contains(&this) {
        ctx.evm.refund += ctx.config.gas.selfdestruct_refund as i64;
    }
    if beneficiary != this {
        ctx.state.transfer(&this, &beneficiary, balance);
    }
    ctx.substate.touch(&beneficiary);
    if deletes {
        ctx.state.set_balance(&this, Word::zero());
        ctx.evm.accounts_to_delete.insert(this);
    }
    ctx.evm.halt(Vec::new());
    Ok(Control::Continue)
}
