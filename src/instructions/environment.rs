use crate::common::{address::Address, hash::keccak256, word::Word};
use crate::error::ExceptionalHalt;
use crate::gas;
use crate::interpreter::{Context, Control};
use crate::memory::Region;

/// Copies a padded slice of `src` into memory: `[dest, offset, size]` on the stack.
fn copy_to_memory(
    ctx: &mut Context<'_>,
    src: impl FnOnce(&Context<'_>) -> Vec<u8>,
) -> Result<Control, ExceptionalHalt> {
    let [dest, offset, size] = ctx.evm.pop_n()?;
    let region = Region::resolve(dest, size)?;
    copy_region(ctx, region, offset, src)
}

fn copy_region(
    ctx: &mut Context<'_>,
    region: Option<Region>,
    offset: Word,
    src: impl FnOnce(&Context<'_>) -> Vec<u8>,
) -> Result<Control, ExceptionalHalt> {
    let Some(region) = region else {
        return Ok(Control::Continue);
    };
    ctx.evm.charge(gas::copy_cost(region.size as u64))?;
    ctx.evm.expand_memory(&[Some(region)])?;
    let data = src(ctx);
    ctx.evm
        .memory
        .copy_padded(region, &data, offset.saturating_u64());
    Ok(Control::Continue)
}

// KECCAK256
pub fn keccak256_op(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let [offset, size] = ctx.evm.pop_n()?;
    let region = Region::resolve(offset, size)?;
    let words = region.map(|r| gas::words(r.size as u64)).unwrap_or_default();
    ctx.evm.charge(gas::KECCAK256_WORD * words)?;
    ctx.evm.expand_memory(&[region])?;
    let hash = keccak256(ctx.evm.memory.get(region));
    ctx.evm.push(Word::from_bytes(&hash))?;
    Ok(Control::Continue)
}

// ADDRESS
pub fn address(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let this = ctx.evm.address();
    ctx.evm.push(this.as_word())?;
    Ok(Control::Continue)
}

// BALANCE
pub fn balance(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let address = Address::from(ctx.evm.pop()?);
    let cost = ctx.account_access_cost(&address, ctx.config.gas.balance);
    ctx.evm.charge(cost)?;
    let balance = ctx.state.balance(&address);
    ctx.evm.push(balance)?;
    Ok(Control::Continue)
}

// ORIGIN
pub fn origin(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.evm.push(ctx.tx.origin.as_word())?;
    Ok(Control::Continue)
}

// CALLER
pub fn caller(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let caller = ctx.evm.message.caller;
    ctx.evm.push(caller.as_word())?;
    Ok(Control::Continue)
}

// CALLVALUE
pub fn callvalue(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let value = ctx.evm.message.value;
    ctx.evm.push(value)?;
    Ok(Control::Continue)
}

// CALLDATALOAD
pub fn calldataload(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let offset = ctx.evm.pop()?;
    let data = &ctx.evm.message.data;
    let mut word = [0u8; 32];
    if let Some(start) = offset.to_usize().filter(|start| *start < data.len()) {
        let end = data.len().min(start + 32);
        word[..end - start].copy_from_slice(&data[start..end]);
    }
    ctx.evm.push(Word::from_bytes(&word))?;
    Ok(Control::Continue)
}

// CALLDATASIZE
pub fn calldatasize(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let size = ctx.evm.message.data.len();
    ctx.evm.push(Word::from(size))?;
    Ok(Control::Continue)
}

// CALLDATACOPY
pub fn calldatacopy(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    copy_to_memory(ctx, |ctx| ctx.evm.message.data.to_vec())
}

// CODESIZE
pub fn codesize(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let size = ctx.evm.code.len();
    ctx.evm.push(Word::from(size))?;
    Ok(Control::Continue)
}

// CODECOPY
pub fn codecopy(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    copy_to_memory(ctx, |ctx| ctx.evm.code.code().to_vec())
}

// GASPRICE
pub fn gasprice(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.evm.push(ctx.tx.gas_price)?;
    Ok(Control::Continue)
}

// EXTCODESIZE
pub fn extcodesize(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let address = Address::from(ctx.evm.pop()?);
    let cost = ctx.account_access_cost(&address, ctx.config.gas.extcode);
    ctx.evm.charge(cost)?;
    let size = ctx.state.code(&address).len();
    ctx.evm.push(Word::from(size))?;
    Ok(Control::Continue)
}

// EXTCODECOPY
pub fn extcodecopy(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let [address, dest, offset, size] = ctx.evm.pop_n()?;
    let address = Address::from(address);
    let region = Region::resolve(dest, size)?;
    let cost = ctx.account_access_cost(&address, ctx.config.gas.extcode);
    ctx.evm.charge(cost)?;
    copy_region(ctx, region, offset, |ctx| ctx.state.code(&address).to_vec())
}

// RETURNDATASIZE
pub fn returndatasize(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let size = ctx.evm.return_data.len();
    ctx.evm.push(Word::from(size))?;
    Ok(Control::Continue)
}

// RETURNDATACOPY
pub fn returndatacopy(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let [dest, offset, size] = ctx.evm.pop_n()?;
    let end = offset
        .checked_add(size)
        .ok_or(ExceptionalHalt::ReturnDataOutOfBounds)?;
    if end > Word::from(ctx.evm.return_data.len()) {
        return Err(ExceptionalHalt::ReturnDataOutOfBounds);
    }
    let region = Region::resolve(dest, size)?;
    copy_region(ctx, region, offset, |ctx| ctx.evm.return_data.clone())
}

// EXTCODEHASH
pub fn extcodehash(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let address = Address::from(ctx.evm.pop()?);
    let cost = ctx.account_access_cost(&address, ctx.config.gas.extcodehash);
    ctx.evm.charge(cost)?;
    let hash = match ctx.state.account(&address) {
        Some(account) if !account.is_empty() => Word::from_bytes(&account.code_hash()),
        _ => Word::zero(),
    };
    ctx.evm.push(hash)?;
    Ok(Control::Continue)
}

#[cfg(test)]
mod tests {
    use crate::common::{hash::keccak256, word::Word};
    use crate::error::ExceptionalHalt;
    use crate::evm::ExitStatus;
    use crate::fork::Fork;
    use crate::instructions::test_utils::{CONTRACT, run};

    #[test]
    fn test_keccak256() {
        // PUSH1 0 PUSH1 0 KECCAK256
        let (evm, result, _) = run(Fork::Cancun, &[0x60, 0x00, 0x60, 0x00, 0x20], 1000);
        assert!(result.status.is_success());
        assert_eq!(evm.stack.peek(0).unwrap(), Word::from_bytes(&keccak256(&[])));
        assert_eq!(evm.gas.used, 3 + 3 + 30);
        assert_eq!(evm.memory.len(), 0);

        // PUSH1 32 PUSH1 0 KECCAK256: one word hashed, one word of memory
        let (evm, _, _) = run(Fork::Cancun, &[0x60, 0x20, 0x60, 0x00, 0x20], 1000);
        assert_eq!(evm.stack.peek(0).unwrap(), Word::from_bytes(&keccak256(&[0u8; 32])));
        assert_eq!(evm.gas.used, 3 + 3 + 30 + 6 + 3);
    }

    #[test]
    fn test_address_and_codesize() {
        // ADDRESS CODESIZE
        let (evm, _, _) = run(Fork::Cancun, &[0x30, 0x38], 1000);
        assert_eq!(evm.stack.peek(1).unwrap(), CONTRACT.as_word());
        assert_eq!(evm.stack.peek(0).unwrap(), Word::from(2u8));
    }

    #[test]
    fn test_codecopy_pads_with_zeros() {
        // PUSH1 8 PUSH1 4 PUSH1 0 CODECOPY PUSH1 8 PUSH1 0 RETURN
        let code = [0x60, 0x08, 0x60, 0x04, 0x60, 0x00, 0x39, 0x60, 0x08, 0x60, 0x00, 0xf3];
        let (_, result, _) = run(Fork::Cancun, &code, 1000);
        assert_eq!(
            result.status,
            ExitStatus::Halted(vec![0x60, 0x00, 0x39, 0x60, 0x08, 0x60, 0x00, 0xf3])
        );
        let code = [0x60, 0x08, 0x60, 0x0a, 0x60, 0x00, 0x39, 0x60, 0x08, 0x60, 0x00, 0xf3];
        let (_, result, _) = run(Fork::Cancun, &code, 1000);
        assert_eq!(result.status, ExitStatus::Halted(vec![0x00, 0xf3, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_calldataload_past_end() {
        // PUSH1 0 CALLDATALOAD PUSH32 max CALLDATALOAD
        let mut code = vec![0x60, 0x00, 0x35, 0x7f];
        code.extend_from_slice(&[0xff; 32]);
        code.push(0x35);
        let (evm, result, _) = run(Fork::Cancun, &code, 1000);
        assert!(result.status.is_success());
        assert_eq!(evm.stack.data(), &[Word::zero(), Word::zero()]);
    }

    #[test]
    fn test_returndatacopy_out_of_bounds() {
        // PUSH1 1 PUSH1 0 PUSH1 0 RETURNDATACOPY
        let (_, result, _) = run(Fork::Cancun, &[0x60, 0x01, 0x60, 0x00, 0x60, 0x00, 0x3e], 1000);
        assert_eq!(
            result.status,
            ExitStatus::Errored(ExceptionalHalt::ReturnDataOutOfBounds)
        );
        assert_eq!(result.gas_left, 0);
    }

    #[test]
    fn test_balance_cold_then_warm() {
        // PUSH1 0xaa BALANCE PUSH1 0xaa BALANCE
        let (evm, _, _) = run(Fork::Berlin, &[0x60, 0xaa, 0x31, 0x60, 0xaa, 0x31], 10_000);
        assert_eq!(evm.gas.used, 3 + 2600 + 3 + 100);
        let (evm, _, _) = run(Fork::Istanbul, &[0x60, 0xaa, 0x31, 0x60, 0xaa, 0x31], 10_000);
        assert_eq!(evm.gas.used, 3 + 700 + 3 + 700);
    }

    #[test]
    fn test_extcodehash_of_missing_account() {
        // PUSH1 0xaa EXTCODEHASH
        let (evm, _, _) = run(Fork::Cancun, &[0x60, 0xaa, 0x3f], 10_000);
        assert_eq!(evm.stack.peek(0).unwrap(), Word::zero());
    }
}
