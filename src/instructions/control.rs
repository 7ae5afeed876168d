use crate::common::word::Word;
use crate::error::ExceptionalHalt;
use crate::interpreter::{Context, Control};
use crate::memory::Region;

fn jump_to(ctx: &mut Context<'_>, dest: Word) -> Result<Control, ExceptionalHalt> {
    let target = dest.as_usize();
    if dest.to_usize().is_none() || !ctx.evm.code.is_jumpdest(target) {
        return Err(ExceptionalHalt::InvalidJump(target));
    }
    ctx.evm.pc = target;
    Ok(Control::Continue)
}

// STOP
pub fn stop(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.evm.halt(Vec::new());
    Ok(Control::Continue)
}

// JUMP
pub fn jump(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let dest = ctx.evm.pop()?;
    jump_to(ctx, dest)
}

// JUMPI
pub fn jumpi(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let [dest, cond] = ctx.evm.pop_n()?;
    if cond.is_zero() {
        return Ok(Control::Continue);
    }
    jump_to(ctx, dest)
}

// PC
pub fn pc(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let pc = ctx.evm.pc - 1;
    ctx.evm.push(Word::from(pc))?;
    Ok(Control::Continue)
}

// GAS
pub fn gas(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let remaining = ctx.evm.gas.remaining();
    ctx.evm.push(Word::from(remaining))?;
    Ok(Control::Continue)
}

// JUMPDEST
pub fn jumpdest(_ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    Ok(Control::Continue)
}

fn output(ctx: &mut Context<'_>) -> Result<Vec<u8>, ExceptionalHalt> {
    let [offset, size] = ctx.evm.pop_n()?;
    let region = Region::resolve(offset, size)?;
    ctx.evm.expand_memory(&[region])?;
    Ok(ctx.evm.memory.get(region).to_vec())
}

// RETURN
pub fn ret(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let output = output(ctx)?;
    ctx.evm.halt(output);
    Ok(Control::Continue)
}

// REVERT
pub fn revert(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let output = output(ctx)?;
    ctx.evm.revert(output);
    Ok(Control::Continue)
}

// INVALID
pub fn invalid(_ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    Err(ExceptionalHalt::InvalidOpcode(0xfe))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::common::word::Word;
    use crate::error::ExceptionalHalt;
    use crate::evm::ExitStatus;
    use crate::fork::Fork;
    use crate::instructions::test_utils::run;

    #[test]
    fn test_jump_to_jumpdest() {
        // PUSH1 4 JUMP INVALID JUMPDEST PUSH1 1
        let (evm, result, _) = run(Fork::Cancun, &[0x60, 0x04, 0x56, 0xfe, 0x5b, 0x60, 0x01], 100);
        assert!(result.status.is_success());
        assert_eq!(evm.stack.data(), &[Word::one()]);
        assert_eq!(evm.gas.used, 3 + 8 + 1 + 3);
    }

    #[test]
    fn test_jump_into_push_data() {
        // PUSH1 3 JUMP PUSH1 0x5b
        let (_, result, _) = run(Fork::Cancun, &[0x60, 0x03, 0x56, 0x60, 0x5b], 100);
        assert_eq!(result.status, ExitStatus::Errored(ExceptionalHalt::InvalidJump(3)));
        assert_eq!(result.gas_left, 0);
    }

    #[test]
    fn test_jumpi() {
        // PUSH1 0 PUSH1 6 JUMPI STOP JUMPDEST ... taken only when the condition is non-zero
        let (evm, result, _) = run(Fork::Cancun, &[0x60, 0x00, 0x60, 0x06, 0x57, 0x00, 0x5b], 100);
        assert!(result.status.is_success());
        assert_eq!(evm.pc, 6);
        let (evm, _, _) = run(Fork::Cancun, &[0x60, 0x01, 0x60, 0x06, 0x57, 0x00, 0x5b], 100);
        assert_eq!(evm.pc, 7);
    }

    #[test]
    fn test_pc_and_gas() {
        // PC PC GAS
        let (evm, _, _) = run(Fork::Cancun, &[0x58, 0x58, 0x5a], 100);
        assert_eq!(
            evm.stack.data(),
            &[Word::zero(), Word::one(), Word::from(100u64 - 6)]
        );
    }

    #[test]
    fn test_revert_keeps_gas() {
        // PUSH1 0xff PUSH1 0 MSTORE8 PUSH1 1 PUSH1 0 REVERT
        let code = [0x60, 0xff, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xfd];
        let (_, result, _) = run(Fork::Cancun, &code, 100);
        assert_eq!(result.status, ExitStatus::Reverted(vec![0xff]));
        assert_eq!(result.gas_left, 100 - (3 + 3 + 3 + 3 + 3 + 3));
    }

    #[test]
    fn test_invalid() {
        let (_, result, _) = run(Fork::Cancun, &[0xfe], 100);
        assert_eq!(result.status, ExitStatus::Errored(ExceptionalHalt::InvalidOpcode(0xfe)));
        // undefined opcode
        let (_, result, _) = run(Fork::Cancun, &[0x0c], 100);
        assert_eq!(result.status, ExitStatus::Errored(ExceptionalHalt::InvalidOpcode(0x0c)));
    }
}
