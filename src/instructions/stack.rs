use crate::common::word::Word;
use crate::error::ExceptionalHalt;
use crate::interpreter::{Context, Control};

use super::current_op;

// POP
pub fn pop(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.evm.pop()?;
    Ok(Control::Continue)
}

// PUSH0
pub fn push0(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    ctx.evm.push(Word::zero())?;
    Ok(Control::Continue)
}

// PUSH1..PUSH32: immediates running past the end of code read as zeros
pub fn push(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let n = (current_op(ctx) - 0x5f) as usize;
    let code = ctx.evm.code.code();
    let start = ctx.evm.pc.min(code.len());
    let end = (ctx.evm.pc + n).min(code.len());
    let mut bytes = [0u8; 32];
    bytes[32 - n..32 - n + (end - start)].copy_from_slice(&code[start..end]);
    ctx.evm.push(Word::from_bytes(&bytes))?;
    ctx.evm.pc += n;
    Ok(Control::Continue)
}

// DUP1..DUP16
pub fn dup(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let n = (current_op(ctx) - 0x7f) as usize;
    ctx.evm.stack.dup(n)?;
    Ok(Control::Continue)
}

// SWAP1..SWAP16
pub fn swap(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let n = (current_op(ctx) - 0x8f) as usize;
    ctx.evm.stack.swap(n)?;
    Ok(Control::Continue)
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
    fn test_push_truncated() {
        // PUSH3 0x01 0x02 <end>
        let (evm, result, _) = run(Fork::Cancun, &[0x62, 0x01, 0x02], 100);
        assert!(result.status.is_success());
        assert_eq!(evm.stack.data(), &[Word::from(0x010200u32)]);
    }

    #[test]
    fn test_push32() {
        let mut code = vec![0x7f];
        code.extend((1..=32u8).collect::<Vec<_>>());
        let (evm, _, _) = run(Fork::Cancun, &code, 100);
        assert_eq!(evm.stack.peek(0).unwrap(), Word::from_bytes(&code[1..]));
        assert_eq!(evm.pc, 33);
    }

    #[test]
    fn test_push0_since_shanghai() {
        let (evm, result, _) = run(Fork::Shanghai, &[0x5f], 100);
        assert!(result.status.is_success());
        assert_eq!(evm.gas.used, 2);
        let (_, result, _) = run(Fork::Paris, &[0x5f], 100);
        assert_eq!(result.status, ExitStatus::Errored(ExceptionalHalt::InvalidOpcode(0x5f)));
    }

    #[test]
    fn test_dup_swap() {
        // PUSH1 1 PUSH1 2 DUP2 SWAP2
        let (evm, _, _) = run(Fork::Cancun, &[0x60, 0x01, 0x60, 0x02, 0x81, 0x91], 100);
        assert_eq!(
            evm.stack.data(),
            &[Word::one(), Word::from(2u8), Word::one()]
        );
        // PUSH1 1 DUP2
        let (_, result, _) = run(Fork::Cancun, &[0x60, 0x01, 0x81], 100);
        assert_eq!(result.status, ExitStatus::Errored(ExceptionalHalt::StackUnderflow));
    }

    #[test]
    fn test_pop_empty() {
        let (_, result, _) = run(Fork::Cancun, &[0x50], 100);
        assert_eq!(result.status, ExitStatus::Errored(ExceptionalHalt::StackUnderflow));
    }
}
