use crate::common::word::Word;
use crate::error::ExceptionalHalt;
use crate::interpreter::{Context, Control};

fn compare(
    ctx: &mut Context<'_>,
    f: impl FnOnce(&Word, &Word) -> bool,
) -> Result<Control, ExceptionalHalt> {
    let [a, b] = ctx.evm.pop_n()?;
    ctx.evm.push(Word::from_bool(f(&a, &b)))?;
    Ok(Control::Continue)
}

fn binary(
    ctx: &mut Context<'_>,
    f: impl FnOnce(Word, Word) -> Word,
) -> Result<Control, ExceptionalHalt> {
    let [a, b] = ctx.evm.pop_n()?;
    ctx.evm.push(f(a, b))?;
    Ok(Control::Continue)
}

/// Shift amount as usize; anything from 256 up shifts everything out.
fn shift_amount(shift: &Word) -> usize {
    shift.to_usize().unwrap_or(usize::MAX).min(256)
}

// LT
pub fn lt(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    compare(ctx, |a, b| a < b)
}

// GT
pub fn gt(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    compare(ctx, |a, b| a > b)
}

// SLT
pub fn slt(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    compare(ctx, |a, b| a.slt(b))
}

// SGT
pub fn sgt(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    compare(ctx, |a, b| a.sgt(b))
}

// EQ
pub fn eq(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    compare(ctx, |a, b| a == b)
}

// ISZERO
pub fn iszero(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let a = ctx.evm.pop()?;
    ctx.evm.push(Word::from_bool(a.is_zero()))?;
    Ok(Control::Continue)
}

// AND
pub fn and(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |a, b| a & b)
}

// OR
pub fn or(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |a, b| a | b)
}

// XOR
pub fn xor(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |a, b| a ^ b)
}

// NOT
pub fn not(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    let a = ctx.evm.pop()?;
    ctx.evm.push(!a)?;
    Ok(Control::Continue)
}

// BYTE
pub fn byte(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |i, x| match i.to_usize() {
        Some(i) if i < 32 => Word::from(x.byte(31 - i)),
        _ => Word::zero(),
    })
}

// SHL
pub fn shl(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |shift, value| value << shift_amount(&shift))
}

// SHR
pub fn shr(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |shift, value| value >> shift_amount(&shift))
}

// SAR
pub fn sar(ctx: &mut Context<'_>) -> Result<Control, ExceptionalHalt> {
    binary(ctx, |shift, value| value.sar(shift_amount(&shift)))
}

#[cfg(test)]
mod tests {
    use crate::common::word::Word;
    use crate::fork::Fork;
    use crate::instructions::test_utils::run;

    fn top(code: &[u8]) -> Word {
        let (evm, result, _) = run(Fork::Cancun, code, 1000);
        assert!(result.status.is_success());
        evm.stack.peek(0).unwrap()
    }

    #[test]
    fn test_comparisons() {
        // PUSH1 2 PUSH1 1 LT => 1 < 2
        assert_eq!(top(&[0x60, 0x02, 0x60, 0x01, 0x10]), Word::one());
        // PUSH1 2 PUSH1 1 GT
        assert_eq!(top(&[0x60, 0x02, 0x60, 0x01, 0x11]), Word::zero());
        // PUSH1 1 PUSH32 -1 SLT => -1 < 1
        let mut code = vec![0x60, 0x01, 0x7f];
        code.extend_from_slice(&[0xff; 32]);
        code.push(0x12);
        assert_eq!(top(&code), Word::one());
        // PUSH1 0 ISZERO
        assert_eq!(top(&[0x60, 0x00, 0x15]), Word::one());
    }

    #[test]
    fn test_byte() {
        // PUSH2 0xabcd PUSH1 31 BYTE
        assert_eq!(top(&[0x61, 0xab, 0xcd, 0x60, 0x1f, 0x1a]), Word::from(0xcdu8));
        // PUSH2 0xabcd PUSH1 30 BYTE
        assert_eq!(top(&[0x61, 0xab, 0xcd, 0x60, 0x1e, 0x1a]), Word::from(0xabu8));
        // PUSH2 0xabcd PUSH1 32 BYTE
        assert_eq!(top(&[0x61, 0xab, 0xcd, 0x60, 0x20, 0x1a]), Word::zero());
    }

    #[test]
    fn test_shifts() {
        // PUSH1 1 PUSH1 4 SHL
        assert_eq!(top(&[0x60, 0x01, 0x60, 0x04, 0x1b]), Word::from(16u8));
        // PUSH1 16 PUSH1 4 SHR
        assert_eq!(top(&[0x60, 0x10, 0x60, 0x04, 0x1c]), Word::one());
        // PUSH1 1 PUSH2 0x0100 SHL
        assert_eq!(top(&[0x60, 0x01, 0x61, 0x01, 0x00, 0x1b]), Word::zero());
        // PUSH32 -1 PUSH2 0x0100 SAR
        let mut code = vec![0x7f];
        code.extend_from_slice(&[0xff; 32]);
        code.extend_from_slice(&[0x61, 0x01, 0x00, 0x1d]);
        assert_eq!(top(&code), Word::max());
    }

    #[test]
    fn test_shift_unavailable_before_constantinople() {
        let (_, result, _) = run(Fork::Byzantium, &[0x60, 0x01, 0x60, 0x04, 0x1b], 1000);
        assert!(!result.status.is_success());
        assert_eq!(result.gas_left, 0);
    }
}
