use num_bigint::BigUint;
use num_traits::Zero;

use crate::fork::Fork;

use super::{PrecompileError, PrecompileOutput, charge, right_pad};

/// Reads `len` bytes at `offset`, zero-filling past the end of `input`.
fn slice_padded(input: &[u8], offset: u64, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    if offset < input.len() {
        let end = input.len().min(offset.saturating_add(len));
        out[..end - offset].copy_from_slice(&input[offset..end]);
    }
    out
}

fn length(word: &[u8]) -> Option<u64> {
    if word[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[24..]);
    Some(u64::from_be_bytes(bytes))
}

/// EIP-198: the adjusted exponent length.
fn iteration_count(exp_len: u64, exp_head: &BigUint, multiplier: u128) -> u128 {
    let bits = exp_head.bits() as u128;
    if exp_len <= 32 {
        bits.saturating_sub(1)
    } else {
        multiplier
            .saturating_mul(exp_len as u128 - 32)
            .saturating_add(bits.max(1) - 1)
    }
}

fn byzantium_complexity(x: u128) -> u128 {
    if x <= 64 {
        x * x
    } else if x <= 1024 {
        x * x / 4 + 96 * x - 3072
    } else {
        (x * x / 16 + 480 * x).saturating_sub(199_680)
    }
}

fn gas_cost(base_len: u64, exp_len: u64, mod_len: u64, exp_head: &BigUint, fork: Fork) -> u64 {
    let max_len = base_len.max(mod_len) as u128;
    let iterations = iteration_count(exp_len, exp_head, 8).max(1);
    let gas = if fork >= Fork::Berlin {
        // EIP-2565
        let words = max_len.div_ceil(8);
        (words * words).saturating_mul(iterations) / 3
    } else {
        byzantium_complexity(max_len).saturating_mul(iterations) / 20
    };
    let gas = u64::try_from(gas).unwrap_or(u64::MAX);
    if fork >= Fork::Berlin {
        gas.max(200)
    } else {
        gas
    }
}

// 0x05: Modular exponentiation
pub fn run(input: &[u8], gas: u64, fork: Fork) -> Result<PrecompileOutput, PrecompileError> {
    let header = right_pad::<96>(input);
    let (Some(base_len), Some(exp_len), Some(mod_len)) = (
        length(&header[0..32]),
        length(&header[32..64]),
        length(&header[64..96]),
    ) else {
        return Err(PrecompileError::OutOfGas);
    };

    let exp_offset = 96u64.saturating_add(base_len);
    let exp_head = slice_padded(input, exp_offset, exp_len.min(32) as usize);
    let exp_head = BigUint::from_bytes_be(&exp_head);
    let gas_used = charge(gas_cost(base_len, exp_len, mod_len, &exp_head, fork), gas)?;

    if mod_len == 0 {
        return Ok(PrecompileOutput::new(gas_used, Vec::new()));
    }

    // Paid-for lengths are small enough to allocate.
    let to_usize = |len: u64| usize::try_from(len).map_err(|_| PrecompileError::OutOfGas);
    let (base_size, exp_size, mod_size) = (to_usize(base_len)?, to_usize(exp_len)?, to_usize(mod_len)?);

    let base = BigUint::from_bytes_be(&slice_padded(input, 96, base_size));
    let exp = BigUint::from_bytes_be(&slice_padded(input, exp_offset, exp_size));
    let modulus = BigUint::from_bytes_be(&slice_padded(
        input,
        exp_offset.saturating_add(exp_len),
        mod_size,
    ));

    let mut output = vec![0u8; mod_size];
    if !modulus.is_zero() {
        let result = base.modpow(&exp, &modulus).to_bytes_be();
        output[mod_size - result.len()..].copy_from_slice(&result);
    }
    Ok(PrecompileOutput::new(gas_used, output))
}
