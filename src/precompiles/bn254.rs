use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ec::{AffineRepr, CurveGroup, pairing::Pairing};
use ark_ff::{BigInteger, One, PrimeField, Zero};

use crate::fork::Fork;

use super::{PrecompileError, PrecompileOutput, charge, right_pad};

const FQ_LEN: usize = 32;
const G1_LEN: usize = 2 * FQ_LEN;
const G2_LEN: usize = 4 * FQ_LEN;
const PAIR_LEN: usize = G1_LEN + G2_LEN;

/// Big-endian field element; values not below the modulus are rejected.
fn read_fq(bytes: &[u8]) -> Result<Fq, PrecompileError> {
    let fq = Fq::from_be_bytes_mod_order(bytes);
    if fq.into_bigint().to_bytes_be() != bytes {
        return Err(PrecompileError::InvalidFieldElement);
    }
    Ok(fq)
}

fn write_fq(fq: Fq, out: &mut [u8]) {
    out.copy_from_slice(&fq.into_bigint().to_bytes_be());
}

/// `x ++ y`; all zeroes is the point at infinity.
fn read_g1(bytes: &[u8]) -> Result<G1Affine, PrecompileError> {
    let x = read_fq(&bytes[..FQ_LEN])?;
    let y = read_fq(&bytes[FQ_LEN..G1_LEN])?;
    if x.is_zero() && y.is_zero() {
        return Ok(G1Affine::identity());
    }
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() {
        return Err(PrecompileError::PointNotOnCurve);
    }
    Ok(point)
}

fn write_g1(point: G1Affine) -> Vec<u8> {
    let mut out = vec![0u8; G1_LEN];
    if !point.infinity {
        write_fq(point.x, &mut out[..FQ_LEN]);
        write_fq(point.y, &mut out[FQ_LEN..]);
    }
    out
}

/// Each coordinate is encoded imaginary part first.
fn read_g2(bytes: &[u8]) -> Result<G2Affine, PrecompileError> {
    let x = Fq2::new(read_fq(&bytes[32..64])?, read_fq(&bytes[0..32])?);
    let y = Fq2::new(read_fq(&bytes[96..128])?, read_fq(&bytes[64..96])?);
    if x.is_zero() && y.is_zero() {
        return Ok(G2Affine::identity());
    }
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() {
        return Err(PrecompileError::PointNotOnCurve);
    }
    if !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PrecompileError::PointNotInSubgroup);
    }
    Ok(point)
}

fn bool_word(value: bool) -> Vec<u8> {
    let mut out = vec![0u8; 32];
    out[31] = value as u8;
    out
}

// 0x06: alt_bn128 addition (EIP-196, EIP-1108 pricing)
pub fn add(input: &[u8], gas: u64, fork: Fork) -> Result<PrecompileOutput, PrecompileError> {
    let cost = if fork >= Fork::Istanbul { 150 } else { 500 };
    let gas_used = charge(cost, gas)?;
    let input = right_pad::<{ 2 * G1_LEN }>(input);
    let p = read_g1(&input[..G1_LEN])?;
    let q = read_g1(&input[G1_LEN..])?;
    let sum = (p.into_group() + q.into_group()).into_affine();
    Ok(PrecompileOutput::new(gas_used, write_g1(sum)))
}

// 0x07: alt_bn128 scalar multiplication
pub fn mul(input: &[u8], gas: u64, fork: Fork) -> Result<PrecompileOutput, PrecompileError> {
    let cost = if fork >= Fork::Istanbul { 6000 } else { 40000 };
    let gas_used = charge(cost, gas)?;
    let input = right_pad::<{ G1_LEN + 32 }>(input);
    let p = read_g1(&input[..G1_LEN])?;
    let scalar = Fr::from_be_bytes_mod_order(&input[G1_LEN..]);
    let product = (p.into_group() * scalar).into_affine();
    Ok(PrecompileOutput::new(gas_used, write_g1(product)))
}

// 0x08: alt_bn128 pairing check
pub fn pairing(input: &[u8], gas: u64, fork: Fork) -> Result<PrecompileOutput, PrecompileError> {
    let (base, per_pair) = if fork >= Fork::Istanbul {
        (45_000u64, 34_000u64)
    } else {
        (100_000, 80_000)
    };
    if input.len() % PAIR_LEN != 0 {
        return Err(PrecompileError::InvalidInputLength);
    }
    let pairs = (input.len() / PAIR_LEN) as u64;
    let gas_used = charge(base.saturating_add(per_pair.saturating_mul(pairs)), gas)?;

    let mut g1 = Vec::new();
    let mut g2 = Vec::new();
    for chunk in input.chunks_exact(PAIR_LEN) {
        let p = read_g1(&chunk[..G1_LEN])?;
        let q = read_g2(&chunk[G1_LEN..])?;
        if !p.infinity && !q.infinity {
            g1.push(p);
            g2.push(q);
        }
    }
    let success = g1.is_empty() || Bn254::multi_pairing(g1, g2).0.is_one();
    Ok(PrecompileOutput::new(gas_used, bool_word(success)))
}
