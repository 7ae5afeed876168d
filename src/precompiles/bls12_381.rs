//! EIP-2537 BLS12-381 operations: 64-byte padded field elements, 128-byte G1 and 256-byte G2 points.

use ark_bls12_381::{Bls12_381, Fq, Fq2, Fr, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::{AffineRepr, CurveGroup, pairing::Pairing};
use ark_ff::{BigInteger, One, PrimeField, Zero};

use crate::fork::Fork;

use super::{PrecompileError, PrecompileOutput, charge};

const PADDING: usize = 16;
const FP_LEN: usize = 64;
const G1_LEN: usize = 2 * FP_LEN;
const G2_LEN: usize = 4 * FP_LEN;
const SCALAR_LEN: usize = 32;

const G1_ADD_GAS: u64 = 375;
const G2_ADD_GAS: u64 = 600;
const G1_MUL_GAS: u64 = 12_000;
const G2_MUL_GAS: u64 = 22_500;
const PAIRING_BASE_GAS: u64 = 37_700;
const PAIRING_PAIR_GAS: u64 = 32_600;

const MSM_MULTIPLIER: u64 = 1000;

const G1_DISCOUNTS: [u64; 128] = [
    1000, 949, 848, 797, 764, 750, 738, 728, 719, 712, 705, 698, 692, 687, 682, 677, 673, 669,
    665, 661, 658, 654, 651, 648, 645, 642, 640, 637, 635, 632, 630, 627, 625, 623, 621, 619, 617,
    615, 613, 611, 609, 608, 606, 604, 603, 601, 599, 598, 596, 595, 593, 592, 591, 589, 588, 586,
    585, 584, 582, 581, 580, 579, 577, 576, 575, 574, 573, 572, 570, 569, 568, 567, 566, 565, 564,
    563, 562, 561, 560, 559, 558, 557, 556, 555, 554, 553, 552, 551, 550, 549, 548, 547, 547, 546,
    545, 544, 543, 542, 541, 540, 540, 539, 538, 537, 536, 536, 535, 534, 533, 532, 532, 531, 530,
    529, 528, 528, 527, 526, 525, 525, 524, 523, 522, 522, 521, 520, 520, 519,
];

const G2_DISCOUNTS: [u64; 128] = [
    1000, 1000, 923, 884, 855, 832, 812, 796, 782, 770, 759, 749, 740, 732, 724, 717, 711, 704,
    699, 693, 688, 683, 679, 674, 670, 666, 663, 659, 655, 652, 649, 646, 643, 640, 637, 634, 632,
    629, 627, 624, 622, 620, 618, 615, 613, 611, 609, 607, 606, 604, 602, 600, 598, 597, 595, 593,
    592, 590, 589, 587, 586, 584, 583, 582, 580, 579, 578, 576, 575, 574, 573, 571, 570, 569, 568,
    567, 566, 565, 563, 562, 561, 560, 559, 558, 557, 556, 555, 554, 553, 552, 552, 551, 550, 549,
    548, 547, 546, 545, 545, 544, 543, 542, 541, 541, 540, 539, 538, 537, 537, 536, 535, 535, 534,
    533, 532, 532, 531, 530, 530, 529, 528, 528, 527, 526, 526, 525, 524, 524,
];

fn msm_cost(pairs: usize, mul_gas: u64, discounts: &[u64; 128]) -> u64 {
    if pairs == 0 {
        return 0;
    }
    let discount = discounts[pairs.min(discounts.len()) - 1];
    (pairs as u64)
        .saturating_mul(mul_gas)
        .saturating_mul(discount)
        / MSM_MULTIPLIER
}

fn read_fp(bytes: &[u8]) -> Result<Fq, PrecompileError> {
    if bytes[..PADDING].iter().any(|b| *b != 0) {
        return Err(PrecompileError::InvalidFieldElement);
    }
    let value = &bytes[PADDING..FP_LEN];
    let fp = Fq::from_be_bytes_mod_order(value);
    if fp.into_bigint().to_bytes_be() != value {
        return Err(PrecompileError::InvalidFieldElement);
    }
    Ok(fp)
}

fn write_fp(fp: Fq, out: &mut [u8]) {
    out[PADDING..FP_LEN].copy_from_slice(&fp.into_bigint().to_bytes_be());
}

fn read_fp2(bytes: &[u8]) -> Result<Fq2, PrecompileError> {
    Ok(Fq2::new(read_fp(&bytes[..FP_LEN])?, read_fp(&bytes[FP_LEN..])?))
}

fn read_g1(bytes: &[u8], subgroup_check: bool) -> Result<G1Affine, PrecompileError> {
    let x = read_fp(&bytes[..FP_LEN])?;
    let y = read_fp(&bytes[FP_LEN..G1_LEN])?;
    if x.is_zero() && y.is_zero() {
        return Ok(G1Affine::identity());
    }
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() {
        return Err(PrecompileError::PointNotOnCurve);
    }
    if subgroup_check && !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PrecompileError::PointNotInSubgroup);
    }
    Ok(point)
}

fn write_g1(point: G1Affine) -> Vec<u8> {
    let mut out = vec![0u8; G1_LEN];
    if !point.infinity {
        write_fp(point.x, &mut out[..FP_LEN]);
        write_fp(point.y, &mut out[FP_LEN..]);
    }
    out
}

fn read_g2(bytes: &[u8], subgroup_check: bool) -> Result<G2Affine, PrecompileError> {
    let x = read_fp2(&bytes[..2 * FP_LEN])?;
    let y = read_fp2(&bytes[2 * FP_LEN..G2_LEN])?;
    if x.is_zero() && y.is_zero() {
        return Ok(G2Affine::identity());
    }
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() {
        return Err(PrecompileError::PointNotOnCurve);
    }
    if subgroup_check && !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PrecompileError::PointNotInSubgroup);
    }
    Ok(point)
}

fn write_g2(point: G2Affine) -> Vec<u8> {
    let mut out = vec![0u8; G2_LEN];
    if !point.infinity {
        write_fp(point.x.c0, &mut out[..FP_LEN]);
        write_fp(point.x.c1, &mut out[FP_LEN..2 * FP_LEN]);
        write_fp(point.y.c0, &mut out[2 * FP_LEN..3 * FP_LEN]);
        write_fp(point.y.c1, &mut out[3 * FP_LEN..]);
    }
    out
}

/// Scalars are full 256-bit integers; points are in the prime-order subgroup so reducing is exact.
fn read_scalar(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

/// Non-empty and a whole number of `chunk`-sized records.
fn records(input: &[u8], chunk: usize) -> Result<usize, PrecompileError> {
    if input.is_empty() || input.len() % chunk != 0 {
        return Err(PrecompileError::InvalidInputLength);
    }
    Ok(input.len() / chunk)
}

// 0x0b: BLS12_G1ADD
pub fn g1_add(input: &[u8], gas: u64, _: Fork) -> Result<PrecompileOutput, PrecompileError> {
    let gas_used = charge(G1_ADD_GAS, gas)?;
    if input.len() != 2 * G1_LEN {
        return Err(PrecompileError::InvalidInputLength);
    }
    let p = read_g1(&input[..G1_LEN], false)?;
    let q = read_g1(&input[G1_LEN..], false)?;
    let sum = (p.into_group() + q.into_group()).into_affine();
    Ok(PrecompileOutput::new(gas_used, write_g1(sum)))
}

// 0x0c: BLS12_G1MSM
pub fn g1_msm(input: &[u8], gas: u64, _: Fork) -> Result<PrecompileOutput, PrecompileError> {
    let pairs = records(input, G1_LEN + SCALAR_LEN)?;
    let gas_used = charge(msm_cost(pairs, G1_MUL_GAS, &G1_DISCOUNTS), gas)?;
    let mut acc = G1Projective::zero();
    for chunk in input.chunks_exact(G1_LEN + SCALAR_LEN) {
        let point = read_g1(&chunk[..G1_LEN], true)?;
        let scalar = read_scalar(&chunk[G1_LEN..]);
        acc += point * scalar;
    }
    Ok(PrecompileOutput::new(gas_used, write_g1(acc.into_affine())))
}

// 0x0d: BLS12_G2ADD
pub fn g2_add(input: &[u8], gas: u64, _: Fork) -> Result<PrecompileOutput, PrecompileError> {
    let gas_used = charge(G2_ADD_GAS, gas)?;
    if input.len() != 2 * G2_LEN {
        return Err(PrecompileError::InvalidInputLength);
    }
    let p = read_g2(&input[..G2_LEN], false)?;
    let q = read_g2(&input[G2_LEN..], false)?;
    let sum = (p.into_group() + q.into_group()).into_affine();
    Ok(PrecompileOutput::new(gas_used, write_g2(sum)))
}

// 0x0e: BLS12_G2MSM
pub fn g2_msm(input: &[u8], gas: u64, _: Fork) -> Result<PrecompileOutput, PrecompileError> {
    let pairs = records(input, G2_LEN + SCALAR_LEN)?;
    let gas_used = charge(msm_cost(pairs, G2_MUL_GAS, &G2_DISCOUNTS), gas)?;
    let mut acc = G2Projective::zero();
    for chunk in input.chunks_exact(G2_LEN + SCALAR_LEN) {
        let point = read_g2(&chunk[..G2_LEN], true)?;
        let scalar = read_scalar(&chunk[G2_LEN..]);
        acc += point * scalar;
    }
    Ok(PrecompileOutput::new(gas_used, write_g2(acc.into_affine())))
}

// 0x0f: BLS12_PAIRING_CHECK
pub fn pairing(input: &[u8], gas: u64, _: Fork) -> Result<PrecompileOutput, PrecompileError> {
    let pairs = records(input, G1_LEN + G2_LEN)?;
    let cost = PAIRING_BASE_GAS.saturating_add(PAIRING_PAIR_GAS.saturating_mul(pairs as u64));
    let gas_used = charge(cost, gas)?;

    let mut g1 = Vec::with_capacity(pairs);
    let mut g2 = Vec::with_capacity(pairs);
    for chunk in input.chunks_exact(G1_LEN + G2_LEN) {
        let p = read_g1(&chunk[..G1_LEN], true)?;
        let q = read_g2(&chunk[G1_LEN..], true)?;
        if !p.infinity && !q.infinity {
            g1.push(p);
            g2.push(q);
        }
    }
    let success = g1.is_empty() || Bls12_381::multi_pairing(g1, g2).0.is_one();
    let mut output = vec![0u8; 32];
    output[31] = success as u8;
    Ok(PrecompileOutput::new(gas_used, output))
}
