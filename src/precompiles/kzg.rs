use std::ops::Neg;

use ark_bls12_381::{Bls12_381, Fr, G1Affine, G2Affine};
use ark_ec::{AffineRepr, CurveGroup, pairing::Pairing};
use ark_ff::{BigInteger, One, PrimeField};
use ark_serialize::CanonicalDeserialize;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

use crate::fork::Fork;

use super::{PrecompileError, PrecompileOutput, charge};

pub const GAS_COST: u64 = 50_000;
pub const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

/// FIELD_ELEMENTS_PER_BLOB ++ BLS_MODULUS
const RETURN_VALUE: &str = "0000000000000000000000000000000000000000000000000000000000001000\
    73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001";

/// `[τ]₂` from the mainnet KZG ceremony, compressed.
const TRUSTED_SETUP_TAU_G2: &str = "b5bfd7dd8cdeb128843bc287230af38926187075cbfbefa81009a2ce615ac53d\
    2914e5870cb452d2afaaab24f3499f72185cbfee53492714734429b7b38608e2\
    3926c911cceceac9a36851477ba4c60b087041de621000edc98edada20c1def2";

static TAU_G2: Lazy<Option<G2Affine>> = Lazy::new(|| {
    let bytes = hex::decode(TRUSTED_SETUP_TAU_G2).ok()?;
    G2Affine::deserialize_compressed_unchecked(&bytes[..]).ok()
});

pub fn kzg_to_versioned_hash(commitment: &[u8]) -> [u8; 32] {
    let mut hash: [u8; 32] = Sha256::digest(commitment).into();
    hash[0] = VERSIONED_HASH_VERSION_KZG;
    hash
}

// 0x0a: KZG point evaluation (EIP-4844)
pub fn point_evaluation(
    input: &[u8],
    gas: u64,
    _: Fork,
) -> Result<PrecompileOutput, PrecompileError> {
    let gas_used = charge(GAS_COST, gas)?;
    if input.len() != 192 {
        return Err(PrecompileError::InvalidInputLength);
    }
    let versioned_hash = &input[..32];
    let z = &input[32..64];
    let y = &input[64..96];
    let commitment = &input[96..144];
    let proof = &input[144..192];

    if kzg_to_versioned_hash(commitment) != versioned_hash {
        return Err(PrecompileError::VersionedHashMismatch);
    }
    if !verify_kzg_proof(commitment, z, y, proof)? {
        return Err(PrecompileError::KzgVerificationFailed);
    }
    let output = hex::decode(RETURN_VALUE).map_err(|_| PrecompileError::KzgVerificationFailed)?;
    Ok(PrecompileOutput::new(gas_used, output))
}

fn read_g1(bytes: &[u8]) -> Result<G1Affine, PrecompileError> {
    G1Affine::deserialize_compressed(bytes).map_err(|_| PrecompileError::PointNotOnCurve)
}

fn read_scalar(bytes: &[u8]) -> Result<Fr, PrecompileError> {
    let fr = Fr::from_be_bytes_mod_order(bytes);
    if fr.into_bigint().to_bytes_be() != bytes {
        return Err(PrecompileError::InvalidFieldElement);
    }
    Ok(fr)
}

/// e(C - [y]₁, -G₂) · e(π, [τ]₂ - [z]₂) == 1
fn verify_kzg_proof(
    commitment: &[u8],
    z: &[u8],
    y: &[u8],
    proof: &[u8],
) -> Result<bool, PrecompileError> {
    let commitment = read_g1(commitment)?;
    let proof = read_g1(proof)?;
    let z = read_scalar(z)?;
    let y = read_scalar(y)?;
    let tau = (*TAU_G2).ok_or(PrecompileError::KzgVerificationFailed)?;

    let g1 = G1Affine::generator();
    let g2 = G2Affine::generator();
    let p_minus_y = (commitment.into_group() - g1 * y).into_affine();
    let x_minus_z = (tau.into_group() - g2 * z).into_affine();

    let result = Bls12_381::multi_pairing([p_minus_y, proof], [g2.neg(), x_minus_z]);
    Ok(result.0.is_one())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::precompiles::tests::{call, hex_to_bytes};

    /// Commitment and proof of the zero polynomial: the point at infinity.
    fn infinity() -> Vec<u8> {
        let mut point = vec![0u8; 48];
        point[0] = 0xc0;
        point
    }

    fn input(z: &[u8; 32], y: &[u8; 32]) -> Vec<u8> {
        let commitment = infinity();
        [
            kzg_to_versioned_hash(&commitment).to_vec(),
            z.to_vec(),
            y.to_vec(),
            commitment,
            infinity(),
        ]
        .concat()
    }

    #[test]
    fn test_trusted_setup_parses() {
        assert!(TAU_G2.is_some());
    }

    #[test]
    fn test_zero_polynomial_evaluates_to_zero() {
        let mut z = [0u8; 32];
        z[31] = 2;
        let result = call(0x0a, &input(&z, &[0u8; 32]), Fork::Cancun).unwrap();
        assert_eq!(result.gas_used, GAS_COST);
        assert_eq!(result.output, hex_to_bytes(RETURN_VALUE));
    }

    #[test]
    fn test_wrong_evaluation_fails() {
        let mut y = [0u8; 32];
        y[31] = 1;
        assert_eq!(
            call(0x0a, &input(&[0u8; 32], &y), Fork::Cancun),
            Err(PrecompileError::KzgVerificationFailed)
        );
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(
            call(0x0a, &[0u8; 191], Fork::Cancun),
            Err(PrecompileError::InvalidInputLength)
        );
        let mut input = input(&[0u8; 32], &[0u8; 32]);
        input[0] = 0x02;
        assert_eq!(
            call(0x0a, &input, Fork::Cancun),
            Err(PrecompileError::VersionedHashMismatch)
        );
        assert_eq!(
            point_evaluation(&input, GAS_COST - 1, Fork::Cancun),
            Err(PrecompileError::OutOfGas)
        );
    }

    #[test]
    fn test_non_canonical_scalar() {
        let input = input(&[0xffu8; 32], &[0u8; 32]);
        assert_eq!(
            call(0x0a, &input, Fork::Cancun),
            Err(PrecompileError::InvalidFieldElement)
        );
    }
}
