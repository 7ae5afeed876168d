use std::collections::BTreeMap;

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use num_bigint::BigUint;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::common::{address::Address, hash::keccak256};
use crate::fork::Fork;
use crate::gas::words;

mod blake2f;
mod bls12_381;
mod bn254;
mod kzg;
mod modexp;

/// Input bytes, available gas and the active fork; gas is checked before any work is done.
pub type Precompile = fn(&[u8], u64, Fork) -> Result<PrecompileOutput, PrecompileError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecompileOutput {
    pub gas_used: u64,
    pub output: Vec<u8>,
}

impl PrecompileOutput {
    pub fn new(gas_used: u64, output: Vec<u8>) -> Self {
        Self { gas_used, output }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrecompileError {
    #[error("out of gas")]
    OutOfGas,
    #[error("invalid input length")]
    InvalidInputLength,
    #[error("invalid field element")]
    InvalidFieldElement,
    #[error("point not on curve")]
    PointNotOnCurve,
    #[error("point not in subgroup")]
    PointNotInSubgroup,
    #[error("invalid final flag")]
    InvalidFinalFlag,
    #[error("versioned hash mismatch")]
    VersionedHashMismatch,
    #[error("kzg proof verification failed")]
    KzgVerificationFailed,
}

pub fn address(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    Address(bytes)
}

/// Precompiles active at `fork`, keyed by address.
pub fn table(fork: Fork) -> BTreeMap<Address, Precompile> {
    let mut table: BTreeMap<Address, Precompile> = BTreeMap::new();
    table.insert(address(0x01), ecrecover);
    table.insert(address(0x02), sha256);
    table.insert(address(0x03), ripemd160);
    table.insert(address(0x04), identity);
    if fork >= Fork::Byzantium {
        table.insert(address(0x05), modexp::run);
        table.insert(address(0x06), bn254::add);
        table.insert(address(0x07), bn254::mul);
        table.insert(address(0x08), bn254::pairing);
    }
    if fork >= Fork::Istanbul {
        table.insert(address(0x09), blake2f::run);
    }
    if fork >= Fork::Cancun {
        table.insert(address(0x0a), kzg::point_evaluation);
    }
    if fork >= Fork::Prague {
        table.insert(address(0x0b), bls12_381::g1_add);
        table.insert(address(0x0c), bls12_381::g1_msm);
        table.insert(address(0x0d), bls12_381::g2_add);
        table.insert(address(0x0e), bls12_381::g2_msm);
        table.insert(address(0x0f), bls12_381::pairing);
    }
    table
}

pub(crate) fn charge(cost: u64, gas: u64) -> Result<u64, PrecompileError> {
    if cost > gas {
        return Err(PrecompileError::OutOfGas);
    }
    Ok(cost)
}

/// Copies `input` into a zeroed buffer of `N` bytes; extra input is ignored.
pub(crate) fn right_pad<const N: usize>(input: &[u8]) -> [u8; N] {
    let mut padded = [0u8; N];
    let len = input.len().min(N);
    padded[..len].copy_from_slice(&input[..len]);
    padded
}

fn linear_cost(base: u64, word: u64, len: usize) -> u64 {
    base.saturating_add(word.saturating_mul(words(len as u64)))
}

const SECP256K1_N: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

const SECP256K1_N_HALF: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

// 0x01: ECRecover
fn ecrecover(input: &[u8], gas: u64, _: Fork) -> Result<PrecompileOutput, PrecompileError> {
    let gas_used = charge(3000, gas)?;
    let input = right_pad::<128>(input);
    let output = recover(&input).map(|address| {
        let mut word = vec![0u8; 32];
        word[12..].copy_from_slice(&address.0);
        word
    });
    Ok(PrecompileOutput::new(gas_used, output.unwrap_or_default()))
}

/// Signer of `hash ++ v ++ r ++ s`, or None for any malformed signature.
fn recover(input: &[u8; 128]) -> Option<Address> {
    let (hash, v, r, s) = (
        &input[0..32],
        &input[32..64],
        &input[64..96],
        &input[96..128],
    );
    if v[..31].iter().any(|b| *b != 0) || !(27..=28).contains(&v[31]) {
        return None;
    }
    let mut recovery_id = v[31] - 27;

    let mut signature = [0u8; 64];
    signature[..32].copy_from_slice(r);
    signature[32..].copy_from_slice(s);

    // k256 only accepts low-s signatures: use n - s and flip the parity
    if s > &SECP256K1_N_HALF[..] && s < &SECP256K1_N[..] {
        let low = BigUint::from_bytes_be(&SECP256K1_N) - BigUint::from_bytes_be(s);
        let low = low.to_bytes_be();
        signature[32..].fill(0);
        signature[64 - low.len()..].copy_from_slice(&low);
        recovery_id ^= 1;
    }

    let signature = Signature::from_slice(&signature).ok()?;
    let recovery_id = RecoveryId::from_byte(recovery_id)?;
    let key = VerifyingKey::recover_from_prehash(hash, &signature, recovery_id).ok()?;
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::try_from(&hash[12..]).ok()
}

// 0x02: SHA-256
fn sha256(input: &[u8], gas: u64, _: Fork) -> Result<PrecompileOutput, PrecompileError> {
    let gas_used = charge(linear_cost(60, 12, input.len()), gas)?;
    let hash = Sha256::digest(input);
    Ok(PrecompileOutput::new(gas_used, hash.to_vec()))
}

// 0x03: RIPEMD-160, left-padded to a word
fn ripemd160(input: &[u8], gas: u64, _: Fork) -> Result<PrecompileOutput, PrecompileError> {
    let gas_used = charge(linear_cost(600, 120, input.len()), gas)?;
    let hash = Ripemd160::digest(input);
    let mut output = vec![0u8; 32];
    output[12..].copy_from_slice(&hash);
    Ok(PrecompileOutput::new(gas_used, output))
}

// 0x04: Identity
fn identity(input: &[u8], gas: u64, _: Fork) -> Result<PrecompileOutput, PrecompileError> {
    let gas_used = charge(linear_cost(15, 3, input.len()), gas)?;
    Ok(PrecompileOutput::new(gas_used, input.to_vec()))
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    pub fn hex_to_bytes(hex_str: &str) -> Vec<u8> {
        hex::decode(hex_str.replace("0x", "").replace(' ', "")).unwrap()
    }

    pub fn call(n: u8, input: &[u8], fork: Fork) -> Result<PrecompileOutput, PrecompileError> {
        let table = table(fork);
        let precompile = table.get(&address(n)).expect("precompile");
        precompile(input, u64::MAX, fork)
    }

    #[test]
    fn test_table() {
        assert!(table(Fork::Frontier).get(&address(0x05)).is_none());
        assert!(table(Fork::Byzantium).get(&address(0x08)).is_some());
        assert!(table(Fork::Petersburg).get(&address(0x09)).is_none());
        assert!(table(Fork::Shanghai).get(&address(0x0a)).is_none());
        assert_eq!(
            table(Fork::Prague).keys().last().copied(),
            Some(address(0x0f))
        );
    }

    #[test]
    fn test_linear_gas() {
        let input = vec![0u8; 64];
        assert_eq!(call(0x01, &[], Fork::Cancun).unwrap().gas_used, 3000);
        assert_eq!(call(0x02, &input, Fork::Cancun).unwrap().gas_used, 60 + 12 * 2);
        assert_eq!(call(0x03, &input, Fork::Cancun).unwrap().gas_used, 600 + 120 * 2);
        assert_eq!(call(0x04, &input, Fork::Cancun).unwrap().gas_used, 15 + 3 * 2);
        assert_eq!(identity(&input, 20, Fork::Cancun), Err(PrecompileError::OutOfGas));
    }

    #[test]
    fn test_ecrecover_valid() {
        let input = hex_to_bytes(
            "acee28ed6d5eff643274a2abd164fec12cc75f1ea78a87922304c04e2424bc88\
            000000000000000000000000000000000000000000000000000000000000001c\
            08da09260614b31b17af2ac76eaa7d50172b6d0cec03fe706748e2d532c0d309\
            7e7a201aaefc664515b3a28a0bdd2fffdd58f3bff5fb639bf01f049c47648b3f",
        );
        let result = call(0x01, &input, Fork::Cancun).unwrap();
        assert_eq!(
            hex::encode(result.output),
            "000000000000000000000000d148c7f37b346a4bd8e14f8c1f181f5f640481c8"
        );
    }

    #[test]
    fn test_ecrecover_high_s_signature() {
        // mainnet block 23647631, tx index 159
        let input = hex_to_bytes(
            "a6588c81ba59e991dccec1b3c3b73c4b04cce35f30344c6df815d75e4d42351a\
            000000000000000000000000000000000000000000000000000000000000001b\
            4ca5e12d5fc25d983a215fb64032bbfe90a3e596d67a1b2cfa9646186a513704\
            bda125db9c2f810df6eaf77a5479de3b147359425fc1534f1fee6c1211308966",
        );
        let result = call(0x01, &input, Fork::Cancun).unwrap();
        assert_eq!(
            hex::encode(result.output),
            "0000000000000000000000008948112e60ba94f6afdcfc6b690904b7321d3a52"
        );
    }

    #[test]
    fn test_ecrecover_with_generated_signature() {
        use k256::ecdsa::SigningKey;

        let hash = hex_to_bytes("a6588c81ba59e991dccec1b3c3b73c4b04cce35f30344c6df815d75e4d42351a");
        let secret: [u8; 32] =
            hex_to_bytes("0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef")
                .try_into()
                .unwrap();
        let key = SigningKey::from_bytes(&secret.into()).unwrap();
        let (signature, recovery_id) = key.sign_prehash_recoverable(&hash).unwrap();

        let point = key.verifying_key().to_encoded_point(false);
        let expected = keccak256(&point.as_bytes()[1..]);

        let signature = signature.to_bytes();
        let mut input = vec![0u8; 128];
        input[0..32].copy_from_slice(&hash);
        input[63] = recovery_id.to_byte() + 27;
        input[64..128].copy_from_slice(&signature);

        let result = call(0x01, &input, Fork::Cancun).unwrap();
        assert_eq!(&result.output[12..], &expected[12..]);
        assert_eq!(&result.output[..12], &[0u8; 12]);
    }

    #[test]
    fn test_ecrecover_invalid_input() {
        let mut input = vec![0u8; 128];
        input[63] = 26;
        assert_eq!(call(0x01, &input, Fork::Cancun).unwrap().output, Vec::<u8>::new());

        // v with garbage in the upper bytes
        input[63] = 27;
        input[32] = 1;
        assert_eq!(call(0x01, &input, Fork::Cancun).unwrap().output, Vec::<u8>::new());

        // r = s = 0
        assert_eq!(call(0x01, &[0u8; 64], Fork::Cancun).unwrap().output, Vec::<u8>::new());
    }

    #[test]
    fn test_sha256() {
        assert_eq!(
            hex::encode(call(0x02, &[], Fork::Cancun).unwrap().output),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hex::encode(call(0x02, b"abc", Fork::Cancun).unwrap().output),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_ripemd160_abc() {
        let result = call(0x03, b"abc", Fork::Cancun).unwrap();
        assert_eq!(&result.output[0..12], &[0u8; 12]);
        assert_eq!(
            hex::encode(&result.output[12..]),
            "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc"
        );
    }

    #[test]
    fn test_identity() {
        let input: Vec<u8> = (0..100).collect();
        assert_eq!(call(0x04, &input, Fork::Cancun).unwrap().output, input);
        assert_eq!(call(0x04, &[], Fork::Cancun).unwrap().output, Vec::<u8>::new());
    }
}
