use std::ops::{BitAnd, BitOr, BitXor, Not, Shl, Shr};

use i256::I256;
use primitive_types::U512;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::common::{decode, error::Error};

type U256 = primitive_types::U256;

/// A 256-bit machine word. Arithmetic wraps modulo 2^256; signed operations
/// reinterpret the same bits as two's complement.
#[derive(Default, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Word(U256);

impl Word {
    pub const ZERO: Word = Word(U256::zero());
    pub const MAX: Word = Word(U256::MAX);

    pub fn zero() -> Self {
        Self::ZERO
    }

    pub fn one() -> Self {
        Self(U256::one())
    }

    pub fn max() -> Self {
        Self::MAX
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(U256::from_big_endian(bytes))
    }

    pub fn into_bytes(&self) -> [u8; 32] {
        self.0.to_big_endian()
    }

    /// Big-endian bytes with leading zeros stripped (RLP scalar form).
    pub fn to_trimmed_bytes(&self) -> Vec<u8> {
        self.into_bytes()
            .into_iter()
            .skip_while(|byte| byte == &0)
            .collect()
    }

    pub fn from_hex(hex: &str) -> Result<Self, Error> {
        let hex = hex.trim_start_matches("0x");
        if hex.is_empty() {
            return Ok(Self::zero());
        }
        U256::from_str_radix(hex, 16)
            .map(Self)
            .map_err(|_| Error::InvalidWord(hex.to_string()))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn bit(&self, index: usize) -> bool {
        self.0.bit(index)
    }

    pub fn bits(&self) -> usize {
        self.0.bits()
    }

    pub fn byte(&self, index: usize) -> u8 {
        self.0.byte(index)
    }

    pub fn low_u64(&self) -> u64 {
        self.0.low_u64()
    }

    pub fn as_u64(&self) -> u64 {
        self.0.low_u64()
    }

    /// `None` when the value does not fit into `u64`.
    pub fn to_u64(&self) -> Option<u64> {
        (self.0.bits() <= 64).then(|| self.0.low_u64())
    }

    /// `None` when the value does not fit into `usize`.
    pub fn to_usize(&self) -> Option<usize> {
        self.to_u64().and_then(|value| usize::try_from(value).ok())
    }

    /// Clamps to `u64::MAX`; used for gas operands where anything above is unpayable.
    pub fn saturating_u64(&self) -> u64 {
        self.to_u64().unwrap_or(u64::MAX)
    }

    pub fn as_usize(&self) -> usize {
        self.to_usize().unwrap_or(usize::MAX)
    }

    pub fn overflowing_add(&self, rhs: Self) -> (Self, bool) {
        let (word, flag) = self.0.overflowing_add(rhs.0);
        (Self(word), flag)
    }

    pub fn overflowing_sub(&self, rhs: Self) -> (Self, bool) {
        let (word, flag) = self.0.overflowing_sub(rhs.0);
        (Self(word), flag)
    }

    pub fn overflowing_mul(&self, rhs: Self) -> (Self, bool) {
        let (word, flag) = self.0.overflowing_mul(rhs.0);
        (Self(word), flag)
    }

    pub fn checked_add(&self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(&self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn checked_mul(&self, rhs: Self) -> Option<Self> {
        self.0.checked_mul(rhs.0).map(Self)
    }

    pub fn saturating_add(&self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(&self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    pub fn saturating_mul(&self, rhs: Self) -> Self {
        Self(self.0.saturating_mul(rhs.0))
    }

    pub fn pow(&self, exp: Self) -> Self {
        let (ret, _) = self.0.overflowing_pow(exp.0);
        Self(ret)
    }

    /// Division by zero yields zero.
    pub fn div(&self, rhs: Self) -> Self {
        if rhs.is_zero() {
            Self::zero()
        } else {
            Self(self.0 / rhs.0)
        }
    }

    /// Remainder by zero yields zero.
    pub fn rem(&self, rhs: Self) -> Self {
        if rhs.is_zero() {
            Self::zero()
        } else {
            Self(self.0 % rhs.0)
        }
    }

    pub fn add_modulo(&self, that: &Word, modulo: &Word) -> Word {
        if modulo.is_zero() {
            return Word::zero();
        }
        let res = (U512::from(self.0) + U512::from(that.0)) % U512::from(modulo.0);
        Word(U256::from_big_endian(&res.to_big_endian()[32..]))
    }

    pub fn mul_modulo(&self, that: &Word, modulo: &Word) -> Word {
        if modulo.is_zero() {
            return Word::zero();
        }
        let res = self.0.full_mul(that.0) % U512::from(modulo.0);
        Word(U256::from_big_endian(&res.to_big_endian()[32..]))
    }

    fn signed(&self) -> I256 {
        I256::from_be_bytes(self.into_bytes())
    }

    fn from_signed(value: I256) -> Self {
        Self::from_bytes(&value.to_be_bytes())
    }

    pub fn is_negative(&self) -> bool {
        self.bit(255)
    }

    pub fn sdiv(&self, rhs: Self) -> Self {
        if rhs.is_zero() {
            return Self::zero();
        }
        let a = self.signed();
        let b = rhs.signed();
        if a == I256::MIN && b == I256::from(-1) {
            return Self::from_signed(I256::MIN);
        }
        Self::from_signed(a / b)
    }

    pub fn smod(&self, rhs: Self) -> Self {
        if rhs.is_zero() {
            return Self::zero();
        }
        let a = self.signed();
        let b = rhs.signed();
        if b == I256::from(-1) {
            return Self::zero();
        }
        Self::from_signed(a % b)
    }

    pub fn slt(&self, rhs: &Self) -> bool {
        self.signed() < rhs.signed()
    }

    pub fn sgt(&self, rhs: &Self) -> bool {
        self.signed() > rhs.signed()
    }

    /// Arithmetic shift right; shifts of 256 and more saturate to the sign.
    pub fn sar(&self, shift: usize) -> Self {
        if shift >= 256 {
            return if self.is_negative() {
                Self::max()
            } else {
                Self::zero()
            };
        }
        Self::from_signed(self.signed() >> shift)
    }

    /// Extends the sign of the `byte`-th lowest byte over the higher bytes.
    pub fn signextend(&self, byte: &Word) -> Self {
        if *byte >= Word::from(31u8) {
            return *self;
        }
        let bit = byte.as_usize() * 8 + 7;
        let mask = (U256::one() << bit) - U256::one();
        if self.0.bit(bit) {
            Self(self.0 | !mask)
        } else {
            Self(self.0 & mask)
        }
    }

    pub fn from_bool(value: bool) -> Self {
        if value { Self::one() } else { Self::zero() }
    }
}

impl std::fmt::Debug for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::LowerHex::fmt(&self.0, f)
    }
}

impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::LowerHex::fmt(&self.0, f)
    }
}

impl std::fmt::LowerHex for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<bool> for Word {
    fn from(value: bool) -> Self {
        Self::from_bool(value)
    }
}

impl From<u8> for Word {
    fn from(value: u8) -> Self {
        Self(U256::from(value))
    }
}

impl From<u32> for Word {
    fn from(value: u32) -> Self {
        Self(U256::from(value))
    }
}

impl From<u64> for Word {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<usize> for Word {
    fn from(value: usize) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for Word {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl std::ops::Add<Word> for Word {
    type Output = Word;

    fn add(self, rhs: Word) -> Self::Output {
        self.overflowing_add(rhs).0
    }
}

impl std::ops::AddAssign<Word> for Word {
    fn add_assign(&mut self, rhs: Word) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub<Word> for Word {
    type Output = Word;

    fn sub(self, rhs: Word) -> Self::Output {
        self.overflowing_sub(rhs).0
    }
}

impl std::ops::SubAssign<Word> for Word {
    fn sub_assign(&mut self, rhs: Word) {
        *self = *self - rhs;
    }
}

impl std::ops::Mul<Word> for Word {
    type Output = Word;

    fn mul(self, rhs: Word) -> Self::Output {
        self.overflowing_mul(rhs).0
    }
}

impl BitAnd for Word {
    type Output = Word;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for Word {
    type Output = Word;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitXor for Word {
    type Output = Word;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Self(self.0 ^ rhs.0)
    }
}

impl Not for Word {
    type Output = Word;

    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

impl Shl<usize> for Word {
    type Output = Word;

    fn shl(self, rhs: usize) -> Self::Output {
        if rhs >= 256 {
            Self::zero()
        } else {
            Self(self.0 << rhs)
        }
    }
}

impl Shr<usize> for Word {
    type Output = Word;

    fn shr(self, rhs: usize) -> Self::Output {
        if rhs >= 256 {
            Self::zero()
        } else {
            Self(self.0 >> rhs)
        }
    }
}

impl Serialize for Word {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:#x}", self.0))
    }
}

impl<'de> Deserialize<'de> for Word {
    fn deserialize<D>(deserializer: D) -> Result<Word, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error as _;

        let text: String = Deserialize::deserialize(deserializer)?;
        if text.starts_with("0x") {
            Word::from_hex(&text).map_err(D::Error::custom)
        } else {
            U256::from_dec_str(&text)
                .map(Word)
                .map_err(|_| D::Error::custom(format!("Invalid U256: '{text}'")))
        }
    }
}

pub fn word(s: &str) -> Word {
    let b = decode::<32>(s);
    Word::from_bytes(&b)
}

/// Message of a Solidity `Error(string)` revert payload.
pub fn decode_error_string(ret: &[u8]) -> Option<String> {
    if ret.len() < 4 + 32 + 32 {
        return None;
    }
    let offset = Word::from_bytes(&ret[4..4 + 32]).to_usize()?;
    let offset = 4usize.checked_add(32)?.checked_add(offset)?;
    let size = Word::from_bytes(&ret[4 + 32..4 + 32 + 32]).to_usize()?;
    let end = offset.checked_add(size)?;
    if ret.len() < end {
        return None;
    }
    String::from_utf8(ret[offset..end].to_vec()).ok()
}
