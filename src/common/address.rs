use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::common::{decode, error::Error, hash::keccak256, word::Word};

#[derive(Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn zero() -> Self {
        Self([0u8; 20])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|byte| byte == &0)
    }

    /// CREATE: `keccak256(rlp([sender, nonce]))[12..]`.
    pub fn create(&self, nonce: u64) -> Address {
        let mut stream = rlp::RlpStream::new_list(2);
        stream.append(&self.0.to_vec());
        stream.append(&nonce);
        let hash = keccak256(&stream.out());
        Self::from_hash(&hash)
    }

    /// CREATE2: `keccak256(0xff ++ sender ++ salt ++ keccak256(initcode))[12..]`.
    pub fn create2(&self, salt: &Word, initcode: &[u8]) -> Address {
        let mut buffer = Vec::with_capacity(1 + 20 + 32 + 32);
        buffer.push(0xffu8);
        buffer.extend_from_slice(&self.0);
        buffer.extend_from_slice(&salt.into_bytes());
        buffer.extend_from_slice(&keccak256(initcode));
        Self::from_hash(&keccak256(&buffer))
    }

    fn from_hash(hash: &[u8; 32]) -> Address {
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&hash[12..32]);
        Address(addr)
    }

    pub fn as_word(&self) -> Word {
        Word::from_bytes(&self.0)
    }

    /// Precompile addresses occupy the lowest range: all bytes but the last are zero.
    pub fn low_u8(&self) -> Option<u8> {
        self.0[..19].iter().all(|b| b == &0).then_some(self.0[19])
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address(0x{})", hex::encode(self.0))
    }
}

impl From<&Address> for Word {
    fn from(value: &Address) -> Self {
        value.as_word()
    }
}

impl From<Address> for Word {
    fn from(value: Address) -> Self {
        value.as_word()
    }
}

impl From<&Word> for Address {
    fn from(value: &Word) -> Self {
        let bytes: [u8; 32] = value.into_bytes();
        let mut ret = Address::default();
        ret.0[..].copy_from_slice(&bytes[12..]);
        ret
    }
}

impl From<Word> for Address {
    fn from(value: Word) -> Self {
        (&value).into()
    }
}

impl From<[u8; 20]> for Address {
    fn from(value: [u8; 20]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; 20] = value.try_into().map_err(|_| Error::InvalidAddress)?;
        Ok(Address(bytes))
    }
}

impl TryFrom<&str> for Address {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let hex = value.trim_start_matches("0x");
        if hex.len() != 40 {
            return Err(Error::InvalidAddress);
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex, &mut bytes).map_err(|_| Error::InvalidAddress)?;
        Ok(Address(bytes))
    }
}

impl std::str::FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::try_from(s)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Address, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error as _;

        let hex: String = Deserialize::deserialize(deserializer)?;
        Address::try_from(hex.as_str()).map_err(|_| {
            D::Error::invalid_value(serde::de::Unexpected::Str(&hex), &"20-byte hex address")
        })
    }
}

pub const fn addr(s: &str) -> Address {
    Address(decode(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::word::word;

    #[test]
    fn test_create_address() {
        assert_eq!(
            addr("0x5bc1c1942f2333acb9ce156525bc079fad983f13").create(0x065b),
            addr("0xe77afefd5b7beb79d1843e65a0fd54963abc742f")
        );
    }

    #[test]
    fn test_create_address_small_nonce() {
        // nonce 0 encodes as the empty string, nonce 1 as a single byte
        let sender = addr("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");
        assert_eq!(
            sender.create(0),
            addr("0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d")
        );
        assert_eq!(
            sender.create(1),
            addr("0x343c43a37d37dff08ae8c4a11544c718abb4fcf8")
        );
    }

    #[test]
    fn test_create2_address() {
        // EIP-1014 example 1
        assert_eq!(
            Address::zero().create2(&Word::zero(), &[0x00]),
            addr("0x4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38")
        );
        // EIP-1014 example 5
        assert_eq!(
            addr("0x00000000000000000000000000000000deadbeef")
                .create2(&word("0xcafebabe"), &hex::decode("deadbeef").unwrap()),
            addr("0x60f3f640a8508fC6a86d45DF051962668E1e8AC7")
        );
    }

    #[test]
    fn test_word_roundtrip_truncates() {
        let a = addr("0x00000000000000000000000000000000deadbeef");
        let w = Word::max() - Word::from(0xffff_ffffu32) + a.as_word();
        assert_eq!(Address::from(&w), addr("0xffffffffffffffffffffffffffffffffdeadbeef"));
        assert_eq!(a.low_u8(), None);
        assert_eq!(addr("0x0000000000000000000000000000000000000001").low_u8(), Some(1));
    }
}
