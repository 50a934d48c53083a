use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Decode `0x`-prefixed (or bare) hex into exactly `N` bytes.
fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], TypeError> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
    if bytes.len() != N {
        return Err(TypeError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

/// A 32-byte transaction hash.
///
/// The canonical text form is `0x` followed by 64 lowercase hex digits,
/// which is also how it is serialized. Parsing is case-insensitive and
/// tolerates a missing `0x` prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32 bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Shortened form for logs and terminals, e.g. `0x1234ab...cdef90`.
    pub fn short(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}...{}", &full[..6], &full[58..])
    }

    /// Parse from hex, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        decode_fixed::<32>(s).map(Self)
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.short())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for TxHash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for TxHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Shortened form, e.g. `0x1234...5678`.
    pub fn short(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}...{}", &full[..4], &full[36..])
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        decode_fixed::<20>(s).map(Self)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HASH: &str = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";

    #[test]
    fn parses_prefixed_and_bare() {
        let a = TxHash::from_hex(HASH).unwrap();
        let b = TxHash::from_hex(&HASH[2..]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), HASH);
    }

    #[test]
    fn parsing_is_case_insensitive() {
        let upper = format!("0X{}", HASH[2..].to_uppercase());
        let parsed: TxHash = upper.parse().unwrap();
        assert_eq!(parsed.to_hex(), HASH);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = TxHash::from_hex("0xabc0").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn rejects_non_hex() {
        let err = Address::from_hex("0xzz").unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn short_forms() {
        let tx = TxHash::from_hex(HASH).unwrap();
        assert_eq!(tx.short(), "0x123456...abcdef");
        let addr = Address::from_hex("0x742d35cc6634c0532925a3b844bc9e7595f0beb0").unwrap();
        assert_eq!(addr.short(), "0x742d...beb0");
    }

    #[test]
    fn serializes_as_hex_string() {
        let tx = TxHash::from_hex(HASH).unwrap();
        let json = serde_json::to_string(&tx).unwrap();
        assert_eq!(json, format!("\"{HASH}\""));
        let bad: Result<TxHash, _> = serde_json::from_str("\"0x01\"");
        assert!(bad.is_err());
    }

    proptest! {
        #[test]
        fn any_hash_survives_text_form(bytes in proptest::array::uniform32(any::<u8>())) {
            let tx = TxHash::from_bytes(bytes);
            prop_assert_eq!(TxHash::from_hex(&tx.to_hex()).unwrap(), tx);
        }

        #[test]
        fn any_address_survives_text_form(bytes in proptest::array::uniform20(any::<u8>())) {
            let addr = Address::from_bytes(bytes);
            prop_assert_eq!(addr.to_string().parse::<Address>().unwrap(), addr);
        }
    }
}
