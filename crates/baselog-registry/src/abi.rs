//! Minimal contract ABI encoding for the three registry functions.

use baselog_types::{Address, ContentId, RegistryEntry, TxHash};
use sha3::{Digest, Keccak256};

use crate::error::RegistryError;

pub const HAS_ENTRY: &str = "hasEntry(address,bytes32)";
pub const GET_ENTRY: &str = "getEntry(address,bytes32)";
pub const LOG_ENTRY: &str = "logEntry(bytes32,string)";

const WORD: usize = 32;

/// Errors decoding contract return data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("return data too short: need {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },

    #[error("integer does not fit in 64 bits")]
    Overflow,

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl From<AbiError> for RegistryError {
    fn from(e: AbiError) -> Self {
        RegistryError::ReadFailed(format!("abi decode: {e}"))
    }
}

/// First four bytes of the Keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

fn address_word(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn u64_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn lookup_call(signature: &str, account: &Address, tx_hash: &TxHash) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 2 * WORD);
    data.extend_from_slice(&selector(signature));
    data.extend_from_slice(&address_word(account));
    data.extend_from_slice(tx_hash.as_bytes());
    data
}

pub fn encode_has_entry(account: &Address, tx_hash: &TxHash) -> Vec<u8> {
    lookup_call(HAS_ENTRY, account, tx_hash)
}

pub fn encode_get_entry(account: &Address, tx_hash: &TxHash) -> Vec<u8> {
    lookup_call(GET_ENTRY, account, tx_hash)
}

/// `logEntry(bytes32 txHash, string contentId)`: static head of two words
/// (hash, offset of the string) followed by the length-prefixed, zero-padded
/// string bytes.
pub fn encode_log_entry(tx_hash: &TxHash, content_id: &ContentId) -> Vec<u8> {
    let bytes = content_id.as_str().as_bytes();
    let padded = bytes.len().div_ceil(WORD) * WORD;

    let mut data = Vec::with_capacity(4 + 3 * WORD + padded);
    data.extend_from_slice(&selector(LOG_ENTRY));
    data.extend_from_slice(tx_hash.as_bytes());
    data.extend_from_slice(&u64_word(2 * WORD as u64));
    data.extend_from_slice(&u64_word(bytes.len() as u64));
    data.extend_from_slice(bytes);
    data.resize(4 + 3 * WORD + padded, 0);
    data
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    let end = offset.checked_add(WORD).ok_or(AbiError::Overflow)?;
    data.get(offset..end).ok_or(AbiError::TooShort {
        need: end,
        got: data.len(),
    })
}

fn word_to_u64(word: &[u8]) -> Result<u64, AbiError> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow);
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(buf))
}

pub fn decode_bool(data: &[u8]) -> Result<bool, AbiError> {
    let word = word_at(data, 0)?;
    Ok(word.iter().any(|b| *b != 0))
}

/// Decode `(string contentId, uint256 timestamp)`. An empty content id is
/// how the contract reports a missing entry.
pub fn decode_entry(data: &[u8]) -> Result<Option<RegistryEntry>, AbiError> {
    let offset = word_to_u64(word_at(data, 0)?)? as usize;
    let timestamp = word_to_u64(word_at(data, WORD)?)?;
    let len = word_to_u64(word_at(data, offset)?)? as usize;

    let start = offset + WORD;
    let end = start.checked_add(len).ok_or(AbiError::Overflow)?;
    let raw = data.get(start..end).ok_or(AbiError::TooShort {
        need: end,
        got: data.len(),
    })?;
    let content_id = std::str::from_utf8(raw).map_err(|_| AbiError::InvalidUtf8)?;

    if content_id.is_empty() {
        return Ok(None);
    }
    Ok(Some(RegistryEntry::new(content_id, timestamp)))
}

/// `0x`-prefixed hex of call data.
pub fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// Decode `0x`-prefixed hex return data. `0x` alone is empty data.
pub fn from_hex(s: &str) -> Result<Vec<u8>, AbiError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| AbiError::InvalidHex(e.to_string()))
}

/// Encode a `(string, uint256)` return value. Used to fake contract
/// responses.
pub fn encode_entry_return(content_id: &str, timestamp: u64) -> Vec<u8> {
    let bytes = content_id.as_bytes();
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut data = Vec::with_capacity(3 * WORD + padded);
    data.extend_from_slice(&u64_word(2 * WORD as u64));
    data.extend_from_slice(&u64_word(timestamp));
    data.extend_from_slice(&u64_word(bytes.len() as u64));
    data.extend_from_slice(bytes);
    data.resize(3 * WORD + padded, 0);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_known_erc20_transfer() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
    }

    #[test]
    fn lookup_calls_are_selector_plus_two_words() {
        let account = Address::from_bytes([0x11; 20]);
        let tx = TxHash::from_bytes([0x22; 32]);
        let data = encode_has_entry(&account, &tx);
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &selector(HAS_ENTRY));
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], account.as_bytes());
        assert_eq!(&data[36..], tx.as_bytes());
        assert_ne!(&encode_get_entry(&account, &tx)[..4], &data[..4]);
    }

    #[test]
    fn log_entry_layout() {
        let tx = TxHash::from_bytes([0x33; 32]);
        let data = encode_log_entry(&tx, &ContentId::new("bafy123"));
        assert_eq!(data.len(), 4 + 32 * 4);
        assert_eq!(&data[4..36], tx.as_bytes());
        assert_eq!(word_to_u64(&data[36..68]).unwrap(), 64);
        assert_eq!(word_to_u64(&data[68..100]).unwrap(), 7);
        assert_eq!(&data[100..107], b"bafy123");
        assert!(data[107..].iter().all(|b| *b == 0));
    }

    #[test]
    fn decode_bool_words() {
        assert!(decode_bool(&u64_word(1)).unwrap());
        assert!(!decode_bool(&[0u8; 32]).unwrap());
        assert!(matches!(decode_bool(&[1u8; 4]), Err(AbiError::TooShort { .. })));
    }

    #[test]
    fn decode_entry_present_and_absent() {
        let entry = decode_entry(&encode_entry_return("bafy123", 1_700_000_000_000)).unwrap();
        assert_eq!(entry, Some(RegistryEntry::new("bafy123", 1_700_000_000_000)));
        assert_eq!(decode_entry(&encode_entry_return("", 0)).unwrap(), None);
    }

    #[test]
    fn decode_entry_rejects_truncated_string() {
        let mut data = encode_entry_return("a-long-content-identifier-over-one-word", 5);
        data.truncate(3 * 32 + 4);
        assert!(matches!(decode_entry(&data), Err(AbiError::TooShort { .. })));
    }

    #[test]
    fn hex_helpers() {
        assert_eq!(to_hex(&[0xde, 0xad]), "0xdead");
        assert_eq!(from_hex("0x").unwrap(), Vec::<u8>::new());
        assert!(from_hex("0xzz").is_err());
    }
}
