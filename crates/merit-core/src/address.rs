//! Wallet and contract addresses.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Size of a raw address in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// Errors that can occur when parsing an address string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The hex payload does not decode to exactly [`ADDRESS_SIZE`] bytes.
    #[error("invalid address length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// The required byte length.
        expected: usize,
        /// The length that was actually decoded.
        actual: usize,
    },

    /// The string contains characters outside the hex alphabet.
    #[error("invalid address encoding: {0}")]
    InvalidHex(String),
}

/// A 20-byte account address (wallet, badge contract, or distributor).
///
/// Rendered as `0x`-prefixed lowercase hex. Parsing accepts mixed case and
/// an optional `0x` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    /// The all-zero address, used where no external collaborator is
    /// configured yet.
    pub const ZERO: Self = Self([0u8; ADDRESS_SIZE]);

    /// Wraps raw address bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw address bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    /// Parses an address from a hex string, with or without a `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid hex or does not decode
    /// to exactly [`ADDRESS_SIZE`] bytes.
    pub fn from_hex(input: &str) -> Result<Self, AddressError> {
        let payload = input.strip_prefix("0x").unwrap_or(input);
        let bytes =
            hex::decode(payload).map_err(|err| AddressError::InvalidHex(err.to_string()))?;
        let raw: [u8; ADDRESS_SIZE] =
            bytes
                .try_into()
                .map_err(|rejected: Vec<u8>| AddressError::InvalidLength {
                    expected: ADDRESS_SIZE,
                    actual: rejected.len(),
                })?;
        Ok(Self(raw))
    }

    /// Returns the `0x`-prefixed lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_prefix() {
        let with = Address::from_hex("0xaabbccddeeff00112233445566778899aabbccdd").unwrap();
        let without = Address::from_hex("aabbccddeeff00112233445566778899aabbccdd").unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn test_mixed_case_normalizes_to_lowercase() {
        let addr = Address::from_hex("0xAABBCCDDEEFF00112233445566778899AABBCCDD").unwrap();
        assert_eq!(addr.to_hex(), "0xaabbccddeeff00112233445566778899aabbccdd");
    }

    #[test]
    fn test_wrong_length_rejected() {
        let result = Address::from_hex("0xaabb");
        assert!(matches!(
            result,
            Err(AddressError::InvalidLength {
                expected: ADDRESS_SIZE,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_non_hex_rejected() {
        let result = Address::from_hex("0xzzbbccddeeff00112233445566778899aabbccdd");
        assert!(matches!(result, Err(AddressError::InvalidHex(_))));
    }

    #[test]
    fn test_serde_round_trip() {
        let addr = Address::new([0xab; ADDRESS_SIZE]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0xabababababababababababababababababababab\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_ordering_matches_byte_order() {
        let lo = Address::new([0x01; ADDRESS_SIZE]);
        let hi = Address::new([0x02; ADDRESS_SIZE]);
        assert!(lo < hi);
    }
}
