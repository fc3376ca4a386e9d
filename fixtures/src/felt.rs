// fixtures/src/felt.rs

// --- Imports ---
use ethers::types::U256;
use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};

use crate::error::{FixtureError, Result};

/// Modulus of the StarkNet field: 2^251 + 17 * 2^192 + 1.
pub const FIELD_PRIME: U256 = U256([1, 0, 0, 0x0800_0000_0000_0011]);

/// Longest ASCII string that still packs into one field element.
pub const MAX_SHORT_STRING_LEN: usize = 31;

/// A StarkNet field element. Every value is strictly below [`FIELD_PRIME`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Felt(U256);

pub type ContractAddress = Felt;
pub type ClassHash = Felt;
pub type TxHash = Felt;

impl Felt {
    pub const ZERO: Felt = Felt(U256([0, 0, 0, 0]));
    pub const ONE: Felt = Felt(U256([1, 0, 0, 0]));

    pub const fn from_u64(value: u64) -> Self {
        Felt(U256([value, 0, 0, 0]))
    }

    pub fn new(value: U256) -> Result<Self> {
        if value >= FIELD_PRIME {
            return Err(FixtureError::InvalidFelt {
                value: bigint_to_hex(value),
                reason: "exceeds the field prime".to_string(),
            });
        }
        Ok(Felt(value))
    }

    /// Folds a 32-byte digest into the field by keeping its low 250 bits.
    pub(crate) fn from_hash_bytes(mut bytes: [u8; 32]) -> Self {
        bytes[0] &= 0x03;
        Felt(U256::from_big_endian(&bytes))
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_u128(&self) -> Option<u128> {
        (self.0.bits() <= 128).then(|| self.0.low_u128())
    }

    pub fn to_u64(&self) -> Option<u64> {
        (self.0.bits() <= 64).then(|| self.0.low_u64())
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.0.to_big_endian(&mut bytes);
        bytes
    }

    pub fn to_hex(&self) -> String {
        bigint_to_hex(self.0)
    }
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Felt {
                fn from(value: $t) -> Self {
                    Felt(U256::from(value))
                }
            }
        )*
    };
}

impl_from_unsigned!(u8, u32, u64, u128);

impl TryFrom<U256> for Felt {
    type Error = FixtureError;

    fn try_from(value: U256) -> Result<Self> {
        Felt::new(value)
    }
}

impl From<Felt> for U256 {
    fn from(value: Felt) -> Self {
        value.0
    }
}

/// Accepts `0x`-prefixed hex or plain decimal.
impl FromStr for Felt {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| FixtureError::InvalidFelt {
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("0x") {
            return Err(invalid("no digits"));
        }
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(digits) => U256::from_str_radix(digits, 16).map_err(|_| invalid("not valid hex")),
            None => U256::from_dec_str(trimmed).map_err(|_| invalid("not a valid decimal integer")),
        }?;
        Felt::new(parsed)
    }
}

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Felt({})", self.to_hex())
    }
}

impl Serialize for Felt {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

// --- Formatting Helpers ---

/// Renders an integer as lowercase `0x` hex with an even digit count (`0x00`, `0x01`, `0x0100`).
pub fn bigint_to_hex(value: U256) -> String {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(31);
    format!("0x{}", hex::encode(&bytes[first..]))
}

/// Canonical address rendering. Two addresses are equal iff these strings match.
pub fn felt_to_address(value: Felt) -> String {
    value.to_hex()
}

// --- Short Strings ---

/// Packs an ASCII string of at most 31 bytes into a felt, big-endian.
/// Token names, symbols and event names all go through this encoding.
pub fn short_string_to_felt(value: &str) -> Result<Felt> {
    let invalid = |reason: String| FixtureError::InvalidShortString {
        value: value.to_string(),
        reason,
    };
    if !value.is_ascii() {
        return Err(invalid("contains non-ASCII characters".to_string()));
    }
    if value.len() > MAX_SHORT_STRING_LEN {
        return Err(invalid(format!(
            "{} bytes, at most {} fit in a field element",
            value.len(),
            MAX_SHORT_STRING_LEN
        )));
    }
    Ok(Felt(U256::from_big_endian(value.as_bytes())))
}

pub fn felt_to_short_string(value: Felt) -> Result<String> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(32);
    let packed = &bytes[first..];
    if !packed.is_ascii() {
        return Err(FixtureError::InvalidShortString {
            value: value.to_hex(),
            reason: "does not decode to ASCII".to_string(),
        });
    }
    Ok(packed.iter().map(|b| *b as char).collect())
}
