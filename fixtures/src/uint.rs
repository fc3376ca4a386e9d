// fixtures/src/uint.rs
// Fixed-width Uint256 encoding used by the contract ABI

use ethers::types::U256;
use serde::Serialize;

use crate::{
    error::{FixtureError, Result},
    felt::Felt,
};

/// A 256-bit unsigned quantity split into two 128-bit limbs, as the contracts take it.
/// Full value is `low + (high << 128)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Uint128Pair {
    pub low: u128,
    pub high: u128,
}

impl Uint128Pair {
    pub const ZERO: Uint128Pair = Uint128Pair { low: 0, high: 0 };

    /// Total split, used where contracts legitimately hold full 256-bit values.
    pub fn from_u256(value: U256) -> Self {
        Self {
            low: value.low_u128(),
            high: (value >> 128usize).low_u128(),
        }
    }

    pub fn to_u256(&self) -> U256 {
        U256::from(self.low) | (U256::from(self.high) << 128usize)
    }

    /// Calldata layout: `[low, high]`.
    pub fn to_calldata(&self) -> [Felt; 2] {
        [Felt::from(self.low), Felt::from(self.high)]
    }

    pub fn from_calldata(low: Felt, high: Felt) -> Result<Self> {
        let limb = |word: Felt| {
            word.to_u128().ok_or(FixtureError::PrecisionLoss {
                value: word.as_u256(),
            })
        };
        Ok(Self {
            low: limb(low)?,
            high: limb(high)?,
        })
    }
}

/// Encodes `value` as `{low: value, high: 0}`.
///
/// Fails with [`FixtureError::PrecisionLoss`] instead of truncating when the value needs
/// more than 128 bits.
pub fn encode_uint(value: impl Into<U256>) -> Result<Uint128Pair> {
    let value = value.into();
    if value.bits() > 128 {
        return Err(FixtureError::PrecisionLoss { value });
    }
    Ok(Uint128Pair {
        low: value.low_u128(),
        high: 0,
    })
}

/// Returns the `low` limb. A non-zero `high` limb is an error, never silently dropped.
pub fn decode_uint(pair: Uint128Pair) -> Result<u128> {
    if pair.high != 0 {
        return Err(FixtureError::PrecisionLoss {
            value: pair.to_u256(),
        });
    }
    Ok(pair.low)
}
