// BN254 scalar field element
// Wraps ark-bn254's Fr so that every value entering a hash is range checked
// and every value leaving the crate is a decimal string.

use alloy_primitives::U256;
use ark_bn254::Fr;
use ark_ff::{BigInt, BigInteger, PrimeField};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

use crate::error::{Classify, ErrorKind};

/// Element of the BN254 scalar field, the native field of circom Poseidon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldElement(Fr);

impl FieldElement {
    /// Field modulus as a 256-bit integer.
    pub fn modulus() -> U256 {
        U256::from_limbs(Fr::MODULUS.0)
    }

    pub fn zero() -> Self {
        FieldElement(Fr::from(0u64))
    }

    pub fn one() -> Self {
        FieldElement(Fr::from(1u64))
    }

    /// Strict conversion: values at or above the modulus are rejected,
    /// never reduced.
    pub fn try_from_u256(value: U256) -> Result<Self, FieldError> {
        Fr::from_bigint(BigInt::new(*value.as_limbs()))
            .map(FieldElement)
            .ok_or(FieldError::OutOfRange { value })
    }

    /// Interpret 32 big-endian bytes, reducing modulo the field prime.
    /// Only used where the protocol itself defines a reduction.
    pub fn from_be_bytes_mod_order(bytes: &[u8]) -> Self {
        FieldElement(Fr::from_be_bytes_mod_order(bytes))
    }

    pub fn to_u256(&self) -> U256 {
        U256::from_limbs(self.0.into_bigint().0)
    }

    /// 32-byte big-endian representation
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        let bytes = self.0.into_bigint().to_bytes_be();
        out[32 - bytes.len()..].copy_from_slice(&bytes);
        out
    }

    pub fn inner(&self) -> Fr {
        self.0
    }
}

impl From<Fr> for FieldElement {
    fn from(value: Fr) -> Self {
        FieldElement(value)
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        FieldElement(Fr::from(value))
    }
}

impl TryFrom<U256> for FieldElement {
    type Error = FieldError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        Self::try_from_u256(value)
    }
}

impl Add for FieldElement {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        FieldElement(self.0 + rhs.0)
    }
}

impl Sub for FieldElement {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        FieldElement(self.0 - rhs.0)
    }
}

impl Mul for FieldElement {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        FieldElement(self.0 * rhs.0)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_u256())
    }
}

impl FromStr for FieldElement {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = U256::from_str_radix(s.trim(), 10)
            .map_err(|_| FieldError::InvalidDecimal { input: s.to_string() })?;
        Self::try_from_u256(value)
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("value {value} is not below the field modulus")]
    OutOfRange { value: U256 },

    #[error("invalid decimal field element: {input:?}")]
    InvalidDecimal { input: String },
}

impl Classify for FieldError {
    fn kind(&self) -> ErrorKind {
        match self {
            FieldError::OutOfRange { .. } => ErrorKind::RangeViolation,
            FieldError::InvalidDecimal { .. } => ErrorKind::MalformedEncoding,
        }
    }
}
