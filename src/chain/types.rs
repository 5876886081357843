//! Primitive chain types: addresses, operation identities, amounts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

/// Token and native value amounts, in base units.
pub type Amount = u128;

/// Seconds since the chain epoch.
pub type Timestamp = u64;

/// Decimal places of every token in the harness.
pub const DECIMALS: u32 = 18;

/// Converts a whole-token count into base units.
#[must_use]
pub const fn tokens(whole: u64) -> Amount {
    whole as Amount * 10u128.pow(DECIMALS)
}

/// Renders base units as a decimal token amount, e.g. `1.5` or `10000000`.
#[must_use]
pub fn format_units(amount: Amount) -> String {
    let unit = 10u128.pow(DECIMALS);
    let (whole, frac) = (amount / unit, amount % unit);
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:018}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Keccak-256 digest of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Error returned when parsing a hex-encoded identifier fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected 0x-prefixed hex string of {expected} bytes: {reason}")]
pub struct ParseHexError {
    expected: usize,
    reason: String,
}

fn parse_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseHexError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).map_err(|e| ParseHexError {
        expected: N,
        reason: e.to_string(),
    })?;
    Ok(out)
}

macro_rules! hex_identifier {
    ($name:ident, $len:expr) => {
        impl $name {
            /// Returns the raw bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_fixed::<$len>(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

hex_identifier!(Address, 20);

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Wraps raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derives a deterministic address from a label.
    ///
    /// The address is the last 20 bytes of `keccak256(label)`, so the same
    /// label always yields the same account across runs.
    #[must_use]
    pub fn derive(label: &str) -> Self {
        let digest = keccak256(label.as_bytes());
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[12..]);
        Self(out)
    }
}

/// Content hash identifying a delay queue operation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId([u8; 32]);

hex_identifier!(OperationId, 32);

impl OperationId {
    /// Wraps a 32-byte digest.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}
