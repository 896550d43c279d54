use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Fractional digits carried by every ledger amount.
pub const AMOUNT_DECIMALS: u32 = 7;

const STROOPS_PER_UNIT: i64 = 10_000_000;

const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";
const PUBNET_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
const TESTNET_HORIZON_URL: &str = "https://horizon-testnet.stellar.org";
const PUBNET_HORIZON_URL: &str = "https://horizon.stellar.org";

macro_rules! impl_fixed_bytes_id {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
                if bytes.len() != Self::LEN {
                    return Err(ValidationError::InvalidLength {
                        kind: stringify!($name),
                        expected: Self::LEN,
                        actual: bytes.len(),
                    });
                }
                let mut out = [0u8; Self::LEN];
                out.copy_from_slice(bytes);
                Ok(Self(out))
            }

            pub fn from_hex(value: &str) -> Result<Self, ValidationError> {
                let bytes =
                    hex::decode(value).map_err(|err| ValidationError::InvalidHex(err.to_string()))?;
                Self::from_slice(&bytes)
            }

            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(value: [u8; $len]) -> Self {
                Self::new(value)
            }
        }
    };
}

impl_fixed_bytes_id!(TxHash, 32);
impl_fixed_bytes_id!(NetworkId, 32);

/// Ed25519 account address in strkey form (`G...`).
///
/// Only constructible from a string that passes the strkey checksum, so a
/// value of this type is always safe to send to the ledger service.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        stellar_strkey::ed25519::PublicKey::from_string(value.trim())
            .map(|key| Self(key.0))
            .map_err(|_| ValidationError::InvalidAddress(value.to_string()))
    }

    pub const fn from_raw(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Last four bytes of the key, used as the signature hint on envelopes.
    pub fn hint(&self) -> [u8; 4] {
        [self.0[28], self.0[29], self.0[30], self.0[31]]
    }

    pub fn encode(&self) -> String {
        stellar_strkey::ed25519::PublicKey(self.0).to_string()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.encode())
    }
}

impl FromStr for PublicKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PublicKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PublicKey> for String {
    fn from(value: PublicKey) -> Self {
        value.encode()
    }
}

/// Ledger network a transaction is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Test,
    Public,
}

impl Network {
    pub const fn passphrase(&self) -> &'static str {
        match self {
            Self::Test => TESTNET_PASSPHRASE,
            Self::Public => PUBNET_PASSPHRASE,
        }
    }

    pub const fn horizon_url(&self) -> &'static str {
        match self {
            Self::Test => TESTNET_HORIZON_URL,
            Self::Public => PUBNET_HORIZON_URL,
        }
    }

    pub fn from_passphrase(passphrase: &str) -> Option<Self> {
        match passphrase {
            TESTNET_PASSPHRASE => Some(Self::Test),
            PUBNET_PASSPHRASE => Some(Self::Public),
            _ => None,
        }
    }

    /// Name reported by browser wallets (`TESTNET` / `PUBLIC`).
    pub const fn wallet_name(&self) -> &'static str {
        match self {
            Self::Test => "TESTNET",
            Self::Public => "PUBLIC",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wallet_name())
    }
}

impl FromStr for Network {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" | "testnet" => Ok(Self::Test),
            "public" | "pubnet" | "mainnet" => Ok(Self::Public),
            _ => Self::from_passphrase(s)
                .ok_or_else(|| ValidationError::InvalidNetwork(s.to_string())),
        }
    }
}

/// Non-negative ledger amount held as stroops (1e-7 of a unit).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Parses a decimal string with at most seven fractional digits.
    ///
    /// Extra precision is an error, never truncated.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let value = Decimal::from_str_exact(trimmed)
            .map_err(|_| ValidationError::InvalidAmount(format!("`{input}` is not a decimal")))?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ValidationError::InvalidAmount(format!(
                "`{input}` is negative"
            )));
        }
        if value.normalize().scale() > AMOUNT_DECIMALS {
            return Err(ValidationError::InvalidAmount(format!(
                "`{input}` has more than {AMOUNT_DECIMALS} fractional digits"
            )));
        }
        value
            .checked_mul(Decimal::from(STROOPS_PER_UNIT))
            .and_then(|stroops| stroops.to_i64())
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidAmount(format!("`{input}` is out of range")))
    }

    pub fn from_stroops(stroops: i64) -> Result<Self, ValidationError> {
        if stroops < 0 {
            return Err(ValidationError::InvalidAmount(format!(
                "{stroops} stroops is negative"
            )));
        }
        Ok(Self(stroops))
    }

    /// Whole units; `u32` keeps every input in range.
    pub const fn from_units(units: u32) -> Self {
        Self(units as i64 * STROOPS_PER_UNIT)
    }

    pub const fn stroops(&self) -> i64 {
        self.0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).filter(|v| *v >= 0).map(Self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:07}",
            self.0 / STROOPS_PER_UNIT,
            self.0 % STROOPS_PER_UNIT
        )
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({self})")
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Amount {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        value.to_string()
    }
}

/// Credit asset code: 1 to 12 ASCII alphanumerics.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetCode(String);

impl AssetCode {
    pub const MAX_LEN: usize = 12;

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let valid = !value.is_empty()
            && value.len() <= Self::MAX_LEN
            && value.bytes().all(|b| b.is_ascii_alphanumeric());
        if !valid {
            return Err(ValidationError::InvalidAssetCode(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AssetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetCode({})", self.0)
    }
}

impl TryFrom<String> for AssetCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AssetCode> for String {
    fn from(value: AssetCode) -> Self {
        value.0
    }
}
