//! Error types for address, amount, and signature validation.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid length for {kind}: expected {expected}, got {actual}")]
    InvalidLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid asset code `{0}`")]
    InvalidAssetCode(String),
    #[error("unknown network `{0}`")]
    InvalidNetwork(String),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("{0}")]
    Message(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid length for {kind}: expected {expected}, got {actual}")]
    InvalidLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid signature")]
    InvalidSignature,
    #[error("signature hint does not match signer")]
    HintMismatch,
    #[error("xdr encoding failed: {0}")]
    Encoding(String),
    #[error("{0}")]
    Message(String),
}
