//! Error taxonomy shared by every pipeline stage.

use stellarpay_types::{PublicKey, ValidationError};
use stellarpay_wire::EnvelopeError;
use thiserror::Error;

use crate::transport::TransportError;
use crate::tx_builder::TxBuilderError;

/// Failure of a single payment attempt.
///
/// Stages fail fast with one of these; the orchestrator maps them to a
/// terminal outcome without reinterpreting the kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("account {0} is not funded")]
    AccountNotFunded(PublicKey),
    #[error("asset `{0}` is not held by the source account")]
    UnknownAsset(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("signer protocol error: {0}")]
    SignerProtocolError(String),
    /// User declined in the wallet, or the wallet reported an error. Expected, not a defect.
    #[error("signing rejected: {0}")]
    SigningRejected(String),
    /// Service call failed. During submission the transaction's fate is unknown.
    #[error("ledger service error: {message}")]
    ServiceError {
        status: Option<u16>,
        message: String,
    },
    /// Ledger declined the transaction; codes are kept exactly as reported.
    #[error("ledger rejected transaction: {result_code}")]
    Rejected {
        result_code: String,
        operation_codes: Vec<String>,
    },
    #[error("envelope encoding failed: {0}")]
    Envelope(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAddress,
    AccountNotFunded,
    UnknownAsset,
    InvalidAmount,
    SignerProtocolError,
    SigningRejected,
    ServiceError,
    Rejected,
    Envelope,
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress(_) => ErrorKind::InvalidAddress,
            Self::AccountNotFunded(_) => ErrorKind::AccountNotFunded,
            Self::UnknownAsset(_) => ErrorKind::UnknownAsset,
            Self::InvalidAmount(_) => ErrorKind::InvalidAmount,
            Self::SignerProtocolError(_) => ErrorKind::SignerProtocolError,
            Self::SigningRejected(_) => ErrorKind::SigningRejected,
            Self::ServiceError { .. } => ErrorKind::ServiceError,
            Self::Rejected { .. } => ErrorKind::Rejected,
            Self::Envelope(_) => ErrorKind::Envelope,
        }
    }

    pub fn is_user_cancel(&self) -> bool {
        matches!(self, Self::SigningRejected(_))
    }

    pub(crate) fn invalid_address(input: &str, err: ValidationError) -> Self {
        Self::InvalidAddress(format!("`{input}`: {err}"))
    }

    pub(crate) fn signer_protocol(err: EnvelopeError) -> Self {
        Self::SignerProtocolError(err.to_string())
    }
}

/// Status and message pass through untouched for display.
impl From<TransportError> for PaymentError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status, message } => Self::ServiceError {
                status: Some(status),
                message,
            },
            other => Self::ServiceError {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}

impl From<TxBuilderError> for PaymentError {
    fn from(err: TxBuilderError) -> Self {
        match err {
            TxBuilderError::InvalidAmount(message) => Self::InvalidAmount(message),
            TxBuilderError::UnknownAsset(asset) => Self::UnknownAsset(asset),
            other => Self::Envelope(other.to_string()),
        }
    }
}
