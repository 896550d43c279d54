//! TxBuilder: assemble a single-payment transaction pinned to one network.

use std::time::{SystemTime, UNIX_EPOCH};

use stellar_xdr::curr::{
    self as xdr, Memo, Operation, OperationBody, PaymentOp, Preconditions, SequenceNumber,
    TimeBounds, TimePoint, TransactionExt,
};
use stellarpay_types::{
    AccountSnapshot, Amount, AssetDescriptor, Network, PublicKey, ValidationError,
};
use stellarpay_wire::convert::{asset_to_xdr, muxed_account};
use stellarpay_wire::{EnvelopeError, TransactionEnvelope};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_BASE_FEE: u32 = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fee and validity window applied to every built transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Stroops per operation.
    pub base_fee: u32,
    pub timeout_secs: u64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            base_fee: DEFAULT_BASE_FEE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

pub trait Clock {
    fn now_unix_secs(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_secs(&self) -> u64 {
        unix_secs(SystemTime::now())
    }
}

/// Seconds since the epoch; a clock set before 1970 reads as zero.
fn unix_secs(now: SystemTime) -> u64 {
    match now.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs(),
        Err(err) => {
            warn!(
                behind_secs = err.duration().as_secs(),
                "system clock is before the unix epoch; transactions will expire immediately"
            );
            0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_unix_secs(&self) -> u64 {
        self.0
    }
}

/// Transaction builder validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxBuilderError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("{0}")]
    InvalidAmount(String),
    #[error("invalid payment: {0}")]
    InvalidPayment(&'static str),
    #[error("source does not hold `{0}`")]
    UnknownAsset(String),
    #[error("source sequence number overflows")]
    SequenceOverflow,
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Fluent builder for a one-operation payment `TransactionEnvelope`.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    network: Network,
    config: BuilderConfig,
    source: Option<AccountSnapshot>,
    destination: Option<PublicKey>,
    asset: Option<AssetDescriptor>,
    amount: Option<String>,
    build_time: Option<u64>,
}

impl TxBuilder {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            config: BuilderConfig::default(),
            source: None,
            destination: None,
            asset: None,
            amount: None,
            build_time: None,
        }
    }

    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Snapshot of the source account, fetched for this attempt.
    pub fn with_source(mut self, snapshot: &AccountSnapshot) -> Self {
        self.source = Some(snapshot.clone());
        self
    }

    pub fn with_payment(
        mut self,
        destination: PublicKey,
        asset: AssetDescriptor,
        amount: impl Into<String>,
    ) -> Self {
        self.destination = Some(destination);
        self.asset = Some(asset);
        self.amount = Some(amount.into());
        self
    }

    pub fn with_build_time(mut self, unix_secs: u64) -> Self {
        self.build_time = Some(unix_secs);
        self
    }

    pub fn with_clock(self, clock: &impl Clock) -> Self {
        self.with_build_time(clock.now_unix_secs())
    }

    pub fn build(self) -> Result<TransactionEnvelope, TxBuilderError> {
        let source = self.source.ok_or(TxBuilderError::MissingField("source"))?;
        let destination = self
            .destination
            .ok_or(TxBuilderError::MissingField("destination"))?;
        let asset = self.asset.ok_or(TxBuilderError::MissingField("asset"))?;
        let raw_amount = self.amount.ok_or(TxBuilderError::MissingField("amount"))?;
        let build_time = self
            .build_time
            .ok_or(TxBuilderError::MissingField("build_time"))?;

        let amount = parse_amount(&raw_amount)?;
        // Every account holds the native asset, even with no balance line for it.
        let available = match (&asset, source.balance_of(&asset)) {
            (_, Some(available)) => available,
            (AssetDescriptor::Native, None) => Amount::ZERO,
            (AssetDescriptor::Credit { code, .. }, None) => {
                return Err(TxBuilderError::UnknownAsset(code.to_string()))
            }
        };
        if amount > available {
            return Err(TxBuilderError::InvalidAmount(format!(
                "{amount} exceeds available balance {available} of {asset}"
            )));
        }

        let seq_num = source
            .sequence
            .checked_add(1)
            .ok_or(TxBuilderError::SequenceOverflow)?;
        let source_account = muxed_account(&source.public_key);
        let operation = Operation {
            // Explicit even though it equals the transaction source.
            source_account: Some(source_account.clone()),
            body: OperationBody::Payment(PaymentOp {
                destination: muxed_account(&destination),
                asset: asset_to_xdr(&asset),
                amount: amount.stroops(),
            }),
        };
        let tx = xdr::Transaction {
            source_account,
            fee: self.config.base_fee,
            seq_num: SequenceNumber(seq_num),
            cond: Preconditions::Time(TimeBounds {
                min_time: TimePoint(0),
                max_time: TimePoint(build_time.saturating_add(self.config.timeout_secs)),
            }),
            memo: Memo::None,
            operations: vec![operation]
                .try_into()
                .map_err(|_| TxBuilderError::InvalidPayment("too many operations"))?,
            ext: TransactionExt::V0,
        };
        Ok(TransactionEnvelope::new(self.network, tx)?)
    }
}

/// Positive, at most seven fractional digits, never truncated.
fn parse_amount(raw: &str) -> Result<Amount, TxBuilderError> {
    let amount = Amount::parse(raw).map_err(|err| match err {
        ValidationError::InvalidAmount(message) => TxBuilderError::InvalidAmount(message),
        other => TxBuilderError::InvalidAmount(other.to_string()),
    })?;
    if !amount.is_positive() {
        return Err(TxBuilderError::InvalidAmount(format!(
            "`{raw}` must be greater than zero"
        )));
    }
    Ok(amount)
}
