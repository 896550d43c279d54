//! AccountReader: the "My Wallet" and "Recent Payments" views.

use stellarpay_types::{AccountSnapshot, PaymentRecord, PublicKey};
use tracing::debug;

use crate::error::PaymentError;
use crate::fetcher::AccountFetcher;
use crate::transport::{LedgerTransport, TransportError};

pub const DEFAULT_PAYMENTS_LIMIT: u32 = 10;

/// Read-only queries. Each call is one request; nothing is cached.
pub struct AccountReader<'a, T: LedgerTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: LedgerTransport + ?Sized> AccountReader<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    pub async fn load_account(&self, public_key: &str) -> Result<AccountSnapshot, PaymentError> {
        AccountFetcher::new(self.transport).fetch(public_key).await
    }

    /// Newest first, at most `limit` entries.
    pub async fn recent_payments(
        &self,
        public_key: &str,
        limit: u32,
    ) -> Result<Vec<PaymentRecord>, PaymentError> {
        let key = PublicKey::parse(public_key)
            .map_err(|err| PaymentError::invalid_address(public_key, err))?;
        self.recent_payments_for(&key, limit).await
    }

    pub async fn recent_payments_for(
        &self,
        key: &PublicKey,
        limit: u32,
    ) -> Result<Vec<PaymentRecord>, PaymentError> {
        let records = match self.transport.recent_payments(key, limit).await {
            Ok(records) => records,
            Err(TransportError::NotFound) => return Err(PaymentError::AccountNotFunded(*key)),
            Err(err) => return Err(err.into()),
        };
        debug!(account = %key, count = records.len(), "fetched payments");
        records
            .iter()
            .map(|record| {
                record
                    .to_payment_record()
                    .map_err(|err| PaymentError::ServiceError {
                        status: None,
                        message: format!("malformed operation record {}: {err}", record.id),
                    })
            })
            .collect()
    }
}
