//! AccountFetcher: validated account reads with funded/unfunded classification.

use stellarpay_types::{AccountSnapshot, PublicKey};
use tracing::debug;

use crate::error::PaymentError;
use crate::transport::{LedgerTransport, TransportError};

pub struct AccountFetcher<'a, T: LedgerTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: LedgerTransport + ?Sized> AccountFetcher<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Parses `public_key` before any call; a malformed key never reaches the service.
    pub async fn fetch(&self, public_key: &str) -> Result<AccountSnapshot, PaymentError> {
        let key = PublicKey::parse(public_key)
            .map_err(|err| PaymentError::invalid_address(public_key, err))?;
        self.fetch_key(&key).await
    }

    pub async fn fetch_key(&self, key: &PublicKey) -> Result<AccountSnapshot, PaymentError> {
        let record = match self.transport.get_account(key).await {
            Ok(record) => record,
            Err(TransportError::NotFound) => return Err(PaymentError::AccountNotFunded(*key)),
            Err(err) => return Err(err.into()),
        };
        let snapshot = record
            .to_snapshot()
            .map_err(|err| PaymentError::ServiceError {
                status: None,
                message: format!("malformed account record: {err}"),
            })?;
        debug!(account = %key, sequence = snapshot.sequence, "fetched account");
        Ok(snapshot)
    }
}
