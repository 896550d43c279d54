use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stellarpay_ledger_mock::MockLedger;
use stellarpay_types::{Network, PublicKey};
use stellarpay_wire::{AccountRecord, OperationRecord, Problem, SubmitResponse, TransactionRecord};
use thiserror::Error;

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Connection settings for the ledger-query service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub horizon_url: String,
    pub request_timeout_ms: u64,
}

impl TransportConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            horizon_url: network.horizon_url().to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::for_network(Network::Test)
    }
}

/// Error model for ledger transport operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("horizon unavailable: {0}")]
    Unavailable(String),
    #[error("resource not found")]
    NotFound,
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("internal transport error: {0}")]
    Internal(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound => Some(404),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<Problem> for TransportError {
    fn from(problem: Problem) -> Self {
        if problem.status == 404 {
            Self::NotFound
        } else {
            Self::Status {
                status: problem.status,
                message: problem.message(),
            }
        }
    }
}

/// Ledger-query service interface. Implementations may use Horizon over HTTP or the in-memory mock.
#[async_trait(?Send)]
pub trait LedgerTransport {
    async fn get_account(&self, account: &PublicKey) -> Result<AccountRecord, TransportError>;

    /// Submits a base64 signed envelope.
    ///
    /// A ledger-level failure is `Ok` with `successful = false`; only a failure
    /// to learn the outcome is an `Err`.
    async fn submit_transaction(
        &self,
        envelope_xdr: &str,
    ) -> Result<SubmitResponse, TransportError>;

    /// Newest-first payment operations touching `account`.
    async fn recent_payments(
        &self,
        account: &PublicKey,
        limit: u32,
    ) -> Result<Vec<OperationRecord>, TransportError>;
}

/// Problem types that mean the ledger has definitively declined the transaction.
const DECLINE_KINDS: [&str; 2] = ["transaction_failed", "transaction_malformed"];

/// Folds a declining problem into an unsuccessful response.
///
/// Result codes are used when present; otherwise the problem type itself is the
/// result code. Anything else, including 5xx and gateway timeouts, stays an error.
fn submit_result(
    result: Result<TransactionRecord, Problem>,
) -> Result<SubmitResponse, TransportError> {
    let problem = match result {
        Ok(record) => return Ok(record.into()),
        Err(problem) => problem,
    };
    let declined = (400..500).contains(&problem.status)
        && (problem.result_codes().is_some() || DECLINE_KINDS.contains(&problem.kind_slug()));
    if !declined {
        return Err(problem.into());
    }
    Ok(match problem.result_codes() {
        Some(codes) => {
            SubmitResponse::rejected(codes.transaction.clone(), codes.operations.clone())
        }
        None => SubmitResponse::rejected(problem.kind_slug(), Vec::new()),
    })
}

#[cfg(not(target_arch = "wasm32"))]
pub use horizon::HorizonTransport;

#[cfg(not(target_arch = "wasm32"))]
mod horizon {
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::{Client, Response};
    use stellarpay_types::PublicKey;
    use stellarpay_wire::{
        AccountRecord, OperationRecord, Page, Problem, SubmitResponse, TransactionRecord,
    };
    use tracing::debug;

    use super::{submit_result, LedgerTransport, TransportConfig, TransportError};

    /// Horizon REST transport.
    #[derive(Debug, Clone)]
    pub struct HorizonTransport {
        client: Client,
        base_url: String,
    }

    impl HorizonTransport {
        pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
            let client = Client::builder()
                .timeout(Duration::from_millis(config.request_timeout_ms))
                .build()
                .map_err(|err| TransportError::Internal(err.to_string()))?;
            Ok(Self {
                client,
                base_url: config.horizon_url.trim_end_matches('/').to_string(),
            })
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }

        fn url(&self, path: &str) -> String {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn map_reqwest(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Unavailable(err.to_string())
        }
    }

    /// Reads a non-2xx body as a problem document, falling back to the raw text.
    async fn read_problem(response: Response) -> Problem {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<Problem>(&body).unwrap_or_else(|_| Problem {
            kind: String::new(),
            title: status.canonical_reason().unwrap_or("HTTP error").to_string(),
            status: status.as_u16(),
            detail: (!body.is_empty()).then_some(body),
            extras: None,
        })
    }

    #[async_trait(?Send)]
    impl LedgerTransport for HorizonTransport {
        async fn get_account(&self, account: &PublicKey) -> Result<AccountRecord, TransportError> {
            let url = self.url(&format!("accounts/{account}"));
            debug!(%url, "horizon get account");
            let response = self.client.get(&url).send().await.map_err(map_reqwest)?;
            if !response.status().is_success() {
                return Err(read_problem(response).await.into());
            }
            response.json().await.map_err(map_reqwest)
        }

        async fn submit_transaction(
            &self,
            envelope_xdr: &str,
        ) -> Result<SubmitResponse, TransportError> {
            let url = self.url("transactions");
            debug!(%url, "horizon submit transaction");
            let response = self
                .client
                .post(&url)
                .form(&[("tx", envelope_xdr)])
                .send()
                .await
                .map_err(map_reqwest)?;
            if response.status().is_success() {
                let record: TransactionRecord = response.json().await.map_err(map_reqwest)?;
                return submit_result(Ok(record));
            }
            submit_result(Err(read_problem(response).await))
        }

        async fn recent_payments(
            &self,
            account: &PublicKey,
            limit: u32,
        ) -> Result<Vec<OperationRecord>, TransportError> {
            let url = self.url(&format!("accounts/{account}/payments"));
            let limit = limit.to_string();
            let response = self
                .client
                .get(&url)
                .query(&[("limit", limit.as_str()), ("order", "desc")])
                .send()
                .await
                .map_err(map_reqwest)?;
            if !response.status().is_success() {
                return Err(read_problem(response).await.into());
            }
            let page: Page<OperationRecord> = response.json().await.map_err(map_reqwest)?;
            Ok(page.into_records())
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    get_account: VecDeque<TransportError>,
    submit: VecDeque<TransportError>,
}

#[derive(Debug, Default)]
struct CallCounters {
    get_account: AtomicUsize,
    submit: AtomicUsize,
    payments: AtomicUsize,
}

/// In-memory transport backed by `MockLedger`, used by tests and the offline demo.
///
/// Queued faults are returned instead of touching the ledger, so an injected
/// submit fault leaves the transaction unapplied.
#[derive(Clone)]
pub struct MockTransport {
    ledger: Arc<Mutex<MockLedger>>,
    faults: Arc<Mutex<Faults>>,
    calls: Arc<CallCounters>,
}

impl MockTransport {
    pub fn new(ledger: MockLedger) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            faults: Arc::new(Mutex::new(Faults::default())),
            calls: Arc::new(CallCounters::default()),
        }
    }

    pub fn with_ledger<R>(
        &self,
        f: impl FnOnce(&mut MockLedger) -> R,
    ) -> Result<R, TransportError> {
        let mut lock = self
            .ledger
            .lock()
            .map_err(|_| TransportError::Unavailable("mutex poisoned".to_string()))?;
        Ok(f(&mut lock))
    }

    pub fn fail_next_get_account(&self, err: TransportError) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.get_account.push_back(err);
        }
    }

    pub fn fail_next_submit(&self, err: TransportError) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.submit.push_back(err);
        }
    }

    pub fn get_account_calls(&self) -> usize {
        self.calls.get_account.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.calls.submit.load(Ordering::SeqCst)
    }

    pub fn payments_calls(&self) -> usize {
        self.calls.payments.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.get_account_calls() + self.submit_calls() + self.payments_calls()
    }

    fn take_fault(
        &self,
        pick: impl FnOnce(&mut Faults) -> Option<TransportError>,
    ) -> Option<TransportError> {
        self.faults.lock().ok().and_then(|mut faults| pick(&mut faults))
    }
}

#[async_trait(?Send)]
impl LedgerTransport for MockTransport {
    async fn get_account(&self, account: &PublicKey) -> Result<AccountRecord, TransportError> {
        self.calls.get_account.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_fault(|faults| faults.get_account.pop_front()) {
            return Err(err);
        }
        self.with_ledger(|ledger| ledger.get_account(account))?
            .map_err(TransportError::from)
    }

    async fn submit_transaction(
        &self,
        envelope_xdr: &str,
    ) -> Result<SubmitResponse, TransportError> {
        self.calls.submit.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_fault(|faults| faults.submit.pop_front()) {
            return Err(err);
        }
        let result = self.with_ledger(|ledger| ledger.submit(envelope_xdr))?;
        submit_result(result)
    }

    async fn recent_payments(
        &self,
        account: &PublicKey,
        limit: u32,
    ) -> Result<Vec<OperationRecord>, TransportError> {
        self.calls.payments.fetch_add(1, Ordering::SeqCst);
        self.with_ledger(|ledger| ledger.payments_for(account, limit as usize))?
            .map_err(TransportError::from)
    }
}
