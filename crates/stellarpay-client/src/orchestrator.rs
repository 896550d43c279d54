//! PaymentOrchestrator: fetch, resolve, build, sign, submit, and report one terminal outcome.
//!
//! An orchestrator runs exactly one attempt and is consumed by it. Retrying
//! means building a new orchestrator, which re-fetches the account snapshot.

use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::channel::oneshot;
use futures::future::{select, Either};
use stellarpay_types::{PaymentRequest, PublicKey, TxHash};
use stellarpay_wire::{SignedEnvelope, TransactionEnvelope};
use tracing::{debug, info, warn};

use crate::error::PaymentError;
use crate::fetcher::AccountFetcher;
use crate::resolver::resolve_asset;
use crate::signing::SigningGateway;
use crate::submitter::Submitter;
use crate::transport::LedgerTransport;
use crate::tx_builder::{BuilderConfig, Clock, SystemClock, TxBuilder};
use crate::wallet::{WalletExtension, WalletSession};

pub const CANCELLED_BY_USER: &str = "cancelled while awaiting signature";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentState {
    Idle,
    Fetching,
    Resolving,
    Building,
    AwaitingSignature,
    Submitting,
    Terminal(TerminalKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    Accepted,
    Rejected,
    Cancelled,
    Failed,
}

/// Final outcome of one payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Accepted {
        hash: TxHash,
    },
    Rejected {
        result_code: String,
        operation_codes: Vec<String>,
    },
    Cancelled {
        reason: String,
    },
    Failed(PaymentError),
}

impl Terminal {
    pub fn kind(&self) -> TerminalKind {
        match self {
            Self::Accepted { .. } => TerminalKind::Accepted,
            Self::Rejected { .. } => TerminalKind::Rejected,
            Self::Cancelled { .. } => TerminalKind::Cancelled,
            Self::Failed(_) => TerminalKind::Failed,
        }
    }

    pub fn error(&self) -> Option<&PaymentError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Text for the presentation layer.
    pub fn message(&self) -> String {
        match self {
            Self::Accepted { .. } => "Payment sent successfully.".to_string(),
            Self::Rejected {
                result_code,
                operation_codes,
            } if operation_codes.is_empty() => {
                format!("Failed to send payment. The ledger returned {result_code}.")
            }
            Self::Rejected {
                result_code,
                operation_codes,
            } => format!(
                "Failed to send payment. The ledger returned {result_code} ({}).",
                operation_codes.join(", ")
            ),
            Self::Cancelled { reason } => format!("Payment cancelled ({reason})."),
            Self::Failed(PaymentError::ServiceError { message, .. }) => format!(
                "The ledger service did not answer ({message}). \
                 The payment may or may not have been applied; verify account state before retrying."
            ),
            Self::Failed(err) => format!("Failed to send payment: {err}."),
        }
    }
}

/// Signer rejection becomes a cancel, a ledger decline a rejection, anything else a failure.
impl From<PaymentError> for Terminal {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::SigningRejected(reason) => Self::Cancelled { reason },
            PaymentError::Rejected {
                result_code,
                operation_codes,
            } => Self::Rejected {
                result_code,
                operation_codes,
            },
            other => Self::Failed(other),
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: PaymentState,
    cancel: Option<oneshot::Sender<()>>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Caller-side handle for observing state and cancelling at the signer prompt.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    shared: Arc<Mutex<Shared>>,
}

impl CancelHandle {
    /// Only effective while awaiting the signature. Returns whether it took effect.
    pub fn cancel(&self) -> bool {
        let mut shared = lock(&self.shared);
        if shared.state != PaymentState::AwaitingSignature {
            return false;
        }
        shared
            .cancel
            .take()
            .is_some_and(|sender| sender.send(()).is_ok())
    }

    pub fn state(&self) -> PaymentState {
        lock(&self.shared).state
    }
}

pub struct PaymentOrchestrator<'a, T: ?Sized, W: ?Sized, C = SystemClock> {
    transport: &'a T,
    wallet: &'a W,
    clock: C,
    config: BuilderConfig,
    shared: Arc<Mutex<Shared>>,
    cancel_rx: oneshot::Receiver<()>,
}

impl<'a, T, W> PaymentOrchestrator<'a, T, W, SystemClock>
where
    T: LedgerTransport + ?Sized,
    W: WalletExtension + ?Sized,
{
    pub fn new(transport: &'a T, wallet: &'a W) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        Self {
            transport,
            wallet,
            clock: SystemClock,
            config: BuilderConfig::default(),
            shared: Arc::new(Mutex::new(Shared {
                state: PaymentState::Idle,
                cancel: Some(cancel_tx),
            })),
            cancel_rx,
        }
    }
}

impl<'a, T, W, C> PaymentOrchestrator<'a, T, W, C>
where
    T: LedgerTransport + ?Sized,
    W: WalletExtension + ?Sized,
    C: Clock,
{
    pub fn with_clock<C2: Clock>(self, clock: C2) -> PaymentOrchestrator<'a, T, W, C2> {
        PaymentOrchestrator {
            transport: self.transport,
            wallet: self.wallet,
            clock,
            config: self.config,
            shared: self.shared,
            cancel_rx: self.cancel_rx,
        }
    }

    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> PaymentState {
        lock(&self.shared).state
    }

    /// Runs the attempt to completion. Never retries any step.
    pub async fn run_payment(
        mut self,
        session: &WalletSession,
        request: PaymentRequest,
    ) -> Terminal {
        info!(
            source = %request.source,
            destination = %request.destination,
            network = %request.network,
            asset = %request.asset,
            "payment attempt started"
        );
        let terminal = match self.drive(session, &request).await {
            Ok(hash) => Terminal::Accepted { hash },
            Err(err) => Terminal::from(err),
        };
        self.transition(PaymentState::Terminal(terminal.kind()));
        match &terminal {
            Terminal::Accepted { hash } => info!(%hash, "payment accepted"),
            Terminal::Rejected { result_code, .. } => warn!(%result_code, "payment rejected"),
            Terminal::Cancelled { reason } => info!(%reason, "payment cancelled"),
            Terminal::Failed(err) => warn!(kind = ?err.kind(), %err, "payment failed"),
        }
        terminal
    }

    async fn drive(
        &mut self,
        session: &WalletSession,
        request: &PaymentRequest,
    ) -> Result<TxHash, PaymentError> {
        let source = session.ensure_ready_for(request)?;
        let destination = PublicKey::parse(&request.destination)
            .map_err(|err| PaymentError::invalid_address(&request.destination, err))?;

        self.transition(PaymentState::Fetching);
        let fetcher = AccountFetcher::new(self.transport);
        let snapshot = fetcher.fetch_key(&source).await?;
        // Unfunded destinations are refused here rather than left to the ledger.
        fetcher.fetch_key(&destination).await?;

        self.transition(PaymentState::Resolving);
        let asset = resolve_asset(&request.asset, &snapshot.balances)?;

        self.transition(PaymentState::Building);
        let envelope = TxBuilder::new(request.network)
            .with_config(self.config)
            .with_source(&snapshot)
            .with_payment(destination, asset, request.amount.as_str())
            .with_clock(&self.clock)
            .build()?;
        debug!(
            sequence = envelope.sequence(),
            hash = %envelope.hash(),
            "envelope built"
        );

        self.transition(PaymentState::AwaitingSignature);
        let signed = self.await_signature(&envelope).await?;

        self.transition(PaymentState::Submitting);
        Submitter::new(self.transport)
            .submit(&signed)
            .await?
            .into_result()
    }

    async fn await_signature(
        &mut self,
        envelope: &TransactionEnvelope,
    ) -> Result<SignedEnvelope, PaymentError> {
        let gateway = SigningGateway::new(self.wallet);
        let sign = pin!(gateway.sign(envelope));
        match select(sign, &mut self.cancel_rx).await {
            Either::Left((result, _)) => result,
            Either::Right((Ok(()), _)) => {
                Err(PaymentError::SigningRejected(CANCELLED_BY_USER.to_string()))
            }
            // Handle dropped without cancelling.
            Either::Right((Err(oneshot::Canceled), sign)) => sign.await,
        }
    }

    fn transition(&self, next: PaymentState) {
        let mut shared = lock(&self.shared);
        debug!(from = ?shared.state, to = ?next, "payment state");
        shared.state = next;
        if matches!(next, PaymentState::Terminal(_)) {
            shared.cancel = None;
        }
    }
}

/// One-shot convenience over [`PaymentOrchestrator`].
pub async fn run_payment<T, W>(
    transport: &T,
    wallet: &W,
    session: &WalletSession,
    request: PaymentRequest,
) -> Terminal
where
    T: LedgerTransport + ?Sized,
    W: WalletExtension + ?Sized,
{
    PaymentOrchestrator::new(transport, wallet)
        .run_payment(session, request)
        .await
}
