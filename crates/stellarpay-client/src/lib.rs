//! Stellar payment client.
//!
//! This crate exposes:
//! - ledger transports (`LedgerTransport`, `HorizonTransport`, `MockTransport`),
//! - the wallet seam (`WalletExtension`), explicit `WalletSession`, and a local `KeypairWallet`,
//! - the pipeline stages: `AccountFetcher`, `resolve_asset`, `TxBuilder`, `SigningGateway`,
//!   `Submitter`,
//! - the `PaymentOrchestrator` state machine with a `CancelHandle`,
//! - the read-only `AccountReader` and the menu `CommandRegistry`.

pub mod commands;
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod reader;
pub mod resolver;
pub mod signing;
pub mod submitter;
pub mod transport;
pub mod tx_builder;
pub mod wallet;

pub use commands::{
    CommandContext, CommandEffect, CommandError, CommandGroup, CommandHandler, CommandKey,
    CommandRegistry, View, FREIGHTER_INSTALL_URL,
};
pub use error::{ErrorKind, PaymentError};
pub use fetcher::AccountFetcher;
pub use orchestrator::{
    run_payment, CancelHandle, PaymentOrchestrator, PaymentState, Terminal, TerminalKind,
};
pub use reader::{AccountReader, DEFAULT_PAYMENTS_LIMIT};
pub use resolver::resolve_asset;
pub use signing::SigningGateway;
pub use submitter::{SubmissionOutcome, Submitter};
#[cfg(not(target_arch = "wasm32"))]
pub use transport::HorizonTransport;
pub use transport::{LedgerTransport, MockTransport, TransportConfig, TransportError};
pub use tx_builder::{BuilderConfig, Clock, FixedClock, SystemClock, TxBuilder, TxBuilderError};
pub use wallet::{
    KeypairWallet, SignBehavior, SignedTransaction, WalletError, WalletExtension, WalletSession,
};
