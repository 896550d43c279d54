//! In-memory ledger that answers like Horizon, for tests and the offline demo.

pub mod mock_ledger;
pub mod scenarios;

pub use mock_ledger::{LedgerAccount, MockLedger, Trustline, FRIENDBOT};
pub use scenarios::{DemoAccounts, DemoScenario};
