//! Wire formats: base64 XDR transaction envelopes and Horizon JSON resources.

pub mod convert;
pub mod envelope;
pub mod horizon;

pub use envelope::{EnvelopeError, PaymentView, SignedEnvelope, TransactionEnvelope};
pub use horizon::{
    AccountRecord, BalanceLine, OperationRecord, Page, Problem, ProblemExtras, ResultCodes,
    SubmitResponse, TransactionRecord,
};
