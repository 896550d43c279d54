//! Crypto for the payment pipeline: network ids, transaction hashing, ed25519 signatures.

pub mod ed25519;
pub mod hashing;

pub use ed25519::{decorate, verify_decorated, KeypairSigner};
pub use hashing::{compute_tx_hash, network_id, transaction_signature_payload};
