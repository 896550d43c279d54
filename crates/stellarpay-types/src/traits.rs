//! Signer trait shared by local key signers and the ledger mock.

use crate::{error::CryptoError, ids::PublicKey};

pub trait Signer {
    fn public_key(&self) -> &PublicKey;

    /// Signs a 32-byte transaction hash and returns the raw ed25519 signature.
    fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 64], CryptoError>;
}
