use std::fmt;

use ed25519_dalek::{Signature, Signer as DalekSigner, SigningKey, Verifier, VerifyingKey};
use stellar_xdr::curr::{self as xdr, BytesM, DecoratedSignature, SignatureHint};
use stellarpay_types::{CryptoError, Network, PublicKey, Signer, TxHash, ValidationError};

use crate::hashing::compute_tx_hash;

/// Local ed25519 key that signs transaction hashes.
#[derive(Clone)]
pub struct KeypairSigner {
    public_key: PublicKey,
    signing_key: SigningKey,
}

impl KeypairSigner {
    pub fn new(signing_key: SigningKey) -> Self {
        let public_key = PublicKey::from_raw(signing_key.verifying_key().to_bytes());
        Self {
            public_key,
            signing_key,
        }
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(&seed))
    }

    /// Builds a signer from an `S...` secret seed.
    pub fn from_secret(secret: &str) -> Result<Self, ValidationError> {
        let seed = stellar_strkey::ed25519::PrivateKey::from_string(secret.trim())
            .map_err(|_| ValidationError::Message("invalid secret seed".to_string()))?;
        Ok(Self::from_seed(seed.0))
    }

    /// Hashes `tx` for `network` and returns the decorated signature over that hash.
    pub fn sign_transaction(
        &self,
        network: Network,
        tx: &xdr::Transaction,
    ) -> Result<DecoratedSignature, CryptoError> {
        let hash = compute_tx_hash(network, tx)?;
        let signature = self.sign_digest(hash.as_bytes())?;
        decorate(&self.public_key, signature)
    }
}

impl Signer for KeypairSigner {
    fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 64], CryptoError> {
        Ok(self.signing_key.sign(digest).to_bytes())
    }
}

impl fmt::Debug for KeypairSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypairSigner")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

pub fn decorate(
    public_key: &PublicKey,
    signature: [u8; 64],
) -> Result<DecoratedSignature, CryptoError> {
    let bytes: BytesM<64> = signature
        .to_vec()
        .try_into()
        .map_err(|_| CryptoError::InvalidLength {
            kind: "signature",
            expected: 64,
            actual: signature.len(),
        })?;
    Ok(DecoratedSignature {
        hint: SignatureHint(public_key.hint()),
        signature: xdr::Signature(bytes),
    })
}

/// Checks that `signature` is `public_key`'s signature over `hash`.
pub fn verify_decorated(
    public_key: &PublicKey,
    hash: &TxHash,
    signature: &DecoratedSignature,
) -> Result<(), CryptoError> {
    if signature.hint.0 != public_key.hint() {
        return Err(CryptoError::HintMismatch);
    }
    let raw = signature.signature.0.as_slice();
    let raw: [u8; 64] = raw.try_into().map_err(|_| CryptoError::InvalidLength {
        kind: "signature",
        expected: 64,
        actual: raw.len(),
    })?;
    let verify_key = VerifyingKey::from_bytes(public_key.as_bytes())
        .map_err(|err| CryptoError::Message(format!("invalid public key: {err}")))?;
    verify_key
        .verify(hash.as_bytes(), &Signature::from_bytes(&raw))
        .map_err(|_| CryptoError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use stellar_xdr::curr::{
        self as xdr, Memo, MuxedAccount, Preconditions, SequenceNumber, TransactionExt, Uint256,
    };
    use stellarpay_types::{CryptoError, Network, PublicKey, Signer};

    use super::{verify_decorated, KeypairSigner};
    use crate::hashing::compute_tx_hash;

    fn empty_tx(source: &PublicKey) -> xdr::Transaction {
        xdr::Transaction {
            source_account: MuxedAccount::Ed25519(Uint256(*source.as_bytes())),
            fee: 100,
            seq_num: SequenceNumber(1),
            cond: Preconditions::None,
            memo: Memo::None,
            operations: Vec::new().try_into().unwrap(),
            ext: TransactionExt::V0,
        }
    }

    #[test]
    fn sign_then_verify_on_same_network() {
        let signer = KeypairSigner::from_seed([0x21; 32]);
        let tx = empty_tx(signer.public_key());
        let signature = signer.sign_transaction(Network::Test, &tx).unwrap();
        let hash = compute_tx_hash(Network::Test, &tx).unwrap();
        verify_decorated(signer.public_key(), &hash, &signature).expect("signature verifies");
        assert_eq!(signature.hint.0, signer.public_key().hint());
    }

    #[test]
    fn signature_for_other_network_does_not_verify() {
        let signer = KeypairSigner::from_seed([0x21; 32]);
        let tx = empty_tx(signer.public_key());
        let signature = signer.sign_transaction(Network::Public, &tx).unwrap();
        let test_hash = compute_tx_hash(Network::Test, &tx).unwrap();
        let err = verify_decorated(signer.public_key(), &test_hash, &signature)
            .expect_err("cross-network signature must fail");
        assert_eq!(err, CryptoError::InvalidSignature);
    }

    #[test]
    fn verify_rejects_foreign_signer_hint() {
        let signer = KeypairSigner::from_seed([0x21; 32]);
        let other = KeypairSigner::from_seed([0x22; 32]);
        let tx = empty_tx(signer.public_key());
        let signature = other.sign_transaction(Network::Test, &tx).unwrap();
        let hash = compute_tx_hash(Network::Test, &tx).unwrap();
        let err = verify_decorated(signer.public_key(), &hash, &signature).unwrap_err();
        assert_eq!(err, CryptoError::HintMismatch);
    }

    #[test]
    fn secret_seed_round_trip() {
        let seed = [0x33; 32];
        let secret = stellar_strkey::ed25519::PrivateKey(seed).to_string();
        let signer = KeypairSigner::from_secret(&secret).unwrap();
        assert_eq!(
            signer.public_key(),
            KeypairSigner::from_seed(seed).public_key()
        );
        assert!(KeypairSigner::from_secret("SNOTASECRET").is_err());
    }
}
