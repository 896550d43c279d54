//! Unsigned and signed transaction envelopes in base64 XDR form.
//!
//! A [`TransactionEnvelope`] pins a transaction to one network: the hash is
//! computed once at construction over `network_id || ENVELOPE_TYPE_TX || tx`.
//! A [`SignedEnvelope`] is only produced after checking that the signer
//! returned exactly the body it was given.

use stellar_xdr::curr::{
    self as xdr, DecoratedSignature, Limits, OperationBody, Preconditions, ReadXdr,
    TransactionV1Envelope, WriteXdr,
};
use stellarpay_crypto::{compute_tx_hash, network_id, verify_decorated};
use stellarpay_types::{
    Amount, AssetDescriptor, CryptoError, Network, NetworkId, PublicKey, TxHash, ValidationError,
};
use thiserror::Error;

use crate::convert::{asset_from_xdr, public_key_from_muxed};

/// Upper bound on a decoded envelope; a single-payment transaction is far below it.
pub const MAX_ENVELOPE_BYTES: usize = 64 * 1024;

const MAX_DECODE_DEPTH: u32 = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("xdr error: {0}")]
    Xdr(String),
    #[error("unsupported envelope type: {0}")]
    UnsupportedEnvelope(&'static str),
    #[error("signed transaction body differs from the unsigned one")]
    TransactionMismatch,
    #[error("envelope carries no signatures")]
    MissingSignature,
    #[error("no valid signature from {0}")]
    SignerNotFound(PublicKey),
    #[error("transaction has no payment operation")]
    NotAPayment,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

fn decode_limits() -> Limits {
    Limits {
        depth: MAX_DECODE_DEPTH,
        len: MAX_ENVELOPE_BYTES,
    }
}

fn decode_v1(input: &str) -> Result<TransactionV1Envelope, EnvelopeError> {
    let envelope = xdr::TransactionEnvelope::from_xdr_base64(input.trim(), decode_limits())
        .map_err(|err| EnvelopeError::Xdr(err.to_string()))?;
    match envelope {
        xdr::TransactionEnvelope::Tx(v1) => Ok(v1),
        xdr::TransactionEnvelope::TxV0(_) => Err(EnvelopeError::UnsupportedEnvelope("v0")),
        xdr::TransactionEnvelope::TxFeeBump(_) => {
            Err(EnvelopeError::UnsupportedEnvelope("fee bump"))
        }
    }
}

fn encode_v1(
    tx: &xdr::Transaction,
    signatures: &[DecoratedSignature],
) -> Result<String, EnvelopeError> {
    let envelope = xdr::TransactionEnvelope::Tx(TransactionV1Envelope {
        tx: tx.clone(),
        signatures: signatures
            .to_vec()
            .try_into()
            .map_err(|_| EnvelopeError::Xdr("too many signatures".to_string()))?,
    });
    envelope
        .to_xdr_base64(Limits::none())
        .map_err(|err| EnvelopeError::Xdr(err.to_string()))
}

/// Read-only view of the single payment operation in an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentView {
    /// Operation-level source, when set explicitly.
    pub source: Option<PublicKey>,
    pub destination: PublicKey,
    pub asset: AssetDescriptor,
    pub amount: Amount,
}

/// Unsigned transaction bound to the network it will be hashed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEnvelope {
    network: Network,
    tx: xdr::Transaction,
    hash: TxHash,
}

impl TransactionEnvelope {
    pub fn new(network: Network, tx: xdr::Transaction) -> Result<Self, EnvelopeError> {
        let hash = compute_tx_hash(network, &tx)?;
        Ok(Self { network, tx, hash })
    }

    /// Decodes a base64 V1 envelope, dropping any signatures it carries.
    pub fn from_xdr_base64(network: Network, input: &str) -> Result<Self, EnvelopeError> {
        let v1 = decode_v1(input)?;
        Self::new(network, v1.tx)
    }

    pub fn to_xdr_base64(&self) -> Result<String, EnvelopeError> {
        encode_v1(&self.tx, &[])
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn network_id(&self) -> NetworkId {
        network_id(self.network)
    }

    pub fn hash(&self) -> &TxHash {
        &self.hash
    }

    pub fn transaction(&self) -> &xdr::Transaction {
        &self.tx
    }

    pub fn source(&self) -> PublicKey {
        public_key_from_muxed(&self.tx.source_account)
    }

    pub fn sequence(&self) -> i64 {
        self.tx.seq_num.0
    }

    pub fn fee(&self) -> u32 {
        self.tx.fee
    }

    pub fn operation_count(&self) -> usize {
        self.tx.operations.len()
    }

    /// `(min_time, max_time)` in unix seconds, when the transaction is time-bounded.
    pub fn time_bounds(&self) -> Option<(u64, u64)> {
        match &self.tx.cond {
            Preconditions::Time(bounds) => Some((bounds.min_time.0, bounds.max_time.0)),
            Preconditions::V2(cond) => cond
                .time_bounds
                .as_ref()
                .map(|bounds| (bounds.min_time.0, bounds.max_time.0)),
            Preconditions::None => None,
        }
    }

    pub fn payment(&self) -> Result<PaymentView, EnvelopeError> {
        let op = self
            .tx
            .operations
            .as_slice()
            .first()
            .ok_or(EnvelopeError::NotAPayment)?;
        let OperationBody::Payment(payment) = &op.body else {
            return Err(EnvelopeError::NotAPayment);
        };
        Ok(PaymentView {
            source: op.source_account.as_ref().map(public_key_from_muxed),
            destination: public_key_from_muxed(&payment.destination),
            asset: asset_from_xdr(&payment.asset)?,
            amount: Amount::from_stroops(payment.amount)?,
        })
    }
}

/// Signed envelope whose body matches the transaction sent for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    unsigned: TransactionEnvelope,
    signatures: Vec<DecoratedSignature>,
}

impl SignedEnvelope {
    /// Decodes signer output and checks it against `expected`.
    ///
    /// Fails when the payload is not a V1 envelope, when the transaction body
    /// was altered, or when no signature is attached.
    pub fn decode(input: &str, expected: &TransactionEnvelope) -> Result<Self, EnvelopeError> {
        let v1 = decode_v1(input)?;
        if v1.tx != expected.tx {
            return Err(EnvelopeError::TransactionMismatch);
        }
        if v1.signatures.is_empty() {
            return Err(EnvelopeError::MissingSignature);
        }
        Ok(Self {
            unsigned: expected.clone(),
            signatures: v1.signatures.to_vec(),
        })
    }

    /// Decodes a submitted envelope as the ledger sees it, hashing for `network`.
    pub fn from_xdr_base64(network: Network, input: &str) -> Result<Self, EnvelopeError> {
        let v1 = decode_v1(input)?;
        let signatures = v1.signatures.to_vec();
        Ok(Self {
            unsigned: TransactionEnvelope::new(network, v1.tx)?,
            signatures,
        })
    }

    pub fn from_parts(unsigned: TransactionEnvelope, signatures: Vec<DecoratedSignature>) -> Self {
        Self {
            unsigned,
            signatures,
        }
    }

    pub fn envelope(&self) -> &TransactionEnvelope {
        &self.unsigned
    }

    pub fn network(&self) -> Network {
        self.unsigned.network
    }

    pub fn hash(&self) -> &TxHash {
        &self.unsigned.hash
    }

    pub fn signatures(&self) -> &[DecoratedSignature] {
        &self.signatures
    }

    /// Succeeds when some attached signature is `signer`'s over this envelope's hash.
    pub fn verify_signer(&self, signer: &PublicKey) -> Result<(), EnvelopeError> {
        let hash = self.hash();
        if self
            .signatures
            .iter()
            .any(|signature| verify_decorated(signer, hash, signature).is_ok())
        {
            Ok(())
        } else {
            Err(EnvelopeError::SignerNotFound(*signer))
        }
    }

    pub fn to_xdr_base64(&self) -> Result<String, EnvelopeError> {
        encode_v1(&self.unsigned.tx, &self.signatures)
    }
}
