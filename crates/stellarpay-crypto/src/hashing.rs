use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    self as xdr, Limits, TransactionSignaturePayload, TransactionSignaturePayloadTaggedTransaction,
    WriteXdr,
};
use stellarpay_types::{CryptoError, Network, NetworkId, TxHash};

/// Network id is SHA-256 of the network passphrase.
///
/// It is mixed into every transaction hash, so a signature produced for one
/// network never verifies on another.
pub fn network_id(network: Network) -> NetworkId {
    NetworkId::new(sha256_32(network.passphrase().as_bytes()))
}

/// XDR of `network_id || ENVELOPE_TYPE_TX || tx`, the preimage that gets hashed and signed.
pub fn transaction_signature_payload(
    network: Network,
    tx: &xdr::Transaction,
) -> Result<Vec<u8>, CryptoError> {
    let payload = TransactionSignaturePayload {
        network_id: xdr::Hash(*network_id(network).as_bytes()),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    };
    payload
        .to_xdr(Limits::none())
        .map_err(|err| CryptoError::Encoding(err.to_string()))
}

pub fn compute_tx_hash(network: Network, tx: &xdr::Transaction) -> Result<TxHash, CryptoError> {
    let payload = transaction_signature_payload(network, tx)?;
    Ok(TxHash::new(sha256_32(&payload)))
}

fn sha256_32(data: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}
