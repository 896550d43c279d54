//! SigningGateway: hand the envelope to the wallet and validate what comes back.

use stellarpay_types::Network;
use stellarpay_wire::{SignedEnvelope, TransactionEnvelope};
use tracing::{debug, warn};

use crate::error::PaymentError;
use crate::wallet::WalletExtension;

pub struct SigningGateway<'a, W: WalletExtension + ?Sized> {
    wallet: &'a W,
}

impl<'a, W: WalletExtension + ?Sized> SigningGateway<'a, W> {
    pub fn new(wallet: &'a W) -> Self {
        Self { wallet }
    }

    /// Any wallet error is a rejection. A reply for another network, an
    /// undecodable or altered envelope, or a missing source signature is a
    /// protocol error. Never retried.
    pub async fn sign(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SignedEnvelope, PaymentError> {
        let network = envelope.network();
        let unsigned_xdr = envelope
            .to_xdr_base64()
            .map_err(|err| PaymentError::Envelope(err.to_string()))?;
        debug!(hash = %envelope.hash(), %network, "requesting signature");

        let reply = self
            .wallet
            .sign_transaction(&unsigned_xdr, network)
            .await
            .map_err(|err| PaymentError::SigningRejected(err.to_string()))?;

        if Network::from_passphrase(&reply.network_passphrase) != Some(network) {
            warn!(expected = %network, "signer answered for a different network");
            return Err(PaymentError::SignerProtocolError(format!(
                "signed for `{}`, expected `{}`",
                reply.network_passphrase,
                network.passphrase()
            )));
        }
        let signed = SignedEnvelope::decode(&reply.signed_envelope_xdr, envelope)
            .map_err(PaymentError::signer_protocol)?;
        signed
            .verify_signer(&envelope.source())
            .map_err(PaymentError::signer_protocol)?;
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use stellarpay_ledger_mock::DemoScenario;
    use stellarpay_types::{AccountSnapshot, AssetDescriptor, Balance, Network};
    use stellarpay_wire::TransactionEnvelope;

    use super::SigningGateway;
    use crate::error::ErrorKind;
    use crate::tx_builder::{FixedClock, TxBuilder};
    use crate::wallet::{KeypairWallet, SignBehavior};

    fn setup(behavior: SignBehavior) -> (KeypairWallet, TransactionEnvelope) {
        let scenario = DemoScenario::new(Network::Test);
        let wallet = KeypairWallet::new(scenario.accounts.alice.clone(), Network::Test)
            .with_behavior(behavior);
        let snapshot = AccountSnapshot {
            public_key: scenario.alice(),
            sequence: 100,
            balances: vec![Balance::Native {
                amount: stellarpay_types::Amount::from_units(50),
            }],
        };
        let envelope = TxBuilder::new(Network::Test)
            .with_source(&snapshot)
            .with_payment(scenario.bob(), AssetDescriptor::Native, "10")
            .with_clock(&FixedClock(1_700_000_000))
            .build()
            .unwrap();
        (wallet, envelope)
    }

    #[tokio::test]
    async fn approved_signature_verifies_against_source() {
        let (wallet, envelope) = setup(SignBehavior::Approve);
        let signed = SigningGateway::new(&wallet)
            .sign(&envelope)
            .await
            .expect("approved");
        assert_eq!(signed.hash(), envelope.hash());
        assert_eq!(signed.signatures().len(), 1);
        assert_eq!(wallet.sign_requests(), 1);
    }

    #[tokio::test]
    async fn rejection_is_signing_rejected() {
        let (wallet, envelope) = setup(SignBehavior::Reject);
        let err = SigningGateway::new(&wallet).sign(&envelope).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SigningRejected);
        assert!(err.is_user_cancel());
    }

    #[tokio::test]
    async fn wrong_network_and_garbage_are_protocol_errors() {
        for behavior in [
            SignBehavior::SignForNetwork(Network::Public),
            SignBehavior::MislabelNetwork(Network::Public),
            SignBehavior::ReturnGarbage,
        ] {
            let (wallet, envelope) = setup(behavior);
            let err = SigningGateway::new(&wallet).sign(&envelope).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SignerProtocolError, "{behavior:?}");
        }
    }
}
