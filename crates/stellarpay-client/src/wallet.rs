//! Wallet extension seam, explicit session state, and a local keypair wallet.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use stellarpay_crypto::KeypairSigner;
use stellarpay_types::{Network, PaymentRequest, PublicKey, Signer};
use stellarpay_wire::{SignedEnvelope, TransactionEnvelope};
use thiserror::Error;
use tracing::debug;

use crate::error::PaymentError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet extension is not connected")]
    NotConnected,
    #[error("wallet has not allowed this site")]
    NotAllowed,
    #[error("request declined: {0}")]
    Rejected(String),
    #[error("wallet extension error: {0}")]
    Extension(String),
}

/// Signer output: the signed envelope and the passphrase it was signed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub signed_envelope_xdr: String,
    pub network_passphrase: String,
}

/// Browser wallet capability (Freighter-shaped).
#[async_trait(?Send)]
pub trait WalletExtension {
    async fn is_connected(&self) -> Result<bool, WalletError>;

    async fn is_allowed(&self) -> Result<bool, WalletError>;

    /// Asks the user to allow this site. Returns the resulting allowed flag.
    async fn set_allowed(&self) -> Result<bool, WalletError>;

    async fn get_public_key(&self) -> Result<String, WalletError>;

    /// `"TESTNET"` or `"PUBLIC"`.
    async fn get_network(&self) -> Result<String, WalletError>;

    async fn sign_transaction(
        &self,
        envelope_xdr: &str,
        network: Network,
    ) -> Result<SignedTransaction, WalletError>;
}

/// What the wallet reported at the last probe. Passed explicitly to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletSession {
    pub connected: bool,
    pub allowed: bool,
    pub public_key: Option<PublicKey>,
    pub network: Option<Network>,
}

impl WalletSession {
    pub async fn probe<W: WalletExtension + ?Sized>(wallet: &W) -> Self {
        let connected = wallet.is_connected().await.unwrap_or(false);
        if !connected {
            return Self::default();
        }
        let allowed = wallet.is_allowed().await.unwrap_or(false);
        let network = match wallet.get_network().await {
            Ok(name) => name.parse::<Network>().ok(),
            Err(err) => {
                debug!(%err, "wallet network unavailable");
                None
            }
        };
        let public_key = if allowed {
            match wallet.get_public_key().await {
                Ok(key) => PublicKey::parse(&key).ok(),
                Err(err) => {
                    debug!(%err, "wallet public key unavailable");
                    None
                }
            }
        } else {
            None
        };
        Self {
            connected,
            allowed,
            public_key,
            network,
        }
    }

    /// Requests access, then re-probes.
    pub async fn connect<W: WalletExtension + ?Sized>(wallet: &W) -> Self {
        if let Err(err) = wallet.set_allowed().await {
            debug!(%err, "wallet declined access");
        }
        Self::probe(wallet).await
    }

    pub fn is_ready(&self) -> bool {
        self.connected && self.allowed && self.public_key.is_some()
    }

    /// Checks the session can sign `request` and returns the parsed source key.
    pub fn ensure_ready_for(&self, request: &PaymentRequest) -> Result<PublicKey, PaymentError> {
        if !self.connected {
            return Err(PaymentError::SignerProtocolError(
                "wallet extension is not connected".to_string(),
            ));
        }
        if !self.allowed {
            return Err(PaymentError::SignerProtocolError(
                "wallet has not allowed this site".to_string(),
            ));
        }
        if self.network != Some(request.network) {
            return Err(PaymentError::SignerProtocolError(format!(
                "wallet network {} does not match payment network {}",
                self.network
                    .map_or_else(|| "unknown".to_string(), |network| network.to_string()),
                request.network
            )));
        }
        let source = PublicKey::parse(&request.source)
            .map_err(|err| PaymentError::invalid_address(&request.source, err))?;
        match self.public_key {
            None => Err(PaymentError::InvalidAddress(
                "wallet did not expose a public key".to_string(),
            )),
            Some(key) if key != source => Err(PaymentError::InvalidAddress(format!(
                "source {source} is not the wallet account {key}"
            ))),
            Some(_) => Ok(source),
        }
    }
}

/// Scripted signer responses for [`KeypairWallet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignBehavior {
    Approve,
    /// User dismisses the prompt.
    Reject,
    /// Signs for `network` and says so.
    SignForNetwork(Network),
    /// Signs for `network` but reports the requested network.
    MislabelNetwork(Network),
    /// Returns a string that is not an envelope.
    ReturnGarbage,
    /// Never answers.
    Pending,
}

#[derive(Debug)]
struct WalletState {
    connected: bool,
    allowed: bool,
    network: Network,
    behavior: SignBehavior,
    sign_requests: usize,
}

/// Wallet backed by a local ed25519 key. Used by the demo and tests.
#[derive(Debug, Clone)]
pub struct KeypairWallet {
    signer: KeypairSigner,
    state: Arc<Mutex<WalletState>>,
}

impl KeypairWallet {
    /// Connected, allowed, approving wallet on `network`.
    pub fn new(signer: KeypairSigner, network: Network) -> Self {
        Self {
            signer,
            state: Arc::new(Mutex::new(WalletState {
                connected: true,
                allowed: true,
                network,
                behavior: SignBehavior::Approve,
                sign_requests: 0,
            })),
        }
    }

    pub fn with_behavior(self, behavior: SignBehavior) -> Self {
        self.set_behavior(behavior);
        self
    }

    pub fn with_access(self, connected: bool, allowed: bool) -> Self {
        {
            let mut state = self.lock();
            state.connected = connected;
            state.allowed = allowed;
        }
        self
    }

    pub fn set_behavior(&self, behavior: SignBehavior) {
        self.lock().behavior = behavior;
    }

    pub fn public_key(&self) -> &PublicKey {
        self.signer.public_key()
    }

    pub fn sign_requests(&self) -> usize {
        self.lock().sign_requests
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sign_for(&self, envelope_xdr: &str, network: Network) -> Result<String, WalletError> {
        let envelope = TransactionEnvelope::from_xdr_base64(network, envelope_xdr)
            .map_err(|err| WalletError::Extension(err.to_string()))?;
        let signature = self
            .signer
            .sign_transaction(network, envelope.transaction())
            .map_err(|err| WalletError::Extension(err.to_string()))?;
        SignedEnvelope::from_parts(envelope, vec![signature])
            .to_xdr_base64()
            .map_err(|err| WalletError::Extension(err.to_string()))
    }
}

#[async_trait(?Send)]
impl WalletExtension for KeypairWallet {
    async fn is_connected(&self) -> Result<bool, WalletError> {
        Ok(self.lock().connected)
    }

    async fn is_allowed(&self) -> Result<bool, WalletError> {
        Ok(self.lock().allowed)
    }

    async fn set_allowed(&self) -> Result<bool, WalletError> {
        let mut state = self.lock();
        if !state.connected {
            return Err(WalletError::NotConnected);
        }
        state.allowed = true;
        Ok(true)
    }

    async fn get_public_key(&self) -> Result<String, WalletError> {
        let state = self.lock();
        if !state.allowed {
            return Err(WalletError::NotAllowed);
        }
        Ok(self.signer.public_key().encode())
    }

    async fn get_network(&self) -> Result<String, WalletError> {
        Ok(self.lock().network.wallet_name().to_string())
    }

    async fn sign_transaction(
        &self,
        envelope_xdr: &str,
        network: Network,
    ) -> Result<SignedTransaction, WalletError> {
        let behavior = {
            let mut state = self.lock();
            if !state.connected {
                return Err(WalletError::NotConnected);
            }
            state.sign_requests += 1;
            state.behavior
        };
        let (sign_network, reported) = match behavior {
            SignBehavior::Approve => (network, network),
            SignBehavior::Reject => {
                return Err(WalletError::Rejected("User declined access".to_string()))
            }
            SignBehavior::SignForNetwork(other) => (other, other),
            SignBehavior::MislabelNetwork(other) => (other, network),
            SignBehavior::ReturnGarbage => {
                return Ok(SignedTransaction {
                    signed_envelope_xdr: "not-an-envelope".to_string(),
                    network_passphrase: network.passphrase().to_string(),
                })
            }
            SignBehavior::Pending => return futures::future::pending().await,
        };
        Ok(SignedTransaction {
            signed_envelope_xdr: self.sign_for(envelope_xdr, sign_network)?,
            network_passphrase: reported.passphrase().to_string(),
        })
    }
}
