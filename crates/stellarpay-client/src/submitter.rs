//! Submitter: one submission, classified as accepted, rejected, or unknown.

use stellarpay_types::TxHash;
use stellarpay_wire::SignedEnvelope;
use tracing::{info, warn};

use crate::error::PaymentError;
use crate::transport::LedgerTransport;

/// Used when the ledger declines without reporting a code.
pub const UNKNOWN_RESULT_CODE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted {
        hash: TxHash,
    },
    Rejected {
        result_code: String,
        operation_codes: Vec<String>,
    },
}

impl SubmissionOutcome {
    pub fn into_result(self) -> Result<TxHash, PaymentError> {
        match self {
            Self::Accepted { hash } => Ok(hash),
            Self::Rejected {
                result_code,
                operation_codes,
            } => Err(PaymentError::Rejected {
                result_code,
                operation_codes,
            }),
        }
    }
}

pub struct Submitter<'a, T: LedgerTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: LedgerTransport + ?Sized> Submitter<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Calls the service exactly once. A transport failure is `ServiceError`:
    /// the transaction may or may not have been applied.
    pub async fn submit(
        &self,
        signed: &SignedEnvelope,
    ) -> Result<SubmissionOutcome, PaymentError> {
        let envelope_xdr = signed
            .to_xdr_base64()
            .map_err(|err| PaymentError::Envelope(err.to_string()))?;
        let response = self.transport.submit_transaction(&envelope_xdr).await?;
        let hash = *signed.hash();

        if response.successful {
            if let Some(reported) = response.hash.as_deref() {
                if reported != hash.to_hex() {
                    warn!(%hash, reported, "service reported a different hash");
                }
            }
            info!(%hash, "transaction accepted");
            return Ok(SubmissionOutcome::Accepted { hash });
        }
        let result_code = response
            .result_code
            .unwrap_or_else(|| UNKNOWN_RESULT_CODE.to_string());
        info!(
            %hash,
            %result_code,
            operation_codes = ?response.operation_codes,
            "transaction rejected"
        );
        Ok(SubmissionOutcome::Rejected {
            result_code,
            operation_codes: response.operation_codes,
        })
    }
}

#[cfg(test)]
mod tests {
    use stellarpay_ledger_mock::DemoScenario;
    use stellarpay_types::{AccountSnapshot, Amount, AssetDescriptor, Balance, Network, Signer};
    use stellarpay_wire::{SignedEnvelope, TransactionEnvelope};

    use super::{SubmissionOutcome, Submitter};
    use crate::error::{ErrorKind, PaymentError};
    use crate::transport::{MockTransport, TransportError};
    use crate::tx_builder::{FixedClock, TxBuilder};

    fn signed(
        scenario: &DemoScenario,
        sequence: i64,
        asset: AssetDescriptor,
        to: stellarpay_types::PublicKey,
    ) -> SignedEnvelope {
        let snapshot = AccountSnapshot {
            public_key: scenario.alice(),
            sequence,
            balances: vec![
                Balance::Native {
                    amount: Amount::from_units(50),
                },
                Balance::Credit {
                    code: stellarpay_types::AssetCode::parse("USDC").unwrap(),
                    issuer: *scenario.accounts.issuer.public_key(),
                    amount: Amount::from_units(100),
                },
            ],
        };
        let envelope: TransactionEnvelope = TxBuilder::new(Network::Test)
            .with_source(&snapshot)
            .with_payment(to, asset, "1")
            .with_clock(&FixedClock(1_700_000_000))
            .build()
            .unwrap();
        let signature = scenario
            .accounts
            .alice
            .sign_transaction(Network::Test, envelope.transaction())
            .unwrap();
        SignedEnvelope::from_parts(envelope, vec![signature])
    }

    #[tokio::test]
    async fn accepted_returns_local_hash() {
        let scenario = DemoScenario::new(Network::Test);
        let transport = MockTransport::new(scenario.ledger.clone());
        let signed = signed(&scenario, 100, AssetDescriptor::Native, scenario.bob());
        let outcome = Submitter::new(&transport).submit(&signed).await.unwrap();
        assert_eq!(outcome, SubmissionOutcome::Accepted { hash: *signed.hash() });
    }

    #[tokio::test]
    async fn ledger_decline_keeps_codes_verbatim() {
        let scenario = DemoScenario::new(Network::Test);
        let transport = MockTransport::new(scenario.ledger.clone());
        let signed = signed(&scenario, 100, scenario.accounts.usdc(), scenario.dave());
        let err = Submitter::new(&transport)
            .submit(&signed)
            .await
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(
            err,
            PaymentError::Rejected {
                result_code: "tx_failed".to_string(),
                operation_codes: vec!["op_no_trust".to_string()],
            }
        );

        let stale = signed_stale(&scenario);
        let outcome = Submitter::new(&transport).submit(&stale).await.unwrap();
        assert!(matches!(
            outcome,
            SubmissionOutcome::Rejected { ref result_code, .. } if result_code == "tx_bad_seq"
        ));
    }

    fn signed_stale(scenario: &DemoScenario) -> SignedEnvelope {
        signed(scenario, 99, AssetDescriptor::Native, scenario.bob())
    }

    #[tokio::test]
    async fn transport_failure_is_service_error_with_one_call() {
        let scenario = DemoScenario::new(Network::Test);
        let transport = MockTransport::new(scenario.ledger.clone());
        transport.fail_next_submit(TransportError::Unavailable("connection reset".to_string()));
        let signed = signed(&scenario, 100, AssetDescriptor::Native, scenario.bob());
        let err = Submitter::new(&transport).submit(&signed).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceError);
        assert_eq!(transport.submit_calls(), 1);
    }
}
