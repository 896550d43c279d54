//! Integration tests for payment flows, rejections, and edge cases.

use stellarpay_client::{
    CancelHandle, CommandContext, CommandEffect, CommandKey, CommandRegistry, ErrorKind,
    FixedClock, KeypairWallet, MockTransport, PaymentError, PaymentOrchestrator, PaymentState,
    SignBehavior, SigningGateway, Submitter, Terminal, TerminalKind, TransportError, TxBuilder,
    View, WalletSession,
};
use stellarpay_crypto::KeypairSigner;
use stellarpay_ledger_mock::{DemoScenario, MockLedger};
use stellarpay_types::{Amount, AssetDescriptor, Network, PaymentRequest, PublicKey};
use stellarpay_wire::SignedEnvelope;

const NOW: u64 = 1_700_000_000;

struct Harness {
    scenario: DemoScenario,
    transport: MockTransport,
    wallet: KeypairWallet,
}

impl Harness {
    fn new() -> Self {
        let scenario = DemoScenario::new(Network::Test);
        let transport = MockTransport::new(scenario.ledger.clone());
        let wallet = KeypairWallet::new(scenario.accounts.alice.clone(), Network::Test);
        Self {
            scenario,
            transport,
            wallet,
        }
    }

    fn request(&self, destination: String, asset: &str, amount: &str) -> PaymentRequest {
        PaymentRequest::new(
            self.scenario.alice().encode(),
            destination,
            asset,
            amount,
            Network::Test,
        )
    }

    fn to_bob(&self, amount: &str) -> PaymentRequest {
        self.request(self.scenario.bob().encode(), "native", amount)
    }

    async fn run(&self, request: PaymentRequest) -> Terminal {
        let session = WalletSession::probe(&self.wallet).await;
        PaymentOrchestrator::new(&self.transport, &self.wallet)
            .with_clock(FixedClock(NOW))
            .run_payment(&session, request)
            .await
    }

    fn sequence_of(&self, key: &PublicKey) -> Option<i64> {
        self.transport
            .with_ledger(|ledger| ledger.account(key).map(|account| account.sequence))
            .unwrap()
    }

    fn balance_of(&self, key: &PublicKey, asset: &AssetDescriptor) -> Option<Amount> {
        self.transport
            .with_ledger(|ledger| ledger.balance_of(key, asset))
            .unwrap()
    }
}

fn failed_kind(terminal: &Terminal) -> Option<ErrorKind> {
    terminal.error().map(PaymentError::kind)
}

#[tokio::test]
async fn integration_native_payment_accepted() {
    let h = Harness::new();
    let terminal = h.run(h.to_bob("10")).await;

    assert!(
        matches!(terminal, Terminal::Accepted { .. }),
        "unexpected outcome: {terminal:?}"
    );
    assert_eq!(terminal.message(), "Payment sent successfully.");
    assert_eq!(h.sequence_of(&h.scenario.alice()), Some(101));
    assert_eq!(
        h.balance_of(&h.scenario.bob(), &AssetDescriptor::Native),
        Some(Amount::from_units(30))
    );
    // 50 - 10 - 100 stroop fee.
    assert_eq!(
        h.balance_of(&h.scenario.alice(), &AssetDescriptor::Native),
        Some(Amount::parse("39.9999900").unwrap())
    );
    assert_eq!(h.transport.submit_calls(), 1);
    assert_eq!(h.wallet.sign_requests(), 1);
}

#[tokio::test]
async fn integration_credit_payment_accepted() {
    let h = Harness::new();
    let terminal = h
        .run(h.request(h.scenario.bob().encode(), "USDC", "12.5"))
        .await;
    assert_eq!(terminal.kind(), TerminalKind::Accepted, "{terminal:?}");

    let usdc = h.scenario.accounts.usdc();
    assert_eq!(
        h.balance_of(&h.scenario.bob(), &usdc),
        Some(Amount::parse("12.5").unwrap())
    );
    assert_eq!(
        h.balance_of(&h.scenario.alice(), &usdc),
        Some(Amount::parse("87.5").unwrap())
    );
}

#[tokio::test]
async fn integration_submit_transport_failure_is_not_retried() {
    let h = Harness::new();
    h.transport.fail_next_submit(TransportError::Timeout);

    let terminal = h.run(h.to_bob("10")).await;
    assert_eq!(terminal.kind(), TerminalKind::Failed);
    assert_eq!(failed_kind(&terminal), Some(ErrorKind::ServiceError));
    assert!(terminal
        .message()
        .contains("verify account state before retrying"));
    assert_eq!(h.transport.submit_calls(), 1);
    // The injected fault never reached the ledger.
    assert_eq!(h.sequence_of(&h.scenario.alice()), Some(100));
}

#[tokio::test]
async fn integration_fetch_service_error_passes_through() {
    let h = Harness::new();
    h.transport.fail_next_get_account(TransportError::Status {
        status: 503,
        message: "Service Unavailable - ledger is catching up".to_string(),
    });

    let terminal = h.run(h.to_bob("1")).await;
    assert_eq!(
        terminal,
        Terminal::Failed(PaymentError::ServiceError {
            status: Some(503),
            message: "Service Unavailable - ledger is catching up".to_string(),
        })
    );
    assert_eq!(h.wallet.sign_requests(), 0);
}

#[tokio::test]
async fn integration_signer_rejection_is_a_cancel() {
    let h = Harness::new();
    h.wallet.set_behavior(SignBehavior::Reject);

    let terminal = h.run(h.to_bob("10")).await;
    assert_eq!(terminal.kind(), TerminalKind::Cancelled);
    assert!(matches!(
        &terminal,
        Terminal::Cancelled { reason } if reason.contains("User declined access")
    ));
    assert_eq!(h.transport.submit_calls(), 0);
}

#[tokio::test]
async fn integration_ledger_decline_preserves_codes() {
    let h = Harness::new();
    // Dave holds no USDC trustline.
    let terminal = h
        .run(h.request(h.scenario.dave().encode(), "USDC", "5"))
        .await;

    assert_eq!(
        terminal,
        Terminal::Rejected {
            result_code: "tx_failed".to_string(),
            operation_codes: vec!["op_no_trust".to_string()],
        }
    );
    assert!(terminal.message().contains("tx_failed (op_no_trust)"));
    // Included but failed: sequence consumed, fee charged, balance intact.
    assert_eq!(h.sequence_of(&h.scenario.alice()), Some(101));
    assert_eq!(
        h.balance_of(&h.scenario.alice(), &h.scenario.accounts.usdc()),
        Some(Amount::from_units(100))
    );
}

#[tokio::test]
async fn integration_expired_window_is_rejected() {
    let h = Harness::new();
    h.transport
        .with_ledger(|ledger| ledger.set_close_time(NOW + 31))
        .unwrap();

    let terminal = h.run(h.to_bob("1")).await;
    assert_eq!(
        terminal,
        Terminal::Rejected {
            result_code: "tx_too_late".to_string(),
            operation_codes: Vec::new(),
        }
    );
    assert_eq!(h.sequence_of(&h.scenario.alice()), Some(100));
}

#[tokio::test]
async fn integration_unfunded_source_fails_before_signing() {
    let scenario = DemoScenario::new(Network::Test);
    let transport = MockTransport::new(scenario.ledger.clone());
    let wallet = KeypairWallet::new(scenario.accounts.carol.clone(), Network::Test);
    let session = WalletSession::probe(&wallet).await;
    let request = PaymentRequest::new(
        scenario.carol().encode(),
        scenario.bob().encode(),
        "native",
        "1",
        Network::Test,
    );

    let terminal = PaymentOrchestrator::new(&transport, &wallet)
        .run_payment(&session, request)
        .await;
    assert_eq!(
        terminal,
        Terminal::Failed(PaymentError::AccountNotFunded(scenario.carol()))
    );
    assert_eq!(transport.get_account_calls(), 1);
    assert_eq!(wallet.sign_requests(), 0);
}

#[tokio::test]
async fn integration_unfunded_destination_fails_pre_build() {
    let h = Harness::new();
    let terminal = h.run(h.request(h.scenario.carol().encode(), "native", "1")).await;

    assert_eq!(
        terminal,
        Terminal::Failed(PaymentError::AccountNotFunded(h.scenario.carol()))
    );
    assert_eq!(h.transport.get_account_calls(), 2);
    assert_eq!(h.wallet.sign_requests(), 0);
    assert_eq!(h.transport.submit_calls(), 0);
}

#[tokio::test]
async fn integration_invalid_addresses_make_no_calls() {
    let h = Harness::new();
    for destination in ["", "GABC", "not-an-address", &h.scenario.bob().encode()[1..]] {
        let terminal = h.run(h.request(destination.to_string(), "native", "1")).await;
        assert_eq!(
            failed_kind(&terminal),
            Some(ErrorKind::InvalidAddress),
            "destination {destination:?}"
        );
    }

    let mut request = h.to_bob("1");
    request.source = "SBADSOURCE".to_string();
    let terminal = h.run(request).await;
    assert_eq!(failed_kind(&terminal), Some(ErrorKind::InvalidAddress));

    assert_eq!(h.transport.total_calls(), 0);
}

#[tokio::test]
async fn integration_unknown_asset_and_bad_amounts() {
    let h = Harness::new();
    let terminal = h.run(h.request(h.scenario.bob().encode(), "EURT", "1")).await;
    assert_eq!(failed_kind(&terminal), Some(ErrorKind::UnknownAsset));

    for amount in ["0", "-5", "1.12345678", "50.0000001"] {
        let terminal = h.run(h.to_bob(amount)).await;
        assert_eq!(
            failed_kind(&terminal),
            Some(ErrorKind::InvalidAmount),
            "amount {amount:?}"
        );
    }
    assert_eq!(h.wallet.sign_requests(), 0);
    assert_eq!(h.transport.submit_calls(), 0);
}

#[tokio::test]
async fn integration_wrong_network_signatures_are_protocol_errors() {
    let h = Harness::new();
    for behavior in [
        SignBehavior::SignForNetwork(Network::Public),
        SignBehavior::MislabelNetwork(Network::Public),
        SignBehavior::ReturnGarbage,
    ] {
        h.wallet.set_behavior(behavior);
        let terminal = h.run(h.to_bob("1")).await;
        assert_eq!(
            failed_kind(&terminal),
            Some(ErrorKind::SignerProtocolError),
            "{behavior:?}"
        );
    }
    assert_eq!(h.transport.submit_calls(), 0);
    assert_eq!(h.sequence_of(&h.scenario.alice()), Some(100));
}

#[tokio::test]
async fn integration_session_mismatch_fails_before_any_call() {
    let h = Harness::new();
    let public_wallet = KeypairWallet::new(h.scenario.accounts.alice.clone(), Network::Public);
    let session = WalletSession::probe(&public_wallet).await;
    let terminal = PaymentOrchestrator::new(&h.transport, &public_wallet)
        .run_payment(&session, h.to_bob("1"))
        .await;
    assert_eq!(failed_kind(&terminal), Some(ErrorKind::SignerProtocolError));

    let disconnected = KeypairWallet::new(h.scenario.accounts.alice.clone(), Network::Test)
        .with_access(false, false);
    let session = WalletSession::probe(&disconnected).await;
    let terminal = PaymentOrchestrator::new(&h.transport, &disconnected)
        .run_payment(&session, h.to_bob("1"))
        .await;
    assert_eq!(failed_kind(&terminal), Some(ErrorKind::SignerProtocolError));

    assert_eq!(h.transport.total_calls(), 0);
}

#[tokio::test]
async fn integration_cancel_while_signer_is_pending() {
    let h = Harness::new();
    h.wallet.set_behavior(SignBehavior::Pending);
    let session = WalletSession::probe(&h.wallet).await;
    let orchestrator =
        PaymentOrchestrator::new(&h.transport, &h.wallet).with_clock(FixedClock(NOW));
    let handle: CancelHandle = orchestrator.cancel_handle();

    let (terminal, cancelled) = futures::join!(
        orchestrator.run_payment(&session, h.to_bob("10")),
        async {
            while handle.state() != PaymentState::AwaitingSignature {
                assert!(!handle.cancel(), "cancel must be a no-op before signing");
                tokio::task::yield_now().await;
            }
            handle.cancel()
        }
    );

    assert!(cancelled);
    assert_eq!(terminal.kind(), TerminalKind::Cancelled);
    assert_eq!(
        handle.state(),
        PaymentState::Terminal(TerminalKind::Cancelled)
    );
    assert_eq!(h.transport.submit_calls(), 0);
    assert_eq!(h.sequence_of(&h.scenario.alice()), Some(100));
}

#[tokio::test]
async fn integration_retry_refetches_account_state() {
    let h = Harness::new();
    h.wallet.set_behavior(SignBehavior::Reject);
    assert_eq!(
        h.run(h.to_bob("5")).await.kind(),
        TerminalKind::Cancelled
    );

    h.wallet.set_behavior(SignBehavior::Approve);
    assert_eq!(h.run(h.to_bob("5")).await.kind(), TerminalKind::Accepted);
    assert_eq!(h.run(h.to_bob("5")).await.kind(), TerminalKind::Accepted);

    assert_eq!(h.sequence_of(&h.scenario.alice()), Some(102));
    // Two source and two destination reads per attempt.
    assert_eq!(h.transport.get_account_calls(), 6);
    assert_eq!(h.transport.submit_calls(), 2);
}

#[tokio::test]
async fn integration_stale_snapshot_is_rejected_with_bad_seq() {
    let h = Harness::new();
    let stale = h
        .transport
        .with_ledger(|ledger| ledger.get_account(&h.scenario.alice()))
        .unwrap()
        .unwrap()
        .to_snapshot()
        .unwrap();

    assert_eq!(h.run(h.to_bob("1")).await.kind(), TerminalKind::Accepted);

    let envelope = TxBuilder::new(Network::Test)
        .with_source(&stale)
        .with_payment(h.scenario.bob(), AssetDescriptor::Native, "1")
        .with_build_time(NOW)
        .build()
        .unwrap();
    let signed = SigningGateway::new(&h.wallet).sign(&envelope).await.unwrap();
    let err = Submitter::new(&h.transport)
        .submit(&signed)
        .await
        .unwrap()
        .into_result()
        .unwrap_err();
    assert_eq!(
        err,
        PaymentError::Rejected {
            result_code: "tx_bad_seq".to_string(),
            operation_codes: Vec::new(),
        }
    );
}

#[tokio::test]
async fn integration_envelope_is_pinned_to_its_network() {
    let scenario = DemoScenario::new(Network::Test);
    let snapshot = scenario
        .ledger
        .get_account(&scenario.alice())
        .unwrap()
        .to_snapshot()
        .unwrap();
    let envelope = TxBuilder::new(Network::Test)
        .with_source(&snapshot)
        .with_payment(scenario.bob(), AssetDescriptor::Native, "1")
        .with_build_time(NOW)
        .build()
        .unwrap();
    assert_eq!(envelope.network(), Network::Test);

    let signer: &KeypairSigner = &scenario.accounts.alice;
    let signature = signer
        .sign_transaction(Network::Test, envelope.transaction())
        .unwrap();
    let signed_xdr = SignedEnvelope::from_parts(envelope, vec![signature])
        .to_xdr_base64()
        .unwrap();

    // Same accounts, public network.
    let mut public_ledger = MockLedger::new(Network::Public);
    for (key, native, seq) in [
        (scenario.alice(), 50, 100),
        (scenario.bob(), 20, 200),
    ] {
        public_ledger.fund_account(key, Amount::from_units(native), seq);
    }
    let public_transport = MockTransport::new(public_ledger);
    let response = public_transport
        .with_ledger(|ledger| ledger.submit(&signed_xdr))
        .unwrap();
    let problem = response.unwrap_err();
    assert_eq!(
        problem.result_codes().map(|codes| codes.transaction.as_str()),
        Some("tx_bad_auth")
    );

    let mut test_ledger = scenario.ledger.clone();
    assert!(test_ledger.submit(&signed_xdr).unwrap().successful);
}

#[tokio::test]
async fn integration_menu_reaches_pipeline_only_through_send_view() {
    let h = Harness::new();
    let registry = CommandRegistry::new();

    let absent = WalletSession::default();
    let keys: Vec<_> = registry.available(&absent).map(|cmd| cmd.key).collect();
    assert!(keys.contains(&CommandKey::InstallWallet));
    assert!(!keys.contains(&CommandKey::CopyPublicKey));

    let session = WalletSession::probe(&h.wallet).await;
    let effect = registry
        .dispatch(CommandKey::SendPayment, &CommandContext::new(&session))
        .unwrap();
    assert_eq!(effect, CommandEffect::OpenView(View::SendPayment));
    assert_eq!(h.transport.total_calls(), 0);

    let terminal = h.run(h.to_bob("2")).await;
    assert_eq!(terminal.kind(), TerminalKind::Accepted);
}
