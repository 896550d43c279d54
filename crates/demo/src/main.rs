use clap::Parser;
use stellarpay_client::{
    AccountReader, CommandContext, CommandEffect, CommandKey, CommandRegistry, HorizonTransport,
    KeypairWallet, LedgerTransport, MockTransport, PaymentOrchestrator, TransportConfig, View,
    WalletSession, DEFAULT_PAYMENTS_LIMIT,
};
use stellarpay_crypto::KeypairSigner;
use stellarpay_ledger_mock::DemoScenario;
use stellarpay_types::{Network, PaymentRecord, PaymentRequest, PublicKey, Signer};
use tracing::{info, warn};

const SECRET_ENV: &str = "STELLARPAY_SECRET";

#[derive(Debug, Parser)]
#[command(name = "stellarpay-demo", about = "Send one payment through the wallet pipeline")]
struct Cli {
    /// `testnet` or `public`.
    #[arg(long, default_value = "testnet")]
    network: Network,
    /// Overrides the network's Horizon endpoint in live mode.
    #[arg(long)]
    horizon_url: Option<String>,
    #[arg(long, default_value = "10")]
    amount: String,
    /// `native` or an asset code held by the source.
    #[arg(long, default_value = "native")]
    asset: String,
    /// Destination account. Defaults to the demo recipient in mock mode.
    #[arg(long)]
    destination: Option<String>,
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,
    /// Talk to Horizon, signing with the secret seed in `STELLARPAY_SECRET`.
    #[arg(long)]
    live: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    if cli.live {
        run_live(&cli).await
    } else {
        run_mock(&cli).await
    }
}

async fn run_mock(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = DemoScenario::new(cli.network);
    let destination = match &cli.destination {
        Some(destination) => destination.clone(),
        None => scenario.bob().encode(),
    };
    let transport = MockTransport::new(scenario.ledger.clone());
    let wallet = KeypairWallet::new(scenario.accounts.alice.clone(), cli.network);
    info!(network = %cli.network, "running against the in-memory ledger");
    run_menu(&transport, &wallet, cli, destination).await
}

async fn run_live(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let secret = std::env::var(SECRET_ENV).map_err(|_| format!("{SECRET_ENV} is not set"))?;
    let signer = KeypairSigner::from_secret(&secret)?;
    let destination = cli
        .destination
        .clone()
        .ok_or("--destination is required with --live")?;
    let mut config = TransportConfig::for_network(cli.network);
    if let Some(url) = &cli.horizon_url {
        config.horizon_url = url.clone();
    }
    config.request_timeout_ms = cli.timeout_ms;
    let transport = HorizonTransport::new(&config)?;
    info!(horizon = %config.horizon_url, account = %signer.public_key(), "running live");
    let wallet = KeypairWallet::new(signer, cli.network);
    run_menu(&transport, &wallet, cli, destination).await
}

/// Walks the menu the way a user would: wallet actions, account view, send, history.
async fn run_menu<T>(
    transport: &T,
    wallet: &KeypairWallet,
    cli: &Cli,
    destination: String,
) -> Result<(), Box<dyn std::error::Error>>
where
    T: LedgerTransport + ?Sized,
{
    let registry = CommandRegistry::new();
    let mut session = WalletSession::probe(wallet).await;
    if !session.allowed {
        if let Ok(CommandEffect::RequestConnect) =
            registry.dispatch(CommandKey::ConnectWallet, &CommandContext::new(&session))
        {
            session = WalletSession::connect(wallet).await;
        }
    }
    for handler in registry.available(&session) {
        info!(group = handler.group.heading(), "menu: {}", handler.label);
    }
    let source = session.public_key.ok_or("wallet did not expose a public key")?;

    let ctx = CommandContext::new(&session);
    if let Ok(CommandEffect::Notify(text)) = registry.dispatch(CommandKey::CheckNetwork, &ctx) {
        info!("{text}");
    }

    let reader = AccountReader::new(transport);
    if let Ok(CommandEffect::OpenView(View::MyAccount)) =
        registry.dispatch(CommandKey::MyAccount, &ctx)
    {
        match reader.load_account(&source.encode()).await {
            Ok(snapshot) => {
                for balance in &snapshot.balances {
                    info!(sequence = snapshot.sequence, "balance: {:?}", balance);
                }
            }
            Err(err) => warn!(%err, "could not load account"),
        }
    }

    if let Ok(CommandEffect::OpenView(View::SendPayment)) =
        registry.dispatch(CommandKey::SendPayment, &ctx)
    {
        let request = PaymentRequest::new(
            source.encode(),
            destination,
            cli.asset.clone(),
            cli.amount.clone(),
            cli.network,
        );
        let terminal = PaymentOrchestrator::new(transport, wallet)
            .run_payment(&session, request)
            .await;
        info!(outcome = ?terminal.kind(), "{}", terminal.message());
    }

    if let Ok(CommandEffect::OpenView(View::RecentPayments)) =
        registry.dispatch(CommandKey::RecentPayments, &ctx)
    {
        let payments = reader
            .recent_payments_for(&source, DEFAULT_PAYMENTS_LIMIT)
            .await?;
        for record in &payments {
            log_record(&source, record);
        }
    }
    Ok(())
}

fn log_record(owner: &PublicKey, record: &PaymentRecord) {
    match record {
        PaymentRecord::Payment {
            from,
            to,
            asset,
            amount,
            created_at,
            ..
        } => {
            let direction = if from == owner { "sent" } else { "received" };
            info!(%created_at, %from, %to, "{direction} {amount} {asset}");
        }
        PaymentRecord::CreateAccount {
            funder,
            starting_balance,
            created_at,
            ..
        } => info!(%created_at, %funder, "account created with {starting_balance} XLM"),
        PaymentRecord::Other { id, kind } => info!(%id, "{kind}"),
    }
}
