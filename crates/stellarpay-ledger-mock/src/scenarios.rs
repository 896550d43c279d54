use stellarpay_crypto::KeypairSigner;
use stellarpay_types::{Amount, AssetCode, AssetDescriptor, Network, PublicKey, Signer};

use crate::mock_ledger::MockLedger;

pub const DEMO_ASSET_CODE: &str = "USDC";

/// Keys for the demo cast. `carol` is deliberately never funded.
#[derive(Debug, Clone)]
pub struct DemoAccounts {
    pub alice: KeypairSigner,
    pub bob: KeypairSigner,
    pub carol: KeypairSigner,
    pub dave: KeypairSigner,
    pub issuer: KeypairSigner,
}

impl DemoAccounts {
    pub fn new() -> Self {
        Self {
            alice: KeypairSigner::from_seed([0xa1; 32]),
            bob: KeypairSigner::from_seed([0xb2; 32]),
            carol: KeypairSigner::from_seed([0xc3; 32]),
            dave: KeypairSigner::from_seed([0xd4; 32]),
            issuer: KeypairSigner::from_seed([0x15; 32]),
        }
    }

    pub fn usdc(&self) -> AssetDescriptor {
        AssetDescriptor::Credit {
            code: demo_code(),
            issuer: *self.issuer.public_key(),
        }
    }
}

impl Default for DemoAccounts {
    fn default() -> Self {
        Self::new()
    }
}

/// Ledger preloaded with the demo cast:
///
/// - alice: 50 XLM, sequence 100, 100 USDC
/// - bob: 20 XLM, 0 USDC trustline
/// - dave: 20 XLM, no USDC trustline
/// - issuer: 1000 XLM
/// - carol: absent
#[derive(Debug, Clone)]
pub struct DemoScenario {
    pub accounts: DemoAccounts,
    pub ledger: MockLedger,
}

impl DemoScenario {
    pub fn new(network: Network) -> Self {
        let accounts = DemoAccounts::new();
        let mut ledger = MockLedger::new(network);
        let issuer = *accounts.issuer.public_key();

        ledger.fund_account(issuer, Amount::from_units(1_000), 10);
        ledger.fund_account(*accounts.alice.public_key(), Amount::from_units(50), 100);
        ledger.fund_account(*accounts.bob.public_key(), Amount::from_units(20), 200);
        ledger.fund_account(*accounts.dave.public_key(), Amount::from_units(20), 300);
        ledger.add_trustline(
            accounts.alice.public_key(),
            demo_code(),
            issuer,
            Amount::from_units(100),
        );
        ledger.add_trustline(accounts.bob.public_key(), demo_code(), issuer, Amount::ZERO);

        Self { accounts, ledger }
    }

    pub fn alice(&self) -> PublicKey {
        *self.accounts.alice.public_key()
    }

    pub fn bob(&self) -> PublicKey {
        *self.accounts.bob.public_key()
    }

    pub fn carol(&self) -> PublicKey {
        *self.accounts.carol.public_key()
    }

    pub fn dave(&self) -> PublicKey {
        *self.accounts.dave.public_key()
    }
}

fn demo_code() -> AssetCode {
    AssetCode::parse(DEMO_ASSET_CODE).expect("demo asset code is alphanumeric")
}
