//! Account state, balances, asset descriptors, and payment requests.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{Amount, AssetCode, Network, PublicKey};

/// Selection key that always resolves to the native asset.
pub const NATIVE_SELECTION: &str = "native";

/// One balance line held by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Balance {
    Native {
        amount: Amount,
    },
    Credit {
        code: AssetCode,
        issuer: PublicKey,
        amount: Amount,
    },
    LiquidityPoolShare {
        pool_id: String,
        amount: Amount,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceKind {
    Native,
    Credit,
    LiquidityPoolShare,
}

impl Balance {
    pub fn kind(&self) -> BalanceKind {
        match self {
            Self::Native { .. } => BalanceKind::Native,
            Self::Credit { .. } => BalanceKind::Credit,
            Self::LiquidityPoolShare { .. } => BalanceKind::LiquidityPoolShare,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Self::Native { amount }
            | Self::Credit { amount, .. }
            | Self::LiquidityPoolShare { amount, .. } => *amount,
        }
    }

    /// Asset this line holds, if it can be the asset of a payment.
    pub fn asset(&self) -> Option<AssetDescriptor> {
        match self {
            Self::Native { .. } => Some(AssetDescriptor::Native),
            Self::Credit { code, issuer, .. } => Some(AssetDescriptor::Credit {
                code: code.clone(),
                issuer: *issuer,
            }),
            Self::LiquidityPoolShare { .. } => None,
        }
    }
}

/// Account state as read from the ledger for a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub public_key: PublicKey,
    pub sequence: i64,
    pub balances: Vec<Balance>,
}

impl AccountSnapshot {
    pub fn balance_of(&self, asset: &AssetDescriptor) -> Option<Amount> {
        self.balances
            .iter()
            .find(|balance| balance.asset().as_ref() == Some(asset))
            .map(Balance::amount)
    }
}

/// Resolved payment asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetDescriptor {
    Native,
    Credit { code: AssetCode, issuer: PublicKey },
}

impl fmt::Display for AssetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("XLM"),
            Self::Credit { code, issuer } => write!(f, "{code}:{issuer}"),
        }
    }
}

/// User input for one payment attempt, as typed into the form.
///
/// Fields stay unparsed here; each pipeline stage validates the part it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub source: String,
    pub destination: String,
    /// `"native"` or an asset code held by the source.
    pub asset: String,
    pub amount: String,
    pub network: Network,
}

impl PaymentRequest {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        asset: impl Into<String>,
        amount: impl Into<String>,
        network: Network,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            asset: asset.into(),
            amount: amount.into(),
            network,
        }
    }
}

/// Payment-like operation from an account's history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentRecord {
    Payment {
        id: String,
        created_at: String,
        from: PublicKey,
        to: PublicKey,
        asset: AssetDescriptor,
        amount: Amount,
    },
    CreateAccount {
        id: String,
        created_at: String,
        funder: PublicKey,
        account: PublicKey,
        starting_balance: Amount,
    },
    Other {
        id: String,
        kind: String,
    },
}
