//! Horizon JSON resources and their conversion into domain types.

use serde::{Deserialize, Serialize};
use stellarpay_types::{
    AccountSnapshot, Amount, AssetCode, AssetDescriptor, Balance, PaymentRecord, PublicKey,
    ValidationError,
};

pub const ASSET_TYPE_NATIVE: &str = "native";
pub const ASSET_TYPE_ALPHANUM4: &str = "credit_alphanum4";
pub const ASSET_TYPE_ALPHANUM12: &str = "credit_alphanum12";
pub const ASSET_TYPE_POOL_SHARES: &str = "liquidity_pool_shares";

/// `GET /accounts/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account_id: String,
    /// Horizon sends the 64-bit sequence as a decimal string.
    pub sequence: String,
    pub balances: Vec<BalanceLine>,
}

impl AccountRecord {
    pub fn to_snapshot(&self) -> Result<AccountSnapshot, ValidationError> {
        let public_key = PublicKey::parse(&self.account_id)?;
        let sequence = self
            .sequence
            .parse::<i64>()
            .map_err(|_| ValidationError::Message(format!("bad sequence {}", self.sequence)))?;
        let balances = self
            .balances
            .iter()
            .map(BalanceLine::to_balance)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AccountSnapshot {
            public_key,
            sequence,
            balances,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLine {
    pub balance: String,
    pub asset_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidity_pool_id: Option<String>,
}

impl BalanceLine {
    pub fn native(amount: Amount) -> Self {
        Self {
            balance: amount.to_string(),
            asset_type: ASSET_TYPE_NATIVE.to_string(),
            asset_code: None,
            asset_issuer: None,
            liquidity_pool_id: None,
        }
    }

    pub fn credit(code: &AssetCode, issuer: &PublicKey, amount: Amount) -> Self {
        let asset_type = if code.as_str().len() <= 4 {
            ASSET_TYPE_ALPHANUM4
        } else {
            ASSET_TYPE_ALPHANUM12
        };
        Self {
            balance: amount.to_string(),
            asset_type: asset_type.to_string(),
            asset_code: Some(code.to_string()),
            asset_issuer: Some(issuer.encode()),
            liquidity_pool_id: None,
        }
    }

    pub fn to_balance(&self) -> Result<Balance, ValidationError> {
        let amount = Amount::parse(&self.balance)?;
        match self.asset_type.as_str() {
            ASSET_TYPE_NATIVE => Ok(Balance::Native { amount }),
            ASSET_TYPE_ALPHANUM4 | ASSET_TYPE_ALPHANUM12 => Ok(Balance::Credit {
                code: AssetCode::parse(required(&self.asset_code, "asset_code")?)?,
                issuer: PublicKey::parse(required(&self.asset_issuer, "asset_issuer")?)?,
                amount,
            }),
            ASSET_TYPE_POOL_SHARES => Ok(Balance::LiquidityPoolShare {
                pool_id: required(&self.liquidity_pool_id, "liquidity_pool_id")?.to_string(),
                amount,
            }),
            other => Err(ValidationError::Message(format!(
                "unknown asset_type {other}"
            ))),
        }
    }
}

fn required<'a>(
    value: &'a Option<String>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    value.as_deref().ok_or(ValidationError::MissingField(field))
}

/// Successful `POST /transactions` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    pub successful: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger: Option<u32>,
}

/// RFC 7807 problem document returned for every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub title: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<ProblemExtras>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemExtras {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_codes: Option<ResultCodes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCodes {
    pub transaction: String,
    #[serde(default)]
    pub operations: Vec<String>,
}

impl Problem {
    pub fn not_found() -> Self {
        Self {
            kind: "https://stellar.org/horizon-errors/not_found".to_string(),
            title: "Resource Missing".to_string(),
            status: 404,
            detail: Some("The resource at the url requested was not found.".to_string()),
            extras: None,
        }
    }

    pub fn transaction_failed(
        hash: Option<String>,
        transaction: impl Into<String>,
        operations: Vec<String>,
    ) -> Self {
        Self {
            kind: "https://stellar.org/horizon-errors/transaction_failed".to_string(),
            title: "Transaction Failed".to_string(),
            status: 400,
            detail: Some("The transaction failed when submitted to the stellar network.".into()),
            extras: Some(ProblemExtras {
                result_codes: Some(ResultCodes {
                    transaction: transaction.into(),
                    operations,
                }),
                hash,
            }),
        }
    }

    /// Horizon's answer to an envelope it cannot decode. Carries no result codes.
    pub fn transaction_malformed(detail: impl Into<String>) -> Self {
        Self {
            kind: "https://stellar.org/horizon-errors/transaction_malformed".to_string(),
            title: "Transaction Malformed".to_string(),
            status: 400,
            detail: Some(detail.into()),
            extras: None,
        }
    }

    /// Last path segment of `type`, e.g. `transaction_failed`.
    pub fn kind_slug(&self) -> &str {
        self.kind.rsplit('/').next().unwrap_or_default()
    }

    pub fn result_codes(&self) -> Option<&ResultCodes> {
        self.extras.as_ref()?.result_codes.as_ref()
    }

    /// `"<title> - <detail>"`, or just the title when there is no detail.
    pub fn message(&self) -> String {
        match &self.detail {
            Some(detail) if !detail.is_empty() => format!("{} - {}", self.title, detail),
            _ => self.title.clone(),
        }
    }
}

/// Submission result, normalized from either a transaction record or a
/// `transaction_failed` problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub successful: bool,
    pub hash: Option<String>,
    pub result_code: Option<String>,
    pub operation_codes: Vec<String>,
}

impl SubmitResponse {
    pub fn accepted(hash: impl Into<String>) -> Self {
        Self {
            successful: true,
            hash: Some(hash.into()),
            result_code: None,
            operation_codes: Vec::new(),
        }
    }

    pub fn rejected(result_code: impl Into<String>, operation_codes: Vec<String>) -> Self {
        Self {
            successful: false,
            hash: None,
            result_code: Some(result_code.into()),
            operation_codes,
        }
    }
}

impl From<TransactionRecord> for SubmitResponse {
    fn from(record: TransactionRecord) -> Self {
        Self {
            successful: record.successful,
            hash: Some(record.hash),
            result_code: None,
            operation_codes: Vec::new(),
        }
    }
}

/// Paged collection wrapper (`_embedded.records`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "_embedded")]
    pub embedded: Embedded<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embedded<T> {
    pub records: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            embedded: Embedded { records },
        }
    }

    pub fn into_records(self) -> Vec<T> {
        self.embedded.records
    }
}

/// One entry of `GET /accounts/{id}/payments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_balance: Option<String>,
}

impl OperationRecord {
    pub fn payment(
        id: impl Into<String>,
        created_at: impl Into<String>,
        from: &PublicKey,
        to: &PublicKey,
        asset: &AssetDescriptor,
        amount: Amount,
    ) -> Self {
        let (asset_type, asset_code, asset_issuer) = match asset {
            AssetDescriptor::Native => (ASSET_TYPE_NATIVE, None, None),
            AssetDescriptor::Credit { code, issuer } => (
                if code.as_str().len() <= 4 {
                    ASSET_TYPE_ALPHANUM4
                } else {
                    ASSET_TYPE_ALPHANUM12
                },
                Some(code.to_string()),
                Some(issuer.encode()),
            ),
        };
        Self {
            id: id.into(),
            kind: "payment".to_string(),
            created_at: created_at.into(),
            from: Some(from.encode()),
            to: Some(to.encode()),
            amount: Some(amount.to_string()),
            asset_type: Some(asset_type.to_string()),
            asset_code,
            asset_issuer,
            funder: None,
            account: None,
            starting_balance: None,
        }
    }

    pub fn to_payment_record(&self) -> Result<PaymentRecord, ValidationError> {
        match self.kind.as_str() {
            "payment" => {
                let asset = match required(&self.asset_type, "asset_type")? {
                    ASSET_TYPE_NATIVE => AssetDescriptor::Native,
                    _ => AssetDescriptor::Credit {
                        code: AssetCode::parse(required(&self.asset_code, "asset_code")?)?,
                        issuer: PublicKey::parse(required(&self.asset_issuer, "asset_issuer")?)?,
                    },
                };
                Ok(PaymentRecord::Payment {
                    id: self.id.clone(),
                    created_at: self.created_at.clone(),
                    from: PublicKey::parse(required(&self.from, "from")?)?,
                    to: PublicKey::parse(required(&self.to, "to")?)?,
                    asset,
                    amount: Amount::parse(required(&self.amount, "amount")?)?,
                })
            }
            "create_account" => Ok(PaymentRecord::CreateAccount {
                id: self.id.clone(),
                created_at: self.created_at.clone(),
                funder: PublicKey::parse(required(&self.funder, "funder")?)?,
                account: PublicKey::parse(required(&self.account, "account")?)?,
                starting_balance: Amount::parse(required(
                    &self.starting_balance,
                    "starting_balance",
                )?)?,
            }),
            other => Ok(PaymentRecord::Other {
                id: self.id.clone(),
                kind: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stellarpay_types::{Amount, AssetCode, Balance, PaymentRecord, PublicKey};

    use super::{AccountRecord, OperationRecord, Page, Problem};

    #[test]
    fn account_json_maps_to_snapshot() {
        let issuer = PublicKey::from_raw([9; 32]);
        let account = PublicKey::from_raw([1; 32]);
        let body = json!({
            "id": account.to_string(),
            "account_id": account.to_string(),
            "sequence": "4294967296",
            "subentry_count": 1,
            "balances": [
                {
                    "balance": "12.5000000",
                    "limit": "922337203685.4775807",
                    "asset_type": "credit_alphanum4",
                    "asset_code": "USDC",
                    "asset_issuer": issuer.to_string()
                },
                { "balance": "50.0000000", "asset_type": "native" }
            ]
        });
        let record: AccountRecord = serde_json::from_value(body).unwrap();
        let snapshot = record.to_snapshot().unwrap();
        assert_eq!(snapshot.public_key, account);
        assert_eq!(snapshot.sequence, 4_294_967_296);
        assert_eq!(
            snapshot.balances[0],
            Balance::Credit {
                code: AssetCode::parse("USDC").unwrap(),
                issuer,
                amount: Amount::parse("12.5").unwrap(),
            }
        );
        assert_eq!(snapshot.balances[1].amount(), Amount::parse("50").unwrap());
    }

    #[test]
    fn problem_exposes_result_codes_and_message() {
        let body = json!({
            "type": "https://stellar.org/horizon-errors/transaction_failed",
            "title": "Transaction Failed",
            "status": 400,
            "detail": "The transaction failed when submitted to the stellar network.",
            "extras": {
                "envelope_xdr": "AAAA",
                "result_codes": { "transaction": "tx_failed", "operations": ["op_no_trust"] }
            }
        });
        let problem: Problem = serde_json::from_value(body).unwrap();
        let codes = problem.result_codes().expect("result codes present");
        assert_eq!(codes.transaction, "tx_failed");
        assert_eq!(codes.operations, vec!["op_no_trust".to_string()]);
        assert_eq!(
            problem.message(),
            "Transaction Failed - The transaction failed when submitted to the stellar network."
        );
    }

    #[test]
    fn malformed_problem_has_no_result_codes() {
        let body = json!({
            "type": "https://stellar.org/horizon-errors/transaction_malformed",
            "title": "Transaction Malformed",
            "status": 400,
            "detail": "Horizon could not decode the transaction envelope in this request.",
            "extras": { "envelope_xdr": "AAAA" }
        });
        let problem: Problem = serde_json::from_value(body).unwrap();
        assert!(problem.result_codes().is_none());
        assert_eq!(problem.kind_slug(), "transaction_malformed");
        assert_eq!(
            Problem::transaction_malformed("bad envelope").kind_slug(),
            "transaction_malformed"
        );
        assert_eq!(Problem::not_found().kind_slug(), "not_found");
    }

    #[test]
    fn payments_page_maps_known_and_unknown_operations() {
        let funder = PublicKey::from_raw([1; 32]);
        let account = PublicKey::from_raw([2; 32]);
        let body = json!({
            "_links": {},
            "_embedded": { "records": [
                {
                    "id": "3",
                    "type": "payment",
                    "created_at": "2024-01-01T00:00:00Z",
                    "from": funder.to_string(),
                    "to": account.to_string(),
                    "asset_type": "native",
                    "amount": "10.0000000"
                },
                {
                    "id": "2",
                    "type": "create_account",
                    "created_at": "2023-12-31T00:00:00Z",
                    "funder": funder.to_string(),
                    "account": account.to_string(),
                    "starting_balance": "10000.0000000"
                },
                { "id": "1", "type": "path_payment_strict_send" }
            ]}
        });
        let page: Page<OperationRecord> = serde_json::from_value(body).unwrap();
        let records = page
            .into_records()
            .iter()
            .map(OperationRecord::to_payment_record)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert!(matches!(records[0], PaymentRecord::Payment { .. }));
        assert!(matches!(
            &records[1],
            PaymentRecord::CreateAccount { starting_balance, .. }
                if *starting_balance == Amount::parse("10000").unwrap()
        ));
        assert_eq!(
            records[2],
            PaymentRecord::Other {
                id: "1".to_string(),
                kind: "path_payment_strict_send".to_string(),
            }
        );
    }
}
