//! MockLedger: in-memory accounts, trustlines and payment history with
//! Horizon-shaped responses.
//!
//! Submissions are checked in the order the network applies them. Envelope
//! level failures leave the ledger untouched; a `tx_failed` result still
//! consumes the sequence number and charges the fee.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat};
use stellarpay_types::{Amount, AssetCode, AssetDescriptor, Network, PublicKey};
use stellarpay_wire::{
    AccountRecord, BalanceLine, OperationRecord, PaymentView, Problem, SignedEnvelope,
    TransactionRecord,
};
use tracing::debug;

/// Funder recorded for accounts created with [`MockLedger::fund_account`].
pub const FRIENDBOT: PublicKey = PublicKey::from_raw([0xfb; 32]);

pub const DEFAULT_BASE_FEE: u32 = 100;
pub const DEFAULT_CLOSE_TIME: u64 = 1_700_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trustline {
    pub code: AssetCode,
    pub issuer: PublicKey,
    pub balance: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAccount {
    pub sequence: i64,
    pub native: Amount,
    pub trustlines: Vec<Trustline>,
}

impl LedgerAccount {
    fn trustline(&self, code: &AssetCode, issuer: &PublicKey) -> Option<&Trustline> {
        self.trustlines
            .iter()
            .find(|line| &line.code == code && &line.issuer == issuer)
    }

    fn trustline_mut(&mut self, code: &AssetCode, issuer: &PublicKey) -> Option<&mut Trustline> {
        self.trustlines
            .iter_mut()
            .find(|line| &line.code == code && &line.issuer == issuer)
    }

    fn to_record(&self, key: &PublicKey) -> AccountRecord {
        let mut balances: Vec<BalanceLine> = self
            .trustlines
            .iter()
            .map(|line| BalanceLine::credit(&line.code, &line.issuer, line.balance))
            .collect();
        // Horizon lists the native balance last.
        balances.push(BalanceLine::native(self.native));
        AccountRecord {
            account_id: key.encode(),
            sequence: self.sequence.to_string(),
            balances,
        }
    }
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    participants: [PublicKey; 2],
    record: OperationRecord,
}

#[derive(Debug, Clone)]
pub struct MockLedger {
    network: Network,
    pub accounts: HashMap<PublicKey, LedgerAccount>,
    pub base_fee: u32,
    pub close_time: u64,
    pub ledger_sequence: u32,
    history: Vec<HistoryEntry>,
    next_operation_id: u64,
}

impl MockLedger {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            accounts: HashMap::new(),
            base_fee: DEFAULT_BASE_FEE,
            close_time: DEFAULT_CLOSE_TIME,
            ledger_sequence: 1,
            history: Vec::new(),
            next_operation_id: 1,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn set_close_time(&mut self, unix_secs: u64) {
        self.close_time = unix_secs;
    }

    /// Creates `key` with a native balance and records a `create_account` operation.
    pub fn fund_account(&mut self, key: PublicKey, native: Amount, sequence: i64) {
        self.accounts.insert(
            key,
            LedgerAccount {
                sequence,
                native,
                trustlines: Vec::new(),
            },
        );
        let id = self.next_id();
        let record = OperationRecord {
            id,
            kind: "create_account".to_string(),
            created_at: rfc3339(self.close_time),
            from: None,
            to: None,
            amount: None,
            asset_type: None,
            asset_code: None,
            asset_issuer: None,
            funder: Some(FRIENDBOT.encode()),
            account: Some(key.encode()),
            starting_balance: Some(native.to_string()),
        };
        self.history.push(HistoryEntry {
            participants: [FRIENDBOT, key],
            record,
        });
    }

    /// Adds or replaces a trustline. Returns `false` when the account does not exist.
    pub fn add_trustline(
        &mut self,
        key: &PublicKey,
        code: AssetCode,
        issuer: PublicKey,
        balance: Amount,
    ) -> bool {
        let Some(account) = self.accounts.get_mut(key) else {
            return false;
        };
        match account.trustline_mut(&code, &issuer) {
            Some(line) => line.balance = balance,
            None => account.trustlines.push(Trustline {
                code,
                issuer,
                balance,
            }),
        }
        true
    }

    pub fn account(&self, key: &PublicKey) -> Option<&LedgerAccount> {
        self.accounts.get(key)
    }

    pub fn balance_of(&self, key: &PublicKey, asset: &AssetDescriptor) -> Option<Amount> {
        let account = self.accounts.get(key)?;
        match asset {
            AssetDescriptor::Native => Some(account.native),
            AssetDescriptor::Credit { code, issuer } => {
                account.trustline(code, issuer).map(|line| line.balance)
            }
        }
    }

    /// `GET /accounts/{id}`.
    pub fn get_account(&self, key: &PublicKey) -> Result<AccountRecord, Problem> {
        self.accounts
            .get(key)
            .map(|account| account.to_record(key))
            .ok_or_else(Problem::not_found)
    }

    /// `GET /accounts/{id}/payments?order=desc&limit=N`.
    pub fn payments_for(
        &self,
        key: &PublicKey,
        limit: usize,
    ) -> Result<Vec<OperationRecord>, Problem> {
        if !self.accounts.contains_key(key) {
            return Err(Problem::not_found());
        }
        Ok(self
            .history
            .iter()
            .rev()
            .filter(|entry| entry.participants.contains(key))
            .take(limit)
            .map(|entry| entry.record.clone())
            .collect())
    }

    /// `POST /transactions` with a base64 signed envelope.
    pub fn submit(&mut self, envelope_xdr: &str) -> Result<TransactionRecord, Problem> {
        let signed = SignedEnvelope::from_xdr_base64(self.network, envelope_xdr)
            .map_err(|err| {
                Problem::transaction_malformed(format!(
                    "Horizon could not decode the transaction envelope in this request: {err}"
                ))
            })?;
        let hash = signed.hash().to_hex();
        let envelope = signed.envelope();
        let payment = match (envelope.operation_count(), envelope.payment()) {
            (1, Ok(payment)) => payment,
            _ => return Err(tx_problem(Some(&hash), "tx_malformed")),
        };

        let source = envelope.source();
        let Some(account) = self.accounts.get(&source) else {
            return Err(tx_problem(Some(&hash), "tx_no_source_account"));
        };
        if envelope.sequence() != account.sequence + 1 {
            return Err(tx_problem(Some(&hash), "tx_bad_seq"));
        }
        if let Some((min_time, max_time)) = envelope.time_bounds() {
            if self.close_time < min_time {
                return Err(tx_problem(Some(&hash), "tx_too_early"));
            }
            if max_time != 0 && self.close_time > max_time {
                return Err(tx_problem(Some(&hash), "tx_too_late"));
            }
        }
        let fee_charged = i64::from(self.base_fee);
        if i64::from(envelope.fee()) < fee_charged {
            return Err(tx_problem(Some(&hash), "tx_insufficient_fee"));
        }
        let op_source = payment.source.unwrap_or(source);
        if signed.verify_signer(&source).is_err() || signed.verify_signer(&op_source).is_err() {
            return Err(tx_problem(Some(&hash), "tx_bad_auth"));
        }
        if account.native.stroops() < fee_charged {
            return Err(tx_problem(Some(&hash), "tx_insufficient_balance"));
        }

        // Past this point the transaction is included in a ledger.
        self.ledger_sequence += 1;
        if let Some(account) = self.accounts.get_mut(&source) {
            account.sequence = envelope.sequence();
            account.native = Amount::from_stroops(account.native.stroops() - fee_charged)
                .unwrap_or(Amount::ZERO);
        }

        if let Err(op_code) = self.apply_payment(&op_source, &payment) {
            debug!(%hash, op_code, "payment operation failed");
            return Err(Problem::transaction_failed(
                Some(hash),
                "tx_failed",
                vec![op_code.to_string()],
            ));
        }

        let id = self.next_id();
        self.history.push(HistoryEntry {
            participants: [op_source, payment.destination],
            record: OperationRecord::payment(
                id,
                rfc3339(self.close_time),
                &op_source,
                &payment.destination,
                &payment.asset,
                payment.amount,
            ),
        });
        debug!(%hash, ledger = self.ledger_sequence, "transaction applied");
        Ok(TransactionRecord {
            hash,
            successful: true,
            ledger: Some(self.ledger_sequence),
        })
    }

    fn apply_payment(
        &mut self,
        from: &PublicKey,
        payment: &PaymentView,
    ) -> Result<(), &'static str> {
        if !self.accounts.contains_key(&payment.destination) {
            return Err("op_no_destination");
        }
        if payment.amount.stroops() <= 0 {
            return Err("op_malformed");
        }
        let sender = self.accounts.get(from).ok_or("op_src_no_trust")?;
        if from == &payment.destination {
            return Ok(());
        }
        match &payment.asset {
            AssetDescriptor::Native => {
                let remaining = sender
                    .native
                    .checked_sub(payment.amount)
                    .ok_or("op_underfunded")?;
                let receiver = &self.accounts[&payment.destination];
                let credited = receiver
                    .native
                    .checked_add(payment.amount)
                    .ok_or("op_line_full")?;
                self.set_native(from, remaining);
                self.set_native(&payment.destination, credited);
            }
            AssetDescriptor::Credit { code, issuer } => {
                let sent = sender
                    .trustline(code, issuer)
                    .ok_or("op_src_no_trust")?
                    .balance;
                let received = self.accounts[&payment.destination]
                    .trustline(code, issuer)
                    .ok_or("op_no_trust")?
                    .balance;
                let remaining = sent.checked_sub(payment.amount).ok_or("op_underfunded")?;
                let credited = received
                    .checked_add(payment.amount)
                    .ok_or("op_line_full")?;
                self.set_credit(from, code, issuer, remaining);
                self.set_credit(&payment.destination, code, issuer, credited);
            }
        }
        Ok(())
    }

    fn set_native(&mut self, key: &PublicKey, amount: Amount) {
        if let Some(account) = self.accounts.get_mut(key) {
            account.native = amount;
        }
    }

    fn set_credit(
        &mut self,
        key: &PublicKey,
        code: &AssetCode,
        issuer: &PublicKey,
        amount: Amount,
    ) {
        if let Some(line) = self
            .accounts
            .get_mut(key)
            .and_then(|account| account.trustline_mut(code, issuer))
        {
            line.balance = amount;
        }
    }

    fn next_id(&mut self) -> String {
        let id = self.next_operation_id;
        self.next_operation_id += 1;
        // Paging tokens are ledger-scoped; keep them increasing and numeric.
        format!("{}", (u64::from(self.ledger_sequence) << 32) | id)
    }
}

fn tx_problem(hash: Option<&str>, code: &str) -> Problem {
    Problem::transaction_failed(hash.map(str::to_string), code, Vec::new())
}

/// Formats unix seconds as `YYYY-MM-DDTHH:MM:SSZ`.
fn rfc3339(unix_secs: u64) -> String {
    i64::try_from(unix_secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}
