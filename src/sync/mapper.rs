//! Transaction extraction and normalization.
//!
//! `TransactionMapper` reads every active account of a connection's requisition from the
//! source API and converts the bank's transactions into internal `Transaction`s. Amount,
//! date and payee parsing live in free functions so they can be exercised without an API.

use crate::gocardless::{
	AccountMetadata, BankTransactions, DateRange, SourceApi, SourceTransaction,
};
use crate::sync::connection::Connection;
use crate::sync::payee::parse_payee;
use crate::sync::types::{Account, Money, SyncError, Transaction, TransactionState};

use chrono::{NaiveDate, Utc};
use futures::future::try_join_all;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

/// Days of history requested on every run, in addition to today.
pub const LOOKBACK_DAYS: u64 = 14;

static REMITTANCE_DATE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\d{4}\.\d{2}\.\d{2}").expect("valid remittance date pattern"));

fn transaction_label(transaction: &SourceTransaction) -> String {
	transaction
		.transaction_id
		.clone()
		.or_else(|| transaction.internal_transaction_id.clone())
		.unwrap_or_else(|| "<unknown>".to_string())
}

/// 2^63: the scaled amount must lie in `[-2^63, 2^63)` to fit `i64` exactly.
const MILLI_UNITS_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Parse the decimal amount string into milli-units.
///
/// Amounts that are not numeric, not finite, or do not fit `i64` once scaled are rejected.
pub fn parse_amount(transaction: &SourceTransaction) -> Result<Money, SyncError> {
	let raw = &transaction.transaction_amount.amount;
	let milli_units = raw
		.trim()
		.parse::<f64>()
		.ok()
		.map(|value| (value * 1000.0).round())
		.filter(|scaled| (-MILLI_UNITS_BOUND..MILLI_UNITS_BOUND).contains(scaled))
		.ok_or_else(|| SyncError::AmountParse {
			transaction_id: transaction_label(transaction),
			amount: raw.clone(),
		})?;

	Ok(Money {
		milli_units: milli_units as i64,
		currency: transaction.transaction_amount.currency.clone(),
	})
}

/// Earliest of the value date, booking date and a `YYYY.MM.DD` date found in the
/// remittance text. Candidates that are absent or unparseable are ignored.
pub fn parse_date(transaction: &SourceTransaction) -> Result<NaiveDate, SyncError> {
	let iso = |value: &Option<String>| {
		value
			.as_deref()
			.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
	};

	let remittance = transaction
		.remittance_information_unstructured
		.as_deref()
		.and_then(|text| REMITTANCE_DATE.find(text))
		.and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%Y.%m.%d").ok());

	[iso(&transaction.value_date), iso(&transaction.booking_date), remittance]
		.into_iter()
		.flatten()
		.min()
		.ok_or_else(|| SyncError::DateParse {
			transaction_id: transaction_label(transaction),
		})
}

/// Source id, then internal id, then a random id that will not dedup across runs.
pub fn resolve_transaction_id(transaction: &SourceTransaction) -> String {
	[
		&transaction.transaction_id,
		&transaction.internal_transaction_id,
	]
	.into_iter()
	.flatten()
	.find(|id| !id.is_empty())
	.cloned()
	.unwrap_or_else(|| {
		let id = uuid::Uuid::new_v4().to_string();
		warn!(generated_id = %id, "Transaction has no id, import will not be deduplicated");
		id
	})
}

fn resolve_memo(transaction: &SourceTransaction) -> String {
	[
		&transaction.remittance_information_unstructured,
		&transaction.additional_information,
	]
	.into_iter()
	.flatten()
	.find(|memo| !memo.is_empty())
	.cloned()
	.unwrap_or_default()
}

pub fn map_account(account: &AccountMetadata) -> Account {
	let iban = account.iban.clone().unwrap_or_default();
	Account {
		id: account.id.clone(),
		name: iban.clone(),
		iban,
	}
}

/// Reads and normalizes the transactions of one connection.
pub struct TransactionMapper<A: SourceApi> {
	connection: Arc<Connection>,
	api: Arc<A>,
	today: Option<NaiveDate>,
}

impl<A: SourceApi> TransactionMapper<A> {
	pub fn new(connection: Arc<Connection>, api: Arc<A>) -> Self {
		Self {
			connection,
			api,
			today: None,
		}
	}

	/// Pin the end of the look-back window instead of using the current UTC date.
	pub fn with_today(mut self, today: NaiveDate) -> Self {
		self.today = Some(today);
		self
	}

	pub fn map_source_transaction_to_internal(
		&self,
		account: &Account,
		source: &SourceTransaction,
		state: TransactionState,
	) -> Result<Transaction, SyncError> {
		let amount = parse_amount(source)?;
		let date = parse_date(source)?;
		let payee = parse_payee(source, &amount, &self.connection.config)?;

		Ok(Transaction {
			account: account.clone(),
			id: resolve_transaction_id(source),
			date,
			payee,
			memo: resolve_memo(source),
			amount,
			state,
		})
	}

	fn map_account_transactions(
		&self,
		account: &Account,
		transactions: &BankTransactions,
	) -> Result<Vec<Transaction>, SyncError> {
		let booked = transactions
			.booked
			.iter()
			.map(|tx| (tx, TransactionState::Booked));
		let pending = transactions
			.pending
			.iter()
			.map(|tx| (tx, TransactionState::Pending));

		booked
			.chain(pending)
			.map(|(tx, state)| self.map_source_transaction_to_internal(account, tx, state))
			.collect()
	}

	/// Fetch and map the transactions of every active account on the requisition.
	///
	/// Metadata and transaction requests are issued concurrently per account; the result
	/// keeps the requisition's account order. Any mapping failure aborts the whole fetch.
	pub async fn fetch_transactions(&self, access_token: &str) -> Result<Vec<Transaction>, SyncError> {
		let account_ids = &self.connection.requisition.accounts;

		let accounts = try_join_all(
			account_ids
				.iter()
				.map(|id| self.api.retrieve_account_metadata(access_token, id)),
		)
		.await?;

		let (inactive, active): (Vec<_>, Vec<_>) = accounts
			.into_iter()
			.partition(|account| account.status.is_inactive());

		for account in &inactive {
			warn!(
				account_id = %account.id,
				status = ?account.status,
				"Account is not accessible, skipping"
			);
		}

		let range = DateRange::lookback(
			self.today.unwrap_or_else(|| Utc::now().date_naive()),
			LOOKBACK_DAYS,
		);

		let per_account = try_join_all(active.iter().map(|account| async move {
			let transactions = self
				.api
				.retrieve_account_transactions(access_token, &account.id, range)
				.await?;
			debug!(
				account_id = %account.id,
				booked = transactions.booked.len(),
				pending = transactions.pending.len(),
				"Received account transactions"
			);
			Ok::<_, SyncError>((map_account(account), transactions))
		}))
		.await?;

		let mut mapped = Vec::new();
		for (account, transactions) in &per_account {
			mapped.extend(self.map_account_transactions(account, transactions)?);
		}

		info!(
			connection_id = %self.connection.id,
			accounts = active.len(),
			skipped_accounts = inactive.len(),
			transactions = mapped.len(),
			"Fetched transactions"
		);

		Ok(mapped)
	}
}
