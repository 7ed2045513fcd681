//! Ledger writer: validation, mapping and bulk submission of transactions to YNAB.

use crate::sync::connection::Connection;
use crate::sync::import_id::get_import_id;
use crate::sync::payee::collapse_whitespace;
use crate::sync::types::{SyncError, Transaction, TransactionState};
use crate::ynab::{
	ClearedStatus, LedgerApi, NewTransaction, SaveTransactionsResponse, SaveTransactionsWrapper,
};

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};

pub const MEMO_MAX_LENGTH: usize = 500;
pub const PAYEE_NAME_MAX_LENGTH: usize = 200;
pub const PENDING_PREFIX: &str = "PENDING ";

fn truncate_chars(value: &str, max: usize) -> String {
	value.chars().take(max).collect()
}

/// Result of one `bulk_write`: how many transactions were sent, how many were filtered out,
/// and the ledger's reply.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
	pub submitted: usize,
	pub skipped: usize,
	pub response: SaveTransactionsResponse,
}

pub struct LedgerWriter<L: LedgerApi> {
	connection: Arc<Connection>,
	api: Arc<L>,
	today: Option<NaiveDate>,
}

impl<L: LedgerApi> LedgerWriter<L> {
	pub fn new(connection: Arc<Connection>, api: Arc<L>) -> Self {
		Self {
			connection,
			api,
			today: None,
		}
	}

	/// Pin "today" for the future-date check instead of using the current UTC date.
	pub fn with_today(mut self, today: NaiveDate) -> Self {
		self.today = Some(today);
		self
	}

	fn today(&self) -> NaiveDate {
		self.today.unwrap_or_else(|| Utc::now().date_naive())
	}

	/// The ledger refuses future-dated imports and transactions for accounts it does not
	/// have. Rejections are logged, never raised.
	pub fn is_valid_transaction(&self, transaction: &Transaction) -> bool {
		if transaction.date > self.today() {
			warn!(
				transaction_id = %transaction.id,
				date = %transaction.date,
				"Skipping future transaction"
			);
			return false;
		}

		if self
			.connection
			.ledger_account_for(&transaction.account.iban)
			.is_none()
		{
			warn!(
				transaction_id = %transaction.id,
				iban = %transaction.account.iban,
				"Skipping transaction with unknown account"
			);
			return false;
		}

		true
	}

	/// Convert to the ledger's shape. Callers must have validated the transaction first;
	/// an unmapped account yields an empty `account_id`.
	pub fn map_transaction_to_writer_transaction(&self, transaction: &Transaction) -> NewTransaction {
		let (prefix, cleared) = match transaction.state {
			TransactionState::Pending => (PENDING_PREFIX, ClearedStatus::Uncleared),
			TransactionState::Booked => ("", ClearedStatus::Cleared),
		};

		let memo = truncate_chars(
			&collapse_whitespace(&transaction.memo),
			MEMO_MAX_LENGTH - prefix.len(),
		);

		NewTransaction {
			account_id: self
				.connection
				.ledger_account_for(&transaction.account.iban)
				.unwrap_or_default()
				.to_string(),
			date: transaction.date.format("%Y-%m-%d").to_string(),
			memo: format!("{}{}", prefix, memo),
			payee_name: truncate_chars(
				&collapse_whitespace(&transaction.payee),
				PAYEE_NAME_MAX_LENGTH,
			),
			cleared,
			approved: false,
			amount: transaction.amount.milli_units,
			import_id: get_import_id(transaction),
		}
	}

	fn prepare_batch(&self, transactions: &[Transaction]) -> SaveTransactionsWrapper {
		SaveTransactionsWrapper {
			transactions: transactions
				.iter()
				.filter(|tx| self.is_valid_transaction(tx))
				.map(|tx| self.map_transaction_to_writer_transaction(tx))
				.collect(),
		}
	}

	/// Validate, map and submit a batch in a single ledger call.
	///
	/// An empty batch is not sent; the outcome then carries an empty response.
	pub async fn bulk_write(&self, transactions: &[Transaction]) -> Result<WriteOutcome, SyncError> {
		let body = self.prepare_batch(transactions);
		let submitted = body.transactions.len();
		let skipped = transactions.len() - submitted;

		if submitted == 0 {
			info!(skipped, "No valid transactions to write");
			return Ok(WriteOutcome {
				submitted,
				skipped,
				response: SaveTransactionsResponse::default(),
			});
		}

		let response = self
			.api
			.create_transactions(&self.connection.target.budget_id, &body)
			.await?;

		info!(
			budget_id = %self.connection.target.budget_id,
			submitted,
			created = response.data.transaction_ids.len(),
			duplicates = response.data.duplicate_import_ids.len(),
			skipped,
			"Wrote transactions to YNAB"
		);

		Ok(WriteOutcome {
			submitted,
			skipped,
			response,
		})
	}
}
