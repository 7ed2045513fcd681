//! Sync orchestrator and integration point for one connection.
//!
//! This module defines the `SyncOrchestrator`, which runs a single connection through the
//! pipeline `Idle → TokenReady → Fetched → Written` (or `Failed`):
//! - loads the connection from the `ConnectionStore`
//! - obtains a source API token from the `TokenManager`
//! - fetches and maps transactions through the `TransactionMapper`, refreshing the token and
//!   retrying exactly once when the first fetch failed because the token expired
//! - hands the batch to the `LedgerWriter`; a failed write is logged and not retried
//!
//! Every invocation returns a `SyncReport` describing how far the run got.

use crate::gocardless::{GoCardlessError, SourceApi, TokenManager};
use crate::sync::connection::{Connection, ConnectionStore};
use crate::sync::mapper::TransactionMapper;
use crate::sync::types::{SyncError, Transaction};
use crate::sync::writer::LedgerWriter;
use crate::utils::format_milli_units;
use crate::ynab::LedgerApi;

use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Builds the ledger client for a connection (its own OAuth token or the service token).
pub type LedgerFactory<L> = Arc<dyn Fn(&Connection) -> Result<Arc<L>, SyncError> + Send + Sync>;

/// Pipeline position of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
	Idle,
	TokenReady,
	Fetched,
	Written,
	Failed,
}

impl fmt::Display for SyncState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			SyncState::Idle => "idle",
			SyncState::TokenReady => "token-ready",
			SyncState::Fetched => "fetched",
			SyncState::Written => "written",
			SyncState::Failed => "failed",
		};
		f.write_str(name)
	}
}

/// Outcome of one sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
	pub connection_id: String,
	pub state: SyncState,
	pub fetched: usize,
	pub submitted: usize,
	pub skipped: usize,
	pub created: usize,
	pub duplicates: usize,
	pub fetch_attempts: usize,
	pub write_error: Option<String>,
}

impl SyncReport {
	fn new(connection_id: &str) -> Self {
		Self {
			connection_id: connection_id.to_string(),
			state: SyncState::Idle,
			fetched: 0,
			submitted: 0,
			skipped: 0,
			created: 0,
			duplicates: 0,
			fetch_attempts: 0,
			write_error: None,
		}
	}

	fn transition(&mut self, state: SyncState) {
		info!(
			connection_id = %self.connection_id,
			from = %self.state,
			to = %state,
			"Sync state changed"
		);
		self.state = state;
	}

	/// Get a human-readable summary of the run
	pub fn summary(&self) -> String {
		format!(
			"Connection {} {}: {} fetched, {} submitted, {} skipped, {} created, {} duplicates{}",
			self.connection_id,
			self.state,
			self.fetched,
			self.submitted,
			self.skipped,
			self.created,
			self.duplicates,
			match &self.write_error {
				Some(e) => format!(" (write failed: {})", e),
				None => String::new(),
			}
		)
	}
}

pub struct SyncOrchestrator<S: SourceApi, C: ConnectionStore, L: LedgerApi> {
	store: Arc<C>,
	source_api: Arc<S>,
	token_manager: Arc<TokenManager<S>>,
	ledger_factory: LedgerFactory<L>,
	today: Option<NaiveDate>,
}

impl<S: SourceApi, C: ConnectionStore, L: LedgerApi> SyncOrchestrator<S, C, L> {
	pub fn new(
		store: Arc<C>,
		source_api: Arc<S>,
		token_manager: Arc<TokenManager<S>>,
		ledger_factory: LedgerFactory<L>,
	) -> Self {
		Self {
			store,
			source_api,
			token_manager,
			ledger_factory,
			today: None,
		}
	}

	/// Pin "today" for the look-back window and the future-date filter.
	#[cfg(test)]
	pub fn with_today(mut self, today: NaiveDate) -> Self {
		self.today = Some(today);
		self
	}

	/// Sync one connection. Returns `None` when the connection does not exist.
	///
	/// Token and fetch failures propagate. Write failures are recorded in the report.
	pub async fn sync(&self, connection_id: &str) -> Result<Option<SyncReport>, SyncError> {
		let Some(connection) = self.store.find_one(connection_id).await? else {
			warn!(connection_id, "Connection not found, nothing to sync");
			return Ok(None);
		};
		let connection = Arc::new(connection);
		let mut report = SyncReport::new(connection_id);

		match self.fetch(&connection, &mut report).await {
			Ok(transactions) => {
				report.fetched = transactions.len();
				report.transition(SyncState::Fetched);
				self.write(&connection, &transactions, &mut report).await?;
			}
			Err(e) => {
				report.transition(SyncState::Failed);
				error!(connection_id, error = %e, "Sync failed: {}", report.summary());
				return Err(e);
			}
		}

		Ok(Some(report))
	}

	async fn fetch(
		&self,
		connection: &Arc<Connection>,
		report: &mut SyncReport,
	) -> Result<Vec<Transaction>, SyncError> {
		let token = self.token_manager.get_auth_token().await?;
		report.transition(SyncState::TokenReady);

		let mut mapper = TransactionMapper::new(connection.clone(), self.source_api.clone());
		if let Some(today) = self.today {
			mapper = mapper.with_today(today);
		}

		report.fetch_attempts += 1;
		let first_error = match mapper.fetch_transactions(&token).await {
			Ok(transactions) => return Ok(transactions),
			Err(e) => e,
		};

		let rejected = matches!(first_error, SyncError::Source(GoCardlessError::Unauthorized));
		if !rejected && !self.token_manager.is_access_expired() {
			return Err(first_error);
		}

		warn!(
			connection_id = %connection.id,
			error = %first_error,
			"Fetch failed with an expired token, refreshing and retrying once"
		);
		let tokens = self.token_manager.refresh_auth_token().await?;

		report.fetch_attempts += 1;
		mapper.fetch_transactions(&tokens.access).await
	}

	async fn write(
		&self,
		connection: &Arc<Connection>,
		transactions: &[Transaction],
		report: &mut SyncReport,
	) -> Result<(), SyncError> {
		let ledger = (self.ledger_factory)(connection.as_ref())?;
		let mut writer = LedgerWriter::new(connection.clone(), ledger);
		if let Some(today) = self.today {
			writer = writer.with_today(today);
		}

		let total = transactions
			.iter()
			.fold(0i64, |acc, t| acc.saturating_add(t.amount.milli_units));
		info!(
			connection_id = %connection.id,
			count = transactions.len(),
			net = %format_milli_units(total),
			"Writing transactions"
		);

		match writer.bulk_write(transactions).await {
			Ok(outcome) => {
				report.submitted = outcome.submitted;
				report.skipped = outcome.skipped;
				report.created = outcome.response.data.transaction_ids.len();
				report.duplicates = outcome.response.data.duplicate_import_ids.len();
				if report.duplicates > 0 {
					info!(
						connection_id = %connection.id,
						duplicates = report.duplicates,
						"Ledger already had some transactions"
					);
				}
				report.transition(SyncState::Written);
			}
			Err(e) => {
				error!(connection_id = %connection.id, error = %e, "Failed to write transactions");
				report.write_error = Some(e.to_string());
				report.transition(SyncState::Failed);
			}
		}

		Ok(())
	}
}
