use crate::gocardless::GoCardlessError;
use crate::ynab::YnabError;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A bank account as seen by the sync. `iban` joins it to the ledger account map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
	pub id: String,
	pub name: String,
	pub iban: String,
}

/// An amount in milli-units (value × 1000) of `currency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
	pub milli_units: i64,
	pub currency: String,
}

/// Settlement state reported by the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionState {
	Booked,
	Pending,
}

impl TransactionState {
	pub fn as_str(&self) -> &'static str {
		match self {
			TransactionState::Booked => "booked",
			TransactionState::Pending => "pending",
		}
	}
}

impl fmt::Display for TransactionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Normalized transaction, the unit of synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	pub account: Account,
	/// Never empty.
	pub id: String,
	pub date: NaiveDate,
	pub payee: String,
	pub memo: String,
	pub amount: Money,
	pub state: TransactionState,
}

/// Error types for the sync pipeline
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("Failed to parse amount {amount:?} of transaction {transaction_id}")]
	AmountParse {
		transaction_id: String,
		amount: String,
	},

	#[error("Failed to parse date of transaction {transaction_id}")]
	DateParse { transaction_id: String },

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("Source API error: {0}")]
	Source(#[from] GoCardlessError),

	#[error("Ledger API error: {0}")]
	Ledger(#[from] YnabError),

	#[error("Connection store error: {0}")]
	Store(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}
