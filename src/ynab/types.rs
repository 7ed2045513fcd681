//! Types for the YNAB transactions API

use serde::{Deserialize, Serialize};

/// Cleared status of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearedStatus {
    Cleared,
    Uncleared,
    Reconciled,
}

/// A transaction in the form the ledger accepts for bulk creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub account_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub memo: String,
    pub payee_name: String,
    pub cleared: ClearedStatus,
    pub approved: bool,
    /// Milli-units of the account currency.
    pub amount: i64,
    pub import_id: String,
}

/// Request body of `POST /budgets/{budget_id}/transactions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveTransactionsWrapper {
    pub transactions: Vec<NewTransaction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveTransactionsData {
    #[serde(default)]
    pub transaction_ids: Vec<String>,
    /// Import ids the ledger already knew about and therefore ignored.
    #[serde(default)]
    pub duplicate_import_ids: Vec<String>,
    #[serde(default)]
    pub server_knowledge: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveTransactionsResponse {
    pub data: SaveTransactionsData,
}

/// Error types for ledger API operations
#[derive(Debug, thiserror::Error)]
pub enum YnabError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
