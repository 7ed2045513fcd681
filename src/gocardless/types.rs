//! Types for the GoCardless Bank Account Data API

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Access status of a linked bank account.
///
/// Unknown statuses deserialize into `Other` so a new status on the API side
/// does not break the whole fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Discovered,
    Processing,
    Ready,
    Error,
    Expired,
    Suspended,
    #[serde(other)]
    Other,
}

impl AccountStatus {
    /// Accounts whose consent lapsed or was revoked can no longer be read.
    pub fn is_inactive(&self) -> bool {
        matches!(self, AccountStatus::Expired | AccountStatus::Suspended)
    }
}

/// Account metadata as returned by `GET /api/v2/accounts/{id}/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountMetadata {
    pub id: String,
    #[serde(default)]
    pub iban: Option<String>,
    #[serde(default)]
    pub institution_id: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    pub status: AccountStatus,
}

/// Amount and currency of a single bank transaction, amount as a decimal string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionAmount {
    pub amount: String,
    pub currency: String,
}

/// A single transaction as reported by the bank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTransaction {
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub internal_transaction_id: Option<String>,
    #[serde(default)]
    pub booking_date: Option<String>,
    #[serde(default)]
    pub value_date: Option<String>,
    pub transaction_amount: TransactionAmount,
    #[serde(default)]
    pub creditor_name: Option<String>,
    #[serde(default)]
    pub debtor_name: Option<String>,
    #[serde(default)]
    pub remittance_information_unstructured: Option<String>,
    #[serde(default)]
    pub additional_information: Option<String>,
}

impl Default for TransactionAmount {
    fn default() -> Self {
        Self {
            amount: "0".to_string(),
            currency: String::new(),
        }
    }
}

/// Booked and pending transactions of one account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BankTransactions {
    #[serde(default)]
    pub booked: Vec<SourceTransaction>,
    #[serde(default)]
    pub pending: Vec<SourceTransaction>,
}

/// Envelope of `GET /api/v2/accounts/{id}/transactions/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountTransactionsResponse {
    pub transactions: BankTransactions,
}

/// Body of `POST /api/v2/token/new/`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPairRequest<'a> {
    pub secret_id: &'a str,
    pub secret_key: &'a str,
}

/// Token pair issued by the API. `access_expires` is a lifetime in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    pub access_expires: i64,
    #[serde(default)]
    pub refresh_expires: Option<i64>,
}

/// Inclusive date window for transaction queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl DateRange {
    /// Window of `days` days ending on (and including) `today`.
    pub fn lookback(today: NaiveDate, days: u64) -> Self {
        Self {
            date_from: today - chrono::Days::new(days),
            date_to: today,
        }
    }

    /// Query parameters in the `YYYY-MM-DD` form the API expects.
    pub fn as_query(&self) -> [(&'static str, String); 2] {
        [
            ("date_from", self.date_from.format("%Y-%m-%d").to_string()),
            ("date_to", self.date_to.format("%Y-%m-%d").to_string()),
        ]
    }
}

/// Error types for GoCardless API operations
#[derive(Debug, thiserror::Error)]
pub enum GoCardlessError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Access token rejected")]
    Unauthorized,

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Token lifetime out of range: {0} seconds")]
    InvalidExpiry(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_bank_transactions_with_missing_pending() {
        let json = r#"{
            "transactions": {
                "booked": [{
                    "transactionId": "4881314565",
                    "bookingDate": "2024-10-12",
                    "valueDate": "2024-10-12",
                    "transactionAmount": {"amount": "-1368.00", "currency": "HUF"},
                    "creditorName": "SPAR",
                    "remittanceInformationUnstructured": "card purchase"
                }]
            }
        }"#;

        let response: AccountTransactionsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.transactions.booked.len(), 1);
        assert!(response.transactions.pending.is_empty());

        let tx = &response.transactions.booked[0];
        assert_eq!(tx.transaction_id.as_deref(), Some("4881314565"));
        assert_eq!(tx.transaction_amount.amount, "-1368.00");
        assert_eq!(tx.debtor_name, None);
    }

    #[test]
    fn unknown_account_status_is_tolerated() {
        let json = r#"{"id": "acc-1", "iban": "HU03", "status": "SOMETHING_NEW"}"#;
        let account: AccountMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(account.status, AccountStatus::Other);
        assert!(!account.status.is_inactive());

        let json = r#"{"id": "acc-2", "status": "SUSPENDED"}"#;
        let account: AccountMetadata = serde_json::from_str(json).unwrap();
        assert!(account.status.is_inactive());
        assert_eq!(account.iban, None);
    }

    #[test]
    fn lookback_window_is_inclusive_of_today() {
        let today = NaiveDate::from_ymd_opt(2024, 10, 15).unwrap();
        let range = DateRange::lookback(today, 14);
        assert_eq!(range.date_from, NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
        assert_eq!(
            range.as_query(),
            [
                ("date_from", "2024-10-01".to_string()),
                ("date_to", "2024-10-15".to_string())
            ]
        );
    }
}
