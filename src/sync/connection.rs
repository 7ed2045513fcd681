//! Connection documents and the store they are loaded from.
//!
//! A connection ties one GoCardless requisition (the consented bank accounts) to one YNAB
//! budget, together with the payee-extraction policy for that bank.

use crate::sync::types::SyncError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Where the payee of a transaction is taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PayeeSource {
	/// Sanitized free-text remittance information.
	Unstructured,
	/// Debtor or creditor name, depending on the direction of the money.
	Name,
	/// The bank's free-form additional information field.
	Additional,
	/// Kept verbatim so the mapper can report it.
	Unrecognized(String),
}

impl From<String> for PayeeSource {
	fn from(value: String) -> Self {
		match value.as_str() {
			"unstructured" => PayeeSource::Unstructured,
			"name" => PayeeSource::Name,
			"additional" => PayeeSource::Additional,
			_ => PayeeSource::Unrecognized(value),
		}
	}
}

impl From<PayeeSource> for String {
	fn from(source: PayeeSource) -> Self {
		match source {
			PayeeSource::Unstructured => "unstructured".to_string(),
			PayeeSource::Name => "name".to_string(),
			PayeeSource::Additional => "additional".to_string(),
			PayeeSource::Unrecognized(value) => value,
		}
	}
}

fn default_payee_source() -> Vec<PayeeSource> {
	vec![
		PayeeSource::Name,
		PayeeSource::Unstructured,
		PayeeSource::Additional,
	]
}

/// Per-connection payee policy. `payee_source` is in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
	#[serde(default = "default_payee_source")]
	pub payee_source: Vec<PayeeSource>,
	#[serde(default)]
	pub payee_strip: Vec<String>,
}

impl Default for ConnectionConfig {
	fn default() -> Self {
		Self {
			payee_source: default_payee_source(),
			payee_strip: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requisition {
	#[serde(default)]
	pub id: String,
	#[serde(default)]
	pub accounts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConnection {
	#[serde(default)]
	pub id: String,
}

/// Target budget and the IBAN → ledger account id map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConnection {
	pub budget_id: String,
	#[serde(default)]
	pub account_map: HashMap<String, String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YnabAuth {
	pub access_token: String,
	#[serde(rename = "refresh_token", default)]
	pub refresh_token: Option<String>,
	#[serde(rename = "expires_at", default)]
	pub expires_at: Option<i64>,
}

impl fmt::Debug for YnabAuth {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("YnabAuth")
			.field("expires_at", &self.expires_at)
			.finish_non_exhaustive()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionAuth {
	pub ynab: YnabAuth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
	pub id: String,
	#[serde(default)]
	pub user_id: String,
	#[serde(default)]
	pub requisition: Requisition,
	#[serde(default)]
	pub config: ConnectionConfig,
	#[serde(default)]
	pub source: SourceConnection,
	pub target: TargetConnection,
	#[serde(default)]
	pub auth: Option<ConnectionAuth>,
}

impl Connection {
	/// Ledger account id for an IBAN, if the budget has one.
	pub fn ledger_account_for(&self, iban: &str) -> Option<&str> {
		self.target
			.account_map
			.get(iban)
			.map(String::as_str)
			.filter(|id| !id.is_empty())
	}

	/// Connection-scoped ledger token, if the user authorized one.
	pub fn ynab_access_token(&self) -> Option<&str> {
		self.auth
			.as_ref()
			.map(|auth| auth.ynab.access_token.as_str())
			.filter(|token| !token.is_empty())
	}
}

/// Lookup of connection documents.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
	async fn find_one(&self, id: &str) -> Result<Option<Connection>, SyncError>;
}

/// Store backed by a JSON file holding an array of connections.
pub struct FileConnectionStore {
	path: PathBuf,
}

impl FileConnectionStore {
	pub fn new(path: PathBuf) -> Self {
		Self { path }
	}
}

#[async_trait]
impl ConnectionStore for FileConnectionStore {
	async fn find_one(&self, id: &str) -> Result<Option<Connection>, SyncError> {
		let content = tokio::fs::read_to_string(&self.path).await?;
		let connections: Vec<Connection> = serde_json::from_str(&content).map_err(|e| {
			SyncError::Store(format!("Failed to parse {}: {}", self.path.display(), e))
		})?;

		debug!(
			"Loaded {} connections from {:?}",
			connections.len(),
			self.path
		);

		Ok(connections.into_iter().find(|c| c.id == id))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	const CONNECTIONS: &str = r#"[
		{
			"id": "conn-1",
			"userId": "user-1",
			"requisition": {"id": "req-1", "accounts": ["acc-1", "acc-2"]},
			"config": {"payeeSource": ["unstructured", "name", "iban"], "payeeStrip": ["KFT."]},
			"source": {"id": "req-1"},
			"target": {"budgetId": "budget-1", "accountMap": {"HU03": "ynab-1", "HU04": ""}},
			"auth": {"ynab": {"accessToken": "tok", "expires_at": 1}}
		},
		{
			"id": "conn-2",
			"target": {"budgetId": "budget-2"}
		}
	]"#;

	#[tokio::test]
	async fn finds_connection_by_id() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("connections.json");
		std::fs::write(&path, CONNECTIONS).unwrap();
		let store = FileConnectionStore::new(path);

		let connection = store.find_one("conn-1").await.unwrap().unwrap();
		assert_eq!(connection.requisition.accounts, vec!["acc-1", "acc-2"]);
		assert_eq!(
			connection.config.payee_source,
			vec![
				PayeeSource::Unstructured,
				PayeeSource::Name,
				PayeeSource::Unrecognized("iban".to_string())
			]
		);
		assert_eq!(connection.ledger_account_for("HU03"), Some("ynab-1"));
		assert_eq!(connection.ledger_account_for("HU04"), None);
		assert_eq!(connection.ledger_account_for("HU05"), None);
		assert_eq!(connection.ynab_access_token(), Some("tok"));

		assert!(store.find_one("missing").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn applies_defaults_for_sparse_documents() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("connections.json");
		std::fs::write(&path, CONNECTIONS).unwrap();
		let store = FileConnectionStore::new(path);

		let connection = store.find_one("conn-2").await.unwrap().unwrap();
		assert_eq!(connection.config, ConnectionConfig::default());
		assert!(connection.requisition.accounts.is_empty());
		assert_eq!(connection.ynab_access_token(), None);
	}

	#[tokio::test]
	async fn reports_malformed_store() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("connections.json");
		std::fs::write(&path, "{not json").unwrap();

		let err = FileConnectionStore::new(path).find_one("conn-1").await.unwrap_err();
		assert!(matches!(err, SyncError::Store(_)));
	}

	#[test]
	fn payee_source_round_trips_through_strings() {
		let json = serde_json::to_string(&vec![PayeeSource::Name, PayeeSource::Unrecognized("x".into())]).unwrap();
		assert_eq!(json, r#"["name","x"]"#);
	}
}
