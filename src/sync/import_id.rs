use crate::sync::types::Transaction;
use sha2::{Digest, Sha256};

/// Namespace prefix of every import id this service produces.
pub const IMPORT_ID_PREFIX: &str = "YBBRTZ:";
/// Field length limit of the ledger's `import_id`.
pub const IMPORT_ID_LENGTH: usize = 32;

/// Derive the ledger idempotency key of a transaction.
///
/// The hash input and the truncation point must never change: already imported
/// transactions are only recognized as duplicates if they hash to the same id.
pub fn get_import_id(transaction: &Transaction) -> String {
	let mut hasher = Sha256::new();
	hasher.update(transaction.account.iban.as_bytes());
	hasher.update(transaction.id.as_bytes());
	hasher.update(transaction.date.format("%Y-%m-%d").to_string().as_bytes());
	hasher.update(transaction.amount.milli_units.to_string().as_bytes());
	hasher.update(transaction.state.as_str().as_bytes());

	let mut import_id = format!("{}{}", IMPORT_ID_PREFIX, hex::encode(hasher.finalize()));
	import_id.truncate(IMPORT_ID_LENGTH);
	import_id
}
