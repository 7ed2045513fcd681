//! Payee extraction heuristics.
//!
//! Each `PayeeSource` variant resolves to one pure function over the source transaction.
//! The remittance-text cleanup targets the statement format of Hungarian card purchases.
//! Other banks get their own variant instead of more branches in `sanitize_payee`.

use crate::gocardless::SourceTransaction;
use crate::sync::connection::{ConnectionConfig, PayeeSource};
use crate::sync::types::{Money, SyncError};

use regex::Regex;
use std::sync::LazyLock;

/// Marker of a masked card number in remittance text.
pub const MASKED_CARD_MARKER: &str = "xxxxxx";
/// Separator between the terminal location and the merchant.
pub const MERCHANT_SEPARATOR: &str = "   ";
/// Start of the "original amount" trailer.
pub const ORIGINAL_AMOUNT_MARKER: &str = " Eredeti";

static NON_LETTERS: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"[^\p{L}]+").expect("valid non-letter pattern"));

static WHITESPACE_RUNS: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid whitespace pattern"));

/// Clean remittance text down to something that reads like a payee.
pub fn sanitize_payee(raw: &str) -> String {
	if raw.contains(MASKED_CARD_MARKER) {
		return extract_card_merchant(raw).trim().to_string();
	}

	collapse_non_letters(raw)
}

/// `516050xxxxxx5888 Purchase/... BUDAPEST   SPAR KFT. Eredeti össz/Orig amt: 2085.00HUF`
/// yields `SPAR KFT.`. Text without the separator is returned unchanged.
pub fn extract_card_merchant(raw: &str) -> &str {
	match raw.split(MERCHANT_SEPARATOR).nth(1) {
		Some(segment) => segment
			.split(ORIGINAL_AMOUNT_MARKER)
			.next()
			.unwrap_or(segment),
		None => raw,
	}
}

/// Replace every run of non-letter characters with one space and trim.
pub fn collapse_non_letters(raw: &str) -> String {
	NON_LETTERS.replace_all(raw, " ").trim().to_string()
}

/// Replace runs of two or more whitespace characters with one space and trim.
pub fn collapse_whitespace(raw: &str) -> String {
	WHITESPACE_RUNS.replace_all(raw, " ").trim().to_string()
}

/// Pick the counterparty name: incoming money names the debtor, outgoing the creditor.
pub fn counterparty_name(transaction: &SourceTransaction, amount: &Money) -> String {
	let (preferred, fallback) = if amount.milli_units > 0 {
		(&transaction.debtor_name, &transaction.creditor_name)
	} else {
		(&transaction.creditor_name, &transaction.debtor_name)
	};

	non_empty(preferred)
		.or_else(|| non_empty(fallback))
		.unwrap_or_default()
		.to_string()
}

/// Resolve one payee source against a transaction.
pub fn payee_from_source(
	source: &PayeeSource,
	transaction: &SourceTransaction,
	amount: &Money,
) -> Result<String, SyncError> {
	match source {
		PayeeSource::Unstructured => Ok(sanitize_payee(
			transaction
				.remittance_information_unstructured
				.as_deref()
				.unwrap_or_default(),
		)),
		PayeeSource::Name => Ok(counterparty_name(transaction, amount)),
		PayeeSource::Additional => Ok(transaction
			.additional_information
			.clone()
			.unwrap_or_default()),
		PayeeSource::Unrecognized(value) => Err(SyncError::Config(format!(
			"Unrecognized payee source: {}",
			value
		))),
	}
}

/// First non-empty payee in priority order, with the strip words removed.
///
/// An unrecognized source only fails if it is reached before a non-empty payee is found.
pub fn parse_payee(
	transaction: &SourceTransaction,
	amount: &Money,
	config: &ConnectionConfig,
) -> Result<String, SyncError> {
	let mut payee = String::new();

	for source in &config.payee_source {
		payee = payee_from_source(source, transaction, amount)?;
		if !payee.is_empty() {
			break;
		}
	}

	Ok(strip_payee(&payee, &config.payee_strip))
}

/// Remove each configured word from the payee.
pub fn strip_payee(payee: &str, strip: &[String]) -> String {
	if strip.is_empty() {
		return payee.to_string();
	}

	let stripped = strip
		.iter()
		.filter(|word| !word.is_empty())
		.fold(payee.to_string(), |acc, word| acc.replace(word.as_str(), ""));

	collapse_whitespace(&stripped)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gocardless::TransactionAmount;

	const CARD_PURCHASE: &str = "516050xxxxxx5888 Purchase/Vásárlás 2024.01.12 11:51:39 Terminal:S0158104 BUDAPEST   SPAR MAGYARORSZAG KFT. Eredeti össz/Orig amt: 2085.00HUF";

	fn money(milli_units: i64) -> Money {
		Money {
			milli_units,
			currency: "HUF".to_string(),
		}
	}

	fn transaction() -> SourceTransaction {
		SourceTransaction {
			transaction_id: Some("tx-1".to_string()),
			transaction_amount: TransactionAmount {
				amount: "-10".to_string(),
				currency: "HUF".to_string(),
			},
			creditor_name: Some("Creditor Ltd".to_string()),
			debtor_name: Some("Debtor Person".to_string()),
			remittance_information_unstructured: Some("Invoice #42 / ACME-Corp".to_string()),
			additional_information: Some("Extra info".to_string()),
			..Default::default()
		}
	}

	fn config(sources: Vec<PayeeSource>) -> ConnectionConfig {
		ConnectionConfig {
			payee_source: sources,
			payee_strip: Vec::new(),
		}
	}

	#[test]
	fn extracts_merchant_from_card_purchase() {
		assert_eq!(sanitize_payee(CARD_PURCHASE), "SPAR MAGYARORSZAG KFT.");
	}

	#[test]
	fn masked_card_without_separator_is_kept_whole() {
		assert_eq!(
			sanitize_payee("  516050xxxxxx5888 Purchase "),
			"516050xxxxxx5888 Purchase"
		);
	}

	#[test]
	fn plain_text_keeps_only_letters() {
		assert_eq!(sanitize_payee("Invoice #42 / ACME-Corp"), "Invoice ACME Corp");
		assert_eq!(sanitize_payee("Átutalás: Kovács Péter 123"), "Átutalás Kovács Péter");
		assert_eq!(sanitize_payee("12345 / 678"), "");
	}

	#[test]
	fn name_direction_depends_on_sign() {
		let tx = transaction();
		assert_eq!(counterparty_name(&tx, &money(1000)), "Debtor Person");
		assert_eq!(counterparty_name(&tx, &money(-1000)), "Creditor Ltd");
		assert_eq!(counterparty_name(&tx, &money(0)), "Creditor Ltd");

		let tx = SourceTransaction {
			creditor_name: Some(String::new()),
			..transaction()
		};
		assert_eq!(counterparty_name(&tx, &money(-1000)), "Debtor Person");
	}

	#[test]
	fn first_non_empty_source_wins() {
		let tx = SourceTransaction {
			additional_information: None,
			..transaction()
		};
		let payee = parse_payee(
			&tx,
			&money(-1000),
			&config(vec![PayeeSource::Additional, PayeeSource::Name]),
		)
		.unwrap();
		assert_eq!(payee, "Creditor Ltd");

		let payee = parse_payee(
			&tx,
			&money(-1000),
			&config(vec![PayeeSource::Unstructured, PayeeSource::Name]),
		)
		.unwrap();
		assert_eq!(payee, "Invoice ACME Corp");
	}

	#[test]
	fn no_candidate_yields_empty_payee() {
		let tx = SourceTransaction {
			transaction_amount: TransactionAmount::default(),
			..Default::default()
		};
		let payee = parse_payee(&tx, &money(0), &ConnectionConfig::default()).unwrap();
		assert_eq!(payee, "");
	}

	#[test]
	fn unrecognized_source_fails_when_reached() {
		let tx = transaction();
		let err = parse_payee(
			&tx,
			&money(-1000),
			&config(vec![PayeeSource::Unrecognized("iban".to_string())]),
		)
		.unwrap_err();
		assert!(matches!(err, SyncError::Config(msg) if msg.contains("iban")));

		// Never reached once an earlier source produced a payee.
		let payee = parse_payee(
			&tx,
			&money(-1000),
			&config(vec![
				PayeeSource::Name,
				PayeeSource::Unrecognized("iban".to_string()),
			]),
		)
		.unwrap();
		assert_eq!(payee, "Creditor Ltd");
	}

	#[test]
	fn strip_words_are_removed() {
		let strip = vec!["KFT.".to_string(), "MAGYARORSZAG".to_string()];
		assert_eq!(strip_payee("SPAR MAGYARORSZAG KFT.", &strip), "SPAR");
		assert_eq!(strip_payee("  SPAR  ", &[]), "  SPAR  ");
	}

	#[test]
	fn whitespace_runs_collapse() {
		assert_eq!(collapse_whitespace("  a   b\t\tc d "), "a b c d");
	}
}
