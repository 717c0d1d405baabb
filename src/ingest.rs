//! CSV ingestion collaborator: the validation boundary spec.md delegates to
//! "the ingestion front-end". The core pipeline never sees malformed input.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use chrono::{NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::transaction::Transaction;

const REQUIRED_COLUMNS: [&str; 5] = ["transaction_id", "sender_id", "receiver_id", "amount", "timestamp"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("missing required column `{0}`")]
    MissingColumn(String),
    #[error("row {row}: amount `{value}` does not parse as a non-negative decimal")]
    InvalidAmount { row: usize, value: String },
    #[error("row {row}: timestamp `{value}` does not match YYYY-MM-DD HH:MM:SS")]
    InvalidTimestamp { row: usize, value: String },
    #[error("duplicate transaction_id `{0}`")]
    DuplicateTransactionId(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Transaction>, IngestError> {
    let reader = csv::Reader::from_path(path)?;
    parse_csv_reader(reader)
}

pub fn parse_csv_str(contents: &str) -> Result<Vec<Transaction>, IngestError> {
    let reader = csv::Reader::from_reader(contents.as_bytes());
    parse_csv_reader(reader)
}

fn parse_csv_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<Transaction>, IngestError> {
    let headers = reader.headers()?.clone();
    let index_of = |name: &str| -> Result<usize, IngestError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
    };
    let indices: Vec<usize> = REQUIRED_COLUMNS
        .iter()
        .map(|c| index_of(c))
        .collect::<Result<_, _>>()?;
    let [id_idx, sender_idx, receiver_idx, amount_idx, timestamp_idx]: [usize; 5] =
        indices.try_into().expect("exactly 5 required columns");

    let mut transactions = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (row, record) in reader.records().enumerate() {
        let record = record?;

        let transaction_id = record[id_idx].to_string();
        if !seen_ids.insert(transaction_id.clone()) {
            return Err(IngestError::DuplicateTransactionId(transaction_id));
        }

        let amount_raw = &record[amount_idx];
        let amount = Decimal::from_str(amount_raw.trim())
            .ok()
            .filter(|d| !d.is_sign_negative())
            .ok_or_else(|| IngestError::InvalidAmount {
                row,
                value: amount_raw.to_string(),
            })?;

        let timestamp_raw = &record[timestamp_idx];
        let naive = NaiveDateTime::parse_from_str(timestamp_raw.trim(), TIMESTAMP_FORMAT).map_err(|_| {
            IngestError::InvalidTimestamp {
                row,
                value: timestamp_raw.to_string(),
            }
        })?;
        let timestamp = Utc.from_utc_datetime(&naive);

        transactions.push(Transaction::new(
            transaction_id,
            record[sender_idx].to_string(),
            record[receiver_idx].to_string(),
            amount,
            timestamp,
        ));
    }

    Ok(transactions)
}
