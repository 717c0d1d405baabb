//! The ledger record the whole pipeline is built from.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single ledger entry. Immutable once ingested.
///
/// `sender_id == receiver_id` is permitted (a self-transfer); it is not
/// rejected here and contributes to the sender's/receiver's counts like any
/// other transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        transaction_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            amount,
            timestamp,
        }
    }

    /// `amount` as a lossy `f64`, for use once a value leaves the ledger
    /// domain and becomes a derived statistic (means, velocity, scoring).
    pub fn amount_f64(&self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        self.amount.to_f64().unwrap_or(0.0)
    }
}
