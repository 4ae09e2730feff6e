//! Transactions as they enter the store, and what the store says back.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

/// A validated transaction. Only its contribution to a bucket is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Result of `TransactionStore::add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Merged into the window.
    Accepted,
    /// Refused; no state changed.
    Rejected(Rejection),
    /// Valid, but has no effect on the window.
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Timestamp strictly after the clock's "now".
    FutureTimestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Timestamp at or before the start of the window.
    OutOfWindow,
}

impl Outcome {
    /// Short label used for logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Accepted => "accepted",
            Outcome::Rejected(Rejection::FutureTimestamp) => "future_timestamp",
            Outcome::Ignored(IgnoreReason::OutOfWindow) => "out_of_window",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("amount is not a decimal: {0}")]
    InvalidAmount(String),
    #[error("timestamp is not an ISO-8601 instant: {0}")]
    InvalidTimestamp(String),
}

impl TransactionError {
    /// Missing fields are a shape problem; bad values are a content problem.
    pub fn is_missing_field(&self) -> bool {
        matches!(self, TransactionError::MissingField(_))
    }
}

/// Wire shape of `POST /transactions`. Fields stay untyped until
/// [`Transaction::try_from`] so that a bad value can be told apart from a
/// malformed document. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct TransactionPayload {
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub timestamp: Value,
}

impl TryFrom<TransactionPayload> for Transaction {
    type Error = TransactionError;

    fn try_from(p: TransactionPayload) -> Result<Self, Self::Error> {
        // Both presence checks first, so a body missing everything reports as missing.
        if p.amount.is_null() {
            return Err(TransactionError::MissingField("amount"));
        }
        if p.timestamp.is_null() {
            return Err(TransactionError::MissingField("timestamp"));
        }
        Ok(Transaction {
            amount: parse_amount(&p.amount)?,
            timestamp: parse_timestamp(&p.timestamp)?,
        })
    }
}

/// Accepts `"12.3343"`, `12.3343` and scientific notation in either form.
fn parse_amount(v: &Value) -> Result<Decimal, TransactionError> {
    let raw = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(TransactionError::InvalidAmount(other.to_string())),
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| TransactionError::InvalidAmount(raw))
}

fn parse_timestamp(v: &Value) -> Result<DateTime<Utc>, TransactionError> {
    let Value::String(s) = v else {
        return Err(TransactionError::InvalidTimestamp(v.to_string()));
    };
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TransactionError::InvalidTimestamp(s.clone()))
}
