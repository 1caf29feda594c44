//! Defines the transaction model and the types that describe it.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::user::UserID;

use super::{amount::Amount, category::Category, validation::ValidationError};

/// The payment method recorded when the caller does not give one.
pub const DEFAULT_PAYMENT_METHOD: &str = "cash";

/// The globally unique, immutable ID of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Generate a fresh random ID.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for TransactionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::new("transaction_id", format!("\"{s}\" is not a valid ID")))
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for TransactionId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for TransactionId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Uuid::parse_str(value.as_str()?)
            .map(Self)
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// Implements the string conversions shared by the lowercase enums stored in
/// the transaction table.
macro_rules! text_enum {
    ($name:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The name used when storing and displaying the value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ValidationError::new(
                        $field,
                        format!(
                            "\"{}\" is not one of: {}",
                            s.trim(),
                            [$($text),+].join(", ")
                        ),
                    )),
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|error| FromSqlError::Other(Box::new(error)))
            }
        }
    };
}

/// Whether money left (expense) or entered (credit) the user's pocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Expense,
    Credit,
}

text_enum!(TransactionType, "transaction_type", {
    Expense => "expense",
    Credit => "credit",
});

/// Where a transaction is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

text_enum!(TransactionStatus, "status", {
    Pending => "pending",
    Completed => "completed",
    Cancelled => "cancelled",
});

/// How often a transaction recurs.
///
/// This is a label only, recurring transactions are not generated automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

text_enum!(Frequency, "frequency", {
    None => "none",
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
    Yearly => "yearly",
});

/// Free-form lowercase labels attached to a transaction.
///
/// Tags carry no structure, they are only used for substring filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    /// Parse a comma separated list of tags.
    ///
    /// Each tag is trimmed and lowercased; empty entries and duplicates are
    /// dropped while the original order is kept.
    pub fn parse(text: &str) -> Self {
        let mut tags: Vec<String> = Vec::new();

        for tag in text.split(',') {
            let tag = tag.trim().to_lowercase();

            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        Self(tags)
    }
}

impl Display for Tags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// An expense or credit, i.e. an event where money was either spent or received.
///
/// To create a new `Transaction`, use [Transaction::build] and hand the
/// builder to a [TransactionStore](super::TransactionStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub transaction_id: TransactionId,
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// Whether the amount was spent or received.
    pub transaction_type: TransactionType,
    /// When the transaction happened.
    pub transaction_date: Date,
    /// How much money was spent or received.
    pub amount: Amount,
    /// What the transaction was for.
    pub category: Category,
    /// Labels for filtering.
    pub tags: Tags,
    /// Free text notes.
    pub notes: Option<String>,
    /// How the transaction was paid, e.g. "cash" or "credit_card".
    pub payment_method: String,
    /// Where the transaction is in its lifecycle.
    pub status: TransactionStatus,
    /// How often the transaction recurs.
    pub frequency: Frequency,
    /// When the transaction was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the transaction was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [NewTransaction] for discoverability.
    pub fn build(
        amount: Amount,
        category: Category,
        transaction_type: TransactionType,
        transaction_date: Date,
    ) -> NewTransaction {
        NewTransaction {
            amount,
            category,
            transaction_type,
            transaction_date,
            payment_method: DEFAULT_PAYMENT_METHOD.to_owned(),
            status: TransactionStatus::default(),
            frequency: Frequency::default(),
            tags: Tags::default(),
            notes: None,
        }
    }

    /// The amount with the sign of the transaction type: credits are
    /// positive, expenses negative.
    pub fn signed_amount(&self) -> rust_decimal::Decimal {
        match self.transaction_type {
            TransactionType::Credit => self.amount.value(),
            TransactionType::Expense => -self.amount.value(),
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// The store assigns the ID, owner and audit timestamps when the transaction
/// is created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub amount: Amount,
    pub category: Category,
    pub transaction_type: TransactionType,
    pub transaction_date: Date,
    pub payment_method: String,
    pub status: TransactionStatus,
    pub frequency: Frequency,
    pub tags: Tags,
    pub notes: Option<String>,
}

impl NewTransaction {
    /// Set the payment method.
    pub fn payment_method(mut self, payment_method: &str) -> Self {
        self.payment_method = payment_method.to_owned();
        self
    }

    /// Set the status.
    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the frequency label.
    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Set the tags.
    pub fn tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Set the notes.
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// A partial update to a transaction.
///
/// Fields set to `None` are left unchanged. `notes: Some(None)` clears the
/// notes and an empty [Tags] clears the tags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionUpdate {
    pub amount: Option<Amount>,
    pub category: Option<Category>,
    pub transaction_type: Option<TransactionType>,
    pub transaction_date: Option<Date>,
    pub payment_method: Option<String>,
    pub status: Option<TransactionStatus>,
    pub frequency: Option<Frequency>,
    pub tags: Option<Tags>,
    pub notes: Option<Option<String>>,
}
