//! Converts raw, loosely typed arguments into validated transaction types.
//!
//! Every function either returns a strongly typed value or a
//! [ValidationError] naming the field that was rejected. Absent optional
//! arguments always mean "no constraint" or "leave unchanged", never
//! "match empty".

use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use time::{Date, Month, format_description::BorrowedFormatItem, macros::format_description};

use super::{
    amount::Amount,
    category::Category,
    criteria::{MonthOfYear, TransactionCriteria},
    models::{
        DEFAULT_PAYMENT_METHOD, Frequency, NewTransaction, Tags, Transaction, TransactionStatus,
        TransactionType, TransactionUpdate,
    },
};

/// The only accepted date format, e.g. "2024-12-31".
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

const MAX_PAYMENT_METHOD_LENGTH: usize = 32;
const MAX_NOTES_LENGTH: usize = 500;

/// An input that was malformed or out of range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    /// The name of the offending argument.
    pub field: &'static str,
    /// Why the argument was rejected.
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Parse a `YYYY-MM-DD` date for the argument `field`.
///
/// The year must be exactly four digits without a sign.
pub fn parse_date(field: &'static str, text: &str) -> Result<Date, ValidationError> {
    let text = text.trim();
    let invalid = || {
        ValidationError::new(
            field,
            format!("\"{text}\" is not a valid date in the format YYYY-MM-DD"),
        )
    };

    if text.len() != 10 || !text.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(invalid());
    }

    Date::parse(text, DATE_FORMAT).map_err(|_| invalid())
}

/// Parse an optional start and end date.
///
/// # Errors
///
/// Fails if either date is malformed, or if both are given and the end date
/// comes before the start date.
pub fn parse_date_bounds(
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<(Option<Date>, Option<Date>), ValidationError> {
    let start = start_date
        .map(|text| parse_date("start_date", text))
        .transpose()?;
    let end = end_date.map(|text| parse_date("end_date", text)).transpose()?;

    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ValidationError::new(
            "end_date",
            format!("{end} is before the start date {start}"),
        )),
        bounds => Ok(bounds),
    }
}

/// Validate the year and month for a monthly report.
///
/// The year must have four digits and the month must be in `1..=12`.
pub fn parse_month_of_year(year: i32, month: u8) -> Result<MonthOfYear, ValidationError> {
    if !(1000..=9999).contains(&year) {
        return Err(ValidationError::new(
            "year",
            format!("{year} is not a four digit year"),
        ));
    }

    let month = Month::try_from(month).map_err(|_| {
        ValidationError::new("month", format!("{month} is not between 1 and 12"))
    })?;

    Ok(MonthOfYear { year, month })
}

/// Normalize a payment method label: trimmed, lowercased and non-empty.
pub fn parse_payment_method(text: &str) -> Result<String, ValidationError> {
    let payment_method = text.trim().to_lowercase();

    if payment_method.is_empty() {
        return Err(ValidationError::new("payment_method", "must not be empty"));
    }

    if payment_method.chars().count() > MAX_PAYMENT_METHOD_LENGTH {
        return Err(ValidationError::new(
            "payment_method",
            format!("must be at most {MAX_PAYMENT_METHOD_LENGTH} characters"),
        ));
    }

    Ok(payment_method)
}

/// Validate free text notes, an empty string means "no notes".
pub fn parse_notes(text: &str) -> Result<Option<String>, ValidationError> {
    let notes = text.trim();

    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err(ValidationError::new(
            "notes",
            format!("must be at most {MAX_NOTES_LENGTH} characters"),
        ));
    }

    Ok((!notes.is_empty()).then(|| notes.to_owned()))
}

fn parse_tag_filter(text: &str) -> Result<String, ValidationError> {
    let needle = text.trim().to_lowercase();

    if needle.is_empty() {
        return Err(ValidationError::new("tags", "must not be empty"));
    }

    Ok(needle)
}

fn parse_amount(text: &str) -> Result<Amount, ValidationError> {
    Amount::from_str(text)
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, ValidationError> {
    value
        .as_deref()
        .ok_or_else(|| ValidationError::new(field, "is required"))
}

/// Accepts either a JSON string or a JSON number and keeps its decimal text.
///
/// Numbers are turned into their shortest decimal representation before
/// being parsed as a [Decimal](rust_decimal::Decimal), so `0.1` becomes
/// exactly `0.10` rather than the nearest binary fraction.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawValue {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(
        Option::<RawValue>::deserialize(deserializer)?.map(|raw| match raw {
            RawValue::Text(text) => text,
            RawValue::Number(number) => number.to_string(),
        }),
    )
}

/// The raw arguments for creating a transaction.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionInput {
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: Option<String>,
    pub category: Option<String>,
    pub transaction_type: Option<String>,
    pub payment_method: Option<String>,
    pub status: Option<String>,
    pub frequency: Option<String>,
    pub transaction_date: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
}

impl TransactionInput {
    /// Validate the arguments, filling in defaults for the optional ones.
    ///
    /// `today` is used when no transaction date is given.
    pub fn validate(&self, today: Date) -> Result<NewTransaction, ValidationError> {
        let amount = parse_amount(required("amount", &self.amount)?)?;
        let category = Category::from_str(required("category", &self.category)?)?;
        let transaction_type =
            TransactionType::from_str(required("transaction_type", &self.transaction_type)?)?;
        let transaction_date = match &self.transaction_date {
            Some(text) => parse_date("transaction_date", text)?,
            None => today,
        };

        let payment_method = self
            .payment_method
            .as_deref()
            .map(parse_payment_method)
            .transpose()?
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_owned());
        let status = self
            .status
            .as_deref()
            .map(TransactionStatus::from_str)
            .transpose()?
            .unwrap_or_default();
        let frequency = self
            .frequency
            .as_deref()
            .map(Frequency::from_str)
            .transpose()?
            .unwrap_or_default();
        let tags = self.tags.as_deref().map(Tags::parse).unwrap_or_default();
        let notes = self.notes.as_deref().map(parse_notes).transpose()?.flatten();

        Ok(
            Transaction::build(amount, category, transaction_type, transaction_date)
                .payment_method(&payment_method)
                .status(status)
                .frequency(frequency)
                .tags(tags)
                .notes(notes),
        )
    }
}

/// The raw arguments for a partial update, absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionChanges {
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: Option<String>,
    pub category: Option<String>,
    pub transaction_type: Option<String>,
    pub payment_method: Option<String>,
    pub status: Option<String>,
    pub frequency: Option<String>,
    pub transaction_date: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
}

impl TransactionChanges {
    /// Validate every supplied field.
    ///
    /// All fields are checked before anything is returned, so an invalid
    /// field can never lead to a partially applied update.
    pub fn validate(&self) -> Result<TransactionUpdate, ValidationError> {
        Ok(TransactionUpdate {
            amount: self.amount.as_deref().map(parse_amount).transpose()?,
            category: self.category.as_deref().map(Category::from_str).transpose()?,
            transaction_type: self
                .transaction_type
                .as_deref()
                .map(TransactionType::from_str)
                .transpose()?,
            transaction_date: self
                .transaction_date
                .as_deref()
                .map(|text| parse_date("transaction_date", text))
                .transpose()?,
            payment_method: self
                .payment_method
                .as_deref()
                .map(parse_payment_method)
                .transpose()?,
            status: self
                .status
                .as_deref()
                .map(TransactionStatus::from_str)
                .transpose()?,
            frequency: self.frequency.as_deref().map(Frequency::from_str).transpose()?,
            tags: self.tags.as_deref().map(Tags::parse),
            notes: self.notes.as_deref().map(parse_notes).transpose()?,
        })
    }
}

/// The raw filter arguments shared by the summary style reports.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FilterInput {
    pub transaction_type: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub payment_method: Option<String>,
    pub status: Option<String>,
    pub frequency: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl FilterInput {
    pub fn validate(&self) -> Result<TransactionCriteria, ValidationError> {
        let (start_date, end_date) =
            parse_date_bounds(self.start_date.as_deref(), self.end_date.as_deref())?;

        Ok(TransactionCriteria {
            start_date,
            end_date,
            transaction_type: self
                .transaction_type
                .as_deref()
                .map(TransactionType::from_str)
                .transpose()?,
            category: self.category.as_deref().map(Category::from_str).transpose()?,
            tags: self.tags.as_deref().map(parse_tag_filter).transpose()?,
            payment_method: self
                .payment_method
                .as_deref()
                .map(parse_payment_method)
                .transpose()?,
            status: self
                .status
                .as_deref()
                .map(TransactionStatus::from_str)
                .transpose()?,
            frequency: self.frequency.as_deref().map(Frequency::from_str).transpose()?,
        })
    }
}

/// The raw filter arguments for the totals report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TotalInput {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category: Option<String>,
}

impl TotalInput {
    pub fn validate(&self) -> Result<TransactionCriteria, ValidationError> {
        let (start_date, end_date) =
            parse_date_bounds(self.start_date.as_deref(), self.end_date.as_deref())?;

        Ok(TransactionCriteria {
            start_date,
            end_date,
            category: self.category.as_deref().map(Category::from_str).transpose()?,
            ..Default::default()
        })
    }
}
