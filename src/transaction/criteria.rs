//! The validated filter set applied when fetching transactions.

use time::{Date, Month};

use super::{
    category::Category,
    models::{Frequency, Transaction, TransactionStatus, TransactionType},
};

/// Conjunctive filters for fetching a user's transactions.
///
/// A `None` field puts no constraint on that dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionCriteria {
    /// Include transactions on or after this date.
    pub start_date: Option<Date>,
    /// Include transactions on or before this date.
    pub end_date: Option<Date>,
    pub transaction_type: Option<TransactionType>,
    pub category: Option<Category>,
    /// A lowercase substring that must appear in the transaction's tags.
    pub tags: Option<String>,
    pub payment_method: Option<String>,
    pub status: Option<TransactionStatus>,
    pub frequency: Option<Frequency>,
}

impl TransactionCriteria {
    /// Criteria matching every transaction in the inclusive date range.
    pub fn between(start_date: Date, end_date: Date) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
            ..Default::default()
        }
    }

    /// Check a transaction against the criteria in memory.
    ///
    /// Stores that cannot push a filter down to their query language can use
    /// this to filter rows instead.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.start_date
            .is_none_or(|start| transaction.transaction_date >= start)
            && self
                .end_date
                .is_none_or(|end| transaction.transaction_date <= end)
            && self
                .transaction_type
                .is_none_or(|ty| transaction.transaction_type == ty)
            && self
                .category
                .is_none_or(|category| transaction.category == category)
            && self
                .tags
                .as_deref()
                .is_none_or(|needle| transaction.tags.to_string().contains(needle))
            && self
                .payment_method
                .as_deref()
                .is_none_or(|method| transaction.payment_method == method)
            && self.status.is_none_or(|status| transaction.status == status)
            && self
                .frequency
                .is_none_or(|frequency| transaction.frequency == frequency)
    }
}

/// A calendar month in a specific year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthOfYear {
    pub year: i32,
    pub month: Month,
}

impl MonthOfYear {
    /// The first day of the month.
    pub fn first_day(&self) -> Date {
        // The day is always valid and `year` is validated to four digits.
        Date::from_calendar_date(self.year, self.month, 1).unwrap_or(Date::MIN)
    }

    /// The last day of the month, accounting for leap years.
    pub fn last_day(&self) -> Date {
        let day = last_day_of_month(self.year, self.month);
        Date::from_calendar_date(self.year, self.month, day).unwrap_or(Date::MAX)
    }

    /// Whether `date` falls within the month.
    pub fn contains(&self, date: Date) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The month name, e.g. "February".
    pub fn month_name(&self) -> String {
        self.month.to_string()
    }
}

fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}
