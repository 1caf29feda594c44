//! Transaction management for the finance tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model, its value types and the `NewTransaction` builder
//! - Validation of raw tool arguments into typed values and filter criteria
//! - The `TransactionStore` trait and its SQLite implementation
//! - Pure aggregation into totals, breakdowns, rankings and monthly reports
//! - The `TransactionService` façade that ties these together per user

mod aggregation;
mod amount;
mod category;
mod criteria;
mod models;
mod service;
mod sqlite;
mod store;
mod validation;

pub use aggregation::{
    CategoryBreakdown, CategorySums, MonthlyReport, Statistics, Summary, TOP_N, TopTransactions,
    Totals, category_breakdown, monthly_report, sort_newest_first, statistics, summarize,
    top_transactions, totals,
};
pub use amount::{Amount, CURRENCY_SCALE, round_currency};
pub use category::{Category, CategoryInfo};
pub use criteria::{MonthOfYear, TransactionCriteria};
pub use models::{
    DEFAULT_PAYMENT_METHOD, Frequency, NewTransaction, Tags, Transaction, TransactionId,
    TransactionStatus, TransactionType, TransactionUpdate,
};
pub use service::{BulkFailure, BulkOutcome, MAX_BATCH_SIZE, TransactionPatch, TransactionService};
pub use sqlite::{SQLiteTransactionStore, create_transaction_table, map_transaction_row};
pub use store::TransactionStore;
pub use validation::{
    FilterInput, TotalInput, TransactionChanges, TransactionInput, ValidationError, parse_date,
    parse_date_bounds, parse_month_of_year, parse_notes, parse_payment_method,
};
