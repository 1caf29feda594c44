//! The query façade: validates raw arguments, fetches the caller's
//! transactions and hands them to the aggregation engine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, timezone::local_today, user::UserID};

use super::{
    aggregation::{
        self, MonthlyReport, Summary, TOP_N, TopTransactions, Totals, monthly_report,
        top_transactions, totals,
    },
    category::{Category, CategoryInfo},
    criteria::TransactionCriteria,
    models::{Transaction, TransactionId},
    store::TransactionStore,
    validation::{
        FilterInput, TotalInput, TransactionChanges, TransactionInput, ValidationError,
        parse_date_bounds, parse_month_of_year,
    },
};

/// The most items a single bulk operation accepts.
pub const MAX_BATCH_SIZE: usize = 100;

/// A partial update aimed at a specific transaction, used by bulk updates.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionPatch {
    pub transaction_id: String,
    #[serde(flatten)]
    pub changes: TransactionChanges,
}

/// Why one item of a bulk operation failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkFailure {
    /// The position of the item in the request.
    pub index: usize,
    pub kind: &'static str,
    pub message: String,
}

/// The result of a bulk operation.
///
/// Items are processed independently, a failed item does not stop the
/// remaining items from being processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BulkFailure>,
}

impl<T> BulkOutcome<T> {
    fn collect<I>(
        items: impl IntoIterator<Item = I>,
        mut process: impl FnMut(I) -> Result<T, Error>,
    ) -> Self {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            match process(item) {
                Ok(value) => succeeded.push(value),
                Err(error) => failed.push(BulkFailure {
                    index,
                    kind: error.kind(),
                    message: error.public_message(),
                }),
            }
        }

        Self { succeeded, failed }
    }
}

/// The transaction operations available to an authenticated user.
///
/// Every method takes the caller's [UserID] explicitly and only ever reads or
/// writes that user's transactions.
#[derive(Debug, Clone)]
pub struct TransactionService<S> {
    store: S,
    local_timezone: String,
}

impl<S: TransactionStore> TransactionService<S> {
    /// Create a service over `store`.
    ///
    /// `local_timezone` is the canonical timezone used to find today's date
    /// when a new transaction has no date.
    pub fn new(store: S, local_timezone: &str) -> Self {
        Self {
            store,
            local_timezone: local_timezone.to_owned(),
        }
    }

    /// Record a new transaction.
    ///
    /// # Errors
    /// Returns an [Error::Validation] if any argument is invalid, in which case
    /// nothing is written.
    pub fn add(&self, user_id: UserID, input: &TransactionInput) -> Result<Transaction, Error> {
        let today = local_today(&self.local_timezone)?;
        let builder = input.validate(today)?;

        let transaction = self.store.create(user_id, builder)?;
        tracing::info!(
            %user_id,
            transaction_id = %transaction.transaction_id,
            "added transaction"
        );

        Ok(transaction)
    }

    /// Record each transaction in `inputs` independently.
    pub fn add_many(
        &self,
        user_id: UserID,
        inputs: &[TransactionInput],
    ) -> Result<BulkOutcome<Transaction>, Error> {
        check_batch_size("transactions", inputs.len())?;

        let outcome = BulkOutcome::collect(inputs, |input| self.add(user_id, input));
        log_bulk_outcome(user_id, "bulk add", &outcome);

        Ok(outcome)
    }

    /// Change the supplied fields of one of the user's transactions.
    ///
    /// # Errors
    /// Returns an [Error::Validation] if the ID or any supplied field is
    /// invalid, or [Error::NotFound] if the user has no such transaction.
    /// Either way nothing is written.
    pub fn update(
        &self,
        user_id: UserID,
        transaction_id: &str,
        changes: &TransactionChanges,
    ) -> Result<Transaction, Error> {
        let transaction_id = TransactionId::from_str(transaction_id)?;
        let update = changes.validate()?;

        let transaction = self.store.update(user_id, transaction_id, update)?;
        tracing::info!(%user_id, %transaction_id, "updated transaction");

        Ok(transaction)
    }

    /// Apply each patch in `patches` independently.
    pub fn update_many(
        &self,
        user_id: UserID,
        patches: &[TransactionPatch],
    ) -> Result<BulkOutcome<Transaction>, Error> {
        check_batch_size("transactions", patches.len())?;

        let outcome = BulkOutcome::collect(patches, |patch| {
            self.update(user_id, &patch.transaction_id, &patch.changes)
        });
        log_bulk_outcome(user_id, "bulk update", &outcome);

        Ok(outcome)
    }

    /// Permanently delete one of the user's transactions.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the user has no such transaction, including
    /// when it was already deleted.
    pub fn delete(&self, user_id: UserID, transaction_id: &str) -> Result<TransactionId, Error> {
        let transaction_id = TransactionId::from_str(transaction_id)?;

        self.store.delete(user_id, transaction_id)?;
        tracing::info!(%user_id, %transaction_id, "deleted transaction");

        Ok(transaction_id)
    }

    /// Delete each transaction in `transaction_ids` independently.
    pub fn delete_many(
        &self,
        user_id: UserID,
        transaction_ids: &[String],
    ) -> Result<BulkOutcome<TransactionId>, Error> {
        check_batch_size("transaction_ids", transaction_ids.len())?;

        let outcome = BulkOutcome::collect(transaction_ids, |transaction_id| {
            self.delete(user_id, transaction_id)
        });
        log_bulk_outcome(user_id, "bulk delete", &outcome);

        Ok(outcome)
    }

    /// All of the user's transactions, newest first.
    pub fn list_all(&self, user_id: UserID) -> Result<Vec<Transaction>, Error> {
        self.fetch(user_id, &TransactionCriteria::default())
    }

    /// The user's transactions between two dates inclusive, newest first.
    pub fn list_range(
        &self,
        user_id: UserID,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<Transaction>, Error> {
        let (start_date, end_date) = parse_date_bounds(Some(start_date), Some(end_date))?;
        let criteria = TransactionCriteria {
            start_date,
            end_date,
            ..Default::default()
        };

        self.fetch(user_id, &criteria)
    }

    /// Expense and credit totals, optionally limited to a date range and category.
    pub fn total(&self, user_id: UserID, input: &TotalInput) -> Result<Totals, Error> {
        let criteria = input.validate()?;
        let transactions = self.fetch(user_id, &criteria)?;

        Ok(totals(&transactions))
    }

    /// The user's five largest expenses and five largest credits.
    pub fn top_categories(&self, user_id: UserID) -> Result<TopTransactions, Error> {
        let transactions = self.list_all(user_id)?;

        Ok(top_transactions(&transactions, TOP_N))
    }

    /// The transactions matching `filters` with their statistics.
    pub fn summary(&self, user_id: UserID, filters: &FilterInput) -> Result<Summary, Error> {
        let criteria = filters.validate()?;
        let transactions = self.fetch(user_id, &criteria)?;

        Ok(aggregation::summarize(transactions, criteria.transaction_type))
    }

    /// Totals over the user's entire history, regardless of status.
    pub fn balance(&self, user_id: UserID) -> Result<Totals, Error> {
        let transactions = self.list_all(user_id)?;

        Ok(totals(&transactions))
    }

    /// The report for a single calendar month.
    pub fn monthly_report(
        &self,
        user_id: UserID,
        year: i32,
        month: u8,
    ) -> Result<MonthlyReport, Error> {
        let month = parse_month_of_year(year, month)?;
        let criteria = TransactionCriteria::between(month.first_day(), month.last_day());
        let transactions = self.fetch(user_id, &criteria)?;

        Ok(monthly_report(&transactions, month))
    }

    /// The category catalogue with suggested tags.
    pub fn categories(&self) -> Vec<CategoryInfo> {
        Category::catalogue()
    }

    fn fetch(
        &self,
        user_id: UserID,
        criteria: &TransactionCriteria,
    ) -> Result<Vec<Transaction>, Error> {
        let transactions = self.store.fetch(user_id, criteria)?;
        tracing::debug!(%user_id, count = transactions.len(), "fetched transactions");

        Ok(transactions)
    }
}

fn check_batch_size(field: &'static str, size: usize) -> Result<(), ValidationError> {
    match size {
        0 => Err(ValidationError::new(field, "must contain at least one item")),
        size if size > MAX_BATCH_SIZE => Err(ValidationError::new(
            field,
            format!("must contain at most {MAX_BATCH_SIZE} items, got {size}"),
        )),
        _ => Ok(()),
    }
}

fn log_bulk_outcome<T>(user_id: UserID, operation: &str, outcome: &BulkOutcome<T>) {
    tracing::info!(
        %user_id,
        succeeded = outcome.succeeded.len(),
        failed = outcome.failed.len(),
        "{operation} finished"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rust_decimal_macros::dec;
    use time::{OffsetDateTime, macros::date};

    use crate::{
        Error,
        test_utils::{create_test_user, get_test_connection},
        transaction::{
            Category, FilterInput, SQLiteTransactionStore, TotalInput, TransactionChanges,
            TransactionInput, TransactionStatus, TransactionType,
        },
        user::UserID,
    };

    use super::{MAX_BATCH_SIZE, TransactionPatch, TransactionService};

    fn get_service() -> (TransactionService<SQLiteTransactionStore>, UserID, UserID) {
        let connection = get_test_connection();
        let alice = create_test_user(&connection, "alice");
        let bob = create_test_user(&connection, "bob");
        let store = SQLiteTransactionStore::new(Arc::new(Mutex::new(connection)));

        (TransactionService::new(store, "Etc/UTC"), alice, bob)
    }

    fn input(amount: &str, category: &str, transaction_type: &str, day: &str) -> TransactionInput {
        TransactionInput {
            amount: Some(amount.to_owned()),
            category: Some(category.to_owned()),
            transaction_type: Some(transaction_type.to_owned()),
            transaction_date: Some(day.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn add_defaults_date_to_today() {
        let (service, alice, _) = get_service();
        let before = OffsetDateTime::now_utc().date();

        let transaction = service
            .add(
                alice,
                &TransactionInput {
                    amount: Some("4.50".to_owned()),
                    category: Some("food".to_owned()),
                    transaction_type: Some("expense".to_owned()),
                    ..Default::default()
                },
            )
            .unwrap();

        let after = OffsetDateTime::now_utc().date();
        assert!(transaction.transaction_date == before || transaction.transaction_date == after);
        assert_eq!(transaction.payment_method, "cash");
        assert_eq!(transaction.status, TransactionStatus::Pending);
    }

    #[test]
    fn add_rejects_invalid_input_without_writing() {
        let (service, alice, _) = get_service();

        let result = service.add(alice, &input("-5", "food", "expense", "2024-12-01"));

        assert!(matches!(result, Err(Error::Validation(ref error)) if error.field == "amount"));
        assert_eq!(service.list_all(alice), Ok(vec![]));
    }

    #[test]
    fn add_fails_with_misconfigured_timezone() {
        let connection = get_test_connection();
        let alice = create_test_user(&connection, "alice");
        let store = SQLiteTransactionStore::new(Arc::new(Mutex::new(connection)));
        let service = TransactionService::new(store, "Not/A_Zone");

        let result = service.add(alice, &input("1", "food", "expense", "2024-12-01"));

        assert_eq!(
            result,
            Err(Error::InvalidTimezoneError("Not/A_Zone".to_owned()))
        );
    }

    #[test]
    fn users_never_see_each_others_transactions() {
        let (service, alice, bob) = get_service();
        let transaction = service
            .add(alice, &input("10", "dining", "expense", "2024-12-01"))
            .unwrap();
        let id = transaction.transaction_id.to_string();

        assert_eq!(service.list_all(bob), Ok(vec![]));
        assert_eq!(
            service.update(bob, &id, &TransactionChanges::default()),
            Err(Error::NotFound)
        );
        assert_eq!(service.delete(bob, &id), Err(Error::NotFound));
        assert_eq!(service.balance(bob).unwrap().total_expense, dec!(0));
        assert_eq!(service.list_all(alice), Ok(vec![transaction]));
    }

    #[test]
    fn update_with_invalid_field_changes_nothing() {
        let (service, alice, _) = get_service();
        let transaction = service
            .add(alice, &input("10", "dining", "expense", "2024-12-01"))
            .unwrap();

        let result = service.update(
            alice,
            &transaction.transaction_id.to_string(),
            &TransactionChanges {
                amount: Some("20".to_owned()),
                status: Some("finished".to_owned()),
                ..Default::default()
            },
        );

        assert!(matches!(result, Err(Error::Validation(ref error)) if error.field == "status"));
        assert_eq!(service.list_all(alice), Ok(vec![transaction]));
    }

    #[test]
    fn update_rejects_malformed_id() {
        let (service, alice, _) = get_service();

        let result = service.update(alice, "42", &TransactionChanges::default());

        assert!(
            matches!(result, Err(Error::Validation(ref error)) if error.field == "transaction_id")
        );
    }

    #[test]
    fn repeated_delete_is_not_found() {
        let (service, alice, _) = get_service();
        let transaction = service
            .add(alice, &input("10", "dining", "expense", "2024-12-01"))
            .unwrap();
        let id = transaction.transaction_id.to_string();

        assert_eq!(service.delete(alice, &id), Ok(transaction.transaction_id));
        assert_eq!(service.delete(alice, &id), Err(Error::NotFound));
    }

    #[test]
    fn list_range_is_inclusive_and_ordered() {
        let (service, alice, _) = get_service();
        for day in ["2024-11-30", "2024-12-01", "2024-12-31", "2025-01-01"] {
            service
                .add(alice, &input("1", "food", "expense", day))
                .unwrap();
        }

        let got = service
            .list_range(alice, "2024-12-01", "2024-12-31")
            .unwrap();

        let dates: Vec<_> = got.iter().map(|t| t.transaction_date).collect();
        assert_eq!(dates, vec![date!(2024 - 12 - 31), date!(2024 - 12 - 01)]);
    }

    #[test]
    fn list_range_rejects_reversed_bounds() {
        let (service, alice, _) = get_service();

        let result = service.list_range(alice, "2024-12-31", "2024-12-01");

        assert!(matches!(result, Err(Error::Validation(ref error)) if error.field == "end_date"));
    }

    #[test]
    fn total_applies_category_and_dates() {
        let (service, alice, _) = get_service();
        service
            .add(alice, &input("40", "groceries", "expense", "2024-12-15"))
            .unwrap();
        service
            .add(alice, &input("15.25", "groceries", "expense", "2024-12-20"))
            .unwrap();
        service
            .add(alice, &input("99", "groceries", "expense", "2024-11-20"))
            .unwrap();
        service
            .add(alice, &input("5", "refunds", "credit", "2024-12-21"))
            .unwrap();

        let got = service
            .total(
                alice,
                &TotalInput {
                    start_date: Some("2024-12-01".to_owned()),
                    end_date: Some("2024-12-31".to_owned()),
                    category: Some("groceries".to_owned()),
                },
            )
            .unwrap();

        assert_eq!(got.total_expense, dec!(55.25));
        assert_eq!(got.total_credit, dec!(0));

        let unfiltered = service.total(alice, &TotalInput::default()).unwrap();
        assert_eq!(unfiltered, service.balance(alice).unwrap());
    }

    #[test]
    fn balance_example() {
        let (service, alice, _) = get_service();
        service
            .add(alice, &input("25.50", "groceries", "expense", "2024-12-02"))
            .unwrap();
        service
            .add(alice, &input("1500.00", "salary", "credit", "2024-12-01"))
            .unwrap();

        let got = service.balance(alice).unwrap();

        assert_eq!(got.total_credit, dec!(1500.00));
        assert_eq!(got.total_expense, dec!(25.50));
        assert_eq!(got.net_balance, dec!(1474.50));
    }

    #[test]
    fn balance_includes_every_status() {
        let (service, alice, _) = get_service();
        for status in ["pending", "completed", "cancelled"] {
            service
                .add(
                    alice,
                    &TransactionInput {
                        status: Some(status.to_owned()),
                        ..input("10", "salary", "credit", "2024-12-01")
                    },
                )
                .unwrap();
        }

        assert_eq!(service.balance(alice).unwrap().total_credit, dec!(30));
    }

    #[test]
    fn summary_uses_only_filtered_rows() {
        let (service, alice, _) = get_service();
        service
            .add(
                alice,
                &TransactionInput {
                    tags: Some("Coffee, work".to_owned()),
                    ..input("4.50", "food", "expense", "2024-12-02")
                },
            )
            .unwrap();
        service
            .add(
                alice,
                &TransactionInput {
                    tags: Some("coffee".to_owned()),
                    ..input("3.50", "food", "expense", "2024-12-03")
                },
            )
            .unwrap();
        service
            .add(alice, &input("2000", "salary", "credit", "2024-12-01"))
            .unwrap();

        let got = service
            .summary(
                alice,
                &FilterInput {
                    transaction_type: Some("expense".to_owned()),
                    tags: Some("COFFEE".to_owned()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(got.transactions.len(), 2);
        assert_eq!(got.statistics.count, 2);
        assert_eq!(got.statistics.total_amount, dec!(8.00));
        assert_eq!(got.statistics.average_amount, dec!(4.00));
        assert_eq!(got.category_breakdown[&Category::Food].expense, dec!(8.00));
        assert!(!got.category_breakdown.contains_key(&Category::Salary));
    }

    #[test]
    fn monthly_report_example() {
        let (service, alice, _) = get_service();
        service
            .add(alice, &input("40.00", "groceries", "expense", "2024-12-15"))
            .unwrap();
        service
            .add(alice, &input("200.00", "salary", "credit", "2024-12-20"))
            .unwrap();
        service
            .add(alice, &input("10.00", "food", "expense", "2024-11-30"))
            .unwrap();

        let got = service.monthly_report(alice, 2024, 12).unwrap();

        let expenses: Vec<_> = got.expenses.iter().map(|t| t.amount.value()).collect();
        let credits: Vec<_> = got.credits.iter().map(|t| t.amount.value()).collect();
        assert_eq!(expenses, vec![dec!(40.00)]);
        assert_eq!(credits, vec![dec!(200.00)]);
        assert_eq!(got.totals.net_balance, dec!(160.00));
    }

    #[test]
    fn monthly_report_validates_month() {
        let (service, alice, _) = get_service();

        let result = service.monthly_report(alice, 2024, 13);

        assert!(matches!(result, Err(Error::Validation(ref error)) if error.field == "month"));
    }

    #[test]
    fn top_categories_splits_polarities() {
        let (service, alice, _) = get_service();
        for amount in ["1", "2", "3", "4", "5", "6"] {
            service
                .add(alice, &input(amount, "shopping", "expense", "2024-12-01"))
                .unwrap();
        }
        service
            .add(alice, &input("100", "salary", "credit", "2024-12-01"))
            .unwrap();

        let got = service.top_categories(alice).unwrap();

        assert_eq!(got.top_expenses.len(), 5);
        assert_eq!(got.top_expenses[0].amount.value(), dec!(6));
        assert_eq!(got.top_credits.len(), 1);
        assert_eq!(got.top_credits[0].transaction_type, TransactionType::Credit);
    }

    #[test]
    fn bulk_add_reports_each_failure_by_index() {
        let (service, alice, _) = get_service();
        let inputs = vec![
            input("10", "food", "expense", "2024-12-01"),
            input("10", "yachts", "expense", "2024-12-01"),
            input("20", "salary", "credit", "2024-12-02"),
        ];

        let outcome = service.add_many(alice, &inputs).unwrap();

        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].index, 1);
        assert_eq!(outcome.failed[0].kind, "validation_error");
        assert!(outcome.failed[0].message.contains("category"));
        assert_eq!(service.list_all(alice).unwrap().len(), 2);
    }

    #[test]
    fn bulk_operations_reject_empty_and_oversized_batches() {
        let (service, alice, _) = get_service();
        let too_many = vec![input("1", "food", "expense", "2024-12-01"); MAX_BATCH_SIZE + 1];

        let empty = service.add_many(alice, &[]);
        let oversized = service.add_many(alice, &too_many);
        let no_ids = service.delete_many(alice, &[]);

        assert!(matches!(empty, Err(Error::Validation(ref error)) if error.field == "transactions"));
        assert!(matches!(oversized, Err(Error::Validation(_))));
        assert!(
            matches!(no_ids, Err(Error::Validation(ref error)) if error.field == "transaction_ids")
        );
        assert_eq!(service.list_all(alice), Ok(vec![]));
    }

    #[test]
    fn bulk_update_and_delete_process_items_independently() {
        let (service, alice, bob) = get_service();
        let mine = service
            .add(alice, &input("10", "food", "expense", "2024-12-01"))
            .unwrap();
        let theirs = service
            .add(bob, &input("10", "food", "expense", "2024-12-01"))
            .unwrap();

        let updated = service
            .update_many(
                alice,
                &[
                    TransactionPatch {
                        transaction_id: mine.transaction_id.to_string(),
                        changes: TransactionChanges {
                            status: Some("completed".to_owned()),
                            ..Default::default()
                        },
                    },
                    TransactionPatch {
                        transaction_id: theirs.transaction_id.to_string(),
                        changes: TransactionChanges {
                            status: Some("completed".to_owned()),
                            ..Default::default()
                        },
                    },
                ],
            )
            .unwrap();

        assert_eq!(updated.succeeded.len(), 1);
        assert_eq!(updated.succeeded[0].status, TransactionStatus::Completed);
        assert_eq!(updated.failed[0].index, 1);
        assert_eq!(updated.failed[0].kind, "not_found");

        let deleted = service
            .delete_many(
                alice,
                &[mine.transaction_id.to_string(), theirs.transaction_id.to_string()],
            )
            .unwrap();

        assert_eq!(deleted.succeeded, vec![mine.transaction_id]);
        assert_eq!(deleted.failed[0].kind, "not_found");
        assert_eq!(service.list_all(bob).unwrap().len(), 1);
    }

    #[test]
    fn bulk_patch_deserializes_flattened_fields() {
        let patch: TransactionPatch = serde_json::from_value(serde_json::json!({
            "transaction_id": "00000000-0000-4000-8000-000000000001",
            "amount": 12.5,
            "notes": ""
        }))
        .unwrap();

        assert_eq!(patch.changes.amount.as_deref(), Some("12.5"));
        assert_eq!(patch.changes.notes.as_deref(), Some(""));
    }

    #[test]
    fn categories_lists_catalogue() {
        let (service, _, _) = get_service();

        assert_eq!(service.categories().len(), Category::ALL.len());
    }
}
