//! Pure aggregation of transactions into totals, breakdowns, rankings and
//! reports.
//!
//! Every function works on an in-memory slice of already fetched
//! transactions. Sums are exact decimal sums of two-digit amounts; values are
//! only rounded, with [round_currency], when they are put into an output
//! struct.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::{
    amount::round_currency,
    category::Category,
    criteria::MonthOfYear,
    models::{Transaction, TransactionType},
};

/// The number of transactions in each ranked list of [top_transactions].
pub const TOP_N: usize = 5;

/// Expense and credit sums and their difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total_expense: Decimal,
    pub total_credit: Decimal,
    /// Credits minus expenses.
    pub net_balance: Decimal,
}

/// Count, sum and mean of a set of transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub total_amount: Decimal,
    /// Zero when `count` is zero.
    pub average_amount: Decimal,
}

/// Expense and credit sums for a single category.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CategorySums {
    pub expense: Decimal,
    pub credit: Decimal,
    pub count: usize,
}

/// Per category sums. Categories without any transactions are left out.
pub type CategoryBreakdown = BTreeMap<Category, CategorySums>;

/// The highest value expenses and credits, ranked separately.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopTransactions {
    pub top_expenses: Vec<Transaction>,
    pub top_credits: Vec<Transaction>,
}

/// The filtered transactions with statistics computed over exactly those
/// transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub transactions: Vec<Transaction>,
    #[serde(flatten)]
    pub statistics: Statistics,
    pub category_breakdown: CategoryBreakdown,
}

/// The transactions and statistics for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u8,
    pub month_name: String,
    /// Newest first.
    pub expenses: Vec<Transaction>,
    /// Newest first.
    pub credits: Vec<Transaction>,
    #[serde(flatten)]
    pub totals: Totals,
    pub transaction_count: usize,
    /// The net balance divided by the number of transactions.
    pub average_amount: Decimal,
    pub expense_statistics: Statistics,
    pub credit_statistics: Statistics,
    pub category_breakdown: CategoryBreakdown,
}

/// Sum the expenses and credits in `transactions`.
pub fn totals(transactions: &[Transaction]) -> Totals {
    let total_expense = sum_of(transactions, TransactionType::Expense);
    let total_credit = sum_of(transactions, TransactionType::Credit);

    Totals {
        total_expense: round_currency(total_expense),
        total_credit: round_currency(total_credit),
        net_balance: round_currency(total_credit - total_expense),
    }
}

/// Group `transactions` by category, summing each polarity separately.
pub fn category_breakdown(transactions: &[Transaction]) -> CategoryBreakdown {
    let mut breakdown = CategoryBreakdown::new();

    for transaction in transactions {
        let sums = breakdown.entry(transaction.category).or_default();
        sums.count += 1;

        match transaction.transaction_type {
            TransactionType::Expense => sums.expense += transaction.amount.value(),
            TransactionType::Credit => sums.credit += transaction.amount.value(),
        }
    }

    for sums in breakdown.values_mut() {
        sums.expense = round_currency(sums.expense);
        sums.credit = round_currency(sums.credit);
    }

    breakdown
}

/// Count and average `transactions`.
///
/// Without a `polarity` the total is signed: credits add and expenses
/// subtract. With a `polarity` only transactions of that type are counted and
/// the total is the sum of their amounts.
pub fn statistics(transactions: &[Transaction], polarity: Option<TransactionType>) -> Statistics {
    let (count, total) = match polarity {
        Some(transaction_type) => (
            transactions
                .iter()
                .filter(|transaction| transaction.transaction_type == transaction_type)
                .count(),
            sum_of(transactions, transaction_type),
        ),
        None => (
            transactions.len(),
            transactions.iter().map(Transaction::signed_amount).sum(),
        ),
    };

    Statistics {
        count,
        total_amount: round_currency(total),
        average_amount: average(total, count),
    }
}

/// Rank expenses and credits separately by amount, keeping the top `n` of each.
///
/// Ties are broken by the most recent transaction date, then by ascending
/// transaction ID.
pub fn top_transactions(transactions: &[Transaction], n: usize) -> TopTransactions {
    TopTransactions {
        top_expenses: ranked(transactions, TransactionType::Expense, n),
        top_credits: ranked(transactions, TransactionType::Credit, n),
    }
}

/// Summarize the transactions that matched a filter.
///
/// `polarity` should be the transaction type the filter was restricted to, if
/// any, see [statistics].
pub fn summarize(transactions: Vec<Transaction>, polarity: Option<TransactionType>) -> Summary {
    let statistics = statistics(&transactions, polarity);
    let category_breakdown = category_breakdown(&transactions);

    Summary {
        transactions,
        statistics,
        category_breakdown,
    }
}

/// Build the report for `month` from `transactions`.
///
/// Transactions outside of the month are ignored, so `transactions` may span
/// any date range.
pub fn monthly_report(transactions: &[Transaction], month: MonthOfYear) -> MonthlyReport {
    let in_month: Vec<Transaction> = transactions
        .iter()
        .filter(|transaction| month.contains(transaction.transaction_date))
        .cloned()
        .collect();

    let (mut expenses, mut credits): (Vec<_>, Vec<_>) = in_month
        .iter()
        .cloned()
        .partition(|transaction| transaction.transaction_type == TransactionType::Expense);
    sort_newest_first(&mut expenses);
    sort_newest_first(&mut credits);

    let totals = totals(&in_month);
    let overall = statistics(&in_month, None);

    MonthlyReport {
        year: month.year,
        month: u8::from(month.month),
        month_name: month.month_name(),
        expenses,
        credits,
        totals,
        transaction_count: overall.count,
        average_amount: overall.average_amount,
        expense_statistics: statistics(&in_month, Some(TransactionType::Expense)),
        credit_statistics: statistics(&in_month, Some(TransactionType::Credit)),
        category_breakdown: category_breakdown(&in_month),
    }
}

/// Sort by transaction date, newest first, then by creation time, newest first.
///
/// The sort is stable so transactions that tie on both keep their order.
pub fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| {
        b.transaction_date
            .cmp(&a.transaction_date)
            .then(b.created_at.cmp(&a.created_at))
    });
}

fn sum_of(transactions: &[Transaction], transaction_type: TransactionType) -> Decimal {
    transactions
        .iter()
        .filter(|transaction| transaction.transaction_type == transaction_type)
        .map(|transaction| transaction.amount.value())
        .sum()
}

fn average(total: Decimal, count: usize) -> Decimal {
    match count {
        0 => round_currency(Decimal::ZERO),
        count => round_currency(total / Decimal::from(count)),
    }
}

fn ranked(
    transactions: &[Transaction],
    transaction_type: TransactionType,
    n: usize,
) -> Vec<Transaction> {
    let mut ranked: Vec<Transaction> = transactions
        .iter()
        .filter(|transaction| transaction.transaction_type == transaction_type)
        .cloned()
        .collect();

    ranked.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then(b.transaction_date.cmp(&a.transaction_date))
            .then(a.transaction_id.cmp(&b.transaction_id))
    });
    ranked.truncate(n);

    ranked
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{Date, Duration, Month, OffsetDateTime, macros::date};

    use crate::{
        transaction::{
            Amount, Category, Frequency, Tags, Transaction, TransactionId, TransactionStatus,
            TransactionType, criteria::MonthOfYear,
        },
        user::UserID,
    };

    use super::{
        TOP_N, category_breakdown, monthly_report, sort_newest_first, statistics, summarize,
        top_transactions, totals,
    };

    fn transaction(
        transaction_type: TransactionType,
        amount: Decimal,
        category: Category,
        transaction_date: Date,
    ) -> Transaction {
        Transaction {
            transaction_id: TransactionId::new_random(),
            user_id: UserID::new(1),
            transaction_type,
            transaction_date,
            amount: Amount::new(amount).unwrap(),
            category,
            tags: Tags::default(),
            notes: None,
            payment_method: "cash".to_owned(),
            status: TransactionStatus::Pending,
            frequency: Frequency::None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn expense(amount: Decimal, category: Category, transaction_date: Date) -> Transaction {
        transaction(TransactionType::Expense, amount, category, transaction_date)
    }

    fn credit(amount: Decimal, category: Category, transaction_date: Date) -> Transaction {
        transaction(TransactionType::Credit, amount, category, transaction_date)
    }

    fn with_id(mut transaction: Transaction, id: &str) -> Transaction {
        transaction.transaction_id = TransactionId::from_str(id).unwrap();
        transaction
    }

    #[test]
    fn balance_example() {
        let rows = vec![
            expense(dec!(25.50), Category::Groceries, date!(2024 - 12 - 02)),
            credit(dec!(1500.00), Category::Salary, date!(2024 - 12 - 01)),
        ];

        let got = totals(&rows);

        assert_eq!(got.total_credit, dec!(1500.00));
        assert_eq!(got.total_expense, dec!(25.50));
        assert_eq!(got.net_balance, dec!(1474.50));
        assert_eq!(got.net_balance.to_string(), "1474.50");
    }

    #[test]
    fn totals_of_nothing_are_zero() {
        let got = totals(&[]);

        assert_eq!(got.total_expense, Decimal::ZERO);
        assert_eq!(got.total_credit, Decimal::ZERO);
        assert_eq!(got.net_balance.to_string(), "0.00");
    }

    #[test]
    fn many_small_amounts_do_not_drift() {
        let rows: Vec<_> = (0..1000)
            .map(|_| expense(dec!(0.10), Category::Food, date!(2024 - 12 - 01)))
            .chain((0..3).map(|_| credit(dec!(33.33), Category::Refunds, date!(2024 - 12 - 01))))
            .collect();

        let got = totals(&rows);

        assert_eq!(got.total_expense, dec!(100.00));
        assert_eq!(got.total_credit, dec!(99.99));
        assert_eq!(got.net_balance, dec!(-0.01));
        assert_eq!(got.net_balance, got.total_credit - got.total_expense);
    }

    #[test]
    fn net_balance_is_credit_minus_expense_for_any_subset() {
        let rows = vec![
            expense(dec!(19.99), Category::Subscriptions, date!(2024 - 01 - 05)),
            expense(dec!(0.01), Category::Food, date!(2024 - 01 - 06)),
            credit(dec!(250.75), Category::Freelance, date!(2024 - 01 - 07)),
            expense(dec!(999.99), Category::Travel, date!(2024 - 01 - 08)),
            credit(dec!(0.05), Category::Interest, date!(2024 - 01 - 09)),
        ];

        for start in 0..rows.len() {
            for end in start..=rows.len() {
                let got = totals(&rows[start..end]);

                assert_eq!(got.net_balance, got.total_credit - got.total_expense);
            }
        }
    }

    #[test]
    fn breakdown_omits_empty_categories_and_matches_totals() {
        let rows = vec![
            expense(dec!(40.00), Category::Groceries, date!(2024 - 12 - 15)),
            expense(dec!(12.25), Category::Groceries, date!(2024 - 12 - 16)),
            credit(dec!(5.00), Category::Groceries, date!(2024 - 12 - 17)),
            expense(dec!(60.00), Category::Fuel, date!(2024 - 12 - 18)),
            credit(dec!(200.00), Category::Salary, date!(2024 - 12 - 20)),
        ];

        let breakdown = category_breakdown(&rows);

        assert_eq!(
            breakdown.keys().copied().collect::<Vec<_>>(),
            vec![Category::Groceries, Category::Fuel, Category::Salary]
        );
        let groceries = &breakdown[&Category::Groceries];
        assert_eq!(groceries.expense, dec!(52.25));
        assert_eq!(groceries.credit, dec!(5.00));
        assert_eq!(groceries.count, 3);

        let totals = totals(&rows);
        let expense_sum: Decimal = breakdown.values().map(|sums| sums.expense).sum();
        let credit_sum: Decimal = breakdown.values().map(|sums| sums.credit).sum();
        assert_eq!(expense_sum, totals.total_expense);
        assert_eq!(credit_sum, totals.total_credit);
    }

    #[test]
    fn breakdown_of_nothing_is_empty() {
        assert!(category_breakdown(&[]).is_empty());
    }

    #[test]
    fn average_is_zero_without_rows() {
        let got = statistics(&[], None);

        assert_eq!(got.count, 0);
        assert_eq!(got.average_amount, Decimal::ZERO);

        let got = statistics(&[], Some(TransactionType::Expense));
        assert_eq!(got.average_amount, Decimal::ZERO);
    }

    #[test]
    fn unrestricted_average_uses_signed_amounts() {
        let rows = vec![
            expense(dec!(30.00), Category::Dining, date!(2024 - 12 - 01)),
            credit(dec!(100.00), Category::Salary, date!(2024 - 12 - 02)),
        ];

        let got = statistics(&rows, None);

        assert_eq!(got.count, 2);
        assert_eq!(got.total_amount, dec!(70.00));
        assert_eq!(got.average_amount, dec!(35.00));
    }

    #[test]
    fn restricted_average_uses_magnitudes() {
        let rows = vec![
            expense(dec!(10.00), Category::Dining, date!(2024 - 12 - 01)),
            expense(dec!(20.00), Category::Dining, date!(2024 - 12 - 02)),
            expense(dec!(30.01), Category::Dining, date!(2024 - 12 - 03)),
        ];

        let got = statistics(&rows, Some(TransactionType::Expense));

        assert_eq!(got.count, 3);
        assert_eq!(got.total_amount, dec!(60.01));
        // 60.01 / 3 = 20.00333...
        assert_eq!(got.average_amount, dec!(20.00));
    }

    #[test]
    fn average_rounds_half_away_from_zero() {
        let rows = vec![
            expense(dec!(0.01), Category::Food, date!(2024 - 12 - 01)),
            expense(dec!(0.02), Category::Food, date!(2024 - 12 - 02)),
        ];

        // 0.03 / 2 = 0.015
        assert_eq!(
            statistics(&rows, Some(TransactionType::Expense)).average_amount,
            dec!(0.02)
        );
        assert_eq!(statistics(&rows, None).average_amount, dec!(-0.02));
    }

    #[test]
    fn top_lists_are_ranked_and_separate() {
        let mut rows: Vec<_> = (1..=7)
            .map(|i| expense(Decimal::from(i * 10), Category::Shopping, date!(2024 - 06 - 01)))
            .collect();
        rows.push(credit(dec!(500), Category::Salary, date!(2024 - 06 - 01)));
        rows.push(credit(dec!(20), Category::Refunds, date!(2024 - 06 - 02)));

        let got = top_transactions(&rows, TOP_N);

        let expense_amounts: Vec<_> = got.top_expenses.iter().map(|t| t.amount.value()).collect();
        assert_eq!(
            expense_amounts,
            vec![dec!(70), dec!(60), dec!(50), dec!(40), dec!(30)]
        );
        let credit_amounts: Vec<_> = got.top_credits.iter().map(|t| t.amount.value()).collect();
        assert_eq!(credit_amounts, vec![dec!(500), dec!(20)]);
        assert!(
            got.top_expenses
                .iter()
                .all(|t| t.transaction_type == TransactionType::Expense)
        );
        assert!(
            got.top_credits
                .iter()
                .all(|t| t.transaction_type == TransactionType::Credit)
        );
    }

    #[test]
    fn top_list_ties_prefer_recent_dates_then_lower_ids() {
        let older = with_id(
            expense(dec!(50), Category::Fuel, date!(2024 - 06 - 01)),
            "00000000-0000-4000-8000-000000000001",
        );
        let newer_high_id = with_id(
            expense(dec!(50), Category::Fuel, date!(2024 - 06 - 02)),
            "00000000-0000-4000-8000-0000000000ff",
        );
        let newer_low_id = with_id(
            expense(dec!(50), Category::Fuel, date!(2024 - 06 - 02)),
            "00000000-0000-4000-8000-000000000002",
        );

        let got = top_transactions(
            &[older.clone(), newer_high_id.clone(), newer_low_id.clone()],
            TOP_N,
        );

        assert_eq!(got.top_expenses, vec![newer_low_id, newer_high_id, older]);
        assert!(got.top_credits.is_empty());
    }

    #[test]
    fn summary_statistics_cover_only_given_rows() {
        let rows = vec![
            expense(dec!(40.00), Category::Groceries, date!(2024 - 12 - 15)),
            expense(dec!(60.00), Category::Groceries, date!(2024 - 12 - 18)),
        ];

        let got = summarize(rows.clone(), Some(TransactionType::Expense));

        assert_eq!(got.transactions, rows);
        assert_eq!(got.statistics.count, 2);
        assert_eq!(got.statistics.total_amount, dec!(100.00));
        assert_eq!(got.statistics.average_amount, dec!(50.00));
        assert_eq!(got.category_breakdown.len(), 1);
    }

    #[test]
    fn monthly_report_example() {
        let rows = vec![
            expense(dec!(40.00), Category::Groceries, date!(2024 - 12 - 15)),
            credit(dec!(200.00), Category::Salary, date!(2024 - 12 - 20)),
            expense(dec!(10.00), Category::Food, date!(2024 - 11 - 30)),
        ];

        let got = monthly_report(
            &rows,
            MonthOfYear {
                year: 2024,
                month: Month::December,
            },
        );

        assert_eq!(got.month, 12);
        assert_eq!(got.month_name, "December");
        assert_eq!(got.expenses, vec![rows[0].clone()]);
        assert_eq!(got.credits, vec![rows[1].clone()]);
        assert_eq!(got.totals.total_expense, dec!(40.00));
        assert_eq!(got.totals.total_credit, dec!(200.00));
        assert_eq!(got.totals.net_balance, dec!(160.00));
        assert_eq!(got.transaction_count, 2);
        assert_eq!(got.average_amount, dec!(80.00));
        assert_eq!(got.expense_statistics.count, 1);
        assert_eq!(got.credit_statistics.average_amount, dec!(200.00));
        assert!(!got.category_breakdown.contains_key(&Category::Food));
    }

    #[test]
    fn monthly_report_respects_month_boundaries() {
        let rows = vec![
            expense(dec!(1), Category::Food, date!(2024 - 01 - 31)),
            expense(dec!(2), Category::Food, date!(2024 - 02 - 01)),
            expense(dec!(3), Category::Food, date!(2024 - 02 - 29)),
            expense(dec!(4), Category::Food, date!(2024 - 03 - 01)),
        ];

        let january = monthly_report(
            &rows,
            MonthOfYear {
                year: 2024,
                month: Month::January,
            },
        );
        let february = monthly_report(
            &rows,
            MonthOfYear {
                year: 2024,
                month: Month::February,
            },
        );

        assert_eq!(january.expenses, vec![rows[0].clone()]);
        assert_eq!(february.expenses, vec![rows[2].clone(), rows[1].clone()]);
        assert_eq!(february.totals.total_expense, dec!(5.00));
    }

    #[test]
    fn monthly_report_for_empty_month_has_zero_statistics() {
        let got = monthly_report(
            &[expense(dec!(1), Category::Food, date!(2023 - 12 - 31))],
            MonthOfYear {
                year: 2024,
                month: Month::December,
            },
        );

        assert!(got.expenses.is_empty());
        assert!(got.credits.is_empty());
        assert_eq!(got.transaction_count, 0);
        assert_eq!(got.average_amount, Decimal::ZERO);
    }

    #[test]
    fn sort_breaks_date_ties_by_creation_time() {
        let mut earlier = expense(dec!(1), Category::Food, date!(2024 - 12 - 01));
        let mut later = expense(dec!(2), Category::Food, date!(2024 - 12 - 01));
        earlier.created_at = OffsetDateTime::UNIX_EPOCH;
        later.created_at = OffsetDateTime::UNIX_EPOCH + Duration::seconds(1);
        let newest_date = expense(dec!(3), Category::Food, date!(2024 - 12 - 02));

        let mut rows = vec![earlier.clone(), newest_date.clone(), later.clone()];
        sort_newest_first(&mut rows);

        assert_eq!(rows, vec![newest_date, later, earlier]);
    }

    #[test]
    fn output_values_serialize_with_two_decimal_places() {
        let got = totals(&[credit(dec!(7), Category::Salary, date!(2024 - 12 - 01))]);

        let json = serde_json::to_value(&got).unwrap();

        assert_eq!(json["total_credit"], "7.00");
        assert_eq!(json["total_expense"], "0.00");
        assert_eq!(json["net_balance"], "7.00");
    }
}
