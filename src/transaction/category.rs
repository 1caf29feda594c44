//! The fixed set of transaction categories and the tags suggested for each.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use super::validation::ValidationError;

/// What a transaction was for, e.g. housing, groceries or salary.
///
/// The set is closed: free text is never accepted as a category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Housing,
    Rent,
    Utilities,
    Groceries,
    Food,
    Dining,
    Transport,
    Fuel,
    Health,
    Fitness,
    PersonalCare,
    Entertainment,
    Subscriptions,
    Shopping,
    Clothing,
    Electronics,
    Education,
    Childcare,
    Pets,
    Travel,
    Insurance,
    Taxes,
    EmiLoans,
    GiftsDonations,
    Investments,
    Salary,
    Freelance,
    Business,
    Interest,
    Dividends,
    RentalIncome,
    Refunds,
    Miscellaneous,
}

/// A category together with the tags usually recorded against it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryInfo {
    pub category: Category,
    pub suggested_tags: &'static [&'static str],
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 33] = [
        Category::Housing,
        Category::Rent,
        Category::Utilities,
        Category::Groceries,
        Category::Food,
        Category::Dining,
        Category::Transport,
        Category::Fuel,
        Category::Health,
        Category::Fitness,
        Category::PersonalCare,
        Category::Entertainment,
        Category::Subscriptions,
        Category::Shopping,
        Category::Clothing,
        Category::Electronics,
        Category::Education,
        Category::Childcare,
        Category::Pets,
        Category::Travel,
        Category::Insurance,
        Category::Taxes,
        Category::EmiLoans,
        Category::GiftsDonations,
        Category::Investments,
        Category::Salary,
        Category::Freelance,
        Category::Business,
        Category::Interest,
        Category::Dividends,
        Category::RentalIncome,
        Category::Refunds,
        Category::Miscellaneous,
    ];

    /// The name used when storing and displaying the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Housing => "housing",
            Category::Rent => "rent",
            Category::Utilities => "utilities",
            Category::Groceries => "groceries",
            Category::Food => "food",
            Category::Dining => "dining",
            Category::Transport => "transport",
            Category::Fuel => "fuel",
            Category::Health => "health",
            Category::Fitness => "fitness",
            Category::PersonalCare => "personal_care",
            Category::Entertainment => "entertainment",
            Category::Subscriptions => "subscriptions",
            Category::Shopping => "shopping",
            Category::Clothing => "clothing",
            Category::Electronics => "electronics",
            Category::Education => "education",
            Category::Childcare => "childcare",
            Category::Pets => "pets",
            Category::Travel => "travel",
            Category::Insurance => "insurance",
            Category::Taxes => "taxes",
            Category::EmiLoans => "emi_loans",
            Category::GiftsDonations => "gifts_donations",
            Category::Investments => "investments",
            Category::Salary => "salary",
            Category::Freelance => "freelance",
            Category::Business => "business",
            Category::Interest => "interest",
            Category::Dividends => "dividends",
            Category::RentalIncome => "rental_income",
            Category::Refunds => "refunds",
            Category::Miscellaneous => "miscellaneous",
        }
    }

    /// Tags that are commonly used with this category.
    pub fn suggested_tags(&self) -> &'static [&'static str] {
        match self {
            Category::Housing => &["maintenance", "repairs", "furniture", "hoa_fees"],
            Category::Rent => &["monthly_rent", "deposit", "parking"],
            Category::Utilities => &["electricity", "water", "gas", "internet", "mobile"],
            Category::Groceries => &["supermarket", "produce", "household_supplies"],
            Category::Food => &["snacks", "coffee_tea", "bakery", "delivery"],
            Category::Dining => &["restaurant", "takeaway", "cafe", "bar"],
            Category::Transport => &["public_transport", "taxi", "ride_share", "parking", "tolls"],
            Category::Fuel => &["petrol", "diesel", "ev_charging"],
            Category::Health => &["doctor", "pharmacy", "dental", "hospital", "optical"],
            Category::Fitness => &["gym", "sports", "equipment"],
            Category::PersonalCare => &["haircut", "cosmetics", "spa"],
            Category::Entertainment => &["movies", "concerts", "games", "events"],
            Category::Subscriptions => &["streaming", "software", "news", "music"],
            Category::Shopping => &["online", "home_goods", "books"],
            Category::Clothing => &["apparel", "shoes", "accessories"],
            Category::Electronics => &["phone", "computer", "appliances", "gadgets"],
            Category::Education => &["tuition", "courses", "books", "school_supplies"],
            Category::Childcare => &["daycare", "babysitting", "school_fees", "toys"],
            Category::Pets => &["pet_food", "vet", "grooming"],
            Category::Travel => &["flights", "hotels", "visa", "local_transport"],
            Category::Insurance => &["health_insurance", "car_insurance", "life_insurance", "home_insurance"],
            Category::Taxes => &["income_tax", "property_tax", "vehicle_tax"],
            Category::EmiLoans => &["home_loan", "car_loan", "personal_loan", "credit_card_emi"],
            Category::GiftsDonations => &["gifts", "charity", "religious"],
            Category::Investments => &["stocks", "mutual_funds", "retirement", "crypto", "fixed_deposit"],
            Category::Salary => &["monthly_salary", "bonus", "overtime"],
            Category::Freelance => &["consulting", "contract", "commission"],
            Category::Business => &["sales", "services", "reimbursement"],
            Category::Interest => &["savings_interest", "deposit_interest"],
            Category::Dividends => &["stock_dividend", "fund_distribution"],
            Category::RentalIncome => &["residential", "commercial"],
            Category::Refunds => &["purchase_refund", "tax_refund", "cashback"],
            Category::Miscellaneous => &["other"],
        }
    }

    /// The category catalogue with suggested tags.
    pub fn catalogue() -> Vec<CategoryInfo> {
        Category::ALL
            .iter()
            .map(|&category| CategoryInfo {
                category,
                suggested_tags: category.suggested_tags(),
            })
            .collect()
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    /// Parse a category name.
    ///
    /// Matching ignores case and surrounding whitespace, and treats spaces and
    /// hyphens as underscores, so "Personal Care" is [Category::PersonalCare].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");

        Category::ALL
            .iter()
            .find(|category| category.as_str() == normalized)
            .copied()
            .ok_or_else(|| {
                ValidationError::new(
                    "category",
                    format!("\"{}\" is not a known category", s.trim()),
                )
            })
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}
