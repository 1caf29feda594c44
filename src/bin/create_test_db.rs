use std::error::Error;
use std::path::Path;
use std::process::exit;
use std::sync::{Arc, Mutex};

use clap::Parser;

use fintrack_rs::{
    auth::SQLiteAuthenticator,
    db,
    transaction::{SQLiteTransactionStore, TransactionInput, TransactionService},
};

const DEMO_USERNAME: &str = "demo";
const DEMO_PASSWORD: &str = "correct horse battery staple";

/// A utility for creating a test database for fintrack.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let connection = Arc::new(Mutex::new(db::open(output_path)?));

    println!("Creating user \"{DEMO_USERNAME}\" with password \"{DEMO_PASSWORD}\"...");
    let authenticator = SQLiteAuthenticator::new(
        connection.clone(),
        fintrack_rs::auth::DEFAULT_SESSION_DURATION,
    );
    let user = authenticator.register(DEMO_USERNAME, DEMO_PASSWORD)?;

    println!("Adding sample transactions...");
    let service = TransactionService::new(SQLiteTransactionStore::new(connection), "Etc/UTC");
    let samples = sample_transactions();
    let outcome = service.add_many(user.id, &samples)?;

    if !outcome.failed.is_empty() {
        eprintln!("Some sample transactions were rejected: {:#?}", outcome.failed);
        exit(1);
    }

    println!("Added {} transactions.", outcome.succeeded.len());
    println!("Success!");

    Ok(())
}

fn sample_transactions() -> Vec<TransactionInput> {
    [
        ("3200.00", "salary", "credit", "2024-11-01", "bank_transfer", "work", "completed", "monthly"),
        ("1450.00", "rent", "expense", "2024-11-02", "bank_transfer", "home", "completed", "monthly"),
        ("82.35", "groceries", "expense", "2024-11-09", "debit_card", "weekly-shop", "completed", "weekly"),
        ("18.90", "dining", "expense", "2024-11-15", "credit_card", "lunch, work", "completed", "none"),
        ("14.99", "subscriptions", "expense", "2024-11-20", "credit_card", "streaming", "completed", "monthly"),
        ("120.00", "utilities", "expense", "2024-11-28", "bank_transfer", "power", "completed", "monthly"),
        ("3200.00", "salary", "credit", "2024-12-01", "bank_transfer", "work", "completed", "monthly"),
        ("1450.00", "rent", "expense", "2024-12-02", "bank_transfer", "home", "completed", "monthly"),
        ("96.10", "groceries", "expense", "2024-12-07", "debit_card", "weekly-shop", "completed", "weekly"),
        ("240.00", "gifts_donations", "expense", "2024-12-18", "credit_card", "christmas", "completed", "none"),
        ("450.00", "freelance", "credit", "2024-12-20", "bank_transfer", "side-project", "pending", "none"),
        ("65.00", "fuel", "expense", "2024-12-22", "cash", "car", "completed", "none"),
    ]
    .into_iter()
    .map(
        |(amount, category, transaction_type, date, payment_method, tags, status, frequency)| {
            TransactionInput {
                amount: Some(amount.to_owned()),
                category: Some(category.to_owned()),
                transaction_type: Some(transaction_type.to_owned()),
                payment_method: Some(payment_method.to_owned()),
                status: Some(status.to_owned()),
                frequency: Some(frequency.to_owned()),
                transaction_date: Some(date.to_owned()),
                tags: Some(tags.to_owned()),
                notes: None,
            }
        },
    )
    .collect()
}
