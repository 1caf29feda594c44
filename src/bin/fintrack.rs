use std::{io, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use fintrack_rs::{
    AppState, Error, ToolCall, ToolResponse, ValidatedPassword,
    config::Config,
    db, logging,
    transaction::{FilterInput, TotalInput, TransactionChanges, TransactionInput, TransactionPatch},
};

/// Track expenses and income from the command line.
///
/// Results are printed to stdout as JSON, logs go to stderr.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    /// The session token printed by `log-in`.
    #[arg(long, env = "FINTRACK_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new user, prompting for the password.
    Register { username: String },
    /// Start a session and print its token.
    LogIn { username: String },
    /// End the current session.
    LogOut,
    /// Change the password, ending every other session.
    ChangePassword,
    /// Record a transaction.
    Add(AddArgs),
    /// Change some fields of a transaction.
    Update(UpdateArgs),
    /// Delete a transaction.
    Delete { transaction_id: String },
    /// List every transaction, newest first.
    List,
    /// List the transactions between two dates, inclusive.
    Range { start_date: String, end_date: String },
    /// Total expenses and credits, optionally filtered.
    Total {
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// The largest expenses and credits.
    Top,
    /// Statistics and a category breakdown for the matching transactions.
    Summary(SummaryArgs),
    /// Total expenses and credits over all time.
    Balance,
    /// The report for one calendar month.
    Monthly { year: i32, month: u8 },
    /// List the categories and their suggested tags.
    Categories,
    /// Run a tool call given as JSON, e.g. '{"tool": "get_balance", "arguments": {}}'.
    Call {
        #[arg(long)]
        json: String,
    },
}

#[derive(Args, Debug)]
struct AddArgs {
    /// The amount, e.g. 12.50.
    amount: String,
    category: String,
    /// Either "expense" or "credit".
    transaction_type: String,
    #[arg(long)]
    payment_method: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    frequency: Option<String>,
    /// Defaults to today in the configured timezone.
    #[arg(long)]
    date: Option<String>,
    /// Comma separated tags.
    #[arg(long)]
    tags: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    transaction_id: String,
    #[arg(long)]
    amount: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    transaction_type: Option<String>,
    #[arg(long)]
    payment_method: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    frequency: Option<String>,
    #[arg(long)]
    date: Option<String>,
    /// Comma separated tags, an empty string clears them.
    #[arg(long)]
    tags: Option<String>,
    /// An empty string clears the notes.
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    #[arg(long)]
    transaction_type: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    tags: Option<String>,
    #[arg(long)]
    payment_method: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    frequency: Option<String>,
    #[arg(long)]
    start_date: Option<String>,
    #[arg(long)]
    end_date: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = logging::init(cli.config.log_level, cli.config.log_file.as_deref()) {
        print_error(error);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            tracing::error!("{error}");
            print_json(&ToolResponse::from(error));
            ExitCode::FAILURE
        }
    }
}

/// Run the command, returning whether it succeeded.
fn run(cli: Cli) -> Result<bool, Error> {
    let connection = db::open(&cli.config.db_path)?;
    let state = AppState::new(connection, &cli.config)?;

    let call = match cli.command {
        Command::Register { username } => {
            let Some(password) = prompt_new_password(&[username.as_str()])? else {
                return Ok(false);
            };
            let user = state.authenticator.register(&username, &password)?;
            print_json(&ToolResponse::Success {
                data: serde_json::json!({
                    "user_id": user.id,
                    "username": user.username.as_str(),
                }),
            });
            return Ok(true);
        }
        Command::LogIn { username } => {
            let password = prompt_password("Password: ")?;
            let issued = state.authenticator.log_in(&username, &password)?;
            print_json(&ToolResponse::Success {
                data: to_json(issued)?,
            });
            return Ok(true);
        }
        Command::LogOut => {
            state.authenticator.log_out(&required_token(&cli.token)?)?;
            print_json(&ToolResponse::Success {
                data: serde_json::json!({ "logged_out": true }),
            });
            return Ok(true);
        }
        Command::ChangePassword => {
            let token = required_token(&cli.token)?;
            let old_password = prompt_password("Current password: ")?;
            let Some(new_password) = prompt_new_password(&[])? else {
                return Ok(false);
            };
            state
                .authenticator
                .change_password(&token, &old_password, &new_password)?;
            print_json(&ToolResponse::Success {
                data: serde_json::json!({ "password_changed": true }),
            });
            return Ok(true);
        }
        Command::Add(args) => ToolCall::AddTransaction(TransactionInput {
            amount: Some(args.amount),
            category: Some(args.category),
            transaction_type: Some(args.transaction_type),
            payment_method: args.payment_method,
            status: args.status,
            frequency: args.frequency,
            transaction_date: args.date,
            tags: args.tags,
            notes: args.notes,
        }),
        Command::Update(args) => ToolCall::UpdateTransaction(TransactionPatch {
            transaction_id: args.transaction_id,
            changes: TransactionChanges {
                amount: args.amount,
                category: args.category,
                transaction_type: args.transaction_type,
                payment_method: args.payment_method,
                status: args.status,
                frequency: args.frequency,
                transaction_date: args.date,
                tags: args.tags,
                notes: args.notes,
            },
        }),
        Command::Delete { transaction_id } => ToolCall::DeleteTransaction { transaction_id },
        Command::List => ToolCall::GetAllTransactions {},
        Command::Range {
            start_date,
            end_date,
        } => ToolCall::GetTransactionsByDateRange {
            start_date,
            end_date,
        },
        Command::Total {
            start_date,
            end_date,
            category,
        } => ToolCall::GetTotal(TotalInput {
            start_date,
            end_date,
            category,
        }),
        Command::Top => ToolCall::GetTopCategories {},
        Command::Summary(args) => ToolCall::GetSummary(FilterInput {
            transaction_type: args.transaction_type,
            category: args.category,
            tags: args.tags,
            payment_method: args.payment_method,
            status: args.status,
            frequency: args.frequency,
            start_date: args.start_date,
            end_date: args.end_date,
        }),
        Command::Balance => ToolCall::GetBalance {},
        Command::Monthly { year, month } => ToolCall::GetMonthlyReport { year, month },
        Command::Categories => ToolCall::GetCategories {},
        Command::Call { json } => ToolCall::from_json(&json)?,
    };

    let response = state.tools.run(&required_token(&cli.token)?, &call);
    let succeeded = matches!(response, ToolResponse::Success { .. });
    print_json(&response);

    Ok(succeeded)
}

fn required_token(token: &Option<String>) -> Result<String, Error> {
    token.clone().ok_or(Error::Unauthenticated)
}

fn to_json(value: impl Serialize) -> Result<serde_json::Value, Error> {
    serde_json::to_value(value).map_err(|error| Error::SerializationError(error.to_string()))
}

fn print_json(response: &ToolResponse) {
    match serde_json::to_string_pretty(response) {
        Ok(json) => println!("{json}"),
        Err(error) => print_error(format!("Could not serialize the response: {error}")),
    }
}

fn prompt_password(prompt: &str) -> Result<String, Error> {
    rpassword::prompt_password(prompt).map_err(|error| {
        Error::ConfigurationError(format!("could not read password from stdin: {error}"))
    })
}

/// Ask for a strong enough new password twice until both entries match.
///
/// Returns `None` if stdin is closed.
fn prompt_new_password(user_inputs: &[&str]) -> Result<Option<String>, Error> {
    loop {
        eprintln!();

        let first_password = match rpassword::prompt_password("Enter a new password: ") {
            Ok(password) => password,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(error) => {
                return Err(Error::ConfigurationError(format!(
                    "could not read password from stdin: {error}"
                )));
            }
        };

        if let Err(error) = ValidatedPassword::new(&first_password, user_inputs) {
            print_error(error);
            continue;
        }

        let second_password = prompt_password("Enter the same password again: ")?;

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        return Ok(Some(first_password));
    }
}

fn print_error(error: impl ToString) {
    eprintln!("\x1b[31;1m{}\x1b[0m", error.to_string())
}
