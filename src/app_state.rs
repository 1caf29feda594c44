//! Implements a struct that holds the state shared by the command line front end.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    auth::SQLiteAuthenticator,
    config::Config,
    db::initialize,
    tools::ToolRunner,
    transaction::{SQLiteTransactionStore, TransactionService},
};

/// The tool runner wired up to the SQLite backed stores.
pub type SQLiteToolRunner = ToolRunner<SQLiteAuthenticator, SQLiteTransactionStore>;

/// The state of the application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registers users and manages their sessions.
    pub authenticator: SQLiteAuthenticator,

    /// Runs the transaction tools for authenticated users.
    pub tools: SQLiteToolRunner,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if `config` is invalid or the database cannot be initialized.
    pub fn new(db_connection: Connection, config: &Config) -> Result<Self, Error> {
        config.validate()?;
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));
        let authenticator =
            SQLiteAuthenticator::new(connection.clone(), config.session_duration());
        let transactions = TransactionService::new(
            SQLiteTransactionStore::new(connection.clone()),
            &config.timezone,
        );

        Ok(Self {
            tools: ToolRunner::new(authenticator.clone(), transactions),
            authenticator,
            local_timezone: config.timezone.clone(),
            db_connection: connection,
        })
    }
}
