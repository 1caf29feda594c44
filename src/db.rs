/*! Sets up the application's SQLite database. */

use std::path::Path;

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, auth::create_session_table, transaction::create_transaction_table,
    user::create_user_table,
};

/// Open the database at `path`, creating the file and tables as needed.
///
/// # Errors
/// Returns an [Error::SqlError] if the file cannot be opened or the tables
/// cannot be created.
pub fn open(path: &Path) -> Result<Connection, Error> {
    let connection = Connection::open(path)?;
    initialize(&connection)?;
    tracing::debug!("opened database at {}", path.display());

    Ok(connection)
}

/// Enable foreign keys and create the tables for the domain models.
///
/// The tables are created inside a single exclusive transaction, so either
/// all of them exist afterwards or none of them were added. Existing tables
/// are left untouched.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Must be set outside of a transaction and on every new connection.
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_session_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
