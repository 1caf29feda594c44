//! Implements a SQLite backed transaction store.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row, ToSql, params, params_from_iter};
use time::OffsetDateTime;

use crate::{Error, user::UserID};

use super::{
    amount::Amount,
    criteria::TransactionCriteria,
    models::{NewTransaction, Tags, Transaction, TransactionId, TransactionUpdate},
    store::TransactionStore,
};

const TRANSACTION_COLUMNS: &str = "id, user_id, transaction_type, transaction_date, amount_cents, \
     category, tags, notes, payment_method, status, frequency, created_at, updated_at";

/// Stores transactions in a SQLite database.
///
/// The user table must exist before [create_transaction_table] is called,
/// see [initialize](crate::db::initialize).
#[derive(Debug, Clone)]
pub struct SQLiteTransactionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteTransactionStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire the database lock: {error}");
            Error::DatabaseLockError
        })
    }
}

impl TransactionStore for SQLiteTransactionStore {
    /// Insert a new transaction for `user_id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `user_id` does not refer to a registered user,
    /// - [Error::SqlError] if there is some other SQL error,
    /// - or [Error::DatabaseLockError] if the connection lock is poisoned.
    fn create(&self, user_id: UserID, builder: NewTransaction) -> Result<Transaction, Error> {
        let connection = self.lock()?;
        let now = OffsetDateTime::now_utc();

        connection
            .prepare(&format!(
                "INSERT INTO \"transaction\" ({TRANSACTION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 RETURNING {TRANSACTION_COLUMNS}"
            ))?
            .query_row(
                params![
                    TransactionId::new_random(),
                    user_id,
                    builder.transaction_type,
                    builder.transaction_date,
                    builder.amount.cents(),
                    builder.category,
                    builder.tags.to_string(),
                    builder.notes,
                    builder.payment_method,
                    builder.status,
                    builder.frequency,
                    now,
                    now,
                ],
                map_transaction_row,
            )
            .map_err(|error| match error {
                // Code 787 occurs when a FOREIGN KEY constraint failed.
                rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 787 => {
                    Error::NotFound
                }
                error => error.into(),
            })
    }

    /// Retrieve one of the user's transactions.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if `id` does not exist or belongs to another user.
    fn get(&self, user_id: UserID, id: TransactionId) -> Result<Transaction, Error> {
        self.lock()?
            .prepare(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
                 WHERE id = ?1 AND user_id = ?2"
            ))?
            .query_row(params![id, user_id], map_transaction_row)
            .map_err(|error| error.into())
    }

    /// Write the supplied fields and refresh `updated_at` in a single statement.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if `id` does not exist or belongs to another
    /// user, in which case nothing is written.
    fn update(
        &self,
        user_id: UserID,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> Result<Transaction, Error> {
        let mut set_clause_parts: Vec<String> = Vec::new();
        let mut query_parameters: Vec<Box<dyn ToSql>> = Vec::new();

        let mut set = |column: &str, value: Box<dyn ToSql>| {
            query_parameters.push(value);
            set_clause_parts.push(format!("{column} = ?{}", query_parameters.len()));
        };

        if let Some(amount) = update.amount {
            set("amount_cents", Box::new(amount.cents()));
        }
        if let Some(category) = update.category {
            set("category", Box::new(category));
        }
        if let Some(transaction_type) = update.transaction_type {
            set("transaction_type", Box::new(transaction_type));
        }
        if let Some(transaction_date) = update.transaction_date {
            set("transaction_date", Box::new(transaction_date));
        }
        if let Some(payment_method) = update.payment_method {
            set("payment_method", Box::new(payment_method));
        }
        if let Some(status) = update.status {
            set("status", Box::new(status));
        }
        if let Some(frequency) = update.frequency {
            set("frequency", Box::new(frequency));
        }
        if let Some(tags) = update.tags {
            set("tags", Box::new(tags.to_string()));
        }
        if let Some(notes) = update.notes {
            set("notes", Box::new(notes));
        }
        set("updated_at", Box::new(OffsetDateTime::now_utc()));

        let id_index = query_parameters.len() + 1;
        let user_id_index = query_parameters.len() + 2;
        query_parameters.push(Box::new(id));
        query_parameters.push(Box::new(user_id));

        let query_string = format!(
            "UPDATE \"transaction\" SET {}
             WHERE id = ?{id_index} AND user_id = ?{user_id_index}
             RETURNING {TRANSACTION_COLUMNS}",
            set_clause_parts.join(", ")
        );

        self.lock()?
            .prepare(&query_string)?
            .query_row(params_from_iter(query_parameters.iter()), map_transaction_row)
            .map_err(|error| error.into())
    }

    /// Delete one of the user's transactions.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if `id` does not exist or belongs to another user.
    fn delete(&self, user_id: UserID, id: TransactionId) -> Result<(), Error> {
        let rows_affected = self.lock()?.execute(
            "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;

        match rows_affected {
            0 => Err(Error::NotFound),
            _ => Ok(()),
        }
    }

    /// Query for the user's transactions, newest first.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] there is a SQL error.
    fn fetch(
        &self,
        user_id: UserID,
        criteria: &TransactionCriteria,
    ) -> Result<Vec<Transaction>, Error> {
        let mut where_clause_parts = vec!["user_id = ?1".to_owned()];
        let mut query_parameters: Vec<Box<dyn ToSql>> = vec![Box::new(user_id)];

        let mut filter = |condition: &str, value: Box<dyn ToSql>| {
            query_parameters.push(value);
            where_clause_parts.push(condition.replace('?', &format!("?{}", query_parameters.len())));
        };

        if let Some(start_date) = criteria.start_date {
            filter("transaction_date >= ?", Box::new(start_date));
        }
        if let Some(end_date) = criteria.end_date {
            filter("transaction_date <= ?", Box::new(end_date));
        }
        if let Some(transaction_type) = criteria.transaction_type {
            filter("transaction_type = ?", Box::new(transaction_type));
        }
        if let Some(category) = criteria.category {
            filter("category = ?", Box::new(category));
        }
        if let Some(tags) = &criteria.tags {
            filter("instr(tags, ?) > 0", Box::new(tags.clone()));
        }
        if let Some(payment_method) = &criteria.payment_method {
            filter("payment_method = ?", Box::new(payment_method.clone()));
        }
        if let Some(status) = criteria.status {
            filter("status = ?", Box::new(status));
        }
        if let Some(frequency) = criteria.frequency {
            filter("frequency = ?", Box::new(frequency));
        }

        let query_string = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE {}
             ORDER BY transaction_date DESC, created_at DESC, rowid DESC",
            where_clause_parts.join(" AND ")
        );
        tracing::debug!(%user_id, query = %query_string, "fetching transactions");

        self.lock()?
            .prepare(&query_string)?
            .query_map(params_from_iter(query_parameters.iter()), map_transaction_row)?
            .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
            .collect()
    }
}

/// Create the transaction table and its indexes.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id TEXT PRIMARY KEY NOT NULL,
                user_id INTEGER NOT NULL,
                transaction_type TEXT NOT NULL CHECK (transaction_type IN ('expense', 'credit')),
                transaction_date TEXT NOT NULL,
                amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
                category TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '',
                notes TEXT,
                payment_method TEXT NOT NULL DEFAULT 'cash',
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'completed', 'cancelled')),
                frequency TEXT NOT NULL DEFAULT 'none'
                    CHECK (frequency IN ('none', 'daily', 'weekly', 'monthly', 'yearly')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date
         ON \"transaction\"(user_id, transaction_date)",
        (),
    )?;

    Ok(())
}

/// Map a row selected with the standard column order to a [Transaction].
///
/// # Errors
/// Returns an error if a column is missing or holds a value of the wrong type.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let tags: String = row.get(6)?;

    Ok(Transaction {
        transaction_id: row.get(0)?,
        user_id: row.get(1)?,
        transaction_type: row.get(2)?,
        transaction_date: row.get(3)?,
        amount: Amount::from_cents_unchecked(row.get(4)?),
        category: row.get(5)?,
        tags: Tags::parse(&tags),
        notes: row.get(7)?,
        payment_method: row.get(8)?,
        status: row.get(9)?,
        frequency: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}
