//! User registration, log-in and session token verification.
//!
//! Transaction operations never see credentials, only the [UserID] that an
//! [Authenticator] resolved from a session token.

mod token;

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use time::{Duration, OffsetDateTime};

pub use token::{IssuedToken, Session, SessionToken};

use crate::{
    Error,
    password::{PasswordHash, ValidatedPassword},
    user::{User, UserID, Username, create_user, get_user_by_id, get_user_by_username},
};

/// The default lifetime of a session.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::hours(24);

/// Resolves session tokens to users.
pub trait Authenticator {
    /// Get the user that owns `token`.
    ///
    /// # Errors
    /// Returns [Error::Unauthenticated] if the token is unknown or expired.
    fn verify(&self, token: &str) -> Result<UserID, Error>;
}

/// Manages users and sessions stored in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteAuthenticator {
    connection: Arc<Mutex<Connection>>,
    session_duration: Duration,
    hash_cost: u32,
}

impl SQLiteAuthenticator {
    /// Create an authenticator that issues sessions lasting `session_duration`.
    pub fn new(connection: Arc<Mutex<Connection>>, session_duration: Duration) -> Self {
        Self {
            connection,
            session_duration,
            hash_cost: PasswordHash::DEFAULT_COST,
        }
    }

    /// Set the bcrypt cost used when hashing new passwords.
    pub fn with_hash_cost(mut self, hash_cost: u32) -> Self {
        self.hash_cost = hash_cost;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire the database lock: {error}");
            Error::DatabaseLockError
        })
    }

    /// Register a new user.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Validation] if the username is malformed,
    /// - [Error::TooWeak] if the password is too easy to guess,
    /// - [Error::DuplicateUsername] if the username is taken,
    /// - or [Error::HashingError] if the password could not be hashed.
    pub fn register(&self, raw_username: &str, raw_password: &str) -> Result<User, Error> {
        let username = Username::new(raw_username)?;
        let password = ValidatedPassword::new(raw_password, &[username.as_str()])?;
        let password_hash = PasswordHash::new(password, self.hash_cost)?;

        let connection = self.lock()?;
        let user = create_user(username, password_hash, &connection)?;
        tracing::info!(user_id = %user.id, username = %user.username, "registered user");

        Ok(user)
    }

    /// Check a username and password and start a new session.
    ///
    /// # Errors
    /// Returns [Error::InvalidCredentials] if the user does not exist or the
    /// password is wrong, without saying which.
    pub fn log_in(&self, raw_username: &str, raw_password: &str) -> Result<IssuedToken, Error> {
        let user = Username::new(raw_username)
            .map_err(|_| Error::InvalidCredentials)
            .and_then(|username| {
                let connection = self.lock()?;
                get_user_by_username(&username, &connection).map_err(|error| match error {
                    Error::NotFound => Error::InvalidCredentials,
                    error => error,
                })
            });

        let user = match user {
            Ok(user) => user,
            Err(Error::InvalidCredentials) => {
                tracing::warn!("log-in attempt for unknown username");
                return Err(Error::InvalidCredentials);
            }
            Err(error) => return Err(error),
        };

        if !user.password_hash.verify(raw_password)? {
            tracing::warn!(user_id = %user.id, "log-in attempt with wrong password");
            return Err(Error::InvalidCredentials);
        }

        let token = SessionToken::generate();
        let expires_at = OffsetDateTime::now_utc() + self.session_duration;

        self.lock()?.execute(
            "INSERT INTO session (token_hash, user_id, expires_at) VALUES (?1, ?2, ?3)",
            (token.digest(), user.id, expires_at),
        )?;
        tracing::info!(user_id = %user.id, "logged in");

        Ok(IssuedToken {
            token,
            user_id: user.id,
            expires_at,
        })
    }

    /// Change the password of the user that owns `token`.
    ///
    /// The session for `token` stays valid, every other session of the user
    /// is ended.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Unauthenticated] if the token is unknown or expired,
    /// - [Error::InvalidCredentials] if `old_password` is wrong,
    /// - [Error::TooWeak] if the new password is too easy to guess,
    /// - or [Error::HashingError] if the new password could not be hashed.
    pub fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), Error> {
        let user_id = self.verify(token)?;
        let user = {
            let connection = self.lock()?;
            get_user_by_id(user_id, &connection)?
        };

        if !user.password_hash.verify(old_password)? {
            tracing::warn!(user_id = %user.id, "password change with wrong current password");
            return Err(Error::InvalidCredentials);
        }

        let password = ValidatedPassword::new(new_password, &[user.username.as_str()])?;
        let password_hash = PasswordHash::new(password, self.hash_cost)?;
        let current_token_hash = SessionToken::new_unchecked(token).digest();

        let connection = self.lock()?;
        let transaction = connection.unchecked_transaction()?;

        let rows_affected = transaction.execute(
            "UPDATE user SET password = ?1 WHERE id = ?2",
            (&password_hash, user.id),
        )?;

        if rows_affected != 1 {
            tracing::error!(
                user_id = %user.id,
                "updating the password affected {rows_affected} users, expected 1"
            );
            return Err(Error::NotFound);
        }

        let ended_sessions = transaction.execute(
            "DELETE FROM session WHERE user_id = ?1 AND token_hash != ?2",
            (user.id, &current_token_hash),
        )?;
        transaction.commit()?;
        tracing::info!(user_id = %user.id, ended_sessions, "changed password");

        Ok(())
    }

    /// End the session for `token`.
    ///
    /// # Errors
    /// Returns [Error::Unauthenticated] if there is no such session.
    pub fn log_out(&self, token: &str) -> Result<(), Error> {
        let token = SessionToken::new_unchecked(token);
        let rows_affected = self.lock()?.execute(
            "DELETE FROM session WHERE token_hash = ?1",
            (token.digest(),),
        )?;

        match rows_affected {
            0 => Err(Error::Unauthenticated),
            _ => {
                tracing::info!("logged out");
                Ok(())
            }
        }
    }
}

impl Authenticator for SQLiteAuthenticator {
    fn verify(&self, token: &str) -> Result<UserID, Error> {
        let token = SessionToken::new_unchecked(token);
        let token_hash = token.digest();
        let connection = self.lock()?;

        let session = connection
            .query_row(
                "SELECT user_id, expires_at FROM session WHERE token_hash = ?1",
                (&token_hash,),
                |row| {
                    Ok(Session {
                        user_id: row.get(0)?,
                        expires_at: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or(Error::Unauthenticated)?;

        if session.is_expired_at(OffsetDateTime::now_utc()) {
            connection.execute("DELETE FROM session WHERE token_hash = ?1", (&token_hash,))?;
            tracing::warn!(user_id = %session.user_id, "rejected expired session token");
            return Err(Error::Unauthenticated);
        }

        Ok(session.user_id)
    }
}

/// Create the session table.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS session (
                token_hash TEXT PRIMARY KEY NOT NULL,
                user_id INTEGER NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}
