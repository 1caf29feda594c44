//! Defines the transaction store trait.

use crate::{Error, user::UserID};

use super::{
    criteria::TransactionCriteria,
    models::{NewTransaction, Transaction, TransactionId, TransactionUpdate},
};

/// Handles the creation, retrieval, update and deletion of transactions.
///
/// Every method is scoped to a single user. Implementers must never return,
/// change or delete a transaction owned by another user, and must report a
/// transaction owned by another user exactly like a missing one:
/// [Error::NotFound].
pub trait TransactionStore {
    /// Create a new transaction owned by `user_id`.
    ///
    /// The store assigns a fresh ID and sets both audit timestamps.
    fn create(&self, user_id: UserID, builder: NewTransaction) -> Result<Transaction, Error>;

    /// Retrieve one of the user's transactions.
    fn get(&self, user_id: UserID, id: TransactionId) -> Result<Transaction, Error>;

    /// Apply a partial update to one of the user's transactions.
    ///
    /// Either every supplied field is written or none are. `updated_at` is
    /// refreshed even when `update` is empty.
    fn update(
        &self,
        user_id: UserID,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> Result<Transaction, Error>;

    /// Permanently delete one of the user's transactions.
    fn delete(&self, user_id: UserID, id: TransactionId) -> Result<(), Error>;

    /// Fetch the user's transactions that match every criterion.
    ///
    /// Results are ordered newest first by transaction date, then by creation
    /// time, newest first.
    fn fetch(
        &self,
        user_id: UserID,
        criteria: &TransactionCriteria,
    ) -> Result<Vec<Transaction>, Error>;
}
