//! Defines the opaque session token handed out at log-in and the session it refers to.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::user::UserID;

/// A bearer token identifying a logged in session.
///
/// The token itself is only known to the caller, the database stores its
/// [digest](SessionToken::digest).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a new random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap a token supplied by a caller.
    pub fn new_unchecked(token: &str) -> Self {
        Self(token.trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hex encoded SHA-256 digest of the token.
    pub fn digest(&self) -> String {
        format!("{:x}", Sha256::digest(self.0.as_bytes()))
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(********)")
    }
}

/// A session as stored in the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: UserID,
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// Whether the session can no longer be used at `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// What a user receives after logging in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedToken {
    pub token: SessionToken,
    pub user_id: UserID,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}
