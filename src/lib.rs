//! Fintrack is a personal expense and income tracker.
//!
//! Users register, log in for a session token, and then record and query
//! their transactions through a set of token-authenticated tools. Each tool
//! takes JSON arguments and returns a JSON result, so the same operations can
//! be driven from the command line or by an assistant.
//!
//! Amounts are exact decimals stored as integer cents. Every report is
//! computed from the caller's own transactions only.

mod app_state;
pub mod auth;
pub mod config;
pub mod db;
mod error;
pub mod logging;
mod password;
mod timezone;
pub mod tools;
pub mod transaction;
pub mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::{AppState, SQLiteToolRunner};
pub use error::Error;
pub use password::{PasswordHash, ValidatedPassword};
pub use timezone::{get_local_offset, local_today};
pub use tools::{ToolCall, ToolResponse, ToolRunner};
pub use user::{User, UserID, Username};
