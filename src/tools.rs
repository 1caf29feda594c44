//! Dispatches token-authenticated tool calls to the transaction service.
//!
//! A call names a tool and carries its arguments as a JSON object:
//!
//! ```json
//! {"tool": "get_summary", "arguments": {"transaction_type": "expense"}}
//! ```
//!
//! Tools without arguments take an empty object. Every call produces a
//! [ToolResponse], failures included.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    Error,
    auth::Authenticator,
    transaction::{
        FilterInput, TotalInput, TransactionInput, TransactionPatch, TransactionService,
        TransactionStore, ValidationError,
    },
};

/// A tool invocation with its raw arguments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    AddTransaction(TransactionInput),
    BulkAddTransactions { transactions: Vec<TransactionInput> },
    UpdateTransaction(TransactionPatch),
    BulkUpdateTransactions { transactions: Vec<TransactionPatch> },
    DeleteTransaction { transaction_id: String },
    BulkDeleteTransactions { transaction_ids: Vec<String> },
    GetAllTransactions {},
    GetTransactionsByDateRange { start_date: String, end_date: String },
    GetTotal(TotalInput),
    GetTopCategories {},
    GetSummary(FilterInput),
    GetBalance {},
    GetMonthlyReport { year: i32, month: u8 },
    GetCategories {},
}

impl ToolCall {
    /// Parse a tool call from JSON text.
    ///
    /// # Errors
    /// Returns an [Error::Validation] on the field `arguments` if the text is
    /// not a known tool with well formed arguments.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|error| {
            ValidationError::new("arguments", format!("could not parse the tool call: {error}"))
                .into()
        })
    }

    /// The tool name, as used in the `tool` field.
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::AddTransaction(_) => "add_transaction",
            ToolCall::BulkAddTransactions { .. } => "bulk_add_transactions",
            ToolCall::UpdateTransaction(_) => "update_transaction",
            ToolCall::BulkUpdateTransactions { .. } => "bulk_update_transactions",
            ToolCall::DeleteTransaction { .. } => "delete_transaction",
            ToolCall::BulkDeleteTransactions { .. } => "bulk_delete_transactions",
            ToolCall::GetAllTransactions {} => "get_all_transactions",
            ToolCall::GetTransactionsByDateRange { .. } => "get_transactions_by_date_range",
            ToolCall::GetTotal(_) => "get_total",
            ToolCall::GetTopCategories {} => "get_top_categories",
            ToolCall::GetSummary(_) => "get_summary",
            ToolCall::GetBalance {} => "get_balance",
            ToolCall::GetMonthlyReport { .. } => "get_monthly_report",
            ToolCall::GetCategories {} => "get_categories",
        }
    }
}

/// The structured result of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResponse {
    Success {
        data: Value,
    },
    Error {
        /// A stable tag, see [Error::kind].
        kind: &'static str,
        message: String,
    },
}

impl From<Error> for ToolResponse {
    fn from(error: Error) -> Self {
        ToolResponse::Error {
            kind: error.kind(),
            message: error.public_message(),
        }
    }
}

/// Runs tool calls on behalf of the user that owns the supplied token.
#[derive(Debug, Clone)]
pub struct ToolRunner<A, S> {
    authenticator: A,
    transactions: TransactionService<S>,
}

impl<A, S> ToolRunner<A, S>
where
    A: Authenticator,
    S: TransactionStore,
{
    pub fn new(authenticator: A, transactions: TransactionService<S>) -> Self {
        Self {
            authenticator,
            transactions,
        }
    }

    /// Verify `token` and run `call` for its user.
    ///
    /// Nothing is read or written if the token is rejected.
    pub fn run(&self, token: &str, call: &ToolCall) -> ToolResponse {
        match self.dispatch(token, call) {
            Ok(data) => ToolResponse::Success { data },
            Err(error) => {
                tracing::info!(tool = call.name(), kind = error.kind(), "tool call failed: {error}");
                error.into()
            }
        }
    }

    fn dispatch(&self, token: &str, call: &ToolCall) -> Result<Value, Error> {
        let user_id = self.authenticator.verify(token)?;
        tracing::info!(%user_id, tool = call.name(), "running tool");

        let service = &self.transactions;

        match call {
            ToolCall::AddTransaction(input) => to_data(service.add(user_id, input)?),
            ToolCall::BulkAddTransactions { transactions } => {
                to_data(service.add_many(user_id, transactions)?)
            }
            ToolCall::UpdateTransaction(patch) => to_data(service.update(
                user_id,
                &patch.transaction_id,
                &patch.changes,
            )?),
            ToolCall::BulkUpdateTransactions { transactions } => {
                to_data(service.update_many(user_id, transactions)?)
            }
            ToolCall::DeleteTransaction { transaction_id } => {
                let transaction_id = service.delete(user_id, transaction_id)?;
                Ok(json!({ "deleted": true, "transaction_id": transaction_id }))
            }
            ToolCall::BulkDeleteTransactions { transaction_ids } => {
                to_data(service.delete_many(user_id, transaction_ids)?)
            }
            ToolCall::GetAllTransactions {} => to_data(service.list_all(user_id)?),
            ToolCall::GetTransactionsByDateRange {
                start_date,
                end_date,
            } => to_data(service.list_range(user_id, start_date, end_date)?),
            ToolCall::GetTotal(input) => to_data(service.total(user_id, input)?),
            ToolCall::GetTopCategories {} => to_data(service.top_categories(user_id)?),
            ToolCall::GetSummary(filters) => to_data(service.summary(user_id, filters)?),
            ToolCall::GetBalance {} => to_data(service.balance(user_id)?),
            ToolCall::GetMonthlyReport { year, month } => {
                to_data(service.monthly_report(user_id, *year, *month)?)
            }
            ToolCall::GetCategories {} => to_data(service.categories()),
        }
    }
}

fn to_data(value: impl Serialize) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|error| {
        tracing::error!("could not serialize tool result: {error}");
        Error::SerializationError(error.to_string())
    })
}
