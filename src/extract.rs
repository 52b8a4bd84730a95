//! The extract ledger: entry model, the posting operation, and the /extracts
//! request handlers.
//!
//! Posting is the one operation that touches two records — the entry and the
//! account balance — and it must keep `balance == credits - debits` true for
//! every account. [record_entry] does both writes in a single SQL transaction
//! with the balance change expressed as an in-database increment.

use axum::{
    Json,
    extract::{FromRequest, State},
    http::StatusCode,
};
use rusqlite::{
    Connection, Transaction, TransactionBehavior,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, macros::format_description};

use crate::{
    Error,
    account::{AccountID, apply_to_balance, get_account_by_user},
    auth::AccountHolder,
    state::AppState,
    user::get_user_by_id,
};

/// Whether an extract entry credits or debits the account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// A credit: the value is added to the account balance.
    #[serde(rename = "entrada")]
    Entrada,
    /// A debit: the value is subtracted from the account balance.
    #[serde(rename = "saida")]
    Saida,
}

impl EntryKind {
    /// The value stored in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Entrada => "entrada",
            EntryKind::Saida => "saida",
        }
    }

    /// The signed amount to apply to the account balance for an entry of
    /// `value`.
    pub fn signed(&self, value: f64) -> f64 {
        match self {
            EntryKind::Entrada => value,
            EntryKind::Saida => -value,
        }
    }
}

impl ToSql for EntryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EntryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "entrada" => Ok(EntryKind::Entrada),
            "saida" => Ok(EntryKind::Saida),
            other => Err(FromSqlError::Other(
                format!("unknown entry kind {other:?}").into(),
            )),
        }
    }
}

/// A single immutable ledger line belonging to an account.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractEntry {
    /// The entry's ID in the application database.
    pub id: i64,
    /// The account the entry belongs to.
    pub account_id: AccountID,
    /// The amount, exactly as requested by the client.
    pub value: f64,
    /// Free-text description of the entry.
    pub description: String,
    /// Whether the entry credits or debits the account.
    pub kind: EntryKind,
    /// The day/month label captured when the entry was posted, e.g. `07/08`.
    pub date: String,
}

/// Create the extract entry table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_extract_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS extract_entry (
                id INTEGER PRIMARY KEY,
                account_id INTEGER NOT NULL,
                value REAL NOT NULL,
                description TEXT NOT NULL,
                kind TEXT NOT NULL,
                date TEXT NOT NULL,
                FOREIGN KEY(account_id) REFERENCES account(id)
                )",
        (),
    )?;

    Ok(())
}

/// Insert an extract entry and apply its value to the account balance.
///
/// Both writes happen in one SQL transaction: the entry and the balance
/// change become visible together or not at all. The balance change goes
/// through [apply_to_balance], so concurrent postings against the same
/// account cannot lose an update. The stored entry value and the applied
/// delta are the same number.
///
/// # Errors
///
/// This function will return an error if:
/// - `account_id` does not refer to an existing account.
/// - there was an error trying to access the store.
pub fn record_entry(
    account_id: AccountID,
    kind: EntryKind,
    value: f64,
    description: &str,
    connection: &Connection,
) -> Result<ExtractEntry, Error> {
    let date = date_label();

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    transaction.execute(
        "INSERT INTO extract_entry (account_id, value, description, kind, date)
            VALUES (?1, ?2, ?3, ?4, ?5)",
        (account_id.as_i64(), value, description, kind, &date),
    )?;
    let id = transaction.last_insert_rowid();

    apply_to_balance(account_id, kind.signed(value), &transaction)?;

    transaction.commit()?;

    Ok(ExtractEntry {
        id,
        account_id,
        value,
        description: description.to_owned(),
        kind,
        date,
    })
}

/// Get all extract entries for `account_id` in insertion order.
///
/// # Errors
///
/// This function will return an error if there is an SQL error.
pub fn get_entries_by_account(
    account_id: AccountID,
    connection: &Connection,
) -> Result<Vec<ExtractEntry>, Error> {
    connection
        .prepare(
            "SELECT id, account_id, value, description, kind, date
                FROM extract_entry WHERE account_id = :account_id ORDER BY id",
        )?
        .query_map(&[(":account_id", &account_id.as_i64())], |row| {
            Ok(ExtractEntry {
                id: row.get(0)?,
                account_id: AccountID::new(row.get(1)?),
                value: row.get(2)?,
                description: row.get(3)?,
                kind: row.get(4)?,
                date: row.get(5)?,
            })
        })?
        .map(|maybe_entry| maybe_entry.map_err(|error| error.into()))
        .collect()
}

/// Format a stored value for display: fixed two decimals, decimal comma, any
/// negative sign stripped.
pub fn display_value(value: f64) -> String {
    format!("{:.2}", value.abs()).replace('.', ",")
}

/// The day/month label stamped on entries at posting time, e.g. `07/08`.
fn date_label() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!("[day]/[month]"))
        .expect("formatting a date with a constant format description cannot fail")
}

/// The payload for posting a new extract entry.
#[derive(Debug, Deserialize, FromRequest)]
#[from_request(via(Json), rejection(Error))]
pub struct ExtractPayload {
    /// The amount to credit or debit.
    pub value: f64,
    /// Free-text description of the entry.
    pub description: String,
    /// Exactly `entrada` or `saida`.
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// Handler for recording a new extract entry against the caller's account.
///
/// The caller is resolved before the payload is inspected: an unknown
/// identifier is 404 even when the body would also have failed validation.
pub async fn post_extract_entry(
    State(state): State<AppState>,
    AccountHolder(user_id): AccountHolder,
    payload: Result<ExtractPayload, Error>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    let user = get_user_by_id(user_id, &connection)?;

    let payload = payload?;
    if payload.description.is_empty() {
        return Err(Error::Validation);
    }

    let account = get_account_by_user(user.id, &connection)?;

    record_entry(
        account.id,
        payload.kind,
        payload.value,
        &payload.description,
        &connection,
    )?;

    Ok(StatusCode::CREATED)
}

/// One row of the extract listing, with the value already formatted for
/// display.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ExtractEntryView {
    /// The display form of the amount, e.g. `50,00`.
    pub value: String,
    /// Free-text description of the entry.
    pub description: String,
    /// Whether the entry credits or debits the account.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// The day/month label captured when the entry was posted.
    pub date: String,
}

impl From<ExtractEntry> for ExtractEntryView {
    fn from(entry: ExtractEntry) -> Self {
        Self {
            value: display_value(entry.value),
            description: entry.description,
            kind: entry.kind,
            date: entry.date,
        }
    }
}

/// Handler for listing the caller's extract entries in insertion order.
pub async fn get_extract_entries(
    State(state): State<AppState>,
    AccountHolder(user_id): AccountHolder,
) -> Result<Json<Vec<ExtractEntryView>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    let user = get_user_by_id(user_id, &connection)?;
    let account = get_account_by_user(user.id, &connection)?;
    let entries = get_entries_by_account(account.id, &connection)?;

    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
