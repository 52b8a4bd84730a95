//! Code for creating the account table and maintaining per-user balances.
//!
//! Every user owns exactly one account. The balance is only ever changed by
//! [apply_to_balance], which performs the arithmetic inside the database so
//! that concurrent postings cannot lose an update.

use std::fmt::Display;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{Error, db::timestamp_now, user::UserID};

/// A newtype wrapper for integer account IDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountID(i64);

impl AccountID {
    /// Create a new account ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the account ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for AccountID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The balance record owned by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The account's ID in the application database.
    pub id: AccountID,
    /// The user that owns this account.
    pub user_id: UserID,
    /// The running balance: credits minus debits.
    pub balance: f64,
}

/// Create the account table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
                id INTEGER PRIMARY KEY,
                user_id INTEGER UNIQUE NOT NULL,
                balance REAL NOT NULL,
                created_at TEXT NOT NULL,
                edited_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id)
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert the account for `user_id` with a balance of zero.
///
/// # Errors
///
/// This function will return an error if the user already has an account or
/// if there was an unexpected SQL error.
pub fn create_account(user_id: UserID, connection: &Connection) -> Result<Account, Error> {
    let timestamp = timestamp_now();

    connection.execute(
        "INSERT INTO account (user_id, balance, created_at, edited_at)
            VALUES (?1, 0.0, ?2, ?3)",
        (user_id.as_i64(), &timestamp, &timestamp),
    )?;

    let id = AccountID::new(connection.last_insert_rowid());

    Ok(Account {
        id,
        user_id,
        balance: 0.0,
    })
}

/// Get the account owned by `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` has no account.
/// - there was an error trying to access the store.
pub fn get_account_by_user(user_id: UserID, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare("SELECT id, user_id, balance FROM account WHERE user_id = :user_id")?
        .query_row(&[(":user_id", &user_id.as_i64())], |row| {
            Ok(Account {
                id: AccountID::new(row.get(0)?),
                user_id: UserID::new(row.get(1)?),
                balance: row.get(2)?,
            })
        })
        .map_err(|error| error.into())
}

/// Atomically add `delta` to the account's balance.
///
/// The arithmetic happens in the UPDATE statement itself, not in application
/// code, so two postings applied concurrently both land even if they read the
/// account at the same time. Pass a negative `delta` to debit the account.
///
/// # Errors
///
/// This function will return an error if:
/// - `account_id` does not refer to an existing account.
/// - there was an error trying to access the store.
pub fn apply_to_balance(
    account_id: AccountID,
    delta: f64,
    connection: &Connection,
) -> Result<(), Error> {
    let updated = connection.execute(
        "UPDATE account SET balance = balance + ?1, edited_at = ?2 WHERE id = ?3",
        (delta, timestamp_now(), account_id.as_i64()),
    )?;

    if updated == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
