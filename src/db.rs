//! Database schema initialization and shared storage helpers.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use time::{OffsetDateTime, macros::format_description};

use crate::{
    Error, account::create_account_table, extract::create_extract_table, user::create_user_table,
};

/// Create the application tables if they do not already exist.
///
/// All tables are created inside a single exclusive transaction so a partially
/// initialized schema is never left behind.
///
/// # Errors
///
/// This function will return an error if an SQL related error occurred.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_extract_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// The current UTC time as a row timestamp, e.g. `07/08/2026 13:45:12`.
///
/// User and account rows share this one format.
pub(crate) fn timestamp_now() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!(
            "[day]/[month]/[year] [hour]:[minute]:[second]"
        ))
        .expect("formatting a timestamp with a constant format description cannot fail")
}
