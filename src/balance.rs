//! The balance read endpoint.

use axum::extract::State;

use crate::{
    Error, account::get_account_by_user, auth::AccountHolder, state::AppState,
    user::get_user_by_id,
};

/// Handler that returns the caller's raw balance as plain text.
///
/// The number is rendered in its shortest round-trip form, e.g. `0`, `19.3`.
pub async fn get_balance(
    State(state): State<AppState>,
    AccountHolder(user_id): AccountHolder,
) -> Result<String, Error> {
    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    let user = get_user_by_id(user_id, &connection)?;
    let account = get_account_by_user(user.id, &connection)?;

    Ok(account.balance.to_string())
}
