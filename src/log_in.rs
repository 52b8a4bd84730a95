//! The log-in endpoint: credential verification and the session payload.

use std::str::FromStr;

use axum::{
    Json,
    extract::{FromRequest, State},
};
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};

use crate::{
    Error, account::get_account_by_user, state::AppState, user::get_user_by_email,
};

/// The log-in payload.
#[derive(Debug, Deserialize, FromRequest)]
#[from_request(via(Json), rejection(Error))]
pub struct LoginPayload {
    /// The email address the user registered with, in any casing.
    pub email: String,
    /// The plain-text password.
    pub password: String,
}

/// The body returned on a successful log-in.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    /// The identifier the client passes back in the `authorization` header.
    pub token: String,
    /// The name the user registered with.
    pub name: String,
    /// The user's stored (lowercase) email address.
    pub email: String,
    /// The account's current balance.
    pub saldo: f64,
}

/// Handler for log-in requests.
///
/// An unknown email and a wrong password both answer 404 so callers probing
/// for registered emails get the same response either way.
pub async fn log_in(
    State(state): State<AppState>,
    payload: LoginPayload,
) -> Result<Json<LoginResponse>, Error> {
    let email = EmailAddress::from_str(&payload.email).map_err(|_| Error::Validation)?;
    if payload.password.is_empty() {
        return Err(Error::Validation);
    }

    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    let user = get_user_by_email(&email, &connection)?;

    let is_password_valid = user
        .password_hash
        .verify(&payload.password)
        .map_err(|error| Error::HashingError(error.to_string()))?;
    if !is_password_valid {
        return Err(Error::InvalidCredentials);
    }

    let account = get_account_by_user(user.id, &connection)?;

    Ok(Json(LoginResponse {
        token: user.id.to_string(),
        name: user.name,
        email: user.email.to_string(),
        saldo: account.balance,
    }))
}
