//! The registration endpoint for creating a user and its zero-balance account.

use std::str::FromStr;

use axum::{
    Json,
    extract::{FromRequest, State},
    http::StatusCode,
};
use email_address::EmailAddress;
use rusqlite::{Transaction, TransactionBehavior};
use serde::Deserialize;

use crate::{
    Error, PasswordHash, ValidatedPassword,
    account::create_account,
    state::AppState,
    user::{create_user, get_user_by_email},
};

/// The raw registration payload.
#[derive(Debug, Deserialize, FromRequest)]
#[from_request(via(Json), rejection(Error))]
pub struct RegisterPayload {
    /// The display name of the new user.
    pub name: String,
    /// The email address the user will log in with.
    pub email: String,
    /// The plain-text password.
    pub password: String,
}

/// The registration payload after validation, with typed fields.
struct ValidatedRegistration {
    name: String,
    email: EmailAddress,
    password: ValidatedPassword,
}

impl RegisterPayload {
    /// Check the payload and convert it into typed values.
    ///
    /// The email is lowercased so lookups and the UNIQUE column always see
    /// one casing.
    fn validate(self) -> Result<ValidatedRegistration, Error> {
        if self.name.is_empty() {
            return Err(Error::Validation);
        }

        let email = EmailAddress::from_str(&self.email).map_err(|_| Error::Validation)?;
        let email = EmailAddress::new_unchecked(email.to_string().to_lowercase());

        let password = ValidatedPassword::new(&self.password)?;

        Ok(ValidatedRegistration {
            name: self.name,
            email,
            password,
        })
    }
}

/// Handler for registration requests.
///
/// The user row and its zero-balance account row are inserted in one SQL
/// transaction: a crash between the two inserts cannot leave a user without
/// an account.
pub async fn register_user(
    State(state): State<AppState>,
    payload: RegisterPayload,
) -> Result<StatusCode, Error> {
    let data = payload.validate()?;

    let password_hash = PasswordHash::new(data.password, PasswordHash::DEFAULT_COST)?;

    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    if get_user_by_email(&data.email, &connection).is_ok() {
        return Err(Error::DuplicateEmail);
    }

    let transaction = Transaction::new_unchecked(&connection, TransactionBehavior::Immediate)?;
    let user = create_user(&data.name, data.email, password_hash, &transaction)?;
    create_account(user.id, &transaction)?;
    transaction.commit()?;

    Ok(StatusCode::CREATED)
}

#[cfg(test)]
mod register_user_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{AppState, db::initialize, endpoints, user::UserID};

    use super::register_user;

    fn get_test_server() -> (TestServer, AppState) {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize schema");
        let state = AppState::new(Arc::new(Mutex::new(connection)));

        let app = Router::new()
            .route(endpoints::CADASTRO, post(register_user))
            .with_state(state.clone());

        (
            TestServer::try_new(app).expect("Could not create test server."),
            state,
        )
    }

    #[tokio::test]
    async fn register_succeeds_with_valid_payload() {
        let (server, _state) = get_test_server();

        let response = server
            .post(endpoints::CADASTRO)
            .json(&json!({
                "name": "Ana",
                "email": "ana@foo.bar",
                "password": "abc",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        assert!(response.text().is_empty());
    }

    #[tokio::test]
    async fn register_creates_a_zero_balance_account() {
        let (server, state) = get_test_server();

        server
            .post(endpoints::CADASTRO)
            .json(&json!({
                "name": "Ana",
                "email": "ana@foo.bar",
                "password": "abc",
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let connection = state.db_connection.lock().unwrap();
        let account = crate::account::get_account_by_user(UserID::new(1), &connection)
            .expect("registration should have created an account");
        assert_eq!(account.balance, 0.0);
    }

    #[tokio::test]
    async fn register_same_email_twice_conflicts() {
        let (server, _state) = get_test_server();
        let payload = json!({
            "name": "Ana",
            "email": "ana@foo.bar",
            "password": "abc",
        });

        server
            .post(endpoints::CADASTRO)
            .json(&payload)
            .await
            .assert_status(StatusCode::CREATED);

        server
            .post(endpoints::CADASTRO)
            .json(&payload)
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn duplicate_detection_ignores_email_case() {
        let (server, _state) = get_test_server();

        server
            .post(endpoints::CADASTRO)
            .json(&json!({
                "name": "Ana",
                "email": "Ana@Foo.Bar",
                "password": "abc",
            }))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .post(endpoints::CADASTRO)
            .json(&json!({
                "name": "Ana",
                "email": "ana@foo.bar",
                "password": "abc",
            }))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn two_character_password_is_rejected() {
        let (server, _state) = get_test_server();

        server
            .post(endpoints::CADASTRO)
            .json(&json!({
                "name": "Ana",
                "email": "ana@foo.bar",
                "password": "ab",
            }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn three_character_password_is_accepted() {
        let (server, _state) = get_test_server();

        server
            .post(endpoints::CADASTRO)
            .json(&json!({
                "name": "Ana",
                "email": "ana@foo.bar",
                "password": "abc",
            }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let (server, _state) = get_test_server();

        server
            .post(endpoints::CADASTRO)
            .json(&json!({
                "name": "",
                "email": "ana@foo.bar",
                "password": "abc",
            }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let (server, _state) = get_test_server();

        server
            .post(endpoints::CADASTRO)
            .json(&json!({
                "name": "Ana",
                "email": "not-an-email",
                "password": "abc",
            }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn missing_field_is_rejected() {
        let (server, _state) = get_test_server();

        server
            .post(endpoints::CADASTRO)
            .json(&json!({
                "name": "Ana",
                "email": "ana@foo.bar",
            }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}
