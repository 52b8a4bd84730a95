//! Application router configuration.

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    balance::get_balance,
    endpoints,
    extract::{get_extract_entries, post_extract_entry},
    health::get_health_check,
    log_in::log_in,
    register_user::register_user,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::CADASTRO, post(register_user))
        .route(endpoints::LOGIN, post(log_in))
        .route(
            endpoints::EXTRACTS,
            post(post_extract_entry).get(get_extract_entries),
        )
        .route(endpoints::SALDO, get(get_balance))
        .route(endpoints::TESTE, get(get_health_check))
        .with_state(state)
}

#[cfg(test)]
mod router_tests {
    use std::sync::{Arc, Mutex};

    use axum::http::{StatusCode, header::AUTHORIZATION};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        AppState, db::initialize, endpoints, extract::ExtractEntryView, health::HEALTH_CHECK_BODY,
        log_in::LoginResponse,
    };

    use super::build_router;

    fn get_test_server() -> TestServer {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize schema");
        let state = AppState::new(Arc::new(Mutex::new(connection)));

        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    /// Registers a user with password `abc` and returns the token for the
    /// `authorization` header.
    async fn register_and_log_in(server: &TestServer, email: &str) -> String {
        server
            .post(endpoints::CADASTRO)
            .json(&json!({"name": "Ana", "email": email, "password": "abc"}))
            .await
            .assert_status(StatusCode::CREATED);

        let body: LoginResponse = server
            .post(endpoints::LOGIN)
            .json(&json!({"email": email, "password": "abc"}))
            .await
            .json();

        body.token
    }

    #[tokio::test]
    async fn health_check_needs_no_auth() {
        let server = get_test_server();

        let response = server.get(endpoints::TESTE).await;

        response.assert_status_ok();
        assert_eq!(response.text(), HEALTH_CHECK_BODY);
    }

    #[tokio::test]
    async fn login_reflects_the_stored_balance() {
        let server = get_test_server();
        let token = register_and_log_in(&server, "ana@foo.bar").await;

        server
            .post(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, token.as_str())
            .json(&json!({"value": 75.5, "description": "salário", "type": "entrada"}))
            .await
            .assert_status(StatusCode::CREATED);

        let body: LoginResponse = server
            .post(endpoints::LOGIN)
            .json(&json!({"email": "ana@foo.bar", "password": "abc"}))
            .await
            .json();
        assert_eq!(body.saldo, 75.5);
    }

    #[tokio::test]
    async fn credit_posting_updates_balance_and_listing() {
        let server = get_test_server();
        let token = register_and_log_in(&server, "ana@foo.bar").await;

        server
            .post(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, token.as_str())
            .json(&json!({"value": 50, "description": "salário", "type": "entrada"}))
            .await
            .assert_status(StatusCode::CREATED);

        let saldo = server
            .get(endpoints::SALDO)
            .add_header(AUTHORIZATION, token.as_str())
            .await
            .text();
        assert_eq!(saldo, "50");

        let entries: Vec<ExtractEntryView> = server
            .get(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, token.as_str())
            .await
            .json();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, "50,00");
        assert_eq!(entries[0].description, "salário");
    }

    #[tokio::test]
    async fn debit_posting_subtracts_the_exact_value() {
        let server = get_test_server();
        let token = register_and_log_in(&server, "ana@foo.bar").await;

        server
            .post(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, token.as_str())
            .json(&json!({"value": 50, "description": "salário", "type": "entrada"}))
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, token.as_str())
            .json(&json!({"value": 30.7, "description": "mercado", "type": "saida"}))
            .await
            .assert_status(StatusCode::CREATED);

        let saldo = server
            .get(endpoints::SALDO)
            .add_header(AUTHORIZATION, token.as_str())
            .await
            .text();
        assert_eq!(saldo, (50.0_f64 - 30.7).to_string());

        // The listing shows the same number that was applied to the balance.
        let entries: Vec<ExtractEntryView> = server
            .get(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, token.as_str())
            .await
            .json();
        assert_eq!(entries[1].value, "30,70");
    }

    #[tokio::test]
    async fn concurrent_credits_are_not_lost() {
        let server = get_test_server();
        let token = register_and_log_in(&server, "ana@foo.bar").await;

        let payload = json!({"value": 10, "description": "depósito", "type": "entrada"});
        let first = server
            .post(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, token.as_str())
            .json(&payload);
        let second = server
            .post(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, token.as_str())
            .json(&payload);

        let (first, second) = tokio::join!(first, second);
        first.assert_status(StatusCode::CREATED);
        second.assert_status(StatusCode::CREATED);

        let saldo = server
            .get(endpoints::SALDO)
            .add_header(AUTHORIZATION, token.as_str())
            .await
            .text();
        assert_eq!(saldo, "20");
    }

    #[tokio::test]
    async fn invalid_entry_kind_is_rejected() {
        let server = get_test_server();
        let token = register_and_log_in(&server, "ana@foo.bar").await;

        server
            .post(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, token.as_str())
            .json(&json!({"value": 10, "description": "x", "type": "transferencia"}))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn empty_description_is_rejected() {
        let server = get_test_server();
        let token = register_and_log_in(&server, "ana@foo.bar").await;

        server
            .post(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, token.as_str())
            .json(&json!({"value": 10, "description": "", "type": "entrada"}))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn non_numeric_value_is_rejected() {
        let server = get_test_server();
        let token = register_and_log_in(&server, "ana@foo.bar").await;

        server
            .post(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, token.as_str())
            .json(&json!({"value": "10", "description": "x", "type": "entrada"}))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unknown_identifier_resolves_before_body_validation() {
        let server = get_test_server();

        // Invalid body AND unknown caller: the caller wins, per the posting
        // contract.
        server
            .post(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, "999")
            .json(&json!({"value": "not a number"}))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listing_with_unknown_identifier_is_not_found() {
        let server = get_test_server();

        server
            .get(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, "999")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn postings_are_isolated_per_account() {
        let server = get_test_server();
        let ana = register_and_log_in(&server, "ana@foo.bar").await;
        let bia = register_and_log_in(&server, "bia@foo.bar").await;

        server
            .post(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, ana.as_str())
            .json(&json!({"value": 10, "description": "depósito", "type": "entrada"}))
            .await
            .assert_status(StatusCode::CREATED);

        let bia_saldo = server
            .get(endpoints::SALDO)
            .add_header(AUTHORIZATION, bia.as_str())
            .await
            .text();
        assert_eq!(bia_saldo, "0");

        let bia_entries: Vec<ExtractEntryView> = server
            .get(endpoints::EXTRACTS)
            .add_header(AUTHORIZATION, bia.as_str())
            .await
            .json();
        assert!(bia_entries.is_empty());
    }
}
