//! Carteira is a small personal-finance ledger served over HTTP/JSON.
//!
//! Users register with an email and password, log in, and record credit
//! ("entrada") and debit ("saida") entries against a single per-user account
//! balance. This library provides the request handlers, the data model, and
//! the SQLite-backed storage layer; the server binary wires them together
//! with [build_router].

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod account;
mod auth;
mod balance;
mod db;
mod endpoints;
mod extract;
mod health;
mod log_in;
mod logging;
mod password;
mod register_user;
mod routing;
mod state;
mod user;

pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use state::AppState;
pub use user::{User, UserID};

/// The plain-text body returned with every 422 response.
pub const VALIDATION_ERROR_MSG: &str = "Verifique os dados e tente novamente!";

/// The plain-text body returned when registering an email that is already in use.
pub const DUPLICATE_EMAIL_ERROR_MSG: &str = "usuario já registrado!";

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request payload failed validation: a missing or mistyped field, an
    /// empty string where content is required, a malformed email address, or
    /// a password below the minimum length.
    #[error("invalid request payload")]
    Validation,

    /// The email used to register is already in use. The client should try
    /// again with a different email address.
    #[error("the email is already in use")]
    DuplicateEmail,

    /// The password did not match the stored hash.
    ///
    /// Reported to the client as 404, not 401, so callers probing for
    /// registered emails get the same response either way.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected request payload: {rejection}");
        Error::Validation
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation => {
                (StatusCode::UNPROCESSABLE_ENTITY, VALIDATION_ERROR_MSG).into_response()
            }
            Error::DuplicateEmail => {
                (StatusCode::CONFLICT, DUPLICATE_EMAIL_ERROR_MSG).into_response()
            }
            Error::NotFound | Error::InvalidCredentials => StatusCode::NOT_FOUND.into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
