//! Resolving the caller's identity from the `authorization` request header.
//!
//! The header carries the raw user identifier that log-in returned as the
//! `token` field. The value is not signed, so this is identification rather
//! than authentication; the scheme is isolated here so a signed-token scheme
//! only has to replace this extractor.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::{Error, user::UserID};

/// The account holder named by the `authorization` request header.
///
/// A missing, non-UTF-8, or non-numeric header rejects with the same 404 as
/// an identifier that resolves to no user. Handlers still look the user up
/// before touching any account data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountHolder(pub UserID);

impl<S> FromRequestParts<S> for AccountHolder
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(|id| AccountHolder(UserID::new(id)))
            .ok_or(Error::NotFound)
    }
}
