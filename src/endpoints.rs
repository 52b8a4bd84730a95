//! The API endpoint URIs.

/// The route for registering a new user and their account.
pub const CADASTRO: &str = "/cadastro";
/// The route for logging in a user.
pub const LOGIN: &str = "/login";
/// The route for posting and listing extract entries.
pub const EXTRACTS: &str = "/extracts";
/// The route for reading the raw account balance.
pub const SALDO: &str = "/saldo";
/// The health-check route.
pub const TESTE: &str = "/teste";
