//! The health-check endpoint.

/// The static body returned by the health check.
pub const HEALTH_CHECK_BODY: &str = "testando";

/// Handler that acknowledges the service is up without touching any state.
pub async fn get_health_check() -> &'static str {
    HEALTH_CHECK_BODY
}
