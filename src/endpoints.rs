//! The API endpoint URIs.

/// The route for chart and table reports.
pub const REPORTS: &str = "/api/reports";
/// The route for the retention of recurring donation plans.
pub const RETENTION_REPORT: &str = "/api/reports/retention";
/// The route for checking the server is up.
pub const HEALTH: &str = "/api/health";

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::REPORTS);
        assert_endpoint_is_valid_uri(endpoints::RETENTION_REPORT);
        assert_endpoint_is_valid_uri(endpoints::HEALTH);
    }
}
