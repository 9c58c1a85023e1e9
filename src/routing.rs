//! Application router configuration.

use axum::{Router, routing::get};

use crate::{
    AppState, endpoints,
    not_found::get_404_not_found,
    report::{get_health, get_report, get_retention_report},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::REPORTS, get(get_report))
        .route(endpoints::RETENTION_REPORT, get(get_retention_report))
        .route(endpoints::HEALTH, get(get_health))
        .fallback(get_404_not_found)
        .with_state(state)
}
