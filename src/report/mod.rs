//! The report facade and the HTTP handlers that serve it.
//!
//! Chart and table reports share the same predicate and dimension axis, so a
//! chart and its companion table always agree on which values they show.

mod facade;
mod handlers;
mod request;
mod response;
mod runner;

pub use handlers::{get_health, get_report, get_retention_report};
