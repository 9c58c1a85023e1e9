//! Donation reports is a read-only analytics service over a ledger of
//! charitable donations.
//!
//! It turns the raw ledger (transactions, their detail lines, appeals, funds
//! and donors) into gap-free time series and tabular reports under any
//! combination of filters, and measures how long recurring donation plans
//! stay active.
//!
//! This library provides a JSON API that serves the reports.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod aggregation;
mod app_state;
mod bucket;
mod cohort;
mod database_id;
mod db;
mod dimension;
mod endpoints;
mod error;
mod frequency;
mod ledger;
mod logging;
mod not_found;
mod predicate;
mod reader;
mod report;
mod routing;
mod stats;
mod timezone;

#[cfg(test)]
mod test_utils;

pub use app_state::{AppState, DEFAULT_MAX_BUCKETS, ReportConfig};
pub use database_id::{AppealId, DatabaseId, DonorId, FundId, TransactionDetailId, TransactionId};
pub use db::initialize as initialize_db;
pub use dimension::DisabledFunds;
pub use error::Error;
pub use frequency::Cadence;
pub use ledger::{
    Appeal, Donor, Fund, RecurringSchedule, RecurringScheduleBuilder, Transaction,
    TransactionBuilder, TransactionDetail, TransactionDetailBuilder, TransactionStatus,
    create_appeal, create_donor, create_fund, create_recurring_schedule, create_transaction,
    set_fund_disabled,
};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use timezone::get_local_offset;

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
