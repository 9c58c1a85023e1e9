//! Implements a struct that holds the state of the REST server.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::Connection;

use crate::{Error, db::initialize, dimension::DisabledFunds};

/// The default limit on how long a single report may take to compute.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The default limit on the number of time buckets in a chart, ten years of days.
pub const DEFAULT_MAX_BUCKETS: u64 = 3_660;

/// Settings that control how reports are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportConfig {
    /// Reports that take longer than this are aborted.
    pub request_timeout: Duration,
    /// Whether disabled funds appear in reports.
    pub disabled_funds: DisabledFunds,
    /// Chart requests over ranges with more buckets than this are rejected.
    pub max_buckets: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            disabled_funds: DisabledFunds::Include,
            max_buckets: DEFAULT_MAX_BUCKETS,
        }
    }
}

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection to the ledger.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// The config that controls how reports are computed.
    pub report_config: ReportConfig,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will create any missing ledger tables.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        local_timezone: &str,
        report_config: ReportConfig,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            local_timezone: local_timezone.to_owned(),
            report_config,
        })
    }
}
