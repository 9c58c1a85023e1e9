//! Defines the app level error type and its conversion to JSON error envelopes.

use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use time::Date;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A required query parameter was not provided.
    #[error("missing required parameter \"{0}\"")]
    MissingParameter(&'static str),

    /// A date parameter could not be parsed as a calendar date.
    #[error("could not parse {field} \"{value}\" as a calendar date, expected YYYY-MM-DD")]
    InvalidDate {
        /// The name of the offending parameter.
        field: &'static str,
        /// The text that failed to parse.
        value: String,
    },

    /// The start of a date range was after its end.
    ///
    /// Callers must swap the bounds themselves, they are never swapped silently.
    #[error("the start date {start} is after the end date {end}")]
    InvalidDateRange {
        /// The requested start date.
        start: Date,
        /// The requested end date.
        end: Date,
    },

    /// The time granularity was not one of the supported values.
    #[error("\"{0}\" is not a valid granularity, expected \"daily\" or \"weekly\"")]
    InvalidGranularity(String),

    /// The report mode was not one of the supported values.
    #[error("\"{0}\" is not a valid report mode, expected \"chart\" or \"table\"")]
    InvalidMode(String),

    /// The grouping dimension was not one of the supported values.
    #[error("\"{0}\" is not a valid report dimension")]
    InvalidDimension(String),

    /// The dimension cannot be used in the requested report mode.
    #[error("the dimension \"{0}\" cannot be used for table reports")]
    UnsupportedTableDimension(&'static str),

    /// The donation kind or frequency selector was not recognised.
    #[error("\"{0}\" is not a valid donation frequency")]
    InvalidFrequency(String),

    /// A list of dimension IDs contained something other than an integer.
    #[error("{field} must be a list of numeric IDs, got \"{value}\"")]
    InvalidId {
        /// The name of the offending parameter.
        field: &'static str,
        /// The text that failed to parse.
        value: String,
    },

    /// A chart over the requested range would have too many time buckets.
    #[error("the range covers {buckets} buckets, at most {limit} are allowed, use a shorter range or weekly granularity")]
    RangeTooLarge {
        /// The number of buckets the range covers.
        buckets: u64,
        /// The largest number of buckets allowed.
        limit: u64,
    },

    /// A chart would have too many points, one per bucket and dimension value.
    #[error("the report has {points} points, at most {limit} are allowed, narrow the filters or the range")]
    ReportTooLarge {
        /// The number of points the report would have.
        points: usize,
        /// The largest number of points allowed.
        limit: usize,
    },

    /// The query string could not be deserialized at all.
    #[error("could not parse the query string: {0}")]
    InvalidQuery(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// The running SQL statement was aborted through the connection's
    /// interrupt handle.
    #[error("the database query was interrupted")]
    QueryInterrupted,

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The blocking task computing a report panicked or was cancelled.
    #[error("the report worker failed: {0}")]
    WorkerError(String),

    /// The report could not be computed within the request timeout.
    #[error("the report did not finish within {0:?}")]
    Timeout(Duration),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

/// How a failure should be reported to, and handled by, the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request was malformed. Retrying the same request will fail again.
    InvalidInput,
    /// The requested resource does not exist.
    NotFound,
    /// The ledger could not be read. Safe to retry with backoff.
    Upstream,
    /// The ledger read took too long. Safe to retry with backoff.
    Unavailable,
}

impl ErrorClass {
    fn status_code(self) -> StatusCode {
        match self {
            ErrorClass::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
            ErrorClass::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorClass::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ErrorClass::InvalidInput => "invalid-input",
            ErrorClass::NotFound => "not-found",
            ErrorClass::Upstream => "upstream",
            ErrorClass::Unavailable => "unavailable",
        }
    }
}

impl Error {
    /// The class of failure, which determines the HTTP status code.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::MissingParameter(_)
            | Error::InvalidDate { .. }
            | Error::InvalidDateRange { .. }
            | Error::InvalidGranularity(_)
            | Error::InvalidMode(_)
            | Error::InvalidDimension(_)
            | Error::UnsupportedTableDimension(_)
            | Error::InvalidFrequency(_)
            | Error::InvalidId { .. }
            | Error::RangeTooLarge { .. }
            | Error::ReportTooLarge { .. }
            | Error::InvalidQuery(_) => ErrorClass::InvalidInput,
            Error::NotFound => ErrorClass::NotFound,
            Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::WorkerError(_)
            | Error::InvalidTimezoneError(_) => ErrorClass::Upstream,
            Error::QueryInterrupted | Error::Timeout(_) => ErrorClass::Unavailable,
        }
    }

    /// Whether the caller may retry the same request.
    ///
    /// The reporting core never writes, so any failure that is not the
    /// caller's fault can be retried. A misconfigured server is the
    /// exception, it fails the same way until it is restarted.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::InvalidTimezoneError(_) => false,
            _ => matches!(
                self.class(),
                ErrorClass::Upstream | ErrorClass::Unavailable
            ),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.code == rusqlite::ErrorCode::OperationInterrupted =>
            {
                Error::QueryInterrupted
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The body of every failed response.
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: String,
    meta: ErrorMeta,
}

#[derive(Debug, Serialize)]
struct ErrorMeta {
    kind: &'static str,
    retriable: bool,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let class = self.class();

        let message = match class {
            ErrorClass::InvalidInput | ErrorClass::NotFound => self.to_string(),
            ErrorClass::Unavailable => {
                tracing::warn!("Report unavailable: {}", self);
                "The report took too long to compute, try again later.".to_owned()
            }
            // Any errors not handled above are not intended to be shown to the client.
            ErrorClass::Upstream => {
                tracing::error!("An unexpected error occurred: {}", self);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
        };

        let body = ErrorEnvelope {
            success: false,
            error: message,
            meta: ErrorMeta {
                kind: class.as_str(),
                retriable: self.is_retriable(),
            },
        };

        (class.status_code(), Json(body)).into_response()
    }
}
