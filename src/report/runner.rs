//! Runs report queries off the async runtime, with a hard timeout.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use rusqlite::{Connection, InterruptHandle};

use crate::Error;

/// Run `job` against the shared connection on a blocking thread.
///
/// If `job` does not finish within `timeout`, the running SQL statement is
/// interrupted and [Error::Timeout] is returned. A timed out job never
/// produces a result, and the interrupt never reaches a statement run by a
/// later job.
///
/// # Errors
/// Returns [Error::Timeout] if the job took too long,
/// [Error::DatabaseLockError] if the connection lock is poisoned,
/// [Error::WorkerError] if the job panicked, or any error returned by `job`.
pub async fn run_with_timeout<T, F>(
    connection: Arc<Mutex<Connection>>,
    timeout: Duration,
    job: F,
) -> Result<T, Error>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, Error> + Send + 'static,
{
    // Holds the interrupt handle only while `job` owns the connection.
    let interrupt_slot: Arc<Mutex<Option<InterruptHandle>>> = Arc::new(Mutex::new(None));
    let cancelled = Arc::new(AtomicBool::new(false));

    let worker = {
        let interrupt_slot = interrupt_slot.clone();
        let cancelled = cancelled.clone();

        tokio::task::spawn_blocking(move || {
            let connection = connection
                .lock()
                .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
                .map_err(|_| Error::DatabaseLockError)?;

            {
                let mut slot = interrupt_slot
                    .lock()
                    .map_err(|_| Error::DatabaseLockError)?;
                if cancelled.load(Ordering::SeqCst) {
                    return Err(Error::Timeout(timeout));
                }
                *slot = Some(connection.get_interrupt_handle());
            }

            let result = job(&connection);

            if let Ok(mut slot) = interrupt_slot.lock() {
                *slot = None;
            }

            result
        })
    };

    match tokio::time::timeout(timeout, worker).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            tracing::error!("report worker failed: {join_error}");
            Err(Error::WorkerError(join_error.to_string()))
        }
        Err(_) => {
            tracing::warn!("report did not finish within {timeout:?}, interrupting the query");

            match interrupt_slot.lock() {
                Ok(slot) => {
                    cancelled.store(true, Ordering::SeqCst);
                    if let Some(handle) = slot.as_ref() {
                        handle.interrupt();
                    }
                }
                Err(error) => tracing::error!("could not interrupt the report query: {error}"),
            }

            Err(Error::Timeout(timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use crate::{Error, test_utils::get_test_connection};

    use super::run_with_timeout;

    const ENDLESS_QUERY: &str = "WITH RECURSIVE counter(x) AS (
            SELECT 1 UNION ALL SELECT x + 1 FROM counter
        )
        SELECT COUNT(*) FROM counter";

    #[tokio::test]
    async fn returns_job_result() {
        let connection = Arc::new(Mutex::new(get_test_connection()));

        let got = run_with_timeout(connection, Duration::from_secs(5), |conn| {
            Ok(conn.query_row("SELECT 40 + 2", [], |row| row.get::<_, i64>(0))?)
        })
        .await;

        assert_eq!(got, Ok(42));
    }

    #[tokio::test]
    async fn slow_query_times_out_and_is_interrupted() {
        let connection = Arc::new(Mutex::new(get_test_connection()));
        let timeout = Duration::from_millis(100);

        let got = run_with_timeout(connection.clone(), timeout, |conn| {
            Ok(conn.query_row(ENDLESS_QUERY, [], |row| row.get::<_, i64>(0))?)
        })
        .await;

        assert_eq!(got, Err(Error::Timeout(timeout)));

        // The interrupted query must release the connection for the next report.
        let next = run_with_timeout(connection, Duration::from_secs(5), |conn| {
            Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?)
        })
        .await;

        assert_eq!(next, Ok(1));
    }

    #[tokio::test]
    async fn job_errors_are_returned() {
        let connection = Arc::new(Mutex::new(get_test_connection()));

        let got: Result<(), Error> =
            run_with_timeout(connection, Duration::from_secs(5), |_| Err(Error::NotFound)).await;

        assert_eq!(got, Err(Error::NotFound));
    }

    #[tokio::test]
    async fn panicking_job_is_a_worker_error() {
        let connection = Arc::new(Mutex::new(get_test_connection()));

        let got: Result<(), Error> =
            run_with_timeout(connection, Duration::from_secs(5), |_| panic!("boom")).await;

        assert!(matches!(got, Err(Error::WorkerError(_))), "got {got:?}");
    }
}
