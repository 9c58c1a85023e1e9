//! HTTP handlers for the report API.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use axum_extra::extract::{Query, QueryRejection};
use rusqlite::Connection;
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::{AppState, Error, ReportConfig, timezone::get_local_offset};

use super::{
    facade::{build_report, build_retention},
    request::{RawReportQuery, ReportRequest, RetentionQuery},
    response::{CohortRow, Envelope, Report, RetentionMeta},
    runner::run_with_timeout,
};

/// The state needed to serve reports.
#[derive(Debug, Clone)]
pub struct ReportState {
    /// The connection to the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// How reports are computed.
    pub config: ReportConfig,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            config: state.report_config,
        }
    }
}

/// Serve a chart or table report.
pub async fn get_report(
    State(state): State<ReportState>,
    query: Result<Query<RawReportQuery>, QueryRejection>,
) -> Result<Json<Report>, Error> {
    let Query(query) = query.map_err(|rejection| Error::InvalidQuery(rejection.to_string()))?;
    let request = ReportRequest::parse(query, state.config.max_buckets)?;
    let disabled_funds = state.config.disabled_funds;

    let report = run_with_timeout(
        state.db_connection,
        state.config.request_timeout,
        move |connection| build_report(connection, &request, disabled_funds),
    )
    .await?;

    Ok(Json(report))
}

/// Serve the retention of recurring plans, grouped into monthly cohorts.
pub async fn get_retention_report(
    State(state): State<ReportState>,
    query: Result<Query<RetentionQuery>, QueryRejection>,
) -> Result<Json<Envelope<Vec<CohortRow>, RetentionMeta>>, Error> {
    let Query(query) = query.map_err(|rejection| Error::InvalidQuery(rejection.to_string()))?;
    let range = query.parse()?;

    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let today = OffsetDateTime::now_utc().to_offset(local_offset).date();

    let report = run_with_timeout(
        state.db_connection,
        state.config.request_timeout,
        move |connection| build_retention(connection, range, today),
    )
    .await?;

    Ok(Json(report))
}

/// Report that the server is up.
pub async fn get_health() -> Json<Value> {
    Json(json!({ "success": true }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{Router, http::StatusCode, routing::get};
    use axum_test::TestServer;
    use serde_json::Value;
    use time::macros::datetime;

    use crate::{
        AppState, ReportConfig,
        dimension::DisabledFunds,
        endpoints,
        frequency::Cadence,
        ledger::{Transaction, TransactionDetail, create_fund, create_transaction},
    };

    use super::{get_health, get_report, get_retention_report};

    fn get_test_state() -> AppState {
        get_test_state_with_timeout(Duration::from_secs(5))
    }

    fn get_test_state_with_timeout(request_timeout: Duration) -> AppState {
        let connection = rusqlite::Connection::open_in_memory().unwrap();
        AppState::new(
            connection,
            "Etc/UTC",
            ReportConfig {
                request_timeout,
                disabled_funds: DisabledFunds::Include,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn get_test_server(state: AppState) -> TestServer {
        let app = Router::new()
            .route(endpoints::REPORTS, get(get_report))
            .route(endpoints::RETENTION_REPORT, get(get_retention_report))
            .route(endpoints::HEALTH, get(get_health))
            .with_state(state);

        TestServer::new(app)
    }

    #[tokio::test]
    async fn chart_report_is_dense() {
        let state = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(
                Transaction::build(50.0, datetime!(2024-01-02 12:00), "1001")
                    .detail(TransactionDetail::build(Cadence::OneTime, 50.0)),
                &connection,
            )
            .unwrap();
        }
        let server = get_test_server(state);

        let response = server
            .get(endpoints::REPORTS)
            .add_query_param("start", "2024-01-01")
            .add_query_param("end", "2024-01-03")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["meta"]["mode"], "chart");
        assert_eq!(body["meta"]["buckets"], 3);
        let amounts: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|point| (point["bucket"].as_str().unwrap(), point["amount"].as_f64().unwrap()))
            .collect();
        assert_eq!(
            amounts,
            vec![("2024-01-01", 0.0), ("2024-01-02", 50.0), ("2024-01-03", 0.0)]
        );
    }

    #[tokio::test]
    async fn repeated_and_comma_separated_ids_are_combined() {
        let state = get_test_state();
        let fund_ids: Vec<_> = {
            let connection = state.db_connection.lock().unwrap();
            ["A", "B", "C"]
                .iter()
                .enumerate()
                .map(|(index, name)| {
                    let fund = create_fund(name, None, &connection).unwrap();
                    create_transaction(
                        Transaction::build(10.0, datetime!(2024-01-02 12:00), &index.to_string())
                            .detail(TransactionDetail::build(Cadence::OneTime, 10.0).fund_id(fund.id)),
                        &connection,
                    )
                    .unwrap();
                    fund.id
                })
                .collect()
        };
        let server = get_test_server(state);

        let response = server
            .get(&format!(
                "{}?start=2024-01-01&end=2024-01-03&mode=table&dimension=fund&fund_id={},{}&fund_id={}",
                endpoints::REPORTS,
                fund_ids[0],
                fund_ids[1],
                fund_ids[2]
            ))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["meta"]["mode"], "table");
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"][0]["dimensionLabel"], "A");
        assert_eq!(body["data"][0]["totalRaised"], 10.0);
        assert_eq!(body["data"][0]["oneTimeMedian"], 10.0);
        assert_eq!(body["data"][0]["recurringMedian"], 0.0);
    }

    #[tokio::test]
    async fn invalid_input_is_a_bad_request() {
        let server = get_test_server(get_test_state());

        for query in [
            "end=2024-01-03",
            "start=2024-13-01&end=2024-01-03",
            "start=2024-01-03&end=2024-01-01",
            "start=2024-01-01&end=2024-01-03&granularity=hourly",
            "start=2024-01-01&end=2024-01-03&appeal_id=one",
            "start=2024-01-01&end=2024-01-03&mode=table&dimension=kind",
        ] {
            let response = server
                .get(&format!("{}?{query}", endpoints::REPORTS))
                .expect_failure()
                .await;

            response.assert_status(StatusCode::BAD_REQUEST);
            let body: Value = response.json();
            assert_eq!(body["success"], false, "query {query}");
            assert_eq!(body["meta"]["kind"], "invalid-input", "query {query}");
            assert_eq!(body["meta"]["retriable"], false, "query {query}");
        }
    }

    #[tokio::test]
    async fn retention_report_has_a_cohort_per_month() {
        let server = get_test_server(get_test_state());

        let response = server
            .get(endpoints::RETENTION_REPORT)
            .add_query_param("start", "2024-01-15")
            .add_query_param("end", "2024-03-02")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let months: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|cohort| cohort["month"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(months, vec!["2024-01-01", "2024-02-01", "2024-03-01"]);
        assert_eq!(body["meta"]["months"], 12);
    }

    #[tokio::test]
    async fn retention_report_requires_dates() {
        let server = get_test_server(get_test_state());

        let response = server
            .get(endpoints::RETENTION_REPORT)
            .expect_failure()
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_timezone_is_a_server_error() {
        let mut state = get_test_state();
        state.local_timezone = "Middle/Earth".to_owned();
        let server = get_test_server(state);

        let response = server
            .get(endpoints::RETENTION_REPORT)
            .add_query_param("start", "2024-01-01")
            .add_query_param("end", "2024-01-31")
            .expect_failure()
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["meta"]["kind"], "upstream");
        assert_eq!(body["meta"]["retriable"], false);
    }

    #[tokio::test]
    async fn huge_range_is_rejected_without_blocking_later_reports() {
        let server = get_test_server(get_test_state_with_timeout(Duration::from_millis(200)));

        let rejected = server
            .get(endpoints::REPORTS)
            .add_query_param("start", "0001-01-01")
            .add_query_param("end", "9999-12-31")
            .add_query_param("dimension", "kind")
            .expect_failure()
            .await;

        rejected.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = rejected.json();
        assert_eq!(body["meta"]["kind"], "invalid-input");

        let next = server
            .get(endpoints::REPORTS)
            .add_query_param("start", "2024-01-01")
            .add_query_param("end", "2024-01-03")
            .await;

        next.assert_status_ok();
    }

    #[tokio::test]
    async fn slow_report_is_a_retriable_timeout() {
        let state = get_test_state_with_timeout(Duration::from_millis(50));
        let connection = state.db_connection.clone();
        let server = get_test_server(state);

        // Holding the connection keeps the report from finishing in time.
        let guard = connection.lock().unwrap();
        let response = server
            .get(endpoints::REPORTS)
            .add_query_param("start", "2024-01-01")
            .add_query_param("end", "2024-01-03")
            .expect_failure()
            .await;
        drop(guard);

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["meta"]["kind"], "unavailable");
        assert_eq!(body["meta"]["retriable"], true);
    }

    #[tokio::test]
    async fn health_check() {
        let server = get_test_server(get_test_state());

        let response = server.get(endpoints::HEALTH).await;

        response.assert_status_ok();
        response.assert_json(&serde_json::json!({ "success": true }));
    }
}
