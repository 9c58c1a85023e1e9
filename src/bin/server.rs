use std::{
    fs::OpenOptions,
    net::SocketAddr,
    process::exit,
    sync::Arc,
    time::Duration,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::{Connection, OpenFlags};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use donation_reports::{
    AppState, DEFAULT_MAX_BUCKETS, DisabledFunds, ReportConfig, build_router, get_local_offset,
    graceful_shutdown, logging_middleware,
};

/// The JSON API server for donation reports.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database holding the donation ledger.
    #[arg(long, env = "DONATION_REPORTS_DB_PATH")]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, env = "DONATION_REPORTS_PORT", default_value_t = 3000)]
    port: u16,

    /// The canonical name of the local timezone, e.g. "Pacific/Auckland".
    #[arg(long, env = "DONATION_REPORTS_TIMEZONE", default_value = "Etc/UTC")]
    timezone: String,

    /// How many seconds a report may take before it is aborted.
    #[arg(long, env = "DONATION_REPORTS_REQUEST_TIMEOUT", default_value_t = 30)]
    request_timeout_secs: u64,

    /// The largest number of time buckets a chart may have.
    #[arg(long, env = "DONATION_REPORTS_MAX_BUCKETS", default_value_t = DEFAULT_MAX_BUCKETS)]
    max_buckets: u64,

    /// Leave disabled funds out of reports.
    #[arg(long, env = "DONATION_REPORTS_EXCLUDE_DISABLED_FUNDS")]
    exclude_disabled_funds: bool,

    /// Log every request and response body.
    #[arg(long)]
    log_bodies: bool,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    if get_local_offset(&args.timezone).is_none() {
        tracing::error!("Invalid timezone {}", args.timezone);
        exit(1);
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let conn = Connection::open_with_flags(
        &args.db_path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )
    .unwrap_or_else(|error| {
        tracing::error!("Could not open database file at {}: {error}", args.db_path);
        exit(1);
    });

    let report_config = ReportConfig {
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        disabled_funds: if args.exclude_disabled_funds {
            DisabledFunds::Exclude
        } else {
            DisabledFunds::Include
        },
        max_buckets: args.max_buckets,
    };

    let state = AppState::new(conn, &args.timezone, report_config).unwrap_or_else(|error| {
        tracing::error!("Could not initialize the database: {error}");
        exit(1);
    });

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state);
    let router = if args.log_bodies {
        router.layer(middleware::from_fn(logging_middleware))
    } else {
        router
    };
    let router = add_tracing_layer(router);

    tracing::info!("HTTP server listening on {}", addr);
    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("Server stopped unexpectedly: {error}");
        exit(1);
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(env_filter),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged when they are converted into responses.
        .on_failure(());

    router.layer(tracing_layer)
}
