//! Shapes aggregator output into report responses.

use time::Date;

use crate::{
    Error,
    aggregation::Aggregator,
    bucket::count_buckets,
    cohort::{RETENTION_MONTHS, build_cohorts, month_start},
    dimension::{Dimension, DisabledFunds},
    predicate::DateRange,
    reader::LedgerReader,
};

use super::{
    request::{ReportMode, ReportRequest},
    response::{
        ChartMeta, ChartPoint, CohortRow, Envelope, Report, RetentionMeta, TableMeta, TableRow,
    },
};

/// Build the report selected by `request.mode`.
///
/// # Errors
/// Returns an error if the request cannot be served or the ledger cannot be
/// read.
pub fn build_report<L>(
    reader: &L,
    request: &ReportRequest,
    disabled_funds: DisabledFunds,
) -> Result<Report, Error>
where
    L: LedgerReader + ?Sized,
{
    tracing::debug!(
        "Building {} report grouped by {} for {} to {}",
        request.mode.as_query_value(),
        request.dimension.as_query_value(),
        request.predicate.range().start,
        request.predicate.range().end
    );

    match request.mode {
        ReportMode::Chart => build_chart(reader, request, disabled_funds).map(Report::Chart),
        ReportMode::Table => build_table(reader, request, disabled_funds).map(Report::Table),
    }
}

/// Build a dense time series.
///
/// # Errors
/// Returns any error raised by the reader.
pub fn build_chart<L>(
    reader: &L,
    request: &ReportRequest,
    disabled_funds: DisabledFunds,
) -> Result<Envelope<Vec<ChartPoint>, ChartMeta>, Error>
where
    L: LedgerReader + ?Sized,
{
    let range = request.predicate.range();

    let points: Vec<ChartPoint> = Aggregator::new(reader, disabled_funds)
        .chart(&request.predicate, request.dimension, request.granularity)?
        .into_iter()
        .map(|row| ChartPoint {
            bucket: row.bucket.label().to_string(),
            dimension_key: row.dimension.key,
            dimension_label: row.dimension.label,
            amount: row.totals.amount,
            count: row.totals.count,
        })
        .collect();

    Ok(Envelope::new(
        points,
        ChartMeta {
            start: range.start.to_string(),
            end: range.end.to_string(),
            granularity: request.granularity.as_query_value(),
            dimension: request.dimension.as_query_value(),
            buckets: count_buckets(range.start, range.end, request.granularity),
            mode: ReportMode::Chart.as_query_value(),
        },
    ))
}

/// Build one row of totals and medians per dimension value.
///
/// # Errors
/// Returns [Error::UnsupportedTableDimension] when grouping by kind or
/// cadence, since the medians are already split by kind, or any error raised
/// by the reader.
pub fn build_table<L>(
    reader: &L,
    request: &ReportRequest,
    disabled_funds: DisabledFunds,
) -> Result<Envelope<Vec<TableRow>, TableMeta>, Error>
where
    L: LedgerReader + ?Sized,
{
    if matches!(request.dimension, Dimension::Kind | Dimension::Cadence) {
        return Err(Error::UnsupportedTableDimension(
            request.dimension.as_query_value(),
        ));
    }

    let range = request.predicate.range();

    let rows = Aggregator::new(reader, disabled_funds)
        .totals(&request.predicate, request.dimension)?
        .into_iter()
        .map(|row| TableRow {
            donation_count: row.totals.count,
            one_time_median: row.medians.one_time.unwrap_or(0.0),
            recurring_median: row.medians.recurring.unwrap_or(0.0),
            total_raised: row.totals.amount,
            average_donation: row.totals.average(),
            dimension_key: row.dimension.key,
            dimension_label: row.dimension.label,
        })
        .collect();

    Ok(Envelope::new(
        rows,
        TableMeta {
            start: range.start.to_string(),
            end: range.end.to_string(),
            dimension: request.dimension.as_query_value(),
            mode: ReportMode::Table.as_query_value(),
        },
    ))
}

/// Build the retention of the monthly cohorts of plans started in `range`.
///
/// # Errors
/// Returns any error raised by the reader.
pub fn build_retention<L>(
    reader: &L,
    range: DateRange,
    today: Date,
) -> Result<Envelope<Vec<CohortRow>, RetentionMeta>, Error>
where
    L: LedgerReader + ?Sized,
{
    tracing::debug!("Building retention report for {} to {}", range.start, range.end);

    let rows = build_cohorts(reader, range, today)?
        .into_iter()
        .map(|cohort| CohortRow {
            month: cohort.month.to_string(),
            size: cohort.size,
            retention: cohort.retention,
        })
        .collect();

    Ok(Envelope::new(
        rows,
        RetentionMeta {
            start: range.start.to_string(),
            end: range.end.to_string(),
            months: RETENTION_MONTHS,
            current_month: month_start(today).to_string(),
        },
    ))
}
