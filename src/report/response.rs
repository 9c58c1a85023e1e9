//! The JSON bodies of successful report responses.
//!
//! Dates are formatted as `YYYY-MM-DD` strings.

use serde::Serialize;

/// The body of every successful response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<D, M> {
    /// Always `true`, failures use the error envelope instead.
    pub success: bool,
    /// The report rows.
    pub data: D,
    /// What the report covers.
    pub meta: M,
}

impl<D, M> Envelope<D, M> {
    /// Wrap a successful result.
    pub fn new(data: D, meta: M) -> Self {
        Self {
            success: true,
            data,
            meta,
        }
    }
}

/// One point of a chart report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    /// The first day of the bucket.
    pub bucket: String,
    /// The key of the dimension value.
    pub dimension_key: String,
    /// The display name of the dimension value.
    pub dimension_label: String,
    /// The sum of the transaction totals.
    pub amount: f64,
    /// The number of distinct transactions.
    pub count: u64,
}

/// What a chart report covers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    /// The first day of the range.
    pub start: String,
    /// The last day of the range.
    pub end: String,
    /// `daily` or `weekly`.
    pub granularity: &'static str,
    /// The dimension the report is grouped by.
    pub dimension: &'static str,
    /// The number of time buckets.
    pub buckets: u64,
    /// Always `chart`.
    pub mode: &'static str,
}

/// One row of a table report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    /// The key of the dimension value.
    pub dimension_key: String,
    /// The display name of the dimension value.
    pub dimension_label: String,
    /// The number of distinct transactions.
    pub donation_count: u64,
    /// The median one-time donation, zero if there were none.
    pub one_time_median: f64,
    /// The median recurring donation, zero if there were none.
    pub recurring_median: f64,
    /// The sum of the transaction totals.
    pub total_raised: f64,
    /// The mean transaction total, zero if there were none.
    pub average_donation: f64,
}

/// What a table report covers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMeta {
    /// The first day of the range.
    pub start: String,
    /// The last day of the range.
    pub end: String,
    /// The dimension the report is grouped by.
    pub dimension: &'static str,
    /// Always `table`.
    pub mode: &'static str,
}

/// Either shape of report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    /// A time series.
    Chart(Envelope<Vec<ChartPoint>, ChartMeta>),
    /// Totals per dimension value.
    Table(Envelope<Vec<TableRow>, TableMeta>),
}

/// The retention of one monthly cohort.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortRow {
    /// The first day of the cohort's month.
    pub month: String,
    /// The number of plans that started in the month.
    pub size: usize,
    /// The percentage of plans active in each following month, `null` for
    /// months that have not happened yet.
    pub retention: Vec<Option<f64>>,
}

/// What a retention report covers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionMeta {
    /// The first day of the range of start dates.
    pub start: String,
    /// The last day of the range of start dates.
    pub end: String,
    /// The number of months tracked per cohort.
    pub months: u32,
    /// The first day of the current month, later months are unknown.
    pub current_month: String,
}
