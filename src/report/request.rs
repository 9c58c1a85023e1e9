//! Parses and validates report requests.
//!
//! Query parameters are deserialized as plain strings and parsed here, so that
//! every validation failure is reported with the JSON error envelope.

use std::str::FromStr;

use serde::Deserialize;

use crate::{
    Error,
    bucket::{Granularity, count_buckets},
    database_id::DatabaseId,
    dimension::Dimension,
    frequency::{DonationKind, FrequencyFilter},
    predicate::{DateRange, Predicate},
};

/// The query string of a report request, before validation.
///
/// `appeal_id` and `fund_id` may be repeated and may contain comma separated
/// lists.
#[derive(Debug, Default, Deserialize)]
pub struct RawReportQuery {
    /// The first day of the report, `YYYY-MM-DD`.
    pub start: Option<String>,
    /// The last day of the report, `YYYY-MM-DD`.
    pub end: Option<String>,
    /// `daily` or `weekly`.
    pub granularity: Option<String>,
    /// `chart` or `table`.
    pub mode: Option<String>,
    /// The dimension to group by.
    pub dimension: Option<String>,
    /// Appeal IDs to restrict the report to.
    #[serde(default)]
    pub appeal_id: Vec<String>,
    /// Fund IDs to restrict the report to.
    #[serde(default)]
    pub fund_id: Vec<String>,
    /// The coarse donation kind, `one-time` or `recurring`.
    pub kind: Option<String>,
    /// The fine donation frequency, overrides `kind`.
    pub frequency: Option<String>,
    /// The payment method to restrict the report to.
    pub payment_method: Option<String>,
    /// The donor country to restrict the report to.
    pub country: Option<String>,
}

/// The shape of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// A time series with one row per bucket and dimension value.
    #[default]
    Chart,
    /// One row per dimension value over the whole range.
    Table,
}

impl ReportMode {
    /// The value used in query strings and report output.
    pub fn as_query_value(self) -> &'static str {
        match self {
            ReportMode::Chart => "chart",
            ReportMode::Table => "table",
        }
    }
}

impl FromStr for ReportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chart" => Ok(ReportMode::Chart),
            "table" => Ok(ReportMode::Table),
            other => Err(Error::InvalidMode(other.to_owned())),
        }
    }
}

/// A validated report request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    /// Which ledger rows qualify for the report.
    pub predicate: Predicate,
    /// The size of the time buckets of chart reports.
    pub granularity: Granularity,
    /// The dimension to group by.
    pub dimension: Dimension,
    /// The shape of the report.
    pub mode: ReportMode,
}

impl ReportRequest {
    /// Validate a raw query.
    ///
    /// Charts over ranges with more than `max_buckets` buckets are rejected,
    /// since every bucket is materialized in memory.
    ///
    /// # Errors
    /// Returns the validation error of the first invalid parameter, or
    /// [Error::RangeTooLarge].
    pub fn parse(query: RawReportQuery, max_buckets: u64) -> Result<Self, Error> {
        let range = DateRange::parse(query.start.as_deref(), query.end.as_deref())?;
        let granularity = parse_optional(query.granularity.as_deref())?.unwrap_or_default();
        let mode = parse_optional(query.mode.as_deref())?.unwrap_or_default();
        let dimension = parse_optional(query.dimension.as_deref())?.unwrap_or_default();
        let kind: Option<DonationKind> = parse_optional(query.kind.as_deref())?;
        let frequency: Option<FrequencyFilter> = parse_optional(query.frequency.as_deref())?;

        if mode == ReportMode::Chart {
            let buckets = count_buckets(range.start, range.end, granularity);
            if buckets > max_buckets {
                return Err(Error::RangeTooLarge {
                    buckets,
                    limit: max_buckets,
                });
            }
        }

        let predicate = Predicate::build(range)
            .appeals(parse_ids("appeal_id", &query.appeal_id)?)
            .funds(parse_ids("fund_id", &query.fund_id)?)
            .frequency(kind, frequency)
            .payment_method(non_empty(query.payment_method))
            .country(non_empty(query.country))
            .finalize();

        Ok(Self {
            predicate,
            granularity,
            dimension,
            mode,
        })
    }
}

/// The query string of a retention report request.
#[derive(Debug, Default, Deserialize)]
pub struct RetentionQuery {
    /// The first day plans may have started on, `YYYY-MM-DD`.
    pub start: Option<String>,
    /// The last day plans may have started on, `YYYY-MM-DD`.
    pub end: Option<String>,
}

impl RetentionQuery {
    /// Validate the requested range of start dates.
    ///
    /// # Errors
    /// Returns an error if either bound is missing or invalid, or if the
    /// bounds are reversed.
    pub fn parse(&self) -> Result<DateRange, Error> {
        DateRange::parse(self.start.as_deref(), self.end.as_deref())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Parse an optional parameter, treating an empty value as missing.
fn parse_optional<T>(value: Option<&str>) -> Result<Option<T>, Error>
where
    T: FromStr<Err = Error>,
{
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::parse)
        .transpose()
}

fn parse_ids(field: &'static str, values: &[String]) -> Result<Vec<DatabaseId>, Error> {
    let mut ids = Vec::new();

    for value in values.iter().flat_map(|value| value.split(',')) {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        let id: DatabaseId = value.parse().map_err(|_| Error::InvalidId {
            field,
            value: value.to_owned(),
        })?;

        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    Ok(ids)
}
