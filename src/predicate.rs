//! Builds the predicate describing which ledger rows qualify for a report.
//!
//! A [Predicate] is a plain value: a date range plus one [Clause] per
//! restricted dimension. It has no side effects and knows nothing about SQL.
//! The ledger reader translates it into a query with bound parameters.

use time::{Date, macros::format_description};

use crate::{
    Error,
    database_id::{AppealId, FundId},
    dimension::Dimension,
    frequency::{DonationKind, FrequencyFilter},
};

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// The first day of the range.
    pub start: Date,
    /// The last day of the range.
    pub end: Date,
}

impl DateRange {
    /// Create a date range.
    ///
    /// # Errors
    /// Returns [Error::InvalidDateRange] if `start` is after `end`.
    pub fn new(start: Date, end: Date) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidDateRange { start, end });
        }

        Ok(Self { start, end })
    }

    /// Parse a date range from `YYYY-MM-DD` strings.
    ///
    /// # Errors
    /// Returns [Error::MissingParameter] if a bound is missing or empty,
    /// [Error::InvalidDate] if a bound is not a calendar date, or
    /// [Error::InvalidDateRange] if `start` is after `end`.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, Error> {
        let start = parse_date("start", start)?;
        let end = parse_date("end", end)?;

        Self::new(start, end)
    }

    /// The day after the range, for half-open comparisons against timestamps.
    ///
    /// A timestamp `t` is in the range when `start <= t < end_exclusive`.
    pub fn end_exclusive(&self) -> Date {
        self.end.next_day().unwrap_or(Date::MAX)
    }
}

fn parse_date(field: &'static str, value: Option<&str>) -> Result<Date, Error> {
    let value = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(Error::MissingParameter(field))?;

    Date::parse(value, format_description!("[year]-[month]-[day]")).map_err(|_| Error::InvalidDate {
        field,
        value: value.to_owned(),
    })
}

/// One restriction on the rows that qualify for a report.
///
/// Values inside a clause are OR-combined, clauses are AND-combined.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// The line item belongs to one of these appeals.
    Appeals(Vec<AppealId>),
    /// The line item belongs to one of these funds.
    Funds(Vec<FundId>),
    /// The transaction matches this kind, installment position or cadence.
    Frequency(FrequencyFilter),
    /// The transaction was paid with this payment method.
    PaymentMethod(String),
    /// The donor lives in this country.
    Country(String),
}

impl Clause {
    /// Whether this clause restricts the values of `dimension`.
    pub fn restricts(&self, dimension: Dimension) -> bool {
        matches!(
            (self, dimension),
            (Clause::Appeals(_), Dimension::Appeal)
                | (Clause::Funds(_), Dimension::Fund)
                | (Clause::Frequency(_), Dimension::Kind | Dimension::Cadence)
                | (Clause::PaymentMethod(_), Dimension::PaymentMethod)
                | (Clause::Country(_), Dimension::Country)
        )
    }
}

/// Describes which ledger rows qualify for a report.
///
/// Only transactions with a qualifying status are ever considered, that rule
/// is applied by the reader and is not a clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    range: DateRange,
    clauses: Vec<Clause>,
}

impl Predicate {
    /// Start building a predicate for the given date range.
    pub fn build(range: DateRange) -> PredicateBuilder {
        PredicateBuilder {
            range,
            clauses: Vec::new(),
        }
    }

    /// The date range transactions must fall in.
    pub fn range(&self) -> DateRange {
        self.range
    }

    /// The dimension restrictions, in the order they were added.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// The same predicate without the clause restricting `dimension`.
    ///
    /// Used to enumerate the active values of a dimension under every other
    /// filter of a request.
    pub fn without_dimension(&self, dimension: Dimension) -> Predicate {
        Predicate {
            range: self.range,
            clauses: self
                .clauses
                .iter()
                .filter(|clause| !clause.restricts(dimension))
                .cloned()
                .collect(),
        }
    }
}

/// A builder for creating [Predicate] instances.
///
/// Empty selections add no clause: an empty list of appeals means "any
/// appeal", never "no appeal".
#[derive(Debug, Clone)]
pub struct PredicateBuilder {
    range: DateRange,
    clauses: Vec<Clause>,
}

impl PredicateBuilder {
    /// Restrict to line items in any of `appeal_ids`.
    pub fn appeals(mut self, appeal_ids: Vec<AppealId>) -> Self {
        if !appeal_ids.is_empty() {
            self.clauses.push(Clause::Appeals(appeal_ids));
        }
        self
    }

    /// Restrict to line items in any of `fund_ids`.
    pub fn funds(mut self, fund_ids: Vec<FundId>) -> Self {
        if !fund_ids.is_empty() {
            self.clauses.push(Clause::Funds(fund_ids));
        }
        self
    }

    /// Restrict by donation kind or frequency, `frequency` taking precedence.
    pub fn frequency(
        mut self,
        kind: Option<DonationKind>,
        frequency: Option<FrequencyFilter>,
    ) -> Self {
        if let Some(filter) = FrequencyFilter::resolve(kind, frequency) {
            self.clauses.push(Clause::Frequency(filter));
        }
        self
    }

    /// Restrict to transactions paid with `payment_method`.
    pub fn payment_method(mut self, payment_method: Option<String>) -> Self {
        if let Some(payment_method) = payment_method.filter(|method| !method.is_empty()) {
            self.clauses.push(Clause::PaymentMethod(payment_method));
        }
        self
    }

    /// Restrict to donors from `country`.
    pub fn country(mut self, country: Option<String>) -> Self {
        if let Some(country) = country.filter(|country| !country.is_empty()) {
            self.clauses.push(Clause::Country(country));
        }
        self
    }

    /// Finish building the predicate.
    pub fn finalize(self) -> Predicate {
        Predicate {
            range: self.range,
            clauses: self.clauses,
        }
    }
}
