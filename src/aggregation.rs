//! Joins the sparse ledger aggregates onto the dense bucket and dimension axes.
//!
//! Every output has one row per bucket and active dimension value, so callers
//! never need to fill gaps themselves.

use std::collections::HashMap;

use time::Date;

use crate::{
    Error,
    bucket::{Bucket, Granularity, count_buckets, generate_buckets},
    dimension::{Dimension, DimensionValue, DisabledFunds, enumerate_active_values},
    predicate::Predicate,
    reader::{Grouping, LedgerReader},
    stats::{GroupTotals, SplitMedians, split_medians},
};

/// One point of a time series.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRow {
    /// The time interval of the point.
    pub bucket: Bucket,
    /// The dimension value of the series.
    pub dimension: DimensionValue,
    /// The sum and distinct count of the matching transactions.
    pub totals: GroupTotals,
}

/// The totals of one dimension value over the whole date range.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalsRow {
    /// The dimension value.
    pub dimension: DimensionValue,
    /// The sum and distinct count of the matching transactions.
    pub totals: GroupTotals,
    /// The median donation, split by one-time and recurring.
    pub medians: SplitMedians,
}

/// The default limit on the number of points in a chart.
pub const DEFAULT_MAX_CHART_POINTS: usize = 250_000;

/// Computes gap-free reports from a [LedgerReader].
pub struct Aggregator<'a, L: LedgerReader + ?Sized> {
    reader: &'a L,
    disabled_funds: DisabledFunds,
    max_chart_points: usize,
}

impl<'a, L: LedgerReader + ?Sized> Aggregator<'a, L> {
    /// Create an aggregator reading from `reader`.
    pub fn new(reader: &'a L, disabled_funds: DisabledFunds) -> Self {
        Self {
            reader,
            disabled_funds,
            max_chart_points: DEFAULT_MAX_CHART_POINTS,
        }
    }

    /// Set the largest number of points [Aggregator::chart] may return.
    pub fn max_chart_points(mut self, max_chart_points: usize) -> Self {
        self.max_chart_points = max_chart_points;
        self
    }

    /// The dimension values reports over `predicate` are grouped into.
    ///
    /// # Errors
    /// Returns any error raised by the reader.
    pub fn axis(
        &self,
        predicate: &Predicate,
        dimension: Dimension,
    ) -> Result<Vec<DimensionValue>, Error> {
        enumerate_active_values(self.reader, predicate, dimension, self.disabled_funds)
    }

    /// A time series with one row per bucket and active dimension value,
    /// ordered by bucket and then by the dimension axis.
    ///
    /// Combinations without transactions are zero.
    ///
    /// # Errors
    /// Returns [Error::ReportTooLarge] if the chart would have more points
    /// than allowed, or any error raised by the reader. Partial results are
    /// never returned.
    pub fn chart(
        &self,
        predicate: &Predicate,
        dimension: Dimension,
        granularity: Granularity,
    ) -> Result<Vec<ChartRow>, Error> {
        let range = predicate.range();
        let axis = self.axis(predicate, dimension)?;

        let points = usize::try_from(count_buckets(range.start, range.end, granularity))
            .unwrap_or(usize::MAX)
            .saturating_mul(axis.len());
        if points > self.max_chart_points {
            return Err(Error::ReportTooLarge {
                points,
                limit: self.max_chart_points,
            });
        }

        let buckets = generate_buckets(range.start, range.end, granularity)?;

        let mut sparse: HashMap<(Date, String), GroupTotals> = HashMap::new();
        for total in self.reader.sparse_totals(
            predicate,
            Grouping {
                granularity: Some(granularity),
                dimension,
            },
        )? {
            let Some(bucket) = total.bucket else {
                continue;
            };

            sparse
                .entry((bucket, total.key))
                .or_default()
                .merge(GroupTotals {
                    amount: total.amount,
                    count: total.count,
                });
        }

        let mut rows = Vec::with_capacity(buckets.len() * axis.len());
        for bucket in &buckets {
            for value in &axis {
                let totals = sparse
                    .get(&(bucket.start, value.key.clone()))
                    .copied()
                    .unwrap_or_default();

                rows.push(ChartRow {
                    bucket: *bucket,
                    dimension: value.clone(),
                    totals,
                });
            }
        }

        Ok(rows)
    }

    /// One row per active dimension value with its totals over the whole
    /// range, in axis order.
    ///
    /// # Errors
    /// Returns any error raised by the reader.
    pub fn totals(
        &self,
        predicate: &Predicate,
        dimension: Dimension,
    ) -> Result<Vec<TotalsRow>, Error> {
        let axis = self.axis(predicate, dimension)?;

        let mut sparse: HashMap<String, GroupTotals> = HashMap::new();
        for total in self.reader.sparse_totals(
            predicate,
            Grouping {
                granularity: None,
                dimension,
            },
        )? {
            sparse.entry(total.key).or_default().merge(GroupTotals {
                amount: total.amount,
                count: total.count,
            });
        }

        let medians = split_medians(&self.reader.donation_amounts(predicate, dimension)?);

        Ok(axis
            .into_iter()
            .map(|value| TotalsRow {
                totals: sparse.get(&value.key).copied().unwrap_or_default(),
                medians: medians.get(&value.key).copied().unwrap_or_default(),
                dimension: value,
            })
            .collect())
    }
}
