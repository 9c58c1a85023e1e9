//! Read access to the donation ledger.
//!
//! Reports only ever depend on the [LedgerReader] trait, never on a concrete
//! database, so tests can substitute in-memory fakes.

mod sqlite;

use time::Date;

use crate::{
    Error,
    bucket::Granularity,
    dimension::{Dimension, DimensionValue},
    frequency::DonationKind,
    ledger::RecurringSchedule,
    predicate::{DateRange, Predicate},
};

/// Handles the read-only queries reports are built from.
///
/// Every method is a single bounded query. Implementations must only consider
/// transactions with a qualifying status whose timestamp falls in the
/// predicate's date range.
pub trait LedgerReader {
    /// Sum the totals and count the distinct transactions matching
    /// `predicate`, per bucket and dimension value.
    ///
    /// Only groups with at least one transaction are returned.
    fn sparse_totals(
        &self,
        predicate: &Predicate,
        grouping: Grouping,
    ) -> Result<Vec<SparseTotal>, Error>;

    /// The values of `dimension` with at least one transaction matching
    /// `predicate`, in no particular order.
    fn dimension_values(
        &self,
        predicate: &Predicate,
        dimension: Dimension,
    ) -> Result<Vec<DimensionValue>, Error>;

    /// Every payment method ever recorded, whatever the status or date of
    /// the transactions that used it.
    fn recorded_payment_methods(&self) -> Result<Vec<DimensionValue>, Error>;

    /// The total of each distinct transaction matching `predicate`, once per
    /// value of `dimension` it contributes to.
    fn donation_amounts(
        &self,
        predicate: &Predicate,
        dimension: Dimension,
    ) -> Result<Vec<DonationAmount>, Error>;

    /// The recurring schedules that started within `range`, oldest first.
    fn recurring_schedules(&self, range: DateRange) -> Result<Vec<RecurringSchedule>, Error>;
}

/// How [LedgerReader::sparse_totals] groups transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grouping {
    /// The size of the time buckets, or `None` for a single group over the
    /// whole range.
    pub granularity: Option<Granularity>,
    /// The dimension to group by.
    pub dimension: Dimension,
}

/// The aggregate of one non-empty group of transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseTotal {
    /// The first day of the bucket, `None` when not grouped by time.
    pub bucket: Option<Date>,
    /// The key of the dimension value.
    pub key: String,
    /// The sum of the transaction totals.
    pub amount: f64,
    /// The number of distinct transactions.
    pub count: u64,
}

/// The total of one transaction, for computing medians.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationAmount {
    /// The key of the dimension value the transaction contributes to.
    pub key: String,
    /// Whether the transaction is one-time or recurring.
    pub kind: DonationKind,
    /// The transaction total.
    pub amount: f64,
}
