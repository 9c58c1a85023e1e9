//! Helpers shared by the unit tests.

use rusqlite::Connection;

use crate::{
    Error,
    db::initialize,
    dimension::{Dimension, DimensionValue},
    ledger::RecurringSchedule,
    predicate::{DateRange, Predicate},
    reader::{DonationAmount, Grouping, LedgerReader, SparseTotal},
};

/// An in-memory database with the ledger schema.
#[track_caller]
pub(crate) fn get_test_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    initialize(&conn).unwrap();
    conn
}

/// A ledger that cannot be read.
pub(crate) struct FailingLedger;

impl LedgerReader for FailingLedger {
    fn sparse_totals(&self, _: &Predicate, _: Grouping) -> Result<Vec<SparseTotal>, Error> {
        Err(Error::DatabaseLockError)
    }

    fn dimension_values(&self, _: &Predicate, _: Dimension) -> Result<Vec<DimensionValue>, Error> {
        Err(Error::DatabaseLockError)
    }

    fn recorded_payment_methods(&self) -> Result<Vec<DimensionValue>, Error> {
        Err(Error::DatabaseLockError)
    }

    fn donation_amounts(&self, _: &Predicate, _: Dimension) -> Result<Vec<DonationAmount>, Error> {
        Err(Error::DatabaseLockError)
    }

    fn recurring_schedules(&self, _: DateRange) -> Result<Vec<RecurringSchedule>, Error> {
        Err(Error::DatabaseLockError)
    }
}
