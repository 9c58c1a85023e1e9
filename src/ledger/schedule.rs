//! Recurring donation plans.

use rusqlite::{Connection, Row};
use time::Date;

use crate::{Error, database_id::TransactionDetailId};

/// The status of a schedule that is still charging the donor.
pub const ACTIVE_SCHEDULE_STATUS: &str = "ACTIVE";

/// A recurring donation plan, created from the line item that started it.
///
/// To create a new `RecurringSchedule`, use [RecurringSchedule::build].
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringSchedule {
    /// The ID of the schedule.
    pub id: i64,
    /// The line item that started the plan.
    pub transaction_detail_id: TransactionDetailId,
    /// The day the plan started.
    pub start_date: Date,
    /// The next day the plan is due to charge the donor.
    ///
    /// For plans that have stopped, this is the charge that never happened.
    pub next_run_date: Option<Date>,
    /// How many charges are left, zero for open-ended plans.
    pub remaining_count: u32,
    /// The schedule status, e.g. "ACTIVE" or "CANCELLED".
    pub status: String,
}

impl RecurringSchedule {
    /// Create a new, active schedule.
    ///
    /// Shortcut for [RecurringScheduleBuilder] for discoverability.
    pub fn build(
        transaction_detail_id: TransactionDetailId,
        start_date: Date,
    ) -> RecurringScheduleBuilder {
        RecurringScheduleBuilder {
            transaction_detail_id,
            start_date,
            next_run_date: None,
            remaining_count: 0,
            status: ACTIVE_SCHEDULE_STATUS.to_owned(),
        }
    }

    /// Whether the plan is still charging the donor.
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_SCHEDULE_STATUS
    }
}

/// A builder for creating [RecurringSchedule] instances.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringScheduleBuilder {
    /// The line item that started the plan.
    pub transaction_detail_id: TransactionDetailId,
    /// The day the plan started.
    pub start_date: Date,
    /// The next day the plan is due to charge the donor.
    pub next_run_date: Option<Date>,
    /// How many charges are left.
    pub remaining_count: u32,
    /// The schedule status.
    pub status: String,
}

impl RecurringScheduleBuilder {
    /// Set the next run date for the schedule.
    pub fn next_run_date(mut self, next_run_date: Date) -> Self {
        self.next_run_date = Some(next_run_date);
        self
    }

    /// Set the number of remaining charges for the schedule.
    pub fn remaining_count(mut self, remaining_count: u32) -> Self {
        self.remaining_count = remaining_count;
        self
    }

    /// Set the status for the schedule.
    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_owned();
        self
    }
}

/// Create a new recurring schedule in the database.
///
/// # Errors
/// Returns an [Error::SqlError] if the line item does not exist or there is
/// some other SQL error.
pub fn create_recurring_schedule(
    builder: RecurringScheduleBuilder,
    connection: &Connection,
) -> Result<RecurringSchedule, Error> {
    let schedule = connection
        .prepare(
            "INSERT INTO recurring_schedule
                (transaction_detail_id, start_date, next_run_date, remaining_count, status)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, transaction_detail_id, start_date, next_run_date, remaining_count, status",
        )?
        .query_row(
            (
                builder.transaction_detail_id,
                builder.start_date,
                builder.next_run_date,
                builder.remaining_count,
                &builder.status,
            ),
            map_recurring_schedule_row,
        )?;

    Ok(schedule)
}

/// Map a row of `id, transaction_detail_id, start_date, next_run_date,
/// remaining_count, status` to a [RecurringSchedule].
///
/// # Errors
/// Returns an error if a column is missing or has the wrong type.
pub fn map_recurring_schedule_row(row: &Row) -> Result<RecurringSchedule, rusqlite::Error> {
    Ok(RecurringSchedule {
        id: row.get(0)?,
        transaction_detail_id: row.get(1)?,
        start_date: row.get(2)?,
        next_run_date: row.get(3)?,
        remaining_count: row.get(4)?,
        status: row.get(5)?,
    })
}

/// Create the recurring schedule table in the database.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_recurring_schedule_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS recurring_schedule (
                id INTEGER PRIMARY KEY,
                transaction_detail_id INTEGER NOT NULL,
                start_date TEXT NOT NULL,
                next_run_date TEXT,
                remaining_count INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                FOREIGN KEY(transaction_detail_id) REFERENCES transaction_detail(id)
                    ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}
