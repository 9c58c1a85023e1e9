//! Measures how long recurring donation plans stay active.
//!
//! Plans are grouped into monthly cohorts by the month they started in. For
//! each cohort the retention is the percentage of its plans still active at
//! the start of each of the following months.

use std::collections::HashMap;

use time::{Date, Duration, Month};

use crate::{Error, ledger::RecurringSchedule, predicate::DateRange, reader::LedgerReader};

/// The number of months tracked per cohort, including the starting month.
pub const RETENTION_MONTHS: u32 = 12;

/// The plans that started in one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct Cohort {
    /// The first day of the month the plans started in.
    pub month: Date,
    /// The number of plans in the cohort.
    pub size: usize,
    /// The percentage of plans active in each month since the cohort started.
    ///
    /// `None` marks months that have not happened yet. Empty cohorts have no
    /// retention values at all.
    pub retention: Vec<Option<f64>>,
}

/// The first day of the month `date` falls in.
pub fn month_start(date: Date) -> Date {
    date - Duration::days(date.day() as i64 - 1)
}

/// The first day of the month `months` after the month starting on `month`.
///
/// Returns `None` if the result is out of range.
pub fn add_months(month: Date, months: u32) -> Option<Date> {
    let index = month.year() * 12 + i32::from(u8::from(month.month())) - 1 + months as i32;
    let year = index.div_euclid(12);
    let month = Month::try_from(index.rem_euclid(12) as u8 + 1).ok()?;

    Date::from_calendar_date(year, month, 1).ok()
}

/// Whether `schedule` was still charging the donor on `date`.
///
/// Active plans count as retained for every month. Stopped plans count until
/// the charge that never happened.
fn was_active_on(schedule: &RecurringSchedule, date: Date) -> bool {
    schedule.is_active()
        || schedule
            .next_run_date
            .is_some_and(|next_run_date| next_run_date >= date)
}

/// Compute the retention of the plans that started within `range`.
///
/// Returns one cohort per calendar month touched by `range`, oldest first,
/// including months in which no plan started. Months after the month of
/// `today` are unknown and reported as `None`.
///
/// # Errors
/// Returns any error raised by `reader`.
pub fn build_cohorts<L>(reader: &L, range: DateRange, today: Date) -> Result<Vec<Cohort>, Error>
where
    L: LedgerReader + ?Sized,
{
    let mut schedules_by_month: HashMap<Date, Vec<RecurringSchedule>> = HashMap::new();
    for schedule in reader.recurring_schedules(range)? {
        schedules_by_month
            .entry(month_start(schedule.start_date))
            .or_default()
            .push(schedule);
    }

    let current_month = month_start(today);
    let last_month = month_start(range.end);
    let mut cohorts = Vec::new();
    let mut month = month_start(range.start);

    while month <= last_month {
        let schedules = schedules_by_month.remove(&month).unwrap_or_default();
        cohorts.push(Cohort {
            month,
            size: schedules.len(),
            retention: retention(&schedules, month, current_month),
        });

        match add_months(month, 1) {
            Some(next) => month = next,
            None => break,
        }
    }

    Ok(cohorts)
}

fn retention(
    schedules: &[RecurringSchedule],
    cohort_month: Date,
    current_month: Date,
) -> Vec<Option<f64>> {
    if schedules.is_empty() {
        return Vec::new();
    }

    (0..RETENTION_MONTHS)
        .map(|offset| {
            let month = add_months(cohort_month, offset)?;

            if month > current_month {
                None
            } else if offset == 0 {
                Some(100.0)
            } else {
                let active = schedules
                    .iter()
                    .filter(|schedule| was_active_on(schedule, month))
                    .count();

                Some(active as f64 / schedules.len() as f64 * 100.0)
            }
        })
        .collect()
}
