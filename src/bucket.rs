//! Generates the dense, gap-free sequence of calendar buckets spanning a date range.
//!
//! Weeks start on Monday (ISO 8601) and are labelled by their Monday, for
//! every report.

use std::str::FromStr;

use time::{Date, Duration};

use crate::Error;

/// The size of the buckets in a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// One bucket per calendar day.
    #[default]
    Daily,
    /// One bucket per Monday-start week.
    Weekly,
}

impl Granularity {
    /// The value used in query strings and report output.
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(Error::InvalidGranularity(other.to_owned())),
        }
    }
}

/// One time interval in a time series, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bucket {
    /// The first day of the bucket, also used as its label.
    pub start: Date,
    /// The last day of the bucket.
    pub end: Date,
}

impl Bucket {
    /// The bucket of the given granularity that contains `date`.
    pub fn containing(date: Date, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Daily => Bucket {
                start: date,
                end: date,
            },
            Granularity::Weekly => week_bounds(date),
        }
    }

    /// The label of the bucket: its first day.
    pub fn label(&self) -> Date {
        self.start
    }
}

/// Generate every bucket that intersects `start..=end`, in order.
///
/// The sequence does not depend on the ledger, so every bucket is present
/// even if nothing happened in it. Weekly buckets may start before `start`
/// and end after `end`.
///
/// # Errors
/// Returns [Error::InvalidDateRange] if `start` is after `end`.
pub fn generate_buckets(
    start: Date,
    end: Date,
    granularity: Granularity,
) -> Result<Vec<Bucket>, Error> {
    if start > end {
        return Err(Error::InvalidDateRange { start, end });
    }

    let step = match granularity {
        Granularity::Daily => Duration::days(1),
        Granularity::Weekly => Duration::weeks(1),
    };

    let mut buckets = Vec::new();
    let mut current = Bucket::containing(start, granularity);

    loop {
        buckets.push(current);

        if current.end >= end {
            break;
        }

        match (
            current.start.checked_add(step),
            current.end.checked_add(step),
        ) {
            (Some(start), Some(end)) => current = Bucket { start, end },
            _ => break,
        }
    }

    Ok(buckets)
}

/// The number of buckets [generate_buckets] would return for `start..=end`,
/// without generating them.
///
/// Returns zero if `start` is after `end`.
pub fn count_buckets(start: Date, end: Date, granularity: Granularity) -> u64 {
    if start > end {
        return 0;
    }

    let days = (end - start).whole_days() as u64;

    match granularity {
        Granularity::Daily => days + 1,
        Granularity::Weekly => {
            let days_into_week = start.weekday().number_days_from_monday() as u64;
            (days + days_into_week) / 7 + 1
        }
    }
}

fn week_bounds(anchor_date: Date) -> Bucket {
    let weekday_number = anchor_date.weekday().number_from_monday() as i64;
    let start = anchor_date
        .checked_sub(Duration::days(weekday_number - 1))
        .unwrap_or(Date::MIN);
    let end = start.checked_add(Duration::days(6)).unwrap_or(Date::MAX);

    Bucket { start, end }
}

#[cfg(test)]
mod tests {
    use time::{Duration, Weekday, macros::date};

    use crate::Error;

    use super::{Bucket, Granularity, count_buckets, generate_buckets};

    #[test]
    fn daily_bucket_count_is_inclusive_day_count() {
        let start = date!(2023 - 12 - 20);

        for length in 0..120 {
            let end = start + Duration::days(length);

            let buckets = generate_buckets(start, end, Granularity::Daily).unwrap();

            assert_eq!(buckets.len() as i64, length + 1, "range {start}..={end}");
            assert_eq!(buckets.first().unwrap().start, start);
            assert_eq!(buckets.last().unwrap().end, end);
        }
    }

    #[test]
    fn daily_buckets_are_contiguous_days() {
        let buckets =
            generate_buckets(date!(2024 - 02 - 27), date!(2024 - 03 - 02), Granularity::Daily)
                .unwrap();

        let labels: Vec<_> = buckets.iter().map(Bucket::label).collect();
        assert_eq!(
            labels,
            vec![
                date!(2024 - 02 - 27),
                date!(2024 - 02 - 28),
                date!(2024 - 02 - 29),
                date!(2024 - 03 - 01),
                date!(2024 - 03 - 02),
            ]
        );
    }

    #[test]
    fn weekly_buckets_are_contiguous_mondays_covering_range() {
        let start = date!(2024 - 01 - 01);

        for length in 0..60 {
            for offset in 0..7 {
                let range_start = start + Duration::days(offset);
                let range_end = range_start + Duration::days(length);

                let buckets =
                    generate_buckets(range_start, range_end, Granularity::Weekly).unwrap();

                let first = buckets.first().unwrap();
                assert!(first.start <= range_start);
                assert!(range_start - first.start < Duration::days(7));
                assert!(buckets.last().unwrap().end >= range_end);

                for bucket in &buckets {
                    assert_eq!(bucket.start.weekday(), Weekday::Monday);
                    assert_eq!(bucket.end - bucket.start, Duration::days(6));
                }

                for pair in buckets.windows(2) {
                    assert_eq!(pair[1].start - pair[0].start, Duration::days(7));
                }
            }
        }
    }

    #[test]
    fn weekly_bucket_can_start_in_previous_year() {
        let buckets =
            generate_buckets(date!(2025 - 01 - 01), date!(2025 - 01 - 05), Granularity::Weekly)
                .unwrap();

        assert_eq!(
            buckets,
            vec![Bucket {
                start: date!(2024 - 12 - 30),
                end: date!(2025 - 01 - 05),
            }]
        );
    }

    #[test]
    fn single_day_range_has_one_bucket() {
        let day = date!(2024 - 01 - 03);

        assert_eq!(
            generate_buckets(day, day, Granularity::Daily).unwrap().len(),
            1
        );
        assert_eq!(
            generate_buckets(day, day, Granularity::Weekly).unwrap(),
            vec![Bucket {
                start: date!(2024 - 01 - 01),
                end: date!(2024 - 01 - 07),
            }]
        );
    }

    #[test]
    fn reversed_range_is_an_error() {
        let start = date!(2024 - 01 - 03);
        let end = date!(2024 - 01 - 01);

        assert_eq!(
            generate_buckets(start, end, Granularity::Daily),
            Err(Error::InvalidDateRange { start, end })
        );
    }

    #[test]
    fn parse_granularity() {
        assert_eq!("weekly".parse::<Granularity>(), Ok(Granularity::Weekly));
        assert_eq!(
            "monthly".parse::<Granularity>(),
            Err(Error::InvalidGranularity("monthly".to_owned()))
        );
    }

    #[test]
    fn count_buckets_agrees_with_generated_buckets() {
        let start = date!(2024 - 01 - 01);

        for offset in 0..21 {
            let range_start = start + Duration::days(offset);
            for length in 0..30 {
                let range_end = range_start + Duration::days(length);
                for granularity in [Granularity::Daily, Granularity::Weekly] {
                    let generated = generate_buckets(range_start, range_end, granularity).unwrap();

                    assert_eq!(
                        count_buckets(range_start, range_end, granularity),
                        generated.len() as u64,
                        "{granularity:?} buckets for {range_start} to {range_end}"
                    );
                }
            }
        }
    }

    #[test]
    fn count_buckets_of_huge_range_does_not_allocate() {
        assert_eq!(
            count_buckets(date!(0001 - 01 - 01), date!(9999 - 12 - 31), Granularity::Daily),
            3_652_059
        );
        assert_eq!(
            count_buckets(date!(2024 - 01 - 03), date!(2024 - 01 - 01), Granularity::Daily),
            0
        );
    }
}
