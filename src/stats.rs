//! Summary statistics over groups of donations.

use std::collections::HashMap;

use crate::{frequency::DonationKind, reader::DonationAmount};

/// The running sum and distinct transaction count of a group.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GroupTotals {
    /// The sum of the transaction totals.
    pub amount: f64,
    /// The number of distinct transactions.
    pub count: u64,
}

impl GroupTotals {
    /// Add another partial aggregate of the same group.
    pub fn merge(&mut self, other: GroupTotals) {
        self.amount += other.amount;
        self.count += other.count;
    }

    /// The mean transaction total, or zero for an empty group.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.amount / self.count as f64
        }
    }
}

/// The median of `values`, or `None` if there are no values.
///
/// For an even number of values this is the mean of the two central values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let middle = sorted.len() / 2;

    if sorted.len() % 2 == 1 {
        Some(sorted[middle])
    } else {
        Some((sorted[middle - 1] + sorted[middle]) / 2.0)
    }
}

/// The medians of one group, split by donation kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SplitMedians {
    /// The median of the one-time donations, if there were any.
    pub one_time: Option<f64>,
    /// The median of the recurring donations, if there were any.
    pub recurring: Option<f64>,
}

/// Compute the one-time and recurring medians of each dimension key.
///
/// One-time and recurring donations are never pooled.
pub fn split_medians(amounts: &[DonationAmount]) -> HashMap<String, SplitMedians> {
    let mut groups: HashMap<&str, (Vec<f64>, Vec<f64>)> = HashMap::new();

    for amount in amounts {
        let (one_time, recurring) = groups.entry(amount.key.as_str()).or_default();

        match amount.kind {
            DonationKind::OneTime => one_time.push(amount.amount),
            DonationKind::Recurring => recurring.push(amount.amount),
        }
    }

    groups
        .into_iter()
        .map(|(key, (one_time, recurring))| {
            (
                key.to_owned(),
                SplitMedians {
                    one_time: median(&one_time),
                    recurring: median(&recurring),
                },
            )
        })
        .collect()
}
