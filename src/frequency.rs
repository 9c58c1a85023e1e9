//! Classifies donations by how often they recur.
//!
//! Two independent views are supported and must not be conflated:
//! - the *cadence* view reads the stored cadence code as is (monthly, yearly, ...),
//! - the *kind* view splits donations into one-time and recurring, and for
//!   monthly donations also into first and follow-on installments.
//!
//! Installment position is only recorded for monthly donations. Order
//! identifiers of the other cadences are never inspected.

use std::str::FromStr;

use crate::Error;

/// The substring that marks the order identifier of a follow-on installment.
///
/// For example, the first installment of a monthly donation has the order
/// identifier `1001`, and the following installments `1001-2`, `1001-3`, etc.
pub const INSTALLMENT_DELIMITER: &str = "-";

/// How often a donation line item recurs, as stored in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cadence {
    /// Code 0.
    OneTime,
    /// Code 1.
    Monthly,
    /// Code 2.
    Yearly,
    /// Code 3.
    Daily,
    /// Code 4.
    Weekly,
}

impl Cadence {
    /// Every cadence, in order of their codes.
    pub const ALL: [Cadence; 5] = [
        Cadence::OneTime,
        Cadence::Monthly,
        Cadence::Yearly,
        Cadence::Daily,
        Cadence::Weekly,
    ];

    /// Map a stored cadence code to a cadence, if the code is known.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Cadence::OneTime),
            1 => Some(Cadence::Monthly),
            2 => Some(Cadence::Yearly),
            3 => Some(Cadence::Daily),
            4 => Some(Cadence::Weekly),
            _ => None,
        }
    }

    /// The code stored in the ledger for this cadence.
    pub fn code(self) -> i64 {
        match self {
            Cadence::OneTime => 0,
            Cadence::Monthly => 1,
            Cadence::Yearly => 2,
            Cadence::Daily => 3,
            Cadence::Weekly => 4,
        }
    }

    /// The label used in query strings and report output.
    pub fn label(self) -> &'static str {
        match self {
            Cadence::OneTime => "one-time",
            Cadence::Monthly => "monthly",
            Cadence::Yearly => "yearly",
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
        }
    }
}

/// Whether a donation is a one-off gift or part of a recurring plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DonationKind {
    /// A single gift.
    OneTime,
    /// Any installment of a recurring plan, whatever its cadence.
    Recurring,
}

impl DonationKind {
    /// Every kind, in display order.
    pub const ALL: [DonationKind; 2] = [DonationKind::OneTime, DonationKind::Recurring];

    /// The label used in query strings and report output.
    pub fn label(self) -> &'static str {
        match self {
            DonationKind::OneTime => "one-time",
            DonationKind::Recurring => "recurring",
        }
    }
}

impl FromStr for DonationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one-time" => Ok(DonationKind::OneTime),
            "recurring" => Ok(DonationKind::Recurring),
            other => Err(Error::InvalidFrequency(other.to_owned())),
        }
    }
}

/// Where a donation sits in its series of installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallmentPosition {
    /// Not part of a series.
    OneTime,
    /// The first charge of a monthly plan.
    RecurringFirst,
    /// A later charge of a monthly plan.
    RecurringNext,
    /// A charge of a non-monthly plan, which does not record its position.
    Recurring,
}

/// Classify a donation as one-time or recurring from its cadence code.
///
/// Any positive code counts as recurring, including codes this service does
/// not know about.
pub fn classify_kind(code: i64) -> DonationKind {
    if code > 0 {
        DonationKind::Recurring
    } else {
        DonationKind::OneTime
    }
}

/// Classify a donation by its cadence, if its code is known.
pub fn classify_cadence(code: i64) -> Option<Cadence> {
    Cadence::from_code(code)
}

/// Classify a donation by its position in a series of installments.
pub fn classify_position(code: i64, order_id: &str) -> InstallmentPosition {
    match classify_kind(code) {
        DonationKind::OneTime => InstallmentPosition::OneTime,
        DonationKind::Recurring if code == Cadence::Monthly.code() => {
            if order_id.contains(INSTALLMENT_DELIMITER) {
                InstallmentPosition::RecurringNext
            } else {
                InstallmentPosition::RecurringFirst
            }
        }
        DonationKind::Recurring => InstallmentPosition::Recurring,
    }
}

/// Restricts a report to donations of one kind, installment position or cadence.
///
/// The request surface has a coarse `kind` and a fine `frequency` parameter.
/// They are resolved once with [FrequencyFilter::resolve] so the rest of the
/// code only ever sees a single selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyFilter {
    /// Only one-time donations.
    OneTime,
    /// Only recurring donations, of any cadence.
    Recurring,
    /// Only first installments of monthly donations.
    RecurringFirst,
    /// Only follow-on installments of monthly donations.
    RecurringNext,
    /// Only donations with exactly this cadence.
    Cadence(Cadence),
}

impl FrequencyFilter {
    /// Combine the coarse `kind` and fine `frequency` selectors.
    ///
    /// An explicit `frequency` always overrides `kind`.
    pub fn resolve(kind: Option<DonationKind>, frequency: Option<FrequencyFilter>) -> Option<Self> {
        frequency.or(kind.map(FrequencyFilter::from))
    }

    /// Whether a transaction with the highest cadence code `code` and order
    /// identifier `order_id` passes this filter.
    pub fn matches(self, code: i64, order_id: &str) -> bool {
        match self {
            FrequencyFilter::OneTime => classify_kind(code) == DonationKind::OneTime,
            FrequencyFilter::Recurring => classify_kind(code) == DonationKind::Recurring,
            FrequencyFilter::RecurringFirst => {
                classify_position(code, order_id) == InstallmentPosition::RecurringFirst
            }
            FrequencyFilter::RecurringNext => {
                classify_position(code, order_id) == InstallmentPosition::RecurringNext
            }
            FrequencyFilter::Cadence(cadence) => classify_cadence(code) == Some(cadence),
        }
    }
}

impl From<DonationKind> for FrequencyFilter {
    fn from(kind: DonationKind) -> Self {
        match kind {
            DonationKind::OneTime => FrequencyFilter::OneTime,
            DonationKind::Recurring => FrequencyFilter::Recurring,
        }
    }
}

impl FromStr for FrequencyFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one-time" => Ok(FrequencyFilter::OneTime),
            "recurring" => Ok(FrequencyFilter::Recurring),
            "recurring-first" => Ok(FrequencyFilter::RecurringFirst),
            "recurring-next" => Ok(FrequencyFilter::RecurringNext),
            "monthly" => Ok(FrequencyFilter::Cadence(Cadence::Monthly)),
            "yearly" => Ok(FrequencyFilter::Cadence(Cadence::Yearly)),
            "daily" => Ok(FrequencyFilter::Cadence(Cadence::Daily)),
            "weekly" => Ok(FrequencyFilter::Cadence(Cadence::Weekly)),
            other => Err(Error::InvalidFrequency(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::{
        Cadence, DonationKind, FrequencyFilter, InstallmentPosition, classify_cadence,
        classify_kind, classify_position,
    };

    #[test]
    fn cadence_codes_round_trip() {
        for cadence in Cadence::ALL {
            assert_eq!(Cadence::from_code(cadence.code()), Some(cadence));
        }
        assert_eq!(Cadence::from_code(7), None);
    }

    #[test]
    fn any_positive_code_is_recurring() {
        assert_eq!(classify_kind(0), DonationKind::OneTime);
        for code in 1..=5 {
            assert_eq!(classify_kind(code), DonationKind::Recurring, "code {code}");
        }
    }

    #[test]
    fn cadence_view_ignores_installment_position() {
        assert_eq!(classify_cadence(1), Some(Cadence::Monthly));
        assert_eq!(classify_cadence(4), Some(Cadence::Weekly));
        assert_eq!(classify_cadence(9), None);
    }

    #[test]
    fn monthly_position_depends_on_order_id() {
        assert_eq!(
            classify_position(1, "1001"),
            InstallmentPosition::RecurringFirst
        );
        assert_eq!(
            classify_position(1, "1001-2"),
            InstallmentPosition::RecurringNext
        );
        assert_eq!(classify_position(0, "1001-2"), InstallmentPosition::OneTime);
    }

    #[test]
    fn non_monthly_cadences_have_no_position() {
        for code in 2..=4 {
            assert_eq!(
                classify_position(code, "1001-2"),
                InstallmentPosition::Recurring
            );
            assert_eq!(classify_position(code, "1001"), InstallmentPosition::Recurring);
        }
    }

    #[test]
    fn explicit_frequency_overrides_kind() {
        assert_eq!(
            FrequencyFilter::resolve(
                Some(DonationKind::OneTime),
                Some(FrequencyFilter::RecurringNext)
            ),
            Some(FrequencyFilter::RecurringNext)
        );
        assert_eq!(
            FrequencyFilter::resolve(Some(DonationKind::Recurring), None),
            Some(FrequencyFilter::Recurring)
        );
        assert_eq!(FrequencyFilter::resolve(None, None), None);
    }

    #[test]
    fn cadence_filters_do_not_inspect_order_id() {
        let yearly = FrequencyFilter::Cadence(Cadence::Yearly);

        assert!(yearly.matches(2, "1001"));
        assert!(yearly.matches(2, "1001-2"));
        assert!(!yearly.matches(1, "1001"));
    }

    #[test]
    fn position_filters_only_match_monthly() {
        assert!(FrequencyFilter::RecurringFirst.matches(1, "1001"));
        assert!(!FrequencyFilter::RecurringFirst.matches(2, "1001"));
        assert!(FrequencyFilter::RecurringNext.matches(1, "1001-3"));
        assert!(!FrequencyFilter::RecurringNext.matches(4, "1001-3"));
    }

    #[test]
    fn parse_rejects_unknown_frequency() {
        assert_eq!(
            "fortnightly".parse::<FrequencyFilter>(),
            Err(Error::InvalidFrequency("fortnightly".to_owned()))
        );
        assert_eq!(
            "monthly".parse::<FrequencyFilter>(),
            Ok(FrequencyFilter::Cadence(Cadence::Monthly))
        );
    }
}
