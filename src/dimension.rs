//! Determines the axis of dimension values a report is grouped by.
//!
//! Appeals, funds and countries are enumerated from activity in the requested
//! range, so dormant values never show up as flat zero lines. Payment methods
//! and the classification dimensions always use a complete, fixed legend.

use std::str::FromStr;

use crate::{
    Error,
    frequency::{Cadence, DonationKind},
    predicate::Predicate,
    reader::LedgerReader,
};

/// The label used for ledger rows with no country or payment method.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// The key of the single series when a report is not grouped.
pub const TOTAL_KEY: &str = "total";

const TOTAL_LABEL: &str = "Total";

/// A categorical axis that reports can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dimension {
    /// No grouping, a single series keyed [TOTAL_KEY].
    #[default]
    None,
    /// The appeal a line item was donated to.
    Appeal,
    /// The fund a line item was designated for.
    Fund,
    /// The country of the donor.
    Country,
    /// How the transaction was paid.
    PaymentMethod,
    /// One-time or recurring.
    Kind,
    /// The cadence of the transaction.
    Cadence,
}

impl Dimension {
    /// The value used in query strings and report output.
    pub fn as_query_value(self) -> &'static str {
        match self {
            Dimension::None => "none",
            Dimension::Appeal => "appeal",
            Dimension::Fund => "fund",
            Dimension::Country => "country",
            Dimension::PaymentMethod => "payment-method",
            Dimension::Kind => "kind",
            Dimension::Cadence => "cadence",
        }
    }
}

impl FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Dimension::None),
            "appeal" => Ok(Dimension::Appeal),
            "fund" => Ok(Dimension::Fund),
            "country" => Ok(Dimension::Country),
            "payment-method" => Ok(Dimension::PaymentMethod),
            "kind" => Ok(Dimension::Kind),
            "cadence" => Ok(Dimension::Cadence),
            other => Err(Error::InvalidDimension(other.to_owned())),
        }
    }
}

/// One value on a dimension axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionValue {
    /// The stable identifier of the value, e.g. a fund ID or country name.
    pub key: String,
    /// The display name of the value.
    pub label: String,
    /// Whether the value is a fund that has been disabled.
    pub disabled: bool,
}

impl DimensionValue {
    /// Create an enabled dimension value.
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_owned(),
            label: label.to_owned(),
            disabled: false,
        }
    }

    fn is_unknown(&self) -> bool {
        self.label == UNKNOWN_LABEL
    }
}

/// Whether disabled funds keep their place on the fund axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisabledFunds {
    /// Show disabled funds that were active in the range.
    #[default]
    Include,
    /// Never show disabled funds, whatever their history in the range.
    Exclude,
}

/// Enumerate the values of `dimension` for a report over `predicate`.
///
/// Appeals, funds and countries are restricted to values with at least one
/// qualifying transaction in range, ignoring only the filter on `dimension`
/// itself. Payment methods are every method ever recorded. Kind and cadence
/// always list all of their values.
///
/// Enumerated values are sorted by label, ignoring case, with
/// [UNKNOWN_LABEL] last.
///
/// # Errors
/// Returns any error raised by `reader`.
pub fn enumerate_active_values<L>(
    reader: &L,
    predicate: &Predicate,
    dimension: Dimension,
    disabled_funds: DisabledFunds,
) -> Result<Vec<DimensionValue>, Error>
where
    L: LedgerReader + ?Sized,
{
    let mut values = match dimension {
        Dimension::None => return Ok(vec![DimensionValue::new(TOTAL_KEY, TOTAL_LABEL)]),
        Dimension::Kind => {
            return Ok(DonationKind::ALL
                .iter()
                .map(|kind| DimensionValue::new(kind.label(), kind.label()))
                .collect());
        }
        Dimension::Cadence => {
            return Ok(Cadence::ALL
                .iter()
                .map(|cadence| DimensionValue::new(cadence.label(), cadence.label()))
                .collect());
        }
        Dimension::PaymentMethod => reader.recorded_payment_methods()?,
        Dimension::Appeal | Dimension::Fund | Dimension::Country => {
            reader.dimension_values(&predicate.without_dimension(dimension), dimension)?
        }
    };

    if disabled_funds == DisabledFunds::Exclude {
        values.retain(|value| !value.disabled);
    }

    sort_values(&mut values);
    values.dedup_by(|a, b| a.key == b.key);

    Ok(values)
}

fn sort_values(values: &mut [DimensionValue]) {
    values.sort_by(|a, b| {
        a.is_unknown()
            .cmp(&b.is_unknown())
            .then_with(|| a.label.to_lowercase().cmp(&b.label.to_lowercase()))
            .then_with(|| a.key.cmp(&b.key))
    });
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use crate::{
        Error,
        frequency::Cadence,
        ledger::{
            Transaction, TransactionDetail, create_appeal, create_donor, create_fund,
            create_transaction, set_fund_disabled,
        },
        predicate::{DateRange, Predicate},
        test_utils::{FailingLedger, get_test_connection},
    };

    use super::{
        Dimension, DimensionValue, DisabledFunds, TOTAL_KEY, UNKNOWN_LABEL,
        enumerate_active_values,
    };

    fn january() -> Predicate {
        Predicate::build(DateRange::new(date!(2024 - 01 - 01), date!(2024 - 01 - 31)).unwrap())
            .finalize()
    }

    fn keys(values: &[DimensionValue]) -> Vec<&str> {
        values.iter().map(|value| value.key.as_str()).collect()
    }

    #[test]
    fn parse_dimension() {
        for dimension in [
            Dimension::None,
            Dimension::Appeal,
            Dimension::Fund,
            Dimension::Country,
            Dimension::PaymentMethod,
            Dimension::Kind,
            Dimension::Cadence,
        ] {
            assert_eq!(dimension.as_query_value().parse(), Ok(dimension));
        }

        assert_eq!(
            "donor".parse::<Dimension>(),
            Err(Error::InvalidDimension("donor".to_owned()))
        );
    }

    #[test]
    fn only_funds_with_activity_in_range_are_enumerated() {
        let conn = get_test_connection();
        let fund_a = create_fund("Fund A", None, &conn).unwrap();
        let fund_b = create_fund("Fund B", None, &conn).unwrap();
        create_transaction(
            Transaction::build(50.0, datetime!(2024-01-02 10:00), "1001")
                .detail(TransactionDetail::build(Cadence::OneTime, 50.0).fund_id(fund_a.id)),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(20.0, datetime!(2023-12-31 10:00), "1002")
                .detail(TransactionDetail::build(Cadence::OneTime, 20.0).fund_id(fund_b.id)),
            &conn,
        )
        .unwrap();

        let values =
            enumerate_active_values(&conn, &january(), Dimension::Fund, DisabledFunds::Include)
                .unwrap();

        assert_eq!(
            values,
            vec![DimensionValue::new(&fund_a.id.to_string(), "Fund A")]
        );
    }

    #[test]
    fn enumeration_ignores_the_filter_on_its_own_dimension() {
        let conn = get_test_connection();
        let general = create_appeal("General", &conn).unwrap();
        let winter = create_appeal("Winter", &conn).unwrap();
        for (appeal_id, order_id) in [(general.id, "1001"), (winter.id, "1002")] {
            create_transaction(
                Transaction::build(10.0, datetime!(2024-01-05 09:00), order_id)
                    .detail(TransactionDetail::build(Cadence::OneTime, 10.0).appeal_id(appeal_id)),
                &conn,
            )
            .unwrap();
        }
        let predicate = Predicate::build(january().range())
            .appeals(vec![general.id])
            .finalize();

        let values =
            enumerate_active_values(&conn, &predicate, Dimension::Appeal, DisabledFunds::Include)
                .unwrap();

        assert_eq!(
            keys(&values),
            vec![general.id.to_string(), winter.id.to_string()]
        );
    }

    #[test]
    fn disabled_fund_policy() {
        let conn = get_test_connection();
        let open = create_fund("Open", None, &conn).unwrap();
        let closed = create_fund("Closed", None, &conn).unwrap();
        for (fund_id, order_id) in [(open.id, "1001"), (closed.id, "1002")] {
            create_transaction(
                Transaction::build(10.0, datetime!(2024-01-05 09:00), order_id)
                    .detail(TransactionDetail::build(Cadence::OneTime, 10.0).fund_id(fund_id)),
                &conn,
            )
            .unwrap();
        }
        set_fund_disabled(closed.id, true, &conn).unwrap();

        let included =
            enumerate_active_values(&conn, &january(), Dimension::Fund, DisabledFunds::Include)
                .unwrap();
        let excluded =
            enumerate_active_values(&conn, &january(), Dimension::Fund, DisabledFunds::Exclude)
                .unwrap();

        assert_eq!(
            keys(&included),
            vec![closed.id.to_string(), open.id.to_string()]
        );
        assert!(included[0].disabled);
        assert_eq!(keys(&excluded), vec![open.id.to_string()]);
    }

    #[test]
    fn countries_are_sorted_with_unknown_last() {
        let conn = get_test_connection();
        let kiwi = create_donor("Kiri", Some("New Zealand"), &conn).unwrap();
        let aussie = create_donor("Bruce", Some("australia"), &conn).unwrap();
        let anonymous = create_donor("Anonymous", None, &conn).unwrap();
        for (index, donor_id) in [anonymous.id, kiwi.id, aussie.id].into_iter().enumerate() {
            create_transaction(
                Transaction::build(10.0, datetime!(2024-01-05 09:00), &format!("10{index}"))
                    .donor_id(donor_id)
                    .detail(TransactionDetail::build(Cadence::OneTime, 10.0)),
                &conn,
            )
            .unwrap();
        }

        let values =
            enumerate_active_values(&conn, &january(), Dimension::Country, DisabledFunds::Include)
                .unwrap();

        assert_eq!(keys(&values), vec!["australia", "New Zealand", UNKNOWN_LABEL]);
    }

    #[test]
    fn payment_methods_include_methods_unused_in_range() {
        let conn = get_test_connection();
        create_transaction(
            Transaction::build(10.0, datetime!(2024-01-05 09:00), "1001")
                .payment_method("card")
                .detail(TransactionDetail::build(Cadence::OneTime, 10.0)),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(10.0, datetime!(2022-06-05 09:00), "1002")
                .payment_method("bank transfer")
                .detail(TransactionDetail::build(Cadence::OneTime, 10.0)),
            &conn,
        )
        .unwrap();

        let values = enumerate_active_values(
            &conn,
            &january(),
            Dimension::PaymentMethod,
            DisabledFunds::Include,
        )
        .unwrap();

        assert_eq!(keys(&values), vec!["bank transfer", "card"]);
    }

    #[test]
    fn fixed_legends_do_not_read_the_ledger() {
        let reader = FailingLedger;

        let total =
            enumerate_active_values(&reader, &january(), Dimension::None, DisabledFunds::Include)
                .unwrap();
        let kinds =
            enumerate_active_values(&reader, &january(), Dimension::Kind, DisabledFunds::Include)
                .unwrap();
        let cadences = enumerate_active_values(
            &reader,
            &january(),
            Dimension::Cadence,
            DisabledFunds::Include,
        )
        .unwrap();

        assert_eq!(keys(&total), vec![TOTAL_KEY]);
        assert_eq!(keys(&kinds), vec!["one-time", "recurring"]);
        assert_eq!(
            keys(&cadences),
            vec!["one-time", "monthly", "yearly", "daily", "weekly"]
        );
    }

    #[test]
    fn empty_ledger_has_no_active_values() {
        let conn = get_test_connection();

        let values =
            enumerate_active_values(&conn, &january(), Dimension::Appeal, DisabledFunds::Include)
                .unwrap();

        assert!(values.is_empty());
    }

    #[test]
    fn reader_failures_propagate() {
        let result = enumerate_active_values(
            &FailingLedger,
            &january(),
            Dimension::Fund,
            DisabledFunds::Include,
        );

        assert_eq!(result, Err(Error::DatabaseLockError));
    }
}
