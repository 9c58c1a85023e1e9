//! Reads the ledger from a SQLite database.
//!
//! Queries are assembled from fixed fragments. User supplied values are only
//! ever passed as bound parameters.

use rusqlite::{
    Connection, Row, params_from_iter,
    types::{Type, Value},
};
use time::Date;

use crate::{
    Error,
    bucket::Granularity,
    dimension::{Dimension, DimensionValue, TOTAL_KEY, UNKNOWN_LABEL},
    frequency::{Cadence, DonationKind, FrequencyFilter, INSTALLMENT_DELIMITER, classify_kind},
    ledger::{QUALIFYING_STATUSES, RecurringSchedule, map_recurring_schedule_row},
    predicate::{Clause, DateRange, Predicate},
};

use super::{DonationAmount, Grouping, LedgerReader, SparseTotal};

const LEDGER_ROWS: &str = "FROM \"transaction\" t \
    INNER JOIN transaction_detail d ON d.transaction_id = t.id \
    LEFT JOIN appeal ON appeal.id = d.appeal_id \
    LEFT JOIN fund ON fund.id = d.fund_id \
    LEFT JOIN donor ON donor.id = t.donor_id";

/// The highest cadence code over all line items of the transaction `t`.
const MAX_CADENCE: &str =
    "(SELECT MAX(freq) FROM transaction_detail WHERE transaction_id = t.id)";

/// A SQL `WHERE` condition and the values bound to its placeholders, in order.
struct Filter {
    sql: String,
    params: Vec<Value>,
}

impl Filter {
    fn new() -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn and(&mut self, condition: &str, params: impl IntoIterator<Item = Value>) {
        if !self.sql.is_empty() {
            self.sql.push_str(" AND ");
        }
        self.sql.push_str(condition);
        self.params.extend(params);
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Translate `predicate` into a filter over [LEDGER_ROWS].
///
/// Rows without a value for `dimension` are dropped, so every row can be
/// attributed to exactly one dimension value.
fn build_filter(predicate: &Predicate, dimension: Dimension) -> Filter {
    let mut filter = Filter::new();
    let range = predicate.range();

    filter.and(
        &format!("t.status IN ({})", placeholders(QUALIFYING_STATUSES.len())),
        QUALIFYING_STATUSES
            .iter()
            .map(|status| Value::Text(status.as_str().to_owned())),
    );
    filter.and(
        "t.created_at >= ? AND t.created_at < ?",
        [
            Value::Text(range.start.to_string()),
            Value::Text(range.end_exclusive().to_string()),
        ],
    );

    for clause in predicate.clauses() {
        match clause {
            Clause::Appeals(ids) => filter.and(
                &format!("d.appeal_id IN ({})", placeholders(ids.len())),
                ids.iter().map(|id| Value::Integer(*id)),
            ),
            Clause::Funds(ids) => filter.and(
                &format!("d.fund_id IN ({})", placeholders(ids.len())),
                ids.iter().map(|id| Value::Integer(*id)),
            ),
            Clause::Frequency(frequency) => {
                let (condition, params) = frequency_condition(*frequency);
                filter.and(&condition, params);
            }
            Clause::PaymentMethod(method) => filter.and(
                &format!("{} = ?", dimension_key(Dimension::PaymentMethod)),
                [Value::Text(method.clone())],
            ),
            Clause::Country(country) => filter.and(
                &format!("{} = ?", dimension_key(Dimension::Country)),
                [Value::Text(country.clone())],
            ),
        }
    }

    if matches!(
        dimension,
        Dimension::Appeal | Dimension::Fund | Dimension::Cadence
    ) {
        filter.and(&format!("{} IS NOT NULL", dimension_key(dimension)), []);
    }

    filter
}

/// The SQL equivalent of [FrequencyFilter::matches].
fn frequency_condition(frequency: FrequencyFilter) -> (String, Vec<Value>) {
    let monthly = Cadence::Monthly.code();

    match frequency {
        FrequencyFilter::OneTime => (format!("{MAX_CADENCE} <= 0"), vec![]),
        FrequencyFilter::Recurring => (format!("{MAX_CADENCE} > 0"), vec![]),
        FrequencyFilter::RecurringFirst => (
            format!("{MAX_CADENCE} = ? AND instr(t.order_id, ?) = 0"),
            vec![
                Value::Integer(monthly),
                Value::Text(INSTALLMENT_DELIMITER.to_owned()),
            ],
        ),
        FrequencyFilter::RecurringNext => (
            format!("{MAX_CADENCE} = ? AND instr(t.order_id, ?) > 0"),
            vec![
                Value::Integer(monthly),
                Value::Text(INSTALLMENT_DELIMITER.to_owned()),
            ],
        ),
        FrequencyFilter::Cadence(cadence) => (
            format!("{MAX_CADENCE} = ?"),
            vec![Value::Integer(cadence.code())],
        ),
    }
}

/// The SQL expression for the key of a row's dimension value.
fn dimension_key(dimension: Dimension) -> String {
    match dimension {
        Dimension::None => format!("'{TOTAL_KEY}'"),
        Dimension::Appeal => "CAST(d.appeal_id AS TEXT)".to_owned(),
        Dimension::Fund => "CAST(d.fund_id AS TEXT)".to_owned(),
        Dimension::Country => format!("COALESCE(donor.country, '{UNKNOWN_LABEL}')"),
        Dimension::PaymentMethod => format!("COALESCE(t.payment_method, '{UNKNOWN_LABEL}')"),
        Dimension::Kind => format!(
            "CASE WHEN {MAX_CADENCE} > 0 THEN '{}' ELSE '{}' END",
            DonationKind::Recurring.label(),
            DonationKind::OneTime.label()
        ),
        Dimension::Cadence => {
            let cases: String = Cadence::ALL
                .iter()
                .map(|cadence| format!(" WHEN {} THEN '{}'", cadence.code(), cadence.label()))
                .collect();

            format!("CASE {MAX_CADENCE}{cases} END")
        }
    }
}

/// The SQL expression for the display name of a row's dimension value.
fn dimension_label(dimension: Dimension) -> String {
    match dimension {
        Dimension::Appeal => "appeal.name".to_owned(),
        Dimension::Fund => "fund.name".to_owned(),
        other => dimension_key(other),
    }
}

fn bucket_expression(granularity: Option<Granularity>) -> &'static str {
    match granularity {
        Some(Granularity::Daily) => "date(t.created_at)",
        // Step back to the Tuesday of the previous week, then forward to the next Monday.
        Some(Granularity::Weekly) => "date(t.created_at, '-6 days', 'weekday 1')",
        None => "NULL",
    }
}

/// Read a `COUNT(*)` column, which SQLite returns as a signed integer.
fn read_count(row: &Row, index: usize) -> Result<u64, rusqlite::Error> {
    let count: i64 = row.get(index)?;

    u64::try_from(count).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(error))
    })
}

impl LedgerReader for Connection {
    fn sparse_totals(
        &self,
        predicate: &Predicate,
        grouping: Grouping,
    ) -> Result<Vec<SparseTotal>, Error> {
        let filter = build_filter(predicate, grouping.dimension);
        // The inner DISTINCT collapses the line items of a transaction so its
        // total is only counted once per group.
        let query = format!(
            "SELECT bucket, dimension_key, SUM(total), COUNT(*) FROM (
                SELECT DISTINCT t.id, {} AS bucket, {} AS dimension_key, t.total AS total
                {LEDGER_ROWS}
                WHERE {}
            )
            GROUP BY bucket, dimension_key
            ORDER BY bucket, dimension_key",
            bucket_expression(grouping.granularity),
            dimension_key(grouping.dimension),
            filter.sql
        );

        self.prepare(&query)?
            .query_map(params_from_iter(filter.params.iter()), |row| {
                Ok(SparseTotal {
                    bucket: row.get::<_, Option<Date>>(0)?,
                    key: row.get(1)?,
                    amount: row.get(2)?,
                    count: read_count(row, 3)?,
                })
            })?
            .map(|total_result| total_result.map_err(Error::from))
            .collect()
    }

    fn dimension_values(
        &self,
        predicate: &Predicate,
        dimension: Dimension,
    ) -> Result<Vec<DimensionValue>, Error> {
        let filter = build_filter(predicate, dimension);
        let disabled = match dimension {
            Dimension::Fund => "COALESCE(fund.disabled, 0)",
            _ => "0",
        };
        let query = format!(
            "SELECT DISTINCT {}, {}, {disabled} {LEDGER_ROWS} WHERE {}",
            dimension_key(dimension),
            dimension_label(dimension),
            filter.sql
        );

        self.prepare(&query)?
            .query_map(params_from_iter(filter.params.iter()), |row| {
                let key: String = row.get(0)?;
                let label = row.get::<_, Option<String>>(1)?.unwrap_or_else(|| key.clone());

                Ok(DimensionValue {
                    key,
                    label,
                    disabled: row.get(2)?,
                })
            })?
            .map(|value_result| value_result.map_err(Error::from))
            .collect()
    }

    fn recorded_payment_methods(&self) -> Result<Vec<DimensionValue>, Error> {
        self.prepare(&format!(
            "SELECT DISTINCT COALESCE(payment_method, '{UNKNOWN_LABEL}') FROM \"transaction\""
        ))?
        .query_map([], |row| {
            let method: String = row.get(0)?;
            Ok(DimensionValue::new(&method, &method))
        })?
        .map(|value_result| value_result.map_err(Error::from))
        .collect()
    }

    fn donation_amounts(
        &self,
        predicate: &Predicate,
        dimension: Dimension,
    ) -> Result<Vec<DonationAmount>, Error> {
        let filter = build_filter(predicate, dimension);
        let query = format!(
            "SELECT DISTINCT t.id, {}, t.total, {MAX_CADENCE} {LEDGER_ROWS} WHERE {}",
            dimension_key(dimension),
            filter.sql
        );

        self.prepare(&query)?
            .query_map(params_from_iter(filter.params.iter()), |row| {
                Ok(DonationAmount {
                    key: row.get(1)?,
                    amount: row.get(2)?,
                    kind: classify_kind(row.get(3)?),
                })
            })?
            .map(|amount_result| amount_result.map_err(Error::from))
            .collect()
    }

    fn recurring_schedules(&self, range: DateRange) -> Result<Vec<RecurringSchedule>, Error> {
        self.prepare(
            "SELECT id, transaction_detail_id, start_date, next_run_date, remaining_count, status
             FROM recurring_schedule
             WHERE start_date >= ?1 AND start_date < ?2
             ORDER BY start_date, id",
        )?
        .query_map((range.start, range.end_exclusive()), map_recurring_schedule_row)?
        .map(|schedule_result| schedule_result.map_err(Error::from))
        .collect()
    }
}
