//! Ledger transactions and their line items.

use rusqlite::Connection;
use time::PrimitiveDateTime;

use crate::{
    Error,
    database_id::{AppealId, DonorId, FundId, TransactionDetailId, TransactionId},
    frequency::Cadence,
};

// ============================================================================
// MODELS
// ============================================================================

/// The processing state of a transaction as recorded by the payment system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// The payment went through.
    Completed,
    /// The payment was accepted but has not settled yet.
    Pending,
    /// The payment was declined.
    Failed,
    /// The payment was returned to the donor.
    Refunded,
    /// The donor abandoned the payment.
    Cancelled,
}

/// The statuses of transactions that count towards reports.
pub const QUALIFYING_STATUSES: [TransactionStatus; 2] =
    [TransactionStatus::Completed, TransactionStatus::Pending];

impl TransactionStatus {
    /// The status text stored in the ledger.
    ///
    /// The payment system writes `Completed` capitalised and the other
    /// statuses in lower case, so these strings must match exactly.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Completed => "Completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

/// A donation as charged by the payment system.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// When the payment was made.
    pub created_at: PrimitiveDateTime,
    /// The processing state of the payment.
    pub status: TransactionStatus,
    /// The amount charged, across all line items.
    pub total: f64,
    /// How the donor paid, e.g. "card" or "paypal".
    pub payment_method: Option<String>,
    /// The donor who made the donation.
    pub donor_id: Option<DonorId>,
    /// The order identifier from the payment system.
    ///
    /// Follow-on installments of a recurring donation contain
    /// [crate::frequency::INSTALLMENT_DELIMITER], first installments do not.
    pub order_id: String,
    /// The line items of the transaction.
    pub details: Vec<TransactionDetail>,
}

/// One line item of a [Transaction].
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDetail {
    /// The ID of the line item.
    pub id: TransactionDetailId,
    /// The transaction this line item belongs to.
    pub transaction_id: TransactionId,
    /// How often this line item recurs.
    pub cadence: Cadence,
    /// The appeal the money was given to.
    pub appeal_id: Option<AppealId>,
    /// The fund the money was given to.
    pub fund_id: Option<FundId>,
    /// The amount of this line item.
    pub amount: f64,
    /// How many units of this line item were bought.
    pub quantity: u32,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(total: f64, created_at: PrimitiveDateTime, order_id: &str) -> TransactionBuilder {
        TransactionBuilder {
            total,
            created_at,
            order_id: order_id.to_owned(),
            status: TransactionStatus::Completed,
            payment_method: None,
            donor_id: None,
            details: Vec::new(),
        }
    }
}

impl TransactionDetail {
    /// Create a new line item.
    ///
    /// Shortcut for [TransactionDetailBuilder] for discoverability.
    pub fn build(cadence: Cadence, amount: f64) -> TransactionDetailBuilder {
        TransactionDetailBuilder {
            cadence,
            amount,
            quantity: 1,
            appeal_id: None,
            fund_id: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// A transaction defaults to [TransactionStatus::Completed] with no donor,
/// payment method or line items.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBuilder {
    /// The amount charged, across all line items.
    pub total: f64,
    /// When the payment was made.
    pub created_at: PrimitiveDateTime,
    /// The order identifier from the payment system.
    pub order_id: String,
    /// The processing state of the payment.
    pub status: TransactionStatus,
    /// How the donor paid.
    pub payment_method: Option<String>,
    /// The donor who made the donation.
    pub donor_id: Option<DonorId>,
    /// The line items to insert alongside the transaction.
    pub details: Vec<TransactionDetailBuilder>,
}

impl TransactionBuilder {
    /// Set the status for the transaction.
    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the payment method for the transaction.
    pub fn payment_method(mut self, payment_method: &str) -> Self {
        self.payment_method = Some(payment_method.to_owned());
        self
    }

    /// Set the donor for the transaction.
    pub fn donor_id(mut self, donor_id: DonorId) -> Self {
        self.donor_id = Some(donor_id);
        self
    }

    /// Add a line item to the transaction.
    pub fn detail(mut self, detail: TransactionDetailBuilder) -> Self {
        self.details.push(detail);
        self
    }
}

/// A builder for creating [TransactionDetail] instances.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDetailBuilder {
    /// How often this line item recurs.
    pub cadence: Cadence,
    /// The amount of this line item.
    pub amount: f64,
    /// How many units of this line item were bought.
    pub quantity: u32,
    /// The appeal the money was given to.
    pub appeal_id: Option<AppealId>,
    /// The fund the money was given to.
    pub fund_id: Option<FundId>,
}

impl TransactionDetailBuilder {
    /// Set the appeal for the line item.
    pub fn appeal_id(mut self, appeal_id: AppealId) -> Self {
        self.appeal_id = Some(appeal_id);
        self
    }

    /// Set the fund for the line item.
    pub fn fund_id(mut self, fund_id: FundId) -> Self {
        self.fund_id = Some(fund_id);
        self
    }

    /// Set the quantity for the line item.
    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction and its line items in the database.
///
/// The transaction and its line items are inserted atomically.
///
/// # Errors
/// This function will return an [Error::SqlError] if a donor, appeal or fund
/// ID does not refer to an existing row, or if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let id: TransactionId = sql_transaction
        .prepare(
            "INSERT INTO \"transaction\" (created_at, status, total, payment_method, donor_id, order_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id",
        )?
        .query_row(
            (
                builder.created_at,
                builder.status.as_str(),
                builder.total,
                &builder.payment_method,
                builder.donor_id,
                &builder.order_id,
            ),
            |row| row.get(0),
        )?;

    let mut details = Vec::with_capacity(builder.details.len());
    {
        let mut insert_detail = sql_transaction.prepare(
            "INSERT INTO transaction_detail (transaction_id, freq, appeal_id, fund_id, amount, quantity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id",
        )?;

        for detail in builder.details {
            let detail_id: TransactionDetailId = insert_detail.query_row(
                (
                    id,
                    detail.cadence.code(),
                    detail.appeal_id,
                    detail.fund_id,
                    detail.amount,
                    detail.quantity,
                ),
                |row| row.get(0),
            )?;

            details.push(TransactionDetail {
                id: detail_id,
                transaction_id: id,
                cadence: detail.cadence,
                appeal_id: detail.appeal_id,
                fund_id: detail.fund_id,
                amount: detail.amount,
                quantity: detail.quantity,
            });
        }
    }

    sql_transaction.commit()?;

    Ok(Transaction {
        id,
        created_at: builder.created_at,
        status: builder.status,
        total: builder.total,
        payment_method: builder.payment_method,
        donor_id: builder.donor_id,
        order_id: builder.order_id,
        details,
    })
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL,
                total REAL NOT NULL,
                payment_method TEXT,
                donor_id INTEGER,
                order_id TEXT NOT NULL,
                FOREIGN KEY(donor_id) REFERENCES donor(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_created_at ON \"transaction\"(created_at)",
        (),
    )?;

    Ok(())
}

/// Create the transaction detail table in the database.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_transaction_detail_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transaction_detail (
                id INTEGER PRIMARY KEY,
                transaction_id INTEGER NOT NULL,
                freq INTEGER NOT NULL DEFAULT 0,
                appeal_id INTEGER,
                fund_id INTEGER,
                amount REAL NOT NULL,
                quantity INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(appeal_id) REFERENCES appeal(id) ON UPDATE CASCADE ON DELETE SET NULL,
                FOREIGN KEY(fund_id) REFERENCES fund(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_detail_transaction_id
            ON transaction_detail(transaction_id)",
        (),
    )?;

    Ok(())
}
