//! Creates the ledger schema in the application's database.

use rusqlite::Connection;

use crate::{
    Error,
    ledger::{
        create_appeal_table, create_donor_table, create_fund_table,
        create_recurring_schedule_table, create_transaction_detail_table,
        create_transaction_table,
    },
};

/// Create all the ledger tables.
///
/// Tables that already exist are left untouched, so this is safe to call on a
/// ledger populated by another process.
///
/// # Errors
/// Returns an [Error::SqlError] if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = connection.unchecked_transaction()?;

    create_appeal_table(&transaction)?;
    create_fund_table(&transaction)?;
    create_donor_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_transaction_detail_table(&transaction)?;
    create_recurring_schedule_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
