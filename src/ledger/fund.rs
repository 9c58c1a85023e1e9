//! Funds are the designations a donation can be earmarked for.

use rusqlite::Connection;

use crate::{
    Error,
    database_id::{AppealId, FundId},
};

/// A designation for donated money, optionally belonging to an appeal.
#[derive(Debug, Clone, PartialEq)]
pub struct Fund {
    /// The ID of the fund.
    pub id: FundId,
    /// The display name of the fund.
    pub name: String,
    /// The appeal this fund belongs to, if any.
    pub appeal_id: Option<AppealId>,
    /// Disabled funds no longer accept donations, but keep their history.
    pub disabled: bool,
}

/// Create a new, enabled fund in the database.
///
/// # Errors
/// Returns an [Error::SqlError] if `appeal_id` does not refer to an appeal or
/// there is some other SQL error.
pub fn create_fund(
    name: &str,
    appeal_id: Option<AppealId>,
    connection: &Connection,
) -> Result<Fund, Error> {
    let fund = connection
        .prepare(
            "INSERT INTO fund (name, appeal_id, disabled) VALUES (?1, ?2, 0)
             RETURNING id, name, appeal_id, disabled",
        )?
        .query_row((name, appeal_id), |row| {
            Ok(Fund {
                id: row.get(0)?,
                name: row.get(1)?,
                appeal_id: row.get(2)?,
                disabled: row.get(3)?,
            })
        })?;

    Ok(fund)
}

/// Enable or disable a fund.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a fund, or an
/// [Error::SqlError] if there is some other SQL error.
pub fn set_fund_disabled(id: FundId, disabled: bool, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE fund SET disabled = ?1 WHERE id = ?2",
        (disabled, id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Create the fund table in the database.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_fund_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS fund (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                appeal_id INTEGER,
                disabled INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(appeal_id) REFERENCES appeal(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    Ok(())
}
