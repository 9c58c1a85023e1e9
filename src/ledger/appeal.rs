//! Appeals are the fundraising campaigns that donations are made to.

use rusqlite::Connection;

use crate::{Error, database_id::AppealId};

/// A fundraising campaign, e.g. "Winter Appeal 2024".
#[derive(Debug, Clone, PartialEq)]
pub struct Appeal {
    /// The ID of the appeal.
    pub id: AppealId,
    /// The display name of the appeal.
    pub name: String,
}

/// Create a new appeal in the database.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn create_appeal(name: &str, connection: &Connection) -> Result<Appeal, Error> {
    let appeal = connection
        .prepare("INSERT INTO appeal (name) VALUES (?1) RETURNING id, name")?
        .query_row((name,), |row| {
            Ok(Appeal {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

    Ok(appeal)
}

/// Create the appeal table in the database.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_appeal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS appeal (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}
