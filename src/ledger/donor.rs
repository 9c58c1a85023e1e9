//! Donors and the demographic attributes reports group by.

use rusqlite::Connection;

use crate::{Error, database_id::DonorId};

/// A person or organisation that makes donations.
#[derive(Debug, Clone, PartialEq)]
pub struct Donor {
    /// The ID of the donor.
    pub id: DonorId,
    /// The donor's name.
    pub name: String,
    /// The donor's country, if known.
    pub country: Option<String>,
}

/// Create a new donor in the database.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn create_donor(
    name: &str,
    country: Option<&str>,
    connection: &Connection,
) -> Result<Donor, Error> {
    let donor = connection
        .prepare("INSERT INTO donor (name, country) VALUES (?1, ?2) RETURNING id, name, country")?
        .query_row((name, country), |row| {
            Ok(Donor {
                id: row.get(0)?,
                name: row.get(1)?,
                country: row.get(2)?,
            })
        })?;

    Ok(donor)
}

/// Create the donor table in the database.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_donor_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS donor (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                country TEXT
                )",
        (),
    )?;

    Ok(())
}
