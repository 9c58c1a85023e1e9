//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// The ID of an appeal (fundraising campaign).
pub type AppealId = DatabaseId;
/// The ID of a fund (donation designation).
pub type FundId = DatabaseId;
/// The ID of a donor.
pub type DonorId = DatabaseId;
/// The ID of a ledger transaction.
pub type TransactionId = DatabaseId;
/// The ID of a single line item of a ledger transaction.
pub type TransactionDetailId = DatabaseId;
