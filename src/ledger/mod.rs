//! The donation ledger: its schema and helpers for seeding it.
//!
//! The ledger is owned and written by other processes. The reporting core only
//! ever reads it; the write helpers here exist to seed databases for tests and
//! for the `create_test_db` binary.

mod appeal;
mod donor;
mod fund;
mod schedule;
mod transaction;

pub use appeal::{Appeal, create_appeal, create_appeal_table};
pub use donor::{Donor, create_donor, create_donor_table};
pub use fund::{Fund, create_fund, create_fund_table, set_fund_disabled};
pub use schedule::{
    RecurringSchedule, RecurringScheduleBuilder, create_recurring_schedule,
    create_recurring_schedule_table, map_recurring_schedule_row,
};
pub use transaction::{
    QUALIFYING_STATUSES, Transaction, TransactionBuilder, TransactionDetail,
    TransactionDetailBuilder, TransactionStatus, create_transaction,
    create_transaction_detail_table, create_transaction_table,
};
