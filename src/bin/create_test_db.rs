use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, macros::datetime};

use donation_reports::{
    Cadence, RecurringSchedule, Transaction, TransactionDetail, TransactionStatus, create_appeal,
    create_donor, create_fund, create_recurring_schedule, create_transaction, initialize_db,
    set_fund_disabled,
};

/// A utility for creating a demo donation ledger for the report server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// How many days of donations to generate.
    #[arg(long, default_value_t = 180)]
    days: u32,
}

const PAYMENT_METHODS: [&str; 3] = ["card", "paypal", "bank-transfer"];
const COUNTRIES: [Option<&str>; 4] = [
    Some("New Zealand"),
    Some("Australia"),
    Some("United Kingdom"),
    None,
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating appeals and funds...");
    let winter = create_appeal("Winter Appeal", &conn)?;
    let water = create_appeal("Clean Water", &conn)?;
    let funds = [
        create_fund("Blankets", Some(winter.id), &conn)?,
        create_fund("Soup Kitchen", Some(winter.id), &conn)?,
        create_fund("Wells", Some(water.id), &conn)?,
        create_fund("General", None, &conn)?,
    ];
    let retired = create_fund("Retired Programme", None, &conn)?;

    println!("Creating donors...");
    let donors = (0..12)
        .map(|i| create_donor(&format!("Donor {i}"), COUNTRIES[i % COUNTRIES.len()], &conn))
        .collect::<Result<Vec<_>, _>>()?;

    println!("Creating {} days of donations...", args.days);
    let start = datetime!(2024-01-01 09:00);
    let mut order_number = 1000;

    for day in 0..args.days {
        let created_at = start + Duration::days(day.into());
        let i = day as usize;

        order_number += 1;
        let fund = &funds[i % funds.len()];
        let amount = 10.0 + (i % 7) as f64 * 5.0;
        let mut detail = TransactionDetail::build(Cadence::OneTime, amount).fund_id(fund.id);
        if let Some(appeal_id) = fund.appeal_id {
            detail = detail.appeal_id(appeal_id);
        }
        let status = if i % 11 == 0 {
            TransactionStatus::Failed
        } else {
            TransactionStatus::Completed
        };
        create_transaction(
            Transaction::build(amount, created_at, &order_number.to_string())
                .status(status)
                .payment_method(PAYMENT_METHODS[i % PAYMENT_METHODS.len()])
                .donor_id(donors[i % donors.len()].id)
                .detail(detail),
            &conn,
        )?;

        // A new monthly plan starts every ten days.
        if day % 10 == 0 {
            order_number += 1;
            let transaction = create_transaction(
                Transaction::build(25.0, created_at, &order_number.to_string())
                    .payment_method("card")
                    .donor_id(donors[(i / 10) % donors.len()].id)
                    .detail(TransactionDetail::build(Cadence::Monthly, 25.0).fund_id(funds[3].id)),
                &conn,
            )?;

            let months_kept = (i / 10) % 6 + 1;
            let mut schedule = RecurringSchedule::build(transaction.details[0].id, created_at.date())
                .next_run_date((created_at + Duration::days(30 * months_kept as i64)).date());
            if (i / 10) % 3 == 0 {
                schedule = schedule.status("CANCELLED");
            }
            create_recurring_schedule(schedule, &conn)?;

            for installment in 2..=months_kept {
                let installment_at = created_at + Duration::days(30 * (installment as i64 - 1));
                create_transaction(
                    Transaction::build(25.0, installment_at, &format!("{order_number}-{installment}"))
                        .payment_method("card")
                        .detail(
                            TransactionDetail::build(Cadence::Monthly, 25.0).fund_id(funds[3].id),
                        ),
                    &conn,
                )?;
            }
        }

        if day % 30 == 0 {
            order_number += 1;
            create_transaction(
                Transaction::build(120.0, created_at, &order_number.to_string())
                    .payment_method("bank-transfer")
                    .detail(TransactionDetail::build(Cadence::Yearly, 120.0).fund_id(retired.id)),
                &conn,
            )?;
        }
    }

    set_fund_disabled(retired.id, true, &conn)?;

    println!("Success!");

    Ok(())
}
