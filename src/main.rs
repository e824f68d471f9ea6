use amortize::{LoanCalculator, LoanError, Money, PaymentRecord};
use clap::Parser;
use log::{error, info};
use simple_logger::SimpleLogger;
use std::process::ExitCode;

/// Fixed-rate loan payment and amortization calculator.
///
/// Without --principal the built-in example loans are shown.
#[derive(Parser, Debug)]
#[command(name = "amortize", version, about)]
struct Cli {
    /// Loan amount, e.g. 250000
    #[arg(long, requires_all = ["rate", "years"])]
    principal: Option<String>,

    /// Annual rate as a decimal fraction, e.g. 0.045 for 4.5%
    #[arg(long, requires = "principal")]
    rate: Option<String>,

    /// Loan term in whole years
    #[arg(long, allow_negative_numbers = true, requires = "principal")]
    years: Option<i32>,

    /// Number of payments to list per loan
    #[arg(long, default_value_t = 3)]
    periods: u32,

    /// Log calculation details
    #[arg(short, long)]
    verbose: bool,
}

struct Scenario {
    description: &'static str,
    principal: &'static str,
    rate: &'static str,
    years: i32,
}

const EXAMPLE_LOANS: [Scenario; 3] = [
    Scenario {
        description: "30-year mortgage",
        principal: "250000",
        rate: "0.045",
        years: 30,
    },
    Scenario {
        description: "5-year car loan",
        principal: "25000",
        rate: "0.0675",
        years: 5,
    },
    Scenario {
        description: "Interest-free loan",
        principal: "50000",
        rate: "0",
        years: 10,
    },
];

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("could not initialise logging: {e}");
    }

    let result = match (&cli.principal, &cli.rate, cli.years) {
        (Some(principal), Some(rate), Some(years)) => {
            show_loan("Custom loan", principal, rate, years, cli.periods)
        }
        _ => EXAMPLE_LOANS.iter().try_for_each(|loan| {
            show_loan(
                loan.description,
                loan.principal,
                loan.rate,
                loan.years,
                cli.periods,
            )
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn show_loan(
    description: &str,
    principal: &str,
    rate: &str,
    years: i32,
    periods: u32,
) -> Result<(), LoanError> {
    let calc = LoanCalculator::parse(principal, rate, years)?;
    info!("{description}: {} payments", calc.total_payments());

    let monthly = calc.compute_monthly_payment();
    let total_interest = calc.total_interest_paid();

    println!("\n{description}:");
    println!("{}", "-".repeat(50));
    println!("Loan Amount: ${}", group_thousands(calc.principal()));
    println!("Monthly Payment: ${monthly}");
    println!("Total Interest: ${}", group_thousands(total_interest));
    println!("Total Cost: ${}", group_thousands(calc.total_cost()));

    let schedule: Vec<PaymentRecord> = calc.schedule(periods).collect();
    println!("\nFirst {} Payments:", schedule.len());
    println!(
        "{:<3} {:<10} {:<10} {:<10} {:<10}",
        "Pmt", "Payment", "Interest", "Principal", "Balance"
    );
    println!("{}", "-".repeat(50));
    for pmt in &schedule {
        println!(
            "{:<3} {:<10} {:<10} {:<10} {:<12}",
            pmt.index,
            format!("${}", pmt.payment_amount),
            format!("${}", pmt.interest_portion),
            format!("${}", pmt.principal_portion),
            format!("${}", group_thousands(pmt.balance_after)),
        );
    }
    Ok(())
}

// 1234567.5 -> "1,234,567.5"
fn group_thousands(amt: Money) -> String {
    let text = amt.to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(text.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

// verifies that types can implement the gated traits below
fn is_normal<T: Sized + Send + Sync + Unpin>() {}

#[test]
fn normal_types() {
    is_normal::<LoanCalculator>();
    is_normal::<PaymentRecord>();
    is_normal::<amortize::AmortizationSchedule>();
}

#[test]
fn grouped_amounts() {
    use rust_decimal_macros::dec;

    assert_eq!(group_thousands(dec!(250000)), "250,000");
    assert_eq!(group_thousands(dec!(206015.60)), "206,015.60");
    assert_eq!(group_thousands(dec!(999.99)), "999.99");
    assert_eq!(group_thousands(dec!(-1234567.5)), "-1,234,567.5");
}

#[test]
fn cli_requires_complete_custom_loan() {
    assert!(Cli::try_parse_from(["amortize", "--principal", "1000"]).is_err());
    assert!(Cli::try_parse_from(["amortize", "--rate", "0.05"]).is_err());
    assert!(Cli::try_parse_from(["amortize", "--years", "10"]).is_err());
    assert!(Cli::try_parse_from(["amortize", "--rate", "0.05", "--years", "10"]).is_err());
    assert!(Cli::try_parse_from(["amortize", "--periods", "5"]).is_ok());

    let cli = Cli::try_parse_from([
        "amortize",
        "--principal",
        "1000",
        "--rate",
        "0.12",
        "--years",
        "1",
    ])
    .unwrap();
    assert_eq!(cli.periods, 3);
    assert!(show_loan("Custom loan", "1000", "0.12", 1, cli.periods).is_ok());
    assert!(show_loan("Custom loan", "1000", "0.12", 0, cli.periods).is_err());
}
