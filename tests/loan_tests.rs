use amortize::{round_money, LoanCalculator, LoanError, PaymentRecord, DEFAULT_SCHEDULE_PERIODS};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use test_log::test;

// ===========================================================================
// Example loans
// ===========================================================================

#[test]
fn test_thirty_year_mortgage() {
    let loan = LoanCalculator::parse("250000", "0.045", 30).unwrap();

    assert_eq!(loan.total_payments(), 360);
    assert_eq!(loan.compute_monthly_payment(), dec!(1266.71));
    assert_eq!(loan.total_interest_paid(), dec!(206015.60));

    let schedule: Vec<PaymentRecord> = loan.first_year_schedule().collect();
    assert_eq!(schedule.len(), DEFAULT_SCHEDULE_PERIODS as usize);
    assert_eq!(schedule[0].interest_portion, dec!(937.50));
    assert_eq!(schedule[0].balance_after, dec!(249670.79));
}

#[test]
fn test_interest_free_loan_rounding_residue() {
    let loan = LoanCalculator::parse("50000", "0", 10).unwrap();

    assert_eq!(loan.compute_monthly_payment(), round_money(dec!(50000) / dec!(120)));
    assert_eq!(loan.compute_monthly_payment(), dec!(416.67));
    // 120 * 416.67 overshoots the principal by 0.40
    assert_eq!(loan.total_interest_paid(), dec!(0.40));
}

#[test]
fn test_car_loan_first_period() {
    let loan = LoanCalculator::parse("25000", "0.0675", 5).unwrap();
    let first = loan.first_year_schedule().next().unwrap();

    assert_eq!(first.index, 1);
    assert_eq!(first.interest_portion, round_money(dec!(25000) * dec!(0.0675) / dec!(12)));
    assert_eq!(first.payment_amount, loan.compute_monthly_payment());
}

// ===========================================================================
// Schedule properties
// ===========================================================================

#[test]
fn test_full_schedule_reaches_zero() {
    let loan = LoanCalculator::new(dec!(1000), dec!(0.12), 1).unwrap();
    let records: Vec<PaymentRecord> = loan.full_schedule().collect();

    assert_eq!(records.len(), 12);
    assert!(records.iter().all(|r| r.interest_portion + r.principal_portion == r.payment_amount));
    assert!(records.windows(2).all(|w| w[1].balance_after <= w[0].balance_after));
    assert!(records[11].balance_after.abs() <= dec!(0.01));
}

#[test]
fn test_independent_calculators() {
    let loans: Vec<LoanCalculator> = [("250000", "0.045", 30), ("25000", "0.0675", 5)]
        .iter()
        .map(|(p, r, y)| LoanCalculator::parse(p, r, *y).unwrap())
        .collect();

    let payments: Vec<Decimal> = std::thread::scope(|s| {
        let handles: Vec<_> = loans
            .iter()
            .map(|loan| s.spawn(move || loan.compute_monthly_payment()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(payments, vec![dec!(1266.71), dec!(492.09)]);
}

// ===========================================================================
// Validation
// ===========================================================================

#[test]
fn test_rejects_invalid_parameters() {
    for (principal, rate, years) in [("0", "0.05", 10), ("1000", "-0.05", 10), ("1000", "0.05", 0)] {
        let result = LoanCalculator::parse(principal, rate, years);
        assert!(
            matches!(result, Err(LoanError::InvalidParameter { .. })),
            "{principal}, {rate}, {years}"
        );
    }
}
