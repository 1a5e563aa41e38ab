//! Custom Test Assertions
//!
//! Assertion helpers for domain types that give more meaningful failure
//! messages than a bare `assert_eq!`.

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_claims::ClaimDetail;
use domain_pharmacy::{MovementType, StockMovement};

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {}", money);
}

/// Asserts that a claim's header totals agree with its items
///
/// total = sum of item totals, copay = sum of item copays and
/// claim = total - copay.
pub fn assert_claim_totals_consistent(detail: &ClaimDetail) {
    let claim = &detail.claim;
    let total: Decimal = detail.items.iter().map(|i| i.total_price.amount()).sum();
    let copay: Decimal = detail.items.iter().map(|i| i.copay.amount()).sum();

    assert_eq!(
        claim.total_amount.amount(),
        total,
        "Claim {} total {} does not match item totals {}",
        claim.claim_number,
        claim.total_amount,
        total
    );
    assert_eq!(
        claim.copay_amount.amount(),
        copay,
        "Claim {} copay {} does not match item copays {}",
        claim.claim_number,
        claim.copay_amount,
        copay
    );
    assert_eq!(
        claim.claim_amount.amount(),
        total - copay,
        "Claim {} amount is not total minus copay",
        claim.claim_number
    );
}

/// Asserts that an item's stock equals the net of its movements
///
/// `movements` must be the item's full history.
pub fn assert_stock_matches_movements(current_stock: u32, movements: &[StockMovement]) {
    let net: i64 = movements
        .iter()
        .map(|m| match m.movement_type {
            MovementType::In => i64::from(m.quantity),
            MovementType::Out => -i64::from(m.quantity),
        })
        .sum();
    assert_eq!(
        i64::from(current_stock),
        net,
        "Stock level {} does not match net movements {} over {} records",
        current_stock,
        net,
        movements.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::TestClaimBuilder;
    use crate::fixtures::{DateFixtures, IdFixtures, MoneyFixtures};
    use core_kernel::UserId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_approx_eq_within_tolerance() {
        let a = Money::ngn(dec!(100.004));
        let b = Money::ngn(dec!(100.00));
        assert_money_approx_eq(&a, &b, dec!(0.01));
    }

    #[test]
    #[should_panic(expected = "Currency mismatch")]
    fn test_money_approx_eq_currency_mismatch() {
        assert_money_approx_eq(&MoneyFixtures::consultation(), &MoneyFixtures::usd_100(), dec!(1));
    }

    #[test]
    fn test_built_claim_totals_are_consistent() {
        let detail = TestClaimBuilder::new(IdFixtures::provider_id())
            .with_item(dec!(5000), dec!(500))
            .with_item(dec!(1200), dec!(0))
            .build()
            .build(UserId::new(), DateFixtures::today())
            .unwrap();
        assert_claim_totals_consistent(&detail);
        assert_money_zero(&MoneyFixtures::zero());
    }
}
