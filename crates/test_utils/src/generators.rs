//! Property-Based Test Generators
//!
//! Proptest strategies that produce values satisfying domain invariants.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{EffectiveRange, ServiceCodeId};
use domain_claims::NewClaimItem;

/// Strategy for naira amounts with kobo precision, up to ten million
pub fn ngn_amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000i64).prop_map(|kobo| Decimal::new(kobo, 2))
}

/// Strategy for copay percentages from 0% to 100% with two decimals
pub fn percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0u32..=10_000u32).prop_map(|n| Decimal::new(i64::from(n), 2))
}

/// Strategy for calendar dates between 2020 and roughly 2035
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..5_500i64).prop_map(|days| {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default() + Duration::days(days)
    })
}

/// Strategy for valid effective ranges, a quarter of them open-ended
pub fn effective_range_strategy() -> impl Strategy<Value = EffectiveRange> {
    (date_strategy(), prop::option::weighted(0.75, 0i64..730i64)).prop_map(|(from, length)| {
        EffectiveRange {
            from,
            to: length.map(|days| from + Duration::days(days)),
        }
    })
}

/// Strategy for a valid claim line: copay never exceeds the line total
pub fn claim_item_strategy() -> impl Strategy<Value = NewClaimItem> {
    (1u32..10u32, ngn_amount_strategy(), 0u32..=100u32).prop_map(|(quantity, unit_price, copay_pct)| {
        let total_price = unit_price * Decimal::from(quantity);
        let copay = (total_price * Decimal::from(copay_pct) / Decimal::from(100)).round_dp(2);
        NewClaimItem {
            service_code_id: ServiceCodeId::new(),
            quantity: Some(quantity),
            unit_price,
            total_price,
            copay: Some(copay.min(total_price)),
            diagnosis_code: None,
            provider_id: None,
        }
    })
}

/// Strategy for the items of a claim (one to eight lines)
pub fn claim_items_strategy() -> impl Strategy<Value = Vec<NewClaimItem>> {
    prop::collection::vec(claim_item_strategy(), 1..8)
}

/// Strategy for a sequence of stock receipts and withdrawals
///
/// `true` is a receipt, `false` a withdrawal attempt.
pub fn stock_operations_strategy() -> impl Strategy<Value = Vec<(bool, u32)>> {
    prop::collection::vec((any::<bool>(), 1u32..50u32), 0..30)
}
