//! Unit tests for the Money module
//!
//! Tests cover money creation, arithmetic, summation, copay rates
//! and currency handling.

use core_kernel::{Currency, Money, MoneyError, Rate};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_rounds_to_four_decimal_places() {
        let m = Money::new(dec!(100.123456789), Currency::NGN);
        assert_eq!(m.amount(), dec!(100.1235));
    }

    #[test]
    fn test_from_minor_converts_kobo() {
        let m = Money::from_minor(250_000, Currency::NGN);
        assert_eq!(m.amount(), dec!(2500.00));
    }

    #[test]
    fn test_default_currency_is_naira() {
        assert_eq!(Currency::default(), Currency::NGN);
        assert_eq!(Money::ngn(dec!(1)).currency(), Currency::NGN);
    }

    #[test]
    fn test_currency_parses_case_insensitively() {
        assert_eq!("ngn".parse::<Currency>().unwrap(), Currency::NGN);
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::USD);
        assert!(matches!(
            "XYZ".parse::<Currency>(),
            Err(MoneyError::UnknownCurrency(_))
        ));
    }
}

mod predicates {
    use super::*;

    #[test]
    fn test_zero_is_neither_positive_nor_negative() {
        let m = Money::zero(Currency::NGN);
        assert!(m.is_zero());
        assert!(!m.is_positive());
        assert!(!m.is_negative());
    }

    #[test]
    fn test_negative_amount() {
        let m = Money::ngn(dec!(-0.01));
        assert!(m.is_negative());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_checked_sub_same_currency() {
        let total = Money::ngn(dec!(5000));
        let copay = Money::ngn(dec!(500));
        assert_eq!(total.checked_sub(&copay).unwrap(), Money::ngn(dec!(4500)));
    }

    #[test]
    fn test_checked_sub_rejects_currency_mismatch() {
        let ngn = Money::ngn(dec!(10));
        let gbp = Money::new(dec!(10), Currency::GBP);
        assert!(matches!(
            ngn.checked_sub(&gbp),
            Err(MoneyError::CurrencyMismatch(_, _))
        ));
    }

    #[test]
    fn test_check_scale_limits_decimal_places() {
        assert_eq!(Money::check_scale(dec!(5000.1234)).unwrap(), dec!(5000.1234));
        assert!(Money::check_scale(dec!(5000.000000)).is_ok());
        assert!(matches!(
            Money::check_scale(dec!(0.00001)),
            Err(MoneyError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_sum_of_empty_is_zero() {
        let total = Money::sum(Currency::NGN, &[]).unwrap();
        assert!(total.is_zero());
    }

    #[test]
    fn test_sum_rejects_mixed_currencies() {
        let items = [Money::ngn(dec!(1)), Money::new(dec!(1), Currency::EUR)];
        assert!(Money::sum(Currency::NGN, &items).is_err());
    }

    #[test]
    fn test_multiply_by_quantity() {
        let unit = Money::ngn(dec!(1250.25));
        assert_eq!(unit.multiply(dec!(3)).amount(), dec!(3750.75));
    }

    #[test]
    fn test_round_to_currency() {
        let m = Money::ngn(dec!(10.4567));
        assert_eq!(m.round_to_currency().amount(), dec!(10.46));
    }

    #[test]
    fn test_display_uses_naira_symbol() {
        assert_eq!(Money::ngn(dec!(5000)).to_string(), "₦ 5000.00");
    }
}

mod rates {
    use super::*;

    #[test]
    fn test_copay_rate_on_tariff() {
        let rate = Rate::try_from_percentage(dec!(20)).unwrap();
        let share = rate.apply(&Money::ngn(dec!(7500)));
        assert_eq!(share.amount(), dec!(1500));
        assert_eq!(rate.to_string(), "20%");
    }

    #[test]
    fn test_full_copay_equals_tariff() {
        let rate = Rate::try_from_percentage(dec!(100)).unwrap();
        let tariff = Money::ngn(dec!(3200));
        assert_eq!(rate.apply(&tariff), tariff);
    }
}
