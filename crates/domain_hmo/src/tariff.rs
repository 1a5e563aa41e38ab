//! Negotiated tariffs
//!
//! A tariff prices one NHIS service for one provider over an inclusive date
//! range. The patient's share is either a fixed copay amount or a
//! percentage of the tariff; a fixed amount takes precedence.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{EffectiveRange, HmoProviderId, Money, Rate, ServiceCodeId, TariffId};

use crate::error::HmoError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmoTariff {
    pub id: TariffId,
    pub hmo_provider_id: HmoProviderId,
    pub service_code_id: ServiceCodeId,
    pub tariff_amount: Money,
    pub copay_amount: Option<Money>,
    pub copay_percentage: Option<Decimal>,
    pub effective_from: NaiveDate,
    /// Last day the tariff applies; `None` is open-ended
    pub effective_to: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl HmoTariff {
    pub fn effective_range(&self) -> EffectiveRange {
        EffectiveRange {
            from: self.effective_from,
            to: self.effective_to,
        }
    }

    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.effective_range().contains(date)
    }

    /// The amount the patient pays out of pocket for one unit of service
    pub fn patient_pays(&self) -> Money {
        match (self.copay_amount, self.copay_percentage) {
            (Some(fixed), _) => fixed,
            (None, Some(pct)) => Rate::from_percentage(pct)
                .apply(&self.tariff_amount)
                .round_to_currency(),
            (None, None) => Money::zero(self.tariff_amount.currency()),
        }
    }
}

/// Picks the tariff in force on `date`
///
/// When several rows match, the latest `effective_from` wins and equal start
/// dates fall back to the most recently created row.
pub fn select_effective(tariffs: &[HmoTariff], date: NaiveDate) -> Option<&HmoTariff> {
    tariffs
        .iter()
        .filter(|t| t.is_effective_on(date))
        .max_by(|a, b| {
            a.effective_from
                .cmp(&b.effective_from)
                .then(a.created_at.cmp(&b.created_at))
        })
}

/// Data required to price a service for a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTariff {
    pub hmo_provider_id: HmoProviderId,
    pub service_code_id: ServiceCodeId,
    pub tariff_amount: Decimal,
    pub copay_amount: Option<Decimal>,
    pub copay_percentage: Option<Decimal>,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

impl NewTariff {
    pub fn into_tariff(self) -> Result<HmoTariff, HmoError> {
        EffectiveRange::new(self.effective_from, self.effective_to)
            .map_err(|e| HmoError::invalid(e.to_string()))?;
        if self.tariff_amount.is_sign_negative() {
            return Err(HmoError::invalid("Tariff amount cannot be negative"));
        }
        for amount in [Some(self.tariff_amount), self.copay_amount, self.copay_percentage]
            .into_iter()
            .flatten()
        {
            Money::check_scale(amount).map_err(|e| HmoError::invalid(e.to_string()))?;
        }
        if let Some(copay) = self.copay_amount {
            if copay.is_sign_negative() || copay > self.tariff_amount {
                return Err(HmoError::invalid(
                    "Copay amount must be between zero and the tariff amount",
                ));
            }
        }
        if let Some(pct) = self.copay_percentage {
            Rate::try_from_percentage(pct).map_err(|e| HmoError::invalid(e.to_string()))?;
        }
        Ok(HmoTariff {
            id: TariffId::new_v7(),
            hmo_provider_id: self.hmo_provider_id,
            service_code_id: self.service_code_id,
            tariff_amount: Money::ngn(self.tariff_amount),
            copay_amount: self.copay_amount.map(Money::ngn),
            copay_percentage: self.copay_percentage,
            effective_from: self.effective_from,
            effective_to: self.effective_to,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tariff(amount: Decimal, from: NaiveDate, to: Option<NaiveDate>) -> HmoTariff {
        NewTariff {
            hmo_provider_id: HmoProviderId::new(),
            service_code_id: ServiceCodeId::new(),
            tariff_amount: amount,
            copay_amount: None,
            copay_percentage: Some(dec!(10)),
            effective_from: from,
            effective_to: to,
        }
        .into_tariff()
        .unwrap()
    }

    #[test]
    fn test_percentage_copay() {
        let t = tariff(dec!(5000), date(2026, 1, 1), None);
        assert_eq!(t.patient_pays().amount(), dec!(500));
    }

    #[test]
    fn test_fixed_copay_takes_precedence() {
        let mut t = tariff(dec!(5000), date(2026, 1, 1), None);
        t.copay_amount = Some(Money::ngn(dec!(750)));
        assert_eq!(t.patient_pays().amount(), dec!(750));
    }

    #[test]
    fn test_no_copay_terms_means_zero() {
        let mut t = tariff(dec!(5000), date(2026, 1, 1), None);
        t.copay_percentage = None;
        assert!(t.patient_pays().is_zero());
    }

    #[test]
    fn test_latest_effective_from_wins() {
        let older = tariff(dec!(4000), date(2025, 1, 1), None);
        let newer = tariff(dec!(5000), date(2026, 1, 1), None);
        let rows = vec![newer.clone(), older];
        let picked = select_effective(&rows, date(2026, 6, 1)).unwrap();
        assert_eq!(picked.id, newer.id);
    }

    #[test]
    fn test_equal_start_falls_back_to_created_at() {
        let first = tariff(dec!(4000), date(2026, 1, 1), None);
        let mut second = tariff(dec!(4500), date(2026, 1, 1), None);
        second.created_at = first.created_at + Duration::seconds(5);
        let rows = vec![second.clone(), first];
        assert_eq!(select_effective(&rows, date(2026, 2, 1)).unwrap().id, second.id);
    }

    #[test]
    fn test_expired_tariff_is_ignored() {
        let rows = vec![tariff(dec!(4000), date(2025, 1, 1), Some(date(2025, 12, 31)))];
        assert!(select_effective(&rows, date(2026, 1, 1)).is_none());
        assert!(select_effective(&rows, date(2025, 12, 31)).is_some());
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let result = NewTariff {
            hmo_provider_id: HmoProviderId::new(),
            service_code_id: ServiceCodeId::new(),
            tariff_amount: dec!(100),
            copay_amount: None,
            copay_percentage: None,
            effective_from: date(2026, 2, 1),
            effective_to: Some(date(2026, 1, 1)),
        }
        .into_tariff();
        assert!(matches!(result, Err(HmoError::InvalidData(_))));
    }

    #[test]
    fn test_amount_finer_than_storage_scale_is_rejected() {
        let result = NewTariff {
            hmo_provider_id: HmoProviderId::new(),
            service_code_id: ServiceCodeId::new(),
            tariff_amount: dec!(5000),
            copay_amount: None,
            copay_percentage: Some(dec!(7.123456)),
            effective_from: date(2026, 1, 1),
            effective_to: None,
        }
        .into_tariff();
        assert!(matches!(result, Err(HmoError::InvalidData(_))));
    }
}
