//! Pre-built Test Fixtures
//!
//! Ready-to-use values for unit tests. Dates are fixed so that tests which
//! depend on "today" pass an explicit date rather than reading the clock.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use uuid::Uuid;

use core_kernel::{
    Currency, HmoProviderId, InventoryItemId, Money, PatientId, Principal, Role, ServiceCodeId,
    UserId,
};

/// Naira amounts used across the HMO and claims tests
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A consultation tariff
    pub fn consultation() -> Money {
        Money::ngn(dec!(5000))
    }

    /// A laboratory test tariff
    pub fn lab_test() -> Money {
        Money::ngn(dec!(1200))
    }

    /// A fixed copay on a consultation
    pub fn copay() -> Money {
        Money::ngn(dec!(500))
    }

    pub fn zero() -> Money {
        Money::zero(Currency::NGN)
    }

    /// A dollar amount for currency mismatch tests
    pub fn usd_100() -> Money {
        Money::new(dec!(100), Currency::USD)
    }
}

/// Calendar fixtures for policy and tariff periods
pub struct DateFixtures;

impl DateFixtures {
    /// The day most tests treat as "today"
    pub fn today() -> NaiveDate {
        date(2026, 10, 19)
    }

    pub fn policy_start() -> NaiveDate {
        date(2026, 1, 1)
    }

    pub fn policy_end() -> NaiveDate {
        date(2026, 12, 31)
    }

    pub fn before_policy() -> NaiveDate {
        date(2025, 12, 31)
    }

    pub fn after_policy() -> NaiveDate {
        date(2027, 1, 1)
    }

    /// A date of birth for an adult patient
    pub fn date_of_birth() -> NaiveDate {
        date(1988, 5, 15)
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Deterministic identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn patient_id() -> PatientId {
        PatientId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap())
    }

    pub fn provider_id() -> HmoProviderId {
        HmoProviderId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap())
    }

    pub fn service_code_id() -> ServiceCodeId {
        ServiceCodeId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440003").unwrap())
    }

    pub fn item_id() -> InventoryItemId {
        InventoryItemId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440004").unwrap())
    }

    pub fn user_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440005").unwrap())
    }
}

/// Signed-in staff members, one per role
pub struct StaffFixtures;

impl StaffFixtures {
    pub fn with_role(role: Role) -> Principal {
        Principal::new(UserId::new(), role)
    }

    pub fn admin() -> Principal {
        Self::with_role(Role::Admin)
    }

    pub fn doctor() -> Principal {
        Self::with_role(Role::Doctor)
    }

    pub fn nurse() -> Principal {
        Self::with_role(Role::Nurse)
    }

    pub fn pharmacist() -> Principal {
        Self::with_role(Role::Pharmacist)
    }

    pub fn cashier() -> Principal {
        Self::with_role(Role::Cashier)
    }

    pub fn receptionist() -> Principal {
        Self::with_role(Role::Receptionist)
    }
}
