//! Core Kernel - Foundational types shared by the hospital insurance services
//!
//! This crate provides the building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Effective date ranges and the hospital's local calendar
//! - Strongly-typed identifiers
//! - The authenticated principal passed into every operation
//! - Human-facing reference codes (claim numbers, referral codes, MRNs)
//! - The error taxonomy shared by all port adapters

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod access;
pub mod reference;
pub mod ports;

pub use money::{Money, Currency, MoneyError, Rate, AMOUNT_SCALE};
pub use temporal::{EffectiveRange, Timezone, TemporalError};
pub use identifiers::{
    UserId, PatientId, HmoProviderId, ServicePackageId, ServiceCodeId, TariffId,
    HmoClaimId, ClaimItemId, PrescriptionId, FillId, InventoryItemId, BatchId,
    StockMovementId, ReferralId,
};
pub use access::{AccessDenied, Principal, Role, UnknownRole};
pub use reference::{generate_reference, generate_reference_at};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
