//! HMO/NHIS Insurance Domain
//!
//! This crate owns the insurance catalogue the hospital bills against and
//! answers the two questions asked at the point of care:
//!
//! - **Coverage**: is service X covered for patient P, and at what price?
//! - **Eligibility**: is the patient's policy in force today?
//!
//! # Catalogue
//!
//! - **HmoProvider**: an insurer (private HMO, NHIS, corporate scheme)
//! - **ServicePackage**: a plan sold by a provider, with an annual limit,
//!   a default copay and lists of covered and excluded service codes
//! - **NhisServiceCode**: the canonical catalogue of billable services
//! - **HmoTariff**: the negotiated price for a (provider, service) pair,
//!   effective over an inclusive date range
//!
//! At most one tariff per (provider, service) pair may be effective on any
//! date. New tariffs whose range overlaps an existing one are refused, and
//! when legacy rows do overlap the latest `effective_from` wins.

pub mod provider;
pub mod package;
pub mod service_code;
pub mod tariff;
pub mod coverage;
pub mod admin;
pub mod error;
pub mod ports;

pub use provider::{HmoProvider, CoverageType, NewHmoProvider, HmoProviderUpdate};
pub use package::{ServicePackage, NewServicePackage, PackageVerdict};
pub use service_code::{NhisServiceCode, NewServiceCode};
pub use tariff::{HmoTariff, NewTariff, select_effective};
pub use coverage::{CoverageDecision, CoverageResolver, EligibilityReport, PolicyStatus};
pub use admin::{HmoAdminService, EnrollPatient};
pub use error::HmoError;
pub use ports::{HmoPort, TariffQuery};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockHmoPort;
