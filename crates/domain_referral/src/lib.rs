//! Referral Domain
//!
//! Doctors refer patients to other facilities and specialists. Each
//! referral carries a human-readable code that the receiving facility can
//! verify without an account.
//!
//! # Referral Lifecycle
//!
//! ```text
//! Pending -> Accepted -> Completed
//!    \          \
//!     \-> Cancelled <-/
//! ```

pub mod referral;
pub mod service;
pub mod error;
pub mod ports;

pub use referral::{
    Referral, ReferralStatus, Urgency, NewReferral, ReferralTransition, ReferralVerification,
    generate_referral_code,
};
pub use service::ReferralService;
pub use error::ReferralError;
pub use ports::{ReferralPort, ReferralQuery};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockReferralPort;
