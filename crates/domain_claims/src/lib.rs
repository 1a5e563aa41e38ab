//! HMO Claims Domain
//!
//! This crate implements the lifecycle of a reimbursement claim filed with
//! an HMO for services rendered to an enrolled patient.
//!
//! # Claim Lifecycle
//!
//! ```text
//! Pending -> Submitted -> Approved -> Paid
//!                      \-> Rejected
//! ```
//!
//! A claim's totals are derived from its line items when it is created:
//! `claim_amount = total_amount - copay_amount`. An approver may record a
//! lower `approved_amount`; the derived totals are never rewritten.

pub mod claim;
pub mod item;
pub mod statistics;
pub mod service;
pub mod error;
pub mod ports;

pub use claim::{HmoClaim, ClaimStatus, ClaimTransition, ClaimDetail, NewClaim, generate_claim_number};
pub use item::{ClaimItem, NewClaimItem, ClaimTotals};
pub use statistics::ClaimStatistics;
pub use service::ClaimsService;
pub use error::ClaimError;
pub use ports::{ClaimsPort, ClaimQuery};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockClaimsPort;
