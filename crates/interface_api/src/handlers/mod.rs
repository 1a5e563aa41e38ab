//! Request handlers, one module per resource

pub mod health;
pub mod patients;
pub mod hmo;
pub mod claims;
pub mod pharmacy;
pub mod referrals;
