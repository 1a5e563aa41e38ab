//! The authenticated caller of an operation
//!
//! Every service operation receives the caller explicitly as a [`Principal`]
//! instead of reading it from ambient request state. Role checks and
//! ownership scoping are expressed against this value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::identifiers::UserId;

/// Staff roles recognised by the hospital system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Pharmacist,
    Cashier,
    Receptionist,
    LabTechnician,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Pharmacist => "pharmacist",
            Role::Cashier => "cashier",
            Role::Receptionist => "receptionist",
            Role::LabTechnician => "lab_technician",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "nurse" => Ok(Role::Nurse),
            "pharmacist" => Ok(Role::Pharmacist),
            "cashier" => Ok(Role::Cashier),
            "receptionist" => Ok(Role::Receptionist),
            "lab_technician" => Ok(Role::LabTechnician),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

/// Raised when a principal lacks the role an operation requires
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{role} is not permitted to {action}")]
pub struct AccessDenied {
    pub role: Role,
    pub action: String,
}

/// The authenticated user on whose behalf an operation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Returns true if the principal holds one of `roles`; admins always do
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.is_admin() || roles.contains(&self.role)
    }

    /// Fails with [`AccessDenied`] unless the principal holds one of `roles`
    pub fn require_any(&self, roles: &[Role], action: &str) -> Result<(), AccessDenied> {
        if self.has_any_role(roles) {
            Ok(())
        } else {
            Err(AccessDenied {
                role: self.role,
                action: action.to_string(),
            })
        }
    }

    /// Returns the user a listing must be scoped to, or `None` for admins
    pub fn ownership_scope(&self) -> Option<UserId> {
        if self.is_admin() {
            None
        } else {
            Some(self.id)
        }
    }
}
