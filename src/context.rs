use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffRole {
    Delivery,
    Maintenance,
    Security,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Delivery => "delivery",
            StaffRole::Maintenance => "maintenance",
            StaffRole::Security => "security",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "delivery" => Ok(StaffRole::Delivery),
            "maintenance" => Ok(StaffRole::Maintenance),
            "security" => Ok(StaffRole::Security),
            other => Err(Error::Validation(format!(
                "unknown staff role: {} (expected delivery, maintenance or security)",
                other
            ))),
        }
    }
}

/// Authenticated identity. Only the login operations construct one; every
/// authorization check goes through this value instead of caller-supplied
/// identifiers.
#[derive(Debug, Clone)]
pub enum Session {
    Resident {
        resident_id: String,
        flat_no: String,
        name: String,
    },
    Staff {
        username: String,
        role: StaffRole,
    },
    Admin {
        username: String,
    },
}

impl Session {
    pub fn flat_no(&self) -> Result<&str, Error> {
        match self {
            Session::Resident { flat_no, .. } => Ok(flat_no),
            _ => Err(Error::Unauthorized("a resident account is required".into())),
        }
    }

    pub fn resident_id(&self) -> Result<&str, Error> {
        match self {
            Session::Resident { resident_id, .. } => Ok(resident_id),
            _ => Err(Error::Unauthorized("a resident account is required".into())),
        }
    }

    pub fn staff_username(&self) -> Result<&str, Error> {
        match self {
            Session::Staff { username, .. } => Ok(username),
            _ => Err(Error::Unauthorized("a staff account is required".into())),
        }
    }

    pub fn require_admin(&self) -> Result<(), Error> {
        match self {
            Session::Admin { .. } => Ok(()),
            _ => Err(Error::Unauthorized("an admin account is required".into())),
        }
    }

    pub fn require_staff_or_admin(&self) -> Result<(), Error> {
        match self {
            Session::Staff { .. } | Session::Admin { .. } => Ok(()),
            _ => Err(Error::Unauthorized("a staff or admin account is required".into())),
        }
    }

    pub fn require_role_or_admin(&self, role: StaffRole) -> Result<(), Error> {
        match self {
            Session::Admin { .. } => Ok(()),
            Session::Staff { role: r, .. } if *r == role => Ok(()),
            _ => Err(Error::Unauthorized(format!("a {} staff account is required", role))),
        }
    }
}
