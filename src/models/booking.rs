use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

use crate::error::Error;

pub const PENDING: &str = "pending";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Booking {
    pub id: i32,
    pub resident_id: String,
    pub amenity: String,
    pub date: NaiveDate,
    pub time: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub resident_id: String,
    pub amenity: String,
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Amenity {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "a" | "approve" | "approved" => Ok(Decision::Approved),
            "r" | "reject" | "rejected" => Ok(Decision::Rejected),
            other => Err(Error::Validation(format!(
                "unknown decision: {} (expected approve or reject)",
                other
            ))),
        }
    }
}
