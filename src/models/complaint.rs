use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::error::Error;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Complaint {
    pub id: i32,
    pub flat_no: String,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
    pub status: String,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub flat_no: String,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Assigned,
    InProgress,
    Resolved,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Assigned => "Assigned",
            Status::InProgress => "In Progress",
            Status::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "assigned" => Ok(Status::Assigned),
            "in progress" => Ok(Status::InProgress),
            "resolved" => Ok(Status::Resolved),
            other => Err(Error::Validation(format!(
                "unknown complaint status: {} (expected Pending, Assigned, In Progress or Resolved)",
                other
            ))),
        }
    }
}
