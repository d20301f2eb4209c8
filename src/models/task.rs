use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::error::Error;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Task {
    pub id: i32,
    pub flat_no: Option<String>,
    pub issue: String,
    pub assigned_to: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub source_complaint_id: Option<i32>,
    pub is_common: bool,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub flat_no: Option<String>,
    pub issue: String,
    pub assigned_to: String,
    pub due_date: Option<NaiveDate>,
    pub source_complaint_id: Option<i32>,
    pub is_common: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    InProgress,
    Completed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
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
            "in progress" => Ok(Status::InProgress),
            "completed" => Ok(Status::Completed),
            other => Err(Error::Validation(format!(
                "unknown task status: {} (expected Pending, In Progress or Completed)",
                other
            ))),
        }
    }
}
