use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

pub const OPEN: &str = "open";
pub const CLOSED: &str = "closed";

/// `options` keeps presentation order; `votes` maps each option to its tally.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Poll {
    pub id: i32,
    pub question: String,
    pub options: Vec<String>,
    pub status: String,
    pub votes: Json<HashMap<String, i64>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub question: String,
    pub options: Vec<String>,
    pub votes: Json<HashMap<String, i64>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Vote {
    pub id: i32,
    pub flat_no: String,
    pub poll_id: i32,
}
