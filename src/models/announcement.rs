use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Announcement {
    pub id: i32,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
