use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Staff {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub salt: String,
    pub role: String,
    pub approved: bool,
}

/// Credentials are stored as a salted SHA-256 hex digest, never plaintext.
#[derive(Debug, Clone)]
pub struct Insert {
    pub username: String,
    pub password: String,
    pub salt: String,
    pub role: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub username: String,
    pub password: String,
    pub salt: String,
}
