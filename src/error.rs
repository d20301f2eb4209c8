use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("account is awaiting admin approval")]
    PendingApproval,

    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    // storage detail stays out of user-facing output; the source is still
    // attached for logs
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        // unique-constraint violations surface as conflicts, not storage failures
        if let sqlx::Error::Database(db) = &e {
            if db.code().as_deref() == Some("23505") {
                return Error::Conflict("record already exists".into());
            }
        }
        Error::Database(e)
    }
}
