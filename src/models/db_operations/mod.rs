use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Every tag id is held by a live tag")]
    TagIdsExhausted,
}

impl DbError {
    /// True when the statement was refused by a UNIQUE/CHECK/FOREIGN KEY constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DbError::Rusqlite(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation
        )
    }
}

pub mod forums_db_operations;
pub mod posts_db_operations;
pub mod reviews_db_operations;
pub mod tags_db_operations;
pub mod users_db_operations;
