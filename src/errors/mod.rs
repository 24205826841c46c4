mod error;

pub use error::DbError;

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
