#[derive(Debug, thiserror::Error)]
pub enum DBError {
    #[error("Database connection error: {message}")]
    ConnectionError { message: String },

    #[error("SQLite error: {0}")]
    SQLiteError(#[from] rusqlite::Error),

    #[error("Lock error: {message}")]
    LockError { message: String },
}

pub type Result<T> = std::result::Result<T, DBError>;
