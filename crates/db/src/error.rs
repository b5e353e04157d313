use voyage_core::error::CoreError;

/// Error type shared by every store adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A domain-level error (missing record, invalid input).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A persisted row no longer decodes into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Convenience alias for store return values.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Whether this error means the addressed entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::Core(CoreError::NotFound { .. }) | StoreError::Database(sqlx::Error::RowNotFound)
        )
    }
}
