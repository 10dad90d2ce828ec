use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Webhook verification failed: {0}")]
    Verification(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Billing provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors caused by the caller rather than by this service or its collaborators.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Verification(_)
                | AppError::Unauthorized
                | AppError::InvalidInput(_)
                | AppError::NotFound
        )
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    VerificationFailed,
    NotConfigured,
    ProviderError,
    DatabaseError,
    Unauthorized,
    InvalidInput,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::VerificationFailed => "VERIFICATION_FAILED",
            ErrorCode::NotConfigured => "NOT_CONFIGURED",
            ErrorCode::ProviderError => "PROVIDER_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
