use thiserror::Error;

/// Failures reported by the cart, favorites and orders backends.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    #[error("Not Found {0}")]
    NotFound(String),

    #[error("Rejected {0}")]
    Rejected(String),

    #[error("Internal repository error")]
    Internal(#[from] anyhow::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Reminder scheduler unavailable: {0}")]
    Unavailable(String),

    #[error("Reminder trigger is in the past")]
    TriggerInPast,
}

pub type ReminderResult<T> = Result<T, ReminderError>;

#[derive(Debug, Error)]
pub enum DraftStorageError {
    #[error("Draft storage io error")]
    Io(#[from] std::io::Error),

    #[error("Draft storage encoding error")]
    Encoding(#[from] serde_json::Error),
}

pub type DraftStorageResult<T> = Result<T, DraftStorageError>;

/// Error surfaced by coordinator intents.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Missing delivery fields (address missing: {address}, phone missing: {phone})")]
    MissingDeliveryFields { address: bool, phone: bool },

    /// Transient: another placement is running. Retry once it finishes.
    #[error("Order placement already in progress")]
    PlacementInProgress,

    #[error("Repository error")]
    Repository(#[from] RepositoryError),

    #[error("Order {order_id} was created but the cart could not be cleared")]
    CartNotCleared {
        order_id: String,
        #[source]
        source: RepositoryError,
    },
}

impl AppError {
    /// True when the user can fix the input and retry; false for backend failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::EmptyCart | AppError::MissingDeliveryFields { .. }
        )
    }

    /// True when the same intent may succeed unchanged on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::PlacementInProgress)
    }
}

pub type AppResult<T> = Result<T, AppError>;
