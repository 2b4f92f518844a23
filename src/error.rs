// Session-level error taxonomy.

use thiserror::Error;

use crate::auction::player::Money;
use crate::auction::roster::RosterError;
use crate::service::ServiceError;

/// Every failure an `AuctionSession` method can report.
///
/// Errors are always returned as values, never panicked across the state
/// machine boundary, and every failure leaves the session in its last valid
/// state. Validation failures (`InvalidBudget`, `InvalidCost`,
/// `InsufficientOpponents`, `InvalidSquadCount`, `InvalidPlayerName`,
/// `UnknownOpponent`, and the `Roster` variants) are caught before any
/// remote call; none of them is ever retried automatically.
#[derive(Debug, Error)]
pub enum AuctionError {
    #[error("auction session is not active")]
    NotActive,

    #[error("auction session already initialized")]
    AlreadyInitialized,

    #[error("budget must be positive, got {0}")]
    InvalidBudget(Money),

    #[error("at least 2 distinct opponents are required, got {0}")]
    InsufficientOpponents(usize),

    #[error("cost must be positive, got {0}")]
    InvalidCost(Money),

    #[error("player name must not be empty")]
    InvalidPlayerName,

    #[error("squad count must be at least 1, got {0}")]
    InvalidSquadCount(u32),

    #[error("unknown opponent: {0}")]
    UnknownOpponent(String),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error("auction service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("invalid service response: {0}")]
    InvalidServiceResponse(String),
}

impl From<ServiceError> for AuctionError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(msg) => AuctionError::ServiceUnavailable(msg),
            ServiceError::InvalidResponse(msg) => AuctionError::InvalidServiceResponse(msg),
        }
    }
}
