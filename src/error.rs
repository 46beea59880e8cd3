//! Error taxonomy for the revision ledger and forecast accumulator.
//!
//! Every failure on the write path maps to one of three kinds. Validation and
//! not-found errors are raised before anything is written; persistence errors
//! abort the surrounding SQLite transaction, so the ledger and the forecast
//! are left exactly as they were before the call.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CustosError {
    /// Missing or invalid input field
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Storage engine failure, lock timeout or constraint violation
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl CustosError {
    pub fn project_not_found(id: i64) -> Self {
        Self::NotFound {
            entity_type: "Project",
            identifier: id.to_string(),
        }
    }

    /// Arithmetic on stored amounts left the range a `Decimal` can hold.
    pub fn out_of_range(what: impl std::fmt::Display) -> Self {
        Self::Persistence(format!("{what} is out of the representable range"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// HTTP status a collaborator should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Persistence(_) => 500,
        }
    }
}

impl From<rusqlite::Error> for CustosError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

pub type CustosResult<T> = Result<T, CustosError>;
