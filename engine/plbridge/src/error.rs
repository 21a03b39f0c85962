use thiserror::Error;

use crate::engine::EngineError;

/// Result alias used across the crate.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Error variants surfaced by the codec and the query session.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("cannot convert cyclic term {0}")]
    CyclicTerm(String),
    #[error("cannot convert term to matrix, inconsistent rows: {0}")]
    InconsistentMatrixRows(String),
    #[error("non-rectangular matrix: {0}")]
    NonRectangularMatrix(String),
    #[error("cannot convert term {0}")]
    UntranslatableTerm(String),
    #[error("simultaneous queries not allowed, close the open query first")]
    SimultaneousQuery,
    #[error("no open query")]
    NoOpenQuery,
    #[error("could not create query: {0}")]
    QueryNotCreated(String),
    #[error("engine exception: {0}")]
    Engine(#[from] EngineError),
    #[error("failed to consult {file}: {message}")]
    Consult { file: String, message: String },
    #[error("engine initialisation failed: {0}")]
    Initialisation(String),
    #[error("portray of {goal} failed: {message}")]
    Portray { goal: String, message: String },
}

impl BridgeError {
    /// Structural errors mean the value itself could not be represented.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            BridgeError::CyclicTerm(_)
                | BridgeError::InconsistentMatrixRows(_)
                | BridgeError::NonRectangularMatrix(_)
                | BridgeError::UntranslatableTerm(_)
        )
    }

    /// Protocol errors come from driving the session out of order.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            BridgeError::SimultaneousQuery
                | BridgeError::NoOpenQuery
                | BridgeError::QueryNotCreated(_)
        )
    }
}
