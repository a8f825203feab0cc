use std::time::Duration;

use thiserror::Error;

use crate::engine::{ConsId, VarId};
use crate::pattern::PatternId;
use crate::piece::PieceId;
use crate::retcode::Retcode;
use crate::status::Status;

/// Errors surfaced by the master problem, the pricing solvers and the column generation loop.
///
/// None of them is retried internally. Reaching the iteration limit is not an error, it is
/// reported through [`TerminationState`](crate::TerminationState).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A precondition of the model does not hold, so nothing was submitted to the engine.
    #[error("model construction failed: {0}")]
    ModelConstruction(#[from] ModelConstructionError),

    /// The solver engine failed or did not reach an optimal solution.
    #[error("solver failed: {0}")]
    Solver(#[from] SolverError),

    /// A solve was stopped by its time limit.
    #[error("solve exceeded its time limit of {limit:?}")]
    SolverTimeout { limit: Option<Duration> },

    /// Dual prices were requested although the model changed (or was solved in integer mode)
    /// since the last relaxed solve.
    #[error("dual prices are stale, the master changed since the last relaxed solve")]
    StaleState,

    /// A result was requested before any solve happened.
    #[error("the master problem has not been solved yet")]
    NotSolved,

    /// Convergence can only be decided by a pricer whose results are proven optima.
    #[error("the pricing solver is not exact and cannot prove convergence")]
    InexactPricer,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelConstructionError {
    #[error("the instance has no pieces")]
    NoPieces,

    #[error("rod length must be positive")]
    ZeroCapacity,

    #[error("piece {0} has zero length")]
    ZeroLengthPiece(PieceId),

    #[error("piece id {0} is used more than once")]
    DuplicatePiece(PieceId),

    #[error("piece {piece} of length {length} does not fit on a rod of length {capacity}")]
    PieceTooLong {
        piece: PieceId,
        length: u32,
        capacity: u32,
    },

    #[error("pattern {pattern} has total length {length}, exceeding its capacity {capacity}")]
    PatternTooLong {
        pattern: PatternId,
        length: u64,
        capacity: u32,
    },

    #[error("pattern {pattern} contains piece {piece} more than once")]
    RepeatedPieceInPattern { pattern: PatternId, piece: PieceId },

    #[error("pattern {pattern} refers to unknown piece {piece}")]
    UnknownPiece { pattern: PatternId, piece: PieceId },

    #[error("piece {0} is not covered by any pattern")]
    UncoveredPiece(PieceId),

    #[error("membership row has {found} entries, expected {expected}")]
    RowLength { expected: usize, found: usize },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("SCIP call returned {0}")]
    Call(Retcode),

    #[error("solve ended with status {0:?}")]
    NotOptimal(Status),

    #[error("no solution is available")]
    NoSolution,

    #[error("unknown variable {0:?}")]
    UnknownVariable(VarId),

    #[error("unknown or removed constraint {0:?}")]
    UnknownConstraint(ConsId),

    #[error("name {0:?} contains an interior NUL byte")]
    InvalidName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_wrap_inner_errors() {
        let err: Error = ModelConstructionError::UncoveredPiece(PieceId(3)).into();
        assert_eq!(
            err,
            Error::ModelConstruction(ModelConstructionError::UncoveredPiece(PieceId(3)))
        );

        let err: Error = SolverError::NotOptimal(Status::Infeasible).into();
        assert!(matches!(err, Error::Solver(SolverError::NotOptimal(Status::Infeasible))));
    }

    #[test]
    fn messages_name_the_offender() {
        let err = Error::from(ModelConstructionError::PieceTooLong {
            piece: PieceId(7),
            length: 200,
            capacity: 150,
        });
        assert_eq!(
            err.to_string(),
            "model construction failed: piece 7 of length 200 does not fit on a rod of length 150"
        );
        assert_eq!(
            Error::SolverTimeout { limit: Some(Duration::from_secs(2)) }.to_string(),
            "solve exceeded its time limit of Some(2s)"
        );
    }
}
