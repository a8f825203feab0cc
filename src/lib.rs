//! Column generation for the one-dimensional cutting-stock problem.
//!
//! Given rods of a fixed length and a list of pieces that each have to be cut exactly once, the
//! crate computes a lower bound on the number of rods needed together with the cutting patterns
//! that attain it. The bound is obtained from the LP relaxation of a set-covering master problem
//! that is grown one column at a time: the [`RestrictedMaster`] is solved, its dual prices are fed
//! into a 0/1 knapsack [`PricingSolver`], and the resulting pattern is added whenever its reduced
//! cost is negative.
//!
//! The linear programs are solved by a [`SolverEngine`]; [`ScipEngine`] implements it on top of
//! [SCIP](https://scipopt.org/) through `scip-sys`.
//!
//! ```no_run
//! use cutstock::prelude::*;
//!
//! let pieces: Vec<Piece> = [110, 150, 125, 140, 105, 123]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &len)| Piece::new(i as u32, len))
//!     .collect();
//! let plan = cutstock::solve(&pieces, 150, None, 100).unwrap();
//! assert_eq!(plan.termination, TerminationState::Converged);
//! println!("{plan}");
//! ```

pub use scip_sys as ffi;

/// Executes a SCIP call and returns early with [`Error::Solver`] if the return code is not okay.
macro_rules! scip_call {
    ($res:expr) => {
        let res = unsafe { $res };
        let retcode = $crate::retcode::Retcode::from(res);
        if retcode != $crate::retcode::Retcode::Okay {
            return Err($crate::error::SolverError::Call(retcode).into());
        }
    };
}

/// Executes a SCIP call and panics if the return code is not okay. Only used in `Drop`.
macro_rules! scip_call_panic {
    ($res:expr) => {
        let res = unsafe { $res };
        let retcode = $crate::retcode::Retcode::from(res);
        if retcode != $crate::retcode::Retcode::Okay {
            panic!("SCIP call failed with retcode {:?}", retcode);
        }
    };
}

pub mod colgen;
pub mod config;
pub mod duals;
pub mod engine;
pub mod error;
pub mod master;
pub mod pattern;
pub mod piece;
pub mod pricing;
pub mod retcode;
pub mod status;

pub use colgen::{
    pricer_for, solve, solve_with, ColumnGeneration, CuttingPlan, IntegerSolution,
    IterationRecord, Phase, RodCut, TerminationState,
};
pub use config::{ColumnGenerationConfig, IntegerPolicy, PricingStrategy};
pub use duals::DualPrices;
pub use engine::scip::ScipEngine;
pub use engine::{ConsId, ObjSense, SolverEngine, VarId, VarKind};
pub use error::{Error, ModelConstructionError, SolverError};
pub use master::{RestrictedMaster, SolveMode};
pub use pattern::{Pattern, PatternId};
pub use piece::{Piece, PieceId};
pub use pricing::{
    GreedyPricer, GuardedPricer, KnapsackPricer, MipPricer, PricingResult, PricingSolver,
};
pub use retcode::Retcode;
pub use status::Status;

/// Commonly used types, re-exported for glob imports.
pub mod prelude {
    pub use crate::colgen::{ColumnGeneration, CuttingPlan, TerminationState};
    pub use crate::config::{ColumnGenerationConfig, IntegerPolicy, PricingStrategy};
    pub use crate::engine::{SolverEngine, scip::ScipEngine};
    pub use crate::error::Error;
    pub use crate::master::RestrictedMaster;
    pub use crate::pattern::Pattern;
    pub use crate::piece::Piece;
    pub use crate::pricing::{GuardedPricer, KnapsackPricer, PricingSolver};
}
