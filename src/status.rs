use crate::ffi;

/// The status SCIP reports after a call to `SCIPsolve`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Status {
    /// The solving status is not yet known.
    Unknown,
    /// The user interrupted the solving process.
    UserInterrupt,
    /// A node limit (node, total node or stall node) stopped the search.
    NodeLimit,
    /// The time limit was reached.
    TimeLimit,
    /// The memory limit was reached.
    MemoryLimit,
    /// The gap limit was reached.
    GapLimit,
    /// A solution count limit (solutions or improving solutions) was reached.
    SolutionLimit,
    /// The restart limit was reached.
    RestartLimit,
    /// The problem was solved to optimality, an optimal solution is available.
    Optimal,
    /// The problem was proven to be infeasible.
    Infeasible,
    /// The problem was proven to be unbounded.
    Unbounded,
    /// The problem was proven to be either infeasible or unbounded.
    InfeasibleOrUnbounded,
    /// The process received a termination signal.
    Terminate,
}

impl From<ffi::SCIP_Status> for Status {
    fn from(val: ffi::SCIP_Status) -> Self {
        match val {
            ffi::SCIP_Status_SCIP_STATUS_USERINTERRUPT => Status::UserInterrupt,
            ffi::SCIP_Status_SCIP_STATUS_NODELIMIT
            | ffi::SCIP_Status_SCIP_STATUS_TOTALNODELIMIT
            | ffi::SCIP_Status_SCIP_STATUS_STALLNODELIMIT => Status::NodeLimit,
            ffi::SCIP_Status_SCIP_STATUS_TIMELIMIT => Status::TimeLimit,
            ffi::SCIP_Status_SCIP_STATUS_MEMLIMIT => Status::MemoryLimit,
            ffi::SCIP_Status_SCIP_STATUS_GAPLIMIT => Status::GapLimit,
            ffi::SCIP_Status_SCIP_STATUS_SOLLIMIT
            | ffi::SCIP_Status_SCIP_STATUS_BESTSOLLIMIT => Status::SolutionLimit,
            ffi::SCIP_Status_SCIP_STATUS_RESTARTLIMIT => Status::RestartLimit,
            ffi::SCIP_Status_SCIP_STATUS_OPTIMAL => Status::Optimal,
            ffi::SCIP_Status_SCIP_STATUS_INFEASIBLE => Status::Infeasible,
            ffi::SCIP_Status_SCIP_STATUS_UNBOUNDED => Status::Unbounded,
            ffi::SCIP_Status_SCIP_STATUS_INFORUNBD => Status::InfeasibleOrUnbounded,
            ffi::SCIP_Status_SCIP_STATUS_TERMINATE => Status::Terminate,
            _ => Status::Unknown,
        }
    }
}
