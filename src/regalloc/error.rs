use thiserror::Error;

/// Errors of the graph coloring register allocation.
///
/// None of them is recoverable inside the allocator, the compilation unit
/// fails as a whole and the LIR is left in an unspecified state.
#[derive(Debug, Error)]
pub enum AllocError {
    #[error("too many iterations in global liveness analysis of {name}: {iterations}")]
    LivenessDiverged { name: String, iterations: usize },

    #[error("every spill candidate spilled, no color found for {}", .operands.join(", "))]
    NoColorFound { operands: Vec<String> },

    #[error("still no color after {0} spill rounds")]
    RecolorLimitExceeded(usize),

    #[error("spill position {0} not found")]
    SpillPositionNotFound(u32),

    #[error("interval of {0} is already spilled")]
    AlreadySpilled(String),

    #[error("block {0} has no instructions")]
    EmptyBlock(String),

    #[error("no allocatable register for {0}")]
    NoAllocatableRegisters(String),

    #[error("{0} is not a register or variable of this LIR")]
    UnknownOperand(String),

    #[error("no location assigned to {0}")]
    MissingLocation(String),

    #[error("{from} passes {outgoing} values to the {incoming} phis of {to}")]
    PhiArityMismatch {
        from: String,
        to: String,
        outgoing: usize,
        incoming: usize,
    },

    #[error("critical edge from {from} to {to}, split it first")]
    CriticalEdge { from: String, to: String },

    #[error("block {0} ends with phi values but no jump")]
    MissingJump(String),

    #[error("move resolution left {0} mappings behind")]
    UnresolvedMappings(usize),
}

pub type AllocResult<T> = Result<T, AllocError>;
