//! # Low-level IR
//!
//! A linear, block structured IR in the shape the register allocator needs:
//!
//! - Blocks in a fixed order, with explicit predecessor and successor lists.
//! - Each block starts with a label, whose outputs are the phi values, and
//!   a block with a single successor ends with a jump whose alive operands are
//!   the outgoing phi values.
//! - Instructions list their operands by role (def, use, alive, temp, state)
//!   together with the locations each position accepts.

pub mod block;
pub mod context;
pub mod frame;
pub mod inst;
pub mod moves;
pub mod operand;
pub mod regs;

pub use block::Block;
pub use context::Lir;
pub use frame::FrameMap;
pub use inst::{Inst, InstData, InstKind};
pub use moves::{InsertPosition, InsertionBuffer, LirMoveFactory, MoveFactory};
pub use operand::{
    LirOperand,
    Operand,
    OperandFlags,
    OperandMode,
    PReg,
    RegKind,
    StackSlot,
    VReg,
    ValueKind,
};
pub use regs::RegisterConfig;
