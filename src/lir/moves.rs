//! Creation and placement of the moves inserted by the register allocator.

use super::{
    block::Block,
    context::Lir,
    inst::{Inst, InstData, InstKind},
    operand::{Operand, OperandFlags, OperandMode},
};
use crate::collections::linked_list::{LinkedListContainerPtr, LinkedListNodePtr};

/// Target hook creating the moves of the allocator.
///
/// The returned instruction is not placed in any block yet.
pub trait MoveFactory {
    /// Register/stack to register/stack move.
    fn create_move(&self, lir: &mut Lir, dst: Operand, src: Operand) -> Inst;

    /// Materialize a constant.
    fn create_load(&self, lir: &mut Lir, dst: Operand, value: i64) -> Inst;

    /// Stack slot to stack slot move.
    fn create_stack_move(&self, lir: &mut Lir, dst: Operand, src: Operand) -> Inst;
}

/// The move factory producing the generic LIR move instructions.
#[derive(Debug, Default, Clone, Copy)]
pub struct LirMoveFactory;

impl MoveFactory for LirMoveFactory {
    fn create_move(&self, lir: &mut Lir, dst: Operand, src: Operand) -> Inst {
        let flags = OperandFlags::REG | OperandFlags::STACK;
        lir.alloc_inst(
            InstData::new(InstKind::Move)
                .with(OperandMode::Def, dst, flags)
                .with(OperandMode::Use, src, flags),
        )
    }

    fn create_load(&self, lir: &mut Lir, dst: Operand, value: i64) -> Inst {
        lir.alloc_inst(
            InstData::new(InstKind::LoadConst)
                .with(
                    OperandMode::Def,
                    dst,
                    OperandFlags::REG | OperandFlags::STACK,
                )
                .with(OperandMode::Use, Operand::Imm(value), OperandFlags::CONST),
        )
    }

    fn create_stack_move(&self, lir: &mut Lir, dst: Operand, src: Operand) -> Inst {
        lir.alloc_inst(
            InstData::new(InstKind::StackMove)
                .with(OperandMode::Def, dst, OperandFlags::STACK)
                .with(OperandMode::Use, src, OperandFlags::STACK),
        )
    }
}

/// Where a batch of instructions goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Before(Inst),
    After(Inst),
    End(Block),
}

/// Collects instructions for one position and links them in order.
pub struct InsertionBuffer {
    position: InsertPosition,
    insts: Vec<Inst>,
}

impl InsertionBuffer {
    pub fn new(position: InsertPosition) -> Self {
        Self {
            position,
            insts: Vec::new(),
        }
    }

    pub fn position(&self) -> InsertPosition { self.position }

    pub fn append(&mut self, inst: Inst) { self.insts.push(inst); }

    pub fn len(&self) -> usize { self.insts.len() }

    pub fn is_empty(&self) -> bool { self.insts.is_empty() }

    /// Link the buffered instructions into the LIR, keeping their order.
    pub fn finish(self, lir: &mut Lir) {
        match self.position {
            InsertPosition::Before(anchor) => {
                for inst in self.insts {
                    anchor.insert_before(lir, inst);
                }
            }
            InsertPosition::After(anchor) => {
                let mut last = anchor;
                for inst in self.insts {
                    last.insert_after(lir, inst);
                    last = inst;
                }
            }
            InsertPosition::End(block) => {
                for inst in self.insts {
                    block.push_back(lir, inst);
                }
            }
        }
    }
}
