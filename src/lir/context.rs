use core::fmt;

use super::{
    block::{Block, BlockData},
    frame::FrameMap,
    inst::{Inst, InstData, InstKind},
    operand::{LirOperand, Operand, OperandFlags, OperandMode, ValueKind, VReg},
};
use crate::collections::{
    linked_list::LinkedListContainerPtr,
    storage::{ArenaAlloc, BaseArena},
};

/// The LIR of one compilation unit.
pub struct Lir {
    name: String,

    pub(super) insts: BaseArena<InstData>,
    pub(super) blocks: BaseArena<BlockData>,

    /// The blocks in code emission order.
    order: Vec<Block>,

    num_vars: u32,
    frame: FrameMap,
}

impl Lir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            insts: BaseArena::default(),
            blocks: BaseArena::default(),
            order: Vec::new(),
            num_vars: 0,
            frame: FrameMap::new(),
        }
    }

    pub fn name(&self) -> &str { &self.name }

    /// The blocks in order.
    pub fn blocks(&self) -> &[Block] { &self.order }

    pub fn num_vars(&self) -> usize { self.num_vars as usize }

    pub fn frame(&self) -> &FrameMap { &self.frame }

    pub fn frame_mut(&mut self) -> &mut FrameMap { &mut self.frame }

    /// Create a new variable.
    pub fn new_var(&mut self, kind: ValueKind) -> VReg {
        let var = VReg::new(self.num_vars, kind);
        self.num_vars += 1;
        var
    }

    /// Append a new block with its label to the block order.
    pub fn add_block(&mut self) -> Block {
        let block = self.alloc(BlockData::new(self.order.len()));
        self.order.push(block);
        let label = self.alloc_inst(InstData::new(InstKind::Label));
        block.push_back(self, label);
        block
    }

    /// Allocate an instruction without placing it in any block.
    pub fn alloc_inst(&mut self, data: InstData) -> Inst { self.alloc(data) }

    /// Append an instruction to the end of a block.
    pub fn append(&mut self, block: Block, data: InstData) -> Inst {
        let inst = self.alloc_inst(data);
        block.push_back(self, inst);
        inst
    }

    /// Set the phi values defined by the label of `block`.
    pub fn set_phis(&mut self, block: Block, phis: &[VReg]) {
        let label = block
            .label(self)
            .expect("every block starts with a label");
        *label.operands_mut(self, OperandMode::Def) = phis
            .iter()
            .map(|phi| LirOperand::new(*phi, OperandFlags::REG | OperandFlags::STACK))
            .collect();
    }

    /// Jump from `from` to `to`, passing `values` to the phis of `to`.
    pub fn jump(&mut self, from: Block, to: Block, values: &[Operand]) -> Inst {
        let mut data = InstData::new(InstKind::Jump(to));
        for value in values {
            data = data.with(
                OperandMode::Alive,
                *value,
                OperandFlags::REG | OperandFlags::STACK | OperandFlags::CONST,
            );
        }
        from.add_succ(self, to);
        self.append(from, data)
    }

    pub fn branch(
        &mut self,
        from: Block,
        cond: impl Into<Operand>,
        then_block: Block,
        else_block: Block,
    ) -> Inst {
        from.add_succ(self, then_block);
        from.add_succ(self, else_block);
        self.append(
            from,
            InstData::new(InstKind::Branch(then_block, else_block)).input(cond),
        )
    }

    /// All instructions in block order.
    pub fn insts(&self) -> Vec<Inst> {
        self.order
            .iter()
            .flat_map(|block| block.iter(self))
            .collect()
    }

    pub fn display(&self) -> DisplayLir<'_> { DisplayLir { lir: self } }
}

pub struct DisplayLir<'a> {
    lir: &'a Lir,
}

fn write_blocks(f: &mut fmt::Formatter<'_>, lir: &Lir, blocks: &[Block]) -> fmt::Result {
    if blocks.is_empty() {
        return write!(f, "-");
    }
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", block.name(lir))?;
    }
    Ok(())
}

impl fmt::Display for DisplayLir<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lir = self.lir;
        writeln!(f, "lir @{} {{", lir.name)?;
        for block in lir.order.iter() {
            write!(f, "{}:  ; preds: ", block.name(lir))?;
            write_blocks(f, lir, block.preds(lir))?;
            write!(f, ", succs: ")?;
            write_blocks(f, lir, block.succs(lir))?;
            if let Some(loop_index) = block.loop_index(lir) {
                write!(f, ", loop: {}", loop_index)?;
            }
            writeln!(f)?;
            for inst in block.iter(lir) {
                writeln!(f, "  {}", inst.display(lir))?;
            }
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::linked_list::LinkedListNodePtr;

    #[test]
    fn test_build_blocks() {
        let mut lir = Lir::new("test");
        let b0 = lir.add_block();
        let b1 = lir.add_block();
        let v0 = lir.new_var(ValueKind::I32);
        let v1 = lir.new_var(ValueKind::I32);

        lir.append(b0, InstData::op("def").output(v0));
        let jump = lir.jump(b0, b1, &[Operand::Var(v0)]);
        lir.set_phis(b1, &[v1]);
        lir.append(b1, InstData::ret().input(v1));

        assert_eq!(lir.blocks(), &[b0, b1]);
        assert_eq!(b0.succs(&lir), &[b1]);
        assert_eq!(b1.preds(&lir), &[b0]);
        assert_eq!(b0.tail(&lir), Some(jump));
        assert_eq!(jump.operands(&lir, OperandMode::Alive).len(), 1);
        assert!(b1.label(&lir).unwrap().is_label(&lir));
        assert_eq!(
            b1.label(&lir)
                .unwrap()
                .operands(&lir, OperandMode::Def)[0]
                .operand,
            Operand::Var(v1)
        );
        assert_eq!(lir.insts().len(), 5);
        assert_eq!(jump.container(&lir), Some(b0));

        let text = lir.display().to_string();
        assert!(text.contains("jump bb1($v0)"));
        assert!(text.contains("label($v1)"));
    }
}
