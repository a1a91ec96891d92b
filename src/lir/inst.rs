use core::fmt;

use super::{
    block::Block,
    context::Lir,
    operand::{LirOperand, Operand, OperandFlags, OperandMode},
};
use crate::{
    collections::{
        linked_list::LinkedListNodePtr,
        storage::{ArenaPtr, BaseArenaPtr},
    },
    impl_arena,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstKind {
    /// The first instruction of every block, outputs are the phi values.
    Label,
    /// Unconditional jump, alive operands are the outgoing phi values.
    Jump(Block),
    /// Two-way conditional branch.
    Branch(Block, Block),
    /// An arbitrary operation.
    Op(String),
    /// A call, destroys all caller-saved registers.
    Call(String),
    Move,
    /// Materialize the constant input into the output.
    LoadConst,
    /// Stack slot to stack slot move.
    StackMove,
    Return,
}

pub struct InstData {
    id: Option<u32>,
    kind: InstKind,

    outputs: Vec<LirOperand>,
    inputs: Vec<LirOperand>,
    alive: Vec<LirOperand>,
    temps: Vec<LirOperand>,
    state: Vec<LirOperand>,

    next: Option<Inst>,
    prev: Option<Inst>,
    parent: Option<Block>,
}

impl InstData {
    pub fn new(kind: InstKind) -> Self {
        Self {
            id: None,
            kind,
            outputs: Vec::new(),
            inputs: Vec::new(),
            alive: Vec::new(),
            temps: Vec::new(),
            state: Vec::new(),
            next: None,
            prev: None,
            parent: None,
        }
    }

    pub fn op(name: impl Into<String>) -> Self { Self::new(InstKind::Op(name.into())) }

    pub fn call(name: impl Into<String>) -> Self { Self::new(InstKind::Call(name.into())) }

    pub fn ret() -> Self { Self::new(InstKind::Return) }

    /// Add an output that must be written to a register.
    pub fn output(self, operand: impl Into<Operand>) -> Self {
        self.with(OperandMode::Def, operand, OperandFlags::REG)
    }

    /// Add an input that must be read from a register.
    pub fn input(self, operand: impl Into<Operand>) -> Self {
        self.with(OperandMode::Use, operand, OperandFlags::REG)
    }

    /// Add an input that can also be read from the stack.
    pub fn input_or_stack(self, operand: impl Into<Operand>) -> Self {
        self.with(
            OperandMode::Use,
            operand,
            OperandFlags::REG | OperandFlags::STACK,
        )
    }

    pub fn alive(self, operand: impl Into<Operand>) -> Self {
        self.with(OperandMode::Alive, operand, OperandFlags::REG)
    }

    pub fn temp(self, operand: impl Into<Operand>) -> Self {
        self.with(OperandMode::Temp, operand, OperandFlags::REG)
    }

    pub fn state(self, operand: impl Into<Operand>) -> Self {
        self.with(
            OperandMode::State,
            operand,
            OperandFlags::REG | OperandFlags::STACK | OperandFlags::CONST,
        )
    }

    pub fn with(mut self, mode: OperandMode, operand: impl Into<Operand>, flags: OperandFlags) -> Self {
        self.operands_mut(mode)
            .push(LirOperand::new(operand, flags));
        self
    }

    pub fn id(&self) -> Option<u32> { self.id }

    pub fn kind(&self) -> &InstKind { &self.kind }

    pub fn operands(&self, mode: OperandMode) -> &[LirOperand] {
        match mode {
            OperandMode::Def => &self.outputs,
            OperandMode::Use => &self.inputs,
            OperandMode::Alive => &self.alive,
            OperandMode::Temp => &self.temps,
            OperandMode::State => &self.state,
        }
    }

    pub fn operands_mut(&mut self, mode: OperandMode) -> &mut Vec<LirOperand> {
        match mode {
            OperandMode::Def => &mut self.outputs,
            OperandMode::Use => &mut self.inputs,
            OperandMode::Alive => &mut self.alive,
            OperandMode::Temp => &mut self.temps,
            OperandMode::State => &mut self.state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Inst(BaseArenaPtr<InstData>);

impl_arena!(Lir, InstData, Inst, insts);

impl Inst {
    pub fn id(self, lir: &Lir) -> Option<u32> { self.deref(lir).id }

    pub fn set_id(self, lir: &mut Lir, id: Option<u32>) { self.deref_mut(lir).id = id; }

    pub fn kind(self, lir: &Lir) -> &InstKind { &self.deref(lir).kind }

    pub fn operands(self, lir: &Lir, mode: OperandMode) -> &[LirOperand] {
        self.deref(lir).operands(mode)
    }

    pub fn operands_mut(self, lir: &mut Lir, mode: OperandMode) -> &mut Vec<LirOperand> {
        self.deref_mut(lir).operands_mut(mode)
    }

    pub fn is_label(self, lir: &Lir) -> bool { matches!(self.kind(lir), InstKind::Label) }

    pub fn is_jump(self, lir: &Lir) -> bool { matches!(self.kind(lir), InstKind::Jump(_)) }

    /// If the instruction clobbers every caller-saved register.
    pub fn destroys_caller_saved(self, lir: &Lir) -> bool {
        matches!(self.kind(lir), InstKind::Call(_))
    }

    pub fn display(self, lir: &Lir) -> DisplayInst<'_> { DisplayInst { lir, inst: self } }
}

impl LinkedListNodePtr for Inst {
    type ContainerPtr = Block;

    fn next(self, lir: &Lir) -> Option<Self> { self.deref(lir).next }

    fn prev(self, lir: &Lir) -> Option<Self> { self.deref(lir).prev }

    fn set_next(self, lir: &mut Lir, next: Option<Self>) { self.deref_mut(lir).next = next; }

    fn set_prev(self, lir: &mut Lir, prev: Option<Self>) { self.deref_mut(lir).prev = prev; }

    fn container(self, lir: &Lir) -> Option<Block> { self.deref(lir).parent }

    fn set_container(self, lir: &mut Lir, container: Option<Block>) {
        self.deref_mut(lir).parent = container;
    }
}

pub struct DisplayInst<'a> {
    lir: &'a Lir,
    inst: Inst,
}

fn write_operands(f: &mut fmt::Formatter<'_>, operands: &[LirOperand]) -> fmt::Result {
    for (i, op) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", op.operand)?;
    }
    Ok(())
}

impl fmt::Display for DisplayInst<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inst.deref(self.lir);

        match data.id {
            Some(id) => write!(f, "{:>4}  ", id)?,
            None => write!(f, "{:>4}  ", "-")?,
        }

        if !data.outputs.is_empty() && !matches!(data.kind, InstKind::Label) {
            write_operands(f, &data.outputs)?;
            write!(f, " = ")?;
        }

        match &data.kind {
            InstKind::Label => {
                write!(f, "label")?;
                if !data.outputs.is_empty() {
                    write!(f, "(")?;
                    write_operands(f, &data.outputs)?;
                    write!(f, ")")?;
                }
            }
            InstKind::Jump(target) => {
                write!(f, "jump {}", target.name(self.lir))?;
                if !data.alive.is_empty() {
                    write!(f, "(")?;
                    write_operands(f, &data.alive)?;
                    write!(f, ")")?;
                }
                return Ok(());
            }
            InstKind::Branch(t, e) => {
                write!(f, "branch ")?;
                write_operands(f, &data.inputs)?;
                return write!(f, ", {}, {}", t.name(self.lir), e.name(self.lir));
            }
            InstKind::Op(name) => write!(f, "{}", name)?,
            InstKind::Call(name) => write!(f, "call {}", name)?,
            InstKind::Move => write!(f, "move")?,
            InstKind::LoadConst => write!(f, "loadconst")?,
            InstKind::StackMove => write!(f, "stackmove")?,
            InstKind::Return => write!(f, "ret")?,
        }

        if !data.inputs.is_empty() {
            write!(f, " ")?;
            write_operands(f, &data.inputs)?;
        }
        if !data.alive.is_empty() {
            write!(f, " alive[")?;
            write_operands(f, &data.alive)?;
            write!(f, "]")?;
        }
        if !data.temps.is_empty() {
            write!(f, " temp[")?;
            write_operands(f, &data.temps)?;
            write!(f, "]")?;
        }
        if !data.state.is_empty() {
            write!(f, " state[")?;
            write_operands(f, &data.state)?;
            write!(f, "]")?;
        }
        Ok(())
    }
}
