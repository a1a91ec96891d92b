use core::fmt;
use std::ops::BitOr;

/// The kind of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegKind {
    /// The general purpose register.
    General,
    /// The floating point register.
    Float,
}

impl RegKind {
    /// The value kind filling a whole register of this kind.
    pub fn widest(self) -> ValueKind {
        match self {
            RegKind::General => ValueKind::I64,
            RegKind::Float => ValueKind::F64,
        }
    }
}

/// The kind of a value carried by an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    I32,
    I64,
    F32,
    F64,
}

impl ValueKind {
    /// The register kind able to hold a value of this kind.
    pub fn reg_kind(self) -> RegKind {
        match self {
            ValueKind::I32 | ValueKind::I64 => RegKind::General,
            ValueKind::F32 | ValueKind::F64 => RegKind::Float,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
        };
        write!(f, "{}", s)
    }
}

/// The physical register.
///
/// The number is unique across all kinds of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PReg(u8, RegKind);

impl PReg {
    pub const fn new(num: u8, kind: RegKind) -> Self { Self(num, kind) }

    pub const fn num(&self) -> u8 { self.0 }

    pub const fn kind(&self) -> RegKind { self.1 }
}

impl fmt::Display for PReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            RegKind::General => write!(f, "%r{}", self.0),
            RegKind::Float => write!(f, "%f{}", self.0),
        }
    }
}

/// The virtual register, i.e. a variable of the LIR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VReg(u32, ValueKind);

impl VReg {
    pub fn new(num: u32, kind: ValueKind) -> Self { Self(num, kind) }

    pub fn num(&self) -> u32 { self.0 }

    pub fn kind(&self) -> ValueKind { self.1 }
}

impl fmt::Display for VReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "$v{}", self.0) }
}

/// A slot in the stack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackSlot {
    index: u32,
    kind: ValueKind,
}

impl StackSlot {
    pub fn new(index: u32, kind: ValueKind) -> Self { Self { index, kind } }

    pub fn index(&self) -> u32 { self.index }

    pub fn kind(&self) -> ValueKind { self.kind }
}

impl fmt::Display for StackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stack{}:{}", self.index, self.kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Reg(PReg),
    Var(VReg),
    Slot(StackSlot),
    Imm(i64),
}

impl Operand {
    pub fn is_reg(&self) -> bool { matches!(self, Operand::Reg(_)) }

    pub fn is_var(&self) -> bool { matches!(self, Operand::Var(_)) }

    pub fn is_slot(&self) -> bool { matches!(self, Operand::Slot(_)) }

    pub fn is_imm(&self) -> bool { matches!(self, Operand::Imm(_)) }

    pub fn as_reg(&self) -> Option<PReg> {
        match self {
            Operand::Reg(reg) => Some(*reg),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<VReg> {
        match self {
            Operand::Var(var) => Some(*var),
            _ => None,
        }
    }
}

impl From<PReg> for Operand {
    fn from(reg: PReg) -> Self { Operand::Reg(reg) }
}

impl From<VReg> for Operand {
    fn from(var: VReg) -> Self { Operand::Var(var) }
}

impl From<StackSlot> for Operand {
    fn from(slot: StackSlot) -> Self { Operand::Slot(slot) }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(reg) => write!(f, "{}", reg),
            Operand::Var(var) => write!(f, "{}", var),
            Operand::Slot(slot) => write!(f, "{}", slot),
            Operand::Imm(imm) => write!(f, "#{}", imm),
        }
    }
}

/// The locations an operand position accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OperandFlags(u8);

impl OperandFlags {
    pub const CONST: OperandFlags = OperandFlags(0b100);
    pub const REG: OperandFlags = OperandFlags(0b001);
    pub const STACK: OperandFlags = OperandFlags(0b010);

    pub fn contains(self, other: OperandFlags) -> bool { self.0 & other.0 == other.0 }
}

impl BitOr for OperandFlags {
    type Output = OperandFlags;

    fn bitor(self, rhs: OperandFlags) -> OperandFlags { OperandFlags(self.0 | rhs.0) }
}

/// The role an operand plays in its instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandMode {
    /// Written by the instruction.
    Def,
    /// Read at the start of the instruction.
    Use,
    /// Read, and must stay intact until the instruction is done.
    Alive,
    /// Scratch, written and read inside the instruction.
    Temp,
    /// Kept for deoptimization or debugging, never needs a register.
    State,
}

/// An operand together with its accepted locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LirOperand {
    pub operand: Operand,
    pub flags: OperandFlags,
}

impl LirOperand {
    pub fn new(operand: impl Into<Operand>, flags: OperandFlags) -> Self {
        Self {
            operand: operand.into(),
            flags,
        }
    }
}
