use rustc_hash::FxHashSet;

use super::operand::{PReg, RegKind};

/// The register file of a target, as seen by the allocator.
pub struct RegisterConfig {
    /// All registers, indexed by their number.
    registers: Vec<PReg>,
    /// Allocatable registers in the order of preference.
    allocatable: Vec<PReg>,
    /// Registers destroyed by a call.
    caller_saved: Vec<PReg>,

    allocatable_set: FxHashSet<PReg>,
}

impl RegisterConfig {
    /// Create a register configuration.
    ///
    /// `registers` must be numbered densely from zero, in order.
    pub fn new(registers: Vec<PReg>, allocatable: Vec<PReg>, caller_saved: Vec<PReg>) -> Self {
        debug_assert!(registers
            .iter()
            .enumerate()
            .all(|(i, reg)| reg.num() as usize == i));

        let allocatable_set = allocatable.iter().copied().collect();
        Self {
            registers,
            allocatable,
            caller_saved,
            allocatable_set,
        }
    }

    /// A small target for demos and tests.
    ///
    /// General purpose registers come first, then floating point registers,
    /// then a stack pointer that is never allocatable. The first half of each
    /// kind is caller-saved.
    ///
    /// # Panics
    ///
    /// Panics if the registers and the stack pointer do not fit in `u8`
    /// numbers, i.e. if `n_general + n_float > 255`.
    pub fn toy(n_general: u8, n_float: u8) -> Self {
        assert!(
            n_general as u16 + n_float as u16 <= u8::MAX as u16,
            "toy target with {} + {} registers is too large",
            n_general,
            n_float
        );
        let mut registers = Vec::new();
        let mut caller_saved = Vec::new();

        for i in 0..n_general {
            let reg = PReg::new(i, RegKind::General);
            registers.push(reg);
            if i < n_general.div_ceil(2) {
                caller_saved.push(reg);
            }
        }
        for i in 0..n_float {
            let reg = PReg::new(n_general + i, RegKind::Float);
            registers.push(reg);
            if i < n_float.div_ceil(2) {
                caller_saved.push(reg);
            }
        }

        let allocatable = registers.clone();
        registers.push(PReg::new(n_general + n_float, RegKind::General));

        Self::new(registers, allocatable, caller_saved)
    }

    /// The number of registers, which is also the smallest operand number of
    /// a variable.
    pub fn num_registers(&self) -> usize { self.registers.len() }

    pub fn registers(&self) -> &[PReg] { &self.registers }

    pub fn register(&self, num: usize) -> Option<PReg> { self.registers.get(num).copied() }

    pub fn allocatable(&self) -> &[PReg] { &self.allocatable }

    /// Allocatable registers of a kind, in the order of preference.
    pub fn allocatable_of(&self, kind: RegKind) -> Vec<PReg> {
        self.allocatable
            .iter()
            .copied()
            .filter(|reg| reg.kind() == kind)
            .collect()
    }

    pub fn caller_saved(&self) -> &[PReg] { &self.caller_saved }

    pub fn is_allocatable(&self, reg: PReg) -> bool { self.allocatable_set.contains(&reg) }
}
