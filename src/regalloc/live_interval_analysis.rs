//! Live interval analysis.
//!
//! Walks the blocks and their instructions backwards and builds one
//! [Interval] per variable and allocatable register.

use log::trace;

use super::{
    interval::{Interval, Intervals, RegisterPriority},
    liveness_analysis::Liveness,
};
use crate::{
    collections::linked_list::LinkedListContainerPtr,
    lir::{Inst, Lir, LirOperand, Operand, OperandFlags, OperandMode, RegKind, RegisterConfig},
};

fn reg_kind(operand: Operand) -> Option<RegKind> {
    match operand {
        Operand::Reg(reg) => Some(reg.kind()),
        Operand::Var(var) => Some(var.kind().reg_kind()),
        Operand::Slot(_) | Operand::Imm(_) => None,
    }
}

fn input_priority(flags: OperandFlags) -> RegisterPriority {
    if flags.contains(OperandFlags::STACK) {
        RegisterPriority::ShouldHaveRegister
    } else {
        RegisterPriority::MustHaveRegister
    }
}

fn output_priority(lir: &Lir, inst: Inst) -> RegisterPriority {
    if inst.is_label(lir) && !inst.operands(lir, OperandMode::Def).is_empty() {
        RegisterPriority::None
    } else {
        RegisterPriority::MustHaveRegister
    }
}

struct IntervalBuilder<'a> {
    liveness: &'a mut Liveness,
    intervals: Intervals,
}

impl IntervalBuilder<'_> {
    /// Get the interval of an operand the allocator is in charge of, with
    /// its category and kind recorded.
    fn interval(&mut self, operand: Operand) -> Option<&mut Interval> {
        let number = self.liveness.tracked_number(operand)?;
        let kind = reg_kind(operand)?;
        let category = self.liveness.category_of(number, kind);
        let interval = self.intervals.get_or_insert(operand, number);
        interval.set_category(category);
        Some(interval)
    }

    fn add_use(&mut self, op: &LirOperand, block_from: u32, pos: u32) {
        let priority = input_priority(op.flags);
        if let Some(interval) = self.interval(op.operand) {
            interval.add_range(block_from, pos);
            interval.add_use(pos, priority);
            interval.set_priority(priority);
        }
    }

    fn add_state(&mut self, op: &LirOperand, block_from: u32, pos: u32) {
        if let Some(interval) = self.interval(op.operand) {
            interval.add_range(block_from, pos);
            interval.set_priority(RegisterPriority::None);
        }
    }

    fn add_temp(&mut self, operand: Operand, id: u32, priority: RegisterPriority) {
        if let Some(interval) = self.interval(operand) {
            interval.add_range(id, id + 1);
            interval.add_use(id, priority);
            interval.set_priority(priority);
        }
    }

    fn add_def(&mut self, operand: Operand, id: u32, priority: RegisterPriority) {
        if let Some(interval) = self.interval(operand) {
            interval.set_def_pos(id);
            if interval.narrow_first_to_def(id) {
                interval.add_use(id, priority);
                interval.set_priority(priority);
            } else {
                trace!("definition of {} at {} is never used", operand, id);
                interval.add_range(id, id + 1);
            }
        }
    }
}

/// Build the intervals from the result of the liveness analysis.
pub fn analyze_on_lir(lir: &Lir, regs: &RegisterConfig, liveness: &mut Liveness) -> Intervals {
    let mut builder = IntervalBuilder {
        liveness,
        intervals: Intervals::new(),
    };

    for &block in lir.blocks().iter().rev() {
        let (block_from, block_to) = builder.liveness.block_bounds(lir, block);

        let live_out = builder
            .liveness
            .live_out(lir, block)
            .iter_ones()
            .collect::<Vec<_>>();
        for number in live_out {
            if let Some(operand) = builder.liveness.operand(number) {
                if let Some(interval) = builder.interval(operand) {
                    interval.add_range(block_from, block_to + 2);
                }
            }
        }

        for inst in block.iter(lir).rev() {
            let Some(id) = inst.id(lir) else {
                continue;
            };

            if inst.destroys_caller_saved(lir) {
                for &reg in regs.caller_saved() {
                    if regs.is_allocatable(reg) {
                        builder.add_temp(reg.into(), id, RegisterPriority::None);
                    }
                }
            }

            let def_priority = output_priority(lir, inst);
            for op in inst.operands(lir, OperandMode::Def) {
                builder.add_def(op.operand, id, def_priority);
            }
            for op in inst.operands(lir, OperandMode::Temp) {
                builder.add_temp(op.operand, id, RegisterPriority::MustHaveRegister);
            }
            for op in inst.operands(lir, OperandMode::Alive) {
                builder.add_use(op, block_from, id + 1);
            }
            for op in inst.operands(lir, OperandMode::Use) {
                builder.add_use(op, block_from, id);
            }
            for op in inst.operands(lir, OperandMode::State) {
                builder.add_state(op, block_from, id + 1);
            }
        }
    }

    let mut intervals = builder.intervals;

    // registers are fixed nodes of the interference graphs
    for interval in intervals.iter_mut() {
        if interval.operand().is_reg() {
            interval.add_range(0, 1);
        }
    }

    for interval in intervals.iter() {
        trace!("interval {}", interval);
    }

    intervals
}
