//! Rewrite the variables of the LIR to their allocated locations.

use log::trace;

use super::{
    error::{AllocError, AllocResult},
    interval::{Interval, Intervals, RegisterPriority},
    liveness_analysis::Liveness,
};
use crate::lir::{Lir, Operand, OperandMode};

fn location(interval: &Interval) -> AllocResult<Operand> {
    interval
        .location()
        .map(Operand::from)
        .ok_or_else(|| AllocError::MissingLocation(interval.operand().to_string()))
}

fn slot(interval: &Interval) -> AllocResult<Operand> {
    interval
        .slot()
        .map(Operand::from)
        .ok_or_else(|| AllocError::MissingLocation(interval.operand().to_string()))
}

/// The location of a variable read or written by an instruction.
///
/// Spilled variables stay on the stack except where a register is required,
/// or in the moves inserted by the allocator.
fn operand_location(interval: &Interval, id: Option<u32>) -> AllocResult<Operand> {
    if !interval.is_spilled() {
        return location(interval);
    }
    match id {
        None => location(interval),
        Some(id) if interval.find_use_priority(id) == RegisterPriority::MustHaveRegister => {
            location(interval)
        }
        Some(_) => slot(interval),
    }
}

fn state_location(interval: &Interval) -> AllocResult<Operand> {
    if interval.is_spilled() {
        slot(interval)
    } else {
        location(interval)
    }
}

pub fn assign_locations(lir: &mut Lir, liveness: &Liveness, intervals: &Intervals) -> AllocResult<()> {
    for inst in lir.insts() {
        let id = inst.id(lir);
        for mode in [
            OperandMode::Use,
            OperandMode::Alive,
            OperandMode::Def,
            OperandMode::Temp,
            OperandMode::State,
        ] {
            for op in inst.operands_mut(lir, mode).iter_mut() {
                if !op.operand.is_var() {
                    continue;
                }
                let interval = liveness
                    .operand_number(op.operand)
                    .and_then(|number| intervals.get(number))
                    .ok_or_else(|| AllocError::MissingLocation(op.operand.to_string()))?;

                let assigned = match mode {
                    OperandMode::State => state_location(interval)?,
                    _ => operand_location(interval, id)?,
                };
                trace!("{} at {:?} -> {}", op.operand, id, assigned);
                op.operand = assigned;
            }
        }
    }
    Ok(())
}
