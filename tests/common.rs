#![allow(dead_code)]

pub use orzra::samples::*;
use orzra::{
    collections::linked_list::LinkedListContainerPtr,
    lir::{Block, InstKind, Lir, LirOperand, Operand, OperandMode, RegisterConfig},
};
use rustc_hash::FxHashMap;

/// The values observed by one instruction.
pub type Trace = Vec<(String, Vec<i64>)>;

fn read(state: &FxHashMap<Operand, i64>, op: &LirOperand) -> i64 {
    match op.operand {
        Operand::Imm(value) => value,
        other => state.get(&other).copied().unwrap_or(-1),
    }
}

/// Interpret the LIR, before or after register allocation.
///
/// Every output gets a fresh value, every operation records the values of
/// its inputs, alive and state operands. Calls clobber the caller-saved
/// registers and temps are clobbered by their instruction. Branches take the
/// then-block as long as `decisions` says so.
pub fn execute(lir: &Lir, regs: &RegisterConfig, decisions: &[bool]) -> Trace {
    let mut state: FxHashMap<Operand, i64> = FxHashMap::default();
    let mut pending: Vec<i64> = Vec::new();
    let mut counter = 100;
    let mut trace = Trace::new();
    let mut decisions = decisions.iter().copied();
    let mut steps = 0;

    let mut block = lir.blocks()[0];
    'outer: loop {
        for inst in block.iter(lir) {
            steps += 1;
            assert!(steps < 10_000, "the program does not terminate");

            let operands = move |mode| inst.operands(lir, mode);
            match inst.kind(lir) {
                InstKind::Label => {
                    let values = std::mem::take(&mut pending);
                    for (op, value) in operands(OperandMode::Def).iter().zip(values) {
                        state.insert(op.operand, value);
                    }
                }
                InstKind::Jump(target) => {
                    pending = operands(OperandMode::Alive)
                        .iter()
                        .map(|op| read(&state, op))
                        .collect();
                    block = *target;
                    continue 'outer;
                }
                InstKind::Branch(then_block, else_block) => {
                    let cond = operands(OperandMode::Use)
                        .iter()
                        .map(|op| read(&state, op))
                        .collect();
                    trace.push(("branch".to_string(), cond));
                    block = if decisions.next().unwrap_or(false) {
                        *then_block
                    } else {
                        *else_block
                    };
                    continue 'outer;
                }
                InstKind::Return => {
                    let values = operands(OperandMode::Use)
                        .iter()
                        .map(|op| read(&state, op))
                        .collect();
                    trace.push(("ret".to_string(), values));
                    break 'outer;
                }
                InstKind::Move | InstKind::StackMove | InstKind::LoadConst => {
                    let value = read(&state, &operands(OperandMode::Use)[0]);
                    state.insert(operands(OperandMode::Def)[0].operand, value);
                }
                InstKind::Op(name) | InstKind::Call(name) => {
                    let values = [OperandMode::Use, OperandMode::Alive, OperandMode::State]
                        .into_iter()
                        .flat_map(|mode| operands(mode).iter().map(|op| read(&state, op)))
                        .collect();
                    trace.push((name.clone(), values));

                    if matches!(inst.kind(lir), InstKind::Call(_)) {
                        for &reg in regs.caller_saved() {
                            state.insert(reg.into(), -7);
                        }
                    }
                    for op in operands(OperandMode::Temp) {
                        state.insert(op.operand, -9);
                    }
                    for op in operands(OperandMode::Def) {
                        state.insert(op.operand, counter);
                        counter += 1;
                    }
                }
            }
        }
        panic!("{} falls through", block.name(lir));
    }

    trace
}

/// No variable is left in any instruction.
pub fn assert_allocated(lir: &Lir) {
    for inst in lir.insts() {
        for mode in [
            OperandMode::Def,
            OperandMode::Use,
            OperandMode::Alive,
            OperandMode::Temp,
            OperandMode::State,
        ] {
            for op in inst.operands(lir, mode) {
                assert!(
                    !op.operand.is_var(),
                    "{} still has a variable",
                    inst.display(lir)
                );
            }
        }
    }
}

pub fn count_moves(lir: &Lir, block: Block) -> usize {
    block
        .iter(lir)
        .filter(|inst| {
            matches!(
                inst.kind(lir),
                InstKind::Move | InstKind::LoadConst | InstKind::StackMove
            )
        })
        .count()
}
