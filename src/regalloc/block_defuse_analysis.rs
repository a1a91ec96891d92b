//! Block-level def-use analysis.
//!
//! Computes, per block, the operands read before any write in the block
//! (`live_gen`) and the operands written in the block (`live_kill`).

use bitvec::vec::BitVec;

use super::liveness_analysis::Liveness;
use crate::{
    collections::linked_list::LinkedListContainerPtr,
    lir::{Block, Lir, OperandMode},
};

#[derive(Debug, Clone)]
pub struct BlockDefUse {
    pub live_gen: BitVec,
    pub live_kill: BitVec,
}

pub fn analyze_on_block(lir: &Lir, block: Block, liveness: &Liveness) -> BlockDefUse {
    let n = liveness.num_operands();
    let mut live_gen = BitVec::repeat(false, n);
    let mut live_kill = BitVec::repeat(false, n);

    for inst in block.iter(lir) {
        // uses are visited before the defs of the same instruction
        for mode in [OperandMode::Use, OperandMode::Alive] {
            for op in inst.operands(lir, mode) {
                if let Some(number) = liveness.tracked_number(op.operand) {
                    if !live_kill[number] {
                        live_gen.set(number, true);
                    }
                }
            }
        }
        for mode in [OperandMode::Def, OperandMode::Temp] {
            for op in inst.operands(lir, mode) {
                if let Some(number) = liveness.tracked_number(op.operand) {
                    live_kill.set(number, true);
                }
            }
        }
        for op in inst.operands(lir, OperandMode::State) {
            if let Some(number) = liveness.tracked_number(op.operand) {
                if !live_kill[number] {
                    live_gen.set(number, true);
                }
            }
        }
    }

    BlockDefUse {
        live_gen,
        live_kill,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lir::{InstData, Operand, RegisterConfig, ValueKind},
        regalloc::config::AllocatorConfig,
    };

    #[test]
    fn test_gen_kill() {
        let regs = RegisterConfig::toy(2, 0);
        let mut lir = Lir::new("defuse");
        let b0 = lir.add_block();
        let b1 = lir.add_block();
        let v0 = lir.new_var(ValueKind::I32);
        let v1 = lir.new_var(ValueKind::I32);
        let v2 = lir.new_var(ValueKind::I32);

        lir.append(b0, InstData::op("def").output(v0).output(v1));
        lir.jump(b0, b1, &[]);
        // v2 is read before it is written in b1
        lir.append(b1, InstData::op("add").output(v2).input(v0).input(v2));
        lir.append(b1, InstData::ret().input(v2).input(Operand::Imm(0)));

        let liveness = Liveness::compute(&mut lir, &regs, &AllocatorConfig::default()).unwrap();
        let first = regs.num_registers();

        let b1_sets = analyze_on_block(&lir, b1, &liveness);
        assert!(b1_sets.live_gen[first]);
        assert!(b1_sets.live_gen[first + 2]);
        assert!(b1_sets.live_kill[first + 2]);
        assert!(!b1_sets.live_kill[first]);
        assert!(!b1_sets.live_gen[first + 1]);

        let b0_sets = analyze_on_block(&lir, b0, &liveness);
        assert!(b0_sets.live_gen.not_any());
        assert_eq!(b0_sets.live_kill.count_ones(), 2);
    }
}
