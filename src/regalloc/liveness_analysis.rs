//! Global liveness analysis.
//!
//! Numbers the instructions, then computes the live-in and live-out sets of
//! every block with a backward fixpoint over the block order. Operands are
//! identified by their operand number: a physical register is its own number,
//! a variable is the number of registers plus its index.

use bitvec::vec::BitVec;
use log::{debug, trace};

use super::{
    block_defuse_analysis::{self, BlockDefUse},
    config::AllocatorConfig,
    error::{AllocError, AllocResult},
};
use crate::lir::{Block, Inst, Lir, Operand, OperandMode, RegKind, RegisterConfig};

#[derive(Debug, Clone)]
pub struct BlockLiveSets {
    pub live_gen: BitVec,
    pub live_kill: BitVec,
    pub live_in: BitVec,
    pub live_out: BitVec,
}

pub struct Liveness {
    first_variable_number: usize,
    num_operands: usize,

    /// Operands seen in the LIR, by operand number.
    operands: Vec<Option<Operand>>,
    /// Physical registers available for allocation, by operand number.
    allocatable: BitVec,

    /// Instructions and their blocks, indexed by `id / 2`.
    inst_for_id: Vec<Inst>,
    block_for_id: Vec<Block>,
    /// First and last instruction id of each block, by block index.
    block_bounds: Vec<(u32, u32)>,

    live_sets: Vec<BlockLiveSets>,

    /// Category number of each operand, `None` if not yet asked for.
    operand_categories: Vec<Option<usize>>,
    /// Register kind of each category.
    categories: Vec<RegKind>,

    num_loops: usize,
    /// Operand by loop bitmap, set if the operand is used or defined inside
    /// the loop.
    interval_in_loop: BitVec,
}

impl Liveness {
    /// Number the instructions and compute the global live sets.
    ///
    /// Ids are even and increase along the block order. Instructions inserted
    /// afterwards have no id.
    pub fn compute(
        lir: &mut Lir,
        regs: &RegisterConfig,
        config: &AllocatorConfig,
    ) -> AllocResult<Self> {
        let first_variable_number = regs.num_registers();
        let num_operands = first_variable_number + lir.num_vars();
        let num_loops = lir
            .blocks()
            .iter()
            .filter_map(|block| block.loop_index(lir))
            .map(|index| index + 1)
            .max()
            .unwrap_or(0);

        let mut allocatable = BitVec::repeat(false, num_operands);
        for reg in regs.allocatable() {
            allocatable.set(reg.num() as usize, true);
        }

        let mut liveness = Self {
            first_variable_number,
            num_operands,
            operands: vec![None; num_operands],
            allocatable,
            inst_for_id: Vec::new(),
            block_for_id: Vec::new(),
            block_bounds: Vec::new(),
            live_sets: Vec::new(),
            operand_categories: Vec::new(),
            categories: Vec::new(),
            num_loops,
            interval_in_loop: BitVec::repeat(false, num_operands * num_loops),
        };

        debug!("liveness of {}: numbering instructions", lir.name());
        liveness.number_instructions(lir)?;
        liveness.build_local_live_sets(lir);
        liveness.build_global_live_sets(lir, config)?;

        Ok(liveness)
    }

    fn number_instructions(&mut self, lir: &mut Lir) -> AllocResult<()> {
        let mut id = 0u32;
        for block in lir.blocks().to_vec() {
            let insts = block.insts(lir);
            if insts.is_empty() {
                return Err(AllocError::EmptyBlock(block.name(lir)));
            }
            let first = id;

            for inst in insts {
                inst.set_id(lir, Some(id));
                self.inst_for_id.push(inst);
                self.block_for_id.push(block);

                for mode in [
                    OperandMode::Def,
                    OperandMode::Use,
                    OperandMode::Alive,
                    OperandMode::Temp,
                    OperandMode::State,
                ] {
                    for op in inst.operands(lir, mode) {
                        let number = match op.operand {
                            Operand::Reg(_) | Operand::Var(_) => self
                                .operand_number(op.operand)
                                .ok_or_else(|| AllocError::UnknownOperand(op.operand.to_string()))?,
                            Operand::Slot(_) | Operand::Imm(_) => continue,
                        };
                        self.operands[number] = Some(op.operand);

                        if mode == OperandMode::State {
                            continue;
                        }
                        if let Some(loop_index) = block.loop_index(lir) {
                            let bit = number * self.num_loops + loop_index;
                            self.interval_in_loop.set(bit, true);
                        }
                    }
                }
                id += 2;
            }
            self.block_bounds.push((first, id - 2));
        }
        Ok(())
    }

    fn build_local_live_sets(&mut self, lir: &Lir) {
        let n = self.num_operands;
        let live_sets: Vec<BlockLiveSets> = lir
            .blocks()
            .iter()
            .map(|&block| {
                let BlockDefUse {
                    live_gen,
                    live_kill,
                } = block_defuse_analysis::analyze_on_block(lir, block, self);
                BlockLiveSets {
                    live_gen,
                    live_kill,
                    live_in: BitVec::repeat(false, n),
                    live_out: BitVec::repeat(false, n),
                }
            })
            .collect();
        self.live_sets = live_sets;
    }

    fn build_global_live_sets(&mut self, lir: &Lir, config: &AllocatorConfig) -> AllocResult<()> {
        let blocks = lir.blocks();
        let mut iterations = 0;
        let mut scratch = BitVec::repeat(false, self.num_operands);

        loop {
            let mut changed = false;

            for (index, &block) in blocks.iter().enumerate().rev() {
                let mut changed_in_block = false;

                let succs = block.succs(lir);
                if !succs.is_empty() {
                    scratch.fill(false);
                    for succ in succs {
                        for number in self.live_sets[succ.index(lir)].live_in.iter_ones() {
                            scratch.set(number, true);
                        }
                    }

                    let sets = &mut self.live_sets[index];
                    if sets.live_out != scratch {
                        std::mem::swap(&mut sets.live_out, &mut scratch);
                        changed = true;
                        changed_in_block = true;
                    }
                }

                // live_in only changes with live_out
                if iterations == 0 || changed_in_block {
                    let sets = &mut self.live_sets[index];
                    let mut live_in = sets.live_out.clone();
                    for number in sets.live_kill.iter_ones() {
                        live_in.set(number, false);
                    }
                    for number in sets.live_gen.iter_ones() {
                        live_in.set(number, true);
                    }
                    sets.live_in = live_in;
                }
            }

            iterations += 1;
            if !changed {
                break;
            }
            if iterations > config.max_liveness_iterations {
                return Err(AllocError::LivenessDiverged {
                    name: lir.name().to_string(),
                    iterations,
                });
            }
        }

        trace!("global liveness converged after {} iterations", iterations);
        Ok(())
    }

    pub fn first_variable_number(&self) -> usize { self.first_variable_number }

    pub fn num_operands(&self) -> usize { self.num_operands }

    /// The operand number of a register or a variable, `None` for registers
    /// and variables the LIR was not built with.
    pub fn operand_number(&self, operand: Operand) -> Option<usize> {
        let number = match operand {
            Operand::Reg(reg) if (reg.num() as usize) < self.first_variable_number => {
                reg.num() as usize
            }
            Operand::Var(var) => self.first_variable_number + var.num() as usize,
            Operand::Reg(_) | Operand::Slot(_) | Operand::Imm(_) => return None,
        };
        (number < self.num_operands).then_some(number)
    }

    /// The operand number if the allocator is in charge of the operand, i.e.
    /// a variable or an allocatable register.
    pub fn tracked_number(&self, operand: Operand) -> Option<usize> {
        let number = self.operand_number(operand)?;
        if number < self.first_variable_number && !self.is_allocatable(number) {
            return None;
        }
        Some(number)
    }

    pub fn is_allocatable(&self, number: usize) -> bool {
        number < self.first_variable_number && self.allocatable.get(number).map_or(false, |b| *b)
    }

    pub fn is_variable(&self, number: usize) -> bool { number >= self.first_variable_number }

    /// The operand with the given number, if it appears in the LIR.
    pub fn operand(&self, number: usize) -> Option<Operand> {
        self.operands.get(number).copied().flatten()
    }

    pub fn inst_for_id(&self, id: u32) -> Option<Inst> {
        self.inst_for_id.get((id / 2) as usize).copied()
    }

    pub fn block_for_id(&self, id: u32) -> Option<Block> {
        self.block_for_id.get((id / 2) as usize).copied()
    }

    pub fn max_id(&self) -> u32 { (self.inst_for_id.len() as u32).saturating_sub(1) * 2 }

    /// First and last instruction id of a block.
    pub fn block_bounds(&self, lir: &Lir, block: Block) -> (u32, u32) {
        self.block_bounds[block.index(lir)]
    }

    pub fn live_sets(&self, lir: &Lir, block: Block) -> &BlockLiveSets {
        &self.live_sets[block.index(lir)]
    }

    pub fn live_in(&self, lir: &Lir, block: Block) -> &BitVec { &self.live_sets(lir, block).live_in }

    pub fn live_out(&self, lir: &Lir, block: Block) -> &BitVec {
        &self.live_sets(lir, block).live_out
    }

    /// The register category of an operand, memoized.
    ///
    /// Categories are numbered in the order they are first asked for.
    pub fn category_of(&mut self, number: usize, kind: RegKind) -> usize {
        if self.operand_categories.len() <= number {
            let len = (number + 1).max(self.operand_categories.len() * 2);
            self.operand_categories.resize(len, None);
        }
        if let Some(category) = self.operand_categories[number] {
            return category;
        }

        let category = match self.categories.iter().position(|k| *k == kind) {
            Some(category) => category,
            None => {
                self.categories.push(kind);
                self.categories.len() - 1
            }
        };
        self.operand_categories[number] = Some(category);
        category
    }

    pub fn num_categories(&self) -> usize { self.categories.len() }

    /// The register kind of a category.
    pub fn category_kind(&self, category: usize) -> RegKind { self.categories[category] }

    pub fn num_loops(&self) -> usize { self.num_loops }

    /// If the operand is used or defined inside the loop.
    pub fn is_interval_in_loop(&self, number: usize, loop_index: usize) -> bool {
        if loop_index >= self.num_loops || number >= self.num_operands {
            return false;
        }
        self.interval_in_loop[number * self.num_loops + loop_index]
    }

    pub fn display_operand(&self, number: usize) -> String {
        match self.operand(number) {
            Some(operand) => operand.to_string(),
            None if number < self.first_variable_number => format!("%{}", number),
            None => format!("$v{}", number - self.first_variable_number),
        }
    }
}
