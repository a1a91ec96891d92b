//! # Move Resolver
//!
//! Turns a set of parallel moves into a sequence of moves.
//!
//! A move may only be emitted once nothing else still needs to read its
//! destination register. Each source register is blocked once per pending
//! mapping reading it, and unblocked when that mapping is done. If no
//! mapping can make progress the remaining ones form a cycle, which is
//! broken by moving one source to a fresh stack slot.

use log::{debug, trace};
use rustc_hash::FxHashMap;

use super::error::{AllocError, AllocResult};
use crate::lir::{InsertPosition, InsertionBuffer, Lir, MoveFactory, Operand, PReg, StackSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSource {
    Value(Operand),
    Constant(i64),
}

#[derive(Debug, Clone, Copy)]
struct Mapping {
    from: MoveSource,
    to: Operand,
}

/// Counters of the moves a resolver has emitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct MoveStats {
    pub moves: usize,
    pub loads: usize,
    pub stack_moves: usize,
    pub cycle_breaking_slots: usize,
}

#[derive(Default)]
pub struct MoveResolver {
    mappings: Vec<Mapping>,
    register_blocked: FxHashMap<PReg, usize>,
    position: Option<InsertPosition>,
    pub stats: MoveStats,
}

impl MoveResolver {
    pub fn new() -> Self { Self::default() }

    pub fn add_mapping(&mut self, from: Operand, to: Operand) {
        trace!("add move mapping from {} to {}", from, to);
        self.mappings.push(Mapping {
            from: MoveSource::Value(from),
            to,
        });
    }

    pub fn add_constant_mapping(&mut self, value: i64, to: Operand) {
        trace!("add move mapping from #{} to {}", value, to);
        self.mappings.push(Mapping {
            from: MoveSource::Constant(value),
            to,
        });
    }

    pub fn has_mappings(&self) -> bool { !self.mappings.is_empty() }

    pub fn set_insert_position(&mut self, position: InsertPosition) { self.position = Some(position); }

    /// How many pending mappings still read a register.
    pub fn blocked(&self, reg: PReg) -> usize { self.register_blocked.get(&reg).copied().unwrap_or(0) }

    fn block(&mut self, operand: Operand) {
        if let Operand::Reg(reg) = operand {
            *self.register_blocked.entry(reg).or_insert(0) += 1;
        }
    }

    fn unblock(&mut self, operand: Operand) {
        if let Operand::Reg(reg) = operand {
            if let Some(count) = self.register_blocked.get_mut(&reg) {
                *count -= 1;
            }
        }
    }

    fn is_move_to_self(from: MoveSource, to: Operand) -> bool { from == MoveSource::Value(to) }

    fn safe_to_process(&self, mapping: &Mapping) -> bool {
        match mapping.to {
            Operand::Reg(reg) => {
                let blocked = self.blocked(reg);
                blocked == 0 || (blocked == 1 && Self::is_move_to_self(mapping.from, mapping.to))
            }
            _ => true,
        }
    }

    fn insert_move(
        &mut self,
        lir: &mut Lir,
        factory: &impl MoveFactory,
        buffer: &mut InsertionBuffer,
        from: MoveSource,
        to: Operand,
    ) {
        let inst = match from {
            MoveSource::Constant(value) => {
                self.stats.loads += 1;
                factory.create_load(lir, to, value)
            }
            MoveSource::Value(from) if from.is_slot() && to.is_slot() => {
                self.stats.stack_moves += 1;
                factory.create_stack_move(lir, to, from)
            }
            MoveSource::Value(from) => {
                self.stats.moves += 1;
                factory.create_move(lir, to, from)
            }
        };
        trace!("insert {}", inst.display(lir));
        buffer.append(inst);
    }

    /// Move the source of a mapping to a fresh slot, which becomes the new
    /// source of the mapping.
    fn break_cycle(
        &mut self,
        lir: &mut Lir,
        factory: &impl MoveFactory,
        buffer: &mut InsertionBuffer,
        candidate: usize,
    ) {
        let MoveSource::Value(from) = self.mappings[candidate].from else {
            return;
        };
        let kind = match from {
            Operand::Slot(slot) => slot.kind(),
            Operand::Reg(reg) => reg.kind().widest(),
            Operand::Var(var) => var.kind(),
            Operand::Imm(_) => return,
        };
        let slot: StackSlot = lir.frame_mut().allocate_spill_slot(kind);
        self.stats.cycle_breaking_slots += 1;
        debug!("break move cycle through {} with {}", from, slot);

        self.insert_move(lir, factory, buffer, MoveSource::Value(from), slot.into());
        self.mappings[candidate].from = MoveSource::Value(slot.into());
        self.unblock(from);
    }

    fn resolve_mappings(
        &mut self,
        lir: &mut Lir,
        factory: &impl MoveFactory,
        buffer: &mut InsertionBuffer,
    ) -> AllocResult<()> {
        for i in (0..self.mappings.len()).rev() {
            if let MoveSource::Value(from) = self.mappings[i].from {
                self.block(from);
            }
        }

        while !self.mappings.is_empty() {
            let mut processed = false;
            let mut candidate = None;

            for i in (0..self.mappings.len()).rev() {
                let mapping = self.mappings[i];
                if self.safe_to_process(&mapping) {
                    self.insert_move(lir, factory, buffer, mapping.from, mapping.to);
                    if let MoveSource::Value(from) = mapping.from {
                        self.unblock(from);
                    }
                    self.mappings.remove(i);
                    processed = true;
                } else if matches!(mapping.from, MoveSource::Value(Operand::Reg(_))) {
                    candidate = Some(i);
                }
            }

            if !processed {
                let Some(candidate) = candidate else {
                    return Err(AllocError::UnresolvedMappings(self.mappings.len()));
                };
                self.break_cycle(lir, factory, buffer, candidate);
            }
        }

        debug_assert!(self.register_blocked.values().all(|&count| count == 0));
        Ok(())
    }

    /// Emit the moves of all pending mappings at the insert position.
    pub fn resolve_and_append_moves(&mut self, lir: &mut Lir, factory: &impl MoveFactory) -> AllocResult<()> {
        let Some(position) = self.position.take() else {
            return Err(AllocError::UnresolvedMappings(self.mappings.len()));
        };
        let mut buffer = InsertionBuffer::new(position);
        if self.has_mappings() {
            self.resolve_mappings(lir, factory, &mut buffer)?;
        }
        buffer.finish(lir);
        self.register_blocked.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collections::linked_list::LinkedListContainerPtr,
        lir::{Inst, InstData, InstKind, LirMoveFactory, OperandMode, RegKind, ValueKind},
    };

    fn r(n: u8) -> Operand { PReg::new(n, RegKind::General).into() }

    fn setup() -> (Lir, Inst) {
        let mut lir = Lir::new("resolver");
        let block = lir.add_block();
        let ret = lir.append(block, InstData::ret());
        (lir, ret)
    }

    fn moves(lir: &Lir) -> Vec<(InstKind, Operand, Operand)> {
        let block = lir.blocks()[0];
        block
            .iter(lir)
            .filter(|inst| !inst.is_label(lir) && !matches!(inst.kind(lir), InstKind::Return))
            .map(|inst| {
                (
                    inst.kind(lir).clone(),
                    inst.operands(lir, OperandMode::Def)[0].operand,
                    inst.operands(lir, OperandMode::Use)[0].operand,
                )
            })
            .collect()
    }

    /// Run the moves on a machine state and return it.
    fn simulate(lir: &Lir, mut state: FxHashMap<Operand, i64>) -> FxHashMap<Operand, i64> {
        for (kind, to, from) in moves(lir) {
            let value = match (kind, from) {
                (InstKind::LoadConst, Operand::Imm(value)) => value,
                (_, from) => state.get(&from).copied().unwrap_or(-1),
            };
            state.insert(to, value);
        }
        state
    }

    #[test]
    fn test_chain() {
        let (mut lir, ret) = setup();
        let mut resolver = MoveResolver::new();
        resolver.set_insert_position(InsertPosition::Before(ret));
        // r0 -> r1 -> r2, r1 must be read before it is written
        resolver.add_mapping(r(1), r(2));
        resolver.add_mapping(r(0), r(1));
        resolver.add_constant_mapping(42, r(0));
        resolver.resolve_and_append_moves(&mut lir, &LirMoveFactory).unwrap();

        let initial = [(r(0), 10), (r(1), 11)].into_iter().collect();
        let state = simulate(&lir, initial);
        assert_eq!(state[&r(2)], 11);
        assert_eq!(state[&r(1)], 10);
        assert_eq!(state[&r(0)], 42);
        assert_eq!(resolver.stats.cycle_breaking_slots, 0);
        assert_eq!(resolver.blocked(PReg::new(0, RegKind::General)), 0);
        assert_eq!(resolver.blocked(PReg::new(1, RegKind::General)), 0);
    }

    #[test]
    fn test_swap() {
        let (mut lir, ret) = setup();
        let mut resolver = MoveResolver::new();
        resolver.set_insert_position(InsertPosition::Before(ret));
        resolver.add_mapping(r(0), r(1));
        resolver.add_mapping(r(1), r(0));
        resolver.resolve_and_append_moves(&mut lir, &LirMoveFactory).unwrap();

        assert_eq!(moves(&lir).len(), 3);
        assert_eq!(resolver.stats.cycle_breaking_slots, 1);
        assert_eq!(lir.frame().num_slots(), 1);

        let initial = [(r(0), 1), (r(1), 2)].into_iter().collect();
        let state = simulate(&lir, initial);
        assert_eq!(state[&r(0)], 2);
        assert_eq!(state[&r(1)], 1);
    }

    #[test]
    fn test_rotation_with_stack() {
        let (mut lir, ret) = setup();
        let slot: Operand = StackSlot::new(7, ValueKind::I64).into();
        let other: Operand = StackSlot::new(8, ValueKind::I64).into();

        let mut resolver = MoveResolver::new();
        resolver.set_insert_position(InsertPosition::Before(ret));
        resolver.add_mapping(r(0), r(1));
        resolver.add_mapping(r(1), r(2));
        resolver.add_mapping(r(2), r(0));
        resolver.add_mapping(slot, other);
        resolver.add_mapping(r(0), r(0));
        resolver.resolve_and_append_moves(&mut lir, &LirMoveFactory).unwrap();

        assert_eq!(resolver.stats.stack_moves, 1);
        assert_eq!(resolver.stats.cycle_breaking_slots, 1);

        let initial = [(r(0), 0), (r(1), 1), (r(2), 2), (slot, 7)]
            .into_iter()
            .collect();
        let state = simulate(&lir, initial);
        assert_eq!(state[&r(0)], 2);
        assert_eq!(state[&r(1)], 0);
        assert_eq!(state[&r(2)], 1);
        assert_eq!(state[&other], 7);
        for n in 0..3 {
            assert_eq!(resolver.blocked(PReg::new(n, RegKind::General)), 0);
        }
    }

    #[test]
    fn test_no_position() {
        let (mut lir, _) = setup();
        let mut resolver = MoveResolver::new();
        resolver.add_mapping(r(0), r(1));
        assert!(resolver
            .resolve_and_append_moves(&mut lir, &LirMoveFactory)
            .is_err());
    }
}
