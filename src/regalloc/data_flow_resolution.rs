//! Data-flow resolution.
//!
//! After the locations are assigned, the values a jump passes to the phis
//! of its target may live elsewhere than the phis themselves. The moves
//! between them are inserted on the edge, and the phi values are removed
//! from the jump.

use log::{debug, trace};
use rustc_hash::FxHashSet;

use super::{
    error::{AllocError, AllocResult},
    move_resolver::{MoveResolver, MoveStats},
};
use crate::{
    collections::linked_list::LinkedListContainerPtr,
    lir::{Block, InsertPosition, Lir, MoveFactory, Operand, OperandMode},
};

#[derive(Debug, Default, Clone, Copy)]
pub struct DataFlowStats {
    pub phi_resolution_moves: usize,
    pub stack_to_stack_moves: usize,
    pub moves: MoveStats,
}

/// Pair the phi-ins of `to` with the phi-outs of `from`, add the mappings
/// and drop the phi-outs.
fn collect_mappings(
    lir: &mut Lir,
    from: Block,
    to: Block,
    resolver: &mut MoveResolver,
    stats: &mut DataFlowStats,
) -> AllocResult<()> {
    let phi_ins = match to.label(lir) {
        Some(label) => label
            .operands(lir, OperandMode::Def)
            .iter()
            .map(|op| op.operand)
            .collect::<Vec<_>>(),
        None => Vec::new(),
    };
    if phi_ins.is_empty() {
        return Ok(());
    }

    if from.succs(lir).len() > 1 {
        return Err(AllocError::CriticalEdge {
            from: from.name(lir),
            to: to.name(lir),
        });
    }

    let jump = from
        .tail(lir)
        .filter(|inst| inst.is_jump(lir))
        .ok_or_else(|| AllocError::MissingJump(from.name(lir)))?;

    let phi_outs = jump
        .operands(lir, OperandMode::Alive)
        .iter()
        .map(|op| op.operand)
        .collect::<Vec<_>>();
    if phi_outs.len() != phi_ins.len() {
        return Err(AllocError::PhiArityMismatch {
            from: from.name(lir),
            to: to.name(lir),
            outgoing: phi_outs.len(),
            incoming: phi_ins.len(),
        });
    }

    for (&phi_in, &phi_out) in phi_ins.iter().zip(phi_outs.iter()) {
        match phi_out {
            Operand::Imm(value) => {
                stats.phi_resolution_moves += 1;
                resolver.add_constant_mapping(value, phi_in);
            }
            _ if phi_out != phi_in => {
                stats.phi_resolution_moves += 1;
                if phi_out.is_slot() && phi_in.is_slot() {
                    stats.stack_to_stack_moves += 1;
                }
                resolver.add_mapping(phi_out, phi_in);
            }
            _ => trace!("{} already in place for {}", phi_out, to.name(lir)),
        }
    }

    jump.operands_mut(lir, OperandMode::Alive).clear();
    Ok(())
}

/// Where the moves of the edge `from -> to` go.
///
/// At the end of `from` if it has a single successor, otherwise at the start
/// of `to`, which must have `from` as its only predecessor. Phi values only
/// travel on jumps, so the moves of a phi mapping always take the first way.
fn find_insert_position(lir: &Lir, from: Block, to: Block) -> AllocResult<InsertPosition> {
    if from.succs(lir).len() <= 1 {
        return Ok(match from.tail(lir) {
            Some(tail) if tail.is_jump(lir) => InsertPosition::Before(tail),
            _ => InsertPosition::End(from),
        });
    }

    if to.preds(lir).iter().any(|&pred| pred != from) {
        return Err(AllocError::CriticalEdge {
            from: from.name(lir),
            to: to.name(lir),
        });
    }
    to.label(lir)
        .map(InsertPosition::After)
        .ok_or_else(|| AllocError::EmptyBlock(to.name(lir)))
}

pub fn resolve_data_flow(lir: &mut Lir, factory: &impl MoveFactory) -> AllocResult<DataFlowStats> {
    let mut stats = DataFlowStats::default();
    let mut resolver = MoveResolver::new();

    for from in lir.blocks().to_vec() {
        let mut resolved = FxHashSet::default();
        for to in from.succs(lir).to_vec() {
            // a branch may target the same block twice
            if !resolved.insert(to) {
                continue;
            }
            debug!("processing edge {} -> {}", from.name(lir), to.name(lir));

            collect_mappings(lir, from, to, &mut resolver, &mut stats)?;
            if resolver.has_mappings() {
                let position = find_insert_position(lir, from, to)?;
                resolver.set_insert_position(position);
                resolver.resolve_and_append_moves(lir, factory)?;
            }
        }
    }

    stats.moves = resolver.stats;
    Ok(stats)
}
