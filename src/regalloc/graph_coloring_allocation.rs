use log::{debug, info, trace};
use rustc_hash::FxHashSet;

use super::{
    coloring::GraphColoring,
    config::AllocatorConfig,
    data_flow_resolution,
    error::{AllocError, AllocResult},
    interference_graph::build_graphs,
    interval::{Intervals, RegisterPriority},
    live_interval_analysis,
    liveness_analysis::Liveness,
    location_assignment,
};
use crate::lir::{InsertPosition, InsertionBuffer, Lir, MoveFactory, RegisterConfig};

/// Graph coloring register allocation of one compilation unit.
#[derive(Debug, Default)]
pub struct GraphColoringAllocation {
    pub config: AllocatorConfig,

    pub total_spills: usize,
    pub total_loads_added: usize,
    pub total_stores_added: usize,
    pub recolor_rounds: usize,
    pub phi_resolution_moves: usize,
    pub stack_to_stack_moves: usize,
    pub cycle_breaking_slots: usize,
}

impl GraphColoringAllocation {
    pub fn new(config: AllocatorConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn run_on_lir(
        &mut self,
        lir: &mut Lir,
        regs: &RegisterConfig,
        factory: &impl MoveFactory,
    ) -> AllocResult<()> {
        debug!("allocating registers for {}", lir.name());

        let mut liveness = Liveness::compute(lir, regs, &self.config)?;
        let mut intervals = live_interval_analysis::analyze_on_lir(lir, regs, &mut liveness);

        let num_categories = liveness.num_categories();
        let palettes = (0..num_categories)
            .map(|category| regs.allocatable_of(liveness.category_kind(category)))
            .collect::<Vec<_>>();

        for (category, palette) in palettes.iter().enumerate() {
            let has_variables = intervals
                .iter()
                .any(|interval| interval.category() == Some(category) && interval.operand().is_var());
            if palette.is_empty() && has_variables {
                return Err(AllocError::NoAllocatableRegisters(format!(
                    "{:?}",
                    liveness.category_kind(category)
                )));
            }
        }

        let mut graphs = build_graphs(&intervals, num_categories);
        for graph in graphs.iter() {
            trace!("{}", graph);
        }

        let mut coloring = GraphColoring::new(liveness.first_variable_number(), palettes);
        coloring.color_graphs(&mut graphs, &mut intervals);

        let mut tries = 0;
        while !coloring.found_color()
            && !coloring.is_spill_stack_empty()
            && tries < self.config.max_recolor_rounds
        {
            tries += 1;
            debug!("spill round {} of {}", tries, lir.name());

            for node in coloring.take_spill_candidates() {
                self.spill(lir, &liveness, &mut intervals, node, factory)?;
            }

            // liveness is not recomputed, the spilled intervals only cover
            // their spill moves now
            graphs = build_graphs(&intervals, num_categories);
            coloring.color_graphs(&mut graphs, &mut intervals);
        }
        self.recolor_rounds += tries;

        if !coloring.found_color() {
            if !coloring.is_spill_stack_empty() {
                return Err(AllocError::RecolorLimitExceeded(tries));
            }
            return Err(AllocError::NoColorFound {
                operands: coloring
                    .uncolored()
                    .iter()
                    .map(|&node| liveness.display_operand(node))
                    .collect(),
            });
        }

        for interval in intervals.iter() {
            trace!("{}", interval);
        }

        location_assignment::assign_locations(lir, &liveness, &intervals)?;

        let stats = data_flow_resolution::resolve_data_flow(lir, factory)?;
        self.phi_resolution_moves += stats.phi_resolution_moves;
        self.stack_to_stack_moves += stats.stack_to_stack_moves;
        self.cycle_breaking_slots += stats.moves.cycle_breaking_slots;

        info!(
            "{}: {} spills, {} loads, {} stores, {} spill rounds",
            lir.name(),
            self.total_spills,
            self.total_loads_added,
            self.total_stores_added,
            tries
        );

        Ok(())
    }

    /// Put an interval on the stack.
    ///
    /// The value is stored right after its definition if that needs a
    /// register, and reloaded before every other position that needs a
    /// register. What remains of the interval are the single positions
    /// around these moves.
    fn spill(
        &mut self,
        lir: &mut Lir,
        liveness: &Liveness,
        intervals: &mut Intervals,
        node: usize,
        factory: &impl MoveFactory,
    ) -> AllocResult<()> {
        let Some(interval) = intervals.get_mut(node) else {
            return Ok(());
        };
        let var = interval.operand();
        if interval.is_spilled() {
            return Err(AllocError::AlreadySpilled(var.to_string()));
        }

        let kind = match interval.kind() {
            Some(kind) => kind,
            None => match interval.category() {
                Some(category) => liveness.category_kind(category).widest(),
                None => return Err(AllocError::MissingLocation(var.to_string())),
            },
        };
        let slot = lir.frame_mut().allocate_spill_slot(kind);
        interval.set_slot(slot);
        self.total_spills += 1;

        let def = interval.def_pos();
        let uses = interval.use_positions().to_vec();
        interval.clear_ranges();

        // the earliest visit, i.e. the definition if there is one
        let first_priority = interval.priority();
        debug!(
            "spilling {} into {}, def: {:?} priority: {:?}",
            var, slot, def, first_priority
        );

        if let (Some(def), RegisterPriority::MustHaveRegister) = (def, first_priority) {
            let inst = liveness
                .inst_for_id(def)
                .ok_or(AllocError::SpillPositionNotFound(def))?;
            let store = factory.create_move(lir, slot.into(), var);
            let mut buffer = InsertionBuffer::new(InsertPosition::After(inst));
            buffer.append(store);
            buffer.finish(lir);

            interval.add_temp(def);
            self.total_stores_added += 1;
        }

        let mut reloaded = FxHashSet::default();
        for u in uses.iter().rev() {
            if u.priority != RegisterPriority::MustHaveRegister || Some(u.pos) == def {
                continue;
            }

            let mut current = u.pos;
            if current % 2 != 0 {
                current -= 1;
                interval.add_temp(current);
            }

            if reloaded.insert(current) {
                let inst = liveness
                    .inst_for_id(current)
                    .ok_or(AllocError::SpillPositionNotFound(current))?;
                let load = factory.create_move(lir, var, slot.into());
                let mut buffer = InsertionBuffer::new(InsertPosition::Before(inst));
                buffer.append(load);
                buffer.finish(lir);
                self.total_loads_added += 1;
            }

            interval.add_temp(u.pos);
        }

        for range in interval.ranges() {
            trace!("{} was spilled, new range {}", var, range);
        }

        Ok(())
    }
}
