/// Knobs of the graph coloring register allocation.
#[derive(Debug, Clone, Copy)]
pub struct AllocatorConfig {
    /// Bound of the global liveness fixpoint, exceeding it is an error.
    pub max_liveness_iterations: usize,
    /// Bound of the spill-and-recolor rounds.
    pub max_recolor_rounds: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_liveness_iterations: 50,
            max_recolor_rounds: 500,
        }
    }
}
