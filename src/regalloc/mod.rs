//! # Register Allocation
//!
//! This module implements the Chaitin-Briggs graph coloring register
//! allocation on the LIR and its utilities.
//!
//! - `block_defuse_analysis`: Block-level def-use analysis.
//! - `liveness_analysis`: Instruction numbering and liveness (aka. in and out
//!   set).
//! - `live_interval_analysis`: Live interval analysis.
//! - `interference_graph`: Interference graphs, one per register category.
//! - `coloring`: Simplify and select.
//! - `graph_coloring_allocation`: The allocator, driving the phases above and
//!   spilling.
//! - `location_assignment`: Rewriting variables to registers and slots.
//! - `move_resolver`, `data_flow_resolution`: Moves for phi values on the
//!   edges.

pub mod block_defuse_analysis;
pub mod coloring;
pub mod config;
pub mod data_flow_resolution;
pub mod error;
pub mod graph_coloring_allocation;
pub mod interference_graph;
pub mod interval;
pub mod live_interval_analysis;
pub mod liveness_analysis;
pub mod location_assignment;
pub mod move_resolver;

pub use config::AllocatorConfig;
pub use error::{AllocError, AllocResult};
pub use graph_coloring_allocation::GraphColoringAllocation;
