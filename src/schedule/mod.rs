//! Commits a single DFG node's placement and the routed edges it touches.

pub mod engine;

pub use engine::{candidates_for_node, schedule, try_to_route};
