//! Reusable UI components.

pub mod workflow_graph;
