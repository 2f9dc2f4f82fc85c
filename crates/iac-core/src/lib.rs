pub mod error;
pub mod graph;
pub mod rng;
pub mod weights;
pub mod live_edge;
pub mod reach;
pub mod cascade;
pub mod consensus;

// Core types
pub type F = f64;
pub type NodeId = usize;

/// Slack allowed on the incoming-weight sum of a node.
pub const EPSILON: F = 1e-9;

pub use error::{IacError, Result};
pub use graph::{Edge, Graph, GraphStats, NodeTable};
pub use rng::TrialRng;

// Weighting and realization
pub use weights::{assign_weights, validate_activation, WeightPolicy};
pub use live_edge::{sample_live_edges, LiveEdgeGraph};
pub use reach::{reachable_set, Reachability};

// Backend seam
pub use cascade::Cascade;
pub use consensus::ConsensusCounter;
