pub mod live_edge;
pub mod threshold;

pub use live_edge::LiveEdgeModel;
pub use threshold::ThresholdModel;
