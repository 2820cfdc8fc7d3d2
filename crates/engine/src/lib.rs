pub mod aggregator;
pub mod walk_forward;

pub use aggregator::{FeatureAggregator, FeatureTask, SignalColumn};
pub use walk_forward::{walk_forward, walk_forward_codes};
