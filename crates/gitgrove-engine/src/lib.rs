pub mod color;
pub mod effects;
pub mod graph;
pub mod physics;
pub mod spatial;
pub mod util;

pub use graph::{Engine, GraphModel, Node, NodeIdx};
pub use spatial::{Bounds, QuadTree, SpatialItem};
pub use util::commit_log::load_commit_log;
pub use util::config::EngineConfig;
