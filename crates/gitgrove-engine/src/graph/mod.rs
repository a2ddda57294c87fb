pub mod layout;
pub mod model;
pub mod query;
pub mod state;
pub mod timeline;

pub use model::{GraphModel, Node, NodeIdx};
pub use state::Engine;
