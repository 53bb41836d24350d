//! Deployment task persistence

pub mod engine;
pub mod store;

pub use engine::TaskEngine;
pub use store::{MemoryTaskStore, TaskStoreExt};
