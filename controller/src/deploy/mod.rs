//! Deployment orchestration

pub mod classifier;
pub mod executor;
pub mod fsm;
pub mod inspector;
pub mod provisioner;
pub mod release;
pub mod report;
pub mod revert;
