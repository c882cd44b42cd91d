//! Persistence of result descriptors.
//!
//! Every allocated result directory ends up holding exactly one
//! `result.yaml`. Leaves write theirs when they execute; suites merge a
//! summary into it once they complete. Downstream tooling rebuilds the tree
//! from the directory layout, classifies nodes by `type` and orders
//! siblings by `start_time`.

pub mod record;
pub mod sink;
pub mod status;

pub use record::{NodeType, ResultRecord};
pub use status::Status;
