pub mod error;
pub mod loader;
pub mod placeholder;
pub mod policy;
pub mod raw;
pub mod registry;
