//! Tools exposed to protocol clients
//!
//! Each tool takes a JSON arguments object and returns a JSON result. The
//! [`ToolRegistry`] owns the set served by [`crate::server::ToolServer`].

pub mod implementations;
pub mod registry;
pub mod trait_def;

pub use implementations::ToolContext;
pub use registry::ToolRegistry;
pub use trait_def::{Tool, ToolDefinition};
