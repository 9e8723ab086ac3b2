//! Plugin runtime: the set of plugins loaded into the admin application

pub mod local;
pub mod runtime;

pub use local::LocalPluginRuntime;
pub use runtime::{PluginRuntime, RuntimeError, RuntimePluginHandle, RuntimeStatus};
