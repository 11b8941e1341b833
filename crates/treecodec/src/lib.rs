//! treecodec CLI library
//!
//! Exposes the command implementations for programmatic use and testing.

pub mod commands;
pub mod logging;
pub mod session;

pub use session::Session;
