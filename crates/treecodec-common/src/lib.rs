//! Shared pieces for treecodec tools: configuration, type expressions and
//! the file-backed type library.

pub mod config;
pub mod library;
pub mod type_expr;

pub use config::{TreecodecConfig, discover_config};
pub use library::{Definition, TypeLibrary};
pub use type_expr::TypeExpr;

pub type Result<T> = anyhow::Result<T>;
