// Confinement of client-supplied paths to the served directory tree.

pub mod error;
pub mod resolver;

pub use error::PathError;
pub use resolver::{JailRoot, ResolvedPath};
