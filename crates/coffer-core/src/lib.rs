//! Shared types for the backup pipeline: relative paths, stat snapshots,
//! the workspace-wide error hierarchy and the frozen crypto/compression
//! parameters.

#![deny(unsafe_code)]

pub mod crypto;
pub mod error;
pub mod relpath;
pub mod stat;

pub use error::Error;
pub use relpath::RelPath;
pub use stat::StatSnapshot;
