//! Directory scanning: the hashing stream wrapper, file/directory entries,
//! and the one-pass scanner that materializes them.

#![deny(unsafe_code)]

pub mod entry;
pub mod hashing;
pub mod walk;

pub use entry::{DirEntry, FileEntry};
pub use hashing::HashingReader;
pub use walk::{scan, Inventory};
