//! # Filesystem Traits
//!
//! The two traits every backend provides:
//!
//! | Trait | Role |
//! |-------|------|
//! | [`Filesystem`] | Path-level operations: metadata, create/remove/rename, symlinks, walk |
//! | [`File`] | An open handle: sequential read, positioned write, truncate, close |
//!
//! Both are object-safe. Backends are shared as `Arc<dyn Filesystem>`;
//! handles are owned as `Box<dyn File>`.

mod file;
mod filesystem;

pub use file::File;
pub use filesystem::Filesystem;
