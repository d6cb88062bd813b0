//! # portable-fs
//!
//! A **portable filesystem abstraction**: one capability contract that
//! higher-level code (a sync engine, a scanner, an indexer) programs against,
//! and interchangeable backends that satisfy it identically.
//!
//! Platform differences such as how symlinks record their target type, which
//! permission bits exist, or whether a rename may replace its destination
//! are made explicit in the contract instead of leaking into callers.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use portable_fs::{Filesystem, FilesystemExt, FsError, MemoryFilesystem, Permissions, WalkControl};
//! use std::path::Path;
//!
//! fn index(fs: &dyn Filesystem) -> Result<Vec<String>, FsError> {
//!     let mut files = Vec::new();
//!     fs.walk(Path::new(""), &mut |path, entry| {
//!         let info = entry?;
//!         if info.is_dir() && info.name().starts_with('.') {
//!             return Ok(WalkControl::SkipDir);
//!         }
//!         if info.is_regular() {
//!             files.push(path.display().to_string());
//!         }
//!         Ok(WalkControl::Continue)
//!     })?;
//!     Ok(files)
//! }
//!
//! let fs = MemoryFilesystem::new();
//! fs.mkdir_all(Path::new("photos/2024"), Permissions::default_dir()).unwrap();
//! fs.mkdir(Path::new(".cache"), Permissions::default_dir()).unwrap();
//! fs.write_file(Path::new("photos/2024/beach.jpg"), b"...").unwrap();
//! fs.write_file(Path::new(".cache/thumb"), b"...").unwrap();
//! assert_eq!(index(&fs).unwrap(), vec!["photos/2024/beach.jpg"]);
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Filesystem`] | The capability contract every backend implements |
//! | [`File`] | An open handle: read, positioned write, truncate, close |
//! | [`FileInfo`] | Immutable metadata snapshot |
//! | [`LinkTargetType`] | What a symlink points to |
//! | [`FsError`] / [`ErrorKind`] | Six-way error taxonomy with context |
//! | [`WalkControl`] / [`WalkOutcome`] | Steering and result of a tree walk |
//!
//! ## Backends
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`BasicFilesystem`] | The OS filesystem, optionally sandboxed under a root |
//! | [`MemoryFilesystem`] | In-memory fake for tests |
//! | [`TracingFilesystem`] | Middleware that logs every call (via [`TracingLayer`]) |
//!
//! [`default_filesystem`] returns a shared unrooted [`BasicFilesystem`].
//!
//! ---
//!
//! ## Error Handling
//!
//! All operations return `Result<T, FsError>`. Errors carry the path and
//! operation, and classify into an [`ErrorKind`]:
//!
//! ```rust
//! use portable_fs::{ErrorKind, FsError};
//! use std::path::PathBuf;
//!
//! let err = FsError::PermissionDenied {
//!     path: PathBuf::from("secret"),
//!     operation: "open",
//! };
//! assert_eq!(err.kind(), ErrorKind::PermissionDenied);
//! assert_eq!(err.to_string(), "open: permission denied: secret");
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! [`Filesystem`] requires `Send + Sync` and its methods take `&self`.
//! Share a backend across threads with `Arc<dyn Filesystem>`. Handles are
//! `Send` and exclusively owned by whoever opened them.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`FileInfo`], [`Permissions`], [`LinkTargetType`], etc., plus [`FilesystemExtJson`] |

mod backends;
mod default;
mod error;
mod ext;
mod layer;
mod traits;
mod types;
pub mod walk;

// Public re-exports - error types
pub use error::{ErrorKind, FsError};

// Public re-exports - core types
pub use types::{FileInfo, FileType, LinkTargetType, Permissions, RenamePolicy};

// Public re-exports - traits
pub use traits::{File, Filesystem};

// Public re-exports - walk
pub use walk::{WalkControl, WalkFn, WalkOutcome};

// Public re-exports - backends
pub use backends::{BasicFilesystem, MemoryFilesystem};
pub use default::{default_filesystem, set_default_filesystem};

// Public re-exports - infrastructure
pub use ext::FilesystemExt;
pub use layer::{Layer, LayerExt, TracingFilesystem, TracingLayer};

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::FilesystemExtJson;
