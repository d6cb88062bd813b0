//! The filesystem capability contract.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::walk::{self, WalkFn, WalkOutcome};
use crate::{File, FileInfo, FsError, LinkTargetType, Permissions, RenamePolicy};

/// Uniform handle onto "a filesystem".
///
/// Every path is resolved against the instance's own root. Callers can swap
/// one backend for another without behavioral drift; the conformance tests in
/// `tests/` run the same assertions against every shipped backend.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. Methods take `&self`; backends
/// synchronize internally. Concurrent operations on different paths never
/// interfere. Interleaving of concurrent writers to the same path is
/// backend-defined.
///
/// # Object Safety
///
/// This trait is object-safe and is normally used as `dyn Filesystem` or
/// `Arc<dyn Filesystem>`.
///
/// # Example
///
/// ```rust
/// use portable_fs::{Filesystem, FsError, Permissions};
/// use std::path::Path;
///
/// fn ensure_inbox(fs: &dyn Filesystem) -> Result<(), FsError> {
///     match fs.mkdir(Path::new("inbox"), Permissions::default_dir()) {
///         Ok(()) => Ok(()),
///         Err(FsError::AlreadyExists { .. }) if fs.stat(Path::new("inbox"))?.is_dir() => Ok(()),
///         Err(e) => Err(e),
///     }
/// }
/// ```
pub trait Filesystem: Send + Sync {
    /// Metadata of the final target, following symlinks.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if no resolvable target exists
    fn stat(&self, name: &Path) -> Result<FileInfo, FsError>;

    /// Metadata without following the final path component.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `name` does not exist
    fn lstat(&self, name: &Path) -> Result<FileInfo, FsError>;

    /// Open an existing file for reading.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `name` does not exist
    /// - [`FsError::PermissionDenied`] per backend policy
    fn open(&self, name: &Path) -> Result<Box<dyn File>, FsError>;

    /// Create or truncate a file, returning a readable and writable handle.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the parent directory does not exist
    /// - [`FsError::PermissionDenied`] per backend policy
    fn create(&self, name: &Path) -> Result<Box<dyn File>, FsError>;

    /// Create exactly one directory level.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `name` exists
    /// - [`FsError::NotFound`] if the parent does not exist
    fn mkdir(&self, name: &Path, perm: Permissions) -> Result<(), FsError>;

    /// Remove a file, an empty directory, or a symlink (not its target).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `name` does not exist
    /// - [`FsError::NotEmpty`] if `name` is a non-empty directory
    fn remove(&self, name: &Path) -> Result<(), FsError>;

    /// Move `old` to `new`, atomically where the backend can guarantee it.
    ///
    /// When `new` exists the outcome follows [`rename_policy`](Self::rename_policy).
    /// After a successful return `old` no longer exists.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `old` does not exist
    /// - [`FsError::AlreadyExists`] if `new` exists and the policy is
    ///   [`RenamePolicy::FailIfExists`]
    fn rename(&self, old: &Path, new: &Path) -> Result<(), FsError>;

    /// Set permission bits. Follows symlinks.
    fn chmod(&self, name: &Path, mode: Permissions) -> Result<(), FsError>;

    /// Set access and modification times. Follows symlinks.
    fn chtimes(&self, name: &Path, atime: SystemTime, mtime: SystemTime) -> Result<(), FsError>;

    /// Names of the immediate children of `name`, in backend order.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `name` does not exist
    fn dir_names(&self, name: &Path) -> Result<Vec<String>, FsError>;

    /// Whether this backend can represent symbolic links.
    ///
    /// When `false`, every symlink operation fails with
    /// [`FsError::Unsupported`].
    fn symlinks_supported(&self) -> bool;

    /// Create a symlink at `name` pointing to `target`.
    ///
    /// `target` is stored verbatim and need not exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `name` exists
    /// - [`FsError::Unsupported`] if symlinks are not supported
    fn create_symlink(&self, name: &Path, target: &Path, tt: LinkTargetType)
    -> Result<(), FsError>;

    /// Target and target type of the symlink at `name`.
    ///
    /// A dangling link yields [`LinkTargetType::Unknown`], not an error.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `name` does not exist
    /// - [`FsError::Unsupported`] if symlinks are not supported
    fn read_symlink(&self, name: &Path) -> Result<(PathBuf, LinkTargetType), FsError>;

    /// Change the recorded target type of an existing symlink.
    ///
    /// Backends that derive the type from the target accept this as a no-op.
    fn change_symlink_type(&self, name: &Path, tt: LinkTargetType) -> Result<(), FsError>;

    /// How [`rename`](Self::rename) treats an existing destination.
    fn rename_policy(&self) -> RenamePolicy {
        RenamePolicy::Replace
    }

    /// Depth-first walk starting at `root`.
    ///
    /// See [`crate::walk`] for the protocol. Backends should not override
    /// this; the shared engine keeps traversal identical across backends.
    fn walk(&self, root: &Path, walk_fn: &mut WalkFn<'_>) -> Result<WalkOutcome, FsError> {
        walk::walk(self, root, walk_fn)
    }
}
