//! # Extension Traits
//!
//! Convenience operations built only on the [`Filesystem`] contract.
//!
//! ## Overview
//!
//! [`FilesystemExt`] is blanket-implemented for every backend (including
//! `dyn Filesystem`), so callers get these helpers without backends having to
//! implement anything.
//!
//! ## Available Methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`exists`](FilesystemExt::exists) | Whether anything exists at a path, without following it |
//! | [`is_dir`](FilesystemExt::is_dir) | Whether a path resolves to a directory |
//! | [`is_regular`](FilesystemExt::is_regular) | Whether a path resolves to a regular file |
//! | [`mkdir_all`](FilesystemExt::mkdir_all) | Create a directory and its missing ancestors |
//! | [`remove_all`](FilesystemExt::remove_all) | Remove a tree bottom-up |
//! | [`read_file`](FilesystemExt::read_file) | Read a whole file |
//! | [`write_file`](FilesystemExt::write_file) | Create or replace a whole file |
//!
//! ## JSON Support (Feature-Gated)
//!
//! With the `serde` feature enabled, [`FilesystemExtJson`] adds `read_json`
//! and `write_json`.
//!
//! ```toml
//! [dependencies]
//! portable-fs = { version = "0.1", features = ["serde"] }
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::{Filesystem, FsError, Permissions};

/// Extension methods for any filesystem backend.
///
/// # Example
///
/// ```rust
/// use portable_fs::{Filesystem, FilesystemExt, FsError, MemoryFilesystem, Permissions};
/// use std::path::Path;
///
/// fn save_note(fs: &dyn Filesystem, text: &str) -> Result<(), FsError> {
///     fs.mkdir_all(Path::new("notes/2024"), Permissions::default_dir())?;
///     fs.write_file(Path::new("notes/2024/today.md"), text.as_bytes())
/// }
///
/// let fs = MemoryFilesystem::new();
/// save_note(&fs, "hello").unwrap();
/// assert_eq!(fs.read_file(Path::new("notes/2024/today.md")).unwrap(), b"hello");
/// ```
pub trait FilesystemExt: Filesystem {
    /// Whether anything exists at `name`. Does not follow a final symlink,
    /// so a dangling link exists.
    ///
    /// Returns `Err` only for failures other than [`FsError::NotFound`].
    fn exists(&self, name: &Path) -> Result<bool, FsError> {
        match self.lstat(name) {
            Ok(_) => Ok(true),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether `name` resolves to a directory.
    ///
    /// Returns `Ok(false)` if the path doesn't exist.
    fn is_dir(&self, name: &Path) -> Result<bool, FsError> {
        match self.stat(name) {
            Ok(info) => Ok(info.is_dir()),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether `name` resolves to a regular file.
    ///
    /// Returns `Ok(false)` if the path doesn't exist.
    fn is_regular(&self, name: &Path) -> Result<bool, FsError> {
        match self.stat(name) {
            Ok(info) => Ok(info.is_regular()),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create `name` and any missing ancestors.
    ///
    /// Succeeds if `name` is already a directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if some component exists and is not a
    ///   directory
    fn mkdir_all(&self, name: &Path, perm: Permissions) -> Result<(), FsError> {
        let mut current = PathBuf::new();
        for component in name.components() {
            current.push(component);
            match self.stat(&current) {
                Ok(info) if info.is_dir() => continue,
                Ok(_) => {
                    return Err(FsError::AlreadyExists {
                        path: current,
                        operation: "mkdir_all",
                    });
                }
                Err(FsError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
            match self.mkdir(&current, perm) {
                Ok(()) => trace!(path = %current.display(), "mkdir_all created"),
                // Lost a race with another creator.
                Err(FsError::AlreadyExists { .. }) if self.is_dir(&current)? => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Remove `name` and, if it is a directory, everything below it.
    ///
    /// Symlinks are removed, never followed. Succeeds if `name` does not
    /// exist.
    fn remove_all(&self, name: &Path) -> Result<(), FsError> {
        let root = match self.lstat(name) {
            Ok(info) => info,
            Err(FsError::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };

        // (path, still needs its children queued)
        let mut pending = vec![(name.to_path_buf(), root.is_dir())];
        while let Some((path, expand)) = pending.pop() {
            if expand {
                pending.push((path.clone(), false));
                for child in self.dir_names(&path)? {
                    let child = path.join(child);
                    let is_dir = self.lstat(&child)?.is_dir();
                    pending.push((child, is_dir));
                }
                continue;
            }
            match self.remove(&path) {
                Ok(()) | Err(FsError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Read the entire contents of the file at `name`.
    fn read_file(&self, name: &Path) -> Result<Vec<u8>, FsError> {
        let mut file = self.open(name)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| FsError::from_io("read", name, e))?;
        file.close()?;
        Ok(data)
    }

    /// Create or truncate the file at `name` and write `data` to it.
    fn write_file(&self, name: &Path, data: &[u8]) -> Result<(), FsError> {
        let mut file = self.create(name)?;
        file.write_at(data, 0)?;
        file.close()
    }
}

impl<F: Filesystem + ?Sized> FilesystemExt for F {}

// =============================================================================
// JSON Support (Feature-Gated)
// =============================================================================

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde::{Serialize, de::DeserializeOwned};
    use std::io;

    /// JSON serialization extension methods.
    ///
    /// Available when the `serde` feature is enabled.
    pub trait FilesystemExtJson: Filesystem {
        /// Read a file and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - [`FsError::NotFound`] if the file doesn't exist
        /// - [`FsError::Io`] with [`io::ErrorKind::InvalidData`] if parsing fails
        ///
        /// # Example
        ///
        /// ```rust
        /// use portable_fs::{Filesystem, FsError};
        /// #[cfg(feature = "serde")]
        /// use portable_fs::FilesystemExtJson;
        /// use std::path::Path;
        ///
        /// #[cfg(feature = "serde")]
        /// fn load_config(fs: &dyn Filesystem) -> Result<serde_json::Value, FsError> {
        ///     fs.read_json(Path::new("config.json"))
        /// }
        /// ```
        fn read_json<T: DeserializeOwned>(&self, name: &Path) -> Result<T, FsError> {
            let data = self.read_file(name)?;
            serde_json::from_slice(&data).map_err(|e| FsError::Io {
                operation: "read_json",
                path: name.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            })
        }

        /// Serialize a value and write it as pretty-printed JSON.
        fn write_json<T: Serialize>(&self, name: &Path, value: &T) -> Result<(), FsError> {
            let json = serde_json::to_vec_pretty(value).map_err(|e| FsError::Io {
                operation: "write_json",
                path: name.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            })?;
            self.write_file(name, &json)
        }
    }

    impl<F: Filesystem + ?Sized> FilesystemExtJson for F {}
}

#[cfg(feature = "serde")]
pub use json::FilesystemExtJson;
