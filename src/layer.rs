//! # Layer Trait
//!
//! Tower-style middleware composition for filesystem backends.
//!
//! ## Overview
//!
//! A [`Layer`] wraps a backend in another backend that adds behavior and
//! forwards the actual work. The crate ships one middleware,
//! [`TracingFilesystem`], which logs every call through `tracing`.
//!
//! ```text
//! Backend ──▶ Layer::layer() ──▶ Wrapped Backend
//! ```
//!
//! ## Fluent Composition
//!
//! ```rust
//! use portable_fs::{Filesystem, LayerExt, MemoryFilesystem, TracingLayer};
//! use std::path::Path;
//! use tracing::Level;
//!
//! let fs = MemoryFilesystem::new().layer(TracingLayer::new().with_level(Level::TRACE));
//! assert!(fs.stat(Path::new("missing")).is_err());
//! ```

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::Level;

use crate::walk::{WalkFn, WalkOutcome};
use crate::{File, FileInfo, Filesystem, FsError, LinkTargetType, Permissions, RenamePolicy};

/// A layer that wraps a backend to add functionality.
///
/// # Type Parameters
///
/// - `F`: The backend type being wrapped
///
/// # Example
///
/// ```rust
/// use portable_fs::Layer;
///
/// struct Audited<F> {
///     inner: F,
///     tag: &'static str,
/// }
///
/// struct AuditLayer {
///     tag: &'static str,
/// }
///
/// impl<F> Layer<F> for AuditLayer {
///     type Filesystem = Audited<F>;
///
///     fn layer(self, inner: F) -> Self::Filesystem {
///         Audited { inner, tag: self.tag }
///     }
/// }
/// ```
pub trait Layer<F> {
    /// The resulting backend type after applying this layer.
    type Filesystem;

    /// Wrap `inner`, consuming the layer configuration.
    fn layer(self, inner: F) -> Self::Filesystem;
}

/// Extension trait for fluent layer composition.
///
/// Provides `.layer()` on any [`Filesystem`].
pub trait LayerExt: Filesystem + Sized {
    /// Apply a layer to this backend.
    fn layer<L: Layer<Self>>(self, layer: L) -> L::Filesystem {
        layer.layer(self)
    }
}

impl<F: Filesystem> LayerExt for F {}

/// Emit an event at a level chosen at runtime.
macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {{
        let level = $level;
        if level == Level::ERROR {
            tracing::event!(Level::ERROR, $($arg)+)
        } else if level == Level::WARN {
            tracing::event!(Level::WARN, $($arg)+)
        } else if level == Level::INFO {
            tracing::event!(Level::INFO, $($arg)+)
        } else if level == Level::DEBUG {
            tracing::event!(Level::DEBUG, $($arg)+)
        } else {
            tracing::event!(Level::TRACE, $($arg)+)
        }
    }};
}

/// Produces [`TracingFilesystem`] wrappers.
#[derive(Debug, Clone, Copy)]
pub struct TracingLayer {
    level: Level,
}

impl TracingLayer {
    /// Log at `DEBUG`.
    pub fn new() -> Self {
        Self {
            level: Level::DEBUG,
        }
    }

    /// Log at `level` instead.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl Default for TracingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Filesystem> Layer<F> for TracingLayer {
    type Filesystem = TracingFilesystem<F>;

    fn layer(self, inner: F) -> Self::Filesystem {
        TracingFilesystem {
            inner,
            level: self.level,
        }
    }
}

/// Logs every operation and its outcome, then forwards to `F`.
#[derive(Debug)]
pub struct TracingFilesystem<F> {
    inner: F,
    level: Level,
}

impl<F> TracingFilesystem<F> {
    /// The wrapped backend.
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Unwrap, returning the inner backend.
    pub fn into_inner(self) -> F {
        self.inner
    }

    fn record<T>(
        &self,
        operation: &'static str,
        path: &Path,
        result: Result<T, FsError>,
    ) -> Result<T, FsError> {
        match &result {
            Ok(_) => event_at!(self.level, operation = operation, path = %path.display(), "ok"),
            Err(e) => event_at!(
                self.level,
                operation = operation,
                path = %path.display(),
                kind = ?e.kind(),
                error = %e,
                "failed"
            ),
        }
        result
    }
}

impl<F: Filesystem> Filesystem for TracingFilesystem<F> {
    fn stat(&self, name: &Path) -> Result<FileInfo, FsError> {
        self.record("stat", name, self.inner.stat(name))
    }

    fn lstat(&self, name: &Path) -> Result<FileInfo, FsError> {
        self.record("lstat", name, self.inner.lstat(name))
    }

    fn open(&self, name: &Path) -> Result<Box<dyn File>, FsError> {
        self.record("open", name, self.inner.open(name))
    }

    fn create(&self, name: &Path) -> Result<Box<dyn File>, FsError> {
        self.record("create", name, self.inner.create(name))
    }

    fn mkdir(&self, name: &Path, perm: Permissions) -> Result<(), FsError> {
        self.record("mkdir", name, self.inner.mkdir(name, perm))
    }

    fn remove(&self, name: &Path) -> Result<(), FsError> {
        self.record("remove", name, self.inner.remove(name))
    }

    fn rename(&self, old: &Path, new: &Path) -> Result<(), FsError> {
        let result = self.inner.rename(old, new);
        match &result {
            Ok(()) => event_at!(
                self.level,
                operation = "rename",
                path = %old.display(),
                to = %new.display(),
                "ok"
            ),
            Err(e) => event_at!(
                self.level,
                operation = "rename",
                path = %old.display(),
                to = %new.display(),
                kind = ?e.kind(),
                error = %e,
                "failed"
            ),
        }
        result
    }

    fn chmod(&self, name: &Path, mode: Permissions) -> Result<(), FsError> {
        self.record("chmod", name, self.inner.chmod(name, mode))
    }

    fn chtimes(&self, name: &Path, atime: SystemTime, mtime: SystemTime) -> Result<(), FsError> {
        self.record("chtimes", name, self.inner.chtimes(name, atime, mtime))
    }

    fn dir_names(&self, name: &Path) -> Result<Vec<String>, FsError> {
        self.record("dir_names", name, self.inner.dir_names(name))
    }

    fn symlinks_supported(&self) -> bool {
        self.inner.symlinks_supported()
    }

    fn create_symlink(
        &self,
        name: &Path,
        target: &Path,
        tt: LinkTargetType,
    ) -> Result<(), FsError> {
        self.record(
            "create_symlink",
            name,
            self.inner.create_symlink(name, target, tt),
        )
    }

    fn read_symlink(&self, name: &Path) -> Result<(PathBuf, LinkTargetType), FsError> {
        self.record("read_symlink", name, self.inner.read_symlink(name))
    }

    fn change_symlink_type(&self, name: &Path, tt: LinkTargetType) -> Result<(), FsError> {
        self.record(
            "change_symlink_type",
            name,
            self.inner.change_symlink_type(name, tt),
        )
    }

    fn rename_policy(&self) -> RenamePolicy {
        self.inner.rename_policy()
    }

    fn walk(&self, root: &Path, walk_fn: &mut WalkFn<'_>) -> Result<WalkOutcome, FsError> {
        let result = self.inner.walk(root, walk_fn);
        if let Ok(outcome) = &result {
            event_at!(self.level, outcome = ?outcome, "walk finished");
        }
        self.record("walk", root, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, MemoryFilesystem, WalkControl};

    #[test]
    fn layer_ext_is_auto_implemented() {
        fn _check<F: Filesystem + LayerExt>() {}
    }

    #[test]
    fn tracing_layer_forwards_results() {
        let fs = MemoryFilesystem::new().layer(TracingLayer::new());
        fs.mkdir(Path::new("d"), Permissions::default_dir()).unwrap();
        fs.create(Path::new("d/f")).unwrap();
        assert!(fs.stat(Path::new("d/f")).unwrap().is_regular());
        assert_eq!(fs.dir_names(Path::new("d")).unwrap(), vec!["f".to_string()]);
        assert_eq!(
            fs.remove(Path::new("d")).unwrap_err().kind(),
            ErrorKind::NotEmpty
        );
        // The wrapped backend saw the same writes.
        assert!(fs.inner().lstat(Path::new("d/f")).is_ok());
    }

    #[test]
    fn tracing_layer_preserves_capabilities() {
        let inner = MemoryFilesystem::new()
            .with_symlinks(false)
            .with_rename_policy(RenamePolicy::FailIfExists);
        let fs = inner.layer(TracingLayer::new().with_level(Level::INFO));
        assert!(!fs.symlinks_supported());
        assert_eq!(fs.rename_policy(), RenamePolicy::FailIfExists);
        assert_eq!(
            fs.read_symlink(Path::new("x")).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn tracing_layer_forwards_walk() {
        let fs = MemoryFilesystem::new().layer(TracingLayer::default());
        fs.mkdir(Path::new("a"), Permissions::default_dir()).unwrap();
        let mut seen = 0;
        let outcome = fs
            .walk(Path::new(""), &mut |_, _| {
                seen += 1;
                Ok(WalkControl::Continue)
            })
            .unwrap();
        assert_eq!(outcome, WalkOutcome::Completed);
        assert_eq!(seen, 2);
    }

    #[test]
    fn tracing_layer_forwards_rename() {
        let fs = MemoryFilesystem::new().layer(TracingLayer::new());
        fs.create(Path::new("old")).unwrap();
        fs.rename(Path::new("old"), Path::new("new")).unwrap();
        assert!(fs.inner().stat(Path::new("new")).is_ok());
        assert!(
            fs.rename(Path::new("old"), Path::new("newer"))
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn layers_stack() {
        let fs = MemoryFilesystem::new()
            .layer(TracingLayer::new())
            .layer(TracingLayer::new().with_level(Level::TRACE));
        fs.create(Path::new("f")).unwrap();
        assert!(fs.into_inner().into_inner().stat(Path::new("f")).is_ok());
    }
}
