//! Error types for the portable filesystem contract.

use std::io;
use std::path::{Path, PathBuf};

/// Backend-independent classification of a [`FsError`].
///
/// Every backend maps its native faults onto exactly one of these kinds so
/// callers can branch without inspecting backend-specific detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The path, or one of its components, does not exist.
    NotFound,
    /// An entry already exists where one was to be created.
    AlreadyExists,
    /// The backend refuses the operation for access-control reasons.
    PermissionDenied,
    /// Removal of a non-empty directory was attempted.
    NotEmpty,
    /// The backend cannot perform this category of operation.
    Unsupported,
    /// Any other storage fault.
    Io,
}

/// Filesystem error type.
///
/// Variants map one-to-one onto [`ErrorKind`]. All variants carry the path
/// and/or operation involved.
///
/// # Examples
///
/// ```rust
/// use portable_fs::{ErrorKind, FsError};
/// use std::path::PathBuf;
///
/// let err = FsError::NotFound { path: PathBuf::from("docs/missing.txt") };
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// assert_eq!(err.to_string(), "not found: docs/missing.txt");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: PathBuf,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Permission denied for operation.
    #[error("{operation}: permission denied: {path}")]
    PermissionDenied {
        /// The path where permission was denied.
        path: PathBuf,
        /// The operation that was denied.
        operation: &'static str,
    },

    /// Directory is not empty when it should be.
    #[error("directory not empty: {path}")]
    NotEmpty {
        /// The path to the non-empty directory.
        path: PathBuf,
    },

    /// Operation is not supported by this backend.
    #[error("operation not supported: {operation}")]
    Unsupported {
        /// The unsupported operation.
        operation: &'static str,
    },

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::NotFound { .. } => ErrorKind::NotFound,
            FsError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            FsError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            FsError::NotEmpty { .. } => ErrorKind::NotEmpty,
            FsError::Unsupported { .. } => ErrorKind::Unsupported,
            FsError::Io { .. } => ErrorKind::Io,
        }
    }

    /// The path this error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            FsError::NotFound { path }
            | FsError::AlreadyExists { path, .. }
            | FsError::PermissionDenied { path, .. }
            | FsError::NotEmpty { path }
            | FsError::Io { path, .. } => Some(path),
            FsError::Unsupported { .. } => None,
        }
    }

    /// Returns `true` if this is a [`ErrorKind::NotFound`] error.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Map a native I/O error onto the taxonomy, attaching context.
    ///
    /// Kinds without a dedicated variant become [`FsError::Io`].
    pub fn from_io(operation: &'static str, path: impl Into<PathBuf>, error: io::Error) -> Self {
        let path = path.into();
        match error.kind() {
            io::ErrorKind::NotFound => FsError::NotFound { path },
            io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
                FsError::PermissionDenied { path, operation }
            }
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists { path, operation },
            io::ErrorKind::DirectoryNotEmpty => FsError::NotEmpty { path },
            io::ErrorKind::Unsupported => FsError::Unsupported { operation },
            _ => FsError::Io {
                operation,
                path,
                source: error,
            },
        }
    }

    /// Build an [`FsError::Io`] from a kind and message.
    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
        kind: io::ErrorKind,
        message: &'static str,
    ) -> Self {
        FsError::Io {
            operation,
            path: path.into(),
            source: io::Error::new(kind, message),
        }
    }
}

/// Convert FsError to std::io::Error so handles can report through `Read`.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        let kind = match e.kind() {
            ErrorKind::NotFound => io::ErrorKind::NotFound,
            ErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
            ErrorKind::PermissionDenied => io::ErrorKind::PermissionDenied,
            ErrorKind::NotEmpty => io::ErrorKind::DirectoryNotEmpty,
            ErrorKind::Unsupported => io::ErrorKind::Unsupported,
            ErrorKind::Io => match e {
                FsError::Io { source, .. } => return source,
                _ => io::ErrorKind::Other,
            },
        };
        io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = FsError::NotFound {
            path: PathBuf::from("missing"),
        };
        assert_eq!(err.to_string(), "not found: missing");
    }

    #[test]
    fn already_exists_display() {
        let err = FsError::AlreadyExists {
            path: PathBuf::from("exists"),
            operation: "mkdir",
        };
        assert_eq!(err.to_string(), "mkdir: already exists: exists");
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            FsError::NotEmpty {
                path: PathBuf::from("d")
            }
            .kind(),
            ErrorKind::NotEmpty
        );
        assert_eq!(
            FsError::Unsupported {
                operation: "create_symlink"
            }
            .kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn unsupported_has_no_path() {
        let err = FsError::Unsupported {
            operation: "read_symlink",
        };
        assert!(err.path().is_none());
    }

    #[test]
    fn from_io_not_found() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let err = FsError::from_io("stat", "a/b", io_err);
        assert!(matches!(err, FsError::NotFound { ref path } if path == Path::new("a/b")));
    }

    #[test]
    fn from_io_permission_denied() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "test");
        let err = FsError::from_io("open", "secret", io_err);
        assert!(matches!(
            err,
            FsError::PermissionDenied {
                operation: "open",
                ..
            }
        ));
    }

    #[test]
    fn from_io_already_exists() {
        let io_err = io::Error::new(io::ErrorKind::AlreadyExists, "test");
        let err = FsError::from_io("mkdir", "d", io_err);
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn from_io_directory_not_empty() {
        let io_err = io::Error::new(io::ErrorKind::DirectoryNotEmpty, "test");
        let err = FsError::from_io("remove", "d", io_err);
        assert_eq!(err.kind(), ErrorKind::NotEmpty);
    }

    #[test]
    fn from_io_other_keeps_source() {
        let io_err = io::Error::other("disk on fire");
        let err = FsError::from_io("write_at", "f", io_err);
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("disk on fire"));
    }

    #[test]
    fn into_io_error_preserves_kind() {
        let err: io::Error = FsError::NotFound {
            path: PathBuf::from("x"),
        }
        .into();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let err: io::Error = FsError::io("read", "x", io::ErrorKind::InvalidData, "bad").into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
