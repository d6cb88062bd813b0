//! Open file handles.

use std::io::Read;
use std::path::Path;

use crate::{FileInfo, FsError};

/// An open file, exclusively owned by the caller that opened it.
///
/// Sequential reads come from [`Read`]: `Ok(0)` means end of data and is
/// never reported as an error. Positioned writes through
/// [`write_at`](File::write_at) are an independent access mode and leave the
/// read cursor where it was.
///
/// Dropping a handle closes it. [`close`](File::close) releases it early;
/// calling it more than once is fine.
///
/// # Example
///
/// ```rust
/// use portable_fs::{File, Filesystem, FsError};
/// use std::io::Read;
/// use std::path::Path;
///
/// fn patch_header(fs: &dyn Filesystem, path: &Path) -> Result<Vec<u8>, FsError> {
///     let mut file = fs.create(path)?;
///     file.write_at(b"HEADER", 0)?;
///     let mut contents = Vec::new();
///     file.read_to_end(&mut contents)
///         .map_err(|e| FsError::from_io("read", path, e))?;
///     file.close()?;
///     Ok(contents)
/// }
/// ```
pub trait File: Read + Send {
    /// The path this handle was opened with.
    fn name(&self) -> &Path;

    /// Write all of `buf` starting at `offset`.
    ///
    /// Returns the number of bytes written, which is `buf.len()` on success.
    /// Writing past the current end zero-fills the gap.
    ///
    /// # Errors
    ///
    /// - [`FsError::PermissionDenied`] if the handle was opened read-only
    /// - [`FsError::Io`] for closed handles and storage faults
    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize, FsError>;

    /// Set the file length.
    ///
    /// Shrinking discards trailing content; growing zero-fills.
    ///
    /// # Errors
    ///
    /// - [`FsError::PermissionDenied`] if the handle was opened read-only
    /// - [`FsError::Io`] for closed handles and storage faults
    fn truncate(&mut self, size: u64) -> Result<(), FsError>;

    /// Metadata of the open file.
    fn stat(&self) -> Result<FileInfo, FsError>;

    /// Release the underlying resource.
    ///
    /// Succeeds as a no-op on an already closed handle. Every other
    /// operation on a closed handle fails.
    fn close(&mut self) -> Result<(), FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_is_object_safe() {
        fn _check(_: &mut dyn File) {}
    }

    #[test]
    fn boxed_file_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Box<dyn File>>();
    }
}
