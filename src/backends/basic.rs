//! OS filesystem backend.
//!
//! [`BasicFilesystem`] wraps `std::fs`. Unrooted, it passes paths to the OS
//! as given; this is the process-wide default. Rooted, it resolves every path
//! below its root and refuses anything that would leave it, including escapes
//! through symlinked directories.

use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use filetime::FileTime;
use tracing::{debug, trace};

use super::entry_name;
use crate::{File, FileInfo, FileType, Filesystem, FsError, LinkTargetType, Permissions};

/// Maximum number of dangling symlinks chased while confining one path.
const MAX_SYMLINK_DEPTH: usize = 40;

/// The real OS filesystem.
///
/// OS symlinks carry no type of their own. `create_symlink` ignores its
/// [`LinkTargetType`], and `read_symlink` reports the type of whatever the
/// link points at when it is called.
///
/// # Example
///
/// ```rust,no_run
/// use portable_fs::{BasicFilesystem, Filesystem};
/// use std::path::Path;
///
/// let sandbox = BasicFilesystem::new("/srv/sync/folder");
/// // Resolves to /srv/sync/folder/notes/today.md
/// let info = sandbox.stat(Path::new("notes/today.md"));
/// // Refused: escapes the root
/// assert!(sandbox.stat(Path::new("../../etc/passwd")).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct BasicFilesystem {
    root: Option<PathBuf>,
}

impl BasicFilesystem {
    /// Create a filesystem confined to `root`.
    ///
    /// The root is canonicalized at construction when it exists, so that
    /// confinement checks compare like with like (e.g. macOS `/tmp` →
    /// `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self { root: Some(root) }
    }

    /// Create a filesystem that uses paths exactly as given.
    pub fn unrooted() -> Self {
        Self { root: None }
    }

    /// The confinement root, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Map a caller path onto an OS path without following its final
    /// component.
    fn resolve(&self, name: &Path) -> Result<PathBuf, FsError> {
        let Some(root) = &self.root else {
            if name.as_os_str().is_empty() {
                return Ok(PathBuf::from("."));
            }
            return Ok(name.to_path_buf());
        };

        let mut relative = PathBuf::new();
        for component in name.components() {
            match component {
                Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
                Component::ParentDir => {
                    if !relative.pop() {
                        return Err(FsError::PermissionDenied {
                            path: name.to_path_buf(),
                            operation: "resolve",
                        });
                    }
                }
                Component::Normal(part) => relative.push(part),
            }
        }
        if relative.as_os_str().is_empty() {
            return Ok(root.clone());
        }

        // Intermediate components may be symlinks pointing elsewhere.
        if let Some(parent) = relative.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.confine(name, &root.join(parent))?;
        }
        Ok(root.join(relative))
    }

    /// Like [`resolve`](Self::resolve), but also confines the final target.
    fn resolve_following(&self, name: &Path) -> Result<PathBuf, FsError> {
        let full = self.resolve(name)?;
        if self.root.is_some() {
            self.confine(name, &full)?;
        }
        Ok(full)
    }

    /// Refuse `full` if it resolves outside the root.
    ///
    /// Existing paths are canonicalized. A dangling symlink is chased to the
    /// path it would create, and a missing path is judged by its nearest
    /// existing ancestor.
    fn confine(&self, name: &Path, full: &Path) -> Result<(), FsError> {
        let Some(root) = &self.root else {
            return Ok(());
        };
        let mut current = full.to_path_buf();
        for _ in 0..=MAX_SYMLINK_DEPTH {
            if let Ok(canonical) = current.canonicalize() {
                return Self::inside(root, name, &canonical);
            }
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    let target =
                        fs::read_link(&current).map_err(|e| FsError::from_io("resolve", name, e))?;
                    let base = current.parent().map(Path::to_path_buf).unwrap_or_default();
                    current = base.join(target);
                }
                _ => {
                    return match current
                        .ancestors()
                        .skip(1)
                        .find_map(|ancestor| ancestor.canonicalize().ok())
                    {
                        Some(canonical) => Self::inside(root, name, &canonical),
                        None => Ok(()),
                    };
                }
            }
        }
        Err(FsError::io(
            "resolve",
            name,
            io::ErrorKind::Other,
            "too many levels of symbolic links",
        ))
    }

    fn inside(root: &Path, name: &Path, canonical: &Path) -> Result<(), FsError> {
        if canonical.starts_with(root) {
            return Ok(());
        }
        debug!(path = %name.display(), resolved = %canonical.display(), "path escapes root");
        Err(FsError::PermissionDenied {
            path: name.to_path_buf(),
            operation: "resolve",
        })
    }
}

impl Default for BasicFilesystem {
    fn default() -> Self {
        Self::unrooted()
    }
}

/// Convert `std::fs::Metadata` into a [`FileInfo`].
///
/// Anything that is neither a directory nor a symlink (sockets, devices,
/// fifos) is classified as a regular file.
fn file_info(name: &Path, meta: &fs::Metadata) -> FileInfo {
    let ft = meta.file_type();
    let file_type = if ft.is_symlink() {
        FileType::Symlink
    } else if ft.is_dir() {
        FileType::Directory
    } else {
        FileType::File
    };
    FileInfo::new(
        entry_name(name),
        file_type,
        mode_of(meta),
        meta.len(),
        meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
    )
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> Permissions {
    use std::os::unix::fs::PermissionsExt;
    Permissions::from_mode(meta.permissions().mode())
}

#[cfg(not(unix))]
fn mode_of(meta: &fs::Metadata) -> Permissions {
    let base = if meta.is_dir() { 0o755 } else { 0o644 };
    if meta.permissions().readonly() {
        Permissions::from_mode(base & !0o222)
    } else {
        Permissions::from_mode(base)
    }
}

#[cfg(unix)]
fn write_all_at(file: &mut fs::File, buf: &[u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::write_all_at(file, buf, offset)
}

#[cfg(windows)]
fn write_all_at(file: &mut fs::File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::io::{Seek, SeekFrom};
    use std::os::windows::fs::FileExt;

    // seek_write moves the cursor on Windows; put it back.
    let cursor = file.stream_position()?;
    while !buf.is_empty() {
        let n = file.seek_write(buf, offset)?;
        if n == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }
        buf = &buf[n..];
        offset += n as u64;
    }
    file.seek(SeekFrom::Start(cursor))?;
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn write_all_at(_file: &mut fs::File, _buf: &[u8], _offset: u64) -> io::Result<()> {
    Err(io::ErrorKind::Unsupported.into())
}

impl Filesystem for BasicFilesystem {
    fn stat(&self, name: &Path) -> Result<FileInfo, FsError> {
        trace!(path = %name.display(), "basic stat");
        let full = self.resolve_following(name)?;
        let meta = fs::metadata(&full).map_err(|e| FsError::from_io("stat", name, e))?;
        Ok(file_info(name, &meta))
    }

    fn lstat(&self, name: &Path) -> Result<FileInfo, FsError> {
        trace!(path = %name.display(), "basic lstat");
        let full = self.resolve(name)?;
        let meta = fs::symlink_metadata(&full).map_err(|e| FsError::from_io("lstat", name, e))?;
        Ok(file_info(name, &meta))
    }

    fn open(&self, name: &Path) -> Result<Box<dyn File>, FsError> {
        trace!(path = %name.display(), "basic open");
        let full = self.resolve_following(name)?;
        let file = fs::File::open(&full).map_err(|e| FsError::from_io("open", name, e))?;
        let meta = file
            .metadata()
            .map_err(|e| FsError::from_io("open", name, e))?;
        if meta.is_dir() {
            return Err(FsError::io(
                "open",
                name,
                io::ErrorKind::IsADirectory,
                "is a directory",
            ));
        }
        Ok(Box::new(BasicFile {
            name: name.to_path_buf(),
            file: Some(file),
            writable: false,
        }))
    }

    fn create(&self, name: &Path) -> Result<Box<dyn File>, FsError> {
        debug!(path = %name.display(), "basic create");
        let full = self.resolve_following(name)?;
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&full)
            .map_err(|e| FsError::from_io("create", name, e))?;
        Ok(Box::new(BasicFile {
            name: name.to_path_buf(),
            file: Some(file),
            writable: true,
        }))
    }

    fn mkdir(&self, name: &Path, perm: Permissions) -> Result<(), FsError> {
        debug!(path = %name.display(), mode = perm.mode(), "basic mkdir");
        let full = self.resolve(name)?;
        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(perm.mode());
        }
        builder
            .create(&full)
            .map_err(|e| FsError::from_io("mkdir", name, e))
    }

    fn remove(&self, name: &Path) -> Result<(), FsError> {
        debug!(path = %name.display(), "basic remove");
        let full = self.resolve(name)?;
        if self.root.as_deref() == Some(full.as_path()) {
            return Err(FsError::PermissionDenied {
                path: name.to_path_buf(),
                operation: "remove",
            });
        }
        let meta = fs::symlink_metadata(&full).map_err(|e| FsError::from_io("remove", name, e))?;
        let result = if meta.is_dir() {
            fs::remove_dir(&full)
        } else {
            fs::remove_file(&full)
        };
        result.map_err(|e| FsError::from_io("remove", name, e))
    }

    fn rename(&self, old: &Path, new: &Path) -> Result<(), FsError> {
        debug!(from = %old.display(), to = %new.display(), "basic rename");
        let from = self.resolve(old)?;
        let to = self.resolve(new)?;
        for (path, full) in [(old, &from), (new, &to)] {
            if self.root.as_deref() == Some(full.as_path()) {
                return Err(FsError::PermissionDenied {
                    path: path.to_path_buf(),
                    operation: "rename",
                });
            }
        }
        fs::rename(&from, &to).map_err(|e| {
            // Attribute a missing source to the source path.
            if e.kind() == io::ErrorKind::NotFound && fs::symlink_metadata(&from).is_err() {
                FsError::from_io("rename", old, e)
            } else {
                FsError::from_io("rename", new, e)
            }
        })
    }

    fn chmod(&self, name: &Path, mode: Permissions) -> Result<(), FsError> {
        debug!(path = %name.display(), mode = mode.mode(), "basic chmod");
        let full = self.resolve_following(name)?;
        #[cfg(unix)]
        let perms = {
            use std::os::unix::fs::PermissionsExt;
            fs::Permissions::from_mode(mode.mode())
        };
        #[cfg(not(unix))]
        let perms = {
            let mut perms = fs::metadata(&full)
                .map_err(|e| FsError::from_io("chmod", name, e))?
                .permissions();
            perms.set_readonly(mode.readonly());
            perms
        };
        fs::set_permissions(&full, perms).map_err(|e| FsError::from_io("chmod", name, e))
    }

    fn chtimes(&self, name: &Path, atime: SystemTime, mtime: SystemTime) -> Result<(), FsError> {
        debug!(path = %name.display(), "basic chtimes");
        let full = self.resolve_following(name)?;
        // By path, so no read access to the file is needed.
        filetime::set_file_times(
            &full,
            FileTime::from_system_time(atime),
            FileTime::from_system_time(mtime),
        )
        .map_err(|e| FsError::from_io("chtimes", name, e))
    }

    fn dir_names(&self, name: &Path) -> Result<Vec<String>, FsError> {
        trace!(path = %name.display(), "basic dir_names");
        let full = self.resolve_following(name)?;
        let entries = fs::read_dir(&full).map_err(|e| FsError::from_io("dir_names", name, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FsError::from_io("dir_names", name, e))?;
            let file_name = entry.file_name().into_string().map_err(|_| {
                FsError::io(
                    "dir_names",
                    name,
                    io::ErrorKind::InvalidData,
                    "file name is not valid UTF-8",
                )
            })?;
            names.push(file_name);
        }
        Ok(names)
    }

    fn symlinks_supported(&self) -> bool {
        cfg!(unix)
    }

    #[cfg(unix)]
    fn create_symlink(
        &self,
        name: &Path,
        target: &Path,
        tt: LinkTargetType,
    ) -> Result<(), FsError> {
        debug!(path = %name.display(), target = %target.display(), ?tt, "basic create_symlink");
        let full = self.resolve(name)?;
        std::os::unix::fs::symlink(target, &full)
            .map_err(|e| FsError::from_io("create_symlink", name, e))
    }

    #[cfg(not(unix))]
    fn create_symlink(
        &self,
        _name: &Path,
        _target: &Path,
        _tt: LinkTargetType,
    ) -> Result<(), FsError> {
        Err(FsError::Unsupported {
            operation: "create_symlink",
        })
    }

    fn read_symlink(&self, name: &Path) -> Result<(PathBuf, LinkTargetType), FsError> {
        if !self.symlinks_supported() {
            return Err(FsError::Unsupported {
                operation: "read_symlink",
            });
        }
        trace!(path = %name.display(), "basic read_symlink");
        let full = self.resolve(name)?;
        let target = fs::read_link(&full).map_err(|e| FsError::from_io("read_symlink", name, e))?;
        // Resolved per call; the target can change between observations.
        let tt = match self.stat(name) {
            Ok(info) if info.is_dir() => LinkTargetType::Directory,
            Ok(_) => LinkTargetType::File,
            Err(_) => LinkTargetType::Unknown,
        };
        Ok((target, tt))
    }

    fn change_symlink_type(&self, name: &Path, tt: LinkTargetType) -> Result<(), FsError> {
        if !self.symlinks_supported() {
            return Err(FsError::Unsupported {
                operation: "change_symlink_type",
            });
        }
        trace!(path = %name.display(), ?tt, "basic change_symlink_type");
        let full = self.resolve(name)?;
        let meta = fs::symlink_metadata(&full)
            .map_err(|e| FsError::from_io("change_symlink_type", name, e))?;
        if !meta.file_type().is_symlink() {
            return Err(FsError::io(
                "change_symlink_type",
                name,
                io::ErrorKind::InvalidInput,
                "not a symbolic link",
            ));
        }
        // Unix links carry no type of their own.
        Ok(())
    }
}

/// Handle onto an OS file.
struct BasicFile {
    name: PathBuf,
    file: Option<fs::File>,
    writable: bool,
}

impl BasicFile {
    fn inner(&mut self, operation: &'static str) -> Result<&mut fs::File, FsError> {
        let name = &self.name;
        self.file
            .as_mut()
            .ok_or_else(|| FsError::io(operation, name, io::ErrorKind::Other, "file already closed"))
    }

    fn writable_inner(&mut self, operation: &'static str) -> Result<&mut fs::File, FsError> {
        if self.file.is_some() && !self.writable {
            return Err(FsError::PermissionDenied {
                path: self.name.clone(),
                operation,
            });
        }
        self.inner(operation)
    }
}

impl Read for BasicFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.inner("read")?.read(buf)?)
    }
}

impl File for BasicFile {
    fn name(&self) -> &Path {
        &self.name
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize, FsError> {
        let file = self.writable_inner("write_at")?;
        match write_all_at(file, buf, offset) {
            Ok(()) => Ok(buf.len()),
            Err(e) => Err(FsError::from_io("write_at", &self.name, e)),
        }
    }

    fn truncate(&mut self, size: u64) -> Result<(), FsError> {
        let file = self.writable_inner("truncate")?;
        match file.set_len(size) {
            Ok(()) => Ok(()),
            Err(e) => Err(FsError::from_io("truncate", &self.name, e)),
        }
    }

    fn stat(&self) -> Result<FileInfo, FsError> {
        let file = self.file.as_ref().ok_or_else(|| {
            FsError::io(
                "stat",
                &self.name,
                io::ErrorKind::Other,
                "file already closed",
            )
        })?;
        let meta = file
            .metadata()
            .map_err(|e| FsError::from_io("stat", &self.name, e))?;
        Ok(file_info(&self.name, &meta))
    }

    fn close(&mut self) -> Result<(), FsError> {
        // Dropping the std handle closes the descriptor.
        self.file.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn sandbox() -> (tempfile::TempDir, BasicFilesystem) {
        let dir = tempfile::tempdir().unwrap();
        let fs = BasicFilesystem::new(dir.path());
        (dir, fs)
    }

    #[test]
    fn rooted_paths_land_under_root() {
        let (dir, fs) = sandbox();
        fs.create(Path::new("hello.txt")).unwrap();
        assert!(dir.path().join("hello.txt").is_file());
        // A leading slash still means "the sandbox root".
        assert!(fs.stat(Path::new("/hello.txt")).unwrap().is_regular());
    }

    #[test]
    fn parent_escape_is_denied() {
        let (_dir, fs) = sandbox();
        let err = fs.stat(Path::new("../outside")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_escape_is_denied() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret"), b"x").unwrap();
        let (dir, fs) = sandbox();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("door")).unwrap();

        let err = fs.open(Path::new("door/secret")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        // The link itself is inside the root and can be inspected.
        assert!(fs.lstat(Path::new("door")).unwrap().is_symlink());
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_escape_is_denied() {
        use crate::FilesystemExt;

        let outside = tempfile::tempdir().unwrap();
        let planted = outside.path().join("planted.txt");
        let (dir, fs) = sandbox();
        std::os::unix::fs::symlink(&planted, dir.path().join("door")).unwrap();

        let err = fs.write_file(Path::new("door"), b"pwned").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(
            fs.create(Path::new("door")).err().unwrap().kind(),
            ErrorKind::PermissionDenied
        );
        assert!(!planted.exists());
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_inside_root_can_be_created_through() {
        use crate::FilesystemExt;

        let (dir, fs) = sandbox();
        let target = dir.path().join("target.txt");
        std::os::unix::fs::symlink(&target, dir.path().join("link")).unwrap();

        fs.write_file(Path::new("link"), b"kept").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"kept");
    }

    #[test]
    fn errors_report_caller_path() {
        let (_dir, fs) = sandbox();
        let err = fs.stat(Path::new("missing/file")).unwrap_err();
        assert_eq!(err.path(), Some(Path::new("missing/file")));
    }

    #[test]
    fn root_cannot_be_removed() {
        let (_dir, fs) = sandbox();
        let err = fs.remove(Path::new("")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn unrooted_uses_paths_verbatim() {
        let (dir, _fs) = sandbox();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"abc").unwrap();
        let fs = BasicFilesystem::unrooted();
        assert!(fs.root().is_none());
        assert_eq!(fs.stat(&file).unwrap().size(), 3);
    }

    #[test]
    fn open_rejects_directories() {
        let (_dir, fs) = sandbox();
        fs.mkdir(Path::new("d"), Permissions::default_dir()).unwrap();
        assert_eq!(
            fs.open(Path::new("d")).err().unwrap().kind(),
            ErrorKind::Io
        );
    }

    #[cfg(unix)]
    #[test]
    fn chmod_sets_mode_bits() {
        let (_dir, fs) = sandbox();
        fs.create(Path::new("f")).unwrap();
        fs.chmod(Path::new("f"), Permissions::from_mode(0o600))
            .unwrap();
        assert_eq!(fs.stat(Path::new("f")).unwrap().mode().mode(), 0o600);
        // Idempotent.
        fs.chmod(Path::new("f"), Permissions::from_mode(0o600))
            .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn chtimes_needs_no_read_permission() {
        let (_dir, fs) = sandbox();
        fs.create(Path::new("f")).unwrap();
        fs.chmod(Path::new("f"), Permissions::from_mode(0o200))
            .unwrap();

        let t = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        fs.chtimes(Path::new("f"), t, t).unwrap();
        assert_eq!(fs.stat(Path::new("f")).unwrap().mod_time(), t);
    }

    #[cfg(unix)]
    #[test]
    fn read_symlink_resolves_target_type() {
        let (_dir, fs) = sandbox();
        fs.mkdir(Path::new("d"), Permissions::default_dir()).unwrap();
        fs.create(Path::new("f")).unwrap();
        fs.create_symlink(Path::new("to_d"), Path::new("d"), LinkTargetType::Unknown)
            .unwrap();
        fs.create_symlink(Path::new("to_f"), Path::new("f"), LinkTargetType::Unknown)
            .unwrap();
        fs.create_symlink(Path::new("gone"), Path::new("nowhere"), LinkTargetType::File)
            .unwrap();

        assert_eq!(
            fs.read_symlink(Path::new("to_d")).unwrap().1,
            LinkTargetType::Directory
        );
        assert_eq!(
            fs.read_symlink(Path::new("to_f")).unwrap().1,
            LinkTargetType::File
        );
        assert_eq!(
            fs.read_symlink(Path::new("gone")).unwrap(),
            (PathBuf::from("nowhere"), LinkTargetType::Unknown)
        );
    }

    #[cfg(unix)]
    #[test]
    fn change_symlink_type_requires_a_symlink() {
        let (_dir, fs) = sandbox();
        fs.create(Path::new("f")).unwrap();
        assert_eq!(
            fs.change_symlink_type(Path::new("f"), LinkTargetType::File)
                .unwrap_err()
                .kind(),
            ErrorKind::Io
        );
        assert!(
            fs.change_symlink_type(Path::new("missing"), LinkTargetType::File)
                .unwrap_err()
                .is_not_found()
        );
    }
}
