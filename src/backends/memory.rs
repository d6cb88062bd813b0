//! In-memory backend.
//!
//! A complete fake filesystem for tests and for callers that want a scratch
//! tree with no disk I/O. Paths are confined to the fake's root: `..` can
//! never climb above it.
//!
//! Entries live in one ordered map keyed by their normalized path. File
//! contents hang off shared inodes, so an open handle keeps working after its
//! path is renamed or removed, as on a POSIX system.

use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Read};
use std::ops::Bound;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use tracing::{debug, trace};

use super::entry_name;
use crate::{
    File, FileInfo, FileType, Filesystem, FsError, LinkTargetType, Permissions, RenamePolicy,
};

/// Maximum number of symlinks followed while resolving one path.
const MAX_SYMLINK_DEPTH: usize = 40;

type Nodes = BTreeMap<String, Node>;

/// In-memory [`Filesystem`].
///
/// # Configuration
///
/// ```rust
/// use portable_fs::{Filesystem, MemoryFilesystem, RenamePolicy};
///
/// let fs = MemoryFilesystem::new()
///     .with_symlinks(false)
///     .with_rename_policy(RenamePolicy::FailIfExists)
///     .case_insensitive(true);
/// assert!(!fs.symlinks_supported());
/// assert_eq!(fs.rename_policy(), RenamePolicy::FailIfExists);
/// ```
pub struct MemoryFilesystem {
    nodes: RwLock<Nodes>,
    symlinks: bool,
    rename_policy: RenamePolicy,
    case_insensitive: bool,
}

struct Node {
    /// Final component as it was spelled at creation.
    name: String,
    inode: Arc<RwLock<Inode>>,
}

struct Inode {
    kind: InodeKind,
    mode: Permissions,
    modified: SystemTime,
}

enum InodeKind {
    File(Vec<u8>),
    Directory,
    Symlink {
        target: PathBuf,
        tt: LinkTargetType,
    },
}

/// One step of path resolution.
enum Step {
    Name(String),
    Parent,
}

impl Inode {
    fn new(kind: InodeKind, mode: Permissions) -> Self {
        Self {
            kind,
            mode,
            modified: SystemTime::now(),
        }
    }

    fn file_type(&self) -> FileType {
        match self.kind {
            InodeKind::File(_) => FileType::File,
            InodeKind::Directory => FileType::Directory,
            InodeKind::Symlink { .. } => FileType::Symlink,
        }
    }

    fn info(&self, name: String) -> FileInfo {
        let size = match &self.kind {
            InodeKind::File(data) => data.len() as u64,
            InodeKind::Directory => 0,
            InodeKind::Symlink { target, .. } => target.as_os_str().len() as u64,
        };
        FileInfo::new(name, self.file_type(), self.mode, size, self.modified)
    }
}

fn poisoned(path: &Path) -> FsError {
    FsError::io(
        "lock",
        path,
        io::ErrorKind::Other,
        "memory filesystem lock poisoned",
    )
}

fn read_inode<'a>(
    inode: &'a RwLock<Inode>,
    path: &Path,
) -> Result<RwLockReadGuard<'a, Inode>, FsError> {
    inode.read().map_err(|_| poisoned(path))
}

fn write_inode<'a>(
    inode: &'a RwLock<Inode>,
    path: &Path,
) -> Result<RwLockWriteGuard<'a, Inode>, FsError> {
    inode.write().map_err(|_| poisoned(path))
}

fn utf8_component(part: &std::ffi::OsStr, path: &Path) -> Result<String, FsError> {
    part.to_str().map(str::to_owned).ok_or_else(|| {
        FsError::io(
            "resolve",
            path,
            io::ErrorKind::InvalidInput,
            "path is not valid UTF-8",
        )
    })
}

/// Lexically normalize a caller-supplied path to components below the root.
fn split_input(name: &Path) -> Result<Vec<String>, FsError> {
    let mut parts = Vec::new();
    for component in name.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(FsError::PermissionDenied {
                        path: name.to_path_buf(),
                        operation: "resolve",
                    });
                }
            }
            Component::Normal(part) => parts.push(utf8_component(part, name)?),
        }
    }
    Ok(parts)
}

/// Symlink targets keep their `..` steps; they are applied during resolution.
fn split_target(target: &Path, name: &Path) -> Result<Vec<Step>, FsError> {
    let mut steps = Vec::new();
    for component in target.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => steps.push(Step::Parent),
            Component::Normal(part) => steps.push(Step::Name(utf8_component(part, name)?)),
        }
    }
    Ok(steps)
}

impl MemoryFilesystem {
    /// Create an empty filesystem containing only the root directory.
    ///
    /// Symlinks are supported, rename replaces, names are case-sensitive.
    pub fn new() -> Self {
        let mut nodes = Nodes::new();
        nodes.insert(
            String::new(),
            Node {
                name: String::new(),
                inode: Arc::new(RwLock::new(Inode::new(
                    InodeKind::Directory,
                    Permissions::default_dir(),
                ))),
            },
        );
        Self {
            nodes: RwLock::new(nodes),
            symlinks: true,
            rename_policy: RenamePolicy::Replace,
            case_insensitive: false,
        }
    }

    /// Enable or disable symlink support.
    pub fn with_symlinks(mut self, supported: bool) -> Self {
        self.symlinks = supported;
        self
    }

    /// Choose how `rename` treats an existing destination.
    pub fn with_rename_policy(mut self, policy: RenamePolicy) -> Self {
        self.rename_policy = policy;
        self
    }

    /// Compare names case-insensitively, preserving their original spelling.
    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    fn key(&self, parts: &[String]) -> String {
        let joined = parts.join("/");
        if self.case_insensitive {
            joined.to_lowercase()
        } else {
            joined
        }
    }

    fn read_nodes(&self, path: &Path) -> Result<RwLockReadGuard<'_, Nodes>, FsError> {
        self.nodes.read().map_err(|_| poisoned(path))
    }

    fn write_nodes(&self, path: &Path) -> Result<RwLockWriteGuard<'_, Nodes>, FsError> {
        self.nodes.write().map_err(|_| poisoned(path))
    }

    fn require_symlinks(&self, operation: &'static str) -> Result<(), FsError> {
        if self.symlinks {
            Ok(())
        } else {
            Err(FsError::Unsupported { operation })
        }
    }

    /// Resolve `name` to the components of the entry it designates.
    ///
    /// Symlinks in intermediate components are always followed; the final
    /// one only when `follow_final` is set. The final entry may be absent.
    fn resolve(
        &self,
        nodes: &Nodes,
        name: &Path,
        follow_final: bool,
    ) -> Result<Vec<String>, FsError> {
        let mut queue: VecDeque<Step> = split_input(name)?.into_iter().map(Step::Name).collect();
        let mut resolved: Vec<String> = Vec::new();
        let mut followed = 0;

        while let Some(step) = queue.pop_front() {
            let part = match step {
                Step::Parent => {
                    resolved.pop();
                    continue;
                }
                Step::Name(part) => part,
            };
            resolved.push(part);
            let last = queue.is_empty();

            let Some(node) = nodes.get(&self.key(&resolved)) else {
                if last {
                    break;
                }
                return Err(FsError::NotFound {
                    path: name.to_path_buf(),
                });
            };

            let link_target = {
                let inode = read_inode(&node.inode, name)?;
                match &inode.kind {
                    InodeKind::Symlink { target, .. } if !last || follow_final => {
                        Some(target.clone())
                    }
                    // ENOTDIR on the OS backend.
                    InodeKind::File(_) if !last => {
                        return Err(FsError::io(
                            "resolve",
                            name,
                            io::ErrorKind::NotADirectory,
                            "not a directory",
                        ));
                    }
                    _ => None,
                }
            };

            if let Some(target) = link_target {
                followed += 1;
                if followed > MAX_SYMLINK_DEPTH {
                    return Err(FsError::io(
                        "resolve",
                        name,
                        io::ErrorKind::Other,
                        "too many levels of symbolic links",
                    ));
                }
                resolved.pop();
                if target.has_root() {
                    resolved.clear();
                }
                for step in split_target(&target, name)?.into_iter().rev() {
                    queue.push_front(step);
                }
            }
        }

        Ok(resolved)
    }

    /// Resolve and fetch the inode of an existing entry.
    fn lookup(
        &self,
        nodes: &Nodes,
        name: &Path,
        follow_final: bool,
    ) -> Result<Arc<RwLock<Inode>>, FsError> {
        let parts = self.resolve(nodes, name, follow_final)?;
        nodes
            .get(&self.key(&parts))
            .map(|node| Arc::clone(&node.inode))
            .ok_or_else(|| FsError::NotFound {
                path: name.to_path_buf(),
            })
    }

    /// Keys of the immediate children of the directory stored under `key`.
    fn child_keys(nodes: &Nodes, key: &str) -> Vec<String> {
        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };
        nodes
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter(|(k, _)| !k.is_empty() && !k[prefix.len()..].contains('/'))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Keys of the entry stored under `key` and everything below it.
    fn subtree_keys(nodes: &Nodes, key: &str) -> Vec<String> {
        let prefix = format!("{key}/");
        nodes
            .range::<str, _>((Bound::Included(key), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(key))
            .filter(|(k, _)| *k == key || k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn file_type_of(node: &Node, path: &Path) -> Result<FileType, FsError> {
        Ok(read_inode(&node.inode, path)?.file_type())
    }

    fn insert(&self, nodes: &mut Nodes, parts: &[String], kind: InodeKind, mode: Permissions) {
        let name = parts.last().cloned().unwrap_or_default();
        nodes.insert(
            self.key(parts),
            Node {
                name,
                inode: Arc::new(RwLock::new(Inode::new(kind, mode))),
            },
        );
    }

    fn handle(
        name: &Path,
        inode: Arc<RwLock<Inode>>,
        writable: bool,
    ) -> Result<Box<dyn File>, FsError> {
        if read_inode(&inode, name)?.file_type() == FileType::Directory {
            return Err(FsError::io(
                if writable { "create" } else { "open" },
                name,
                io::ErrorKind::IsADirectory,
                "is a directory",
            ));
        }
        Ok(Box::new(MemoryFile {
            name: name.to_path_buf(),
            inode,
            cursor: 0,
            writable,
            closed: false,
        }))
    }
}

impl Default for MemoryFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryFilesystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFilesystem")
            .field("symlinks", &self.symlinks)
            .field("rename_policy", &self.rename_policy)
            .field("case_insensitive", &self.case_insensitive)
            .finish_non_exhaustive()
    }
}

impl Filesystem for MemoryFilesystem {
    fn stat(&self, name: &Path) -> Result<FileInfo, FsError> {
        trace!(path = %name.display(), "memory stat");
        let nodes = self.read_nodes(name)?;
        let inode = self.lookup(&nodes, name, true)?;
        let info = read_inode(&inode, name)?.info(entry_name(name));
        Ok(info)
    }

    fn lstat(&self, name: &Path) -> Result<FileInfo, FsError> {
        trace!(path = %name.display(), "memory lstat");
        let nodes = self.read_nodes(name)?;
        let inode = self.lookup(&nodes, name, false)?;
        let info = read_inode(&inode, name)?.info(entry_name(name));
        Ok(info)
    }

    fn open(&self, name: &Path) -> Result<Box<dyn File>, FsError> {
        trace!(path = %name.display(), "memory open");
        let nodes = self.read_nodes(name)?;
        let inode = self.lookup(&nodes, name, true)?;
        Self::handle(name, inode, false)
    }

    fn create(&self, name: &Path) -> Result<Box<dyn File>, FsError> {
        debug!(path = %name.display(), "memory create");
        let mut nodes = self.write_nodes(name)?;
        let parts = self.resolve(&nodes, name, true)?;
        let key = self.key(&parts);

        if let Some(node) = nodes.get(&key) {
            let inode = Arc::clone(&node.inode);
            {
                let mut guard = write_inode(&inode, name)?;
                if let InodeKind::File(data) = &mut guard.kind {
                    data.clear();
                    guard.modified = SystemTime::now();
                }
            }
            return Self::handle(name, inode, true);
        }

        self.insert(
            &mut nodes,
            &parts,
            InodeKind::File(Vec::new()),
            Permissions::default_file(),
        );
        let inode = nodes
            .get(&key)
            .map(|node| Arc::clone(&node.inode))
            .ok_or_else(|| FsError::NotFound {
                path: name.to_path_buf(),
            })?;
        Self::handle(name, inode, true)
    }

    fn mkdir(&self, name: &Path, perm: Permissions) -> Result<(), FsError> {
        debug!(path = %name.display(), mode = perm.mode(), "memory mkdir");
        let mut nodes = self.write_nodes(name)?;
        let parts = self.resolve(&nodes, name, false)?;
        if nodes.contains_key(&self.key(&parts)) {
            return Err(FsError::AlreadyExists {
                path: name.to_path_buf(),
                operation: "mkdir",
            });
        }
        self.insert(&mut nodes, &parts, InodeKind::Directory, perm);
        Ok(())
    }

    fn remove(&self, name: &Path) -> Result<(), FsError> {
        debug!(path = %name.display(), "memory remove");
        let mut nodes = self.write_nodes(name)?;
        let parts = self.resolve(&nodes, name, false)?;
        if parts.is_empty() {
            return Err(FsError::PermissionDenied {
                path: name.to_path_buf(),
                operation: "remove",
            });
        }
        let key = self.key(&parts);
        let Some(node) = nodes.get(&key) else {
            return Err(FsError::NotFound {
                path: name.to_path_buf(),
            });
        };
        if Self::file_type_of(node, name)? == FileType::Directory
            && !Self::child_keys(&nodes, &key).is_empty()
        {
            return Err(FsError::NotEmpty {
                path: name.to_path_buf(),
            });
        }
        nodes.remove(&key);
        Ok(())
    }

    fn rename(&self, old: &Path, new: &Path) -> Result<(), FsError> {
        debug!(from = %old.display(), to = %new.display(), "memory rename");
        let mut nodes = self.write_nodes(old)?;

        let from = self.resolve(&nodes, old, false)?;
        let to = self.resolve(&nodes, new, false)?;
        if from.is_empty() || to.is_empty() {
            return Err(FsError::PermissionDenied {
                path: if from.is_empty() { old } else { new }.to_path_buf(),
                operation: "rename",
            });
        }
        let from_key = self.key(&from);
        let to_key = self.key(&to);

        let Some(source) = nodes.get(&from_key) else {
            return Err(FsError::NotFound {
                path: old.to_path_buf(),
            });
        };
        let source_is_dir = Self::file_type_of(source, old)? == FileType::Directory;

        if from_key == to_key {
            // Same entry; only the spelling can change.
            if let (Some(node), Some(spelling)) = (nodes.get_mut(&to_key), to.last()) {
                node.name = spelling.clone();
            }
            return Ok(());
        }
        if source_is_dir && to_key.starts_with(&format!("{from_key}/")) {
            return Err(FsError::io(
                "rename",
                new,
                io::ErrorKind::InvalidInput,
                "cannot move a directory into itself",
            ));
        }

        if let Some(existing) = nodes.get(&to_key) {
            if self.rename_policy == RenamePolicy::FailIfExists {
                return Err(FsError::AlreadyExists {
                    path: new.to_path_buf(),
                    operation: "rename",
                });
            }
            let existing_is_dir = Self::file_type_of(existing, new)? == FileType::Directory;
            match (source_is_dir, existing_is_dir) {
                (true, true) if !Self::child_keys(&nodes, &to_key).is_empty() => {
                    return Err(FsError::NotEmpty {
                        path: new.to_path_buf(),
                    });
                }
                (false, true) => {
                    return Err(FsError::io(
                        "rename",
                        new,
                        io::ErrorKind::IsADirectory,
                        "is a directory",
                    ));
                }
                (true, false) => {
                    return Err(FsError::io(
                        "rename",
                        new,
                        io::ErrorKind::NotADirectory,
                        "not a directory",
                    ));
                }
                _ => {}
            }
            nodes.remove(&to_key);
        }

        for key in Self::subtree_keys(&nodes, &from_key) {
            if let Some(mut node) = nodes.remove(&key) {
                let moved_key = format!("{to_key}{}", &key[from_key.len()..]);
                if key == from_key {
                    node.name = to.last().cloned().unwrap_or_default();
                }
                nodes.insert(moved_key, node);
            }
        }
        Ok(())
    }

    fn chmod(&self, name: &Path, mode: Permissions) -> Result<(), FsError> {
        debug!(path = %name.display(), mode = mode.mode(), "memory chmod");
        let nodes = self.read_nodes(name)?;
        let inode = self.lookup(&nodes, name, true)?;
        write_inode(&inode, name)?.mode = mode;
        Ok(())
    }

    /// Access times are not tracked; only `mtime` is stored.
    fn chtimes(&self, name: &Path, _atime: SystemTime, mtime: SystemTime) -> Result<(), FsError> {
        debug!(path = %name.display(), "memory chtimes");
        let nodes = self.read_nodes(name)?;
        let inode = self.lookup(&nodes, name, true)?;
        write_inode(&inode, name)?.modified = mtime;
        Ok(())
    }

    fn dir_names(&self, name: &Path) -> Result<Vec<String>, FsError> {
        trace!(path = %name.display(), "memory dir_names");
        let nodes = self.read_nodes(name)?;
        let parts = self.resolve(&nodes, name, true)?;
        let key = self.key(&parts);
        let Some(node) = nodes.get(&key) else {
            return Err(FsError::NotFound {
                path: name.to_path_buf(),
            });
        };
        if Self::file_type_of(node, name)? != FileType::Directory {
            return Err(FsError::io(
                "dir_names",
                name,
                io::ErrorKind::NotADirectory,
                "not a directory",
            ));
        }
        Ok(Self::child_keys(&nodes, &key)
            .iter()
            .filter_map(|k| nodes.get(k).map(|child| child.name.clone()))
            .collect())
    }

    fn symlinks_supported(&self) -> bool {
        self.symlinks
    }

    fn create_symlink(
        &self,
        name: &Path,
        target: &Path,
        tt: LinkTargetType,
    ) -> Result<(), FsError> {
        self.require_symlinks("create_symlink")?;
        debug!(path = %name.display(), target = %target.display(), ?tt, "memory create_symlink");
        let mut nodes = self.write_nodes(name)?;
        let parts = self.resolve(&nodes, name, false)?;
        if nodes.contains_key(&self.key(&parts)) {
            return Err(FsError::AlreadyExists {
                path: name.to_path_buf(),
                operation: "create_symlink",
            });
        }
        self.insert(
            &mut nodes,
            &parts,
            InodeKind::Symlink {
                target: target.to_path_buf(),
                tt,
            },
            Permissions::from_mode(0o777),
        );
        Ok(())
    }

    fn read_symlink(&self, name: &Path) -> Result<(PathBuf, LinkTargetType), FsError> {
        self.require_symlinks("read_symlink")?;
        trace!(path = %name.display(), "memory read_symlink");
        let nodes = self.read_nodes(name)?;
        let inode = self.lookup(&nodes, name, false)?;
        let (target, tt) = match &read_inode(&inode, name)?.kind {
            InodeKind::Symlink { target, tt } => (target.clone(), *tt),
            _ => {
                return Err(FsError::io(
                    "read_symlink",
                    name,
                    io::ErrorKind::InvalidInput,
                    "not a symbolic link",
                ));
            }
        };
        // A dangling link reports Unknown whatever type it was created with.
        if self.lookup(&nodes, name, true).is_err() {
            return Ok((target, LinkTargetType::Unknown));
        }
        Ok((target, tt))
    }

    fn change_symlink_type(&self, name: &Path, tt: LinkTargetType) -> Result<(), FsError> {
        self.require_symlinks("change_symlink_type")?;
        debug!(path = %name.display(), ?tt, "memory change_symlink_type");
        let nodes = self.read_nodes(name)?;
        let inode = self.lookup(&nodes, name, false)?;
        let mut guard = write_inode(&inode, name)?;
        match &mut guard.kind {
            InodeKind::Symlink { tt: current, .. } => {
                *current = tt;
                Ok(())
            }
            _ => Err(FsError::io(
                "change_symlink_type",
                name,
                io::ErrorKind::InvalidInput,
                "not a symbolic link",
            )),
        }
    }

    fn rename_policy(&self) -> RenamePolicy {
        self.rename_policy
    }
}

/// Handle onto an in-memory file.
struct MemoryFile {
    name: PathBuf,
    inode: Arc<RwLock<Inode>>,
    cursor: u64,
    writable: bool,
    closed: bool,
}

impl MemoryFile {
    fn check_open(&self, operation: &'static str) -> Result<(), FsError> {
        if self.closed {
            return Err(FsError::io(
                operation,
                &self.name,
                io::ErrorKind::Other,
                "file already closed",
            ));
        }
        Ok(())
    }

    fn check_writable(&self, operation: &'static str) -> Result<(), FsError> {
        self.check_open(operation)?;
        if !self.writable {
            return Err(FsError::PermissionDenied {
                path: self.name.clone(),
                operation,
            });
        }
        Ok(())
    }

    fn to_len(&self, operation: &'static str, value: u64) -> Result<usize, FsError> {
        usize::try_from(value).map_err(|_| {
            FsError::io(
                operation,
                &self.name,
                io::ErrorKind::InvalidInput,
                "offset out of range",
            )
        })
    }
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_open("read")?;
        let n = {
            let inode = read_inode(&self.inode, &self.name)?;
            let InodeKind::File(data) = &inode.kind else {
                return Err(io::Error::new(io::ErrorKind::IsADirectory, "is a directory"));
            };
            let start = usize::try_from(self.cursor)
                .unwrap_or(usize::MAX)
                .min(data.len());
            let n = buf.len().min(data.len() - start);
            buf[..n].copy_from_slice(&data[start..start + n]);
            n
        };
        self.cursor += n as u64;
        Ok(n)
    }
}

impl File for MemoryFile {
    fn name(&self) -> &Path {
        &self.name
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize, FsError> {
        self.check_writable("write_at")?;
        let start = self.to_len("write_at", offset)?;
        let end = start.checked_add(buf.len()).ok_or_else(|| {
            FsError::io(
                "write_at",
                &self.name,
                io::ErrorKind::InvalidInput,
                "offset out of range",
            )
        })?;
        let mut inode = write_inode(&self.inode, &self.name)?;
        if let InodeKind::File(data) = &mut inode.kind {
            if data.len() < end {
                data.resize(end, 0);
            }
            data[start..end].copy_from_slice(buf);
        }
        inode.modified = SystemTime::now();
        Ok(buf.len())
    }

    fn truncate(&mut self, size: u64) -> Result<(), FsError> {
        self.check_writable("truncate")?;
        let size = self.to_len("truncate", size)?;
        let mut inode = write_inode(&self.inode, &self.name)?;
        if let InodeKind::File(data) = &mut inode.kind {
            data.resize(size, 0);
        }
        inode.modified = SystemTime::now();
        Ok(())
    }

    fn stat(&self) -> Result<FileInfo, FsError> {
        self.check_open("stat")?;
        Ok(read_inode(&self.inode, &self.name)?.info(entry_name(&self.name)))
    }

    fn close(&mut self) -> Result<(), FsError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn p(s: &str) -> &Path {
        Path::new(s)
    }

    #[test]
    fn root_is_a_directory() {
        let fs = MemoryFilesystem::new();
        assert!(fs.stat(p("")).unwrap().is_dir());
        assert!(fs.stat(p("/")).unwrap().is_dir());
        assert!(fs.stat(p(".")).unwrap().is_dir());
    }

    #[test]
    fn parent_dir_cannot_escape_root() {
        let fs = MemoryFilesystem::new();
        let err = fs.stat(p("../etc/passwd")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn absolute_and_relative_paths_agree() {
        let fs = MemoryFilesystem::new();
        fs.mkdir(p("/data"), Permissions::default_dir()).unwrap();
        fs.create(p("data/x")).unwrap();
        assert!(fs.lstat(p("/data/x")).unwrap().is_regular());
        assert!(fs.lstat(p("data/./x")).unwrap().is_regular());
    }

    #[test]
    fn intermediate_symlinks_are_followed() {
        let fs = MemoryFilesystem::new();
        fs.mkdir(p("real"), Permissions::default_dir()).unwrap();
        fs.create(p("real/f")).unwrap();
        fs.create_symlink(p("alias"), p("real"), LinkTargetType::Directory)
            .unwrap();
        assert!(fs.lstat(p("alias/f")).unwrap().is_regular());
        assert!(fs.lstat(p("alias")).unwrap().is_symlink());
        assert!(fs.stat(p("alias")).unwrap().is_dir());
    }

    #[test]
    fn absolute_symlink_targets_resolve_from_root() {
        let fs = MemoryFilesystem::new();
        fs.mkdir(p("a"), Permissions::default_dir()).unwrap();
        fs.create(p("target")).unwrap();
        fs.create_symlink(p("a/link"), p("/target"), LinkTargetType::File)
            .unwrap();
        assert!(fs.stat(p("a/link")).unwrap().is_regular());
    }

    #[test]
    fn symlink_loop_is_an_io_error() {
        let fs = MemoryFilesystem::new();
        fs.create_symlink(p("x"), p("y"), LinkTargetType::Unknown)
            .unwrap();
        fs.create_symlink(p("y"), p("x"), LinkTargetType::Unknown)
            .unwrap();
        assert_eq!(fs.stat(p("x")).unwrap_err().kind(), ErrorKind::Io);
        assert!(fs.lstat(p("x")).unwrap().is_symlink());
    }

    #[test]
    fn dangling_symlink_reads_as_unknown() {
        let fs = MemoryFilesystem::new();
        fs.create_symlink(p("dangling"), p("nowhere"), LinkTargetType::File)
            .unwrap();
        let (target, tt) = fs.read_symlink(p("dangling")).unwrap();
        assert_eq!(target, PathBuf::from("nowhere"));
        assert_eq!(tt, LinkTargetType::Unknown);
        assert!(fs.stat(p("dangling")).unwrap_err().is_not_found());
    }

    #[test]
    fn change_symlink_type_is_recorded() {
        let fs = MemoryFilesystem::new();
        fs.mkdir(p("d"), Permissions::default_dir()).unwrap();
        fs.create_symlink(p("l"), p("d"), LinkTargetType::File)
            .unwrap();
        fs.change_symlink_type(p("l"), LinkTargetType::Directory)
            .unwrap();
        assert_eq!(
            fs.read_symlink(p("l")).unwrap().1,
            LinkTargetType::Directory
        );
    }

    #[test]
    fn symlinks_can_be_disabled() {
        let fs = MemoryFilesystem::new().with_symlinks(false);
        let err = fs
            .create_symlink(p("l"), p("t"), LinkTargetType::File)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(
            fs.read_symlink(p("l")).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn case_insensitive_lookup_preserves_spelling() {
        let fs = MemoryFilesystem::new().case_insensitive(true);
        fs.mkdir(p("Photos"), Permissions::default_dir()).unwrap();
        assert!(fs.stat(p("photos")).unwrap().is_dir());
        assert_eq!(
            fs.mkdir(p("PHOTOS"), Permissions::default_dir())
                .unwrap_err()
                .kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(fs.dir_names(p("")).unwrap(), vec!["Photos".to_string()]);
    }

    #[test]
    fn case_only_rename_changes_spelling() {
        let fs = MemoryFilesystem::new().case_insensitive(true);
        fs.create(p("readme")).unwrap();
        fs.rename(p("readme"), p("README")).unwrap();
        assert_eq!(fs.dir_names(p("")).unwrap(), vec!["README".to_string()]);
    }

    #[test]
    fn case_sensitive_by_default() {
        let fs = MemoryFilesystem::new();
        fs.create(p("a")).unwrap();
        fs.create(p("A")).unwrap();
        let mut names = fs.dir_names(p("")).unwrap();
        names.sort();
        assert_eq!(names, vec!["A".to_string(), "a".to_string()]);
    }

    #[test]
    fn rename_moves_whole_subtree() {
        let fs = MemoryFilesystem::new();
        fs.mkdir(p("a"), Permissions::default_dir()).unwrap();
        fs.mkdir(p("a/b"), Permissions::default_dir()).unwrap();
        fs.create(p("a/b/c")).unwrap();
        fs.create(p("a-sibling")).unwrap();
        fs.rename(p("a"), p("z")).unwrap();
        assert!(fs.lstat(p("z/b/c")).unwrap().is_regular());
        assert!(fs.lstat(p("a")).unwrap_err().is_not_found());
        assert!(fs.lstat(p("a-sibling")).unwrap().is_regular());
    }

    #[test]
    fn rename_directory_into_itself_fails() {
        let fs = MemoryFilesystem::new();
        fs.mkdir(p("a"), Permissions::default_dir()).unwrap();
        let err = fs.rename(p("a"), p("a/inner")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(fs.stat(p("a")).unwrap().is_dir());
    }

    #[test]
    fn rename_fail_if_exists_policy() {
        let fs = MemoryFilesystem::new().with_rename_policy(RenamePolicy::FailIfExists);
        fs.create(p("a")).unwrap().write_at(b"aaa", 0).unwrap();
        fs.create(p("b")).unwrap().write_at(b"b", 0).unwrap();
        let err = fs.rename(p("a"), p("b")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(fs.stat(p("a")).unwrap().size(), 3);
        assert_eq!(fs.stat(p("b")).unwrap().size(), 1);
    }

    #[test]
    fn open_handle_survives_rename() {
        let fs = MemoryFilesystem::new();
        let mut file = fs.create(p("before")).unwrap();
        fs.rename(p("before"), p("after")).unwrap();
        file.write_at(b"still here", 0).unwrap();
        assert_eq!(fs.stat(p("after")).unwrap().size(), 10);
    }

    #[test]
    fn open_is_read_only() {
        let fs = MemoryFilesystem::new();
        fs.create(p("f")).unwrap();
        let mut file = fs.open(p("f")).unwrap();
        assert_eq!(
            file.write_at(b"x", 0).unwrap_err().kind(),
            ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn opening_a_directory_fails() {
        let fs = MemoryFilesystem::new();
        fs.mkdir(p("d"), Permissions::default_dir()).unwrap();
        assert_eq!(fs.open(p("d")).err().unwrap().kind(), ErrorKind::Io);
        assert_eq!(fs.create(p("d")).err().unwrap().kind(), ErrorKind::Io);
    }

    #[test]
    fn closed_handle_rejects_io_but_close_is_idempotent() {
        let fs = MemoryFilesystem::new();
        let mut file = fs.create(p("f")).unwrap();
        file.close().unwrap();
        file.close().unwrap();
        assert_eq!(file.write_at(b"x", 0).unwrap_err().kind(), ErrorKind::Io);
        let mut buf = [0u8; 4];
        assert!(file.read(&mut buf).is_err());
    }

    #[test]
    fn removing_root_is_denied() {
        let fs = MemoryFilesystem::new();
        assert_eq!(
            fs.remove(p("/")).unwrap_err().kind(),
            ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn dir_names_of_file_fails() {
        let fs = MemoryFilesystem::new();
        fs.create(p("f")).unwrap();
        assert_eq!(fs.dir_names(p("f")).unwrap_err().kind(), ErrorKind::Io);
    }

    #[test]
    fn file_as_directory_component_is_io() {
        let fs = MemoryFilesystem::new();
        fs.create(p("f")).unwrap();
        let err = fs.stat(p("f/x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(matches!(
            err,
            FsError::Io { ref source, .. } if source.kind() == io::ErrorKind::NotADirectory
        ));
        assert_eq!(
            fs.mkdir(p("f/x"), Permissions::default_dir())
                .unwrap_err()
                .kind(),
            ErrorKind::Io
        );
    }

    #[test]
    fn chtimes_sets_modification_time() {
        let fs = MemoryFilesystem::new();
        fs.create(p("f")).unwrap();
        let t = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(86_400);
        fs.chtimes(p("f"), t, t).unwrap();
        assert_eq!(fs.stat(p("f")).unwrap().mod_time(), t);
    }
}
