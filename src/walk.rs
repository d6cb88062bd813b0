//! # Walk Engine
//!
//! One depth-first traversal shared by every backend. It only talks to the
//! [`Filesystem`] trait (`lstat` and `dir_names`), so a walk over the OS
//! backend and a walk over the in-memory backend visit the same tree the
//! same way.
//!
//! ## Protocol
//!
//! - `root` is visited first, then each directory's children in lexical
//!   order, parents before children.
//! - Each node gets exactly one callback. It receives `Ok(info)` or the error
//!   that prevented visiting the node: a failed `lstat`, or a failed
//!   `dir_names` for a directory.
//! - Symlinks are leaves; the engine never follows them.
//! - The callback steers the walk with [`WalkControl`], or aborts it by
//!   returning `Err`, which `walk` hands back unchanged.
//!
//! The traversal keeps an explicit stack of pending paths, so tree depth
//! never turns into call depth.
//!
//! ## Example
//!
//! ```rust
//! use portable_fs::{Filesystem, FsError, MemoryFilesystem, Permissions, WalkControl};
//! use std::path::Path;
//!
//! fn count_regular(fs: &dyn Filesystem) -> Result<usize, FsError> {
//!     let mut count = 0;
//!     fs.walk(Path::new("/"), &mut |_path, entry| {
//!         if entry?.is_regular() {
//!             count += 1;
//!         }
//!         Ok(WalkControl::Continue)
//!     })?;
//!     Ok(count)
//! }
//!
//! let fs = MemoryFilesystem::new();
//! fs.mkdir(Path::new("docs"), Permissions::default_dir()).unwrap();
//! fs.create(Path::new("docs/a.txt")).unwrap();
//! assert_eq!(count_regular(&fs).unwrap(), 1);
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::{FileInfo, Filesystem, FsError};

/// Callback invoked once per visited node.
///
/// The second argument is the node's metadata or the error that prevented
/// reading it.
pub type WalkFn<'a> = dyn FnMut(&Path, Result<FileInfo, FsError>) -> Result<WalkControl, FsError> + 'a;

/// What the walk should do after a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkControl {
    /// Keep going.
    Continue,
    /// Do not descend into this directory. Same as `Continue` for other nodes.
    SkipDir,
    /// Halt the entire walk now.
    Stop,
}

/// How a walk that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkOutcome {
    /// Every reachable node was visited.
    Completed,
    /// The callback returned [`WalkControl::Stop`].
    Stopped,
}

/// Walk `root` on `fs`, invoking `walk_fn` for every node.
///
/// Returns `Err` only when the callback returns one.
pub fn walk<F>(fs: &F, root: &Path, walk_fn: &mut WalkFn<'_>) -> Result<WalkOutcome, FsError>
where
    F: Filesystem + ?Sized,
{
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(path) = pending.pop() {
        let (entry, children) = match visit(fs, &path) {
            Ok((info, children)) => (Ok(info), children),
            Err(e) => (Err(e), Vec::new()),
        };
        trace!(path = %path.display(), ok = entry.is_ok(), "walk visit");

        match walk_fn(&path, entry) {
            Ok(WalkControl::Continue) => {
                pending.extend(children.iter().rev().map(|name| path.join(name)));
            }
            Ok(WalkControl::SkipDir) => {
                if !children.is_empty() {
                    trace!(path = %path.display(), "walk skipping subtree");
                }
            }
            Ok(WalkControl::Stop) => {
                debug!(path = %path.display(), "walk stopped by callback");
                return Ok(WalkOutcome::Stopped);
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "walk aborted by callback");
                return Err(e);
            }
        }
    }

    Ok(WalkOutcome::Completed)
}

/// Stat one node and, for directories, list its children in lexical order.
fn visit<F>(fs: &F, path: &Path) -> Result<(FileInfo, Vec<String>), FsError>
where
    F: Filesystem + ?Sized,
{
    let info = fs.lstat(path)?;
    if !info.is_dir() {
        return Ok((info, Vec::new()));
    }
    let mut names = fs.dir_names(path)?;
    names.sort_unstable();
    Ok((info, names))
}
