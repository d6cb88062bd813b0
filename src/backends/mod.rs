//! Concrete [`Filesystem`](crate::Filesystem) backends.
//!
//! | Backend | Storage | Symlinks | Rename over existing |
//! |---------|---------|----------|----------------------|
//! | [`BasicFilesystem`] | The OS filesystem, optionally confined to a root | Unix only | Replace |
//! | [`MemoryFilesystem`] | Process memory | Configurable | Configurable |

mod basic;
mod memory;

use std::path::Path;

pub use basic::BasicFilesystem;
pub use memory::MemoryFilesystem;

/// Final component of `name`, or an empty string for the root.
pub(crate) fn entry_name(name: &Path) -> String {
    name.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
