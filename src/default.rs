//! Process-wide default filesystem.
//!
//! Code that cannot have a filesystem injected can fall back to
//! [`default_filesystem`]. The instance is an unrooted [`BasicFilesystem`]
//! created on first use and kept for the life of the process.
//!
//! ```rust
//! use portable_fs::{default_filesystem, Filesystem};
//!
//! let fs = default_filesystem();
//! assert_eq!(fs.symlinks_supported(), cfg!(unix));
//! ```

use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::{BasicFilesystem, Filesystem};

static DEFAULT: OnceLock<Arc<dyn Filesystem>> = OnceLock::new();

/// The shared default instance, creating it on first call.
///
/// Concurrent first calls all observe the same instance.
pub fn default_filesystem() -> Arc<dyn Filesystem> {
    DEFAULT
        .get_or_init(|| {
            debug!("initializing default filesystem");
            Arc::new(BasicFilesystem::unrooted())
        })
        .clone()
}

/// Install `fs` as the default instance.
///
/// Only possible before anything has called [`default_filesystem`] (or a
/// previous `set_default_filesystem` succeeded). Otherwise the instance is
/// handed back unchanged.
pub fn set_default_filesystem(fs: Arc<dyn Filesystem>) -> Result<(), Arc<dyn Filesystem>> {
    DEFAULT.set(fs)
}
