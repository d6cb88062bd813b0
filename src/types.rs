//! Core value types for the portable filesystem contract.

use std::time::SystemTime;

/// Kind of a filesystem entry.
///
/// A path that exists is exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

/// What a symbolic link points to.
///
/// `Unknown` covers both "cannot determine" and "target does not exist".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkTargetType {
    /// The link points to a regular file.
    File,
    /// The link points to a directory.
    Directory,
    /// The target could not be resolved.
    #[default]
    Unknown,
}

impl From<FileType> for LinkTargetType {
    fn from(file_type: FileType) -> Self {
        match file_type {
            FileType::File => LinkTargetType::File,
            FileType::Directory => LinkTargetType::Directory,
            FileType::Symlink => LinkTargetType::Unknown,
        }
    }
}

/// How a backend treats `rename(old, new)` when `new` already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenamePolicy {
    /// `new` is atomically replaced.
    #[default]
    Replace,
    /// The rename fails with `AlreadyExists`; both entries are left intact.
    FailIfExists,
}

/// Unix-style permissions stored as a mode bitmask.
///
/// Uses the standard Unix permission bits (rwxrwxrwx) plus setuid, setgid
/// and sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permissions(u32);

impl Permissions {
    /// Create permissions from a Unix mode (e.g., 0o755).
    #[inline]
    pub const fn from_mode(mode: u32) -> Self {
        Self(mode & 0o7777)
    }

    /// Get the raw mode value.
    #[inline]
    pub const fn mode(&self) -> u32 {
        self.0
    }

    /// Returns `true` if these permissions deny writing.
    #[inline]
    pub const fn readonly(&self) -> bool {
        (self.0 & 0o222) == 0
    }

    /// Default permissions for a new file (0o644 = rw-r--r--).
    #[inline]
    pub const fn default_file() -> Self {
        Self(0o644)
    }

    /// Default permissions for a new directory (0o755 = rwxr-xr-x).
    #[inline]
    pub const fn default_dir() -> Self {
        Self(0o755)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::default_file()
    }
}

/// A snapshot of a path's metadata.
///
/// `FileInfo` is a value: it does not observe later changes to the path it
/// was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileInfo {
    name: String,
    file_type: FileType,
    mode: Permissions,
    size: u64,
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    modified: SystemTime,
}

impl FileInfo {
    /// Build a snapshot. Backends call this; callers normally receive one.
    pub fn new(
        name: impl Into<String>,
        file_type: FileType,
        mode: Permissions,
        size: u64,
        modified: SystemTime,
    ) -> Self {
        Self {
            name: name.into(),
            file_type,
            mode,
            size,
            modified,
        }
    }

    /// Final path component this snapshot was taken for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry kind.
    #[inline]
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Permission bits.
    #[inline]
    pub fn mode(&self) -> Permissions {
        self.mode
    }

    /// Size in bytes. Backend-defined for directories and symlinks.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last modification time.
    #[inline]
    pub fn mod_time(&self) -> SystemTime {
        self.modified
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_regular(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Returns `true` if this is a symbolic link.
    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Symlink
    }
}

/// Serde support for SystemTime (when serde feature is enabled).
#[cfg(feature = "serde")]
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (duration.as_secs(), duration.subsec_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos): (u64, u32) = Deserialize::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(file_type: FileType) -> FileInfo {
        FileInfo::new(
            "entry",
            file_type,
            Permissions::default_file(),
            0,
            SystemTime::UNIX_EPOCH,
        )
    }

    #[test]
    fn predicates_partition_kinds() {
        for file_type in [FileType::File, FileType::Directory, FileType::Symlink] {
            let i = info(file_type);
            let flags = [i.is_regular(), i.is_dir(), i.is_symlink()];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1, "{file_type:?}");
        }
    }

    #[test]
    fn file_info_accessors() {
        let i = FileInfo::new(
            "notes.txt",
            FileType::File,
            Permissions::from_mode(0o600),
            42,
            SystemTime::UNIX_EPOCH,
        );
        assert_eq!(i.name(), "notes.txt");
        assert_eq!(i.size(), 42);
        assert_eq!(i.mode().mode(), 0o600);
        assert_eq!(i.mod_time(), SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn link_target_type_defaults_to_unknown() {
        assert_eq!(LinkTargetType::default(), LinkTargetType::Unknown);
    }

    #[test]
    fn link_target_type_from_file_type() {
        assert_eq!(LinkTargetType::from(FileType::File), LinkTargetType::File);
        assert_eq!(
            LinkTargetType::from(FileType::Directory),
            LinkTargetType::Directory
        );
        assert_eq!(
            LinkTargetType::from(FileType::Symlink),
            LinkTargetType::Unknown
        );
    }

    #[test]
    fn permissions_from_mode_masks_extra_bits() {
        let p = Permissions::from_mode(0o100755);
        assert_eq!(p.mode(), 0o755);
    }

    #[test]
    fn permissions_readonly() {
        assert!(Permissions::from_mode(0o444).readonly());
        assert!(!Permissions::from_mode(0o644).readonly());
    }

    #[test]
    fn permissions_defaults() {
        assert_eq!(Permissions::default_file().mode(), 0o644);
        assert_eq!(Permissions::default_dir().mode(), 0o755);
    }

    #[test]
    fn rename_policy_defaults_to_replace() {
        assert_eq!(RenamePolicy::default(), RenamePolicy::Replace);
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileType>();
        assert_send_sync::<FileInfo>();
        assert_send_sync::<Permissions>();
        assert_send_sync::<LinkTargetType>();
        assert_send_sync::<RenamePolicy>();
    }

    #[cfg(feature = "serde")]
    #[test]
    fn file_info_serde_keeps_time() {
        use std::time::Duration;
        let i = FileInfo::new(
            "a",
            FileType::Directory,
            Permissions::default_dir(),
            0,
            SystemTime::UNIX_EPOCH + Duration::new(1_700_000_000, 5),
        );
        let json = serde_json::to_string(&i).unwrap();
        let back: FileInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, i);
    }
}
