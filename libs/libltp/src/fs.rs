//! Filesystem classification
//!
//! Swap tests must skip on filesystems that cannot back a swapfile, so the
//! harness exposes a small statfs-magic classifier for the test's working
//! directory.

use std::path::Path;

use nix::sys::statfs::{self, FsType};

/// Filesystems the tests care to distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsKind {
    Tmpfs,
    Ramfs,
    Nfs,
    Overlayfs,
    Other,
}

impl FsKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FsKind::Tmpfs => "tmpfs",
            FsKind::Ramfs => "ramfs",
            FsKind::Nfs => "nfs",
            FsKind::Overlayfs => "overlayfs",
            FsKind::Other => "other",
        }
    }

    /// Whether a swapfile can live on this filesystem.
    pub fn supports_swap(self) -> bool {
        !matches!(self, FsKind::Tmpfs | FsKind::Ramfs | FsKind::Nfs | FsKind::Overlayfs)
    }
}

// linux/magic.h; libc carries no RAMFS_MAGIC to wrap.
const RAMFS_MAGIC: FsType = FsType(0x8584_58f6);

fn classify(fs_type: FsType) -> FsKind {
    match fs_type {
        statfs::TMPFS_MAGIC => FsKind::Tmpfs,
        RAMFS_MAGIC => FsKind::Ramfs,
        statfs::NFS_SUPER_MAGIC => FsKind::Nfs,
        statfs::OVERLAYFS_SUPER_MAGIC => FsKind::Overlayfs,
        _ => FsKind::Other,
    }
}

/// Classify the filesystem holding `path`. Unstatable paths count as Other.
pub fn fs_kind(path: &Path) -> FsKind {
    match statfs::statfs(path) {
        Ok(st) => classify(st.filesystem_type()),
        Err(_) => FsKind::Other,
    }
}

/// Classify the current working directory's filesystem.
pub fn cwd_fs_kind() -> FsKind {
    fs_kind(Path::new("."))
}
