//! libltpswap - swapfile helpers for the swap tests
//!
//! Creation and sizing of swapfiles (fallocate with a write fallback, then
//! mkswap), a FIEMAP-based contiguity check, probing whether the working
//! directory's filesystem supports swapfiles at all, and the kernel-version
//! dependent count of usable swap slots.

pub mod fiemap;

use std::fs::OpenOptions;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::process::Command;

use nix::errno::Errno;
use thiserror::Error;
use tracing::debug;

use libltp::kver::{self, KernelVersion};
use libltp::{fs as ltpfs, tst_brk, tst_res};

/// Hard kernel limit on swap entries; usable slots are fewer on newer
/// kernels, see [`max_swapfiles`].
pub const MAX_SWAPFILES: u32 = 32;

/// Swapfile block size used by the sizing helpers (mkswap's unit).
pub const BLOCK_KIB: u64 = 1024;

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("creating swapfile: {0}")]
    Create(#[from] std::io::Error),

    #[error("preallocating swapfile: {0}")]
    Prealloc(Errno),

    #[error("not enough free space for a {0} KiB swapfile")]
    NoSpace(u64),

    #[error("mkswap failed: {0}")]
    Mkswap(String),

    #[error("FIEMAP ioctl: {0}")]
    Fiemap(Errno),
}

/// Number of swapfiles the running kernel lets us activate.
///
/// The kernel reserves swap-type slots for non-swap uses as features were
/// added; each reservation shrinks the usable count below 32.
pub fn max_swapfiles() -> u32 {
    max_swapfiles_for(kver::running().unwrap_or(KernelVersion::new(2, 6, 0)))
}

fn max_swapfiles_for(kver: KernelVersion) -> u32 {
    let mut reserved = 0;

    // SWP_MIGRATION_READ/WRITE
    if kver >= KernelVersion::new(2, 6, 16) {
        reserved += 2;
    }
    // SWP_HWPOISON
    if kver >= KernelVersion::new(2, 6, 32) {
        reserved += 1;
    }
    // SWP_DEVICE_*
    if kver >= KernelVersion::new(5, 14, 0) {
        reserved += 4;
    } else if kver >= KernelVersion::new(4, 14, 0) {
        reserved += 2;
    }
    // SWP_PTE_MARKER
    if kver >= KernelVersion::new(5, 19, 0) {
        reserved += 1;
    }

    MAX_SWAPFILES - reserved
}

/// Count the entries in /proc/swaps, excluding the header line.
pub fn active_swapfiles() -> usize {
    let swaps = libltp::safe::read_to_string(Path::new("/proc/swaps"));
    swaps.lines().count().saturating_sub(1)
}

/// Whether /proc/swaps currently lists `path`.
pub fn swapfile_is_active(path: &Path) -> bool {
    let canon = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    let swaps = libltp::safe::read_to_string(Path::new("/proc/swaps"));
    swaps
        .lines()
        .skip(1)
        .any(|line| line.split_whitespace().next() == canon.to_str())
}

fn has_free_blocks(path: &Path, blocks: u64) -> bool {
    let dir = path.parent().unwrap_or(Path::new("."));
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    match nix::sys::statvfs::statvfs(dir) {
        Ok(st) => {
            let free = st.blocks_available() as u64 * st.fragment_size() as u64;
            free >= blocks * BLOCK_KIB
        }
        Err(_) => false,
    }
}

fn prealloc(file: &std::fs::File, bytes: u64) -> Result<(), Errno> {
    let ret = unsafe { libc::fallocate(file.as_raw_fd(), 0, 0, bytes as libc::off_t) };
    match Errno::result(ret) {
        Ok(_) => Ok(()),
        // Filesystems without fallocate get the pages written instead.
        Err(Errno::EOPNOTSUPP) | Err(Errno::ENOSYS) => fill(file, bytes),
        Err(e) => Err(e),
    }
}

fn fill(file: &std::fs::File, bytes: u64) -> Result<(), Errno> {
    use std::io::Write;
    let zeros = [0u8; 4096];
    let mut left = bytes as usize;
    let mut f = file;
    while left > 0 {
        let n = left.min(zeros.len());
        f.write_all(&zeros[..n]).map_err(|e| {
            e.raw_os_error().map(Errno::from_raw).unwrap_or(Errno::EIO)
        })?;
        left -= n;
    }
    Ok(())
}

/// Create a swapfile of `blocks` KiB at `path` and run mkswap on it.
///
/// With `safe` set, any failure breaks the test (TBROK, or TCONF when the
/// filesystem simply is too small).
pub fn make_swapfile(path: &Path, blocks: u64, safe: bool) -> Result<(), SwapError> {
    let res = try_make_swapfile(path, blocks);

    if safe {
        match res {
            Ok(()) => Ok(()),
            Err(SwapError::NoSpace(blocks)) => {
                tst_brk!(Conf, "Not enough free space for a {} KiB swapfile", blocks);
            }
            Err(e) => {
                tst_brk!(Brok, "Failed to create swapfile {:?}: {}", path, e);
            }
        }
    } else {
        res
    }
}

fn try_make_swapfile(path: &Path, blocks: u64) -> Result<(), SwapError> {
    if !has_free_blocks(path, blocks) {
        return Err(SwapError::NoSpace(blocks));
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;

    prealloc(&file, blocks * BLOCK_KIB).map_err(SwapError::Prealloc)?;
    drop(file);

    debug!("mkswap {:?} ({} KiB)", path, blocks);
    let output = Command::new("mkswap").arg(path).output()?;
    if !output.status.success() {
        return Err(SwapError::Mkswap(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    Ok(())
}

/// Probe whether the filesystem under `path` can host an active swapfile.
///
/// Breaks the test with TCONF on filesystems that cannot (tmpfs, nfs, ...)
/// and TBROK when the probe fails for an unexpected reason. On success the
/// probe swapfile is deactivated again.
pub fn is_swap_supported(path: &Path) {
    let kind = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => ltpfs::fs_kind(dir),
        _ => ltpfs::cwd_fs_kind(),
    };

    if let Err(e) = make_swapfile(path, 1024, false) {
        if !kind.supports_swap() {
            tst_brk!(Conf, "mkswap on {} not supported: {}", kind.as_str(), e);
        }
        tst_brk!(Brok, "mkswap on {:?} failed: {}", path, e);
    }

    match libltp::lapi::swapon(path, 0) {
        Err(Errno::EPERM) | Err(Errno::EINVAL) if !kind.supports_swap() => {
            tst_brk!(Conf, "Swapfile on {} not implemented", kind.as_str());
        }
        Err(e) => {
            tst_brk!(Brok, "swapon({:?}) failed unexpectedly: {}", path, e);
        }
        Ok(()) => {}
    }

    if let Err(e) = libltp::lapi::swapoff(path) {
        tst_brk!(Brok, "swapoff({:?}) failed: {}", path, e);
    }

    tst_res!(Info, "swapfiles on {} work", kind.as_str());
}

/// FIEMAP-based check that `path` occupies one physical extent.
pub fn file_is_contiguous(path: &Path) -> Result<bool, SwapError> {
    let file = std::fs::File::open(path)?;
    fiemap::file_is_contiguous(&file).map_err(SwapError::Fiemap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_swapfiles_gates() {
        // Pre-migration kernels get all 32 slots.
        assert_eq!(max_swapfiles_for(KernelVersion::new(2, 6, 0)), 32);
        // Migration entries.
        assert_eq!(max_swapfiles_for(KernelVersion::new(2, 6, 16)), 30);
        // + hwpoison.
        assert_eq!(max_swapfiles_for(KernelVersion::new(2, 6, 32)), 29);
        // + device private.
        assert_eq!(max_swapfiles_for(KernelVersion::new(4, 14, 0)), 27);
        // Device slots doubled.
        assert_eq!(max_swapfiles_for(KernelVersion::new(5, 14, 0)), 25);
        // + pte marker.
        assert_eq!(max_swapfiles_for(KernelVersion::new(5, 19, 0)), 24);
        assert_eq!(max_swapfiles_for(KernelVersion::new(6, 1, 0)), 24);
    }

    #[test]
    fn proc_swaps_is_readable() {
        // Header-only /proc/swaps means zero active files, never underflow.
        assert!(active_swapfiles() < 1000);
    }
}
