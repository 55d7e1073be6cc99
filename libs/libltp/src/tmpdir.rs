//! Private per-test temporary directory
//!
//! Created under `$TMPDIR` (default `/tmp`) with mkdtemp, chdir'd into for
//! the test's lifetime and removed on exit. Setting `LTP_KEEP_TMPDIR` keeps
//! it around for post-mortem inspection.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::{tst_brk, tst_res};

static TMPDIR: OnceCell<PathBuf> = OnceCell::new();

/// The test's tmpdir, if one was created.
pub fn path() -> Option<&'static Path> {
    TMPDIR.get().map(|p| p.as_path())
}

pub fn created() -> bool {
    TMPDIR.get().is_some()
}

/// Create the tmpdir and chdir into it.
pub fn create(tid: &str) {
    if created() {
        return;
    }

    let base = std::env::var_os("TMPDIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));

    let template = base.join(format!("LTP_{}_XXXXXX", tid));
    let dir = match nix::unistd::mkdtemp(&template) {
        Ok(d) => d,
        Err(e) => {
            tst_brk!(Brok, "mkdtemp({:?}) failed: {}", template, e);
        }
    };

    debug!("tmpdir {:?}", dir);
    crate::safe::chdir(&dir);
    let _ = TMPDIR.set(dir);
}

/// Remove the tmpdir, honoring `LTP_KEEP_TMPDIR`.
pub(crate) fn remove() {
    let dir = match TMPDIR.get() {
        Some(d) => d,
        None => return,
    };

    if std::env::var_os("LTP_KEEP_TMPDIR").is_some() {
        tst_res!(Info, "leaving tmpdir {:?} behind", dir);
        return;
    }

    // Get out of the directory before deleting it.
    let _ = std::env::set_current_dir("/");
    if let Err(e) = std::fs::remove_dir_all(dir) {
        tst_res!(Warn, "removing tmpdir {:?} failed: {}", dir, e);
    }
}
