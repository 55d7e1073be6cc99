//! Fills every free swap slot of the running kernel with a fresh swapfile,
//! then checks that one more swapon(2) fails with EPERM. The number of
//! usable slots depends on the kernel version; the helper accounts for the
//! reserved swap types.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use libltp::{lapi, tst_brk, tst_main, tst_res, TestCase};
use libltpswap as swap;
use nix::errno::Errno;

const BLOCKS: u64 = 1024;

static ACTIVATED: AtomicUsize = AtomicUsize::new(0);

fn swapfile(i: usize) -> PathBuf {
    PathBuf::from(format!("swapfile{:02}", i))
}

fn setup() {
    swap::is_swap_supported(Path::new("swapfile_probe"));
}

fn cleanup() {
    for i in 0..ACTIVATED.load(Ordering::Relaxed) {
        let _ = lapi::swapoff(&swapfile(i));
    }
    ACTIVATED.store(0, Ordering::Relaxed);
}

fn verify_swapon() {
    let max = swap::max_swapfiles() as usize;
    let active = swap::active_swapfiles();
    if active >= max {
        tst_brk!(Conf, "{} of {} swap slots already in use", active, max);
    }
    let free_slots = max - active;

    for i in 0..free_slots {
        let path = swapfile(i);
        let _ = swap::make_swapfile(&path, BLOCKS, true);
        if let Err(e) = lapi::swapon(&path, 0) {
            tst_brk!(Brok, "swapon({:?}) failed on slot {}: {}", path, i, e);
        }
        ACTIVATED.store(i + 1, Ordering::Relaxed);
    }
    tst_res!(Pass, "created and activated {} swapfiles", free_slots);

    let extra = Path::new("swapfile_extra");
    let _ = swap::make_swapfile(extra, BLOCKS, true);
    libltp::exp_fail(
        lapi::swapon(extra, 0),
        Errno::EPERM,
        "swapon() with all swap slots in use",
    );

    for i in 0..free_slots {
        let path = swapfile(i);
        if let Err(e) = lapi::swapoff(&path) {
            tst_brk!(Brok, "swapoff({:?}) failed: {}", path, e);
        }
    }
    ACTIVATED.store(0, Ordering::Relaxed);
    tst_res!(Pass, "deactivated all {} swapfiles", free_slots);
}

static TEST: TestCase = TestCase {
    setup: Some(setup),
    cleanup: Some(cleanup),
    test_all: Some(verify_swapon),
    needs_root: true,
    needs_tmpdir: true,
    timeout: 600,
    ..TestCase::new()
};

tst_main!(TEST);
