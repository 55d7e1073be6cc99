//! Checks that swapoff(2) deactivates an active swapfile and drops it from
//! /proc/swaps.

use std::path::Path;

use libltp::{lapi, tst_brk, tst_main, tst_res, TestCase};
use libltpswap as swap;

const SWAPFILE: &str = "swapfile01";

fn setup() {
    swap::is_swap_supported(Path::new("swapfile_probe"));
    let _ = swap::make_swapfile(Path::new(SWAPFILE), 65536, true);
}

fn cleanup() {
    let _ = lapi::swapoff(Path::new(SWAPFILE));
}

fn verify_swapoff() {
    let path = Path::new(SWAPFILE);

    if let Err(e) = lapi::swapon(path, 0) {
        tst_brk!(Brok, "swapon({:?}) failed: {}", path, e);
    }

    if libltp::exp_pass(lapi::swapoff(path), "swapoff(swapfile01)").is_none() {
        return;
    }

    if swap::swapfile_is_active(path) {
        tst_res!(Fail, "swapfile still active after swapoff");
    } else {
        tst_res!(Pass, "swapfile deactivated");
    }
}

static TEST: TestCase = TestCase {
    setup: Some(setup),
    cleanup: Some(cleanup),
    test_all: Some(verify_swapoff),
    needs_root: true,
    needs_tmpdir: true,
    ..TestCase::new()
};

tst_main!(TEST);
