//! Checks that swapon(2) succeeds on a freshly made swapfile, that the file
//! then shows up in /proc/swaps, and that swapoff(2) removes it again.

use std::path::Path;

use libltp::{lapi, tst_main, tst_res, TestCase};
use libltpswap as swap;

const SWAPFILE: &str = "swapfile01";
const BLOCKS: u64 = 65536;

fn setup() {
    swap::is_swap_supported(Path::new("swapfile_probe"));
    let _ = swap::make_swapfile(Path::new(SWAPFILE), BLOCKS, true);
}

fn cleanup() {
    let _ = lapi::swapoff(Path::new(SWAPFILE));
}

fn verify_swapon() {
    let path = Path::new(SWAPFILE);

    if libltp::exp_pass(lapi::swapon(path, 0), "swapon(swapfile01, 0)").is_none() {
        return;
    }

    if swap::swapfile_is_active(path) {
        tst_res!(Pass, "swapfile listed in /proc/swaps");
    } else {
        tst_res!(Fail, "swapfile missing from /proc/swaps");
    }

    if libltp::exp_pass(lapi::swapoff(path), "swapoff(swapfile01)").is_none() {
        return;
    }

    if swap::swapfile_is_active(path) {
        tst_res!(Fail, "swapfile still listed in /proc/swaps after swapoff");
    } else {
        tst_res!(Pass, "swapfile removed from /proc/swaps");
    }
}

static TEST: TestCase = TestCase {
    setup: Some(setup),
    cleanup: Some(cleanup),
    test_all: Some(verify_swapon),
    needs_root: true,
    needs_tmpdir: true,
    ..TestCase::new()
};

tst_main!(TEST);
