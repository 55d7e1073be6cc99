//! Checks that getrandom(2) rejects invalid flags with EINVAL.

use libltp::{lapi, tst_main, TestCase};
use nix::errno::Errno;

fn verify_getrandom() {
    let mut buf = [0u8; 64];
    libltp::exp_fail(
        lapi::getrandom(&mut buf, !0),
        Errno::EINVAL,
        "getrandom() with invalid flags",
    );
}

static TEST: TestCase = TestCase {
    test_all: Some(verify_getrandom),
    min_kver: Some("3.17"),
    ..TestCase::new()
};

tst_main!(TEST);
