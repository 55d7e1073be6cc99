//! Checks that swapon(2) reports the documented errnos: ENOENT for a path
//! that does not exist and EINVAL for a file carrying no swap signature.

use std::path::Path;

use libltp::{lapi, safe, tst_main, TestCase};
use nix::errno::Errno;

struct Case {
    path: &'static str,
    exp: Errno,
    desc: &'static str,
}

static CASES: &[Case] = &[
    Case {
        path: "nonexistent",
        exp: Errno::ENOENT,
        desc: "swapon() on a nonexistent path",
    },
    Case {
        path: "notswap",
        exp: Errno::EINVAL,
        desc: "swapon() on a file without a swap signature",
    },
];

fn setup() {
    let fd = safe::open(Path::new("notswap"), libc::O_CREAT | libc::O_WRONLY, 0o600);
    safe::write_all(fd, &[0u8; 4096]);
    safe::close(fd);
}

fn verify_swapon(i: usize) {
    let case = &CASES[i];
    libltp::exp_fail(lapi::swapon(Path::new(case.path), 0), case.exp, case.desc);
}

static TEST: TestCase = TestCase {
    setup: Some(setup),
    test: Some(verify_swapon),
    tcnt: 2,
    needs_root: true,
    needs_tmpdir: true,
    ..TestCase::new()
};

tst_main!(TEST);
