//! Checks that swapoff(2) reports EINVAL for a file that is not an active
//! swap area and ENOENT for a path that does not exist.

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
        path: "notaswap",
        exp: Errno::EINVAL,
        desc: "swapoff() on a file that is not a swap area",
    },
    Case {
        path: "nonexistent",
        exp: Errno::ENOENT,
        desc: "swapoff() on a nonexistent path",
    },
];

fn setup() {
    let fd = safe::open(Path::new("notaswap"), libc::O_CREAT | libc::O_WRONLY, 0o600);
    safe::write_all(fd, &[0u8; 4096]);
    safe::close(fd);
}

fn verify_swapoff(i: usize) {
    let case = &CASES[i];
    libltp::exp_fail(lapi::swapoff(Path::new(case.path)), case.exp, case.desc);
}

static TEST: TestCase = TestCase {
    setup: Some(setup),
    test: Some(verify_swapoff),
    tcnt: 2,
    needs_root: true,
    needs_tmpdir: true,
    ..TestCase::new()
};

tst_main!(TEST);
