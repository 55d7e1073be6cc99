//! Checks that rmdir(2) reports the documented errnos: ENOENT, ENOTDIR,
//! ENOTEMPTY and EINVAL for ".".

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use libltp::{safe, tst_main, TestCase};
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
        desc: "rmdir() on a nonexistent path",
    },
    Case {
        path: "file/dir",
        exp: Errno::ENOTDIR,
        desc: "rmdir() with a file in the path prefix",
    },
    Case {
        path: "nonempty",
        exp: Errno::ENOTEMPTY,
        desc: "rmdir() on a non-empty directory",
    },
    Case {
        path: ".",
        exp: Errno::EINVAL,
        desc: "rmdir(\".\")",
    },
];

fn rmdir(path: &Path) -> Result<(), Errno> {
    let c = CString::new(path.as_os_str().as_bytes()).map_err(|_| Errno::EINVAL)?;
    Errno::result(unsafe { libc::rmdir(c.as_ptr()) }).map(drop)
}

fn setup() {
    let fd = safe::open(Path::new("file"), libc::O_CREAT | libc::O_WRONLY, 0o600);
    safe::close(fd);

    safe::mkdir(Path::new("nonempty"), 0o755);
    let fd = safe::open(
        Path::new("nonempty/child"),
        libc::O_CREAT | libc::O_WRONLY,
        0o600,
    );
    safe::close(fd);
}

fn verify_rmdir(i: usize) {
    let case = &CASES[i];
    libltp::exp_fail(rmdir(Path::new(case.path)), case.exp, case.desc);
}

static TEST: TestCase = TestCase {
    setup: Some(setup),
    test: Some(verify_rmdir),
    tcnt: 4,
    needs_tmpdir: true,
    ..TestCase::new()
};

tst_main!(TEST);
