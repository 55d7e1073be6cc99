//! Checks symlink(2): a created link reads back with readlink(2), creating
//! it again fails EEXIST, and an overlong name component fails
//! ENAMETOOLONG.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use libltp::{tst_main, tst_res, TestCase};
use nix::errno::Errno;

const OBJECT: &str = "object";
const SLINK: &str = "slink";

fn symlink(target: &str, link: &str) -> Result<(), Errno> {
    let t = CString::new(target).map_err(|_| Errno::EINVAL)?;
    let l = CString::new(link).map_err(|_| Errno::EINVAL)?;
    Errno::result(unsafe { libc::symlink(t.as_ptr(), l.as_ptr()) }).map(drop)
}

fn readlink(link: &Path) -> Result<String, Errno> {
    let c = CString::new(link.as_os_str().as_bytes()).map_err(|_| Errno::EINVAL)?;
    let mut buf = [0u8; 4096];
    let n = Errno::result(unsafe {
        libc::readlink(c.as_ptr(), buf.as_mut_ptr().cast(), buf.len())
    })?;
    Ok(String::from_utf8_lossy(&buf[..n as usize]).into_owned())
}

fn verify_symlink() {
    if libltp::exp_pass(symlink(OBJECT, SLINK), "symlink(object, slink)").is_some() {
        match readlink(Path::new(SLINK)) {
            Ok(target) if target == OBJECT => {
                tst_res!(Pass, "readlink() returns the link target");
            }
            Ok(target) => {
                tst_res!(Fail, "readlink() returned '{}', expected '{}'", target, OBJECT);
            }
            Err(e) => tst_res!(Fail, "readlink() failed: {}", e),
        }
    }

    libltp::exp_fail(
        symlink(OBJECT, SLINK),
        Errno::EEXIST,
        "symlink() over an existing link",
    );

    let long = "x".repeat(300);
    libltp::exp_fail(
        symlink(OBJECT, &long),
        Errno::ENAMETOOLONG,
        "symlink() with a 300 byte name component",
    );

    libltp::safe::unlink(Path::new(SLINK));
}

static TEST: TestCase = TestCase {
    test_all: Some(verify_symlink),
    needs_tmpdir: true,
    ..TestCase::new()
};

tst_main!(TEST);
