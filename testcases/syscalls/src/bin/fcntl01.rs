//! Checks fcntl(2): F_DUPFD duplicates to the lowest free descriptor at or
//! above the argument, FD_CLOEXEC round-trips through F_SETFD/F_GETFD and a
//! bad descriptor reports EBADF.

use libltp::{safe, tst_main, tst_res, TestCase};
use nix::errno::Errno;

fn fcntl(fd: i32, cmd: i32, arg: i32) -> Result<i32, Errno> {
    Errno::result(unsafe { libc::fcntl(fd, cmd, arg) })
}

fn verify_fcntl() {
    let (rd, wr) = safe::pipe();

    match fcntl(rd, libc::F_DUPFD, 10) {
        Ok(dup) if dup >= 10 => {
            tst_res!(Pass, "F_DUPFD returned descriptor {} >= 10", dup);
            safe::close(dup);
        }
        Ok(dup) => {
            tst_res!(Fail, "F_DUPFD returned {} below the requested 10", dup);
            safe::close(dup);
        }
        Err(e) => tst_res!(Fail, "F_DUPFD failed: {}", e),
    }

    match fcntl(rd, libc::F_SETFD, libc::FD_CLOEXEC).and_then(|_| fcntl(rd, libc::F_GETFD, 0)) {
        Ok(flags) if flags & libc::FD_CLOEXEC != 0 => {
            tst_res!(Pass, "FD_CLOEXEC set and read back");
        }
        Ok(flags) => tst_res!(Fail, "F_GETFD returned {:#x} without FD_CLOEXEC", flags),
        Err(e) => tst_res!(Fail, "FD_CLOEXEC round trip failed: {}", e),
    }

    libltp::exp_fail(
        fcntl(-1, libc::F_GETFD, 0),
        Errno::EBADF,
        "fcntl() on a bad descriptor",
    );

    safe::close(rd);
    safe::close(wr);
}

static TEST: TestCase = TestCase {
    test_all: Some(verify_fcntl),
    ..TestCase::new()
};

tst_main!(TEST);
