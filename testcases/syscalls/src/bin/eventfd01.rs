//! Checks eventfd(2) counter semantics: the initial value is readable, a
//! read resets the counter to zero, nonblocking reads of a zero counter
//! fail EAGAIN, writes accumulate, a write that would overflow fails EAGAIN
//! and writing u64::MAX itself is EINVAL.

use libltp::{safe, tst_brk, tst_main, tst_res, TestCase};
use nix::errno::Errno;

// The counter saturates one below u64::MAX.
const MAX_COUNT: u64 = u64::MAX - 1;

fn efd_read(fd: i32) -> Result<u64, Errno> {
    let mut buf = [0u8; 8];
    let ret = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    Errno::result(ret)?;
    Ok(u64::from_ne_bytes(buf))
}

fn efd_write(fd: i32, value: u64) -> Result<(), Errno> {
    let buf = value.to_ne_bytes();
    let ret = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
    Errno::result(ret).map(drop)
}

fn check_count(fd: i32, expected: u64, what: &str) {
    match efd_read(fd) {
        Ok(n) if n == expected => tst_res!(Pass, "{}: read {}", what, n),
        Ok(n) => tst_res!(Fail, "{}: read {}, expected {}", what, n, expected),
        Err(e) => tst_res!(Fail, "{}: read failed: {}", what, e),
    }
}

fn verify_eventfd() {
    let fd = match Errno::result(unsafe { libc::eventfd(10, libc::EFD_NONBLOCK) }) {
        Ok(fd) => fd,
        Err(Errno::ENOSYS) => tst_brk!(Conf, "eventfd() not supported"),
        Err(e) => tst_brk!(Brok, "eventfd(10, EFD_NONBLOCK) failed: {}", e),
    };

    check_count(fd, 10, "initial value");
    libltp::exp_fail(
        efd_read(fd),
        Errno::EAGAIN,
        "nonblocking read of a zero counter",
    );

    if let Err(e) = efd_write(fd, 4).and_then(|_| efd_write(fd, 6)) {
        tst_brk!(Brok, "eventfd write failed: {}", e);
    }
    check_count(fd, 10, "accumulated writes");

    if let Err(e) = efd_write(fd, MAX_COUNT) {
        tst_brk!(Brok, "writing max count failed: {}", e);
    }
    libltp::exp_fail(
        efd_write(fd, 1),
        Errno::EAGAIN,
        "nonblocking write overflowing the counter",
    );

    check_count(fd, MAX_COUNT, "saturated counter");
    libltp::exp_fail(
        efd_write(fd, u64::MAX),
        Errno::EINVAL,
        "write of u64::MAX",
    );

    safe::close(fd);
}

static TEST: TestCase = TestCase {
    test_all: Some(verify_eventfd),
    ..TestCase::new()
};

tst_main!(TEST);
