//! Blocks every catchable signal, raises each one and checks that all of
//! them are pending and none was delivered.

use std::mem;

use libltp::{tst_brk, tst_main, tst_res, TestCase};
use nix::errno::Errno;

fn block_all() {
    unsafe {
        let mut set: libc::sigset_t = mem::zeroed();
        libc::sigfillset(&mut set);
        if libc::sigprocmask(libc::SIG_BLOCK, &set, std::ptr::null_mut()) != 0 {
            tst_brk!(Brok | ERRNO, "sigprocmask(SIG_BLOCK) failed");
        }
    }
}

fn catchable(sig: i32) -> bool {
    !matches!(sig, libc::SIGKILL | libc::SIGSTOP)
}

fn verify_sighold() {
    block_all();

    for sig in 1..=31 {
        if !catchable(sig) {
            continue;
        }
        if let Err(e) = Errno::result(unsafe { libc::raise(sig) }) {
            tst_brk!(Brok, "raise({}) failed: {}", sig, e);
        }
    }

    let mut pending: libc::sigset_t = unsafe { mem::zeroed() };
    if unsafe { libc::sigpending(&mut pending) } != 0 {
        tst_brk!(Brok | ERRNO, "sigpending() failed");
    }

    let mut missing = 0;
    for sig in 1..=31 {
        if !catchable(sig) {
            continue;
        }
        if unsafe { libc::sigismember(&pending, sig) } != 1 {
            tst_res!(Fail, "signal {} not pending after raise", sig);
            missing += 1;
        }
    }

    // Had any signal slipped through the mask, its default disposition
    // would have killed the process before this line.
    if missing == 0 {
        tst_res!(Pass, "all raised signals blocked and pending");
    }
}

static TEST: TestCase = TestCase {
    test_all: Some(verify_sighold),
    ..TestCase::new()
};

tst_main!(TEST);
