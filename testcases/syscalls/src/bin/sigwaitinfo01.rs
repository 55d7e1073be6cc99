//! Checks that sigwaitinfo(2) returns a pending signal with the right
//! si_signo and that sigtimedwait(2) times out with EAGAIN when nothing is
//! pending.

use std::mem;
use std::ptr;

use libltp::{tst_brk, tst_main, tst_res, TestCase};
use nix::errno::Errno;

fn block(sig: i32) -> libc::sigset_t {
    unsafe {
        let mut set: libc::sigset_t = mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, sig);
        if libc::sigprocmask(libc::SIG_BLOCK, &set, ptr::null_mut()) != 0 {
            tst_brk!(Brok | ERRNO, "sigprocmask(SIG_BLOCK, {}) failed", sig);
        }
        set
    }
}

fn verify_sigwaitinfo() {
    let set = block(libc::SIGUSR2);

    if let Err(e) = Errno::result(unsafe { libc::raise(libc::SIGUSR2) }) {
        tst_brk!(Brok, "raise(SIGUSR2) failed: {}", e);
    }

    let mut info: libc::siginfo_t = unsafe { mem::zeroed() };
    match Errno::result(unsafe { libc::sigwaitinfo(&set, &mut info) }) {
        Ok(sig) if sig == libc::SIGUSR2 => {
            if info.si_signo == libc::SIGUSR2 {
                tst_res!(Pass, "sigwaitinfo() returned SIGUSR2 with matching si_signo");
            } else {
                tst_res!(Fail, "si_signo is {}, expected SIGUSR2", info.si_signo);
            }
        }
        Ok(sig) => tst_res!(Fail, "sigwaitinfo() returned signal {}", sig),
        Err(e) => tst_res!(Fail, "sigwaitinfo() failed: {}", e),
    }

    // Nothing pending anymore; a short sigtimedwait must run out.
    let timeout = libc::timespec {
        tv_sec: 0,
        tv_nsec: 100_000_000,
    };
    let ret = Errno::result(unsafe { libc::sigtimedwait(&set, ptr::null_mut(), &timeout) });
    libltp::exp_fail(
        ret.map(drop),
        Errno::EAGAIN,
        "sigtimedwait() with nothing pending",
    );
}

static TEST: TestCase = TestCase {
    test_all: Some(verify_sigwaitinfo),
    ..TestCase::new()
};

tst_main!(TEST);
