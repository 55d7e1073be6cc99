//! Checks waitpid(2): ECHILD with no children, WNOHANG on a live child,
//! normal exit collection and signal-death status decoding.

use std::thread;
use std::time::Duration;

use libltp::{safe, tst_main, tst_res, TestCase};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus};
use nix::unistd::{ForkResult, Pid};

fn verify_waitpid() {
    let any_child = Pid::from_raw(-1);
    libltp::exp_fail(
        nix::sys::wait::waitpid(any_child, None).map(drop),
        Errno::ECHILD,
        "waitpid() with no children",
    );

    // Live child: WNOHANG reports it still running, then the blocking wait
    // collects the exit code.
    let child = match safe::fork() {
        ForkResult::Child => {
            thread::sleep(Duration::from_millis(100));
            std::process::exit(0);
        }
        ForkResult::Parent { child } => child,
    };

    match safe::waitpid(child, Some(WaitPidFlag::WNOHANG)) {
        WaitStatus::StillAlive => tst_res!(Pass, "WNOHANG reports a live child"),
        status => tst_res!(Fail, "WNOHANG returned {:?}", status),
    }

    match safe::waitpid(child, None) {
        WaitStatus::Exited(pid, 0) if pid == child => {
            tst_res!(Pass, "collected the child's exit");
        }
        status => tst_res!(Fail, "expected Exited(0), got {:?}", status),
    }

    // Signal death must be decodable from the status.
    let child = match safe::fork() {
        ForkResult::Child => {
            let _ = signal::kill(nix::unistd::getpid(), Signal::SIGTERM);
            std::process::exit(1);
        }
        ForkResult::Parent { child } => child,
    };

    match safe::waitpid(child, None) {
        WaitStatus::Signaled(pid, Signal::SIGTERM, _) if pid == child => {
            tst_res!(Pass, "signal death decoded as SIGTERM");
        }
        status => tst_res!(Fail, "expected Signaled(SIGTERM), got {:?}", status),
    }
}

static TEST: TestCase = TestCase {
    test_all: Some(verify_waitpid),
    forks_child: true,
    ..TestCase::new()
};

tst_main!(TEST);
