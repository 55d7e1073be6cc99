//! Checks kill(2): SIGKILL terminates a checkpoint-synchronized child,
//! a reaped pid reports ESRCH and an invalid signal number is EINVAL.

use libltp::{ipc, safe, tst_main, tst_res, TestCase};
use nix::errno::Errno;
use nix::sys::wait::WaitStatus;
use nix::unistd::ForkResult;

fn kill_raw(pid: i32, sig: i32) -> Result<(), Errno> {
    Errno::result(unsafe { libc::kill(pid, sig) }).map(drop)
}

fn verify_kill() {
    let child = match safe::fork() {
        ForkResult::Child => {
            // Tell the parent we are up, then wait to be killed.
            ipc::checkpoint_wake(0, 1, 10_000);
            loop {
                unsafe { libc::pause() };
            }
        }
        ForkResult::Parent { child } => child,
    };

    ipc::checkpoint_wait(0, 10_000);

    if libltp::exp_pass(kill_raw(child.as_raw(), libc::SIGKILL), "kill(child, SIGKILL)")
        .is_none()
    {
        return;
    }

    match safe::waitpid(child, None) {
        WaitStatus::Signaled(_, sig, _) if sig as i32 == libc::SIGKILL => {
            tst_res!(Pass, "child terminated by SIGKILL");
        }
        status => tst_res!(Fail, "child did not die from SIGKILL: {:?}", status),
    }

    // The pid is reaped now, so even a null signal cannot find it.
    libltp::exp_fail(
        kill_raw(child.as_raw(), 0),
        Errno::ESRCH,
        "kill() on a reaped pid",
    );

    libltp::exp_fail(
        kill_raw(std::process::id() as i32, -1),
        Errno::EINVAL,
        "kill() with an invalid signal number",
    );
}

static TEST: TestCase = TestCase {
    test_all: Some(verify_kill),
    forks_child: true,
    needs_checkpoints: true,
    ..TestCase::new()
};

tst_main!(TEST);
