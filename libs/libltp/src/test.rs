//! Declarative test driver (tst_test)
//!
//! A test binary is a [`TestCase`] static plus free functions. [`run`] does
//! the rest: option parsing, requirement checks, the shared results page,
//! the tmpdir, forking the test into its own process group and watching it
//! with a SIGALRM watchdog that the child keeps refreshing with SIGUSR1
//! heartbeats. The exit status is the OR of the verdict bits accumulated
//! while the test ran.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::WaitStatus;
use nix::unistd::{ForkResult, Pid};
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::{ipc, opts, tmpdir, tst_brk, tst_res, Verdict};

/// A single-letter test option, e.g. `-s <size>`.
#[derive(Debug, Clone, Copy)]
pub struct TestOption {
    pub flag: char,
    pub takes_arg: bool,
    pub help: &'static str,
}

/// Declarative test metadata.
///
/// Declare a static and fill in only what the test needs:
///
/// ```ignore
/// static TEST: TestCase = TestCase {
///     test_all: Some(verify),
///     needs_root: true,
///     needs_tmpdir: true,
///     ..TestCase::new()
/// };
/// ```
pub struct TestCase {
    /// Test identifier; defaults to the binary name.
    pub tid: Option<&'static str>,
    /// One-time setup, runs in the test process before the first iteration.
    pub setup: Option<fn()>,
    /// One-time cleanup; always attempted, even after tst_brk.
    pub cleanup: Option<fn()>,
    /// Indexed test function, invoked for 0..tcnt each iteration.
    pub test: Option<fn(usize)>,
    pub tcnt: usize,
    /// Whole-test function; exactly one of `test`/`test_all` must be set.
    pub test_all: Option<fn()>,
    pub needs_root: bool,
    pub needs_tmpdir: bool,
    pub needs_checkpoints: bool,
    /// Must be set for `safe::fork()` to be allowed.
    pub forks_child: bool,
    /// Watchdog timeout in seconds; 0 means the 300s default.
    pub timeout: u32,
    /// Minimum kernel version, e.g. "4.14".
    pub min_kver: Option<&'static str>,
    pub options: &'static [TestOption],
}

impl TestCase {
    pub const fn new() -> Self {
        Self {
            tid: None,
            setup: None,
            cleanup: None,
            test: None,
            tcnt: 0,
            test_all: None,
            needs_root: false,
            needs_tmpdir: false,
            needs_checkpoints: false,
            forks_child: false,
            timeout: 0,
            min_kver: None,
            options: &[],
        }
    }
}

static CURRENT: OnceCell<&'static TestCase> = OnceCell::new();
static TID: OnceCell<String> = OnceCell::new();

static LIB_PID: AtomicI32 = AtomicI32::new(0);
static MAIN_PID: AtomicI32 = AtomicI32::new(0);
static TEST_PID: AtomicI32 = AtomicI32::new(0);
static KILL_RETRIES: AtomicI32 = AtomicI32::new(0);
static IN_CLEANUP: AtomicBool = AtomicBool::new(false);

const DEFAULT_TIMEOUT: u32 = 300;

struct CleanupBrk;

pub(crate) fn in_cleanup() -> bool {
    IN_CLEANUP.load(Ordering::Relaxed)
}

/// Unwind out of a tst_brk raised while cleanup itself is running.
pub(crate) fn cleanup_escape() -> ! {
    panic::panic_any(CleanupBrk);
}

pub(crate) fn forks_child_declared() -> bool {
    CURRENT.get().map(|t| t.forks_child).unwrap_or(false)
}

pub(crate) fn tid() -> &'static str {
    TID.get().map(String::as_str).unwrap_or("ltp")
}

fn raw_getpid() -> i32 {
    // A cached getpid can lie in CLONE_VM children; ask the kernel.
    unsafe { libc::syscall(libc::SYS_getpid) as i32 }
}

/// Where tst_brk lands: cleanup + exit, depending on which process we are.
pub(crate) fn brk_exit(v: Verdict) -> ! {
    let main_pid = MAIN_PID.load(Ordering::Relaxed);
    if main_pid != 0 && raw_getpid() == main_pid {
        run_test_cleanup();
    }

    let lib_pid = LIB_PID.load(Ordering::Relaxed);
    if lib_pid != 0 && std::process::id() as i32 == lib_pid {
        do_exit(v as i32);
    }

    std::process::exit(v as i32);
}

fn run_test_cleanup() {
    let test = match CURRENT.get() {
        Some(t) => t,
        None => return,
    };

    if let Some(cleanup) = test.cleanup {
        IN_CLEANUP.store(true, Ordering::Relaxed);
        let res = panic::catch_unwind(AssertUnwindSafe(cleanup));
        IN_CLEANUP.store(false, Ordering::Relaxed);

        if let Err(payload) = res {
            if !payload.is::<CleanupBrk>() {
                panic::resume_unwind(payload);
            }
        }
    }
}

fn do_exit(mut ret: i32) -> ! {
    if let Some(r) = ipc::results() {
        println!();
        println!("Summary:");
        println!("passed   {}", r.passed());
        println!("failed   {}", r.failed());
        println!("skipped  {}", r.skipped());
        println!("warnings {}", r.warnings());

        if r.failed() > 0 {
            ret |= Verdict::Fail as i32;
        }
        if r.skipped() > 0 && r.passed() == 0 {
            ret |= Verdict::Conf as i32;
        }
        if r.warnings() > 0 {
            ret |= Verdict::Warn as i32;
        }
    }

    tmpdir::remove();
    ipc::cleanup();

    std::process::exit(ret);
}

// Watchdog handlers. Only async-signal-safe calls allowed in here.

fn write_stderr(msg: &[u8]) {
    unsafe {
        libc::write(libc::STDERR_FILENO, msg.as_ptr().cast(), msg.len());
    }
}

extern "C" fn alarm_handler(_: libc::c_int) {
    write_stderr(b"Test timeouted, sending SIGKILL!\n");
    let pid = TEST_PID.load(Ordering::Relaxed);
    if pid > 0 {
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
    unsafe {
        libc::alarm(5);
    }

    if KILL_RETRIES.fetch_add(1, Ordering::Relaxed) >= 10 {
        write_stderr(b"Cannot kill test processes!\n");
        write_stderr(b"Likely the test hit a kernel bug, exiting uncleanly...\n");
        unsafe { libc::_exit(Verdict::Fail as i32) }
    }
}

extern "C" fn heartbeat_handler(_: libc::c_int) {
    let timeout = match ipc::results() {
        Some(r) => r.timeout(),
        None => DEFAULT_TIMEOUT,
    };
    unsafe {
        libc::alarm(timeout);
    }
    KILL_RETRIES.store(0, Ordering::Relaxed);
}

extern "C" fn sigint_handler(_: libc::c_int) {
    let pid = TEST_PID.load(Ordering::Relaxed);
    if pid > 0 {
        write_stderr(b"Sending SIGKILL to test process...\n");
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
}

fn set_timeout(secs: u32) {
    let mut timeout = secs;

    if let Ok(mul) = std::env::var("LTP_TIMEOUT_MUL") {
        let m: f32 = match mul.parse() {
            Ok(m) if m >= 1.0 => m,
            _ => tst_brk!(Brok, "Invalid timeout multiplier '{}'", mul),
        };
        timeout = (timeout as f32 * m + 0.5) as u32;
    }

    if let Some(r) = ipc::results() {
        r.set_timeout(timeout);
    }

    tst_res!(
        Info,
        "Timeout per run is {}h {:02}m {:02}s",
        timeout / 3600,
        (timeout % 3600) / 60,
        timeout % 60
    );

    unsafe {
        libc::alarm(timeout);
    }
}

fn assert_test_fn(test: &TestCase) {
    let cnt = test.test.is_some() as usize + test.test_all.is_some() as usize;

    if cnt == 0 {
        tst_brk!(Brok, "No test function specified");
    }
    if cnt != 1 {
        tst_brk!(Brok, "You can define only one test function");
    }
    if test.test.is_some() && test.tcnt == 0 {
        tst_brk!(Brok, "Number of tests (tcnt) must be > 0");
    }
    if test.test_all.is_some() && test.tcnt != 0 {
        tst_brk!(Brok, "You can define tcnt only for test()");
    }
}

fn check_kver(min_kver: &str) {
    let v = match crate::kver::parse(min_kver) {
        Some(v) => v,
        None => {
            tst_res!(
                Warn,
                "Invalid kernel version {}, expected %d.%d.%d",
                min_kver
            );
            return;
        }
    };

    if crate::kver::tst_kvercmp(v.major, v.minor, v.patch) < 0 {
        tst_brk!(Conf, "The test requires kernel {} or newer", min_kver);
    }
}

fn tid_from_argv() -> String {
    std::env::args()
        .next()
        .as_deref()
        .map(|a| {
            a.rsplit('/')
                .next()
                .unwrap_or("ltp_empty_argv")
                .to_string()
        })
        .unwrap_or_else(|| "ltp_empty_argv".to_string())
}

fn do_setup(test: &'static TestCase) {
    assert_test_fn(test);

    let tid = test
        .tid
        .map(str::to_string)
        .unwrap_or_else(tid_from_argv);
    let _ = TID.set(tid);

    opts::parse(tid_str(), test.options);

    if test.needs_root && !nix::unistd::Uid::effective().is_root() {
        tst_brk!(Conf, "Test needs to be run as root");
    }

    if let Some(min_kver) = test.min_kver {
        check_kver(min_kver);
    }

    ipc::setup(tid_str(), test.needs_checkpoints);

    if test.needs_tmpdir || test.needs_checkpoints {
        tmpdir::create(tid_str());
    }
}

fn tid_str() -> &'static str {
    tid()
}

fn results_snapshot() -> (u32, u32, u32) {
    ipc::results().map(|r| r.snapshot()).unwrap_or((0, 0, 0))
}

fn check_child_status(pid: Pid, status: WaitStatus) {
    match status {
        WaitStatus::Exited(_, 0) => {}
        WaitStatus::Exited(_, code) if code == Verdict::Brok as i32 => {
            tst_brk!(Brok, "Reported by child ({})", pid);
        }
        WaitStatus::Exited(_, code) if code == Verdict::Conf as i32 => {
            tst_brk!(Conf, "Reported by child ({})", pid);
        }
        WaitStatus::Exited(_, code) => {
            tst_brk!(Brok, "Invalid child ({}) exit value {}", pid, code);
        }
        WaitStatus::Signaled(_, sig, _) => {
            tst_brk!(Brok, "Child ({}) killed by signal {}", pid, sig);
        }
        _ => tst_brk!(Brok, "Child ({}) exited abnormally", pid),
    }
}

/// Wait for every forked child and fold their verdicts into the test.
pub fn reap_children() {
    loop {
        match nix::sys::wait::wait() {
            Ok(status) => {
                if let Some(pid) = status.pid() {
                    check_child_status(pid, status);
                }
            }
            Err(Errno::ECHILD) => break,
            Err(Errno::EINTR) => continue,
            Err(e) => tst_brk!(Brok, "wait() failed: {}", e),
        }
    }
}

fn main_pid() -> i32 {
    MAIN_PID.load(Ordering::Relaxed)
}

fn run_tests(test: &TestCase) {
    if let Some(test_all) = test.test_all {
        let saved = results_snapshot();
        test_all();

        // A grandchild that escaped the test function must not run the
        // harness teardown.
        if std::process::id() as i32 != main_pid() {
            std::process::exit(0);
        }

        reap_children();

        if results_snapshot() == saved {
            tst_brk!(Brok, "Test hasn't reported results!");
        }
        return;
    }

    let run = test.test.unwrap();
    for i in 0..test.tcnt {
        let saved = results_snapshot();
        run(i);

        if std::process::id() as i32 != main_pid() {
            std::process::exit(0);
        }

        reap_children();

        if results_snapshot() == saved {
            tst_brk!(Brok, "Test {} hasn't reported results!", i);
        }
    }
}

fn testrun(test: &'static TestCase) -> ! {
    MAIN_PID.store(std::process::id() as i32, Ordering::Relaxed);

    if let Some(setup) = test.setup {
        setup();
        if std::process::id() as i32 != main_pid() {
            tst_brk!(Brok, "Runaway child in setup()!");
        }
    }

    let parsed = opts::current();
    let stop_at = parsed
        .duration
        .map(|secs| Instant::now() + Duration::from_secs_f32(secs));

    let mut i = 0;
    loop {
        let mut cont = false;

        if i < parsed.iterations {
            i += 1;
            cont = true;
        }
        if let Some(stop) = stop_at {
            if Instant::now() < stop {
                cont = true;
            }
        }
        if !cont {
            break;
        }

        run_tests(test);

        // Heartbeat: tell the watchdog we are still making progress.
        let _ = signal::kill(nix::unistd::getppid(), Signal::SIGUSR1);
    }

    run_test_cleanup();
    std::process::exit(0);
}

/// Run a `TestCase` to completion. Never returns.
pub fn run(test: &'static TestCase) -> ! {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LTP_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    LIB_PID.store(std::process::id() as i32, Ordering::Relaxed);
    let _ = CURRENT.set(test);

    do_setup(test);

    crate::safe::sigaction(Signal::SIGALRM, SigHandler::Handler(alarm_handler));
    crate::safe::sigaction(Signal::SIGUSR1, SigHandler::Handler(heartbeat_handler));

    set_timeout(if test.timeout > 0 {
        test.timeout
    } else {
        DEFAULT_TIMEOUT
    });

    crate::safe::sigaction(Signal::SIGINT, SigHandler::Handler(sigint_handler));

    let child = match unsafe { nix::unistd::fork() } {
        Ok(ForkResult::Child) => {
            crate::safe::sigaction(Signal::SIGALRM, SigHandler::SigDfl);
            crate::safe::sigaction(Signal::SIGUSR1, SigHandler::SigDfl);
            crate::safe::sigaction(Signal::SIGINT, SigHandler::SigDfl);
            crate::safe::setpgid(Pid::from_raw(0), Pid::from_raw(0));
            testrun(test);
        }
        Ok(ForkResult::Parent { child }) => child,
        Err(e) => tst_brk!(Brok, "fork() failed: {}", e),
    };

    TEST_PID.store(child.as_raw(), Ordering::Relaxed);
    debug!("test child {} started", child);

    let status = loop {
        match nix::sys::wait::waitpid(child, None) {
            Ok(s) => break s,
            Err(Errno::EINTR) => continue,
            Err(e) => tst_brk!(Brok, "waitpid() failed: {}", e),
        }
    };

    unsafe {
        libc::alarm(0);
    }
    crate::safe::sigaction(Signal::SIGINT, SigHandler::SigDfl);

    match status {
        WaitStatus::Exited(_, code) if code != 0 => do_exit(code),
        WaitStatus::Signaled(_, Signal::SIGKILL, _) => {
            tst_res!(
                Info,
                "If you are running on slow machine, try exporting LTP_TIMEOUT_MUL > 1"
            );
            tst_brk!(Brok, "Test killed! (timeout?)");
        }
        WaitStatus::Signaled(_, sig, _) => {
            tst_brk!(Brok, "Test killed by {}!", sig);
        }
        _ => do_exit(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() {}

    #[test]
    fn testcase_defaults() {
        let t = TestCase::new();
        assert!(t.test.is_none());
        assert!(t.test_all.is_none());
        assert!(!t.needs_root);
        assert_eq!(t.timeout, 0);
    }

    #[test]
    fn cleanup_break_runs_cleanup_once() {
        static RUNS: AtomicI32 = AtomicI32::new(0);

        fn cleanup() {
            RUNS.fetch_add(1, Ordering::Relaxed);
            tst_brk!(Conf, "device vanished during cleanup");
        }

        static T: TestCase = TestCase {
            test_all: Some(noop),
            cleanup: Some(cleanup),
            ..TestCase::new()
        };

        let _ = CURRENT.set(&T);
        run_test_cleanup();
        assert_eq!(RUNS.load(Ordering::Relaxed), 1);
        assert!(!in_cleanup());
    }

    #[test]
    fn testcase_const_update_syntax() {
        static T: TestCase = TestCase {
            test_all: Some(noop),
            needs_tmpdir: true,
            ..TestCase::new()
        };
        assert!(T.needs_tmpdir);
        assert!(T.test_all.is_some());
    }
}
