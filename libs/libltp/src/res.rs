//! Result reporting (tst_res/tst_brk)
//!
//! Every result line has the form `file:line: VERDICT: message[: errno]` and
//! is written to stderr, colored when stderr is a terminal. Counters live in
//! the shared results page so forked children are counted too.

use std::fmt;
use std::io::Write;

use nix::errno::Errno;

use crate::ipc;

/// Test verdict, encoded the way the runner expects it in the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Verdict {
    Pass = 0,
    Fail = 1,
    Brok = 2,
    Warn = 4,
    Info = 16,
    Conf = 32,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Brok => "BROK",
            Verdict::Warn => "WARN",
            Verdict::Info => "INFO",
            Verdict::Conf => "CONF",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Verdict::Pass => "\x1b[1;32m",
            Verdict::Fail => "\x1b[1;31m",
            Verdict::Brok => "\x1b[1;31m",
            Verdict::Warn => "\x1b[1;35m",
            Verdict::Info => "\x1b[1;34m",
            Verdict::Conf => "\x1b[1;33m",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Captured return value and errno of a single raw syscall.
#[derive(Debug, Clone, Copy)]
pub struct TestCall {
    pub ret: i64,
    pub errno: Errno,
}

/// Run one raw call and capture both its return value and errno.
pub fn test_call<F: FnOnce() -> i64>(f: F) -> TestCall {
    Errno::clear();
    let ret = f();
    TestCall {
        ret,
        errno: Errno::last(),
    }
}

fn color_enabled() -> bool {
    match std::env::var("LTP_COLORIZE_OUTPUT").as_deref() {
        Ok("y") | Ok("1") => return true,
        Ok("n") | Ok("0") => return false,
        _ => {}
    }
    unsafe { libc::isatty(libc::STDERR_FILENO) == 1 }
}

fn print_result(file: &str, line: u32, v: Verdict, err: Option<Errno>, msg: fmt::Arguments) {
    let mut buf = String::with_capacity(128);

    use fmt::Write as _;
    let _ = write!(buf, "{}:{}: ", file, line);

    if color_enabled() {
        let _ = write!(buf, "{}{}: \x1b[0m", v.color(), v);
    } else {
        let _ = write!(buf, "{}: ", v);
    }

    let _ = write!(buf, "{}", msg);

    if let Some(e) = err {
        let _ = write!(buf, ": {} ({})", e.desc(), e as i32);
    }

    buf.push('\n');

    // One write keeps lines from forked children intact.
    let _ = std::io::stderr().write_all(buf.as_bytes());
}

fn update_counters(v: Verdict) {
    if let Some(r) = ipc::results() {
        match v {
            Verdict::Pass => r.inc_passed(),
            Verdict::Fail => r.inc_failed(),
            Verdict::Conf => r.inc_skipped(),
            Verdict::Warn => r.inc_warnings(),
            Verdict::Brok | Verdict::Info => {}
        }
    }
}

/// Report one result. Use through [`crate::tst_res!`].
pub fn report_at(file: &str, line: u32, v: Verdict, err: Option<Errno>, msg: fmt::Arguments) {
    print_result(file, line, v, err, msg);
    update_counters(v);
}

/// Report and abort the test. Use through [`crate::tst_brk!`].
pub fn brk_at(file: &str, line: u32, v: Verdict, err: Option<Errno>, msg: fmt::Arguments) -> ! {
    if crate::test::in_cleanup() {
        // A break inside cleanup must not re-enter cleanup. Anything but
        // TCONF is demoted to TWARN.
        let demoted = if v == Verdict::Conf { Verdict::Conf } else { Verdict::Warn };
        print_result(file, line, demoted, err, msg);
        update_counters(demoted);
        crate::test::cleanup_escape();
    }

    print_result(file, line, v, err, msg);
    update_counters(v);
    crate::test::brk_exit(v);
}

/// Report one test result.
///
/// `tst_res!(Pass, "...")` or, to append the current errno,
/// `tst_res!(Fail | ERRNO, "...")`.
#[macro_export]
macro_rules! tst_res {
    ($v:ident | ERRNO, $($arg:tt)*) => {
        $crate::res::report_at(
            file!(),
            line!(),
            $crate::Verdict::$v,
            Some(::nix::errno::Errno::last()),
            format_args!($($arg)*),
        )
    };
    ($v:ident, $($arg:tt)*) => {
        $crate::res::report_at(
            file!(),
            line!(),
            $crate::Verdict::$v,
            None,
            format_args!($($arg)*),
        )
    };
}

/// Report and abort the whole test.
#[macro_export]
macro_rules! tst_brk {
    ($v:ident | ERRNO, $($arg:tt)*) => {
        $crate::res::brk_at(
            file!(),
            line!(),
            $crate::Verdict::$v,
            Some(::nix::errno::Errno::last()),
            format_args!($($arg)*),
        )
    };
    ($v:ident, $($arg:tt)*) => {
        $crate::res::brk_at(
            file!(),
            line!(),
            $crate::Verdict::$v,
            None,
            format_args!($($arg)*),
        )
    };
}

/// Assert that a call succeeded, reporting TPASS/TFAIL.
///
/// Returns the success value so follow-up checks can use it.
#[track_caller]
pub fn exp_pass<T>(res: Result<T, Errno>, what: &str) -> Option<T> {
    let loc = std::panic::Location::caller();
    match res {
        Ok(val) => {
            report_at(
                loc.file(),
                loc.line(),
                Verdict::Pass,
                None,
                format_args!("{} passed", what),
            );
            Some(val)
        }
        Err(e) => {
            report_at(
                loc.file(),
                loc.line(),
                Verdict::Fail,
                Some(e),
                format_args!("{} failed", what),
            );
            None
        }
    }
}

/// Assert that a call failed with one specific errno, reporting TPASS/TFAIL.
#[track_caller]
pub fn exp_fail<T>(res: Result<T, Errno>, exp: Errno, what: &str) {
    let loc = std::panic::Location::caller();
    match res {
        Ok(_) => report_at(
            loc.file(),
            loc.line(),
            Verdict::Fail,
            None,
            format_args!("{} passed unexpectedly", what),
        ),
        Err(e) if e == exp => report_at(
            loc.file(),
            loc.line(),
            Verdict::Pass,
            None,
            format_args!("{} failed as expected: {:?}", what, e),
        ),
        Err(e) => report_at(
            loc.file(),
            loc.line(),
            Verdict::Fail,
            Some(e),
            format_args!("{} expected {:?}", what, exp),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_exit_encoding() {
        assert_eq!(Verdict::Pass as i32, 0);
        assert_eq!(Verdict::Fail as i32, 1);
        assert_eq!(Verdict::Brok as i32, 2);
        assert_eq!(Verdict::Warn as i32, 4);
        assert_eq!(Verdict::Info as i32, 16);
        assert_eq!(Verdict::Conf as i32, 32);
    }

    #[test]
    fn test_call_captures_errno() {
        let call = test_call(|| unsafe { libc::close(-1) as i64 });
        assert_eq!(call.ret, -1);
        assert_eq!(call.errno, Errno::EBADF);
    }
}
