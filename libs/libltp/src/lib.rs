//! libltp - shared harness for the rust-ltp test suite
//!
//! Every test binary declares a [`TestCase`] static describing what it needs
//! (root, a tmpdir, checkpoints, ...) and which functions to run, then hands
//! control to the harness with [`tst_main!`]. The harness forks the test into
//! its own process group, arms a watchdog, runs setup/test/cleanup and turns
//! the accumulated per-verdict counters into the process exit status the
//! runner understands.
//!
//! Results are reported with [`tst_res!`] and [`tst_brk!`]; syscall wrappers
//! that cannot reasonably fail mid-test live in [`safe`].

pub mod fs;
pub mod ipc;
pub mod kver;
pub mod lapi;
pub mod opts;
pub mod res;
pub mod safe;
pub mod test;
pub mod tmpdir;

pub use res::{exp_fail, exp_pass, TestCall, Verdict};
pub use test::{TestCase, TestOption};

/// Expand to a `main` that hands control to the harness.
///
/// ```no_run
/// use libltp::{tst_main, tst_res, TestCase};
///
/// fn verify() {
///     tst_res!(Pass, "nothing to do");
/// }
///
/// static TEST: TestCase = TestCase {
///     test_all: Some(verify),
///     ..TestCase::new()
/// };
///
/// tst_main!(TEST);
/// ```
#[macro_export]
macro_rules! tst_main {
    ($test:path) => {
        fn main() {
            $crate::test::run(&$test);
        }
    };
}
