//! Harness self-test helper: reports whichever verdict the flags ask for,
//! so the driver's exit status encoding can be checked from the outside.

use libltp::{opts, tst_brk, tst_main, tst_res, TestCase, TestOption};

fn report() {
    if opts::present('n') {
        return;
    }

    if opts::present('c') {
        tst_brk!(Conf, "skipping on request");
    }

    if opts::present('f') {
        tst_res!(Fail, "failing on request");
        return;
    }

    if opts::present('w') {
        tst_res!(Warn, "warning on request");
    }

    tst_res!(Pass, "passing");
}

static TEST: TestCase = TestCase {
    test_all: Some(report),
    options: &[
        TestOption { flag: 'f', takes_arg: false, help: "Report TFAIL" },
        TestOption { flag: 'c', takes_arg: false, help: "Break with TCONF" },
        TestOption { flag: 'w', takes_arg: false, help: "Report TWARN" },
        TestOption { flag: 'n', takes_arg: false, help: "Report nothing" },
    ],
    ..TestCase::new()
};

tst_main!(TEST);
