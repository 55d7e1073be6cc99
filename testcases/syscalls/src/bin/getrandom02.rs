//! Checks that getrandom(2) fills the whole requested buffer and that
//! repeated calls return different data.

use libltp::{lapi, tst_brk, tst_main, tst_res, TestCase};

const BUF_SIZE: usize = 256;

fn fill(buf: &mut [u8]) {
    match lapi::getrandom(buf, 0) {
        Ok(n) if n == buf.len() => {}
        Ok(n) => tst_brk!(Brok, "getrandom() returned {} of {} bytes", n, buf.len()),
        Err(e) => tst_brk!(Brok, "getrandom() failed: {}", e),
    }
}

fn verify_getrandom() {
    let mut first = [0u8; BUF_SIZE];
    let mut second = [0u8; BUF_SIZE];

    fill(&mut first);
    fill(&mut second);

    if first.iter().all(|&b| b == 0) {
        tst_res!(Fail, "getrandom() returned all zeroes");
        return;
    }
    tst_res!(Pass, "getrandom() filled the buffer");

    if first == second {
        tst_res!(Fail, "two getrandom() calls returned identical data");
    } else {
        tst_res!(Pass, "repeated calls return different data");
    }
}

static TEST: TestCase = TestCase {
    test_all: Some(verify_getrandom),
    min_kver: Some("3.17"),
    ..TestCase::new()
};

tst_main!(TEST);
