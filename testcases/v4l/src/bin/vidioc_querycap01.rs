//! Checks that VIDIOC_QUERYCAP fills a valid v4l2_capability: terminated
//! strings, nonzero version and capabilities, zeroed reserved fields.

use std::mem;

use libltp::{tst_main, tst_res, TestCase};
use libltpv4l2::{show, types, validator, Device};

fn verify_querycap() {
    let dev = Device::require();

    let mut cap: types::Capability = unsafe { mem::zeroed() };
    if libltp::exp_pass(dev.ioctl(types::vidioc_querycap(), &mut cap), "VIDIOC_QUERYCAP")
        .is_none()
    {
        return;
    }

    show::capability(&cap);

    match validator::check_capability(&cap) {
        Ok(()) => tst_res!(Pass, "v4l2_capability is valid"),
        Err(v) => tst_res!(Fail, "v4l2_capability invalid: {}", v),
    }
}

static TEST: TestCase = TestCase {
    test_all: Some(verify_querycap),
    ..TestCase::new()
};

tst_main!(TEST);
