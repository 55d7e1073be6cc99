//! Checks the input ioctls: VIDIOC_ENUMINPUT terminates with EINVAL and
//! yields valid entries, VIDIOC_G_INPUT returns an enumerable index,
//! selecting that index back with VIDIOC_S_INPUT succeeds and an
//! out-of-range index fails EINVAL.

use libltp::{tst_brk, tst_main, tst_res, TestCase};
use libltpv4l2::{foreach, show, types, Device};
use nix::errno::Errno;

fn verify_input() {
    let dev = Device::require();

    let inputs = match foreach::inputs(&dev) {
        Ok(i) => i,
        Err(e) => tst_brk!(Brok, "input enumeration failed: {}", e),
    };
    for input in &inputs {
        show::input(input);
    }
    if inputs.is_empty() {
        tst_brk!(Conf, "device has no video inputs");
    }
    tst_res!(Pass, "{} inputs enumerated, all valid", inputs.len());

    let mut current: libc::c_int = -1;
    if libltp::exp_pass(dev.ioctl_int(types::vidioc_g_input(), &mut current), "VIDIOC_G_INPUT")
        .is_none()
    {
        return;
    }

    if (0..inputs.len() as libc::c_int).contains(&current) {
        tst_res!(Pass, "current input {} is within the enumerated set", current);
    } else {
        tst_res!(
            Fail,
            "current input {} outside the {} enumerated inputs",
            current,
            inputs.len()
        );
        return;
    }

    let mut select = current;
    libltp::exp_pass(
        dev.ioctl_int(types::vidioc_s_input(), &mut select),
        "VIDIOC_S_INPUT of the current input",
    );

    let mut invalid = inputs.len() as libc::c_int + 1024;
    libltp::exp_fail(
        dev.ioctl_int(types::vidioc_s_input(), &mut invalid),
        Errno::EINVAL,
        "VIDIOC_S_INPUT with an out-of-range index",
    );
}

static TEST: TestCase = TestCase {
    test_all: Some(verify_input),
    ..TestCase::new()
};

tst_main!(TEST);
