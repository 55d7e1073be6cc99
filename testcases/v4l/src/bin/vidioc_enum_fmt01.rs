//! Checks VIDIOC_ENUM_FMT: enumeration terminates with EINVAL, every entry
//! validates and echoes its index, and a far out-of-range index also
//! reports EINVAL.

use std::mem;

use libltp::{tst_main, tst_res, TestCase};
use libltpv4l2::{foreach, show, types, Device};
use nix::errno::Errno;

static BUF_TYPES: &[(u32, &str)] = &[
    (types::BUF_TYPE_VIDEO_CAPTURE, "VIDEO_CAPTURE"),
    (types::BUF_TYPE_VIDEO_OUTPUT, "VIDEO_OUTPUT"),
    (types::BUF_TYPE_VIDEO_OVERLAY, "VIDEO_OVERLAY"),
];

fn verify_enum_fmt() {
    let dev = Device::require();
    let mut enumerated = 0;

    for &(buf_type, name) in BUF_TYPES {
        let formats = match foreach::formats(&dev, buf_type) {
            Ok(f) => f,
            Err(e) => {
                tst_res!(Fail, "{} enumeration: {}", name, e);
                continue;
            }
        };

        for fmt in &formats {
            show::format(fmt);
        }
        tst_res!(Pass, "{}: {} formats, all valid", name, formats.len());
        enumerated += formats.len();

        // Far past the end the driver must still answer EINVAL.
        let mut fmt: types::FmtDesc = unsafe { mem::zeroed() };
        fmt.index = formats.len() as u32 + 1024;
        fmt.type_ = buf_type;
        libltp::exp_fail(
            dev.ioctl(types::vidioc_enum_fmt(), &mut fmt),
            Errno::EINVAL,
            "VIDIOC_ENUM_FMT with an out-of-range index",
        );
    }

    if enumerated == 0 {
        tst_res!(Info, "device reports no formats at all");
    }
}

static TEST: TestCase = TestCase {
    test_all: Some(verify_enum_fmt),
    ..TestCase::new()
};

tst_main!(TEST);
