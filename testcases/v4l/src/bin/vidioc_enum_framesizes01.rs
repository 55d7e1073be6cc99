//! Checks VIDIOC_ENUM_FRAMESIZES for every capture format: entries
//! validate, the frame-size type stays constant across indexes, only
//! DISCRETE enumerates past index 0 and stepwise ranges are consistent.

use libltp::{tst_brk, tst_main, tst_res, TestCase};
use libltpv4l2::{foreach, show, types, Device};

fn verify_enum_framesizes() {
    let dev = Device::require();

    let formats = match foreach::formats(&dev, types::BUF_TYPE_VIDEO_CAPTURE) {
        Ok(f) => f,
        Err(e) => tst_brk!(Brok, "capture format enumeration failed: {}", e),
    };
    if formats.is_empty() {
        tst_brk!(Conf, "device reports no capture formats");
    }

    for fmt in &formats {
        let fourcc = types::fourcc(fmt.pixelformat);
        match foreach::frame_sizes(&dev, fmt.pixelformat) {
            Ok(sizes) => {
                for frm in &sizes {
                    show::frame_size(frm);
                }
                tst_res!(Pass, "'{}': {} frame sizes, all valid", fourcc, sizes.len());
            }
            Err(e) => tst_res!(Fail, "'{}': {}", fourcc, e),
        }
    }
}

static TEST: TestCase = TestCase {
    test_all: Some(verify_enum_framesizes),
    ..TestCase::new()
};

tst_main!(TEST);
