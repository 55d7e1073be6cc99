//! Kernel UAPI mirrors for the V4L2 ioctls under test
//!
//! Layouts match include/uapi/linux/videodev2.h field for field; the size
//! assertions at the bottom pin them. Only the structs the conformance tests
//! exercise are mirrored.

use std::mem;

use bitflags::bitflags;

/// VIDIOC_QUERYCAP result.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Capability {
    pub driver: [u8; 16],
    pub card: [u8; 32],
    pub bus_info: [u8; 32],
    pub version: u32,
    pub capabilities: u32,
    pub device_caps: u32,
    pub reserved: [u32; 3],
}

bitflags! {
    /// V4L2_CAP_* bits reported in [`Capability::capabilities`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const VIDEO_CAPTURE        = 0x0000_0001;
        const VIDEO_OUTPUT         = 0x0000_0002;
        const VIDEO_OVERLAY        = 0x0000_0004;
        const VBI_CAPTURE          = 0x0000_0010;
        const VBI_OUTPUT           = 0x0000_0020;
        const SLICED_VBI_CAPTURE   = 0x0000_0040;
        const SLICED_VBI_OUTPUT    = 0x0000_0080;
        const RDS_CAPTURE          = 0x0000_0100;
        const VIDEO_OUTPUT_OVERLAY = 0x0000_0200;
        const HW_FREQ_SEEK         = 0x0000_0400;
        const RDS_OUTPUT           = 0x0000_0800;
        const VIDEO_CAPTURE_MPLANE = 0x0000_1000;
        const VIDEO_OUTPUT_MPLANE  = 0x0000_2000;
        const VIDEO_M2M_MPLANE     = 0x0000_4000;
        const VIDEO_M2M            = 0x0000_8000;
        const TUNER                = 0x0001_0000;
        const AUDIO                = 0x0002_0000;
        const RADIO                = 0x0004_0000;
        const MODULATOR            = 0x0008_0000;
        const SDR_CAPTURE          = 0x0010_0000;
        const EXT_PIX_FORMAT       = 0x0020_0000;
        const SDR_OUTPUT           = 0x0040_0000;
        const META_CAPTURE         = 0x0080_0000;
        const READWRITE            = 0x0100_0000;
        const STREAMING            = 0x0400_0000;
        const META_OUTPUT          = 0x0800_0000;
        const TOUCH                = 0x1000_0000;
        const IO_MC                = 0x2000_0000;
        const DEVICE_CAPS          = 0x8000_0000;
    }
}

/// v4l2_buf_type values accepted by VIDIOC_ENUM_FMT.
pub const BUF_TYPE_VIDEO_CAPTURE: u32 = 1;
pub const BUF_TYPE_VIDEO_OUTPUT: u32 = 2;
pub const BUF_TYPE_VIDEO_OVERLAY: u32 = 3;
pub const BUF_TYPE_VIDEO_CAPTURE_MPLANE: u32 = 9;
pub const BUF_TYPE_VIDEO_OUTPUT_MPLANE: u32 = 10;
pub const BUF_TYPE_SDR_CAPTURE: u32 = 11;
pub const BUF_TYPE_SDR_OUTPUT: u32 = 12;
pub const BUF_TYPE_META_CAPTURE: u32 = 13;
pub const BUF_TYPE_META_OUTPUT: u32 = 14;

/// V4L2_FMT_FLAG_* bits.
pub const FMT_FLAG_COMPRESSED: u32 = 0x0001;
pub const FMT_FLAG_EMULATED: u32 = 0x0002;

/// VIDIOC_ENUM_FMT argument.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FmtDesc {
    pub index: u32,
    pub type_: u32,
    pub flags: u32,
    pub description: [u8; 32],
    pub pixelformat: u32,
    pub reserved: [u32; 4],
}

pub const FRMSIZE_TYPE_DISCRETE: u32 = 1;
pub const FRMSIZE_TYPE_CONTINUOUS: u32 = 2;
pub const FRMSIZE_TYPE_STEPWISE: u32 = 3;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrmSizeDiscrete {
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrmSizeStepwise {
    pub min_width: u32,
    pub max_width: u32,
    pub step_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    pub step_height: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union FrmSizeUnion {
    pub discrete: FrmSizeDiscrete,
    pub stepwise: FrmSizeStepwise,
}

/// VIDIOC_ENUM_FRAMESIZES argument.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FrmSizeEnum {
    pub index: u32,
    pub pixel_format: u32,
    pub type_: u32,
    pub size: FrmSizeUnion,
    pub reserved: [u32; 2],
}

impl FrmSizeEnum {
    /// The discrete branch of the size union. Only meaningful when `type_`
    /// is [`FRMSIZE_TYPE_DISCRETE`].
    pub fn discrete(&self) -> FrmSizeDiscrete {
        unsafe { self.size.discrete }
    }

    /// The stepwise branch, also used for CONTINUOUS (step fixed at 1).
    pub fn stepwise(&self) -> FrmSizeStepwise {
        unsafe { self.size.stepwise }
    }
}

impl std::fmt::Debug for FrmSizeEnum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut d = f.debug_struct("FrmSizeEnum");
        d.field("index", &self.index)
            .field("pixel_format", &self.pixel_format)
            .field("type_", &self.type_);
        match self.type_ {
            FRMSIZE_TYPE_DISCRETE => d.field("discrete", &self.discrete()),
            _ => d.field("stepwise", &self.stepwise()),
        };
        d.finish()
    }
}

/// V4L2_INPUT_TYPE_* values.
pub const INPUT_TYPE_TUNER: u32 = 1;
pub const INPUT_TYPE_CAMERA: u32 = 2;
pub const INPUT_TYPE_TOUCH: u32 = 3;

/// VIDIOC_ENUMINPUT argument.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Input {
    pub index: u32,
    pub name: [u8; 32],
    pub type_: u32,
    pub audioset: u32,
    pub tuner: u32,
    pub std: u64,
    pub status: u32,
    pub capabilities: u32,
    pub reserved: [u32; 3],
}

// 'V' is the videodev2 ioctl magic.
pub fn vidioc_querycap() -> libc::c_ulong {
    nix::request_code_read!(b'V', 0, mem::size_of::<Capability>()) as libc::c_ulong
}

pub fn vidioc_enum_fmt() -> libc::c_ulong {
    nix::request_code_readwrite!(b'V', 2, mem::size_of::<FmtDesc>()) as libc::c_ulong
}

pub fn vidioc_enuminput() -> libc::c_ulong {
    nix::request_code_readwrite!(b'V', 26, mem::size_of::<Input>()) as libc::c_ulong
}

pub fn vidioc_g_input() -> libc::c_ulong {
    nix::request_code_read!(b'V', 38, mem::size_of::<libc::c_int>()) as libc::c_ulong
}

pub fn vidioc_s_input() -> libc::c_ulong {
    nix::request_code_readwrite!(b'V', 39, mem::size_of::<libc::c_int>()) as libc::c_ulong
}

pub fn vidioc_enum_framesizes() -> libc::c_ulong {
    nix::request_code_readwrite!(b'V', 74, mem::size_of::<FrmSizeEnum>()) as libc::c_ulong
}

/// Decode a fourcc pixel format for log output, e.g. `0x56595559` -> "YUYV".
pub fn fourcc(pixelformat: u32) -> String {
    pixelformat
        .to_le_bytes()
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uapi_struct_sizes() {
        assert_eq!(mem::size_of::<Capability>(), 104);
        assert_eq!(mem::size_of::<FmtDesc>(), 64);
        assert_eq!(mem::size_of::<FrmSizeEnum>(), 44);
        assert_eq!(mem::size_of::<FrmSizeUnion>(), 24);
        assert_eq!(mem::size_of::<Input>(), 80);
    }

    #[test]
    fn fourcc_decodes_ascii() {
        // 'Y' 'U' 'Y' 'V' little endian
        assert_eq!(fourcc(0x5659_5559), "YUYV");
        assert_eq!(fourcc(0x0000_0000), "....");
    }

    #[test]
    fn union_branches_overlay() {
        let mut e: FrmSizeEnum = unsafe { mem::zeroed() };
        e.size.stepwise = FrmSizeStepwise {
            min_width: 32,
            max_width: 640,
            step_width: 16,
            min_height: 32,
            max_height: 480,
            step_height: 16,
        };
        // The discrete view aliases the first two stepwise fields.
        assert_eq!(e.discrete(), FrmSizeDiscrete { width: 32, height: 640 });
    }
}
