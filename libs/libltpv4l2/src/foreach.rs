//! Enumeration drivers
//!
//! V4L2 enumerations all follow the same shape: fill the argument with 0xff
//! so stale kernel writes show up, set the index, call the ioctl, repeat with
//! the next index until the driver answers EINVAL. Every returned entry goes
//! through its validator before it is kept.

use std::mem::MaybeUninit;
use std::ptr;

use nix::errno::Errno;
use thiserror::Error;
use tracing::trace;

use crate::device::Device;
use crate::types::{
    self, FmtDesc, FrmSizeEnum, Input, FRMSIZE_TYPE_CONTINUOUS, FRMSIZE_TYPE_DISCRETE,
    FRMSIZE_TYPE_STEPWISE,
};
use crate::validator::{self, Violation};

// A driver that never answers EINVAL is broken; stop before looping forever.
const MAX_ENUM: u32 = 4096;

#[derive(Debug, Error)]
pub enum EnumError {
    #[error("ioctl failed at index {index}: {errno}")]
    Ioctl { index: u32, errno: Errno },

    #[error("entry {index} invalid: {violation}")]
    Invalid { index: u32, violation: Violation },

    #[error("discrete and non-discrete frame sizes mixed at index {index}")]
    MixedTypes { index: u32 },

    #[error("{0} frame size must be the only entry")]
    NotSingleton(&'static str),

    #[error("enumeration did not terminate after {MAX_ENUM} entries")]
    Unbounded,
}

/// All-ones payload, so fields the driver leaves untouched are caught.
fn poisoned<T>() -> T {
    let mut v = MaybeUninit::<T>::uninit();
    unsafe {
        ptr::write_bytes(v.as_mut_ptr(), 0xff, 1);
        v.assume_init()
    }
}

/// Enumerate the pixel formats of `buf_type` with VIDIOC_ENUM_FMT.
pub fn formats(dev: &Device, buf_type: u32) -> Result<Vec<FmtDesc>, EnumError> {
    let mut found = Vec::new();

    for index in 0..MAX_ENUM {
        // Only index and type go in; the driver must overwrite the rest,
        // including zeroing reserved.
        let mut fmt: FmtDesc = poisoned();
        fmt.index = index;
        fmt.type_ = buf_type;

        match dev.ioctl(types::vidioc_enum_fmt(), &mut fmt) {
            Ok(()) => {}
            Err(Errno::EINVAL) => return Ok(found),
            Err(errno) => return Err(EnumError::Ioctl { index, errno }),
        }

        validator::check_fmtdesc(&fmt, index, buf_type)
            .map_err(|violation| EnumError::Invalid { index, violation })?;
        trace!("format {}: {}", index, types::fourcc(fmt.pixelformat));
        found.push(fmt);
    }

    Err(EnumError::Unbounded)
}

/// Enumerate the frame sizes of `pixel_format` with VIDIOC_ENUM_FRAMESIZES.
///
/// Discrete sizes come as a list; CONTINUOUS and STEPWISE describe the whole
/// range in one entry, so any second entry of those types is a conformance
/// failure.
pub fn frame_sizes(dev: &Device, pixel_format: u32) -> Result<Vec<FrmSizeEnum>, EnumError> {
    let mut found: Vec<FrmSizeEnum> = Vec::new();
    let mut first_type = None;

    for index in 0..MAX_ENUM {
        let mut frm: FrmSizeEnum = poisoned();
        frm.index = index;
        frm.pixel_format = pixel_format;

        match dev.ioctl(types::vidioc_enum_framesizes(), &mut frm) {
            Ok(()) => {}
            Err(Errno::EINVAL) => return Ok(found),
            Err(errno) => return Err(EnumError::Ioctl { index, errno }),
        }

        validator::check_frmsizeenum(&frm, index, pixel_format)
            .map_err(|violation| EnumError::Invalid { index, violation })?;

        match (first_type, frm.type_) {
            (None, t) => first_type = Some(t),
            (Some(FRMSIZE_TYPE_DISCRETE), FRMSIZE_TYPE_DISCRETE) => {}
            (Some(FRMSIZE_TYPE_DISCRETE), _) => return Err(EnumError::MixedTypes { index }),
            (Some(FRMSIZE_TYPE_CONTINUOUS), _) => {
                return Err(EnumError::NotSingleton("continuous"))
            }
            (Some(FRMSIZE_TYPE_STEPWISE), _) => return Err(EnumError::NotSingleton("stepwise")),
            (Some(_), _) => unreachable!("validator admits three types"),
        }

        found.push(frm);
    }

    Err(EnumError::Unbounded)
}

/// Enumerate the video inputs with VIDIOC_ENUMINPUT.
pub fn inputs(dev: &Device) -> Result<Vec<Input>, EnumError> {
    let mut found = Vec::new();

    for index in 0..MAX_ENUM {
        let mut input: Input = poisoned();
        input.index = index;

        match dev.ioctl(types::vidioc_enuminput(), &mut input) {
            Ok(()) => {}
            Err(Errno::EINVAL) => return Ok(found),
            Err(errno) => return Err(EnumError::Ioctl { index, errno }),
        }

        validator::check_input(&input, index)
            .map_err(|violation| EnumError::Invalid { index, violation })?;
        found.push(input);
    }

    Err(EnumError::Unbounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisoned_is_all_ones() {
        let frm: FrmSizeEnum = poisoned();
        assert_eq!(frm.index, u32::MAX);
        assert_eq!(frm.pixel_format, u32::MAX);
        assert_eq!(frm.reserved, [u32::MAX; 2]);
    }
}
