//! Struct validators
//!
//! Each checks one ioctl result against the contract videodev2.h documents:
//! strings NUL terminated, reserved fields zeroed, enum fields within range,
//! index and pixel format echoed back unchanged. The testcases turn the
//! first violation into a TFAIL.

use thiserror::Error;

use crate::types::{
    Capability, FmtDesc, FrmSizeEnum, Input, FRMSIZE_TYPE_CONTINUOUS, FRMSIZE_TYPE_DISCRETE,
    FRMSIZE_TYPE_STEPWISE, INPUT_TYPE_CAMERA, INPUT_TYPE_TOUCH, INPUT_TYPE_TUNER,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Violation {
    #[error("{field} is not NUL terminated")]
    Unterminated { field: &'static str },

    #[error("{field} is empty")]
    EmptyString { field: &'static str },

    #[error("reserved field of {strukt} not zeroed")]
    DirtyReserved { strukt: &'static str },

    #[error("index changed from {expected} to {got}")]
    IndexChanged { expected: u32, got: u32 },

    #[error("pixel format changed from {expected:#010x} to {got:#010x}")]
    PixelFormatChanged { expected: u32, got: u32 },

    #[error("{field} has invalid value {got}")]
    BadEnum { field: &'static str, got: u32 },

    #[error("{field} is zero")]
    ZeroValue { field: &'static str },

    #[error("stepwise range invalid: min {min} > max {max}")]
    RangeInverted { min: u32, max: u32 },

    #[error("stepwise range {min}..{max} is not a multiple of step {step}")]
    StepMismatch { min: u32, max: u32, step: u32 },
}

/// Bytes up to the first NUL, or Unterminated if there is none.
fn terminated<'a>(buf: &'a [u8], field: &'static str) -> Result<&'a [u8], Violation> {
    match buf.iter().position(|&b| b == 0) {
        Some(n) => Ok(&buf[..n]),
        None => Err(Violation::Unterminated { field }),
    }
}

fn nonempty_string(buf: &[u8], field: &'static str) -> Result<(), Violation> {
    if terminated(buf, field)?.is_empty() {
        return Err(Violation::EmptyString { field });
    }
    Ok(())
}

pub fn check_capability(cap: &Capability) -> Result<(), Violation> {
    nonempty_string(&cap.driver, "driver")?;
    nonempty_string(&cap.card, "card")?;
    terminated(&cap.bus_info, "bus_info")?;
    if cap.version == 0 {
        return Err(Violation::ZeroValue { field: "version" });
    }
    if cap.capabilities == 0 {
        return Err(Violation::ZeroValue { field: "capabilities" });
    }
    if cap.reserved.iter().any(|&r| r != 0) {
        return Err(Violation::DirtyReserved { strukt: "v4l2_capability" });
    }
    Ok(())
}

pub fn check_fmtdesc(fmt: &FmtDesc, index: u32, buf_type: u32) -> Result<(), Violation> {
    if fmt.index != index {
        return Err(Violation::IndexChanged { expected: index, got: fmt.index });
    }
    if fmt.type_ != buf_type {
        return Err(Violation::BadEnum { field: "type", got: fmt.type_ });
    }
    nonempty_string(&fmt.description, "description")?;
    if fmt.pixelformat == 0 {
        return Err(Violation::ZeroValue { field: "pixelformat" });
    }
    if fmt.reserved.iter().any(|&r| r != 0) {
        return Err(Violation::DirtyReserved { strukt: "v4l2_fmtdesc" });
    }
    Ok(())
}

pub fn check_frmsizeenum(
    frm: &FrmSizeEnum,
    index: u32,
    pixel_format: u32,
) -> Result<(), Violation> {
    if frm.index != index {
        return Err(Violation::IndexChanged { expected: index, got: frm.index });
    }
    if frm.pixel_format != pixel_format {
        return Err(Violation::PixelFormatChanged {
            expected: pixel_format,
            got: frm.pixel_format,
        });
    }

    match frm.type_ {
        FRMSIZE_TYPE_DISCRETE => {
            let d = frm.discrete();
            if d.width == 0 {
                return Err(Violation::ZeroValue { field: "discrete.width" });
            }
            if d.height == 0 {
                return Err(Violation::ZeroValue { field: "discrete.height" });
            }
        }
        FRMSIZE_TYPE_CONTINUOUS | FRMSIZE_TYPE_STEPWISE => {
            let s = frm.stepwise();
            check_step(s.min_width, s.max_width, s.step_width)?;
            check_step(s.min_height, s.max_height, s.step_height)?;
            // CONTINUOUS is STEPWISE with both steps fixed at one.
            if frm.type_ == FRMSIZE_TYPE_CONTINUOUS
                && (s.step_width != 1 || s.step_height != 1)
            {
                return Err(Violation::BadEnum {
                    field: "continuous step",
                    got: s.step_width,
                });
            }
        }
        other => return Err(Violation::BadEnum { field: "type", got: other }),
    }

    if frm.reserved.iter().any(|&r| r != 0) {
        return Err(Violation::DirtyReserved { strukt: "v4l2_frmsizeenum" });
    }
    Ok(())
}

fn check_step(min: u32, max: u32, step: u32) -> Result<(), Violation> {
    if min == 0 {
        return Err(Violation::ZeroValue { field: "stepwise min" });
    }
    if step == 0 {
        return Err(Violation::ZeroValue { field: "stepwise step" });
    }
    if min > max {
        return Err(Violation::RangeInverted { min, max });
    }
    if (max - min) % step != 0 {
        return Err(Violation::StepMismatch { min, max, step });
    }
    Ok(())
}

pub fn check_input(input: &Input, index: u32) -> Result<(), Violation> {
    if input.index != index {
        return Err(Violation::IndexChanged { expected: index, got: input.index });
    }
    nonempty_string(&input.name, "name")?;
    match input.type_ {
        INPUT_TYPE_TUNER | INPUT_TYPE_CAMERA | INPUT_TYPE_TOUCH => {}
        other => return Err(Violation::BadEnum { field: "type", got: other }),
    }
    if input.reserved.iter().any(|&r| r != 0) {
        return Err(Violation::DirtyReserved { strukt: "v4l2_input" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrmSizeStepwise;
    use std::mem;

    fn sample_cap() -> Capability {
        let mut cap: Capability = unsafe { mem::zeroed() };
        cap.driver[..4].copy_from_slice(b"uvc\0");
        cap.card[..7].copy_from_slice(b"webcam\0");
        cap.version = 0x0006_0100;
        cap.capabilities = 0x8520_0001;
        cap
    }

    #[test]
    fn capability_accepts_sane_device() {
        assert_eq!(check_capability(&sample_cap()), Ok(()));
    }

    #[test]
    fn capability_rejects_unterminated_driver() {
        let mut cap = sample_cap();
        cap.driver = [b'x'; 16];
        assert_eq!(
            check_capability(&cap),
            Err(Violation::Unterminated { field: "driver" })
        );
    }

    #[test]
    fn capability_rejects_dirty_reserved() {
        let mut cap = sample_cap();
        cap.reserved[1] = 7;
        assert_eq!(
            check_capability(&cap),
            Err(Violation::DirtyReserved { strukt: "v4l2_capability" })
        );
    }

    #[test]
    fn fmtdesc_must_echo_index() {
        let mut fmt: FmtDesc = unsafe { mem::zeroed() };
        fmt.index = 3;
        fmt.type_ = 1;
        fmt.description[..5].copy_from_slice(b"YUYV\0");
        fmt.pixelformat = 0x5659_5559;
        assert_eq!(
            check_fmtdesc(&fmt, 2, 1),
            Err(Violation::IndexChanged { expected: 2, got: 3 })
        );
        assert_eq!(check_fmtdesc(&fmt, 3, 1), Ok(()));
    }

    #[test]
    fn stepwise_range_checked() {
        let mut frm: FrmSizeEnum = unsafe { mem::zeroed() };
        frm.pixel_format = 1;
        frm.type_ = FRMSIZE_TYPE_STEPWISE;
        frm.size.stepwise = FrmSizeStepwise {
            min_width: 32,
            max_width: 640,
            step_width: 16,
            min_height: 32,
            max_height: 480,
            step_height: 16,
        };
        assert_eq!(check_frmsizeenum(&frm, 0, 1), Ok(()));

        frm.size.stepwise = FrmSizeStepwise {
            step_width: 7,
            ..unsafe { frm.size.stepwise }
        };
        assert_eq!(
            check_frmsizeenum(&frm, 0, 1),
            Err(Violation::StepMismatch { min: 32, max: 640, step: 7 })
        );
    }

    #[test]
    fn discrete_needs_nonzero_dimensions() {
        let mut frm: FrmSizeEnum = unsafe { mem::zeroed() };
        frm.pixel_format = 1;
        frm.type_ = FRMSIZE_TYPE_DISCRETE;
        frm.size.discrete = crate::types::FrmSizeDiscrete {
            width: 640,
            height: 0,
        };
        assert_eq!(
            check_frmsizeenum(&frm, 0, 1),
            Err(Violation::ZeroValue { field: "discrete.height" })
        );
    }

    #[test]
    fn input_type_range() {
        let mut input: Input = unsafe { mem::zeroed() };
        input.name[..7].copy_from_slice(b"Camera\0");
        input.type_ = INPUT_TYPE_CAMERA;
        assert_eq!(check_input(&input, 0), Ok(()));

        input.type_ = 9;
        assert_eq!(
            check_input(&input, 0),
            Err(Violation::BadEnum { field: "type", got: 9 })
        );
    }
}
