//! libltpv4l2 - V4L2 conformance scaffolding
//!
//! The video tests all follow the same pattern: open the configured
//! /dev/videoN, drive one enumeration or query ioctl, and validate every
//! struct the driver hands back against the videodev2.h contract. This crate
//! holds the shared pieces: UAPI struct mirrors with pinned layouts
//! ([`types`]), the device handle ([`device`]), per-struct validators
//! ([`validator`]), EINVAL-terminated enumeration drivers ([`foreach`]) and
//! TINFO dumps of what the driver reported ([`show`]).

pub mod device;
pub mod foreach;
pub mod show;
pub mod types;
pub mod validator;

pub use device::Device;
pub use foreach::EnumError;
pub use validator::Violation;
