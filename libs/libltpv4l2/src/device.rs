//! Video device handle
//!
//! The conformance tests run against whatever device `LTP_V4L2_DEVICE` names,
//! defaulting to /dev/video0. A missing or unopenable device is a
//! configuration gap, not a failure, so [`Device::require`] ends the test
//! with TCONF.

use std::env;
use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::PathBuf;

use nix::errno::Errno;
use tracing::debug;

use libltp::tst_brk;

const DEVICE_ENV: &str = "LTP_V4L2_DEVICE";
const DEFAULT_DEVICE: &str = "/dev/video0";

pub struct Device {
    file: File,
    path: PathBuf,
}

impl Device {
    /// Path the tests will probe, from the environment or the default.
    pub fn configured_path() -> PathBuf {
        PathBuf::from(env::var(DEVICE_ENV).unwrap_or_else(|_| DEFAULT_DEVICE.into()))
    }

    /// Open the configured device read/write, if present.
    pub fn open() -> Option<Device> {
        let path = Self::configured_path();
        match File::options().read(true).write(true).open(&path) {
            Ok(file) => {
                debug!("opened {:?}", path);
                Some(Device { file, path })
            }
            Err(e) => {
                debug!("cannot open {:?}: {}", path, e);
                None
            }
        }
    }

    /// Open the configured device or end the test with TCONF.
    pub fn require() -> Device {
        match Self::open() {
            Some(dev) => dev,
            None => tst_brk!(
                Conf,
                "No video device at {:?} (set {} to override)",
                Self::configured_path(),
                DEVICE_ENV
            ),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Issue an ioctl with `arg` as the in/out payload.
    pub fn ioctl<T>(&self, request: libc::c_ulong, arg: &mut T) -> Result<(), Errno> {
        let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), request, arg as *mut T) };
        Errno::result(ret).map(drop)
    }

    /// Issue an ioctl taking a plain int, as VIDIOC_G_INPUT/S_INPUT do.
    pub fn ioctl_int(&self, request: libc::c_ulong, arg: &mut libc::c_int) -> Result<(), Errno> {
        self.ioctl(request, arg)
    }
}
