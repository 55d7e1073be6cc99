//! Direct syscall shims
//!
//! Calls issued through `syscall(2)` rather than the libc wrappers, either
//! because older C libraries lack the wrapper or because the test must hit
//! the kernel entry point itself.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::errno::Errno;

fn cstring(path: &Path) -> Result<CString, Errno> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| Errno::EINVAL)
}

/// swapon(2) flags: discard freed swap pages.
pub const SWAP_FLAG_DISCARD: i32 = 0x10000;
/// swapon(2) flags: priority is given in the low bits.
pub const SWAP_FLAG_PREFER: i32 = 0x8000;

/// swapon(2)
pub fn swapon(path: &Path, flags: i32) -> Result<(), Errno> {
    let c = cstring(path)?;
    let ret = unsafe { libc::syscall(libc::SYS_swapon, c.as_ptr(), flags) };
    Errno::result(ret).map(drop)
}

/// swapoff(2)
pub fn swapoff(path: &Path) -> Result<(), Errno> {
    let c = cstring(path)?;
    let ret = unsafe { libc::syscall(libc::SYS_swapoff, c.as_ptr()) };
    Errno::result(ret).map(drop)
}

/// getrandom(2) flags
pub const GRND_NONBLOCK: u32 = 0x0001;
pub const GRND_RANDOM: u32 = 0x0002;

/// getrandom(2); returns the number of bytes filled in.
pub fn getrandom(buf: &mut [u8], flags: u32) -> Result<usize, Errno> {
    let ret = unsafe {
        libc::syscall(
            libc::SYS_getrandom,
            buf.as_mut_ptr(),
            buf.len(),
            flags,
        )
    };
    Errno::result(ret).map(|n| n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_in_path_is_einval() {
        let path = Path::new("bad\0path");
        assert_eq!(swapon(path, 0), Err(Errno::EINVAL));
    }

    #[test]
    fn getrandom_fills_buffer() {
        let mut buf = [0u8; 16];
        let n = getrandom(&mut buf, 0).unwrap();
        assert_eq!(n, 16);
    }
}
