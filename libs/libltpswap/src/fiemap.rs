//! FS_IOC_FIEMAP plumbing
//!
//! Minimal mirror of the kernel's fiemap UAPI, used to ask how many physical
//! extents back a file. Swapfiles must be contiguous on filesystems without
//! a bmap operation, so the swap helpers check for a single extent.

use std::mem;
use std::os::fd::AsRawFd;

use nix::errno::Errno;

pub const FIEMAP_FLAG_SYNC: u32 = 0x0000_0001;
pub const FIEMAP_EXTENT_LAST: u32 = 0x0000_0001;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FiemapExtent {
    pub fe_logical: u64,
    pub fe_physical: u64,
    pub fe_length: u64,
    pub fe_reserved64: [u64; 2],
    pub fe_flags: u32,
    pub fe_reserved: [u32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Fiemap {
    pub fm_start: u64,
    pub fm_length: u64,
    pub fm_flags: u32,
    pub fm_mapped_extents: u32,
    pub fm_extent_count: u32,
    pub fm_reserved: u32,
}

/// One fiemap request with room for a single extent, as the contiguity
/// check needs.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct FiemapOneExtent {
    map: Fiemap,
    extent: FiemapExtent,
}

// _IOWR('f', 11, struct fiemap)
fn fs_ioc_fiemap() -> libc::c_ulong {
    nix::request_code_readwrite!(b'f', 11, mem::size_of::<Fiemap>()) as libc::c_ulong
}

/// Whether the open file maps to exactly one physical extent.
pub fn file_is_contiguous<F: AsRawFd>(file: &F) -> Result<bool, Errno> {
    let mut req = FiemapOneExtent::default();
    req.map.fm_start = 0;
    req.map.fm_length = u64::MAX;
    req.map.fm_flags = FIEMAP_FLAG_SYNC;
    req.map.fm_extent_count = 1;

    let ret = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            fs_ioc_fiemap(),
            &mut req as *mut FiemapOneExtent,
        )
    };
    Errno::result(ret)?;

    Ok(req.map.fm_mapped_extents == 1 && req.extent.fe_flags & FIEMAP_EXTENT_LAST != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uapi_struct_sizes() {
        // Must match include/uapi/linux/fiemap.h exactly.
        assert_eq!(mem::size_of::<Fiemap>(), 32);
        assert_eq!(mem::size_of::<FiemapExtent>(), 56);
        assert_eq!(mem::size_of::<FiemapOneExtent>(), 88);
    }

    #[test]
    fn contiguous_regular_extent() {
        let mut req = FiemapOneExtent::default();
        req.map.fm_mapped_extents = 1;
        req.extent.fe_flags = FIEMAP_EXTENT_LAST;
        assert!(req.map.fm_mapped_extents == 1 && req.extent.fe_flags & FIEMAP_EXTENT_LAST != 0);
    }

    #[test]
    fn fragmented_file_detected() {
        // Two extents: the first one returned is not the last.
        let mut req = FiemapOneExtent::default();
        req.map.fm_mapped_extents = 2;
        req.extent.fe_flags = 0;
        assert!(!(req.map.fm_mapped_extents == 1 && req.extent.fe_flags & FIEMAP_EXTENT_LAST != 0));
    }
}
