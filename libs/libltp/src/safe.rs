//! SAFE_* syscall wrappers
//!
//! Thin wrappers over the raw calls that report TBROK with the caller's
//! file:line when they fail. Tests use these for plumbing that is not itself
//! under test, so a failure here always means broken test setup, not a
//! kernel bug.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::panic::Location;
use std::path::Path;

use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus};
use nix::unistd::{ForkResult, Pid};

use crate::Verdict;

fn cstring(path: &Path) -> CString {
    match CString::new(path.as_os_str().as_bytes()) {
        Ok(c) => c,
        Err(_) => CString::new("<embedded NUL>").unwrap(),
    }
}

#[track_caller]
fn brk_errno(e: Errno, what: std::fmt::Arguments) -> ! {
    let loc = Location::caller();
    crate::res::brk_at(
        loc.file(),
        loc.line(),
        Verdict::Brok,
        Some(e),
        what,
    );
}

#[track_caller]
pub fn open(path: &Path, flags: i32, mode: libc::mode_t) -> i32 {
    let c = cstring(path);
    match Errno::result(unsafe { libc::open(c.as_ptr(), flags, mode as libc::c_uint) }) {
        Ok(fd) => fd,
        Err(e) => brk_errno(e, format_args!("open({:?}, {:#o}) failed", path, flags)),
    }
}

#[track_caller]
pub fn close(fd: i32) {
    if let Err(e) = Errno::result(unsafe { libc::close(fd) }) {
        brk_errno(e, format_args!("close({}) failed", fd));
    }
}

#[track_caller]
pub fn read(fd: i32, buf: &mut [u8]) -> usize {
    match Errno::result(unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) }) {
        Ok(n) => n as usize,
        Err(e) => brk_errno(e, format_args!("read({}, ..., {}) failed", fd, buf.len())),
    }
}

#[track_caller]
pub fn write(fd: i32, buf: &[u8]) -> usize {
    match Errno::result(unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) }) {
        Ok(n) => n as usize,
        Err(e) => brk_errno(e, format_args!("write({}, ..., {}) failed", fd, buf.len())),
    }
}

/// write() that retries short writes.
#[track_caller]
pub fn write_all(fd: i32, mut buf: &[u8]) {
    while !buf.is_empty() {
        let n = write(fd, buf);
        buf = &buf[n..];
    }
}

#[track_caller]
pub fn lseek(fd: i32, offset: libc::off_t, whence: i32) -> libc::off_t {
    match Errno::result(unsafe { libc::lseek(fd, offset, whence) }) {
        Ok(off) => off,
        Err(e) => brk_errno(e, format_args!("lseek({}, {}, {}) failed", fd, offset, whence)),
    }
}

#[track_caller]
pub fn ftruncate(fd: i32, len: libc::off_t) {
    if let Err(e) = Errno::result(unsafe { libc::ftruncate(fd, len) }) {
        brk_errno(e, format_args!("ftruncate({}, {}) failed", fd, len));
    }
}

#[track_caller]
pub fn unlink(path: &Path) {
    let c = cstring(path);
    if let Err(e) = Errno::result(unsafe { libc::unlink(c.as_ptr()) }) {
        brk_errno(e, format_args!("unlink({:?}) failed", path));
    }
}

#[track_caller]
pub fn mkdir(path: &Path, mode: libc::mode_t) {
    let c = cstring(path);
    if let Err(e) = Errno::result(unsafe { libc::mkdir(c.as_ptr(), mode) }) {
        brk_errno(e, format_args!("mkdir({:?}, {:#o}) failed", path, mode));
    }
}

#[track_caller]
pub fn chdir(path: &Path) {
    let c = cstring(path);
    if let Err(e) = Errno::result(unsafe { libc::chdir(c.as_ptr()) }) {
        brk_errno(e, format_args!("chdir({:?}) failed", path));
    }
}

#[track_caller]
pub fn symlink(target: &Path, link: &Path) {
    let t = cstring(target);
    let l = cstring(link);
    if let Err(e) = Errno::result(unsafe { libc::symlink(t.as_ptr(), l.as_ptr()) }) {
        brk_errno(e, format_args!("symlink({:?}, {:?}) failed", target, link));
    }
}

#[track_caller]
pub fn pipe() -> (i32, i32) {
    let mut fds = [0i32; 2];
    match Errno::result(unsafe { libc::pipe(fds.as_mut_ptr()) }) {
        Ok(_) => (fds[0], fds[1]),
        Err(e) => brk_errno(e, format_args!("pipe() failed")),
    }
}

/// Anonymous-offset shared mapping of `fd`.
#[track_caller]
pub fn mmap(len: usize, prot: i32, flags: i32, fd: i32) -> *mut libc::c_void {
    let ptr = unsafe { libc::mmap(std::ptr::null_mut(), len, prot, flags, fd, 0) };
    if ptr == libc::MAP_FAILED {
        brk_errno(
            Errno::last(),
            format_args!("mmap({}, {:#x}, {:#x}, {}) failed", len, prot, flags, fd),
        );
    }
    ptr
}

/// Install `handler` with SA_RESTART and no extra blocked signals.
#[track_caller]
pub fn sigaction(sig: Signal, handler: SigHandler) {
    let action = SigAction::new(handler, SaFlags::SA_RESTART, SigSet::empty());
    if let Err(e) = unsafe { signal::sigaction(sig, &action) } {
        brk_errno(e, format_args!("sigaction({}) failed", sig));
    }
}

/// fork() for tests; insists the test declared `forks_child`.
#[track_caller]
pub fn fork() -> ForkResult {
    if !crate::test::forks_child_declared() {
        let loc = Location::caller();
        crate::res::brk_at(
            loc.file(),
            loc.line(),
            Verdict::Brok,
            None,
            format_args!("test.forks_child must be set!"),
        );
    }

    // Buffered result lines must not be duplicated into the child.
    use std::io::Write as _;
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();

    match unsafe { nix::unistd::fork() } {
        Ok(res) => res,
        Err(e) => brk_errno(e, format_args!("fork() failed")),
    }
}

#[track_caller]
pub fn waitpid(pid: Pid, flags: Option<WaitPidFlag>) -> WaitStatus {
    match nix::sys::wait::waitpid(pid, flags) {
        Ok(status) => status,
        Err(e) => brk_errno(e, format_args!("waitpid({}) failed", pid)),
    }
}

#[track_caller]
pub fn setpgid(pid: Pid, pgid: Pid) {
    if let Err(e) = nix::unistd::setpgid(pid, pgid) {
        brk_errno(e, format_args!("setpgid({}, {}) failed", pid, pgid));
    }
}

/// Read a whole file, TBROK on failure. /proc-friendly.
#[track_caller]
pub fn read_to_string(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(err) => {
            let e = err
                .raw_os_error()
                .map(Errno::from_raw)
                .unwrap_or(Errno::EIO);
            brk_errno(e, format_args!("reading {:?} failed", path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cstring_embeds_paths() {
        let c = cstring(Path::new("/proc/swaps"));
        assert_eq!(c.as_bytes(), b"/proc/swaps");
    }
}
