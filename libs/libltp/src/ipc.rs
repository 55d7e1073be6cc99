//! Shared results page and checkpoints
//!
//! One page of file-backed shared memory carries the per-verdict counters
//! plus an array of futex words used as checkpoints between the test process
//! and its forked (or exec'd) children. The backing file is unlinked right
//! after mapping unless checkpoints are requested, in which case its path is
//! exported through `LTP_IPC_PATH` so exec'd children can re-map it with
//! [`reinit`].

use std::path::PathBuf;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU32, AtomicUsize, Ordering};

use nix::errno::Errno;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::tst_brk;

pub const IPC_ENV_VAR: &str = "LTP_IPC_PATH";

/// Per-verdict counters, updated atomically from any process of the test.
#[repr(C)]
pub struct Results {
    passed: AtomicU32,
    failed: AtomicU32,
    skipped: AtomicU32,
    warnings: AtomicU32,
    timeout: AtomicU32,
}

impl Results {
    pub fn passed(&self) -> u32 {
        self.passed.load(Ordering::Relaxed)
    }
    pub fn failed(&self) -> u32 {
        self.failed.load(Ordering::Relaxed)
    }
    pub fn skipped(&self) -> u32 {
        self.skipped.load(Ordering::Relaxed)
    }
    pub fn warnings(&self) -> u32 {
        self.warnings.load(Ordering::Relaxed)
    }
    pub fn timeout(&self) -> u32 {
        self.timeout.load(Ordering::Relaxed)
    }

    pub fn inc_passed(&self) {
        self.passed.fetch_add(1, Ordering::Relaxed);
    }
    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }
    pub fn inc_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }
    pub fn inc_warnings(&self) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
    }
    pub fn set_timeout(&self, secs: u32) {
        self.timeout.store(secs, Ordering::Relaxed);
    }

    /// Snapshot used to detect iterations that report nothing.
    pub fn snapshot(&self) -> (u32, u32, u32) {
        (self.passed(), self.failed(), self.skipped())
    }
}

static PAGE: AtomicPtr<libc::c_void> = AtomicPtr::new(ptr::null_mut());
static FUTEX_COUNT: AtomicUsize = AtomicUsize::new(0);
static SHM_PATH: OnceCell<PathBuf> = OnceCell::new();

fn page_size() -> usize {
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

/// The shared counters, once [`setup`] or [`reinit`] mapped the page.
pub fn results() -> Option<&'static Results> {
    let ptr = PAGE.load(Ordering::Acquire);
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { &*(ptr as *const Results) })
    }
}

fn futexes() -> &'static [AtomicU32] {
    let ptr = PAGE.load(Ordering::Acquire);
    let count = FUTEX_COUNT.load(Ordering::Acquire);
    if ptr.is_null() || count == 0 {
        tst_brk!(Brok, "checkpoints are not set up (needs_checkpoints?)");
    }
    unsafe {
        let base = (ptr as *const u8).add(std::mem::size_of::<Results>()) as *const AtomicU32;
        std::slice::from_raw_parts(base, count)
    }
}

fn map_fd(fd: i32, size: usize) -> *mut libc::c_void {
    crate::safe::mmap(
        size,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_SHARED,
        fd,
    )
}

/// Create and map the results page. Must run before the test child forks.
pub fn setup(tid: &str, needs_checkpoints: bool) {
    let size = page_size();

    let dir = if std::path::Path::new("/dev/shm").exists() {
        PathBuf::from("/dev/shm")
    } else {
        std::env::temp_dir()
    };
    let path = dir.join(format!("ltp_{}_{}", tid, std::process::id()));

    let fd = crate::safe::open(
        &path,
        libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
        0o600,
    );
    crate::safe::ftruncate(fd, size as libc::off_t);

    let ptr = map_fd(fd, size);
    crate::safe::close(fd);

    if needs_checkpoints {
        // Exec'd children find the page through the environment.
        std::env::set_var(IPC_ENV_VAR, &path);
        FUTEX_COUNT.store(
            (size - std::mem::size_of::<Results>()) / std::mem::size_of::<u32>(),
            Ordering::Release,
        );
        let _ = SHM_PATH.set(path);
    } else {
        crate::safe::unlink(&path);
    }

    PAGE.store(ptr, Ordering::Release);
    debug!("results page mapped ({} bytes)", size);
}

/// Re-map the results page in a child that went through exec().
pub fn reinit() {
    let path = match std::env::var(IPC_ENV_VAR) {
        Ok(p) => p,
        Err(_) => tst_brk!(Brok, "{} is not defined", IPC_ENV_VAR),
    };

    if !std::path::Path::new(&path).exists() {
        tst_brk!(Brok, "File {} does not exist!", path);
    }

    let size = page_size();
    let fd = crate::safe::open(std::path::Path::new(&path), libc::O_RDWR, 0);
    let ptr = map_fd(fd, size);
    crate::safe::close(fd);

    FUTEX_COUNT.store(
        (size - std::mem::size_of::<Results>()) / std::mem::size_of::<u32>(),
        Ordering::Release,
    );
    PAGE.store(ptr, Ordering::Release);
}

/// Unmap the page and drop the backing file if it is still around.
pub(crate) fn cleanup() {
    let ptr = PAGE.swap(ptr::null_mut(), Ordering::AcqRel);
    if ptr.is_null() {
        return;
    }

    let size = page_size();
    unsafe {
        libc::msync(ptr, size, libc::MS_SYNC);
        libc::munmap(ptr, size);
    }

    if let Some(path) = SHM_PATH.get() {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

fn futex(word: &AtomicU32, op: libc::c_int, val: u32, timeout: *const libc::timespec) -> i64 {
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            op,
            val,
            timeout,
            0usize,
            0usize,
        ) as i64
    }
}

/// Wait on a checkpoint until some process wakes it or the timeout expires.
pub fn checkpoint_try_wait(id: usize, timeout_ms: u32) -> Result<(), Errno> {
    let words = futexes();
    let word = &words[id];

    let ts = libc::timespec {
        tv_sec: (timeout_ms / 1000) as libc::time_t,
        tv_nsec: ((timeout_ms % 1000) * 1_000_000) as libc::c_long,
    };

    let val = word.load(Ordering::SeqCst);
    let ret = futex(word, libc::FUTEX_WAIT, val, &ts);
    if ret == -1 {
        let e = Errno::last();
        // The waker got there first; the changed word counts as a wakeup.
        if e == Errno::EAGAIN {
            return Ok(());
        }
        return Err(e);
    }
    Ok(())
}

/// Wake `nr_wake` waiters on a checkpoint, retrying until all showed up.
pub fn checkpoint_try_wake(id: usize, nr_wake: u32, timeout_ms: u32) -> Result<(), Errno> {
    let words = futexes();
    let word = &words[id];

    word.fetch_add(1, Ordering::SeqCst);

    let mut woken = 0u32;
    let mut elapsed_ms = 0u32;
    while woken < nr_wake {
        let ret = futex(word, libc::FUTEX_WAKE, nr_wake - woken, ptr::null());
        if ret == -1 {
            return Err(Errno::last());
        }
        woken += ret as u32;

        if woken < nr_wake {
            if elapsed_ms >= timeout_ms {
                return Err(Errno::ETIMEDOUT);
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
            elapsed_ms += 1;
        }
    }
    Ok(())
}

/// [`checkpoint_try_wait`] that breaks the test on failure.
#[track_caller]
pub fn checkpoint_wait(id: usize, timeout_ms: u32) {
    let loc = std::panic::Location::caller();
    if let Err(e) = checkpoint_try_wait(id, timeout_ms) {
        crate::res::brk_at(
            loc.file(),
            loc.line(),
            crate::Verdict::Brok,
            Some(e),
            format_args!("checkpoint_wait({}, {})", id, timeout_ms),
        );
    }
}

/// [`checkpoint_try_wake`] that breaks the test on failure.
#[track_caller]
pub fn checkpoint_wake(id: usize, nr_wake: u32, timeout_ms: u32) {
    let loc = std::panic::Location::caller();
    if let Err(e) = checkpoint_try_wake(id, nr_wake, timeout_ms) {
        crate::res::brk_at(
            loc.file(),
            loc.line(),
            crate::Verdict::Brok,
            Some(e),
            format_args!("checkpoint_wake({}, {})", id, nr_wake),
        );
    }
}
