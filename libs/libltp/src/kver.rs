//! Kernel version parsing and comparison (tst_kvercmp)

use once_cell::sync::Lazy;

/// A `major.minor.patch` kernel version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KernelVersion {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

impl KernelVersion {
    pub const fn new(major: i32, minor: i32, patch: i32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

/// Parse a release string like `5.15.0-89-generic` or `6.1`.
///
/// Distro suffixes after the numeric components are ignored, the way LTP's
/// `tst_parse_kver` scans with `%d.%d.%d`.
pub fn parse(release: &str) -> Option<KernelVersion> {
    let mut parts = release.splitn(3, '.');

    let major: i32 = parts.next()?.parse().ok()?;
    let minor: i32 = leading_int(parts.next()?)?;
    let patch = parts.next().and_then(leading_int).unwrap_or(0);

    Some(KernelVersion::new(major, minor, patch))
}

fn leading_int(s: &str) -> Option<i32> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

static RUNNING: Lazy<Option<KernelVersion>> = Lazy::new(|| {
    let uts = nix::sys::utsname::uname().ok()?;
    parse(uts.release().to_str()?)
});

/// The running kernel's version, if the release string parsed.
pub fn running() -> Option<KernelVersion> {
    *RUNNING
}

/// Compare the running kernel against `major.minor.patch`.
///
/// Returns <0 when the running kernel is older, 0 when equal, >0 when newer.
/// An unparseable running version compares as equal, which keeps version
/// gates permissive on exotic kernels.
pub fn tst_kvercmp(major: i32, minor: i32, patch: i32) -> i32 {
    let cur = match running() {
        Some(v) => v,
        None => return 0,
    };

    match cur.cmp(&KernelVersion::new(major, minor, patch)) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_versions() {
        assert_eq!(parse("4.14.0"), Some(KernelVersion::new(4, 14, 0)));
        assert_eq!(parse("6.1"), Some(KernelVersion::new(6, 1, 0)));
    }

    #[test]
    fn parses_distro_releases() {
        assert_eq!(
            parse("5.15.0-89-generic"),
            Some(KernelVersion::new(5, 15, 0))
        );
        assert_eq!(parse("6.5.7-arch1-1"), Some(KernelVersion::new(6, 5, 7)));
        assert_eq!(parse("4.18.0-425.el8"), Some(KernelVersion::new(4, 18, 0)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse("linux"), None);
        assert_eq!(parse("6"), None);
    }

    #[test]
    fn ordering() {
        assert!(KernelVersion::new(2, 6, 32) < KernelVersion::new(2, 6, 33));
        assert!(KernelVersion::new(3, 0, 0) > KernelVersion::new(2, 6, 39));
        assert!(KernelVersion::new(5, 1, 0) > KernelVersion::new(4, 14, 7));
    }
}
