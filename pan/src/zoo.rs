//! Active file ("zoo") tracking
//!
//! While a test runs, one `pid,tag,command` line sits in the active file, so
//! a crashed runner leaves evidence of what was in flight and a watchdog can
//! find and kill orphans. The file is flocked for the duration of every
//! rewrite; stale entries from a previous incarnation are dropped on open.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, Write};
use std::os::fd::AsRawFd;
use std::path::Path;

use anyhow::{Context, Result};
use nix::errno::Errno;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZooEntry {
    pub pid: u32,
    pub tag: String,
    pub cmdline: String,
}

impl ZooEntry {
    fn to_line(&self) -> String {
        format!("{},{},{}\n", self.pid, self.tag, self.cmdline)
    }

    fn parse(line: &str) -> Option<ZooEntry> {
        let mut parts = line.splitn(3, ',');
        Some(ZooEntry {
            pid: parts.next()?.trim().parse().ok()?,
            tag: parts.next()?.to_string(),
            cmdline: parts.next().unwrap_or("").to_string(),
        })
    }
}

pub struct Zoo {
    file: File,
    running: BTreeMap<u32, ZooEntry>,
}

impl Zoo {
    pub fn open(path: &Path) -> Result<Zoo> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("opening active file {:?}", path))?;

        lock(&file)?;
        let mut old = String::new();
        file.read_to_string(&mut old).ok();
        for line in old.lines().filter(|l| !l.trim().is_empty()) {
            warn!("stale active entry dropped: {}", line);
        }
        let res = truncate_to(&mut file, "");
        unlock(&file);
        res?;

        Ok(Zoo {
            file,
            running: BTreeMap::new(),
        })
    }

    pub fn add(&mut self, pid: u32, tag: &str, cmdline: &str) -> Result<()> {
        self.running.insert(
            pid,
            ZooEntry {
                pid,
                tag: tag.to_string(),
                cmdline: cmdline.to_string(),
            },
        );
        self.rewrite()
    }

    pub fn remove(&mut self, pid: u32) -> Result<()> {
        self.running.remove(&pid);
        self.rewrite()
    }

    pub fn entries(&self) -> Vec<ZooEntry> {
        self.running.values().cloned().collect()
    }

    fn rewrite(&mut self) -> Result<()> {
        let mut body = String::new();
        for entry in self.running.values() {
            body.push_str(&entry.to_line());
        }
        lock(&self.file)?;
        let res = truncate_to(&mut self.file, &body);
        unlock(&self.file);
        res
    }
}

fn lock(file: &File) -> Result<()> {
    let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    Errno::result(ret)
        .map(drop)
        .context("locking active file")
}

fn unlock(file: &File) {
    unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
}

fn truncate_to(file: &mut File, body: &str) -> Result<()> {
    file.set_len(0).context("truncating active file")?;
    file.rewind().context("rewinding active file")?;
    file.write_all(body.as_bytes())
        .context("writing active file")?;
    file.flush().context("flushing active file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trip() {
        let e = ZooEntry {
            pid: 1234,
            tag: "swapon01".into(),
            cmdline: "swapon01 -i 3".into(),
        };
        assert_eq!(ZooEntry::parse(e.to_line().trim()), Some(e));
    }

    #[test]
    fn parse_tolerates_missing_cmdline() {
        let e = ZooEntry::parse("42,tag").unwrap();
        assert_eq!(e.pid, 42);
        assert_eq!(e.cmdline, "");
        assert_eq!(ZooEntry::parse("not-a-pid,tag,cmd"), None);
    }

    #[test]
    fn add_and_remove_track_running_set() {
        let dir = std::env::temp_dir().join(format!("pan-zoo-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("active");

        let mut zoo = Zoo::open(&path).unwrap();
        zoo.add(10, "a", "a --x").unwrap();
        zoo.add(20, "b", "b").unwrap();
        assert_eq!(zoo.entries().len(), 2);

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("10,a,a --x"));
        assert!(on_disk.contains("20,b,b"));

        zoo.remove(10).unwrap();
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(!on_disk.contains("10,a"));
        assert!(on_disk.contains("20,b,b"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
