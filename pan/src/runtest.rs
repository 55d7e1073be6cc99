//! Runtest command files
//!
//! The classic format: one test per line, `tag command args...`, with `#`
//! starting a comment and blank lines ignored. Tags name the test in the
//! output log and the results file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEntry {
    pub tag: String,
    pub command: String,
    pub args: Vec<String>,
}

impl TestEntry {
    pub fn cmdline(&self) -> String {
        let mut s = self.command.clone();
        for a in &self.args {
            s.push(' ');
            s.push_str(a);
        }
        s
    }
}

pub fn parse(text: &str) -> Result<Vec<TestEntry>> {
    let mut entries = Vec::new();

    for (lineno, raw) in text.lines().enumerate() {
        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        let mut words = line.split_whitespace();

        let Some(tag) = words.next() else { continue };
        let Some(command) = words.next() else {
            bail!("line {}: tag '{}' has no command", lineno + 1, tag);
        };

        entries.push(TestEntry {
            tag: tag.to_string(),
            command: command.to_string(),
            args: words.map(str::to_string).collect(),
        });
    }

    Ok(entries)
}

pub fn load(path: &Path) -> Result<Vec<TestEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading runtest file {:?}", path))?;
    let entries = parse(&text).with_context(|| format!("parsing {:?}", path))?;
    if entries.is_empty() {
        bail!("runtest file {:?} contains no tests", path);
    }
    Ok(entries)
}

/// Optional YAML defaults, overridden by the command line.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PanConfig {
    pub timeout_secs: Option<u64>,
    pub concurrency: Option<usize>,
    pub fail_fast: Option<bool>,
    pub output: Option<PathBuf>,
    pub results: Option<PathBuf>,
    pub active_file: Option<PathBuf>,
}

impl PanConfig {
    pub fn load(path: &Path) -> Result<PanConfig> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {:?}", path))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_comments_and_blanks() {
        let entries = parse(
            "# swap coverage\n\
             swapon01 swapon01\n\
             \n\
             swapon02 swapon02 -i 5  # errno table\n",
        )
        .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].tag, "swapon01");
        assert_eq!(entries[0].args.is_empty(), true);
        assert_eq!(entries[1].command, "swapon02");
        assert_eq!(entries[1].args, vec!["-i", "5"]);
        assert_eq!(entries[1].cmdline(), "swapon02 -i 5");
    }

    #[test]
    fn rejects_tag_without_command() {
        assert!(parse("lonely-tag\n").is_err());
    }

    #[test]
    fn config_parses_partial_yaml() {
        let cfg: PanConfig = serde_yaml::from_str("timeout_secs: 300\nfail_fast: true\n").unwrap();
        assert_eq!(cfg.timeout_secs, Some(300));
        assert_eq!(cfg.fail_fast, Some(true));
        assert!(cfg.output.is_none());
    }
}
