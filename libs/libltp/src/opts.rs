//! Command line option handling
//!
//! Every test accepts the standard harness options (`-i`, `-I`, `-h`) plus
//! whatever single-letter options its `TestCase` declares. The parser is
//! assembled at runtime on clap so per-test options get proper usage output
//! for free.

use std::collections::HashMap;

use clap::{Arg, ArgAction, Command};
use once_cell::sync::OnceCell;

use crate::test::TestOption;
use crate::tst_brk;

/// Parsed command line state for the running test.
#[derive(Debug)]
pub struct ParsedOpts {
    /// `-i n`: run the test function(s) n times.
    pub iterations: u32,
    /// `-I x`: keep iterating for x seconds.
    pub duration: Option<f32>,
    values: HashMap<char, Option<String>>,
}

static OPTS: OnceCell<ParsedOpts> = OnceCell::new();

const RESERVED: &[char] = &['i', 'I', 'h'];

fn build_command(tid: &str, options: &'static [TestOption]) -> Command {
    let mut cmd = Command::new(tid.to_string())
        .disable_version_flag(true)
        .arg(
            Arg::new("iterations")
                .short('i')
                .value_name("n")
                .help("Execute test n times")
                .value_parser(clap::value_parser!(u32))
                .default_value("1"),
        )
        .arg(
            Arg::new("duration")
                .short('I')
                .value_name("x")
                .help("Execute test for n seconds")
                .value_parser(clap::value_parser!(f32)),
        );

    for o in options {
        let mut arg = Arg::new(o.flag.to_string()).short(o.flag).help(o.help);
        if o.takes_arg {
            arg = arg.value_name("ARG");
        } else {
            arg = arg.action(ArgAction::SetTrue);
        }
        cmd = cmd.arg(arg);
    }

    cmd
}

pub(crate) fn parse(tid: &str, options: &'static [TestOption]) -> &'static ParsedOpts {
    for o in options {
        if RESERVED.contains(&o.flag) {
            tst_brk!(Brok, "Option collision '-{}'", o.flag);
        }
    }

    let matches = match build_command(tid, options).try_get_matches() {
        Ok(m) => m,
        // Prints usage; exits nonzero on a real parse error.
        Err(e) => e.exit(),
    };

    let mut values = HashMap::new();
    for o in options {
        let id = o.flag.to_string();
        if o.takes_arg {
            if let Some(v) = matches.get_one::<String>(&id) {
                values.insert(o.flag, Some(v.clone()));
            }
        } else if matches.get_flag(&id) {
            values.insert(o.flag, None);
        }
    }

    let parsed = ParsedOpts {
        iterations: *matches.get_one::<u32>("iterations").unwrap_or(&1),
        duration: matches.get_one::<f32>("duration").copied(),
        values,
    };

    OPTS.get_or_init(|| parsed)
}

/// The parsed options of the running test.
pub fn current() -> &'static ParsedOpts {
    opts()
}

fn opts() -> &'static ParsedOpts {
    match OPTS.get() {
        Some(o) => o,
        None => tst_brk!(Brok, "options queried before TestCase::run()"),
    }
}

/// Whether `-flag` was given.
pub fn present(flag: char) -> bool {
    opts().values.contains_key(&flag)
}

/// The argument of `-flag`, if the option was given with one.
pub fn get(flag: char) -> Option<&'static str> {
    opts().values.get(&flag)?.as_deref()
}

/// Parse the argument of `-flag` as an integer within [min, max].
///
/// Missing option yields None; a malformed or out-of-range value breaks the
/// test, matching `tst_parse_long`.
pub fn parse_i64(flag: char, min: i64, max: i64) -> Option<i64> {
    let raw = get(flag)?;
    let val: i64 = match raw.parse() {
        Ok(v) => v,
        Err(_) => tst_brk!(Brok, "-{}: '{}' is not an integer", flag, raw),
    };
    if val < min || val > max {
        tst_brk!(Brok, "-{}: {} out of range [{}, {}]", flag, val, min, max);
    }
    Some(val)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_flags() {
        assert!(RESERVED.contains(&'i'));
        assert!(RESERVED.contains(&'I'));
        assert!(RESERVED.contains(&'h'));
    }

    // Arg ids are built from single-char flags at runtime, so the command
    // must accept owned String ids.
    #[test]
    fn command_accepts_runtime_flags() {
        static TBL: &[TestOption] = &[
            TestOption { flag: 's', takes_arg: true, help: "swapfile size" },
            TestOption { flag: 'v', takes_arg: false, help: "verbose" },
        ];
        let m = build_command("opts_selftest", TBL)
            .try_get_matches_from(["opts_selftest", "-i", "3", "-s", "64", "-v"])
            .unwrap();
        assert_eq!(*m.get_one::<u32>("iterations").unwrap(), 3);
        assert_eq!(m.get_one::<String>("s").unwrap(), "64");
        assert!(m.get_flag("v"));
    }
}
