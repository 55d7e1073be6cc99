//! pan - rust-ltp test runner
//!
//! Takes a runtest file, runs every entry in its own process group, prefixes
//! each line of test output with its tag, tracks in-flight tests in an
//! active file and writes a JSON results file at the end. Tests run
//! sequentially by default; `-x N` runs N at a time on tokio.

mod report;
mod runtest;
mod zoo;

use std::io::Write as _;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::report::{Report, TestResult, Verdict};
use crate::runtest::{PanConfig, TestEntry};
use crate::zoo::Zoo;

#[derive(Parser)]
#[command(name = "pan")]
#[command(about = "rust-ltp test runner")]
struct Args {
    /// Runtest file: one `tag command args...` per line
    #[arg(short = 'f', long = "file")]
    runtest: PathBuf,

    /// YAML config with defaults for the options below
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of tests to run concurrently
    #[arg(short = 'x', long)]
    concurrency: Option<usize>,

    /// Stop launching tests after the first failure
    #[arg(short = 'F', long)]
    fail_fast: bool,

    /// Per-test timeout in seconds; the whole process group is killed
    #[arg(short = 't', long)]
    timeout: Option<u64>,

    /// Tagged output log (defaults to stdout)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// JSON results file
    #[arg(short = 'r', long)]
    results: Option<PathBuf>,

    /// Active file tracking running tests
    #[arg(short = 'a', long)]
    active_file: Option<PathBuf>,
}

struct Settings {
    concurrency: usize,
    fail_fast: bool,
    timeout: Option<Duration>,
    output: Option<PathBuf>,
    results: Option<PathBuf>,
    active_file: Option<PathBuf>,
}

impl Settings {
    fn merge(args: Args, cfg: PanConfig) -> Settings {
        Settings {
            concurrency: args.concurrency.or(cfg.concurrency).unwrap_or(1).max(1),
            fail_fast: args.fail_fast || cfg.fail_fast.unwrap_or(false),
            timeout: args
                .timeout
                .or(cfg.timeout_secs)
                .map(Duration::from_secs),
            output: args.output.or(cfg.output),
            results: args.results.or(cfg.results),
            active_file: args.active_file.or(cfg.active_file),
        }
    }
}

type OutputLog = Arc<Mutex<Box<dyn std::io::Write + Send>>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = match &args.config {
        Some(path) => PanConfig::load(path)?,
        None => PanConfig::default(),
    };
    let entries = runtest::load(&args.runtest)?;
    let settings = Settings::merge(args, cfg);

    let log: OutputLog = Arc::new(Mutex::new(match &settings.output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("creating output log {:?}", path))?,
        ),
        None => Box::new(std::io::stdout()),
    }));

    let zoo = match &settings.active_file {
        Some(path) => Some(Arc::new(Mutex::new(Zoo::open(path)?))),
        None => None,
    };

    info!(
        "running {} tests, {} at a time",
        entries.len(),
        settings.concurrency
    );
    let started_at = Utc::now();

    let semaphore = Arc::new(Semaphore::new(settings.concurrency));
    let stop = Arc::new(AtomicBool::new(false));
    let mut handles = Vec::with_capacity(entries.len());

    for entry in entries {
        let semaphore = semaphore.clone();
        let stop = stop.clone();
        let log = log.clone();
        let zoo = zoo.clone();
        let fail_fast = settings.fail_fast;
        let timeout = settings.timeout;

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.ok()?;
            if stop.load(Ordering::SeqCst) {
                warn!("{}: not started (fail-fast)", entry.tag);
                return None;
            }

            let result = match run_one(&entry, timeout, &log, zoo.as_deref()).await {
                Ok(r) => r,
                // A test that never ran still counts, as broken.
                Err(e) => {
                    warn!("{}: failed to run: {:#}", entry.tag, e);
                    spawn_failure(&entry)
                }
            };

            info!(
                "{}: {} ({:.1}s)",
                result.tag,
                result.verdict.as_str(),
                result.duration_secs
            );
            if fail_fast && !matches!(result.verdict, Verdict::Pass | Verdict::Conf) {
                stop.store(true, Ordering::SeqCst);
            }
            Some(result)
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        if let Ok(Some(result)) = handle.await {
            results.push(result);
        }
    }

    let report = Report::new(started_at, results);
    info!(
        "passed {} failed {} skipped {} broken {}",
        report.summary.passed, report.summary.failed, report.summary.skipped, report.summary.broken
    );
    if let Some(path) = &settings.results {
        report.write_json(path)?;
    }

    if !report.all_good() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_one(
    entry: &TestEntry,
    timeout: Option<Duration>,
    log: &OutputLog,
    zoo: Option<&Mutex<Zoo>>,
) -> Result<TestResult> {
    let started_at = Utc::now();
    let clock = std::time::Instant::now();

    let mut cmd = Command::new(&entry.command);
    cmd.args(&entry.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    // Own process group, so a timeout kill reaps the test's children too.
    unsafe {
        cmd.pre_exec(|| {
            libc::setpgid(0, 0);
            Ok(())
        });
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning {}", entry.cmdline()))?;
    let pid = child.id().unwrap_or(0);

    if let Some(zoo) = zoo {
        let mut zoo = zoo.lock().unwrap();
        zoo.add(pid, &entry.tag, &entry.cmdline())?;
    }

    let stdout = child.stdout.take().context("no stdout pipe")?;
    let stderr = child.stderr.take().context("no stderr pipe")?;
    let out_task = tokio::spawn(relay(entry.tag.clone(), stdout, log.clone()));
    let err_task = tokio::spawn(relay(entry.tag.clone(), stderr, log.clone()));

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!("{}: timed out after {:?}, killing group", entry.tag, limit);
                unsafe { libc::kill(-(pid as i32), libc::SIGKILL) };
                child.wait().await?
            }
        },
        None => child.wait().await?,
    };

    out_task.await.ok();
    err_task.await.ok();

    if let Some(zoo) = zoo {
        let mut zoo = zoo.lock().unwrap();
        zoo.remove(pid)?;
    }

    use std::os::unix::process::ExitStatusExt;
    Ok(TestResult {
        tag: entry.tag.clone(),
        cmdline: entry.cmdline(),
        verdict: report::classify(status),
        exit_code: status.code(),
        signal: status.signal(),
        duration_secs: clock.elapsed().as_secs_f64(),
        started_at,
        finished_at: Utc::now(),
    })
}

/// Result recorded for a test whose process could not be started at all.
fn spawn_failure(entry: &TestEntry) -> TestResult {
    let now = Utc::now();
    TestResult {
        tag: entry.tag.clone(),
        cmdline: entry.cmdline(),
        verdict: Verdict::Brok,
        exit_code: None,
        signal: None,
        duration_secs: 0.0,
        started_at: now,
        finished_at: now,
    }
}

/// Copy one output stream into the log, a line at a time, tag-prefixed.
async fn relay<R>(tag: String, stream: R, log: OutputLog)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut log = log.lock().unwrap();
        let _ = writeln!(log, "{}: {}", tag, line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_failure_breaks_the_run() {
        let entry = TestEntry {
            tag: "ghost01".into(),
            command: "/nonexistent/ghost01".into(),
            args: vec!["-i".into(), "2".into()],
        };

        let result = spawn_failure(&entry);
        assert_eq!(result.verdict, Verdict::Brok);
        assert_eq!(result.exit_code, None);
        assert_eq!(result.signal, None);
        assert_eq!(result.cmdline, "/nonexistent/ghost01 -i 2");

        let report = Report::new(Utc::now(), vec![result]);
        assert_eq!(report.summary.broken, 1);
        assert!(!report.all_good());
    }
}
