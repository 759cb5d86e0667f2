//! Backtest adapter that runs an external executable per symbol.
//!
//! The child is started as `<executable> <symbol> <period>`, receives the
//! strategy selector as one line on stdin (answering its menu prompt), and
//! has its stdout captured. Exit status is not inspected.

use crate::domain::config_validation::timeout_from_secs;
use crate::domain::error::TickerCompareError;
use crate::domain::strategy::StrategySelector;
use crate::ports::backtest_port::BacktestPort;
use crate::ports::config_port::ConfigPort;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_EXECUTABLE: &str = "./bin/test_backtest";

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const DRAIN_GRACE: Duration = Duration::from_millis(100);

pub struct ProcessBacktestAdapter {
    executable: PathBuf,
    working_dir: Option<PathBuf>,
    max_duration: Option<Duration>,
}

impl ProcessBacktestAdapter {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            working_dir: None,
            max_duration: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Cap the wall-clock time of each run. On expiry the child is killed
    /// and whatever it printed so far is returned.
    pub fn with_max_duration(mut self, max: Duration) -> Self {
        self.max_duration = Some(max);
        self
    }

    /// Let each run take as long as it needs.
    pub fn without_max_duration(mut self) -> Self {
        self.max_duration = None;
        self
    }

    /// Build from the `[backtest]` config section. `timeout_secs = 0`
    /// (the default) means no cap.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TickerCompareError> {
        let executable = config
            .get_string("backtest", "executable")
            .unwrap_or_else(|| DEFAULT_EXECUTABLE.to_string());
        let mut adapter = Self::new(executable);

        if let Some(dir) = config.get_string("backtest", "working_dir") {
            adapter = adapter.with_working_dir(dir);
        }

        let timeout = config.get_double("backtest", "timeout_secs", 0.0);
        if timeout != 0.0 {
            adapter =
                adapter.with_max_duration(timeout_from_secs("backtest", "timeout_secs", timeout)?);
        }
        Ok(adapter)
    }

    pub fn executable(&self) -> &PathBuf {
        &self.executable
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }

    fn execute(
        &self,
        symbol: &str,
        period: &str,
        strategy: &StrategySelector,
    ) -> Result<String, TickerCompareError> {
        let mut command = Command::new(&self.executable);
        command
            .arg(symbol)
            .arg(period)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| TickerCompareError::ProcessLaunch {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // The child may exit before reading its prompt; a broken pipe here
            // is not an error.
            if let Err(e) = writeln!(stdin, "{}", strategy.code()) {
                debug!(symbol, error = %e, "could not write strategy selector");
            }
        }

        let stdout = Drain::spawn(child.stdout.take());
        let stderr = Drain::spawn(child.stderr.take());

        let timed_out = self.wait(&mut child, symbol)?;
        let grace = if timed_out { Some(DRAIN_GRACE) } else { None };

        let err_text = stderr.finish(grace);
        if !err_text.trim().is_empty() {
            debug!(symbol, stderr = %err_text.trim_end(), "backtest stderr");
        }

        let output = stdout.finish(grace);
        if timed_out {
            warn!(
                symbol,
                captured_bytes = output.len(),
                "backtest exceeded time limit, returning partial output"
            );
        }
        Ok(output)
    }

    /// Wait for the child, killing it if it outlives `max_duration`.
    /// Returns whether it was killed.
    fn wait(&self, child: &mut Child, symbol: &str) -> Result<bool, TickerCompareError> {
        let Some(max) = self.max_duration else {
            let status = child.wait()?;
            debug!(symbol, %status, "backtest finished");
            return Ok(false);
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                debug!(symbol, %status, "backtest finished");
                return Ok(false);
            }
            if started.elapsed() >= max {
                if let Err(e) = child.kill() {
                    debug!(symbol, error = %e, "kill failed");
                }
                child.wait()?;
                return Ok(true);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl BacktestPort for ProcessBacktestAdapter {
    fn run(&self, symbol: &str, period: &str, strategy: &StrategySelector) -> String {
        match self.execute(symbol, period, strategy) {
            Ok(output) => output,
            Err(e) => {
                let reason = match e {
                    TickerCompareError::ProcessLaunch { reason, .. } => reason,
                    other => other.to_string(),
                };
                warn!(symbol, error = %reason, "backtest could not run");
                format!("Error running backtest for {symbol}: {reason}")
            }
        }
    }
}

/// Background reader collecting a child pipe into a shared buffer.
///
/// A grandchild may inherit the pipe and keep it open after the child is
/// killed, so a timed-out run takes a snapshot instead of waiting for EOF.
struct Drain {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: Option<Receiver<()>>,
}

impl Drain {
    fn spawn<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let Some(mut pipe) = pipe else {
            return Self { buffer, done: None };
        };

        let (tx, rx) = mpsc::channel();
        let sink = Arc::clone(&buffer);
        thread::spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                match pipe.read(&mut chunk) {
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if let Ok(mut buf) = sink.lock() {
                            buf.extend_from_slice(&chunk[..n]);
                        }
                    }
                }
            }
            let _ = tx.send(());
        });

        Self {
            buffer,
            done: Some(rx),
        }
    }

    /// Wait for EOF (bounded by `grace` when given) and decode what was read.
    fn finish(self, grace: Option<Duration>) -> String {
        if let Some(done) = self.done {
            match grace {
                Some(limit) => {
                    let _ = done.recv_timeout(limit);
                }
                None => {
                    let _ = done.recv();
                }
            }
        }
        let bytes = match self.buffer.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_executable_yields_error_text() {
        let adapter = ProcessBacktestAdapter::new("/nonexistent/bin/test_backtest");
        let out = adapter.run("AAPL", "1y", &StrategySelector::default());
        assert!(
            out.starts_with("Error running backtest for AAPL: "),
            "unexpected output: {out}"
        );
    }

    #[test]
    fn default_adapter_has_no_cap() {
        let adapter = ProcessBacktestAdapter::new(DEFAULT_EXECUTABLE);
        assert!(adapter.max_duration().is_none());
        assert_eq!(adapter.executable(), &PathBuf::from(DEFAULT_EXECUTABLE));
    }

    #[test]
    fn from_config_reads_timeout() {
        use crate::adapters::file_config_adapter::FileConfigAdapter;

        let config = FileConfigAdapter::from_string("[backtest]\ntimeout_secs = 2.5\n").unwrap();
        let adapter = ProcessBacktestAdapter::from_config(&config).unwrap();
        assert_eq!(adapter.max_duration(), Some(Duration::from_millis(2500)));
        assert!(adapter.without_max_duration().max_duration().is_none());
    }

    #[test]
    fn from_config_rejects_oversized_timeout() {
        use crate::adapters::file_config_adapter::FileConfigAdapter;

        let config = FileConfigAdapter::from_string("[backtest]\ntimeout_secs = 1e20\n").unwrap();
        let err = ProcessBacktestAdapter::from_config(&config).err().unwrap();
        assert!(matches!(err, TickerCompareError::ConfigInvalid { ref key, .. } if key == "timeout_secs"));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
            let path = dir.path().join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            let mut perms = fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).unwrap();
            path
        }

        #[test]
        fn passes_args_and_stdin_selector() {
            let dir = TempDir::new().unwrap();
            let exe = script(
                &dir,
                "bt.sh",
                "read choice\necho \"args=$1 $2 choice=$choice\"\necho \"Total Return: 12.5%\"",
            );
            let adapter = ProcessBacktestAdapter::new(exe);
            let strategy: StrategySelector = "3".parse().unwrap();
            let out = adapter.run("MSFT", "6mo", &strategy);
            assert!(out.contains("args=MSFT 6mo choice=3"), "got: {out}");
            assert!(out.contains("Total Return: 12.5%"));
        }

        #[test]
        fn nonzero_exit_still_returns_output() {
            let dir = TempDir::new().unwrap();
            let exe = script(&dir, "fail.sh", "echo \"Sharpe Ratio: 0.4\"\necho oops >&2\nexit 3");
            let out = ProcessBacktestAdapter::new(exe).run("AAPL", "1y", &StrategySelector::default());
            assert!(out.contains("Sharpe Ratio: 0.4"));
            assert!(!out.contains("oops"), "stderr must not leak into the report");
        }

        #[test]
        fn silent_program_yields_empty_text() {
            let dir = TempDir::new().unwrap();
            let exe = script(&dir, "quiet.sh", "exit 0");
            let out = ProcessBacktestAdapter::new(exe).run("AAPL", "1y", &StrategySelector::default());
            assert!(out.is_empty());
        }

        #[test]
        fn working_dir_is_applied() {
            let dir = TempDir::new().unwrap();
            let exe = script(&dir, "pwd.sh", "pwd");
            let work = TempDir::new().unwrap();
            let out = ProcessBacktestAdapter::new(exe)
                .with_working_dir(work.path())
                .run("AAPL", "1y", &StrategySelector::default());
            let expected = fs::canonicalize(work.path()).unwrap();
            let got = fs::canonicalize(out.trim()).unwrap();
            assert_eq!(got, expected);
        }

        #[test]
        fn timeout_returns_partial_output() {
            let dir = TempDir::new().unwrap();
            let exe = script(&dir, "slow.sh", "echo \"Total Return: 1.0%\"\nsleep 5\necho \"Sharpe Ratio: 9\"");
            let started = Instant::now();
            let out = ProcessBacktestAdapter::new(exe)
                .with_max_duration(Duration::from_millis(300))
                .run("AAPL", "1y", &StrategySelector::default());
            assert!(started.elapsed() < Duration::from_secs(4));
            assert!(out.contains("Total Return: 1.0%"), "got: {out}");
            assert!(!out.contains("Sharpe Ratio"));
        }
    }
}
