use crate::{TrialParams, TrialResult};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use std::{
    fmt,
    io::Read,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

/// Wall clock limit of one simulator run unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How often a running child is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(20);

lazy_static! {
    // the simulator prints e.g. "│  Maximum Execution Time:     123456     │"
    static ref EXEC_TIME_RE: Regex = Regex::new(r"Maximum Execution Time.*?(\d+)").unwrap();
}

/// Extract the maximum execution time from simulator stdout
pub fn parse_exec_cycles(stdout: &str) -> Option<u64> {
    EXEC_TIME_RE
        .captures(stdout)
        .and_then(|captures| captures.get(1))
        .and_then(|cycles| cycles.as_str().parse().ok())
}

/// Why a trial produced no result
#[derive(Debug)]
pub enum TrialFailure {
    /// the simulator could not be started
    Spawn(std::io::Error),
    /// waiting for or killing the simulator failed
    Wait(std::io::Error),
    /// the simulator exited unsuccessfully
    Exit(ExitStatus),
    /// the simulator ran longer than the timeout and was killed
    Timeout(Duration),
    /// stdout has no execution time line
    Unparsable,
}

impl fmt::Display for TrialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialFailure::Spawn(err) => write!(f, "failed to start simulator: {err}"),
            TrialFailure::Wait(err) => write!(f, "failed to wait for simulator: {err}"),
            TrialFailure::Exit(status) => match status.code() {
                Some(code) => write!(f, "simulation returned {code}"),
                None => write!(f, "simulation terminated by signal"),
            },
            TrialFailure::Timeout(timeout) => {
                write!(f, "simulation timed out after {}s", timeout.as_secs_f64())
            }
            TrialFailure::Unparsable => write!(f, "could not parse execution time"),
        }
    }
}

impl std::error::Error for TrialFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrialFailure::Spawn(err) | TrialFailure::Wait(err) => Some(err),
            _ => None,
        }
    }
}

/// Runs the external simulator once per trial
#[derive(Clone, Debug)]
pub struct TrialRunner {
    simulator: PathBuf,
    trace_prefix: PathBuf,
    timeout: Duration,
}

impl TrialRunner {
    pub fn new<P1: AsRef<Path>, P2: AsRef<Path>>(
        simulator: P1,
        trace_prefix: P2,
        timeout: Duration,
    ) -> Self {
        Self {
            simulator: simulator.as_ref().to_path_buf(),
            trace_prefix: trace_prefix.as_ref().to_path_buf(),
            timeout,
        }
    }

    pub fn simulator(&self) -> &Path {
        &self.simulator
    }

    pub fn trace_prefix(&self) -> &Path {
        &self.trace_prefix
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Command line for one trial: `<sim> -t <trace> -s <s> -E <E> -b <b>`
    pub fn command(&self, params: &TrialParams) -> Command {
        let mut command = Command::new(&self.simulator);
        command
            .arg("-t")
            .arg(&self.trace_prefix)
            .arg("-s")
            .arg(params.geometry.s.to_string())
            .arg("-E")
            .arg(params.geometry.e.to_string())
            .arg("-b")
            .arg(params.geometry.b.to_string());
        command
    }

    /// Run one trial, logging and swallowing any failure
    pub fn run(&self, params: &TrialParams) -> Option<TrialResult> {
        match self.try_run(params) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!("[{}] {}: {}", params.label, params.geometry, err);
                None
            }
        }
    }

    pub fn try_run(&self, params: &TrialParams) -> Result<TrialResult, TrialFailure> {
        let mut child = self
            .command(params)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(TrialFailure::Spawn)?;

        // drain both pipes while polling, a full pipe would stall the child
        let (tx, rx) = mpsc::channel();
        spawn_reader(Stream::Stdout, child.stdout.take(), tx.clone());
        spawn_reader(Stream::Stderr, child.stderr.take(), tx);

        let deadline = Instant::now() + self.timeout;
        let status = wait_timeout(&mut child, deadline, self.timeout)?;

        // a background grandchild can keep the pipes open past the exit, the
        // readers are then left detached
        let mut stdout = String::new();
        let mut stderr = String::new();
        for _ in 0..2 {
            match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok((Stream::Stdout, output)) => stdout = output,
                Ok((Stream::Stderr, output)) => stderr = output,
                Err(RecvTimeoutError::Timeout) => return Err(TrialFailure::Timeout(self.timeout)),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if !status.success() {
            if !stderr.trim().is_empty() {
                debug!("simulator stderr:\n{}", stderr.trim_end());
            }
            return Err(TrialFailure::Exit(status));
        }

        let exec_cycles = parse_exec_cycles(&stdout).ok_or(TrialFailure::Unparsable)?;
        Ok(TrialResult::new(params, exec_cycles))
    }
}

enum Stream {
    Stdout,
    Stderr,
}

fn spawn_reader<R: Read + Send + 'static>(
    stream: Stream,
    pipe: Option<R>,
    tx: mpsc::Sender<(Stream, String)>,
) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            // a read error just truncates the captured output
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
    });
}

fn wait_timeout(
    child: &mut Child,
    deadline: Instant,
    timeout: Duration,
) -> Result<ExitStatus, TrialFailure> {
    loop {
        if let Some(status) = child.try_wait().map_err(TrialFailure::Wait)? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            child.kill().map_err(TrialFailure::Wait)?;
            child.wait().map_err(TrialFailure::Wait)?;
            return Err(TrialFailure::Timeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
