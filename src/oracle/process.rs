//! Oracle backed by an external checker process
//!
//! The checker is invoked once per stage as `program [args..] <stage>`
//! where `<stage>` is `compile` or `run`. A JSON request is written to its
//! stdin:
//!
//! ```json
//! {"source": "obj.obj.a", "env": {...}, "artifact": "..."}
//! ```
//!
//! Exit status 0 accepts (stdout becomes the artifact payload or the run
//! value), exit status 1 rejects with stderr as the message, and anything
//! else is treated as a crash of the checker.

use std::fmt;
use std::io::{Read, Write};
use std::process::{Child, Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::environment::Environment;
use crate::{Error, Result};

use super::{Artifact, Oracle};

/// Exit status a checker uses to reject an expression
pub const REJECT_EXIT_CODE: i32 = 1;

/// Re-check interval for a checker that closed its pipes but has not exited
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Checker stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Compile,
    Run,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile => write!(f, "compile"),
            Self::Run => write!(f, "run"),
        }
    }
}

#[derive(Serialize)]
struct Request<'a> {
    source: &'a str,
    env: &'a Environment,
    artifact: &'a str,
}

/// Oracle that delegates to an external checker command
#[derive(Debug, Clone)]
pub struct ProcessOracle {
    program: String,
    args: Vec<String>,
    timeout_ms: u64,
}

impl ProcessOracle {
    /// Create an oracle running `program` with the default 5 second timeout
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout_ms: 5000,
        }
    }

    /// Extra arguments placed before the stage argument
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Time budget per invocation
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Configured time budget in milliseconds
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Check if the checker program can be started
    #[must_use]
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    fn invoke(&self, stage: Stage, request: &Request<'_>) -> Result<String> {
        let body = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(stage.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // The checker may exit before draining its input.
            let _ = stdin.write_all(&body);
        }

        let output = wait_with_timeout(child, Duration::from_millis(self.timeout_ms))?
            .ok_or(Error::Timeout(self.timeout_ms))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        match output.status.code() {
            Some(0) => Ok(stdout),
            Some(REJECT_EXIT_CODE) => Err(match stage {
                Stage::Compile => Error::Compile(stderr),
                Stage::Run => Error::Run(stderr),
            }),
            _ => Err(Error::Fault {
                source_code: request.source.to_string(),
                message: format!(
                    "`{}` {stage} exited with {}: {stderr}",
                    self.program, output.status
                ),
            }),
        }
    }
}

impl Oracle for ProcessOracle {
    fn compile(&self, source: &str, env: &Environment) -> Result<Artifact> {
        let request = Request {
            source,
            env,
            artifact: "",
        };
        let payload = self.invoke(Stage::Compile, &request)?;
        Ok(Artifact {
            source: source.to_string(),
            payload,
        })
    }

    fn run(&self, artifact: &Artifact, env: &Environment) -> Result<serde_json::Value> {
        let request = Request {
            source: &artifact.source,
            env,
            artifact: &artifact.payload,
        };
        let stdout = self.invoke(Stage::Run, &request)?;
        if stdout.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&stdout).unwrap_or(serde_json::Value::String(stdout)))
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Output stream of a checker process
#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Wait for a process, killing it once `timeout` elapses.
///
/// Both pipes are drained on reader threads that report through a channel,
/// so the wait wakes as soon as the checker closes its output. The deadline
/// covers the reads as well as the exit, so a background process holding a
/// pipe open still times out. Returns `Ok(None)` on timeout, leaving any
/// reader still blocked detached.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<Option<Output>> {
    let deadline = Instant::now() + timeout;
    let (tx, rx) = mpsc::channel();
    spawn_reader(Stream::Stdout, child.stdout.take(), tx.clone());
    spawn_reader(Stream::Stderr, child.stderr.take(), tx);

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    for _ in 0..2 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((Stream::Stdout, buf)) => stdout = buf,
            Ok((Stream::Stderr, buf)) => stderr = buf,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                kill_and_reap(&mut child);
                return Ok(None);
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                kill_and_reap(&mut child);
                return Err(Error::Io(std::io::Error::other(
                    "checker output reader disconnected",
                )));
            }
        }
    }

    // Pipes close on exit, so the status is normally ready here.
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                kill_and_reap(&mut child);
                return Ok(None);
            }
            Ok(None) => thread::sleep(EXIT_POLL_INTERVAL),
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(Error::Io(e));
            }
        }
    };

    Ok(Some(Output {
        status,
        stdout,
        stderr,
    }))
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_reader<R: Read + Send + 'static>(
    stream: Stream,
    handle: Option<R>,
    tx: mpsc::Sender<(Stream, Vec<u8>)>,
) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut reader) = handle {
            let _ = reader.read_to_end(&mut buf);
        }
        let _ = tx.send((stream, buf));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(script: &str) -> Option<ProcessOracle> {
        let oracle = ProcessOracle::new("sh").with_args(vec![
            "-c".to_string(),
            script.to_string(),
            "checker".to_string(),
        ]);
        if oracle.is_available() {
            Some(oracle)
        } else {
            eprintln!("sh not available, skipping test");
            None
        }
    }

    #[test]
    fn test_accepts_on_exit_zero() {
        let Some(oracle) = checker("cat >/dev/null; echo compiled") else {
            return;
        };
        let env = Environment::default();
        let artifact = oracle.compile("obj.obj.a", &env).unwrap();
        assert_eq!(artifact.source, "obj.obj.a");
        assert_eq!(artifact.payload, "compiled");
    }

    #[test]
    fn test_stage_argument() {
        let script = r#"cat >/dev/null; if [ "$1" = run ]; then echo '{"value": 3}'; fi"#;
        let Some(oracle) = checker(script) else {
            return;
        };
        let env = Environment::default();
        let artifact = oracle.compile("a + b", &env).unwrap();
        assert!(artifact.payload.is_empty());
        let value = oracle.run(&artifact, &env).unwrap();
        assert_eq!(value["value"], 3);
    }

    #[test]
    fn test_run_non_json_output_is_string() {
        let Some(oracle) = checker("cat >/dev/null; echo hello") else {
            return;
        };
        let env = Environment::default();
        let value = oracle.run(&Artifact::from_source("s"), &env).unwrap();
        assert_eq!(value, serde_json::Value::String("hello".to_string()));
    }

    #[test]
    fn test_request_carries_source_and_env() {
        let script = r#"input=$(cat); case "$input" in *'"source":"obj.obj.a"'*'"env":{'*) exit 0;; *) exit 1;; esac"#;
        let Some(oracle) = checker(script) else {
            return;
        };
        let env = Environment::default();
        assert!(oracle.compile("obj.obj.a", &env).is_ok());
        assert!(oracle.compile("a", &env).is_err());
    }

    #[test]
    fn test_exit_one_rejects() {
        let script = r#"cat >/dev/null; echo "integer divide by zero" >&2; exit 1"#;
        let Some(oracle) = checker(script) else {
            return;
        };
        let env = Environment::default();
        match oracle.compile("1 / 0", &env) {
            Err(Error::Compile(msg)) => assert_eq!(msg, "integer divide by zero"),
            other => panic!("expected compile rejection, got {other:?}"),
        }
        match oracle.run(&Artifact::from_source("1 / 0"), &env) {
            Err(Error::Run(msg)) => assert_eq!(msg, "integer divide by zero"),
            other => panic!("expected run rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_other_exit_is_fault() {
        let script = r#"cat >/dev/null; echo "index out of range" >&2; exit 2"#;
        let Some(oracle) = checker(script) else {
            return;
        };
        let env = Environment::default();
        match oracle.compile("arr[1:2]", &env) {
            Err(Error::Fault {
                source_code,
                message,
            }) => {
                assert_eq!(source_code, "arr[1:2]");
                assert!(message.contains("index out of range"));
                assert!(message.contains("compile"));
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn test_timeout() {
        let Some(oracle) = checker("exec sleep 5") else {
            return;
        };
        let oracle = oracle.with_timeout(100);
        let env = Environment::default();
        let start = Instant::now();
        match oracle.compile("a", &env) {
            Err(Error::Timeout(ms)) => assert_eq!(ms, 100),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_background_child_holding_stdout_times_out() {
        let Some(oracle) = checker("cat >/dev/null; sleep 4 & echo ok") else {
            return;
        };
        let oracle = oracle.with_timeout(100);
        let env = Environment::default();
        let start = Instant::now();
        match oracle.compile("a", &env) {
            Err(Error::Timeout(ms)) => assert_eq!(ms, 100),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_fast_checker_returns_promptly() {
        let Some(oracle) = checker("exit 0") else {
            return;
        };
        let env = Environment::default();
        let calls = 30u32;

        let start = Instant::now();
        for _ in 0..calls {
            oracle.compile("a", &env).unwrap();
        }
        let through_oracle = start.elapsed();

        let start = Instant::now();
        for _ in 0..calls {
            Command::new("sh")
                .args(["-c", "exit 0", "checker", "compile"])
                .output()
                .unwrap();
        }
        let direct = start.elapsed();

        // no fixed per-call polling delay on top of the spawn itself
        assert!(
            through_oracle < direct * 3 + Duration::from_millis(60),
            "oracle {through_oracle:?} vs direct {direct:?}"
        );
    }

    #[test]
    fn test_availability_check_does_not_run_checker() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let script = format!("touch {}", marker.display());
        let oracle = ProcessOracle::new("sh").with_args(vec!["-c".to_string(), script]);
        assert!(oracle.is_available());
        assert!(!marker.exists());
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let oracle = ProcessOracle::new("/nonexistent/exprgen-checker");
        assert!(!oracle.is_available());
        let result = oracle.compile("a", &Environment::default());
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_builder_settings() {
        let oracle = ProcessOracle::new("checker")
            .with_args(vec!["--strict".to_string()])
            .with_timeout(250);
        assert_eq!(oracle.name(), "checker");
        assert_eq!(oracle.timeout_ms(), 250);
    }
}
