//! Running an external tool with a timeout.

use std::ffi::OsString;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::ToolError;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured result of a finished child process
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Command line for an external tool plus how long it may run
#[derive(Debug, Clone)]
pub struct ToolCommand {
    tool: String,
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    cwd: Option<PathBuf>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(tool: &str, program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            tool: tool.to_string(),
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            cwd: None,
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Shell-like rendering of the command line, recorded in memory files
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| {
                let part = part.to_string_lossy();
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("\"{}\"", part)
                } else {
                    part.into_owned()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion, failing on a non-zero exit status
    pub fn run_checked(&self) -> Result<ToolOutput, ToolError> {
        let output = self.run()?;
        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            };
            return Err(ToolError::Failed {
                tool: self.tool.clone(),
                status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Run to completion and return whatever the child produced.
    ///
    /// The child is killed once the timeout elapses. Both pipes are drained on
    /// helper threads while waiting so a chatty child never blocks on a full pipe.
    pub fn run(&self) -> Result<ToolOutput, ToolError> {
        debug!(command = %self.display(), "running {}", self.tool);

        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ToolError::NotFound { tool: self.tool.clone(), path: self.program.clone() }
            } else {
                ToolError::Spawn { tool: self.tool.clone(), source }
            }
        })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ToolError::TimedOut {
                        tool: self.tool.clone(),
                        secs: self.timeout.as_secs(),
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => return Err(ToolError::Spawn { tool: self.tool.clone(), source }),
            }
        };

        let stdout = stdout.map(join_drain).unwrap_or_default();
        let stderr = stderr.map(join_drain).unwrap_or_default();
        let elapsed = started.elapsed();
        debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            success = status.success(),
            "{} exited",
            self.tool
        );

        Ok(ToolOutput { status, stdout, stderr, elapsed })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_drain(handle: thread::JoinHandle<Vec<u8>>) -> String {
    handle.join().map(|bytes| String::from_utf8_lossy(&bytes).into_owned()).unwrap_or_default()
}
