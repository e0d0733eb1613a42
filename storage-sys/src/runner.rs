// SPDX-License-Identifier: GPL-3.0-only

//! External command execution
//!
//! Every helper the pool depends on (mount, aggregator, df, umount) goes
//! through [`CommandRunner`] so the orchestration can be driven by a fake in
//! tests. [`SystemRunner`] is the real implementation: it spawns the process
//! with captured output and kills it once the configured timeout elapses.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use which::which;

use crate::error::{Result, SysError};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Render for logs and error messages.
    pub fn render(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Combined stderr and stdout, trimmed, for reporting.
    pub fn diagnostics(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        match (stderr.is_empty(), stdout.is_empty()) {
            (true, true) => String::new(),
            (false, true) => stderr.to_string(),
            (true, false) => stdout.to_string(),
            (false, false) => format!("{stderr}\n{stdout}"),
        }
    }

    pub fn exit_description(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run to completion. A non-zero exit is reported through
    /// [`CommandOutput::code`], not as an error.
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput>;

    /// Resolve a program name to the binary that would be executed.
    fn locate(&self, program: &str) -> Result<PathBuf>;
}

/// Runs commands on the host with a per-command timeout.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        let rendered = command.render();
        debug!("Running `{}`", rendered);

        let handle = duct::cmd(&command.program, &command.args)
            .stdin_null()
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .start()
            .map_err(|e| SysError::Spawn {
                command: rendered.clone(),
                reason: e.to_string(),
            })?;

        let started = Instant::now();
        loop {
            let finished = handle.try_wait().map_err(|e| SysError::Spawn {
                command: rendered.clone(),
                reason: e.to_string(),
            })?;

            if let Some(output) = finished {
                let output = CommandOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                };
                debug!("`{}` finished with {}", rendered, output.exit_description());
                return Ok(output);
            }

            if started.elapsed() >= self.timeout {
                warn!("`{}` exceeded {:?}, killing it", rendered, self.timeout);
                if let Err(e) = handle.kill() {
                    warn!("Failed to kill `{}`: {}", rendered, e);
                }
                return Err(SysError::Timeout {
                    command: rendered,
                    timeout: self.timeout,
                });
            }

            thread::sleep(POLL_INTERVAL);
        }
    }

    fn locate(&self, program: &str) -> Result<PathBuf> {
        which(program).map_err(|e| {
            SysError::Config(format!("Required program '{program}' not found: {e}"))
        })
    }
}
