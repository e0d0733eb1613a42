// SPDX-License-Identifier: GPL-3.0-only

//! Recording command runner for unit tests

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Result, SysError};
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};

enum Reply {
    Output(CommandOutput),
    Timeout,
}

#[derive(Default)]
pub(crate) struct FakeRunner {
    calls: Mutex<Vec<String>>,
    rules: Vec<(String, Reply)>,
    missing: Vec<String>,
}

impl FakeRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_when_contains(mut self, needle: &str, code: i32, stderr: &str) -> Self {
        self.rules.push((
            needle.to_string(),
            Reply::Output(CommandOutput {
                code: Some(code),
                stdout: String::new(),
                stderr: stderr.to_string(),
            }),
        ));
        self
    }

    pub(crate) fn stdout_when_contains(mut self, needle: &str, stdout: &str) -> Self {
        self.rules.push((
            needle.to_string(),
            Reply::Output(CommandOutput {
                code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
        ));
        self
    }

    pub(crate) fn timeout_when_contains(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Reply::Timeout));
        self
    }

    pub(crate) fn missing_program(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        let rendered = command.render();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(rendered.clone());
        }

        for (needle, reply) in &self.rules {
            if rendered.contains(needle.as_str()) {
                return match reply {
                    Reply::Output(output) => Ok(output.clone()),
                    Reply::Timeout => Err(SysError::Timeout {
                        command: rendered,
                        timeout: Duration::from_secs(1),
                    }),
                };
            }
        }

        Ok(CommandOutput {
            code: Some(0),
            ..CommandOutput::default()
        })
    }

    fn locate(&self, program: &str) -> Result<PathBuf> {
        if self.missing.iter().any(|m| m == program) {
            return Err(SysError::Config(format!(
                "Required program '{program}' not found"
            )));
        }
        Ok(PathBuf::from("/usr/bin").join(program))
    }
}
