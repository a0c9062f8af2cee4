use std::io;
use std::process::{Command, Stdio};

use thiserror::Error;

/// One external tool invocation: program, arguments, environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// "program arg arg..." for error messages and logs.
    pub fn display(&self) -> String {
        let mut s = self.program.clone();
        for a in &self.args {
            s.push(' ');
            s.push_str(a);
        }
        s
    }
}

/// Result of a captured invocation. Both streams were read to completion
/// before the child was reaped, so the child can never have been left
/// blocked on a full pipe buffer.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unable to run `{cmd}`: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: io::Error,
    },
}

/// Capability interface over subprocess execution. The orchestration code
/// only ever talks to tools through this trait, so tests can script
/// outcomes instead of spawning real programmer binaries.
pub trait ToolRunner {
    /// Run with both output streams captured (fully drained).
    fn run(&mut self, inv: &ToolInvocation) -> Result<ProcessOutcome, ToolError>;

    /// Run with stdio inherited from the parent; only the status is
    /// reported. Used for the compiler, whose output belongs on the user's
    /// terminal in real time.
    fn run_passthrough(&mut self, inv: &ToolInvocation) -> Result<i32, ToolError>;
}

/// Real implementation backed by `std::process::Command`.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(inv: &ToolInvocation) -> Command {
        let mut cmd = Command::new(&inv.program);
        cmd.args(&inv.args);
        for (k, v) in &inv.env {
            cmd.env(k, v);
        }
        cmd
    }
}

impl ToolRunner for SystemRunner {
    fn run(&mut self, inv: &ToolInvocation) -> Result<ProcessOutcome, ToolError> {
        tracing::debug!(cmd = %inv.display(), "run (captured)");
        let out = Self::command(inv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ToolError::Spawn {
                cmd: inv.display(),
                source: e,
            })?;

        Ok(ProcessOutcome {
            // Killed by signal: no code. -1 keeps it distinguishable from
            // every real tool status.
            code: out.status.code().unwrap_or(-1),
            stdout: out.stdout,
            stderr: out.stderr,
        })
    }

    fn run_passthrough(&mut self, inv: &ToolInvocation) -> Result<i32, ToolError> {
        tracing::debug!(cmd = %inv.display(), "run (passthrough)");
        let status = Self::command(inv)
            .status()
            .map_err(|e| ToolError::Spawn {
                cmd: inv.display(),
                source: e,
            })?;
        Ok(status.code().unwrap_or(-1))
    }
}
