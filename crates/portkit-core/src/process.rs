//! # External Processes
//!
//! The one place that starts subprocesses. How the child's streams are wired
//! is decided by an explicit [`PipeConfig`] passed into every call; there is
//! no ambient shared process state.

use crate::PortkitError;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

// =============================================================================
// PIPE CONFIGURATION
// =============================================================================

/// What to do with one output stream of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamMode {
    /// Capture into the returned [`ProcessOutput`].
    #[default]
    Capture,
    /// Let the child write to our own stream.
    Inherit,
    /// Discard.
    Null,
}

impl StreamMode {
    fn stdio(self) -> Stdio {
        match self {
            Self::Capture => Stdio::piped(),
            Self::Inherit => Stdio::inherit(),
            Self::Null => Stdio::null(),
        }
    }
}

/// Stream wiring for a subprocess call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipeConfig {
    pub stdout: StreamMode,
    pub stderr: StreamMode,
}

impl PipeConfig {
    /// Capture both streams.
    #[must_use]
    pub const fn capture() -> Self {
        Self {
            stdout: StreamMode::Capture,
            stderr: StreamMode::Capture,
        }
    }
}

// =============================================================================
// COMMAND SPEC
// =============================================================================

/// A program invocation, optionally reading stdin from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin_file: Option<PathBuf>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin_file: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin_file = Some(path.into());
        self
    }

    /// Shell-like rendering for diagnostics.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        if let Some(stdin) = &self.stdin_file {
            line.push_str(" < ");
            line.push_str(&stdin.display().to_string());
        }
        line
    }
}

/// Result of a finished subprocess.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub command: String,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `spec` to completion. No timeout is imposed.
pub fn run(spec: &CommandSpec, pipes: &PipeConfig) -> Result<ProcessOutput, PortkitError> {
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdout(pipes.stdout.stdio())
        .stderr(pipes.stderr.stdio());
    match &spec.stdin_file {
        Some(path) => {
            let file = File::open(path).map_err(|e| PortkitError::io(path, e))?;
            command.stdin(Stdio::from(file));
        }
        None => {
            command.stdin(Stdio::null());
        }
    }

    tracing::debug!(command = %spec.command_line(), "running subprocess");
    let output = command
        .output()
        .map_err(|e| PortkitError::io(&spec.program, e))?;

    Ok(ProcessOutput {
        command: spec.command_line(),
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

// =============================================================================
// PATCH TOOL
// =============================================================================

/// Applies unified diffs with an external `patch` program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchTool {
    program: String,
    pipes: PipeConfig,
}

impl Default for PatchTool {
    fn default() -> Self {
        Self::new("patch")
    }
}

impl PatchTool {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            pipes: PipeConfig::capture(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Patch `target` in place with `diff`. A non-zero exit is fatal and
    /// carries the command line and both captured streams.
    pub fn apply(&self, target: &Path, diff: &Path) -> Result<(), PortkitError> {
        let spec = CommandSpec::new(&self.program)
            .arg("-s")
            .arg(target.display().to_string())
            .stdin_from(diff);
        let output = run(&spec, &self.pipes)?;
        if !output.success() {
            return Err(PortkitError::PatchApplication {
                command: output.command,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
