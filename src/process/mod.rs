//! Child process execution.
//!
//! Analyzers never spawn processes directly; they hand a [`CommandSpec`] to
//! a [`CommandRunner`]. Production code uses [`SystemRunner`], tests use
//! scripted runners that fabricate output.

pub mod dart;

pub use dart::DartTool;

use crate::errors::{AnalyzerError, Result};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// A command to run, described as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Shell-like rendering for messages
    pub fn display(&self) -> String {
        let program = self
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string());
        std::iter::once(program)
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the child was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last `max_lines` lines of stderr, for incomplete reports
    pub fn stderr_tail(&self, max_lines: usize) -> String {
        let lines: Vec<&str> = self.stderr.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }
}

pub trait CommandRunner {
    /// Run to completion. A non-zero exit is *not* an error here; only
    /// spawn failures and timeouts are.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs real processes with a wall-clock timeout.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    })
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        tracing::debug!(command = %spec.display(), dir = %spec.working_dir.display(), "spawning");
        let started = Instant::now();

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AnalyzerError::Subprocess {
                command: spec.display(),
                code: None,
                stderr: format!("failed to start: {e}"),
            })?;

        // Pipes are drained on their own threads so a chatty child cannot block on a full pipe
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(AnalyzerError::Timeout {
                    command: spec.display(),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let output = CommandOutput {
            code: status.code(),
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
            duration: started.elapsed(),
        };
        tracing::debug!(
            command = %spec.display(),
            code = ?output.code,
            elapsed_ms = output.duration.as_millis() as u64,
            "finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted runner for analyzer tests.

    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    type Step = Box<dyn FnMut(&CommandSpec) -> Result<CommandOutput>>;

    /// Replays one closure per expected invocation, recording every spec.
    #[derive(Default)]
    pub struct ScriptedRunner {
        steps: RefCell<VecDeque<Step>>,
        pub calls: RefCell<Vec<CommandSpec>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn then(self, step: impl FnMut(&CommandSpec) -> Result<CommandOutput> + 'static) -> Self {
            self.steps.borrow_mut().push_back(Box::new(step));
            self
        }

        pub fn then_output(self, code: i32, stdout: &str, stderr: &str) -> Self {
            let output = CommandOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                duration: Duration::from_millis(5),
            };
            self.then(move |_| Ok(output.clone()))
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
            self.calls.borrow_mut().push(spec.clone());
            let mut step = self
                .steps
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected command: {}", spec.display()));
            step(spec)
        }
    }
}
