//! External analysis tool port and its process-backed adapter.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Command;

/// A single command line to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Executable name or path.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
    /// Upper bound on wall-clock runtime.
    pub timeout: Duration,
}

impl ToolInvocation {
    /// Create an invocation.
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        let mut rendered = self.program.clone();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(arg);
        }
        rendered
    }
}

/// Captured output of a finished tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Lossily decoded stdout.
    pub stdout: String,
    /// Lossily decoded stderr.
    pub stderr: String,
}

impl RawOutput {
    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Whether the exit code is one of `codes`.
    pub fn exited_with_any(&self, codes: &[i32]) -> bool {
        self.code.map(|code| codes.contains(&code)).unwrap_or(false)
    }

    fn from_output(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            code: status.code(),
            stdout: String::from_utf8_lossy(stdout).to_string(),
            stderr: String::from_utf8_lossy(stderr).to_string(),
        }
    }
}

/// Reasons a tool produced no output at all.
#[derive(Debug)]
pub enum ToolError {
    /// The executable is not installed.
    NotFound(String),
    /// The process exceeded its timeout and was killed.
    TimedOut {
        /// Executable name.
        program: String,
        /// The timeout that fired.
        after: Duration,
    },
    /// The process could not be spawned or awaited.
    Io(io::Error),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(program) => write!(f, "{program} is not installed"),
            Self::TimedOut { program, after } => {
                write!(f, "{program} timed out after {}s", after.as_secs())
            }
            Self::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for ToolError {}

/// Boxed future returned by [`ToolRunner::invoke`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<RawOutput, ToolError>> + Send + 'a>>;

/// Capability to run an external analysis tool.
pub trait ToolRunner {
    /// Run the invocation and capture its output.
    fn invoke<'a>(&'a self, invocation: &'a ToolInvocation) -> ToolFuture<'a>;
}

/// Runs tools as child processes, killing them when the timeout fires.
#[derive(Debug, Default, Clone)]
pub struct ProcessToolRunner;

impl ProcessToolRunner {
    /// Create a new process runner.
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for ProcessToolRunner {
    fn invoke<'a>(&'a self, invocation: &'a ToolInvocation) -> ToolFuture<'a> {
        Box::pin(run_process(invocation))
    }
}

async fn run_process(invocation: &ToolInvocation) -> Result<RawOutput, ToolError> {
    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args).kill_on_drop(true);
    log::debug!("running {}", invocation.display());

    let output = tokio::time::timeout(invocation.timeout, command.output())
        .await
        .map_err(|_| ToolError::TimedOut {
            program: invocation.program.clone(),
            after: invocation.timeout,
        })?
        .map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ToolError::NotFound(invocation.program.clone()),
            _ => ToolError::Io(err),
        })?;

    Ok(RawOutput::from_output(
        output.status,
        &output.stdout,
        &output.stderr,
    ))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{RawOutput, ToolError, ToolFuture, ToolInvocation, ToolRunner};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted outcome for one program.
    pub(crate) enum Scripted {
        Output(RawOutput),
        Missing,
        Timeout,
    }

    /// Tool runner returning canned outcomes per program and recording calls.
    pub(crate) struct ScriptedToolRunner {
        outcomes: HashMap<String, Scripted>,
        calls: Mutex<Vec<ToolInvocation>>,
    }

    impl ScriptedToolRunner {
        pub(crate) fn new() -> Self {
            Self {
                outcomes: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn with(mut self, program: &str, outcome: Scripted) -> Self {
            self.outcomes.insert(program.to_string(), outcome);
            self
        }

        pub(crate) fn calls(&self) -> Vec<ToolInvocation> {
            self.calls.lock().expect("calls").clone()
        }
    }

    pub(crate) fn output(code: i32, stdout: &str) -> Scripted {
        Scripted::Output(RawOutput {
            code: Some(code),
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    impl ToolRunner for ScriptedToolRunner {
        fn invoke<'a>(&'a self, invocation: &'a ToolInvocation) -> ToolFuture<'a> {
            self.calls.lock().expect("calls").push(invocation.clone());
            let result = match self.outcomes.get(&invocation.program) {
                Some(Scripted::Output(output)) => Ok(output.clone()),
                Some(Scripted::Timeout) => Err(ToolError::TimedOut {
                    program: invocation.program.clone(),
                    after: Duration::from_secs(300),
                }),
                Some(Scripted::Missing) | None => {
                    Err(ToolError::NotFound(invocation.program.clone()))
                }
            };
            Box::pin(async move { result })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn process_runner_captures_output() {
        let runner = ProcessToolRunner::new();
        let invocation = ToolInvocation::new(
            "sh",
            vec!["-c".to_string(), "echo hello; echo oops >&2; exit 4".to_string()],
            Duration::from_secs(10),
        );

        let output = runner.invoke(&invocation).await.expect("run sh");

        assert_eq!(output.code, Some(4));
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
        assert!(!output.success());
        assert!(output.exited_with_any(&[0, 4]));
    }

    #[tokio::test]
    async fn process_runner_reports_missing_tool() {
        let runner = ProcessToolRunner::new();
        let invocation = ToolInvocation::new(
            "repojudge-definitely-not-installed",
            Vec::new(),
            Duration::from_secs(5),
        );

        let err = runner.invoke(&invocation).await.unwrap_err();

        assert!(matches!(err, ToolError::NotFound(_)));
        assert!(err.to_string().contains("not installed"));
    }

    #[tokio::test]
    async fn process_runner_kills_on_timeout() {
        let runner = ProcessToolRunner::new();
        let invocation = ToolInvocation::new(
            "sleep",
            vec!["5".to_string()],
            Duration::from_millis(100),
        );

        let err = runner.invoke(&invocation).await.unwrap_err();

        assert!(matches!(err, ToolError::TimedOut { .. }));
    }

    #[test]
    fn invocation_display_joins_args() {
        let invocation = ToolInvocation::new(
            "radon",
            vec!["cc".to_string(), "/repo".to_string(), "-j".to_string()],
            Duration::from_secs(1),
        );
        assert_eq!(invocation.display(), "radon cc /repo -j");
    }

    #[test]
    fn signal_terminated_output_is_not_success() {
        let output = RawOutput {
            code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(!output.success());
        assert!(!output.exited_with_any(&[0]));
    }
}
