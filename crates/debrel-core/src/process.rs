//! External command execution
//!
//! Every tool the packager drives (`svn`, `dh_make`, `debuild`, `sbuild`,
//! `dput`) goes through [`CommandRunner`], so pipelines can be exercised in
//! tests without the tools installed.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tracing::debug;

use crate::error::{Error, Result};

/// A single external command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory
    pub cwd: Option<PathBuf>,
    /// Text written to the child's stdin, which is then closed
    pub stdin: Option<String>,
    /// Capture stdout/stderr instead of streaming them to the terminal
    pub capture: bool,
}

impl Invocation {
    /// Invocation whose output is captured
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), cwd: None, stdin: None, capture: true }
    }

    /// Add one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Feed `input` on stdin
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Stream output to the terminal
    pub fn streaming(mut self) -> Self {
        self.capture = false;
        self
    }

    /// Program and arguments joined for display
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())?;
        if let Some(cwd) = &self.cwd {
            write!(f, " (in {})", cwd.display())?;
        }
        Ok(())
    }
}

/// Result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// Captured stdout, empty for streaming invocations
    pub stdout: String,
    /// Captured stderr, empty for streaming invocations
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output carrying `stdout`
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { code: Some(0), stdout: stdout.into(), stderr: String::new() }
    }

    /// Failed output with exit `code`
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self { code: Some(code), stdout: String::new(), stderr: stderr.into() }
    }

    /// Whether the command exited with status zero
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`Error::CommandFailed`]
    pub fn require_success(self, invocation: &Invocation) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let status = match self.code {
            Some(code) => format!("exit status: {code}"),
            None => "a signal".to_string(),
        };
        Err(Error::CommandFailed {
            command: invocation.command_line(),
            status,
            stderr: self.stderr,
        })
    }
}

/// Runs external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Run `invocation` and fail on a non-zero exit
    async fn run_checked(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.run(invocation).await?.require_success(invocation)
    }
}

/// Runs commands on the host with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        debug!("Running {invocation}");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).kill_on_drop(true);
        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(if invocation.stdin.is_some() { Stdio::piped() } else { Stdio::null() });
        if invocation.capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let spawn_err = |source| Error::Spawn { program: invocation.program.clone(), source };
        let mut child = cmd.spawn().map_err(spawn_err)?;

        if let Some(input) = &invocation.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                match feed_stdin(&mut stdin, input).await {
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                        debug!("{} closed stdin before reading all input", invocation.program);
                    }
                    other => other?,
                }
            }
        }

        let output = child.wait_with_output().await?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

async fn feed_stdin(stdin: &mut ChildStdin, input: &str) -> io::Result<()> {
    stdin.write_all(input.as_bytes()).await?;
    stdin.shutdown().await
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::RecordingRunner;

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Records invocations and answers them from a script
    ///
    /// Responses are matched by program name in the order they were queued;
    /// programs without a queued response succeed with empty output.
    #[derive(Debug, Default)]
    pub struct RecordingRunner {
        calls: Mutex<Vec<Invocation>>,
        responses: Mutex<Vec<(String, VecDeque<CommandOutput>)>>,
    }

    impl RecordingRunner {
        /// Create an empty runner
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue `output` for the next call to `program`
        pub fn respond(&self, program: &str, output: CommandOutput) -> &Self {
            let mut responses = self.responses.lock().unwrap();
            match responses.iter_mut().find(|(p, _)| p == program) {
                Some((_, queue)) => queue.push_back(output),
                None => responses.push((program.to_string(), VecDeque::from([output]))),
            }
            self
        }

        /// All invocations seen so far
        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        /// Command lines seen so far
        pub fn command_lines(&self) -> Vec<String> {
            self.calls().iter().map(Invocation::command_line).collect()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
            self.calls.lock().unwrap().push(invocation.clone());
            let mut responses = self.responses.lock().unwrap();
            let output = responses
                .iter_mut()
                .find(|(p, _)| *p == invocation.program)
                .and_then(|(_, queue)| queue.pop_front())
                .unwrap_or_else(|| CommandOutput::ok(""));
            Ok(output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let inv = Invocation::new("debuild")
            .args(["-j4", "-S"])
            .arg("-sa")
            .current_dir("/tmp/stage")
            .streaming();
        assert_eq!(inv.command_line(), "debuild -j4 -S -sa");
        assert!(!inv.capture);
        assert_eq!(inv.to_string(), "debuild -j4 -S -sa (in /tmp/stage)");
    }

    #[test]
    fn test_require_success() {
        let inv = Invocation::new("dput").arg("ppa:x/y");
        assert!(CommandOutput::ok("done").require_success(&inv).is_ok());

        let err = CommandOutput::failed(1, "no such file").require_success(&inv).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
        assert!(err.to_string().contains("dput ppa:x/y"));
    }

    #[tokio::test]
    async fn test_recording_runner_scripts_responses() {
        let runner = RecordingRunner::new();
        runner.respond("svn", CommandOutput::ok("first"));
        runner.respond("svn", CommandOutput::failed(1, "boom"));

        let inv = Invocation::new("svn").arg("info");
        assert_eq!(runner.run(&inv).await.unwrap().stdout, "first");
        assert!(runner.run_checked(&inv).await.is_err());
        assert!(runner.run(&Invocation::new("dh_make")).await.unwrap().success());
        assert_eq!(runner.command_lines(), vec!["svn info", "svn info", "dh_make"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_and_feeds_stdin() {
        let inv = Invocation::new("cat").stdin("hello\n");
        let output = SystemRunner.run(&inv).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "hello\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_child_ignoring_stdin() {
        let inv = Invocation::new("true").stdin("y\n".repeat(512 * 1024));
        let output = SystemRunner.run(&inv).await.unwrap();
        assert!(output.success());
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let inv = Invocation::new("definitely-not-a-real-tool-debrel");
        let err = SystemRunner.run(&inv).await.unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
