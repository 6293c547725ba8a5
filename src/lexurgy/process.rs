//! The engine server as a long-lived child process.
//!
//! The child is spawned on first use, fed one JSON request per line on
//! stdin and answers with one JSON object per line on stdout. Non-JSON
//! output (startup banners) is skipped. Stderr is inherited so engine
//! diagnostics reach the terminal.
use super::protocol::{parse_response, Changed, EvolveRequest};
use super::Engine;
use crate::error::{Error, Result};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const EXIT_POLLS: usize = 20;
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

struct Running {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Running {
    fn exchange(&mut self, line: &str) -> Result<String> {
        writeln!(self.stdin, "{line}")
            .and_then(|()| self.stdin.flush())
            .map_err(|err| Error::EngineUnavailable(format!("write request: {err}")))?;
        let mut response = String::new();
        loop {
            response.clear();
            let read = self
                .stdout
                .read_line(&mut response)
                .map_err(|err| Error::EngineUnavailable(format!("read response: {err}")))?;
            if read == 0 {
                return Err(Error::EngineUnavailable(
                    "engine exited before responding".to_string(),
                ));
            }
            let trimmed = response.trim();
            if trimmed.starts_with('{') {
                return Ok(trimmed.to_string());
            }
            if !trimmed.is_empty() {
                tracing::debug!(line = trimmed, "skipping engine output");
            }
        }
    }
}

/// How to start the engine: a known command line, or a resolver run on the
/// first request.
enum CommandLine {
    Resolved(Vec<String>),
    Deferred(Box<dyn FnMut() -> anyhow::Result<Vec<String>>>),
}

pub struct LexurgyClient {
    command: CommandLine,
    running: Option<Running>,
}

impl LexurgyClient {
    /// `command` is the program followed by its arguments.
    #[cfg(test)]
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command: CommandLine::Resolved(command),
            running: None,
        }
    }

    /// Look the command line up with `resolve` only when the engine is first
    /// needed. Resolution failures surface as an unavailable engine.
    pub fn deferred(resolve: impl FnMut() -> anyhow::Result<Vec<String>> + 'static) -> Self {
        Self {
            command: CommandLine::Deferred(Box::new(resolve)),
            running: None,
        }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn running(&mut self) -> Result<&mut Running> {
        if self.running.is_none() {
            self.running = Some(self.spawn()?);
        }
        self.running
            .as_mut()
            .ok_or_else(|| Error::EngineUnavailable("engine not started".to_string()))
    }

    fn command(&mut self) -> Result<&[String]> {
        if let CommandLine::Deferred(resolve) = &mut self.command {
            let command = resolve().map_err(|err| Error::EngineUnavailable(format!("{err:#}")))?;
            tracing::debug!(command = ?command, "engine command resolved");
            self.command = CommandLine::Resolved(command);
        }
        match &self.command {
            CommandLine::Resolved(command) => Ok(command),
            CommandLine::Deferred(_) => Err(Error::EngineUnavailable(
                "engine command unresolved".to_string(),
            )),
        }
    }

    fn spawn(&mut self) -> Result<Running> {
        let command = self.command()?.to_vec();
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::EngineUnavailable("engine command is empty".to_string()))?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| Error::EngineUnavailable(format!("spawn {program}: {err}")))?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
            let _ = child.kill();
            return Err(Error::EngineUnavailable(
                "engine stdio was not captured".to_string(),
            ));
        };
        tracing::info!(program = %program, pid = child.id(), "engine started");
        Ok(Running {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    /// Close the engine's stdin, give it a moment to exit, then kill it.
    pub fn terminate(&mut self) {
        let Some(Running {
            mut child,
            stdin,
            stdout,
        }) = self.running.take()
        else {
            return;
        };
        drop(stdin);
        drop(stdout);
        for _ in 0..EXIT_POLLS {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(%status, "engine exited");
                    return;
                }
                Ok(None) => thread::sleep(EXIT_POLL_INTERVAL),
                Err(err) => {
                    tracing::warn!(error = %err, "engine status unavailable");
                    break;
                }
            }
        }
        if let Err(err) = child.kill() {
            tracing::warn!(error = %err, "failed to kill engine");
        }
        let _ = child.wait();
    }
}

impl Engine for LexurgyClient {
    fn evolve(&mut self, request: &EvolveRequest) -> Result<Changed> {
        let line = request.to_line()?;
        let start = Instant::now();
        let exchanged = self.running()?.exchange(&line);
        let response = match exchanged {
            Ok(response) => response,
            Err(err) => {
                self.terminate();
                return Err(err);
            }
        };
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            words = request.words.len(),
            start_at = request.start_at.as_deref().unwrap_or("-"),
            stop_before = request.stop_before.as_deref().unwrap_or("-"),
            "engine round-trip"
        );
        parse_response(&response, request)
    }

    fn reset(&mut self) {
        self.terminate();
    }
}

impl Drop for LexurgyClient {
    fn drop(&mut self) {
        self.terminate();
    }
}
