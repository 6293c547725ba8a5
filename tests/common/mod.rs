//! Shared test infrastructure for CLI integration tests.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Answers every request with one fixed word, the way the engine server
/// would for a single-word batch.
const FAKE_ENGINE: &str = r#"echo "lexurgy server ready ($1)"
while read -r line; do
  echo '{"type":"changed","words":["abashi"],"intermediates":{"phonetic":["abaʃi"]},"traceLines":["Applied palatalization to apaki: apaki -> apaʃi"]}'
done
"#;

/// A temporary project directory driven through the `conlang` binary.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    /// Create a project with `conlang init` and a fake engine script.
    pub fn init() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let project = Self { dir };
        let output = project.run(&["init", "--name", "Stone"]);
        assert_success(&output);
        fs::write(project.engine_script(), FAKE_ENGINE).expect("write fake engine");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    fn engine_script(&self) -> PathBuf {
        self.path("fake-engine.sh")
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_conlang"));
        command
            .arg("--project")
            .arg(self.root())
            .args(args)
            .env(
                "CONLANG_ENGINE_COMMAND",
                format!("sh '{}'", self.engine_script().display()),
            )
            .env_remove("CONLANG_LOG");
        command
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().expect("run conlang")
    }

    /// Run with no engine configured anywhere: no override and an empty
    /// `PATH`.
    pub fn run_without_engine(&self, args: &[&str]) -> Output {
        self.command(args)
            .env_remove("CONLANG_ENGINE_COMMAND")
            .env("PATH", "")
            .output()
            .expect("run conlang")
    }

    pub fn run_with_input(&self, args: &[&str], input: &str) -> Output {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn conlang");
        child
            .stdin
            .take()
            .expect("stdin")
            .write_all(input.as_bytes())
            .expect("write stdin");
        child.wait_with_output().expect("wait conlang")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "conlang failed: {}\nstdout: {}\nstderr: {}",
        output.status,
        stdout(output),
        stderr(output)
    );
}
