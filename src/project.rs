//! Project layout, metadata and engine discovery.
use crate::lexicon::domain::Scope;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides how the engine server is launched, e.g. `lexurgy server {changes}`.
pub const ENGINE_COMMAND_ENV: &str = "CONLANG_ENGINE_COMMAND";
const CHANGES_PLACEHOLDER: &str = "{changes}";

/// Contents of `metadata.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub author: String,
    /// Insert `.` between joined morphemes before evolution.
    #[serde(default)]
    pub syllables: bool,
    /// Scope used when input names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Engine install directory (containing `bin/lexurgy`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lexurgy: Option<PathBuf>,
}

impl Metadata {
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
            syllables: false,
            scope: None,
            lexurgy: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse {}", path.display()))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).context("serialize metadata")?;
        fs::write(path, text).with_context(|| format!("write {}", path.display()))
    }

    pub fn default_scope(&self) -> Scope {
        self.scope.as_deref().map(Scope::new).unwrap_or_default()
    }
}

/// Typed paths into a project directory.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join("metadata.toml")
    }

    pub fn lexicon_path(&self) -> PathBuf {
        self.root.join("lexicon.pycl")
    }

    pub fn changes_path(&self) -> PathBuf {
        self.root.join("changes.lsc")
    }

    pub fn book_path(&self) -> PathBuf {
        self.root.join("book.md")
    }

    pub fn book_html_path(&self) -> PathBuf {
        self.root.join("book.html")
    }

    /// Return the hidden `.conlang/` directory holding persistent caches.
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(".conlang")
    }
}

/// Resolve the engine command line in priority order:
/// 1. `CONLANG_ENGINE_COMMAND` environment variable
/// 2. `lexurgy` install directory in metadata
/// 3. `lexurgy` on `PATH`
pub fn engine_command(metadata: &Metadata, changes: &Path) -> Result<Vec<String>> {
    let from_env = std::env::var(ENGINE_COMMAND_ENV).ok();
    let on_path = || which::which("lexurgy").ok();
    resolve_engine_command(from_env.as_deref(), metadata, changes, on_path)
}

fn resolve_engine_command(
    from_env: Option<&str>,
    metadata: &Metadata,
    changes: &Path,
    on_path: impl FnOnce() -> Option<PathBuf>,
) -> Result<Vec<String>> {
    let changes = changes.to_string_lossy().into_owned();
    if let Some(command) = from_env.map(str::trim).filter(|command| !command.is_empty()) {
        let mut args = shell_words::split(command)
            .with_context(|| format!("parse {ENGINE_COMMAND_ENV}: {command}"))?;
        if args.is_empty() {
            return Err(anyhow!("{ENGINE_COMMAND_ENV} is empty"));
        }
        let mut substituted = false;
        for arg in &mut args {
            if arg.contains(CHANGES_PLACEHOLDER) {
                *arg = arg.replace(CHANGES_PLACEHOLDER, &changes);
                substituted = true;
            }
        }
        if !substituted {
            args.push(changes);
        }
        return Ok(args);
    }
    if let Some(install) = &metadata.lexurgy {
        let script = install.join("bin").join("lexurgy");
        return Ok(vec![
            "sh".to_string(),
            script.to_string_lossy().into_owned(),
            "server".to_string(),
            changes,
        ]);
    }
    if let Some(binary) = on_path() {
        return Ok(vec![
            binary.to_string_lossy().into_owned(),
            "server".to_string(),
            changes,
        ]);
    }
    Err(anyhow!(
        "lexurgy not found; set {ENGINE_COMMAND_ENV}, add `lexurgy` to metadata.toml, or put lexurgy on PATH"
    ))
}

/// Install directory of a `lexurgy` launcher found on `PATH`.
pub fn locate_lexurgy_install() -> Result<PathBuf> {
    let binary = which::which("lexurgy").context("locate lexurgy on PATH")?;
    let binary = binary.canonicalize().unwrap_or(binary);
    binary
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("unexpected lexurgy location {}", binary.display()))
}
