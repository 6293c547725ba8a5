//! Error taxonomy for the evolution pipeline.
//!
//! Core modules return [`Error`] so callers can match on the failure kind
//! (the REPL prints it, the book compiler substitutes `???`). The command
//! layer wraps these in `anyhow` with context.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("parse error at {location}: expected {expected}, found {found}")]
    Parse {
        location: Location,
        expected: String,
        found: String,
    },
    #[error("missing lexeme <{name}> in scope {scope}")]
    MissingLexeme { name: String, scope: String },
    #[error("missing affix {name} in scope {scope}")]
    MissingAffix { name: String, scope: String },
    #[error("missing template &{0}")]
    MissingTemplate(String),
    #[error("cyclic definition through {0}")]
    CyclicDefinition(String),
    #[error("affix {0} has neither a form nor source lexemes")]
    AffixDefinitionMissingForm(String),
    #[error("affix {affix} uses a variable form but has {sources} source lexemes (expected 1)")]
    MissingVar { affix: String, sources: usize },
    #[error("bad affixation: joiner at {joiner} attaches to a form that starts at {stem}")]
    BadAffixation { joiner: String, stem: String },
    #[error("tag {0} is defined twice")]
    DoubleTagDefinition(String),
    #[error("{kind} {name} is defined twice in scope {scope}")]
    DuplicateDefinition {
        kind: &'static str,
        name: String,
        scope: String,
    },
    #[error("unknown rule @{0}")]
    UnknownRule(String),
    #[error("sound-change engine error: {message}")]
    Evolve {
        message: String,
        stack_trace: Vec<String>,
    },
    #[error("engine response has no type: {0}")]
    ResponseMissingType(String),
    #[error("engine response has unknown type {0}")]
    ResponseBadType(String),
    #[error("engine protocol violation: {0}")]
    Protocol(String),
    #[error("sound-change engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("cache error: {0}")]
    Cache(String),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Short kind label shown by the REPL before the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Parse { .. } => "ParseError",
            Error::MissingLexeme { .. } => "MissingLexeme",
            Error::MissingAffix { .. } => "MissingAffix",
            Error::MissingTemplate(_) => "MissingTemplate",
            Error::CyclicDefinition(_) => "CyclicDefinition",
            Error::AffixDefinitionMissingForm(_) => "AffixDefinitionMissingForm",
            Error::MissingVar { .. } => "MissingVar",
            Error::BadAffixation { .. } => "BadAffixation",
            Error::DoubleTagDefinition(_) => "DoubleTagDefinition",
            Error::DuplicateDefinition { .. } => "DuplicateDefinition",
            Error::UnknownRule(_) => "UnknownRule",
            Error::Evolve { .. } => "EvolveError",
            Error::ResponseMissingType(_) => "ResponseMissingType",
            Error::ResponseBadType(_) => "ResponseBadType",
            Error::Protocol(_) => "ProtocolError",
            Error::EngineUnavailable(_) => "EngineUnavailable",
            Error::Cache(_) => "CacheError",
            Error::Io { .. } => "IoError",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Source position attached to parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: Option<PathBuf>,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}:{}:{}", path.display(), self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
