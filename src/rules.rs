//! Rule order read from the sound-change (`.lsc`) file.
//!
//! The file is opaque except for rule headers: a line starting with
//! `name:` declares the next rule in application order.
use crate::error::{Error, Result};
use crate::lexicon::domain::Rule;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| Regex::new(r"^([A-Za-z0-9-]+):").expect("valid rule header regex"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rules {
    names: Vec<String>,
}

impl Rules {
    pub fn parse(text: &str) -> Self {
        let mut names: Vec<String> = Vec::new();
        for line in text.lines() {
            let Some(captures) = header_regex().captures(line) else {
                continue;
            };
            let name = &captures[1];
            if !names.iter().any(|known| known == name) {
                names.push(name.to_string());
            }
        }
        Self { names }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        let rules = Self::parse(&text);
        tracing::debug!(path = %path.display(), rules = rules.names.len(), "rule order loaded");
        Ok(rules)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, rule: &Rule) -> bool {
        self.position(rule).is_some()
    }

    /// Position in the total era order. No era ranks below every named
    /// rule; a rule missing from the file ranks with no era.
    pub fn rank(&self, era: Option<&Rule>) -> usize {
        era.and_then(|rule| self.position(rule))
            .map_or(0, |index| index + 1)
    }

    fn position(&self, rule: &Rule) -> Option<usize> {
        self.names.iter().position(|name| name == rule.name())
    }
}
