//! Lexicon model: entries, affixes, templates and scopes.
//!
//! A lexicon is loaded from a root `.pycl` file plus everything it includes.
//! Lookups walk from the requested scope through its parents to the root
//! scope. Resolution turns words into compounds of
//! proto-morphemes.
pub mod domain;
pub mod parse;
mod resolve;

use crate::error::{Error, Result};
use crate::rules::Rules;
use domain::{Affix, AffixDefinition, Entry, Record, Scope, Template, Var};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub use domain::{Describable, ResolvedForm, Sentence, Word};

#[derive(Debug, Default)]
pub struct Lexicon {
    entries: HashMap<(Scope, String), Entry>,
    affixes: HashMap<(Scope, Affix), AffixDefinition>,
    templates: HashMap<String, Template>,
    parents: HashMap<Scope, Scope>,
    order: Vec<(Scope, String)>,
    rules: Option<Rules>,
    sources: Vec<PathBuf>,
}

impl Lexicon {
    /// Load a lexicon from `path`, following `include` and `lang` records.
    pub fn load(path: &Path) -> Result<Self> {
        let mut lexicon = Lexicon::default();
        let mut loading = Vec::new();
        lexicon.load_file(path, &Scope::default(), &mut loading)?;
        tracing::debug!(
            path = %path.display(),
            entries = lexicon.entries.len(),
            affixes = lexicon.affixes.len(),
            templates = lexicon.templates.len(),
            "lexicon loaded"
        );
        Ok(lexicon)
    }

    /// Build a lexicon from already-parsed records in the root scope.
    #[cfg(test)]
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let mut lexicon = Lexicon::default();
        for record in records {
            lexicon.add_record(record, &Scope::default(), None, &mut Vec::new())?;
        }
        Ok(lexicon)
    }

    /// Attach the rule order used to validate eras during resolution.
    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Every file read while loading, root first.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Entries in declaration order, with the scope each was stored under.
    pub fn entries(&self) -> impl Iterator<Item = (&Scope, &Entry)> {
        self.order
            .iter()
            .filter_map(|key| Some((&key.0, self.entries.get(key)?)))
    }

    pub fn entry(&self, name: &str, scope: &Scope) -> Result<&Entry> {
        Ok(self.find_entry(name, scope)?.1)
    }

    /// Look up an entry, returning the scope it was defined in.
    fn find_entry(&self, name: &str, scope: &Scope) -> Result<(Scope, &Entry)> {
        self.scope_chain(scope)
            .into_iter()
            .find_map(|candidate| {
                let key = (candidate, name.to_string());
                let entry = self.entries.get(&key)?;
                Some((key.0, entry))
            })
            .ok_or_else(|| Error::MissingLexeme {
                name: name.to_string(),
                scope: scope.to_string(),
            })
    }

    pub fn affix(&self, affix: &Affix, scope: &Scope) -> Result<&AffixDefinition> {
        Ok(self.find_affix(affix, scope)?.1)
    }

    fn find_affix(&self, affix: &Affix, scope: &Scope) -> Result<(Scope, &AffixDefinition)> {
        self.scope_chain(scope)
            .into_iter()
            .find_map(|candidate| {
                let key = (candidate, affix.clone());
                let definition = self.affixes.get(&key)?;
                Some((key.0, definition))
            })
            .ok_or_else(|| Error::MissingAffix {
                name: affix.to_string(),
                scope: scope.to_string(),
            })
    }

    pub fn template(&self, name: &str) -> Result<&Template> {
        self.templates
            .get(name)
            .ok_or_else(|| Error::MissingTemplate(name.to_string()))
    }

    /// The variables of a template, or a single empty variable without one.
    pub fn get_vars(&self, template: Option<&str>) -> Result<Vec<Var>> {
        match template {
            None => Ok(vec![Var::default()]),
            Some(name) => Ok(self.template(name)?.vars.clone()),
        }
    }

    /// The scope an entry lives in: its own tag, else the given default.
    fn record_scope(tags: &domain::Tags, default: &Scope) -> Scope {
        tags.scope().unwrap_or_else(|| default.clone())
    }

    /// `scope`, its ancestors, then the root scope.
    fn scope_chain(&self, scope: &Scope) -> Vec<Scope> {
        let mut chain = vec![scope.clone()];
        let mut current = scope;
        while let Some(parent) = self.parents.get(current) {
            if chain.contains(parent) {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        if !chain.iter().any(Scope::is_root) {
            chain.push(Scope::default());
        }
        chain
    }

    fn load_file(&mut self, path: &Path, scope: &Scope, loading: &mut Vec<PathBuf>) -> Result<()> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if loading.contains(&canonical) {
            return Err(Error::CyclicDefinition(path.display().to_string()));
        }
        let text = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        let records = parse::parse_records(&text, Some(path))?;
        self.sources.push(path.to_path_buf());
        loading.push(canonical);
        for record in records {
            self.add_record(record, scope, path.parent(), loading)?;
        }
        loading.pop();
        Ok(())
    }

    fn add_record(
        &mut self,
        record: Record,
        scope: &Scope,
        dir: Option<&Path>,
        loading: &mut Vec<PathBuf>,
    ) -> Result<()> {
        match record {
            Record::Entry(entry) => {
                let scope = entry
                    .lexeme
                    .scope
                    .clone()
                    .unwrap_or_else(|| Self::record_scope(&entry.tags, scope));
                let key = (scope.clone(), entry.lexeme.name.clone());
                if self.entries.contains_key(&key) {
                    return Err(Error::DuplicateDefinition {
                        kind: "lexeme",
                        name: entry.lexeme.to_string(),
                        scope: scope.to_string(),
                    });
                }
                self.order.push(key.clone());
                self.entries.insert(key, entry);
            }
            Record::Affix(definition) => {
                let scope = Self::record_scope(&definition.tags, scope);
                let key = (scope.clone(), definition.affix.clone());
                if self.affixes.contains_key(&key) {
                    return Err(Error::DuplicateDefinition {
                        kind: "affix",
                        name: definition.affix.to_string(),
                        scope: scope.to_string(),
                    });
                }
                self.affixes.insert(key, definition);
            }
            Record::Template(template) => {
                if self.templates.contains_key(&template.name) {
                    return Err(Error::DuplicateDefinition {
                        kind: "template",
                        name: format!("&{}", template.name),
                        scope: Scope::default().to_string(),
                    });
                }
                self.templates.insert(template.name.clone(), template);
            }
            Record::Lang {
                child,
                parent,
                path,
            } => {
                self.parents.insert(child.clone(), parent);
                if let Some(path) = path {
                    let resolved = resolve_relative(dir, &path);
                    self.load_file(&resolved, &child, loading)?;
                }
            }
            Record::Include(path) => {
                let resolved = resolve_relative(dir, &path);
                self.load_file(&resolved, scope, loading)?;
            }
        }
        Ok(())
    }
}

fn resolve_relative(dir: Option<&Path>, path: &str) -> PathBuf {
    let path = Path::new(path);
    match dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
#[path = "lexicon_tests.rs"]
mod tests;
