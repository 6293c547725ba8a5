//! A loaded project: metadata, the lexicon and an evolver.
//!
//! The lexicon is reloaded whenever any file it was read from, or the rule
//! file it is validated against, changes content.
use crate::cache::PathCached;
use crate::error::Result;
use crate::evolve::{Evolvable, Evolved, Evolver, Trace};
use crate::lexicon::domain::{Describable, Lexeme, ResolvedForm, Sentence, Stem, Var};
use crate::lexicon::parse::parse_sentence;
use crate::lexicon::Lexicon;
use crate::lexurgy::{Engine, LexurgyClient};
use crate::project::{engine_command, Metadata, ProjectPaths};
use crate::rules::Rules;
use anyhow::Context;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

pub struct Session<E: Engine> {
    paths: ProjectPaths,
    metadata: Metadata,
    lexicon: PathCached<Lexicon>,
    evolver: Evolver<E>,
}

impl Session<LexurgyClient> {
    /// Open the project at `root`. The engine command is looked up when the
    /// first word is evolved.
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let paths = ProjectPaths::new(root);
        let metadata = Metadata::load(&paths.metadata_path())
            .with_context(|| format!("load project at {}", root.display()))?;
        let engine = {
            let metadata = metadata.clone();
            let changes = paths.changes_path();
            LexurgyClient::deferred(move || engine_command(&metadata, &changes))
        };
        Ok(Self::with_engine(paths, metadata, engine))
    }
}

impl<E: Engine> Session<E> {
    pub fn with_engine(paths: ProjectPaths, metadata: Metadata, engine: E) -> Self {
        let evolver = Evolver::new(
            &paths.changes_path(),
            &paths.cache_dir(),
            engine,
            metadata.syllables,
        );
        Self {
            paths,
            metadata,
            lexicon: PathCached::new(),
            evolver,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    #[cfg(test)]
    pub fn evolver(&self) -> &Evolver<E> {
        &self.evolver
    }

    /// The current lexicon, validated against the current rule order.
    pub fn lexicon(&self) -> Result<Arc<Lexicon>> {
        let lexicon_path = self.paths.lexicon_path();
        let changes_path = self.paths.changes_path();
        self.lexicon.get_tracked(|| {
            let rules = Rules::load(&changes_path)?;
            let lexicon = Lexicon::load(&lexicon_path)?.with_rules(rules);
            let mut dependencies = lexicon.sources().to_vec();
            dependencies.push(changes_path.clone());
            Ok((lexicon, dependencies))
        })
    }

    /// Parse and resolve a sentence typed by the author.
    pub fn resolve_text(&self, text: &str) -> Result<Vec<ResolvedForm>> {
        let sentence = parse_sentence(text)?;
        self.resolve_sentence(&sentence)
    }

    pub fn resolve_sentence(&self, sentence: &Sentence) -> Result<Vec<ResolvedForm>> {
        self.lexicon()?
            .resolve_sentence(sentence, &self.metadata.default_scope())
    }

    pub fn evolve_text(&mut self, text: &str) -> Result<Vec<Evolved>> {
        let inputs = self.evolvables(text)?;
        self.evolver.evolve(&inputs)
    }

    pub fn trace_text(&mut self, text: &str) -> Result<Vec<(Evolved, Trace)>> {
        let inputs = self.evolvables(text)?;
        self.evolver.trace(&inputs)
    }

    /// Describe every lexeme, affix and morpheme named in `text`.
    pub fn lookup_text(&self, text: &str) -> Result<Vec<(Describable, String)>> {
        let sentence = parse_sentence(text)?;
        let scope = sentence
            .tags
            .scope()
            .unwrap_or_else(|| self.metadata.default_scope());
        let lexicon = self.lexicon()?;
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for word in &sentence.words {
            for (item, description) in lexicon.lookup(word, &scope)? {
                if seen.insert(item.clone()) {
                    found.push((item, description));
                }
            }
        }
        Ok(found)
    }

    /// Every entry in declaration order, named as it would be typed.
    pub fn entries(&self) -> Result<Vec<(Lexeme, String)>> {
        let lexicon = self.lexicon()?;
        Ok(lexicon
            .entries()
            .map(|(scope, entry)| {
                let lexeme = Lexeme {
                    name: entry.lexeme.name.clone(),
                    scope: (!scope.is_root()).then(|| scope.clone()),
                };
                (lexeme, entry.description())
            })
            .collect())
    }

    /// Evolve every template inflection of each lexeme named in `text`.
    pub fn inflect_text(&mut self, text: &str) -> Result<Vec<(Lexeme, Vec<(Var, Evolved)>)>> {
        let sentence = parse_sentence(text)?;
        let scope = sentence
            .tags
            .scope()
            .unwrap_or_else(|| self.metadata.default_scope());
        let lexicon = self.lexicon()?;
        let mut lexemes: Vec<(Lexeme, Vec<Var>)> = Vec::new();
        let mut forms = Vec::new();
        for word in &sentence.words {
            for fusion in word.leaves() {
                let Stem::Lexeme(lexeme) = &fusion.stem else {
                    continue;
                };
                if lexemes.iter().any(|(known, _)| known == lexeme) {
                    continue;
                }
                let lookup_scope = lexeme.scope.as_ref().unwrap_or(&scope);
                let entry = lexicon.entry(&lexeme.name, lookup_scope)?;
                let mut vars = Vec::new();
                for (var, form) in lexicon.inflections(entry, lookup_scope)? {
                    vars.push(var);
                    forms.push(Evolvable::from(form));
                }
                lexemes.push((lexeme.clone(), vars));
            }
        }
        let mut evolved = self.evolver.evolve(&forms)?.into_iter();
        Ok(lexemes
            .into_iter()
            .map(|(lexeme, vars)| {
                let paired = vars.into_iter().zip(evolved.by_ref()).collect();
                (lexeme, paired)
            })
            .collect())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.evolver.flush()
    }

    fn evolvables(&self, text: &str) -> Result<Vec<Evolvable>> {
        Ok(self
            .resolve_text(text)?
            .into_iter()
            .map(Evolvable::from)
            .collect())
    }
}
