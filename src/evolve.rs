//! Evolution of forms through the sound-change engine.
//!
//! [`Evolver`] normalizes inputs to arranged forms, plans the engine work,
//! runs only the queries missing from the persistent caches and reads each
//! input's result back from its root query. Results live until the rule
//! file's content changes.
use crate::arrange::arrange;
use crate::batch::{assemble, plan, Batch, Plan, Query};
use crate::cache::{PathCached, PersistentCache};
use crate::checksum::checksum;
use crate::error::{Error, Result};
use crate::lexicon::domain::{Compound, Morpheme, ResolvedForm};
use crate::lexurgy::{Engine, EvolveRequest, TraceLine};
use crate::rules::Rules;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

pub const EVOLVE_CACHE_FILE: &str = "evolve-cache.cache";
pub const TRACE_CACHE_FILE: &str = "trace-cache.cache";

/// A form before and after sound change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evolved {
    pub proto: String,
    pub modern: String,
    pub phonetic: String,
}

/// Rule applications per query, innermost queries first. Each entry is the
/// string sent to the engine and the lines it reported for it.
pub type Trace = Vec<(String, Vec<TraceLine>)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evolvable {
    Text(String),
    Morpheme(Morpheme),
    Form(ResolvedForm),
}

impl From<&str> for Evolvable {
    fn from(text: &str) -> Self {
        Evolvable::Text(text.to_string())
    }
}

impl From<String> for Evolvable {
    fn from(text: String) -> Self {
        Evolvable::Text(text)
    }
}

impl From<Morpheme> for Evolvable {
    fn from(morpheme: Morpheme) -> Self {
        Evolvable::Morpheme(morpheme)
    }
}

impl From<ResolvedForm> for Evolvable {
    fn from(form: ResolvedForm) -> Self {
        Evolvable::Form(form)
    }
}

pub struct Evolver<E: Engine> {
    rules_path: PathBuf,
    rules: PathCached<Rules>,
    rules_hash: Option<String>,
    engine: E,
    evolved: PersistentCache<Query, Evolved>,
    traces: PersistentCache<Query, Vec<TraceLine>>,
    syllables: bool,
}

impl<E: Engine> Evolver<E> {
    /// Open the caches under `cache_dir`; both depend on the rule file and
    /// on whether syllable breaks are written.
    pub fn new(rules_path: &Path, cache_dir: &Path, engine: E, syllables: bool) -> Self {
        let sources = vec![rules_path.to_path_buf()];
        let settings = format!("syllables={syllables}");
        Self {
            rules_path: rules_path.to_path_buf(),
            rules: PathCached::new(),
            rules_hash: None,
            engine,
            evolved: PersistentCache::load(
                cache_dir.join(EVOLVE_CACHE_FILE),
                sources.clone(),
                settings.as_str(),
            ),
            traces: PersistentCache::load(cache_dir.join(TRACE_CACHE_FILE), sources, settings),
            syllables,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The current rule order, reloaded when the rule file changes.
    pub fn rules(&self) -> Result<Arc<Rules>> {
        let path = self.rules_path.clone();
        self.rules
            .get(&[self.rules_path.clone()], move || Rules::load(&path))
    }

    pub fn evolve(&mut self, inputs: &[Evolvable]) -> Result<Vec<Evolved>> {
        let plan = self.prepare(inputs)?;
        self.run(&plan, false)?;
        self.results(&plan)
    }

    pub fn trace(&mut self, inputs: &[Evolvable]) -> Result<Vec<(Evolved, Trace)>> {
        let plan = self.prepare(inputs)?;
        self.run(&plan, true)?;
        let results = self.results(&plan)?;
        Ok(results
            .into_iter()
            .zip(&plan.roots)
            .map(|(evolved, root)| {
                let mut trace = Trace::new();
                self.collect_trace(root, &mut trace);
                (evolved, trace)
            })
            .collect())
    }

    /// Write both caches to disk if they changed.
    pub fn flush(&mut self) -> Result<()> {
        self.evolved.save()?;
        self.traces.save()
    }

    /// Reset the engine and drop cached results when the rule file changed
    /// since the last call.
    fn refresh(&mut self) -> Result<Arc<Rules>> {
        let hash = checksum(&self.rules_path)?;
        match &self.rules_hash {
            Some(previous) if *previous == hash => {}
            Some(_) => {
                tracing::info!(path = %self.rules_path.display(), "rule file changed; resetting engine");
                self.engine.reset();
                self.evolved.clear()?;
                self.traces.clear()?;
            }
            None => {
                self.evolved.revalidate()?;
                self.traces.revalidate()?;
            }
        }
        self.rules_hash = Some(hash);
        self.rules()
    }

    fn prepare(&mut self, inputs: &[Evolvable]) -> Result<Plan> {
        let rules = self.refresh()?;
        let forms: Vec<ResolvedForm> = inputs
            .iter()
            .map(|input| normalize(input, &rules))
            .collect();
        plan(&forms, &rules)
    }

    fn run(&mut self, plan: &Plan, trace: bool) -> Result<()> {
        for layer in &plan.layers {
            for batch in &layer.batches {
                self.run_batch(layer.index, batch, trace)?;
            }
        }
        Ok(())
    }

    fn run_batch(&mut self, layer: usize, batch: &Batch, trace: bool) -> Result<()> {
        let pending: Vec<&Query> = batch
            .queries
            .iter()
            .filter(|query| {
                !self.evolved.contains(query) || (trace && !self.traces.contains(query))
            })
            .collect();
        if pending.is_empty() {
            tracing::debug!(layer, queries = batch.queries.len(), "batch fully cached");
            return Ok(());
        }

        // Queries assembling to the same string share one engine word.
        let mut words: Vec<String> = Vec::new();
        let mut slots: Vec<usize> = Vec::with_capacity(pending.len());
        {
            let evolved = &self.evolved;
            let phonetic = |query: &Query| evolved.get(query).map(|found| found.phonetic.clone());
            for query in &pending {
                let word = assemble(query, &phonetic, self.syllables)?;
                let slot = match words.iter().position(|known| *known == word) {
                    Some(slot) => slot,
                    None => {
                        words.push(word);
                        words.len() - 1
                    }
                };
                slots.push(slot);
            }
        }

        let request = EvolveRequest::new(words, batch.start.as_ref(), batch.end.as_ref(), trace);
        let started = Instant::now();
        let changed = self.engine.evolve(&request)?;
        tracing::info!(
            layer,
            words = request.words.len(),
            cached = batch.queries.len() - pending.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch evolved"
        );

        let mut lines_by_word: HashMap<&str, Vec<TraceLine>> = HashMap::new();
        for line in &changed.trace {
            lines_by_word
                .entry(line.word.as_str())
                .or_default()
                .push(line.clone());
        }
        for (query, slot) in pending.into_iter().zip(slots) {
            let word = &request.words[slot];
            self.evolved.insert(
                query.clone(),
                Evolved {
                    proto: word.clone(),
                    modern: changed.words[slot].clone(),
                    phonetic: changed.phonetic[slot].clone(),
                },
            );
            if trace {
                let lines = lines_by_word.get(word.as_str()).cloned().unwrap_or_default();
                self.traces.insert(query.clone(), lines);
            }
        }
        Ok(())
    }

    fn results(&self, plan: &Plan) -> Result<Vec<Evolved>> {
        plan.roots
            .iter()
            .map(|root| {
                self.evolved.get(root).cloned().ok_or_else(|| {
                    Error::Cache("evolved form missing after evolution".to_string())
                })
            })
            .collect()
    }

    /// Head first, then tail, then the query's own lines.
    fn collect_trace(&self, query: &Query, out: &mut Trace) {
        if let Some((head, tail)) = query.children() {
            self.collect_trace(head, out);
            self.collect_trace(tail, out);
        }
        if let (Some(lines), Some(evolved)) = (self.traces.get(query), self.evolved.get(query)) {
            out.push((evolved.proto.clone(), lines.clone()));
        }
    }
}

/// Bring any input to an arranged form.
pub fn normalize(input: &Evolvable, rules: &Rules) -> ResolvedForm {
    match input {
        Evolvable::Text(text) => Compound::Component(Morpheme::new(text.as_str())),
        Evolvable::Morpheme(morpheme) => Compound::Component(morpheme.clone()),
        Evolvable::Form(form) => arrange(form, rules),
    }
}

#[cfg(test)]
#[path = "evolve_tests.rs"]
mod tests;
