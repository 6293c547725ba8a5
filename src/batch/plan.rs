use super::query::{build_query, Query};
use crate::error::Result;
use crate::lexicon::domain::{ResolvedForm, Rule};
use crate::rules::Rules;
use std::collections::{BTreeMap, HashSet};

/// Queries sharing one rule window; one engine round-trip each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub start: Option<Rule>,
    pub end: Option<Rule>,
    pub queries: Vec<Query>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub index: usize,
    pub batches: Vec<Batch>,
}

/// Work for a set of arranged forms. `roots[i]` is the query whose result
/// answers input `i`; layers must be run in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub roots: Vec<Query>,
    pub layers: Vec<Layer>,
}

impl Plan {
    pub fn query_count(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|layer| &layer.batches)
            .map(|batch| batch.queries.len())
            .sum()
    }
}

type Buckets = BTreeMap<usize, BTreeMap<(Option<Rule>, Option<Rule>), Vec<Query>>>;

pub fn plan(forms: &[ResolvedForm], rules: &Rules) -> Result<Plan> {
    let roots = forms
        .iter()
        .map(|form| build_query(form, rules))
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    let mut buckets = Buckets::new();
    for root in &roots {
        schedule(root, true, &mut seen, &mut buckets);
    }

    let layers: Vec<Layer> = buckets
        .into_iter()
        .map(|(index, windows)| Layer {
            index,
            batches: windows
                .into_iter()
                .map(|((start, end), queries)| Batch {
                    start,
                    end,
                    queries,
                })
                .collect(),
        })
        .collect();
    let plan = Plan { roots, layers };
    tracing::debug!(
        inputs = forms.len(),
        layers = plan.layers.len(),
        queries = plan.query_count(),
        "evolution planned"
    );
    Ok(plan)
}

/// Visit children before parents so every emitted query lands after the
/// queries it depends on. Returns the query's layer.
fn schedule(query: &Query, root: bool, seen: &mut HashSet<Query>, buckets: &mut Buckets) -> usize {
    let layer = match query.children() {
        None => 0,
        Some((head, tail)) => {
            let head_layer = schedule(head, false, seen, buckets);
            let tail_layer = schedule(tail, false, seen, buckets);
            head_layer.max(tail_layer) + usize::from(query.is_dependent())
        }
    };
    let materialize = root && query.start().is_none() && query.end().is_none();
    if (query.needs_work() || materialize) && seen.insert(query.clone()) {
        buckets
            .entry(layer)
            .or_default()
            .entry((query.start().cloned(), query.end().cloned()))
            .or_default()
            .push(query.clone());
    }
    layer
}
