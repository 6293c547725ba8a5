use crate::error::{Error, Result};
use crate::lexicon::domain::{Compound, ResolvedForm, Rule, Stress};
use crate::rules::Rules;
use serde::{Deserialize, Serialize};

/// Primary stress mark (U+02C8).
pub const PRIMARY_STRESS: char = 'ˈ';
pub const SYLLABLE_BREAK: &str = ".";

/// A unit of engine work: a string valid at `start`, to be evolved up to
/// `end` (exclusive; `None` means through the last rule).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Query {
    Leaf {
        form: String,
        start: Option<Rule>,
        end: Option<Rule>,
    },
    Node {
        stress: Stress,
        head: Box<Query>,
        tail: Box<Query>,
        start: Option<Rule>,
        end: Option<Rule>,
    },
}

impl Query {
    pub fn start(&self) -> Option<&Rule> {
        match self {
            Query::Leaf { start, .. } | Query::Node { start, .. } => start.as_ref(),
        }
    }

    pub fn end(&self) -> Option<&Rule> {
        match self {
            Query::Leaf { end, .. } | Query::Node { end, .. } => end.as_ref(),
        }
    }

    pub fn set_end(&mut self, era: Option<Rule>) {
        match self {
            Query::Leaf { end, .. } | Query::Node { end, .. } => *end = era,
        }
    }

    pub fn children(&self) -> Option<(&Query, &Query)> {
        match self {
            Query::Leaf { .. } => None,
            Query::Node { head, tail, .. } => Some((head, tail)),
        }
    }

    /// Whether the engine has work to do for this query.
    pub fn needs_work(&self) -> bool {
        self.start() != self.end()
    }

    /// A node is dependent when a child lives at a different era, so the
    /// child's evolved string must exist before the node can be assembled.
    pub fn is_dependent(&self) -> bool {
        self.children().is_some_and(|(head, tail)| {
            head.start() != self.start() || tail.start() != self.start()
        })
    }

    /// Dependency layer: leaves are 0, a node sits above its children and one
    /// higher again when it depends on their evolved output.
    pub fn layer(&self) -> usize {
        match self.children() {
            None => 0,
            Some((head, tail)) => {
                head.layer().max(tail.layer()) + usize::from(self.is_dependent())
            }
        }
    }
}

/// Turn an arranged form into its query tree.
pub fn build_query(form: &ResolvedForm, rules: &Rules) -> Result<Query> {
    match form {
        Compound::Component(morpheme) => Ok(Query::Leaf {
            form: morpheme.form.clone(),
            start: morpheme.era.clone(),
            end: None,
        }),
        Compound::Joined { head, joiner, tail } => {
            let mut head_query = build_query(head, rules)?;
            let mut tail_query = build_query(tail, rules)?;
            let join_rank = rules.rank(joiner.era.as_ref());
            for child in [&head_query, &tail_query] {
                if rules.rank(child.start()) > join_rank {
                    return Err(Error::BadAffixation {
                        joiner: describe_era(joiner.era.as_ref()),
                        stem: describe_era(child.start()),
                    });
                }
            }
            let start = match &joiner.era {
                None => None,
                Some(era) => {
                    head_query.set_end(Some(era.clone()));
                    tail_query.set_end(Some(era.clone()));
                    Some(era.clone())
                }
            };
            Ok(Query::Node {
                stress: joiner.stress,
                head: Box::new(head_query),
                tail: Box::new(tail_query),
                start,
                end: None,
            })
        }
    }
}

fn describe_era(era: Option<&Rule>) -> String {
    era.map_or_else(|| "no era".to_string(), ToString::to_string)
}

/// The string a query hands to the engine.
///
/// Children that live at the node's own era contribute their literal
/// assembly; children that had to be evolved first contribute the phonetic
/// string looked up through `evolved`.
pub fn assemble<F>(query: &Query, evolved: &F, syllables: bool) -> Result<String>
where
    F: Fn(&Query) -> Option<String>,
{
    match query {
        Query::Leaf { form, .. } => Ok(form.clone()),
        Query::Node {
            stress, head, tail, ..
        } => {
            let head_text = assemble_child(query, head, evolved, syllables)?;
            let tail_text = assemble_child(query, tail, evolved, syllables)?;
            Ok(combine(*stress, &head_text, &tail_text, syllables))
        }
    }
}

fn assemble_child<F>(parent: &Query, child: &Query, evolved: &F, syllables: bool) -> Result<String>
where
    F: Fn(&Query) -> Option<String>,
{
    if child.start() == parent.start() {
        return assemble(child, evolved, syllables);
    }
    evolved(child).ok_or_else(|| {
        Error::Cache(format!(
            "no evolved form for dependency starting at {}",
            describe_era(child.start())
        ))
    })
}

/// Join two strings, keeping primary stress only on the stressed side.
pub fn combine(stress: Stress, head: &str, tail: &str, syllables: bool) -> String {
    let strip = |text: &str| text.replace(PRIMARY_STRESS, "");
    let (head, tail) = match stress {
        Stress::Head => (head.to_string(), strip(tail)),
        Stress::Tail => (strip(head), tail.to_string()),
    };
    if syllables {
        format!("{head}{SYLLABLE_BREAK}{tail}")
    } else {
        format!("{head}{tail}")
    }
}
