//! Lexicon records and word forms.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named point in the rule sequence of the sound-change file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rule(pub String);

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A proto-language form, optionally born at a later era.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Morpheme {
    pub form: String,
    pub era: Option<Rule>,
}

impl Morpheme {
    pub fn new(form: impl Into<String>) -> Self {
        Self {
            form: form.into(),
            era: None,
        }
    }

    pub fn at(form: impl Into<String>, era: impl Into<String>) -> Self {
        Self {
            form: form.into(),
            era: Some(Rule::new(era)),
        }
    }
}

impl fmt::Display for Morpheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*{}", self.form)?;
        if let Some(era) = &self.era {
            write!(f, "{era}")?;
        }
        Ok(())
    }
}

/// A language variety namespace. The empty name is the root scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope(pub String);

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Symbolic reference to a lexicon entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lexeme {
    pub name: String,
    pub scope: Option<Scope>,
}

impl Lexeme {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: None,
        }
    }
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name)?;
        if let Some(scope) = &self.scope {
            write!(f, "{scope}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Affix {
    Prefix(String),
    Suffix(String),
}

impl Affix {
    pub fn name(&self) -> &str {
        match self {
            Affix::Prefix(name) | Affix::Suffix(name) => name,
        }
    }
}

impl fmt::Display for Affix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Affix::Prefix(name) => write!(f, "{name}."),
            Affix::Suffix(name) => write!(f, ".{name}"),
        }
    }
}

/// Which side of a join keeps its primary stress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stress {
    Head,
    Tail,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Joiner {
    pub stress: Stress,
    pub era: Option<Rule>,
}

impl Joiner {
    pub fn head() -> Self {
        Self {
            stress: Stress::Head,
            era: None,
        }
    }

    pub fn tail() -> Self {
        Self {
            stress: Stress::Tail,
            era: None,
        }
    }

    pub fn at(mut self, era: impl Into<String>) -> Self {
        self.era = Some(Rule::new(era));
        self
    }
}

impl fmt::Display for Joiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stress {
            Stress::Head => write!(f, "!+")?,
            Stress::Tail => write!(f, "+!")?,
        }
        if let Some(era) = &self.era {
            write!(f, "{era}")?;
        }
        Ok(())
    }
}

/// Binary tree of components joined by stress-marked joiners.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Compound<T> {
    Component(T),
    Joined {
        head: Box<Compound<T>>,
        joiner: Joiner,
        tail: Box<Compound<T>>,
    },
}

impl<T> Compound<T> {
    pub fn join(head: Compound<T>, joiner: Joiner, tail: Compound<T>) -> Self {
        Compound::Joined {
            head: Box::new(head),
            joiner,
            tail: Box::new(tail),
        }
    }

    /// Leaves in reading order.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Compound::Component(leaf) => out.push(leaf),
            Compound::Joined { head, tail, .. } => {
                head.collect_leaves(out);
                tail.collect_leaves(out);
            }
        }
    }
}

impl<T: fmt::Display> fmt::Display for Compound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compound::Component(leaf) => write!(f, "{leaf}"),
            Compound::Joined { head, joiner, tail } => {
                write_bracketed(f, head)?;
                write!(f, " {joiner} ")?;
                write_bracketed(f, tail)
            }
        }
    }
}

fn write_bracketed<T: fmt::Display>(f: &mut fmt::Formatter<'_>, part: &Compound<T>) -> fmt::Result {
    match part {
        Compound::Component(_) => write!(f, "{part}"),
        Compound::Joined { .. } => write!(f, "\"{part}\""),
    }
}

/// The stem of a fusion: a literal morpheme, a lexeme reference, or a
/// bracketed compound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stem {
    Morpheme(Morpheme),
    Lexeme(Lexeme),
    Word(Box<Word>),
}

/// A stem with attached affixes. Both lists are innermost first, so
/// `A.B.<x>.C.D` stores prefixes `[B, A]` and suffixes `[C, D]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fusion {
    pub stem: Stem,
    pub prefixes: Vec<Affix>,
    pub suffixes: Vec<Affix>,
}

impl Fusion {
    pub fn bare(stem: Stem) -> Self {
        Self {
            stem,
            prefixes: Vec::new(),
            suffixes: Vec::new(),
        }
    }
}

impl fmt::Display for Fusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for prefix in self.prefixes.iter().rev() {
            write!(f, "{prefix}")?;
        }
        match &self.stem {
            Stem::Morpheme(morpheme) => write!(f, "{morpheme}")?,
            Stem::Lexeme(lexeme) => write!(f, "{lexeme}")?,
            Stem::Word(word) => match word.as_ref() {
                Compound::Component(inner) => write!(f, "{inner}")?,
                joined => write!(f, "\"{joined}\"")?,
            },
        }
        for suffix in &self.suffixes {
            write!(f, "{suffix}")?;
        }
        Ok(())
    }
}

pub type Word = Compound<Fusion>;

/// A compound whose leaves are proto-morphemes; lexemes are fully expanded.
pub type ResolvedForm = Compound<Morpheme>;

/// Key/value tags attached to records and sentences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub const SCOPE: &'static str = "scope";

    pub fn from_map(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn scope(&self) -> Option<Scope> {
        self.get(Self::SCOPE).map(Scope::new)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self
            .0
            .iter()
            .map(|(key, value)| {
                if value.is_empty() {
                    key.clone()
                } else {
                    format!("{key}:{value}")
                }
            })
            .collect();
        write!(f, "{{{}}}", items.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sentence {
    pub tags: Tags,
    pub words: Vec<Word>,
}

/// An inflection pattern: affixes wrapped around a `$` placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Var {
    pub prefixes: Vec<Affix>,
    pub suffixes: Vec<Affix>,
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for prefix in self.prefixes.iter().rev() {
            write!(f, "{prefix}")?;
        }
        write!(f, "$")?;
        for suffix in &self.suffixes {
            write!(f, "{suffix}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub template: Option<String>,
    pub lexeme: Lexeme,
    pub tags: Tags,
    pub form: Word,
    pub part_of_speech: String,
    pub definition: String,
}

impl Entry {
    /// `(pos) definition`, or just `(pos)` when the definition is empty.
    pub fn description(&self) -> String {
        if self.definition.is_empty() {
            format!("({})", self.part_of_speech)
        } else {
            format!("({}) {}", self.part_of_speech, self.definition)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AffixForm {
    Word(Word),
    Var(Var),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffixDefinition {
    pub stressed: bool,
    pub affix: Affix,
    pub tags: Tags,
    pub era: Option<Rule>,
    pub form: Option<AffixForm>,
    pub sources: Vec<Lexeme>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub tags: Tags,
    pub vars: Vec<Var>,
}

/// One logical line of a lexicon file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Template(Template),
    Affix(AffixDefinition),
    Entry(Entry),
    Lang {
        child: Scope,
        parent: Scope,
        path: Option<String>,
    },
    Include(String),
}

/// Anything `lookup` can describe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Describable {
    Lexeme(Lexeme),
    Affix(Affix),
    Morpheme(Morpheme),
}

impl fmt::Display for Describable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Describable::Lexeme(lexeme) => write!(f, "{lexeme}"),
            Describable::Affix(affix) => write!(f, "{affix}"),
            Describable::Morpheme(morpheme) => write!(f, "{morpheme}"),
        }
    }
}
