//! Expansion of words into trees of proto-morphemes.
use super::domain::{
    Affix, AffixDefinition, AffixForm, Compound, Describable, Entry, Fusion, Joiner, Lexeme,
    ResolvedForm, Rule, Scope, Sentence, Stem, Stress, Var, Word,
};
use super::Lexicon;
use crate::error::{Error, Result};
use std::collections::HashSet;

impl Lexicon {
    /// Expand every lexeme and affix in `word`, looking names up from `scope`.
    pub fn resolve(&self, word: &Word, scope: &Scope) -> Result<ResolvedForm> {
        Resolver::new(self).word(word, scope)
    }

    /// Resolve each word of a sentence in the sentence's scope, falling back
    /// to `default_scope` when its tags name none.
    pub fn resolve_sentence(
        &self,
        sentence: &Sentence,
        default_scope: &Scope,
    ) -> Result<Vec<ResolvedForm>> {
        let scope = sentence
            .tags
            .scope()
            .unwrap_or_else(|| default_scope.clone());
        sentence
            .words
            .iter()
            .map(|word| self.resolve(word, &scope))
            .collect()
    }

    /// Wrap `form` in the affixes of `var`, then resolve the result.
    pub fn substitute(&self, var: &Var, form: &Word, scope: &Scope) -> Result<ResolvedForm> {
        Resolver::new(self).substitute(var, form, scope)
    }

    /// Every inflected form of an entry, one per variable of its template.
    pub fn inflections(&self, entry: &Entry, scope: &Scope) -> Result<Vec<(Var, ResolvedForm)>> {
        let reference = Compound::Component(Fusion::bare(Stem::Lexeme(Lexeme {
            name: entry.lexeme.name.clone(),
            scope: Some(entry.lexeme.scope.clone().unwrap_or_else(|| scope.clone())),
        })));
        self.get_vars(entry.template.as_deref())?
            .into_iter()
            .map(|var| {
                let form = self.substitute(&var, &reference, scope)?;
                Ok((var, form))
            })
            .collect()
    }

    /// Every definable named directly in `word`, with its description.
    ///
    /// Lexemes are described by part of speech and definition, affixes by
    /// their description, morphemes by their own form. Duplicates are
    /// reported once, in reading order.
    pub fn lookup(&self, word: &Word, scope: &Scope) -> Result<Vec<(Describable, String)>> {
        let mut found = Vec::new();
        self.collect_definables(word, scope, &mut found)?;
        let mut seen = HashSet::new();
        found.retain(|(item, _)| seen.insert(item.clone()));
        Ok(found)
    }

    fn collect_definables(
        &self,
        word: &Word,
        scope: &Scope,
        out: &mut Vec<(Describable, String)>,
    ) -> Result<()> {
        for fusion in word.leaves() {
            for prefix in fusion.prefixes.iter().rev() {
                out.push(self.describe_affix(prefix, scope)?);
            }
            match &fusion.stem {
                Stem::Morpheme(morpheme) => {
                    out.push((Describable::Morpheme(morpheme.clone()), morpheme.form.clone()));
                }
                Stem::Lexeme(lexeme) => {
                    let lookup_scope = lexeme.scope.as_ref().unwrap_or(scope);
                    let entry = self.entry(&lexeme.name, lookup_scope)?;
                    out.push((Describable::Lexeme(lexeme.clone()), entry.description()));
                }
                Stem::Word(inner) => self.collect_definables(inner, scope, out)?,
            }
            for suffix in &fusion.suffixes {
                out.push(self.describe_affix(suffix, scope)?);
            }
        }
        Ok(())
    }

    fn describe_affix(&self, affix: &Affix, scope: &Scope) -> Result<(Describable, String)> {
        let definition = self.affix(affix, scope)?;
        Ok((
            Describable::Affix(affix.clone()),
            definition.description.clone(),
        ))
    }
}

/// One resolution pass. `visiting` holds the definitions currently being
/// expanded so that self-referential entries and affixes are reported.
struct Resolver<'a> {
    lexicon: &'a Lexicon,
    visiting: HashSet<String>,
}

impl<'a> Resolver<'a> {
    fn new(lexicon: &'a Lexicon) -> Self {
        Self {
            lexicon,
            visiting: HashSet::new(),
        }
    }

    fn word(&mut self, word: &Word, scope: &Scope) -> Result<ResolvedForm> {
        match word {
            Compound::Component(fusion) => self.fusion(fusion, scope),
            Compound::Joined { head, joiner, tail } => {
                self.check_era(joiner.era.as_ref())?;
                let head = self.word(head, scope)?;
                let tail = self.word(tail, scope)?;
                Ok(Compound::join(head, joiner.clone(), tail))
            }
        }
    }

    fn fusion(&mut self, fusion: &Fusion, scope: &Scope) -> Result<ResolvedForm> {
        let mut form = match &fusion.stem {
            Stem::Morpheme(morpheme) => {
                self.check_era(morpheme.era.as_ref())?;
                Compound::Component(morpheme.clone())
            }
            Stem::Lexeme(lexeme) => self.lexeme(lexeme, scope)?,
            Stem::Word(word) => self.word(word, scope)?,
        };
        for suffix in &fusion.suffixes {
            let (definition, affix_form) = self.affix(suffix, scope)?;
            let stress = if definition.stressed {
                Stress::Tail
            } else {
                Stress::Head
            };
            let joiner = Joiner {
                stress,
                era: definition.era.clone(),
            };
            form = Compound::join(form, joiner, affix_form);
        }
        for prefix in &fusion.prefixes {
            let (definition, affix_form) = self.affix(prefix, scope)?;
            let stress = if definition.stressed {
                Stress::Head
            } else {
                Stress::Tail
            };
            let joiner = Joiner {
                stress,
                era: definition.era.clone(),
            };
            form = Compound::join(affix_form, joiner, form);
        }
        Ok(form)
    }

    fn lexeme(&mut self, lexeme: &Lexeme, scope: &Scope) -> Result<ResolvedForm> {
        let lookup_scope = lexeme.scope.as_ref().unwrap_or(scope);
        let lexicon = self.lexicon;
        let (defined_in, entry) = lexicon.find_entry(&lexeme.name, lookup_scope)?;
        let key = format!("<{}>{}", lexeme.name, defined_in);
        self.enter(&key, lexeme.to_string())?;
        let form = self.word(&entry.form, &defined_in);
        self.visiting.remove(&key);
        form
    }

    /// Look up an affix and resolve its form.
    fn affix(
        &mut self,
        affix: &Affix,
        scope: &Scope,
    ) -> Result<(&'a AffixDefinition, ResolvedForm)> {
        let lexicon = self.lexicon;
        let (defined_in, definition) = lexicon.find_affix(affix, scope)?;
        self.check_era(definition.era.as_ref())?;
        let key = format!("{affix}{defined_in}");
        self.enter(&key, affix.to_string())?;
        let form = self.affix_form(definition, &defined_in);
        self.visiting.remove(&key);
        Ok((definition, form?))
    }

    fn affix_form(&mut self, definition: &AffixDefinition, scope: &Scope) -> Result<ResolvedForm> {
        match &definition.form {
            Some(AffixForm::Word(word)) => self.word(word, scope),
            Some(AffixForm::Var(var)) => match definition.sources.as_slice() {
                [source] => {
                    let stem = Compound::Component(Fusion::bare(Stem::Lexeme(source.clone())));
                    self.substitute(var, &stem, scope)
                }
                sources => Err(Error::MissingVar {
                    affix: definition.affix.to_string(),
                    sources: sources.len(),
                }),
            },
            None => {
                let mut sources = definition.sources.iter();
                let Some(first) = sources.next() else {
                    return Err(Error::AffixDefinitionMissingForm(
                        definition.affix.to_string(),
                    ));
                };
                let mut form = self.lexeme(first, scope)?;
                for source in sources {
                    let next = self.lexeme(source, scope)?;
                    form = Compound::join(form, Joiner::head(), next);
                }
                Ok(form)
            }
        }
    }

    fn substitute(&mut self, var: &Var, form: &Word, scope: &Scope) -> Result<ResolvedForm> {
        let fusion = Fusion {
            stem: Stem::Word(Box::new(form.clone())),
            prefixes: var.prefixes.clone(),
            suffixes: var.suffixes.clone(),
        };
        self.fusion(&fusion, scope)
    }

    fn enter(&mut self, key: &str, name: String) -> Result<()> {
        if self.visiting.insert(key.to_string()) {
            Ok(())
        } else {
            Err(Error::CyclicDefinition(name))
        }
    }

    fn check_era(&self, era: Option<&Rule>) -> Result<()> {
        match (era, &self.lexicon.rules) {
            (Some(era), Some(rules)) if !rules.contains(era) => {
                Err(Error::UnknownRule(era.name().to_string()))
            }
            _ => Ok(()),
        }
    }
}
