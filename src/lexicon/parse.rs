//! Recursive-descent parser for `.pycl` lexicon files and REPL input.
//!
//! Input is first folded into logical lines: `#` starts a comment, a line
//! starting with whitespace or following a line ending in `\` continues the
//! previous logical line. Each logical line is one record.
use super::domain::{
    Affix, AffixDefinition, AffixForm, Compound, Entry, Fusion, Joiner, Lexeme, Morpheme, Record,
    Rule, Scope, Sentence, Stem, Stress, Tags, Template, Var, Word,
};
use crate::error::{Error, Location, Result};
use std::collections::BTreeMap;
use std::path::Path;

const RESERVED: &[char] = &[
    '.', '@', '"', '<', '>', '(', ')', '!', '+', '{', '}', '%', '$', '#', '&', '*',
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub line: usize,
    pub text: String,
}

pub fn logical_lines(text: &str) -> Vec<LogicalLine> {
    let mut lines: Vec<LogicalLine> = Vec::new();
    let mut continued = false;
    for (index, raw) in text.lines().enumerate() {
        let content = raw.find('#').map_or(raw, |at| &raw[..at]);
        let (content, continues) = match content.trim_end().strip_suffix('\\') {
            Some(stripped) => (stripped, true),
            None => (content, false),
        };
        let indented = content.starts_with(char::is_whitespace);
        let trimmed = content.trim();
        if (continued || indented) && !lines.is_empty() {
            if let Some(last) = lines.last_mut().filter(|_| !trimmed.is_empty()) {
                last.text.push(' ');
                last.text.push_str(trimmed);
            }
        } else if !trimmed.is_empty() {
            lines.push(LogicalLine {
                line: index + 1,
                text: trimmed.to_string(),
            });
        }
        continued = continues;
    }
    lines
}

/// Parse a whole lexicon file into records.
pub fn parse_records(text: &str, path: Option<&Path>) -> Result<Vec<Record>> {
    logical_lines(text)
        .iter()
        .map(|line| {
            let mut cursor = Cursor::new(&line.text, line.line, path);
            cursor.record()
        })
        .collect()
}

/// Parse a single word such as `NEG.<stone>.PL !+@era1 *ka`.
#[cfg(test)]
pub fn parse_word(text: &str) -> Result<Word> {
    let mut cursor = Cursor::new(text, 1, None);
    let word = cursor.word()?;
    cursor.skip_ws();
    cursor.finish()?;
    Ok(word)
}

/// Parse REPL/book input: an optional tag bag followed by words.
pub fn parse_sentence(text: &str) -> Result<Sentence> {
    let mut cursor = Cursor::new(text, 1, None);
    cursor.skip_ws();
    let tags = cursor.tags()?;
    let mut words = Vec::new();
    loop {
        cursor.skip_ws();
        if cursor.at_end() {
            break;
        }
        words.push(cursor.word()?);
    }
    if words.is_empty() {
        return Err(cursor.error("a word"));
    }
    Ok(Sentence { tags, words })
}

#[cfg(test)]
pub fn parse_var(text: &str) -> Result<Var> {
    let mut cursor = Cursor::new(text, 1, None);
    cursor.skip_ws();
    let var = cursor.var()?;
    cursor.skip_ws();
    cursor.finish()?;
    Ok(var)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn is_form_char(c: char) -> bool {
    !c.is_whitespace() && !RESERVED.contains(&c)
}

struct Cursor<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    path: Option<&'a Path>,
}

impl<'a> Cursor<'a> {
    fn new(text: &str, line: usize, path: Option<&'a Path>) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line,
            path,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        let matches = s
            .chars()
            .enumerate()
            .all(|(offset, c)| self.peek_at(offset) == Some(c));
        if matches {
            self.pos += s.chars().count();
        }
        matches
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// The whitespace-delimited token at the cursor, without consuming it.
    fn token_ahead(&self) -> String {
        self.chars[self.pos..]
            .iter()
            .take_while(|c| !c.is_whitespace())
            .collect()
    }

    fn rest(&mut self) -> String {
        let rest: String = self.chars[self.pos..].iter().collect();
        self.pos = self.chars.len();
        rest.trim().to_string()
    }

    fn error(&self, expected: &str) -> Error {
        let found = match self.peek() {
            Some(c) => format!("'{c}'"),
            None => "end of input".to_string(),
        };
        Error::Parse {
            location: Location {
                path: self.path.map(Path::to_path_buf),
                line: self.line,
                column: self.pos + 1,
            },
            expected: expected.to_string(),
            found,
        }
    }

    fn expect(&mut self, c: char, expected: &str) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn finish(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("end of input"))
        }
    }

    fn ident(&mut self, expected: &str) -> Result<String> {
        let ident = self.take_while(is_ident_char);
        if ident.is_empty() {
            return Err(self.error(expected));
        }
        Ok(ident)
    }

    fn rule(&mut self) -> Result<Rule> {
        self.expect('@', "'@'")?;
        Ok(Rule(self.ident("rule name")?))
    }

    fn opt_rule(&mut self) -> Result<Option<Rule>> {
        if self.peek() == Some('@') {
            Ok(Some(self.rule()?))
        } else {
            Ok(None)
        }
    }

    fn scope(&mut self) -> Result<Scope> {
        self.expect('%', "'%' scope")?;
        Ok(Scope(self.ident("scope name")?))
    }

    fn morpheme(&mut self) -> Result<Morpheme> {
        self.expect('*', "'*' morpheme")?;
        let form = self.take_while(is_form_char);
        if form.is_empty() {
            return Err(self.error("morpheme form"));
        }
        let era = self.opt_rule()?;
        Ok(Morpheme { form, era })
    }

    fn lexeme(&mut self) -> Result<Lexeme> {
        self.expect('<', "'<' lexeme")?;
        let name = self.take_while(|c| c != '>' && c != '<' && !c.is_whitespace());
        if name.is_empty() {
            return Err(self.error("lexeme name"));
        }
        self.expect('>', "'>'")?;
        let scope = if self.peek() == Some('%') {
            Some(self.scope()?)
        } else {
            None
        };
        Ok(Lexeme { name, scope })
    }

    fn prefixes(&mut self) -> Result<Vec<Affix>> {
        let mut prefixes = Vec::new();
        while self.peek().is_some_and(is_ident_char) {
            let name = self.ident("prefix name")?;
            self.expect('.', "'.' after prefix")?;
            prefixes.push(Affix::Prefix(name));
        }
        prefixes.reverse();
        Ok(prefixes)
    }

    fn suffixes(&mut self) -> Result<Vec<Affix>> {
        let mut suffixes = Vec::new();
        while self.peek() == Some('.') && self.peek_at(1).is_some_and(is_ident_char) {
            self.bump();
            suffixes.push(Affix::Suffix(self.ident("suffix name")?));
        }
        Ok(suffixes)
    }

    fn fusion(&mut self) -> Result<Fusion> {
        let prefixes = self.prefixes()?;
        let stem = match self.peek() {
            Some('*') => Stem::Morpheme(self.morpheme()?),
            Some('<') => Stem::Lexeme(self.lexeme()?),
            Some('"') => {
                self.bump();
                let word = self.word()?;
                self.skip_ws();
                self.expect('"', "closing '\"'")?;
                Stem::Word(Box::new(word))
            }
            _ => return Err(self.error("stem (*form, <lexeme> or \"compound\")")),
        };
        let suffixes = self.suffixes()?;
        Ok(Fusion {
            stem,
            prefixes,
            suffixes,
        })
    }

    fn unit(&mut self) -> Result<Word> {
        let fusion = self.fusion()?;
        if fusion.prefixes.is_empty() && fusion.suffixes.is_empty() {
            if let Stem::Word(word) = fusion.stem {
                return Ok(*word);
            }
        }
        Ok(Compound::Component(fusion))
    }

    fn joiner(&mut self) -> Result<Option<Joiner>> {
        let stress = if self.eat_str("!+") {
            Stress::Head
        } else if self.eat_str("+!") {
            Stress::Tail
        } else {
            return Ok(None);
        };
        let era = self.opt_rule()?;
        Ok(Some(Joiner { stress, era }))
    }

    fn word(&mut self) -> Result<Word> {
        self.skip_ws();
        let mut word = self.unit()?;
        loop {
            self.skip_ws();
            let Some(joiner) = self.joiner()? else {
                break;
            };
            self.skip_ws();
            let tail = self.unit()?;
            word = Compound::join(word, joiner, tail);
        }
        Ok(word)
    }

    fn tags(&mut self) -> Result<Tags> {
        if !self.eat('{') {
            return Ok(Tags::default());
        }
        let mut map = BTreeMap::new();
        loop {
            self.skip_ws();
            if self.eat('}') {
                break;
            }
            if self.at_end() {
                return Err(self.error("'}'"));
            }
            let key = self.take_while(|c| !c.is_whitespace() && c != ':' && c != '}');
            if key.is_empty() {
                return Err(self.error("tag name"));
            }
            let value = if self.eat(':') {
                self.take_while(|c| !c.is_whitespace() && c != '}')
            } else {
                String::new()
            };
            if map.contains_key(&key) {
                return Err(Error::DoubleTagDefinition(key));
            }
            map.insert(key, value);
        }
        Ok(Tags::from_map(map))
    }

    fn var(&mut self) -> Result<Var> {
        let prefixes = self.prefixes()?;
        self.expect('$', "'$' variable")?;
        let suffixes = self.suffixes()?;
        Ok(Var { prefixes, suffixes })
    }

    fn affix_marker(&mut self) -> Result<Affix> {
        if self.eat('.') {
            return Ok(Affix::Suffix(self.ident("suffix name")?));
        }
        let name = self.ident("affix (.NAME or NAME.)")?;
        self.expect('.', "'.' after prefix")?;
        Ok(Affix::Prefix(name))
    }

    fn starts_form(&self) -> bool {
        let token = self.token_ahead();
        !token.starts_with('(') && token.contains(['*', '<', '"', '$'])
    }

    fn record(&mut self) -> Result<Record> {
        let keyword = self.take_while(|c| c.is_ascii_alphabetic());
        self.skip_ws();
        match keyword.as_str() {
            "template" => self.template(),
            "affix" => self.affix(),
            "entry" => self.entry(),
            "lang" => self.lang(),
            "include" => self.include(),
            _ => {
                self.pos = 0;
                Err(self.error("record keyword (template, affix, entry, lang, include)"))
            }
        }
    }

    fn template(&mut self) -> Result<Record> {
        self.expect('&', "'&' template name")?;
        let name = self.ident("template name")?;
        self.skip_ws();
        let tags = self.tags()?;
        let mut vars = Vec::new();
        loop {
            self.skip_ws();
            if self.at_end() {
                break;
            }
            vars.push(self.var()?);
        }
        if vars.is_empty() {
            return Err(self.error("at least one variable"));
        }
        Ok(Record::Template(Template { name, tags, vars }))
    }

    fn affix(&mut self) -> Result<Record> {
        let stressed = self.eat('!');
        self.skip_ws();
        let affix = self.affix_marker()?;
        self.skip_ws();
        let tags = self.tags()?;
        self.skip_ws();
        let mut era = self.opt_rule()?;
        self.skip_ws();
        let mut form = if !self.starts_form() {
            None
        } else if self.token_ahead().contains('$') {
            Some(AffixForm::Var(self.var()?))
        } else {
            Some(AffixForm::Word(self.word()?))
        };
        if era.is_none() {
            if let Some(AffixForm::Word(Compound::Component(fusion))) = form.as_mut() {
                if fusion.prefixes.is_empty() && fusion.suffixes.is_empty() {
                    if let Stem::Morpheme(morpheme) = &mut fusion.stem {
                        era = morpheme.era.take();
                    }
                }
            }
        }
        self.skip_ws();
        let mut sources = Vec::new();
        if self.peek() == Some('(') && self.token_ahead().starts_with("(<") {
            self.bump();
            loop {
                self.skip_ws();
                if self.eat(')') {
                    break;
                }
                sources.push(self.lexeme()?);
            }
        }
        let description = self.rest();
        Ok(Record::Affix(AffixDefinition {
            stressed,
            affix,
            tags,
            era,
            form,
            sources,
            description,
        }))
    }

    fn entry(&mut self) -> Result<Record> {
        let template = if self.eat('&') {
            Some(self.ident("template name")?)
        } else {
            None
        };
        self.skip_ws();
        let tags = self.tags()?;
        self.skip_ws();
        let lexeme = self.lexeme()?;
        let form = self.word()?;
        self.skip_ws();
        self.expect('(', "part of speech in parentheses")?;
        let part_of_speech = self.take_while(|c| c != ')').trim().to_string();
        self.expect(')', "')'")?;
        let definition = self.rest();
        Ok(Record::Entry(Entry {
            template,
            lexeme,
            tags,
            form,
            part_of_speech,
            definition,
        }))
    }

    fn lang(&mut self) -> Result<Record> {
        let child = self.scope()?;
        self.skip_ws();
        self.expect(':', "':' between scopes")?;
        self.skip_ws();
        let parent = self.scope()?;
        let path = self.rest();
        let path = path.trim_matches('"');
        Ok(Record::Lang {
            child,
            parent,
            path: (!path.is_empty()).then(|| path.to_string()),
        })
    }

    fn include(&mut self) -> Result<Record> {
        let path = if self.eat('"') {
            let path = self.take_while(|c| c != '"');
            self.expect('"', "closing '\"'")?;
            path
        } else {
            self.rest()
        };
        if path.is_empty() {
            return Err(self.error("include path"));
        }
        Ok(Record::Include(path))
    }
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
