//! Markdown book compiler.
//!
//! `[[sentence]]` fragments in `book.md` are evolved through the project
//! session before the markdown is rendered to `book.html`. A fragment may
//! pick the form it shows with `[[sentence|modern]]`, `[[sentence|phonetic]]`
//! (rendered `/…/`) or `[[sentence|proto]]` (rendered `*…`).
use crate::cache::PathCached;
use crate::error::{Error, Result};
use crate::evolve::Evolved;
use crate::lexurgy::Engine;
use crate::session::Session;
use pulldown_cmark::{html, Options, Parser};
use regex::{Captures, Regex};
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

pub const WATCH_INTERVAL: Duration = Duration::from_millis(500);
const FAILED_FRAGMENT: &str = "???";

fn fragment_regex() -> &'static Regex {
    static FRAGMENT: OnceLock<Regex> = OnceLock::new();
    FRAGMENT.get_or_init(|| {
        Regex::new(r"\[\[([^\]|]+)(?:\|(modern|phonetic|proto))?\]\]")
            .expect("regex for book fragments")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Show {
    Modern,
    Phonetic,
    Proto,
}

impl Show {
    fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("phonetic") => Show::Phonetic,
            Some("proto") => Show::Proto,
            _ => Show::Modern,
        }
    }

    fn render(self, words: &[Evolved]) -> String {
        let pick = |evolved: &Evolved| -> String {
            match self {
                Show::Modern => evolved.modern.clone(),
                Show::Phonetic => evolved.phonetic.clone(),
                Show::Proto => evolved.proto.clone(),
            }
        };
        let joined = words.iter().map(pick).collect::<Vec<_>>().join(" ");
        match self {
            Show::Modern => joined,
            Show::Phonetic => format!("/{joined}/"),
            Show::Proto => format!("*{joined}"),
        }
    }
}

/// Replace every fragment with its evolved text. Failing fragments are
/// reported on stderr and replaced with `???`.
pub fn expand_fragments<E: Engine>(session: &mut Session<E>, source: &str) -> String {
    let mut failures = 0usize;
    let expanded = fragment_regex().replace_all(source, |captures: &Captures<'_>| {
        let sentence = captures[1].trim();
        let show = Show::from_label(captures.get(2).map(|label| label.as_str()));
        match session.evolve_text(sentence) {
            Ok(words) => escape_markdown(&show.render(&words)),
            Err(err) => {
                failures += 1;
                eprintln!("fragment [[{sentence}]] failed: {}: {err}", err.kind());
                FAILED_FRAGMENT.to_string()
            }
        }
    });
    if failures > 0 {
        tracing::warn!(failures, "book fragments failed");
    }
    expanded.into_owned()
}

/// Backslash-escape ASCII punctuation so evolved text renders literally.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii_punctuation() {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut body = String::new();
    html::push_html(&mut body, parser);
    body
}

fn render_page(title: &str, body: &str) -> String {
    let title = title
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

/// Render the book and report the files the output depends on.
fn render<E: Engine>(session: &mut Session<E>) -> Result<(String, Vec<PathBuf>)> {
    let paths = session.paths().clone();
    let book_path = paths.book_path();
    let source = fs::read_to_string(&book_path).map_err(|err| Error::io(&book_path, err))?;
    let body = markdown_to_html(&expand_fragments(session, &source));
    let page = render_page(&session.metadata().name, &body);

    let mut dependencies = vec![book_path, paths.changes_path(), paths.lexicon_path()];
    if let Ok(lexicon) = session.lexicon() {
        for source in lexicon.sources() {
            if !dependencies.contains(source) {
                dependencies.push(source.clone());
            }
        }
    }
    Ok((page, dependencies))
}

/// Compile `book.md` into `book.html` once.
pub fn compile<E: Engine>(session: &mut Session<E>) -> Result<PathBuf> {
    let (page, _) = render(session)?;
    write_page(session, &page)
}

/// Recompile when any dependency changed since the last build. Returns
/// whether the page was rewritten.
pub fn refresh<E: Engine>(session: &mut Session<E>, built: &PathCached<String>) -> Result<bool> {
    if built.is_fresh()? {
        return Ok(false);
    }
    let page = built.get_tracked(|| render(session))?;
    write_page(session, &page)?;
    session.flush()?;
    Ok(true)
}

/// Poll the book's dependencies and recompile on change, forever.
pub fn watch<E: Engine>(session: &mut Session<E>, interval: Duration) -> Result<()> {
    let built = PathCached::new();
    loop {
        match refresh(session, &built) {
            Ok(true) => println!("wrote {}", session.paths().book_html_path().display()),
            Ok(false) => {}
            Err(err) => {
                eprintln!("book build failed: {}: {err}", err.kind());
                built.invalidate();
            }
        }
        thread::sleep(interval);
    }
}

fn write_page<E: Engine>(session: &Session<E>, page: &str) -> Result<PathBuf> {
    let path = session.paths().book_html_path();
    fs::write(&path, page).map_err(|err| Error::io(&path, err))?;
    tracing::info!(path = %path.display(), bytes = page.len(), "book written");
    Ok(path)
}
