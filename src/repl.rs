//! Line REPL over a project session.
//!
//! Each line is `COMMAND ARGS`; a line that does not start with a known
//! command is evolved as a sentence. Errors from the pipeline are printed as
//! `Kind: message` and the loop keeps going.
use crate::error::Error;
use crate::evolve::Evolved;
use crate::lexurgy::Engine;
use crate::session::Session;
use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, Write};

const PROMPT: &str = "> ";

const HELP: &str = "\
commands:
  evolve SENTENCE   evolve each word (default for bare input)
  trace SENTENCE    evolve and list every rule that changed each word
  resolve SENTENCE  show each word's resolved compound form
  lookup [SENTENCE] describe every lexeme, affix and morpheme named
                    (every entry when no sentence is given)
  inflect SENTENCE  evolve every template inflection of each lexeme
  help              show this message
  quit | exit       leave the REPL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Evolve,
    Trace,
    Resolve,
    Lookup,
    Inflect,
    Help,
    Quit,
}

fn split_command(line: &str) -> (Verb, &str) {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let verb = match head {
        "evolve" => Verb::Evolve,
        "trace" => Verb::Trace,
        "resolve" => Verb::Resolve,
        "lookup" => Verb::Lookup,
        "inflect" => Verb::Inflect,
        "help" | "?" => Verb::Help,
        "quit" | "exit" => Verb::Quit,
        _ => return (Verb::Evolve, line),
    };
    (verb, rest)
}

/// Run the interactive loop until EOF or `quit`.
pub fn run_interactive<E: Engine>(
    session: &mut Session<E>,
    input: impl BufRead,
    mut out: impl Write,
) -> Result<()> {
    let mut lines = input.lines();
    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;
        let Some(line) = lines.next() else {
            writeln!(out)?;
            break;
        };
        let line = line.context("read REPL input")?;
        if line.trim().is_empty() {
            continue;
        }
        match execute(session, &line, &mut out) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(err) => writeln!(out, "{}", describe_error(&err))?,
        }
    }
    session.flush().context("flush evolution caches")?;
    Ok(())
}

/// Run a single command; errors propagate to the caller.
pub fn run_once<E: Engine>(session: &mut Session<E>, line: &str, mut out: impl Write) -> Result<()> {
    execute(session, line, &mut out)?;
    session.flush().context("flush evolution caches")?;
    Ok(())
}

fn execute<E: Engine>(session: &mut Session<E>, line: &str, out: &mut impl Write) -> Result<Flow> {
    let (verb, args) = split_command(line);
    tracing::debug!(?verb, args, "repl command");
    match verb {
        Verb::Help => writeln!(out, "{HELP}")?,
        Verb::Quit => return Ok(Flow::Quit),
        Verb::Lookup if args.is_empty() => {
            for (lexeme, description) in session.entries()? {
                writeln!(out, "{lexeme}: {description}")?;
            }
        }
        _ if args.is_empty() => return Err(anyhow!("missing sentence; try `help`")),
        Verb::Evolve => {
            for evolved in session.evolve_text(args)? {
                writeln!(out, "{}", format_evolved(&evolved))?;
            }
        }
        Verb::Trace => {
            for (evolved, trace) in session.trace_text(args)? {
                writeln!(out, "{}", format_evolved(&evolved))?;
                for (word, lines) in trace {
                    writeln!(out, "  {word}")?;
                    for line in lines {
                        writeln!(out, "    {}: {} -> {}", line.rule, line.before, line.after)?;
                    }
                }
            }
        }
        Verb::Resolve => {
            for form in session.resolve_text(args)? {
                writeln!(out, "{form}")?;
            }
        }
        Verb::Lookup => {
            for (item, description) in session.lookup_text(args)? {
                writeln!(out, "{item}: {description}")?;
            }
        }
        Verb::Inflect => {
            for (lexeme, forms) in session.inflect_text(args)? {
                writeln!(out, "{lexeme}")?;
                for (var, evolved) in forms {
                    writeln!(out, "  {var}: {}", format_evolved(&evolved))?;
                }
            }
        }
    }
    Ok(Flow::Continue)
}

fn format_evolved(evolved: &Evolved) -> String {
    format!(
        "{} /{}/ *{}",
        evolved.modern, evolved.phonetic, evolved.proto
    )
}

/// `Kind: message` for pipeline errors, the full context chain otherwise.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<Error>() {
        Some(inner) => format!("{}: {inner}", inner.kind()),
        None => format!("error: {err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexurgy::fake::{FakeLexurgy, CHANGES};
    use crate::project::{Metadata, ProjectPaths};
    use std::fs;
    use std::path::Path;

    fn session(dir: &Path) -> Session<FakeLexurgy> {
        let paths = ProjectPaths::new(dir);
        fs::write(
            paths.lexicon_path(),
            "entry <stone> *apak (n.) a stone\naffix .PL *iki@era1 plural\n",
        )
        .expect("write lexicon");
        fs::write(paths.changes_path(), CHANGES).expect("write changes");
        Session::with_engine(paths, Metadata::new("Stone", ""), FakeLexurgy::new())
    }

    fn transcript(input: &str) -> String {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session(dir.path());
        let mut out = Vec::new();
        run_interactive(&mut session, input.as_bytes(), &mut out).expect("repl");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn bare_input_is_evolved() {
        assert_eq!(split_command("  *apaki "), (Verb::Evolve, "*apaki"));
        assert_eq!(split_command("trace <stone>"), (Verb::Trace, "<stone>"));
        assert_eq!(split_command("exit"), (Verb::Quit, ""));
        let output = transcript("*apaki\n");
        assert!(output.contains("abashi /abaʃi/ *apaki"), "{output}");
    }

    #[test]
    fn errors_are_reported_and_the_loop_continues() {
        let output = transcript("<rock>\nresolve <stone>.PL\nquit\nnever\n");
        assert!(output.contains("MissingLexeme: missing lexeme <rock>"), "{output}");
        assert!(output.contains("*apak !+@era1 *iki"), "{output}");
        assert!(!output.contains("never"));
    }

    #[test]
    fn trace_lists_rules_per_word() {
        let output = transcript("trace *apaki\n");
        assert!(output.contains("  apaki\n"), "{output}");
        assert!(output.contains("    palatalization: apaki -> apaʃi"), "{output}");
    }

    #[test]
    fn inflect_lists_each_variable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session(dir.path());
        let mut out = Vec::new();
        run_once(&mut session, "inflect <stone>", &mut out).expect("inflect");
        let output = String::from_utf8(out).expect("utf8");
        assert_eq!(output, "<stone>\n  $: abak /abak/ *apak\n");
    }

    #[test]
    fn one_shot_errors_propagate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session(dir.path());
        let err = run_once(&mut session, "lookup <rock>", Vec::<u8>::new()).expect_err("missing");
        assert!(describe_error(&err).starts_with("MissingLexeme"));
        let mut out = Vec::new();
        run_once(&mut session, "lookup <stone>.PL", &mut out).expect("lookup");
        let output = String::from_utf8(out).expect("utf8");
        assert_eq!(output, "<stone>: (n.) a stone\n.PL: plural\n");

        let mut out = Vec::new();
        run_once(&mut session, "lookup", &mut out).expect("list");
        assert_eq!(String::from_utf8(out).expect("utf8"), "<stone>: (n.) a stone\n");
    }
}
