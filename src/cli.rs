//! CLI argument parsing for the conlang toolchain.
//!
//! Every command works on one project directory: `metadata.toml`,
//! `lexicon.pycl`, `changes.lsc` and `book.md`.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "conlang",
    version,
    about = "Lexicon resolution and sound-change evolution for constructed languages",
    after_help = "Commands:\n  init [dir]            Create a starter project\n  reset                 Remove cached evolution results\n  repl [COMMAND...]     Evolve, trace, resolve or look up sentences\n  book compile|watch    Render book.md with evolved fragments\n\nExamples:\n  conlang init stone --name Stone\n  conlang --project stone repl evolve '<stone>.PL'\n  conlang --project stone book watch",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Project root containing metadata.toml
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    pub project: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Reset(ResetArgs),
    Repl(ReplArgs),
    Book(BookArgs),
}

/// Init command inputs for a starter project.
#[derive(Parser, Debug)]
#[command(about = "Create a starter project")]
pub struct InitArgs {
    /// Directory to create the project in (defaults to --project)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Language name recorded in metadata.toml
    #[arg(long)]
    pub name: Option<String>,

    /// Author recorded in metadata.toml
    #[arg(long, default_value = "")]
    pub author: String,

    /// Overwrite existing project files
    #[arg(long)]
    pub overwrite: bool,

    /// Locate lexurgy on PATH and record its install directory
    #[arg(long)]
    pub lexurgy: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Remove cached evolution results")]
pub struct ResetArgs {}

/// REPL inputs; with a command, run it once and exit.
#[derive(Parser, Debug)]
#[command(about = "Evolve, trace, resolve or look up sentences")]
pub struct ReplArgs {
    /// One command to run instead of the interactive loop
    #[arg(value_name = "COMMAND", trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Render book.md to book.html")]
pub struct BookArgs {
    #[command(subcommand)]
    pub action: BookAction,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookAction {
    /// Render once
    Compile,
    /// Re-render whenever the book, lexicon or rules change
    Watch,
}
