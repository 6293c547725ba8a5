use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod arrange;
mod batch;
mod book;
mod cache;
mod checksum;
mod cli;
mod error;
mod evolve;
mod lexicon;
mod lexurgy;
mod project;
mod repl;
mod rules;
mod session;
mod templates;
mod workflow;

/// Environment variable holding the tracing filter, e.g. `conlang=debug`.
const LOG_ENV: &str = "CONLANG_LOG";

fn main() -> Result<()> {
    init_tracing();
    let args = cli::RootArgs::parse();
    let project = args.project;

    match args.command {
        cli::Command::Init(args) => workflow::run_init(&project, args),
        cli::Command::Reset(_) => workflow::run_reset(&project),
        cli::Command::Repl(args) => workflow::run_repl(&project, args),
        cli::Command::Book(args) => workflow::run_book(&project, args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
