use crate::book;
use crate::cli::{BookAction, BookArgs, InitArgs, ReplArgs};
use crate::project::{locate_lexurgy_install, Metadata, ProjectPaths};
use crate::repl;
use crate::session::Session;
use crate::templates;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub fn run_init(project: &Path, args: InitArgs) -> Result<()> {
    let root = args.dir.clone().unwrap_or_else(|| project.to_path_buf());
    fs::create_dir_all(&root).with_context(|| format!("create {}", root.display()))?;
    let paths = ProjectPaths::new(&root);

    let starter: [(PathBuf, &str); 3] = [
        (paths.lexicon_path(), templates::LEXICON_PYCL),
        (paths.changes_path(), templates::CHANGES_LSC),
        (paths.book_path(), templates::BOOK_MD),
    ];
    let metadata_path = paths.metadata_path();
    if !args.overwrite {
        let existing = std::iter::once(&metadata_path)
            .chain(starter.iter().map(|(path, _)| path))
            .find(|path| path.exists());
        if let Some(path) = existing {
            return Err(anyhow!(
                "project file already exists at {} (use --overwrite to overwrite)",
                path.display()
            ));
        }
    }

    let name = args
        .name
        .clone()
        .or_else(|| project_name(&root))
        .unwrap_or_else(|| "Conlang".to_string());
    let mut metadata = Metadata::new(name, args.author.clone());
    if args.lexurgy {
        let install = locate_lexurgy_install()?;
        tracing::info!(install = %install.display(), "recording lexurgy install");
        metadata.lexurgy = Some(install);
    }
    metadata.write(&metadata_path)?;
    println!("wrote {}", metadata_path.display());
    for (path, contents) in &starter {
        fs::write(path, contents.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

pub fn run_reset(project: &Path) -> Result<()> {
    let cache_dir = ProjectPaths::new(project).cache_dir();
    if !cache_dir.exists() {
        println!("no cache at {}", cache_dir.display());
        return Ok(());
    }
    fs::remove_dir_all(&cache_dir).with_context(|| format!("remove {}", cache_dir.display()))?;
    println!("removed {}", cache_dir.display());
    Ok(())
}

pub fn run_repl(project: &Path, args: ReplArgs) -> Result<()> {
    let mut session = Session::open(project)?;
    if args.command.is_empty() {
        let stdin = io::stdin();
        return repl::run_interactive(&mut session, stdin.lock(), io::stdout());
    }
    let line = args.command.join(" ");
    repl::run_once(&mut session, &line, io::stdout().lock())
        .map_err(|err| anyhow!(repl::describe_error(&err)))
}

pub fn run_book(project: &Path, args: BookArgs) -> Result<()> {
    let mut session = Session::open(project)?;
    match args.action {
        BookAction::Compile => {
            let path = book::compile(&mut session)?;
            session.flush()?;
            println!("wrote {}", path.display());
            Ok(())
        }
        BookAction::Watch => {
            println!(
                "watching {} (ctrl-c to stop)",
                session.paths().book_path().display()
            );
            book::watch(&mut session, book::WATCH_INTERVAL)?;
            Ok(())
        }
    }
}

fn project_name(root: &Path) -> Option<String> {
    let root = root.canonicalize().ok()?;
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
