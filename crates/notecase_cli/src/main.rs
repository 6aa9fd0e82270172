//! `notecase` command-line front end.
//!
//! # Responsibility
//! - Build the configuration once and inject it into the core.
//! - Run one command through the display-state `Controller`.
//! - Report failures on stderr with a non-zero exit code.

mod args;
mod controller;
mod render;

use args::{Cli, Command, ConfigSource};
use clap::Parser;
use controller::{Controller, ControllerError};
use log::info;
use notecase_core::{
    default_log_level, init_logging, ConfigError, CoreConfig, FileSystemBackend, LogTarget,
    LoggingError, NoteBackend, NoteError, NoteSearchIndex, SearchError, SearchQuery,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// Level used for stderr logging when neither flag nor config sets one.
const STDERR_LOG_LEVEL: &str = "warn";

#[derive(Debug)]
enum CliError {
    Usage(String),
    Config(ConfigError),
    Logging(LoggingError),
    Storage(NoteError),
    Controller(ControllerError),
    Search(SearchError),
    Input { path: PathBuf, source: std::io::Error },
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usage(message) => write!(f, "{message}"),
            Self::Config(err) => write!(f, "configuration: {err}"),
            Self::Logging(err) => write!(f, "logging: {err}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Controller(err) => write!(f, "{err}"),
            Self::Search(err) => write!(f, "search: {err}"),
            Self::Input { path, source } => {
                write!(f, "cannot read `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Usage(_) => None,
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Controller(err) => Some(err),
            Self::Search(err) => Some(err),
            Self::Input { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<NoteError> for CliError {
    fn from(value: NoteError) -> Self {
        Self::Storage(value)
    }
}

impl From<ControllerError> for CliError {
    fn from(value: ControllerError) -> Self {
        Self::Controller(value)
    }
}

impl From<SearchError> for CliError {
    fn from(value: SearchError) -> Self {
        Self::Search(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("state=error");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli.source)?;
    start_logging(cli.log_level.as_deref(), &config)?;
    info!(
        "event=cli_start module=cli status=ok core_version={} encoding={}",
        notecase_core::core_version(),
        config.encoding.as_str()
    );

    let config = Arc::new(config);
    let backend = FileSystemBackend::open(Arc::clone(&config))?;
    let mut controller = Controller::new(backend);

    match cli.command {
        Command::Categories => {
            let inventory = controller.backend().inventory();
            for category in inventory.categories() {
                let image = category
                    .image
                    .as_deref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}\t{}", category.name, category.note_count(), image);
            }
        }
        Command::List { category } => {
            for handle in controller.choose_category(&category)? {
                println!("{}\t{}\t{}", handle.index, handle.file_name, handle.title_preview);
            }
        }
        Command::Show {
            category,
            index,
            raw,
        } => {
            controller.choose_category(&category)?;
            let note = controller.open_note(index)?;
            if raw {
                print!("{}", note.raw_text());
            } else {
                print!("{}", render::render_blocks(note.blocks()));
            }
        }
        Command::Edit {
            category,
            index,
            from,
        } => {
            let text = read_input(&from)?;
            controller.choose_category(&category)?;
            controller.open_note_for_edit(index)?;
            controller.set_draft_text(text)?;
            let dirty = controller.draft().is_some_and(|draft| draft.is_dirty());
            let note = controller.commit()?;
            let outcome = if dirty { "saved" } else { "unchanged" };
            println!("{outcome}\t{}", note.path().display());
        }
        Command::Add { category, from } => {
            let text = read_input(&from)?;
            controller.choose_category(&category)?;
            controller.begin_add()?;
            controller.set_draft_text(text)?;
            let note = controller.commit()?;
            println!("created\t{}\t{}", note.index(), note.path().display());
        }
        Command::CreateCategory { name } => {
            controller.open_category_editor()?;
            controller.create_category(&name)?;
            println!("created\t{name}");
        }
        Command::Search {
            query,
            category,
            limit,
        } => {
            let mut index = NoteSearchIndex::in_memory()?;
            index.rebuild(&controller.backend().inventory(), config.encoding)?;
            let mut search = SearchQuery::new(query).with_limit(limit);
            if let Some(category) = category {
                search = search.in_category(category);
            }
            for hit in index.search(&search)? {
                println!(
                    "{}\t{}\t{}\t{}",
                    hit.category,
                    hit.index,
                    hit.title.as_deref().unwrap_or("-"),
                    hit.snippet.replace('\n', " ")
                );
            }
        }
    }

    info!(
        "event=cli_finish module=cli status=ok state={} categories={}",
        controller.state(),
        controller.backend().categories().len()
    );
    Ok(())
}

fn load_config(source: &ConfigSource) -> Result<CoreConfig, CliError> {
    match (&source.root, &source.config) {
        (Some(root), None) => Ok(CoreConfig::new(root).validate()?),
        (None, Some(path)) => Ok(CoreConfig::load(path)?),
        (Some(_), Some(_)) => Err(CliError::Usage(
            "--root and --config cannot be combined".to_string(),
        )),
        (None, None) => Err(CliError::Usage(
            "either --root <DIR> or --config <FILE> is required".to_string(),
        )),
    }
}

fn start_logging(flag_level: Option<&str>, config: &CoreConfig) -> Result<(), CliError> {
    let configured = flag_level.or(config.log_level.as_deref());
    match config.log_dir.as_ref() {
        Some(dir) => init_logging(
            configured.unwrap_or_else(|| default_log_level()),
            LogTarget::File(dir.clone()),
        )?,
        None => init_logging(configured.unwrap_or(STDERR_LOG_LEVEL), LogTarget::Stderr)?,
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String, CliError> {
    let input_error = |source: std::io::Error| CliError::Input {
        path: path.to_path_buf(),
        source,
    };
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(input_error)?;
        return Ok(text);
    }
    std::fs::read_to_string(path).map_err(input_error)
}
