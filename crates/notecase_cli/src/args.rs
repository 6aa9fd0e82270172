//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "notecase", version, about = "Browse and edit categorized markdown notes")]
pub struct Cli {
    #[command(flatten)]
    pub source: ConfigSource,

    /// trace | debug | info | warn | error
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Where configuration comes from; exactly one must be given.
#[derive(Debug, Args)]
pub struct ConfigSource {
    /// Storage root holding one directory per category.
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List categories with their note counts.
    Categories,
    /// List notes of one category.
    List { category: String },
    /// Print one note as parsed blocks.
    Show {
        category: String,
        index: usize,
        /// Print the raw text instead of blocks.
        #[arg(long)]
        raw: bool,
    },
    /// Replace a note's content with the content of a file (`-` for stdin).
    Edit {
        category: String,
        index: usize,
        #[arg(long, value_name = "FILE")]
        from: PathBuf,
    },
    /// Add a new note to a category from a file (`-` for stdin).
    Add {
        category: String,
        #[arg(long, value_name = "FILE")]
        from: PathBuf,
    },
    /// Create an empty category directory.
    CreateCategory { name: String },
    /// Full-text search across all notes.
    Search {
        query: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn root_may_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["notecase", "show", "test", "0", "--root", "/notes"])
            .expect("args should parse");
        assert_eq!(cli.source.root, Some(PathBuf::from("/notes")));
        assert!(matches!(
            cli.command,
            Command::Show {
                index: 0,
                raw: false,
                ..
            }
        ));
    }

    #[test]
    fn config_file_is_accepted_globally() {
        let cli = Cli::try_parse_from(["notecase", "list", "ideas", "--config", "/n.json"])
            .expect("args should parse");
        assert_eq!(cli.source.config, Some(PathBuf::from("/n.json")));
        assert_eq!(cli.source.root, None);
    }

    #[test]
    fn search_defaults_limit() {
        let cli = Cli::try_parse_from(["notecase", "--root", "/n", "search", "milk"])
            .expect("args should parse");
        match cli.command {
            Command::Search {
                query,
                category,
                limit,
            } => {
                assert_eq!(query, "milk");
                assert_eq!(category, None);
                assert_eq!(limit, 20);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
