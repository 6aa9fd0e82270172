//! Core domain logic for Notecase.
//! This crate owns the on-disk note format and the edit/commit contract.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod model;
pub mod parser;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{ConfigError, CoreConfig, TextEncoding};
pub use error::{NotFoundTarget, NoteError, NoteResult};
pub use events::{BackendEvent, SubscriptionId};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use model::block::{Block, BlockKind, SourceSpan};
pub use model::category::{Category, NoteHandle};
pub use model::display_state::DisplayState;
pub use model::note::MarkdownNote;
pub use parser::{parse, parse_report, DegradeReason, Degradation, ParseReport};
pub use repo::category_index::CategoryIndex;
pub use repo::fs_backend::{FileSystemBackend, NoteBackend};
pub use search::fts::{
    IndexStats, NoteSearchIndex, SearchError, SearchHit, SearchQuery, SearchResult,
};
pub use search::schema::{SchemaState, SCHEMA_VERSION};
pub use service::editable_note::{CommitFailure, EditableNote};
pub use service::worker::{BackgroundLoader, Completion, Job, JobOutput, RequestId};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
