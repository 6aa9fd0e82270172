//! Core configuration value.
//!
//! # Responsibility
//! - Describe the storage root, text encoding and file recognition rules.
//! - Load and validate configuration from JSON.
//!
//! # Invariants
//! - A `CoreConfig` is built once at startup and shared by `Arc` injection;
//!   core code never looks configuration up globally.
//! - Extensions are stored lowercase and without a leading dot after
//!   `validate()`.

use crate::error::{NoteError, NoteResult};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_NOTE_EXTENSIONS: &[&str] = &["md", "markdown"];
const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "svg"];

/// Text encoding used to decode note files and encode saved text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    /// Strict UTF-8; invalid byte sequences fail with `NoteError::Decode`.
    #[default]
    Utf8,
    /// ISO-8859-1; every byte decodes, only U+0000..=U+00FF encodes.
    Latin1,
}

impl TextEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Latin1 => "latin1",
        }
    }

    /// Decodes raw file bytes read from `path`.
    pub fn decode(self, path: &Path, bytes: Vec<u8>) -> NoteResult<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes).map_err(|err| NoteError::Decode {
                path: path.to_path_buf(),
                encoding: self.as_str(),
                message: err.utf8_error().to_string(),
            }),
            Self::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }

    /// Encodes text for writing to `path`.
    pub fn encode(self, path: &Path, text: &str) -> NoteResult<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Latin1 => text
                .chars()
                .map(|ch| u8::try_from(u32::from(ch)).map_err(|_| ch))
                .collect::<Result<Vec<u8>, char>>()
                .map_err(|ch| NoteError::Decode {
                    path: path.to_path_buf(),
                    encoding: self.as_str(),
                    message: format!("character U+{:04X} is outside latin1", u32::from(ch)),
                }),
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Configuration consumed by the backend, the search index and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Directory holding one subdirectory per category.
    pub storage_root: PathBuf,
    #[serde(default)]
    pub encoding: TextEncoding,
    /// Extensions recognized as note files.
    #[serde(default = "default_note_extensions")]
    pub note_extensions: Vec<String>,
    /// Extensions recognized as category images.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    /// Create `storage_root` on open when it does not exist.
    #[serde(default)]
    pub create_root: bool,
    #[serde(default)]
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Creates a config with defaults for everything but the storage root.
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            encoding: TextEncoding::default(),
            note_extensions: default_note_extensions(),
            image_extensions: default_image_extensions(),
            create_root: false,
            log_level: None,
            log_dir: None,
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Checks required values and normalizes extension lists.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.storage_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "storage_root cannot be empty".to_string(),
            ));
        }
        self.note_extensions = normalize_extensions(&self.note_extensions);
        self.image_extensions = normalize_extensions(&self.image_extensions);
        if self.note_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "note_extensions must name at least one extension".to_string(),
            ));
        }
        if let Some(dir) = self.log_dir.as_ref() {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(self)
    }

    pub fn is_note_file(&self, path: &Path) -> bool {
        has_extension(path, &self.note_extensions)
    }

    pub fn is_image_file(&self, path: &Path) -> bool {
        has_extension(path, &self.image_extensions)
    }

    /// Extension used when creating new note files.
    pub fn primary_note_extension(&self) -> &str {
        self.note_extensions
            .first()
            .map_or(DEFAULT_NOTE_EXTENSIONS[0], String::as_str)
    }
}

fn default_note_extensions() -> Vec<String> {
    DEFAULT_NOTE_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_image_extensions() -> Vec<String> {
    DEFAULT_IMAGE_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    let mut normalized = Vec::new();
    for ext in extensions {
        let value = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        if !value.is_empty() && !normalized.contains(&value) {
            normalized.push(value);
        }
    }
    normalized
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| extensions.iter().any(|known| *known == ext))
}
