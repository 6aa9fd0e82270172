//! Application display states.
//!
//! The surrounding controller owns transitions between these states; core
//! operations only return success or failure values that the controller
//! maps onto them.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Closed set of UI states driven by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    /// No category selected.
    Choose,
    /// One note loaded and rendered.
    Display,
    /// Notes of the chosen category enumerated.
    List,
    /// Editing an existing note.
    Edit,
    /// Composing a new note with no backing file yet.
    Add,
    /// Load or save failure waiting for acknowledgement.
    Error,
    /// Category-level operations.
    CategoryEditor,
}

impl DisplayState {
    pub const ALL: [DisplayState; 7] = [
        Self::Choose,
        Self::Display,
        Self::List,
        Self::Edit,
        Self::Add,
        Self::Error,
        Self::CategoryEditor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Choose => "choose",
            Self::Display => "display",
            Self::List => "list",
            Self::Edit => "edit",
            Self::Add => "add",
            Self::Error => "error",
            Self::CategoryEditor => "category_editor",
        }
    }

    /// Whether an edit buffer is alive in this state.
    pub fn holds_draft(self) -> bool {
        matches!(self, Self::Edit | Self::Add)
    }
}

impl Display for DisplayState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayState {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| format!("unknown display state `{value}`"))
    }
}
