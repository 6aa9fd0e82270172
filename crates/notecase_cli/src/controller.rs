//! Display-state controller.
//!
//! # Responsibility
//! - Own the current `DisplayState` and the explicit transition table.
//! - Call core operations and map their results onto state changes.
//!
//! # Invariants
//! - The state only changes through `TRANSITIONS` or a core failure.
//! - Any core failure moves to `Error`; acknowledging it resumes the state
//!   the failure happened in, with the edit buffer still alive.
//! - A rejected transition leaves every field untouched.

use log::{debug, warn};
use notecase_core::{
    DisplayState, EditableNote, MarkdownNote, NoteBackend, NoteError, NoteHandle,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use DisplayState::{Add, CategoryEditor, Choose, Display as Shown, Edit, List};

/// Input that may move the controller to another state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    CategoryChosen,
    NoteOpened,
    NoteOpenedForEdit,
    EditStarted,
    AddStarted,
    Committed,
    Discarded,
    CategoryEditorOpened,
    CategoryCreated,
    Back,
}

impl UiEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CategoryChosen => "category_chosen",
            Self::NoteOpened => "note_opened",
            Self::NoteOpenedForEdit => "note_opened_for_edit",
            Self::EditStarted => "edit_started",
            Self::AddStarted => "add_started",
            Self::Committed => "committed",
            Self::Discarded => "discarded",
            Self::CategoryEditorOpened => "category_editor_opened",
            Self::CategoryCreated => "category_created",
            Self::Back => "back",
        }
    }
}

impl Display for UiEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(from, event) -> to`. Entering and leaving `Error` is handled apart.
const TRANSITIONS: &[(DisplayState, UiEvent, DisplayState)] = &[
    (Choose, UiEvent::CategoryChosen, List),
    (List, UiEvent::CategoryChosen, List),
    (List, UiEvent::NoteOpened, Shown),
    (List, UiEvent::NoteOpenedForEdit, Edit),
    (List, UiEvent::AddStarted, Add),
    (Shown, UiEvent::EditStarted, Edit),
    (Edit, UiEvent::Committed, Shown),
    (Edit, UiEvent::Discarded, Shown),
    (Add, UiEvent::Committed, Shown),
    (Add, UiEvent::Discarded, List),
    (Choose, UiEvent::CategoryEditorOpened, CategoryEditor),
    (List, UiEvent::CategoryEditorOpened, CategoryEditor),
    (CategoryEditor, UiEvent::CategoryCreated, Choose),
    (CategoryEditor, UiEvent::Back, Choose),
    (Shown, UiEvent::Back, List),
    (List, UiEvent::Back, Choose),
];

/// Looks up the target state of `event` in `from`.
pub fn next_state(from: DisplayState, event: UiEvent) -> Option<DisplayState> {
    TRANSITIONS
        .iter()
        .find(|(state, trigger, _)| *state == from && *trigger == event)
        .map(|(_, _, to)| *to)
}

#[derive(Debug)]
pub enum ControllerError {
    /// `event` is not allowed in `from`; nothing changed.
    InvalidTransition {
        from: DisplayState,
        event: &'static str,
    },
    /// A core operation failed; the controller is now in `Error`.
    Core(NoteError),
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTransition { from, event } => {
                write!(f, "`{event}` is not allowed in state `{from}`")
            }
            Self::Core(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTransition { .. } => None,
            Self::Core(err) => Some(err),
        }
    }
}

pub type ControllerResult<T> = Result<T, ControllerError>;

/// Drives a `NoteBackend` through the display states.
pub struct Controller<B> {
    backend: B,
    state: DisplayState,
    resume: DisplayState,
    category: Option<String>,
    note: Option<MarkdownNote>,
    draft: Option<EditableNote>,
    last_error: Option<String>,
}

impl<B: NoteBackend> Controller<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: DisplayState::Choose,
            resume: DisplayState::Choose,
            category: None,
            note: None,
            draft: None,
            last_error: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn note(&self) -> Option<&MarkdownNote> {
        self.note.as_ref()
    }

    pub fn draft(&self) -> Option<&EditableNote> {
        self.draft.as_ref()
    }

    /// Human-readable cause shown by the ERROR view.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// CHOOSE/LIST -> LIST.
    pub fn choose_category(&mut self, name: &str) -> ControllerResult<Vec<NoteHandle>> {
        let target = self.guard(UiEvent::CategoryChosen)?;
        let handles = self
            .backend
            .list_notes(name)
            .map_err(|err| self.fail(err))?;
        self.category = Some(name.to_string());
        self.note = None;
        self.enter(target, UiEvent::CategoryChosen);
        Ok(handles)
    }

    /// LIST -> DISPLAY.
    pub fn open_note(&mut self, index: usize) -> ControllerResult<&MarkdownNote> {
        let target = self.guard(UiEvent::NoteOpened)?;
        let note = self.load(index)?;
        self.enter(target, UiEvent::NoteOpened);
        Ok(&*self.note.insert(note))
    }

    /// LIST -> EDIT.
    pub fn open_note_for_edit(&mut self, index: usize) -> ControllerResult<&EditableNote> {
        let target = self.guard(UiEvent::NoteOpenedForEdit)?;
        let note = self.load(index)?;
        self.note = Some(note.clone());
        self.enter(target, UiEvent::NoteOpenedForEdit);
        Ok(&*self.draft.insert(EditableNote::from_note(note)))
    }

    /// DISPLAY -> EDIT.
    pub fn begin_edit(&mut self) -> ControllerResult<&EditableNote> {
        let target = self.guard(UiEvent::EditStarted)?;
        let Some(note) = self.note.clone() else {
            return Err(self.invalid(UiEvent::EditStarted));
        };
        self.enter(target, UiEvent::EditStarted);
        Ok(&*self.draft.insert(EditableNote::from_note(note)))
    }

    /// LIST -> ADD.
    pub fn begin_add(&mut self) -> ControllerResult<&EditableNote> {
        let target = self.guard(UiEvent::AddStarted)?;
        let Some(category) = self.category.clone() else {
            return Err(self.invalid(UiEvent::AddStarted));
        };
        self.enter(target, UiEvent::AddStarted);
        Ok(&*self.draft.insert(EditableNote::for_new_note(category)))
    }

    /// Replaces the edit buffer while in EDIT or ADD.
    pub fn set_draft_text(&mut self, text: impl Into<String>) -> ControllerResult<()> {
        match self.draft.as_mut() {
            Some(draft) if self.state.holds_draft() => {
                draft.set_text(text);
                Ok(())
            }
            _ => Err(ControllerError::InvalidTransition {
                from: self.state,
                event: "set_draft_text",
            }),
        }
    }

    /// EDIT/ADD -> DISPLAY. On failure the draft is kept and the
    /// controller moves to ERROR.
    pub fn commit(&mut self) -> ControllerResult<&MarkdownNote> {
        let target = self.guard(UiEvent::Committed)?;
        let Some(draft) = self.draft.take() else {
            return Err(self.invalid(UiEvent::Committed));
        };
        match draft.commit(&self.backend) {
            Ok(note) => {
                self.enter(target, UiEvent::Committed);
                Ok(&*self.note.insert(note))
            }
            Err(failure) => {
                let (draft, err) = failure.into_parts();
                self.draft = Some(draft);
                Err(self.fail(err))
            }
        }
    }

    /// EDIT -> DISPLAY, ADD -> LIST, without writing.
    pub fn discard(&mut self) -> ControllerResult<()> {
        let target = self.guard(UiEvent::Discarded)?;
        if let Some(draft) = self.draft.take() {
            draft.discard();
        }
        self.enter(target, UiEvent::Discarded);
        Ok(())
    }

    /// CHOOSE/LIST -> CATEGORY_EDITOR.
    pub fn open_category_editor(&mut self) -> ControllerResult<()> {
        let target = self.guard(UiEvent::CategoryEditorOpened)?;
        self.enter(target, UiEvent::CategoryEditorOpened);
        Ok(())
    }

    /// CATEGORY_EDITOR -> CHOOSE.
    pub fn create_category(&mut self, name: &str) -> ControllerResult<()> {
        let target = self.guard(UiEvent::CategoryCreated)?;
        self.backend
            .create_category(name)
            .map_err(|err| self.fail(err))?;
        self.category = None;
        self.enter(target, UiEvent::CategoryCreated);
        Ok(())
    }

    pub fn back(&mut self) -> ControllerResult<()> {
        let target = self.guard(UiEvent::Back)?;
        match target {
            DisplayState::Choose => self.category = None,
            DisplayState::List => self.note = None,
            _ => {}
        }
        self.enter(target, UiEvent::Back);
        Ok(())
    }

    /// ERROR -> the state the failure happened in.
    pub fn acknowledge_error(&mut self) -> ControllerResult<()> {
        if self.state != DisplayState::Error {
            return Err(ControllerError::InvalidTransition {
                from: self.state,
                event: "acknowledge_error",
            });
        }
        self.last_error = None;
        let resume = self.resume;
        self.enter(resume, "acknowledge_error");
        Ok(())
    }

    fn load(&mut self, index: usize) -> ControllerResult<MarkdownNote> {
        let Some(category) = self.category.clone() else {
            return Err(self.invalid(UiEvent::NoteOpened));
        };
        self.backend
            .load_note(&category, index)
            .map_err(|err| self.fail(err))
    }

    fn guard(&self, event: UiEvent) -> ControllerResult<DisplayState> {
        next_state(self.state, event).ok_or_else(|| self.invalid(event))
    }

    fn invalid(&self, event: UiEvent) -> ControllerError {
        ControllerError::InvalidTransition {
            from: self.state,
            event: event.as_str(),
        }
    }

    fn fail(&mut self, err: NoteError) -> ControllerError {
        warn!(
            "event=state_transition module=cli status=error from={} to=error error_code={}",
            self.state,
            err.error_code()
        );
        self.resume = self.state;
        self.last_error = Some(err.to_string());
        self.state = DisplayState::Error;
        ControllerError::Core(err)
    }

    fn enter(&mut self, target: DisplayState, trigger: impl Display) {
        debug!(
            "event=state_transition module=cli status=ok from={} to={} trigger={}",
            self.state, target, trigger
        );
        self.state = target;
    }
}

#[cfg(test)]
mod tests {
    use super::{next_state, Controller, ControllerError, UiEvent};
    use notecase_core::{CoreConfig, DisplayState, FileSystemBackend, NoteBackend};
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    fn controller(root: &Path) -> Controller<FileSystemBackend> {
        fs::create_dir_all(root.join("test")).unwrap();
        fs::write(root.join("test").join("testnote.md"), "# Test Note\n").unwrap();
        let backend = FileSystemBackend::open(Arc::new(CoreConfig::new(root))).unwrap();
        Controller::new(backend)
    }

    #[test]
    fn transition_table_never_targets_error() {
        for from in DisplayState::ALL {
            for event in [
                UiEvent::CategoryChosen,
                UiEvent::NoteOpened,
                UiEvent::Committed,
                UiEvent::Back,
            ] {
                assert_ne!(next_state(from, event), Some(DisplayState::Error));
            }
        }
        assert_eq!(next_state(DisplayState::Error, UiEvent::Back), None);
        assert_eq!(
            next_state(DisplayState::Add, UiEvent::Discarded),
            Some(DisplayState::List)
        );
    }

    #[test]
    fn browse_edit_commit_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path());

        let handles = controller.choose_category("test").unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(controller.state(), DisplayState::List);

        controller.open_note(0).unwrap();
        assert_eq!(controller.state(), DisplayState::Display);

        controller.begin_edit().unwrap();
        controller.set_draft_text("# Edited\n").unwrap();
        let note = controller.commit().unwrap();
        assert_eq!(note.raw_text(), "# Edited\n");
        assert_eq!(controller.state(), DisplayState::Display);
        assert!(controller.draft().is_none());

        controller.back().unwrap();
        controller.back().unwrap();
        assert_eq!(controller.state(), DisplayState::Choose);
        assert_eq!(controller.category(), None);
    }

    #[test]
    fn load_failure_enters_error_and_acknowledge_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path());
        controller.choose_category("test").unwrap();

        let err = controller.open_note(7).unwrap_err();
        assert!(matches!(err, ControllerError::Core(ref core) if core.is_not_found()));
        assert_eq!(controller.state(), DisplayState::Error);
        assert!(controller.last_error().unwrap().contains("not found"));

        controller.acknowledge_error().unwrap();
        assert_eq!(controller.state(), DisplayState::List);
        assert_eq!(controller.last_error(), None);
    }

    #[test]
    fn failed_commit_keeps_draft_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path());
        controller.choose_category("test").unwrap();
        controller.open_note_for_edit(0).unwrap();
        assert_eq!(controller.state(), DisplayState::Edit);
        controller.set_draft_text("# Keep me\n").unwrap();

        fs::remove_dir_all(dir.path().join("test")).unwrap();
        assert!(controller.commit().is_err());
        assert_eq!(controller.state(), DisplayState::Error);

        controller.acknowledge_error().unwrap();
        assert_eq!(controller.state(), DisplayState::Edit);
        assert_eq!(controller.draft().unwrap().edit_text(), "# Keep me\n");
    }

    #[test]
    fn add_flow_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path());
        controller.choose_category("test").unwrap();

        controller.begin_add().unwrap();
        controller.discard().unwrap();
        assert_eq!(controller.state(), DisplayState::List);

        controller.begin_add().unwrap();
        controller.set_draft_text("# Fresh\n").unwrap();
        let created = controller.commit().unwrap();
        assert_eq!(created.title(), Some("Fresh"));
        assert_eq!(controller.state(), DisplayState::Display);
        assert_eq!(controller.backend().list_notes("test").unwrap().len(), 2);
    }

    #[test]
    fn invalid_transitions_change_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path());

        assert!(matches!(
            controller.open_note(0),
            Err(ControllerError::InvalidTransition {
                from: DisplayState::Choose,
                ..
            })
        ));
        assert!(controller.commit().is_err());
        assert!(controller.set_draft_text("x").is_err());
        assert!(controller.acknowledge_error().is_err());
        assert_eq!(controller.state(), DisplayState::Choose);
    }

    #[test]
    fn category_editor_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path());

        controller.open_category_editor().unwrap();
        assert_eq!(controller.state(), DisplayState::CategoryEditor);
        controller.create_category("ideas").unwrap();
        assert_eq!(controller.state(), DisplayState::Choose);
        assert!(dir.path().join("ideas").is_dir());

        controller.open_category_editor().unwrap();
        assert!(controller.create_category("../bad").is_err());
        assert_eq!(controller.state(), DisplayState::Error);
        controller.acknowledge_error().unwrap();
        assert_eq!(controller.state(), DisplayState::CategoryEditor);
    }
}
