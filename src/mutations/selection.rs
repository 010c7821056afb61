use serde::Serialize;
use std::collections::BTreeSet;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectionPhase {
    Idle,
    Selecting,
    Operating,
}

/// Multi-select state for batch video operations.
///
/// `Idle -> Selecting -> Operating`, back to `Idle` on success or cancel and
/// back to `Selecting` on failure.
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    phase: SelectionPhase,
    selected: BTreeSet<String>,
    error: Option<String>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            phase: SelectionPhase::Idle,
            selected: BTreeSet::new(),
            error: None,
        }
    }
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_selected(&self, video_id: &str) -> bool {
        self.selected.contains(video_id)
    }

    pub fn enter(&mut self) {
        if self.phase == SelectionPhase::Idle {
            self.phase = SelectionPhase::Selecting;
            self.error = None;
        }
    }

    /// Ignored outside of selection mode.
    pub fn toggle(&mut self, video_id: &str) {
        if self.phase != SelectionPhase::Selecting {
            return;
        }
        if !self.selected.remove(video_id) {
            self.selected.insert(video_id.to_string());
        }
    }

    pub fn select_all<'a>(&mut self, video_ids: impl IntoIterator<Item = &'a str>) {
        if self.phase == SelectionPhase::Selecting {
            self.selected.extend(video_ids.into_iter().map(str::to_string));
        }
    }

    pub fn cancel(&mut self) {
        if self.phase == SelectionPhase::Selecting {
            *self = Self::default();
        }
    }

    /// Start the batch, handing back the ids to operate on.
    pub fn confirm(&mut self) -> Result<Vec<String>, AppError> {
        match self.phase {
            SelectionPhase::Selecting if !self.selected.is_empty() => {
                self.phase = SelectionPhase::Operating;
                self.error = None;
                Ok(self.selected.iter().cloned().collect())
            }
            SelectionPhase::Selecting => Err(AppError::Validation(
                "Select at least one video".to_string(),
            )),
            SelectionPhase::Operating => Err(AppError::Busy),
            SelectionPhase::Idle => Err(AppError::Validation(
                "Not in selection mode".to_string(),
            )),
        }
    }

    pub fn succeed(&mut self) {
        if self.phase == SelectionPhase::Operating {
            *self = Self::default();
        }
    }

    /// Return to selection with the error shown. Videos in `done` already
    /// went through and drop out of the selection.
    pub fn fail(&mut self, message: impl Into<String>, done: &[String]) {
        if self.phase != SelectionPhase::Operating {
            return;
        }
        for id in done {
            self.selected.remove(id);
        }
        self.phase = SelectionPhase::Selecting;
        self.error = Some(message.into());
    }
}
