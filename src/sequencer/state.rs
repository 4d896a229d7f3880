use serde::{Deserialize, Serialize};

/// Position in the running action sequence.
///
/// Both fields are `None` exactly when no sequence is in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencerState {
    pub current_label: Option<String>,
    pub cursor: Option<usize>,
}

impl SequencerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_progress(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn position(&self) -> Option<(&str, usize)> {
        match (&self.current_label, self.cursor) {
            (Some(label), Some(cursor)) => Some((label.as_str(), cursor)),
            _ => None,
        }
    }

    pub fn set(&mut self, label: &str, cursor: usize) {
        if self.current_label.as_deref() != Some(label) {
            self.current_label = Some(label.to_string());
        }
        self.cursor = Some(cursor);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
