use crate::store::Note;

/// State of the singleton "all notes" listing: an ordered snapshot of the
/// store plus a selection cursor. Owned and mutated only by the dispatch
/// loop; the frontend gets `&mut` access during its callbacks to record
/// the user's selection.
#[derive(Debug)]
pub struct ListingView {
    entries: Vec<Note>,
    selected: Option<usize>,
}

impl ListingView {
    pub fn new(entries: Vec<Note>) -> Self {
        Self {
            entries,
            selected: None,
        }
    }

    /// Replaces the snapshot and recomputes the selection: keep the same
    /// path if it survived, otherwise fall back to the old numeric
    /// position clamped to the new length, otherwise nothing.
    pub fn refresh(&mut self, entries: Vec<Note>) {
        let previous_path = self.selected_note().map(|note| note.path.clone());
        let previous_index = self.selected;
        self.entries = entries;

        if self.entries.is_empty() {
            self.selected = None;
            return;
        }
        let by_path = previous_path
            .and_then(|path| self.entries.iter().position(|note| note.path == path));
        self.selected = match by_path {
            Some(index) => Some(index),
            None => previous_index.map(|index| index.min(self.entries.len() - 1)),
        };
    }

    /// Records a selection by path. Returns false (and clears nothing) if
    /// the path is not in the snapshot.
    pub fn select_path(&mut self, path: &str) -> bool {
        match self.entries.iter().position(|note| note.path == path) {
            Some(index) => {
                self.selected = Some(index);
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[Note] {
        &self.entries
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_note(&self) -> Option<&Note> {
        self.selected.and_then(|index| self.entries.get(index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
