#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

use fnoter::frontend::Frontend;
use fnoter::view::ListingView;

/// A frontend callback as the dispatch loop issued it, with the view state
/// it saw at that moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    EditStarted { path: String, current: String },
    NoteShown { path: String, text: String },
    NoNote { path: String },
    ListingOpened { paths: Vec<String>, selected: Option<usize> },
    ListingRefreshed { paths: Vec<String>, selected: Option<usize> },
    ListingFocused { paths: Vec<String>, selected: Option<usize> },
}

/// Frontend double: records every callback on a channel the test can await,
/// and replays scripted edit outcomes instead of launching an editor. An
/// unscripted edit behaves like a cancel.
pub struct RecordingFrontend {
    events: mpsc::UnboundedSender<Event>,
    edits: VecDeque<Option<String>>,
    select_on_open: Option<String>,
}

impl RecordingFrontend {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                events,
                edits: VecDeque::new(),
                select_on_open: None,
            },
            rx,
        )
    }

    /// Queues the outcome of the next `edit_note` call.
    pub fn script_edit(mut self, result: Option<&str>) -> Self {
        self.edits.push_back(result.map(str::to_string));
        self
    }

    /// Selects `path` when the listing opens, like a user clicking a row.
    pub fn select_on_open(mut self, path: &str) -> Self {
        self.select_on_open = Some(path.to_string());
        self
    }

    fn paths(view: &ListingView) -> Vec<String> {
        view.entries().iter().map(|note| note.path.clone()).collect()
    }
}

impl Frontend for RecordingFrontend {
    fn edit_note(&mut self, path: &str, current: &str) -> Result<Option<String>> {
        let _ = self.events.send(Event::EditStarted {
            path: path.to_string(),
            current: current.to_string(),
        });
        Ok(self.edits.pop_front().unwrap_or(None))
    }

    fn show_note(&mut self, path: &str, text: &str) {
        let _ = self.events.send(Event::NoteShown {
            path: path.to_string(),
            text: text.to_string(),
        });
    }

    fn show_no_note(&mut self, path: &str) {
        let _ = self.events.send(Event::NoNote {
            path: path.to_string(),
        });
    }

    fn listing_opened(&mut self, view: &mut ListingView) {
        if let Some(path) = self.select_on_open.take() {
            view.select_path(&path);
        }
        let _ = self.events.send(Event::ListingOpened {
            paths: Self::paths(view),
            selected: view.selected(),
        });
    }

    fn listing_refreshed(&mut self, view: &mut ListingView) {
        let _ = self.events.send(Event::ListingRefreshed {
            paths: Self::paths(view),
            selected: view.selected(),
        });
    }

    fn listing_focused(&mut self, view: &mut ListingView) {
        let _ = self.events.send(Event::ListingFocused {
            paths: Self::paths(view),
            selected: view.selected(),
        });
    }
}

/// Awaits the next frontend event, failing the test instead of hanging.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a frontend event")
        .expect("dispatch loop hung up")
}
