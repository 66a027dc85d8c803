use anyhow::{bail, Result};
use tokio::sync::mpsc;

use crate::frontend::Frontend;
use crate::logger;
use crate::protocol::{Action, Request};
use crate::store::NoteStore;
use crate::view::ListingView;

/// Everything the dispatch loop knows how to execute. Wire requests map to
/// the first three; the rest are internal lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddRequested(String),
    ViewRequested(String),
    ViewAllRequested,
    NotesChanged,
    ListingClosed,
    Shutdown,
}

impl Command {
    /// Validates a decoded wire request. An absent or empty path on an
    /// action that needs one rejects the whole request.
    pub fn from_request(request: Request) -> Result<Self> {
        let path = request.file_path.filter(|path| !path.is_empty());
        match request.action {
            Action::Add => match path {
                Some(path) => Ok(Command::AddRequested(path)),
                None => bail!("--add requires a file path"),
            },
            Action::View => match path {
                Some(path) => Ok(Command::ViewRequested(path)),
                None => bail!("--view requires a file path"),
            },
            Action::ViewAll => Ok(Command::ViewAllRequested),
        }
    }
}

/// Enqueues a refresh onto the dispatch loop. Fired by the store thread
/// after successful mutations; the refresh itself always runs on the loop,
/// never on the thread that noticed the change.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: mpsc::UnboundedSender<Command>,
}

impl ChangeNotifier {
    pub fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    pub fn notify(&self) {
        // A closed queue just means the loop is already gone.
        let _ = self.tx.send(Command::NotesChanged);
    }
}

/// Single consumer of the command queue and exclusive owner of the listing
/// view. Commands run strictly in arrival order, one at a time.
pub struct Dispatcher {
    store: NoteStore,
    frontend: Box<dyn Frontend>,
    commands: mpsc::UnboundedReceiver<Command>,
    listing: Option<ListingView>,
}

impl Dispatcher {
    pub fn new(
        store: NoteStore,
        frontend: Box<dyn Frontend>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            store,
            frontend,
            commands,
            listing: None,
        }
    }

    pub async fn run(mut self) {
        logger::log("Dispatcher: started");
        while let Some(command) = self.commands.recv().await {
            match command {
                Command::AddRequested(path) => self.handle_add(&path).await,
                Command::ViewRequested(path) => self.handle_view(&path).await,
                Command::ViewAllRequested => self.handle_view_all().await,
                Command::NotesChanged => self.handle_notes_changed().await,
                Command::ListingClosed => {
                    logger::log("Dispatcher: listing closed");
                    self.listing = None;
                }
                Command::Shutdown => break,
            }
        }
        logger::log("Dispatcher: stopped");
    }

    async fn handle_add(&mut self, path: &str) {
        let current = self.store.get(path).await;
        match self.frontend.edit_note(path, &current) {
            Ok(Some(text)) => {
                // An edit down to nothing deletes the note.
                if let Err(err) = self.store.set(path, &text).await {
                    logger::log(&format!("Dispatcher: saving note for '{path}' failed: {err:#}"));
                }
            }
            Ok(None) => {
                logger::log(&format!("Dispatcher: edit cancelled for '{path}'"));
            }
            Err(err) => {
                logger::log(&format!("Dispatcher: edit failed for '{path}': {err:#}"));
            }
        }
    }

    async fn handle_view(&mut self, path: &str) {
        let text = self.store.get(path).await;
        if text.is_empty() {
            self.frontend.show_no_note(path);
        } else {
            self.frontend.show_note(path, &text);
        }
    }

    async fn handle_view_all(&mut self) {
        if let Some(view) = self.listing.as_mut() {
            logger::log("Dispatcher: listing already open, refocusing");
            self.frontend.listing_focused(view);
            return;
        }

        let notes = match self.store.list_all().await {
            Ok(notes) => notes,
            Err(err) => {
                logger::log(&format!("Dispatcher: listing load failed: {err:#}"));
                Vec::new()
            }
        };
        let mut view = ListingView::new(notes);
        logger::log(&format!("Dispatcher: listing opened with {} notes", view.len()));
        self.frontend.listing_opened(&mut view);
        self.listing = Some(view);
    }

    async fn handle_notes_changed(&mut self) {
        let Some(view) = self.listing.as_mut() else {
            return;
        };
        let notes = match self.store.list_all().await {
            Ok(notes) => notes,
            Err(err) => {
                logger::log(&format!("Dispatcher: listing refresh failed: {err:#}"));
                Vec::new()
            }
        };
        view.refresh(notes);
        logger::log(&format!("Dispatcher: listing refreshed, {} notes", view.len()));
        self.frontend.listing_refreshed(view);
    }
}
