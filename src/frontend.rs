use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

use crate::view::ListingView;

#[cfg(windows)]
const FALLBACK_EDITOR: &str = "notepad";
#[cfg(not(windows))]
const FALLBACK_EDITOR: &str = "vi";

/// The user-facing surface the dispatch loop drives. Callbacks run on the
/// dispatch thread; the listing callbacks get `&mut` so an implementation
/// can record the user's selection for later refreshes.
pub trait Frontend: Send {
    /// Collects the new text for `path`, starting from `current`.
    /// `Ok(None)` is a cancellation and must leave the store untouched;
    /// the returned text is expected to be trimmed, and an empty result
    /// means the note should go away.
    fn edit_note(&mut self, path: &str, current: &str) -> Result<Option<String>>;

    fn show_note(&mut self, path: &str, text: &str);

    fn show_no_note(&mut self, path: &str);

    fn listing_opened(&mut self, view: &mut ListingView);

    fn listing_refreshed(&mut self, view: &mut ListingView);

    fn listing_focused(&mut self, view: &mut ListingView);
}

/// Default collaborator: edits go through `$VISUAL`/`$EDITOR` on a scratch
/// file, everything else prints to the server's console.
pub struct ConsoleFrontend {
    scratch: PathBuf,
}

impl ConsoleFrontend {
    pub fn new() -> Self {
        Self {
            scratch: env::temp_dir().join(format!("fnoter-edit-{}.txt", std::process::id())),
        }
    }

    /// Launches the editor on the staged scratch file. `Ok(None)` on a
    /// non-zero editor exit; the caller owns scratch cleanup.
    fn run_editor(&self) -> Result<Option<String>> {
        let editor = env::var("VISUAL")
            .or_else(|_| env::var("EDITOR"))
            .unwrap_or_else(|_| FALLBACK_EDITOR.to_string());
        let status = Command::new(&editor)
            .arg(&self.scratch)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("failed to launch editor '{editor}'"))?;

        if !status.success() {
            return Ok(None);
        }

        let text = fs::read_to_string(&self.scratch).context("failed to read the edited note")?;
        Ok(Some(text.trim().to_string()))
    }

    fn print_listing(&self, view: &ListingView, heading: &str) {
        println!("{heading}");
        if view.is_empty() {
            println!("  (no notes recorded)");
            return;
        }
        for (index, note) in view.entries().iter().enumerate() {
            let marker = if view.selected() == Some(index) { '>' } else { ' ' };
            println!(" {marker} {}", note.path);
        }
        if let Some(note) = view.selected_note() {
            println!();
            println!("{}", note.text);
        }
    }
}

impl Default for ConsoleFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend for ConsoleFrontend {
    fn edit_note(&mut self, path: &str, current: &str) -> Result<Option<String>> {
        fs::write(&self.scratch, current).context("failed to stage the note for editing")?;
        println!("Editing note for {path}");
        // The scratch file never outlives the edit, whichever way it ends.
        let outcome = self.run_editor();
        let _ = fs::remove_file(&self.scratch);
        outcome
    }

    fn show_note(&mut self, path: &str, text: &str) {
        println!("Note for {path}:");
        println!("{text}");
    }

    fn show_no_note(&mut self, path: &str) {
        println!("No note found for {path}");
    }

    fn listing_opened(&mut self, view: &mut ListingView) {
        self.print_listing(view, "All notes:");
    }

    fn listing_refreshed(&mut self, view: &mut ListingView) {
        self.print_listing(view, "All notes (updated):");
    }

    fn listing_focused(&mut self, view: &mut ListingView) {
        self.print_listing(view, "All notes (already open):");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Sole test that touches VISUAL/EDITOR; nothing else in this process
    // reads them.
    #[test]
    fn failed_editor_launch_cleans_up_the_scratch_file() {
        env::set_var("VISUAL", "/nonexistent/fnoter-missing-editor");
        let mut frontend = ConsoleFrontend::new();
        let scratch = frontend.scratch.clone();

        let result = frontend.edit_note("a.txt", "staged");
        env::remove_var("VISUAL");

        assert!(result.is_err());
        assert!(!scratch.exists(), "scratch file left behind");
    }
}
