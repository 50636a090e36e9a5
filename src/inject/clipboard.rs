//! Clipboard port backed by the `arboard` crate.
//!
//! A short-lived [`arboard::Clipboard`] handle is created per operation
//! rather than shared across calls, because `arboard::Clipboard` is not
//! `Send` on all platforms and the handle is cheap to create.

use arboard::Clipboard;

use super::{ClipboardPort, InjectError};

/// Production [`ClipboardPort`] implementation.
pub struct ArboardClipboard;

impl ClipboardPort for ArboardClipboard {
    /// Current clipboard plain text.
    ///
    /// `None` when the clipboard is empty, holds non-text data (e.g. an
    /// image), or cannot be opened — the snapshot step is best-effort.
    fn read_text(&mut self) -> Option<String> {
        match Clipboard::new() {
            Ok(mut clipboard) => clipboard.get_text().ok(),
            Err(e) => {
                log::debug!("clipboard: open for read failed: {e}");
                None
            }
        }
    }

    fn write_text(&mut self, text: &str) -> Result<(), InjectError> {
        let mut clipboard =
            Clipboard::new().map_err(|e| InjectError::ClipboardAccess(e.to_string()))?;
        clipboard
            .set_text(text)
            .map_err(|e| InjectError::ClipboardSet(e.to_string()))
    }
}
