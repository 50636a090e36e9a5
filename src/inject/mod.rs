//! Clipboard-mediated text injection.
//!
//! # Overview
//!
//! Injecting arbitrary Unicode via synthesized keystrokes is unreliable, so
//! text is delivered through the clipboard:
//!
//! 1. **Save** the current clipboard text.
//! 2. **Set** the clipboard to the text to inject.
//! 3. **Raise** the target window, if one was captured when the hotkey
//!    fired, and wait a short settle delay for activation to complete.
//! 4. **Simulate** the paste chord (Ctrl+V, ⌘V on macOS) as low-level
//!    input events, delivered to whichever window has focus.
//! 5. **Restore** the saved clipboard after a longer delay that lets the
//!    target application read it.
//!
//! Every injection runs on its own detached worker thread because steps 3
//! and 5 block on fixed delays; running them on the engine or render thread
//! would stall command processing and the overlay.  Failures never reach
//! the caller — injection is inherently racy against other clipboard users,
//! so each step is best-effort and logs instead.
//!
//! Concurrent injections are deliberately not serialized here; overlapping
//! calls can interleave their save/restore pairs.  Hosts that care must
//! serialize their `insertText` commands.

pub mod clipboard;
pub mod keyboard;

pub use clipboard::ArboardClipboard;
pub use keyboard::EnigoPaste;

use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// InjectError
// ---------------------------------------------------------------------------

/// Errors that can surface inside the injection sequence.  Logged, never
/// propagated across the command channel.
#[derive(Debug, Error)]
pub enum InjectError {
    /// Could not open or read the system clipboard.
    #[error("cannot access clipboard: {0}")]
    ClipboardAccess(String),

    /// Could not write text to the system clipboard.
    #[error("cannot set clipboard text: {0}")]
    ClipboardSet(String),

    /// Could not simulate a key press/release event.
    #[error("cannot simulate key press: {0}")]
    KeySimulation(String),
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Clipboard access seam.  Production uses [`ArboardClipboard`]; tests use
/// a recorder.
pub trait ClipboardPort {
    /// Current clipboard text, or `None` when empty / non-text / unreadable.
    fn read_text(&mut self) -> Option<String>;
    fn write_text(&mut self, text: &str) -> Result<(), InjectError>;
}

/// Paste-chord synthesis seam.  Production uses [`EnigoPaste`].
pub trait PastePort {
    fn send_paste_chord(&mut self) -> Result<(), InjectError>;
}

/// A window captured as the injection target when the hotkey fired.
/// Raising happens on the injection worker thread.
pub trait ForegroundTarget: Send {
    /// Bring the window to the foreground.  Returns `false` when the
    /// window is gone or cannot be activated.
    fn raise(&self) -> bool;
}

// ---------------------------------------------------------------------------
// TextInjector
// ---------------------------------------------------------------------------

/// Clipboard-paste injector with configurable settle delays.
#[derive(Debug, Clone)]
pub struct TextInjector {
    /// Delay after raising the target / setting the clipboard, before the
    /// paste chord — lets window activation and the clipboard write settle.
    pub settle_ms: u64,
    /// Delay after the paste chord before restoring the saved clipboard —
    /// gives the target application time to read it.
    pub restore_ms: u64,
}

impl Default for TextInjector {
    fn default() -> Self {
        Self {
            settle_ms: 80,
            restore_ms: 200,
        }
    }
}

impl TextInjector {
    pub fn new(settle_ms: u64, restore_ms: u64) -> Self {
        Self {
            settle_ms,
            restore_ms,
        }
    }

    /// Fire-and-forget injection on a fresh detached worker thread.
    pub fn spawn(&self, text: String, target: Option<Box<dyn ForegroundTarget>>) {
        let injector = self.clone();
        let spawned = std::thread::Builder::new()
            .name("text-inject".into())
            .spawn(move || injector.inject(&text, target.as_deref()));
        if let Err(e) = spawned {
            log::error!("inject: failed to spawn worker thread: {e}");
        }
    }

    /// Run the full sequence with the production clipboard and keyboard
    /// backends.  Blocks for the configured delays — call from a worker
    /// thread only.
    pub fn inject(&self, text: &str, target: Option<&dyn ForegroundTarget>) {
        let mut clipboard = ArboardClipboard;
        let mut paste = EnigoPaste;
        self.run(text, target, &mut clipboard, &mut paste);
    }

    /// The injection sequence against explicit ports.
    pub fn run(
        &self,
        text: &str,
        target: Option<&dyn ForegroundTarget>,
        clipboard: &mut dyn ClipboardPort,
        paste: &mut dyn PastePort,
    ) {
        if text.is_empty() {
            return;
        }

        // 1. Snapshot (best-effort; None when empty or unreadable).
        let saved = clipboard.read_text();

        // 2. Set.  A failed set aborts the injection — pasting here would
        //    deliver whatever the clipboard happened to hold.
        if let Err(e) = clipboard.write_text(text) {
            log::warn!("inject: clipboard set failed, aborting: {e}");
            return;
        }

        // 3. Activate the captured target window, then settle.
        if let Some(target) = target {
            if !target.raise() {
                log::debug!("inject: target window could not be raised");
            }
        }
        std::thread::sleep(Duration::from_millis(self.settle_ms));

        // 4. Paste chord to whichever window now has focus.
        if let Err(e) = paste.send_paste_chord() {
            log::warn!("inject: paste simulation failed: {e}");
        }

        // 5. Restore after the target has had time to read the clipboard.
        std::thread::sleep(Duration::from_millis(self.restore_ms));
        if let Some(saved) = saved {
            if let Err(e) = clipboard.write_text(&saved) {
                log::warn!("inject: clipboard restore failed: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// Shared call log; the mocks append to it so the test can assert the
    /// exact sequence of side effects.
    type CallLog = Rc<RefCell<Vec<String>>>;

    struct MockClipboard {
        log: CallLog,
        content: Option<String>,
        fail_set: bool,
    }

    impl ClipboardPort for MockClipboard {
        fn read_text(&mut self) -> Option<String> {
            self.log.borrow_mut().push("read".into());
            self.content.clone()
        }

        fn write_text(&mut self, text: &str) -> Result<(), InjectError> {
            if self.fail_set {
                return Err(InjectError::ClipboardSet("denied".into()));
            }
            self.log.borrow_mut().push(format!("write:{text}"));
            self.content = Some(text.to_owned());
            Ok(())
        }
    }

    struct MockPaste {
        log: CallLog,
    }

    impl PastePort for MockPaste {
        fn send_paste_chord(&mut self) -> Result<(), InjectError> {
            self.log.borrow_mut().push("chord".into());
            Ok(())
        }
    }

    struct MockTarget {
        log: CallLog,
    }

    // The log is not Sync, but these tests are single-threaded.
    unsafe impl Send for MockTarget {}

    impl ForegroundTarget for MockTarget {
        fn raise(&self) -> bool {
            self.log.borrow_mut().push("raise".into());
            true
        }
    }

    fn zero_delay() -> TextInjector {
        TextInjector::new(0, 0)
    }

    #[test]
    fn full_sequence_saves_raises_pastes_and_restores() {
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        let mut clipboard = MockClipboard {
            log: Rc::clone(&log),
            content: Some("previous".into()),
            fail_set: false,
        };
        let mut paste = MockPaste {
            log: Rc::clone(&log),
        };
        let target = MockTarget {
            log: Rc::clone(&log),
        };

        zero_delay().run("hello", Some(&target), &mut clipboard, &mut paste);

        assert_eq!(
            *log.borrow(),
            vec!["read", "write:hello", "raise", "chord", "write:previous"]
        );
        // Property from the scenario: prior clipboard content is restored.
        assert_eq!(clipboard.content.as_deref(), Some("previous"));
    }

    #[test]
    fn empty_clipboard_is_not_restored() {
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        let mut clipboard = MockClipboard {
            log: Rc::clone(&log),
            content: None,
            fail_set: false,
        };
        let mut paste = MockPaste {
            log: Rc::clone(&log),
        };

        zero_delay().run("hello", None, &mut clipboard, &mut paste);

        assert_eq!(*log.borrow(), vec!["read", "write:hello", "chord"]);
        assert_eq!(clipboard.content.as_deref(), Some("hello"));
    }

    #[test]
    fn empty_text_is_a_noop() {
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        let mut clipboard = MockClipboard {
            log: Rc::clone(&log),
            content: Some("previous".into()),
            fail_set: false,
        };
        let mut paste = MockPaste {
            log: Rc::clone(&log),
        };

        zero_delay().run("", None, &mut clipboard, &mut paste);

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn failed_set_aborts_without_pasting() {
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        let mut clipboard = MockClipboard {
            log: Rc::clone(&log),
            content: Some("previous".into()),
            fail_set: true,
        };
        let mut paste = MockPaste {
            log: Rc::clone(&log),
        };

        zero_delay().run("hello", None, &mut clipboard, &mut paste);

        // Snapshot happened, but no chord and no restore write.
        assert_eq!(*log.borrow(), vec!["read"]);
    }

    #[test]
    fn chord_happens_exactly_once_per_injection() {
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        let mut clipboard = MockClipboard {
            log: Rc::clone(&log),
            content: None,
            fail_set: false,
        };
        let mut paste = MockPaste {
            log: Rc::clone(&log),
        };

        zero_delay().run("hello", None, &mut clipboard, &mut paste);
        let chords = log.borrow().iter().filter(|s| *s == "chord").count();
        assert_eq!(chords, 1);
    }

    #[test]
    fn default_delays_match_settle_then_restore_policy() {
        let injector = TextInjector::default();
        assert_eq!(injector.settle_ms, 80);
        assert_eq!(injector.restore_ms, 200);
        assert!(injector.restore_ms > injector.settle_ms);
    }
}
