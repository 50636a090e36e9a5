//! Global hotkey capture — dispatcher and OS observation strategies.
//!
//! # Design
//!
//! The [`HotkeyDispatcher`] owns one binding per registration purpose
//! (primary dictation key, secondary meeting-mode key) and a single
//! observation backend behind the [`KeyObservation`] trait.  Two strategies
//! exist, selected at startup from config:
//!
//! * [`LowLevelFilter`] — a system-wide `rdev` keyboard filter on a
//!   dedicated OS thread.  Observes every key transition process-wide, so
//!   both down and up are real events and modifier state can be sampled.
//! * [`AcceleratorBackend`] — OS-reserved hotkeys via the `global-hotkey`
//!   crate.  Only the down transition is observable in this mode; the
//!   dispatcher synthesizes the matching up event immediately.
//!
//! Exactly one OS observation mechanism forwards events at a time, no
//! matter how many bindings are enabled; it is installed when the first
//! binding is enabled and torn down when the last one goes away.
//!
//! Raw transitions are delivered over a `tokio::sync::mpsc` channel to the
//! engine task, which feeds them to [`HotkeyDispatcher::on_raw`] — so
//! binding state never races the command path.

pub mod backend;
pub mod dispatcher;

pub use backend::{AcceleratorBackend, KeyObservation, LowLevelFilter, RawTransition};
pub use dispatcher::HotkeyDispatcher;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Direction of a key transition.  Serialized as `"down"` / `"up"` on the
/// event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyTransition {
    Down,
    Up,
}

/// A key event emitted to the host over the event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Windows virtual-key number of the binding, as registered.
    pub key_code: u32,
    pub transition: KeyTransition,
    /// `true` when a down arrives while the binding is already held
    /// (OS auto-repeat).
    pub is_repeat: bool,
    /// Whether any modifier key (control / alt / shift / meta) was held at
    /// emission time.  The host uses this to ignore modified combinations.
    pub has_modifiers: bool,
}

/// Which registered hotkey a binding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyPurpose {
    /// The primary dictation hotkey.
    Primary,
    /// The secondary "meeting mode" hotkey.
    Secondary,
}
