//! Binding state machine over a [`KeyObservation`] backend.
//!
//! One [`Binding`] per [`HotkeyPurpose`].  Registration translates the
//! portable key, removes any previous binding for the purpose (so a stale
//! OS registration can never linger), and watches the key on the backend.
//! Raw transitions are folded through [`HotkeyDispatcher::on_raw`], which
//! applies repeat suppression and synthesizes up events for backends that
//! only observe downs.

use std::collections::HashMap;

use crate::keys::{translate, PortableKey};

use super::backend::{KeyObservation, RawTransition};
use super::{HotkeyPurpose, KeyEvent, KeyTransition};

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// Per-purpose binding state.
#[derive(Debug, Clone, Copy)]
struct Binding {
    vk: u32,
    is_down: bool,
}

// ---------------------------------------------------------------------------
// HotkeyDispatcher
// ---------------------------------------------------------------------------

/// Tracks enabled bindings and turns raw transitions into [`KeyEvent`]s.
pub struct HotkeyDispatcher {
    backend: Box<dyn KeyObservation>,
    bindings: HashMap<HotkeyPurpose, Binding>,
}

impl HotkeyDispatcher {
    pub fn new(backend: Box<dyn KeyObservation>) -> Self {
        Self {
            backend,
            bindings: HashMap::new(),
        }
    }

    /// Register (or replace) the binding for `purpose`.
    ///
    /// Returns `false` when the backend refuses the watch; the previous
    /// binding for the purpose is gone either way, matching the original
    /// register-replaces semantics.
    pub fn register(
        &mut self,
        purpose: HotkeyPurpose,
        key: PortableKey,
        modifiers: Option<u8>,
    ) -> bool {
        self.unregister(purpose);

        let native = translate(key);
        if !self.backend.watch(native, modifiers) {
            log::warn!("hotkey: backend refused watch for {key:?}");
            return false;
        }
        self.bindings.insert(
            purpose,
            Binding {
                vk: native.vk,
                is_down: false,
            },
        );
        true
    }

    /// Remove the binding for `purpose`.  Idempotent — unregistering a
    /// purpose that has no binding does nothing.
    pub fn unregister(&mut self, purpose: HotkeyPurpose) {
        if let Some(binding) = self.bindings.remove(&purpose) {
            self.backend.unwatch(binding.vk);
        }
    }

    /// Number of enabled bindings.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Fold one raw transition through every matching binding.
    ///
    /// Several purposes may share a key; each emits its own events.  For a
    /// backend without release reporting, each down is immediately followed
    /// by a synthetic up and the binding never stays in the down state.
    pub fn on_raw(&mut self, raw: RawTransition) -> Vec<KeyEvent> {
        let synthesize_up = !self.backend.reports_release();
        let mut events = Vec::new();

        for binding in self.bindings.values_mut().filter(|b| b.vk == raw.vk) {
            match raw.transition {
                KeyTransition::Down => {
                    let is_repeat = binding.is_down;
                    binding.is_down = true;
                    events.push(KeyEvent {
                        key_code: binding.vk,
                        transition: KeyTransition::Down,
                        is_repeat,
                        has_modifiers: raw.has_modifiers,
                    });
                    if synthesize_up {
                        binding.is_down = false;
                        events.push(KeyEvent {
                            key_code: binding.vk,
                            transition: KeyTransition::Up,
                            is_repeat: false,
                            has_modifiers: raw.has_modifiers,
                        });
                    }
                }
                KeyTransition::Up => {
                    // An up with no preceding down (e.g. the key was held
                    // across registration) is dropped.
                    if binding.is_down {
                        binding.is_down = false;
                        events.push(KeyEvent {
                            key_code: binding.vk,
                            transition: KeyTransition::Up,
                            is_repeat: false,
                            has_modifiers: raw.has_modifiers,
                        });
                    }
                }
            }
        }
        events
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
