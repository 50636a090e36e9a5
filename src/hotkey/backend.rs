//! OS key-observation strategies behind the [`KeyObservation`] trait.
//!
//! Both backends deliver [`RawTransition`]s over a `tokio::sync::mpsc`
//! channel using `blocking_send`, which is safe from their non-async OS
//! threads.
//!
//! # Shutdown caveat (low-level filter)
//!
//! `rdev::listen` has **no graceful shutdown API**.  When the last watch is
//! removed the filter sets a stop flag so the callback discards further
//! events, but the OS thread itself remains blocked in the rdev event loop
//! until the process exits.  This is safe — rdev holds no resources that
//! need explicit cleanup — and a later first watch simply spawns a fresh
//! forwarding thread.

use std::collections::{HashMap, HashSet};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc as std_mpsc, Arc, Mutex,
};
use std::time::Duration;

use global_hotkey::{
    hotkey::{HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use tokio::sync::mpsc;

use crate::keys::NativeKey;

use super::KeyTransition;

// ---------------------------------------------------------------------------
// RawTransition
// ---------------------------------------------------------------------------

/// A key transition as reported by an observation backend, before the
/// dispatcher's binding state machine has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTransition {
    /// Virtual-key number of the watched key.
    pub vk: u32,
    pub transition: KeyTransition,
    /// Modifier state sampled when the transition was observed.  Always
    /// `false` from the accelerator backend, which reserves the exact
    /// chord it registered.
    pub has_modifiers: bool,
}

// ---------------------------------------------------------------------------
// KeyObservation
// ---------------------------------------------------------------------------

/// An OS mechanism that observes key transitions for a set of watched keys.
///
/// Implementations install their native resource lazily on the first watch
/// and tear it down when the last watch is removed, so the resource exists
/// if and only if at least one binding is enabled.
pub trait KeyObservation: Send {
    /// Begin observing `key`.  `modifiers` is the original registration
    /// mask (shift=1, control=2, alt=4); only the accelerator strategy
    /// uses it.  Returns `false` if the OS refuses the installation.
    fn watch(&mut self, key: NativeKey, modifiers: Option<u8>) -> bool;

    /// Stop observing the key with this virtual-key number.  Idempotent.
    fn unwatch(&mut self, vk: u32);

    /// Number of currently watched keys.
    fn watch_count(&self) -> usize;

    /// Whether this backend observes real key-up transitions.  When
    /// `false` the dispatcher synthesizes an up immediately after each
    /// down.
    fn reports_release(&self) -> bool;
}

// ---------------------------------------------------------------------------
// LowLevelFilter
// ---------------------------------------------------------------------------

/// System-wide keyboard filter backed by `rdev::listen`.
pub struct LowLevelFilter {
    tx: mpsc::Sender<RawTransition>,
    /// Keys currently watched, shared with the listener callback.
    watched: Arc<Mutex<HashMap<rdev::Key, u32>>>,
    /// Stop flag of the running listener thread, if one is installed.
    stop: Option<Arc<AtomicBool>>,
}

impl LowLevelFilter {
    pub fn new(tx: mpsc::Sender<RawTransition>) -> Self {
        Self {
            tx,
            watched: Arc::new(Mutex::new(HashMap::new())),
            stop: None,
        }
    }

    /// Spawn the dedicated listener thread.  Returns `false` if the OS
    /// refuses to create the thread.
    fn install(&mut self) -> bool {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);
        let watched = Arc::clone(&self.watched);
        let tx = self.tx.clone();

        let spawned = std::thread::Builder::new()
            .name("key-filter".into())
            .spawn(move || {
                // Modifier state lives on this thread; `rdev` shows us every
                // transition so we can sample it at emission time.
                let mut modifiers = ModifierTracker::default();
                let result = rdev::listen(move |event| {
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }
                    let (key, transition) = match event.event_type {
                        rdev::EventType::KeyPress(k) => (k, KeyTransition::Down),
                        rdev::EventType::KeyRelease(k) => (k, KeyTransition::Up),
                        _ => return,
                    };
                    if modifiers.observe(key, transition) {
                        return;
                    }
                    let vk = match watched.lock().unwrap().get(&key) {
                        Some(&vk) => vk,
                        None => return,
                    };
                    let _ = tx.blocking_send(RawTransition {
                        vk,
                        transition,
                        has_modifiers: modifiers.any_held(),
                    });
                });
                if let Err(e) = result {
                    log::error!("key-filter: rdev::listen exited with error: {e:?}");
                }
            });

        match spawned {
            Ok(_) => {
                self.stop = Some(stop);
                true
            }
            Err(e) => {
                log::error!("key-filter: failed to spawn listener thread: {e}");
                false
            }
        }
    }
}

impl KeyObservation for LowLevelFilter {
    fn watch(&mut self, key: NativeKey, _modifiers: Option<u8>) -> bool {
        if self.stop.is_none() && !self.install() {
            return false;
        }
        self.watched.lock().unwrap().insert(key.observed, key.vk);
        true
    }

    fn unwatch(&mut self, vk: u32) {
        let mut watched = self.watched.lock().unwrap();
        watched.retain(|_, &mut v| v != vk);
        if watched.is_empty() {
            if let Some(stop) = self.stop.take() {
                stop.store(true, Ordering::Relaxed);
            }
        }
    }

    fn watch_count(&self) -> usize {
        self.watched.lock().unwrap().len()
    }

    fn reports_release(&self) -> bool {
        true
    }
}

impl Drop for LowLevelFilter {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.store(true, Ordering::Relaxed);
        }
    }
}

/// Held-modifier state for the filter thread.
///
/// Tracked as a set, not a counter: the OS auto-repeats `KeyPress` for a
/// held modifier, so one release must clear the key no matter how many
/// presses were delivered for it.
#[derive(Debug, Default)]
struct ModifierTracker {
    held: HashSet<rdev::Key>,
}

impl ModifierTracker {
    /// Fold one transition into the set.  Returns `true` when the key is a
    /// modifier (and was consumed here).
    fn observe(&mut self, key: rdev::Key, transition: KeyTransition) -> bool {
        if !is_modifier(key) {
            return false;
        }
        match transition {
            KeyTransition::Down => self.held.insert(key),
            KeyTransition::Up => self.held.remove(&key),
        };
        true
    }

    fn any_held(&self) -> bool {
        !self.held.is_empty()
    }
}

/// Is this one of the modifier keys sampled for `has_modifiers`?
fn is_modifier(key: rdev::Key) -> bool {
    matches!(
        key,
        rdev::Key::ControlLeft
            | rdev::Key::ControlRight
            | rdev::Key::Alt
            | rdev::Key::AltGr
            | rdev::Key::ShiftLeft
            | rdev::Key::ShiftRight
            | rdev::Key::MetaLeft
            | rdev::Key::MetaRight
    )
}

// ---------------------------------------------------------------------------
// AcceleratorBackend
// ---------------------------------------------------------------------------

enum AccelOp {
    Watch {
        key: NativeKey,
        modifiers: Option<u8>,
        reply: std_mpsc::Sender<bool>,
    },
    Unwatch {
        vk: u32,
    },
    Shutdown,
}

/// OS-reserved hotkeys backed by the `global-hotkey` crate.
///
/// A dedicated owner thread holds the `GlobalHotKeyManager` (which is not
/// freely movable across threads on every platform) and services watch /
/// unwatch requests over a control channel while draining the crate's
/// event receiver.  The manager is created on the first watch and dropped
/// when the last watch is removed, releasing the OS registrations.
///
/// Only `Pressed` events are forwarded: an exclusive accelerator has no
/// reliable release notification, so the dispatcher synthesizes the up.
pub struct AcceleratorBackend {
    ctrl: std_mpsc::Sender<AccelOp>,
    watches: usize,
}

impl AcceleratorBackend {
    /// Upper bound on how long `watch` waits for the owner thread's reply.
    ///
    /// `watch` runs on the engine task and blocks it for the wait, so this
    /// must stay short: the owner thread polls its control channel every
    /// 20 ms, so a healthy thread answers well inside the bound and a
    /// wedged one costs at most this much per registration attempt.
    const WATCH_REPLY_TIMEOUT: Duration = Duration::from_millis(250);

    pub fn new(tx: mpsc::Sender<RawTransition>) -> Self {
        let (ctrl, ctrl_rx) = std_mpsc::channel::<AccelOp>();

        // Thread-spawn failure here would mean the process cannot create
        // threads at all; watch() would then time out and report false.
        let _ = std::thread::Builder::new()
            .name("hotkey-accel".into())
            .spawn(move || accelerator_thread(ctrl_rx, tx));

        Self { ctrl, watches: 0 }
    }
}

impl KeyObservation for AcceleratorBackend {
    fn watch(&mut self, key: NativeKey, modifiers: Option<u8>) -> bool {
        let (reply, reply_rx) = std_mpsc::channel();
        if self
            .ctrl
            .send(AccelOp::Watch {
                key,
                modifiers,
                reply,
            })
            .is_err()
        {
            return false;
        }
        let ok = reply_rx
            .recv_timeout(Self::WATCH_REPLY_TIMEOUT)
            .unwrap_or(false);
        if ok {
            self.watches += 1;
        }
        ok
    }

    fn unwatch(&mut self, vk: u32) {
        if self.ctrl.send(AccelOp::Unwatch { vk }).is_ok() && self.watches > 0 {
            self.watches -= 1;
        }
    }

    fn watch_count(&self) -> usize {
        self.watches
    }

    fn reports_release(&self) -> bool {
        false
    }
}

impl Drop for AcceleratorBackend {
    fn drop(&mut self) {
        let _ = self.ctrl.send(AccelOp::Shutdown);
    }
}

/// Owner-thread loop: service control ops, forward pressed events.
fn accelerator_thread(ctrl_rx: std_mpsc::Receiver<AccelOp>, tx: mpsc::Sender<RawTransition>) {
    let mut manager: Option<GlobalHotKeyManager> = None;
    // vk → registered hotkey, and hotkey id → vk for event lookup.
    let mut registered: HashMap<u32, HotKey> = HashMap::new();
    let mut ids: HashMap<u32, u32> = HashMap::new();

    loop {
        match ctrl_rx.recv_timeout(Duration::from_millis(20)) {
            Ok(AccelOp::Watch {
                key,
                modifiers,
                reply,
            }) => {
                let ok = accel_watch(&mut manager, &mut registered, &mut ids, key, modifiers);
                let _ = reply.send(ok);
            }
            Ok(AccelOp::Unwatch { vk }) => {
                if let (Some(m), Some(hotkey)) = (manager.as_ref(), registered.remove(&vk)) {
                    ids.remove(&hotkey.id());
                    if let Err(e) = m.unregister(hotkey) {
                        log::warn!("hotkey-accel: unregister failed: {e}");
                    }
                }
                if registered.is_empty() {
                    // Last binding gone — release the OS mechanism.
                    manager = None;
                }
            }
            Ok(AccelOp::Shutdown) | Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
            Err(std_mpsc::RecvTimeoutError::Timeout) => {}
        }

        while let Ok(event) = GlobalHotKeyEvent::receiver().try_recv() {
            if event.state() != HotKeyState::Pressed {
                continue;
            }
            if let Some(&vk) = ids.get(&event.id()) {
                let _ = tx.blocking_send(RawTransition {
                    vk,
                    transition: KeyTransition::Down,
                    has_modifiers: false,
                });
            }
        }
    }
}

fn accel_watch(
    manager: &mut Option<GlobalHotKeyManager>,
    registered: &mut HashMap<u32, HotKey>,
    ids: &mut HashMap<u32, u32>,
    key: NativeKey,
    modifiers: Option<u8>,
) -> bool {
    if manager.is_none() {
        match GlobalHotKeyManager::new() {
            Ok(m) => *manager = Some(m),
            Err(e) => {
                log::error!("hotkey-accel: manager creation failed: {e}");
                return false;
            }
        }
    }
    let Some(m) = manager.as_ref() else {
        return false;
    };

    // Stale-registration avoidance: fully unregister a previous identical
    // watch before re-registering.
    if let Some(old) = registered.remove(&key.vk) {
        ids.remove(&old.id());
        let _ = m.unregister(old);
    }

    let hotkey = HotKey::new(modifier_mask(modifiers), key.accel);
    match m.register(hotkey) {
        Ok(()) => {
            ids.insert(hotkey.id(), key.vk);
            registered.insert(key.vk, hotkey);
            true
        }
        Err(e) => {
            log::warn!("hotkey-accel: register failed for vk {:#x}: {e}", key.vk);
            false
        }
    }
}

/// Map the wire modifier mask (shift=1, control=2, alt=4) onto
/// `global-hotkey` modifiers.
fn modifier_mask(modifiers: Option<u8>) -> Option<Modifiers> {
    let mask = modifiers.unwrap_or(0);
    if mask == 0 {
        return None;
    }
    let mut out = Modifiers::empty();
    if mask & 0x01 != 0 {
        out |= Modifiers::SHIFT;
    }
    if mask & 0x02 != 0 {
        out |= Modifiers::CONTROL;
    }
    if mask & 0x04 != 0 {
        out |= Modifiers::ALT;
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
