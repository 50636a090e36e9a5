//! Engine task: command handling, key-event emission and host seams.
//!
//! The engine owns the hotkey dispatcher and the text injector and runs as
//! a single tokio task, select-looping over two channels: host commands
//! (each carrying a oneshot reply) and raw key transitions from the
//! observation backend.  Serializing both through one task means binding
//! state and the overlay view model are never mutated concurrently.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::hotkey::{HotkeyDispatcher, HotkeyPurpose, KeyEvent, KeyTransition, RawTransition};
use crate::inject::{ForegroundTarget, TextInjector};
use crate::keys::parse_key;
use crate::overlay::{OverlayState, SharedViewModel, UiContext};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A command from the host, tagged by method name.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method")]
pub enum Command {
    #[serde(rename = "showOverlay", rename_all = "camelCase")]
    ShowOverlay {
        state: String,
        #[serde(default)]
        duration: String,
        #[serde(default)]
        level: f64,
        #[serde(default)]
        status_label: Option<String>,
    },
    #[serde(rename = "updateOverlay", rename_all = "camelCase")]
    UpdateOverlay {
        state: String,
        #[serde(default)]
        duration: String,
        #[serde(default)]
        level: f64,
        #[serde(default)]
        status_label: Option<String>,
    },
    #[serde(rename = "hideOverlay")]
    HideOverlay,
    #[serde(rename = "showMainWindow")]
    ShowMainWindow,
    #[serde(rename = "insertText")]
    InsertText { text: String },
    #[serde(rename = "registerHotkey", rename_all = "camelCase")]
    RegisterHotkey {
        /// Portable key name, e.g. `"F2"`.
        key_code: String,
        #[serde(default)]
        modifiers: Option<u8>,
    },
    #[serde(rename = "unregisterHotkey")]
    UnregisterHotkey,
    #[serde(rename = "registerSecondaryHotkey", rename_all = "camelCase")]
    RegisterSecondaryHotkey {
        key_code: String,
        #[serde(default)]
        modifiers: Option<u8>,
    },
    #[serde(rename = "unregisterSecondaryHotkey")]
    UnregisterSecondaryHotkey,
}

/// Reply to a [`Command`].  `Ack` serializes as `null`, `Bool` as a bare
/// boolean, matching the host's expectations per method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommandOutcome {
    Ack,
    Bool(bool),
}

/// A key event pushed to the host, tagged like an inbound method call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "method")]
pub enum Event {
    #[serde(rename = "onGlobalKeyEvent", rename_all = "camelCase")]
    OnGlobalKeyEvent {
        /// Windows virtual-key number, as registered.
        key_code: u32,
        #[serde(rename = "type")]
        transition: KeyTransition,
        is_repeat: bool,
        has_modifiers: bool,
    },
}

impl From<KeyEvent> for Event {
    fn from(event: KeyEvent) -> Self {
        Event::OnGlobalKeyEvent {
            key_code: event.key_code,
            transition: event.transition,
            is_repeat: event.is_repeat,
            has_modifiers: event.has_modifiers,
        }
    }
}

/// A command paired with its reply channel.
pub struct CommandRequest {
    pub command: Command,
    pub reply: oneshot::Sender<CommandOutcome>,
}

// ---------------------------------------------------------------------------
// Host seams
// ---------------------------------------------------------------------------

/// Captures the currently focused window so an injection later can raise
/// it again.  The default implementation reports nothing focused; platform
/// integrations plug in here.
pub trait FocusTracker: Send {
    fn capture(&self) -> Option<Box<dyn ForegroundTarget>>;
}

/// The host's own main window, raised on `showMainWindow`.
pub trait HostWindow: Send {
    fn raise(&self);
}

/// Focus tracker that never captures a target.
pub struct NoopFocusTracker;

impl FocusTracker for NoopFocusTracker {
    fn capture(&self) -> Option<Box<dyn ForegroundTarget>> {
        None
    }
}

/// Host window that only logs the raise request.
pub struct NoopHostWindow;

impl HostWindow for NoopHostWindow {
    fn raise(&self) {
        log::info!("showMainWindow requested (no host window attached)");
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    dispatcher: HotkeyDispatcher,
    injector: TextInjector,
    vm: SharedViewModel,
    ui: UiContext,
    event_tx: mpsc::Sender<Event>,
    focus: Box<dyn FocusTracker>,
    host: Box<dyn HostWindow>,
    /// Window focused when the most recent hotkey went down; consumed by
    /// the next `insertText`.
    last_target: Option<Box<dyn ForegroundTarget>>,
}

impl Engine {
    pub fn new(
        dispatcher: HotkeyDispatcher,
        injector: TextInjector,
        vm: SharedViewModel,
        ui: UiContext,
        event_tx: mpsc::Sender<Event>,
        focus: Box<dyn FocusTracker>,
        host: Box<dyn HostWindow>,
    ) -> Self {
        Self {
            dispatcher,
            injector,
            vm,
            ui,
            event_tx,
            focus,
            host,
            last_target: None,
        }
    }

    /// Run until both channels close.
    pub async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<CommandRequest>,
        mut raw_rx: mpsc::Receiver<RawTransition>,
    ) {
        log::info!("engine started");
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(request) => {
                        let outcome = self.handle_command(request.command);
                        // The requester may have stopped waiting; fine.
                        let _ = request.reply.send(outcome);
                    }
                    None => break,
                },
                raw = raw_rx.recv() => match raw {
                    Some(raw) => self.handle_raw(raw),
                    None => break,
                },
            }
        }
        log::info!("engine stopped");
    }

    fn handle_command(&mut self, command: Command) -> CommandOutcome {
        match command {
            Command::ShowOverlay {
                state,
                duration,
                level,
                status_label,
            } => {
                let state = OverlayState::parse(&state);
                self.vm
                    .lock()
                    .unwrap()
                    .apply_show(state, duration, level, status_label);
                self.ui.request_repaint();
                CommandOutcome::Ack
            }
            Command::UpdateOverlay {
                state,
                duration,
                level,
                status_label,
            } => {
                let state = OverlayState::parse(&state);
                self.vm
                    .lock()
                    .unwrap()
                    .apply_update(state, duration, level, status_label);
                self.ui.request_repaint();
                CommandOutcome::Ack
            }
            Command::HideOverlay => {
                self.vm.lock().unwrap().apply_hide();
                self.ui.request_repaint();
                CommandOutcome::Ack
            }
            Command::ShowMainWindow => {
                self.host.raise();
                CommandOutcome::Ack
            }
            Command::InsertText { text } => {
                if text.is_empty() {
                    log::debug!("insertText with empty text, nothing to do");
                    return CommandOutcome::Ack;
                }
                self.injector.spawn(text, self.last_target.take());
                CommandOutcome::Ack
            }
            Command::RegisterHotkey {
                key_code,
                modifiers,
            } => CommandOutcome::Bool(self.register(HotkeyPurpose::Primary, &key_code, modifiers)),
            Command::UnregisterHotkey => {
                self.dispatcher.unregister(HotkeyPurpose::Primary);
                CommandOutcome::Ack
            }
            Command::RegisterSecondaryHotkey {
                key_code,
                modifiers,
            } => {
                CommandOutcome::Bool(self.register(HotkeyPurpose::Secondary, &key_code, modifiers))
            }
            Command::UnregisterSecondaryHotkey => {
                self.dispatcher.unregister(HotkeyPurpose::Secondary);
                CommandOutcome::Ack
            }
        }
    }

    fn register(&mut self, purpose: HotkeyPurpose, key_code: &str, modifiers: Option<u8>) -> bool {
        let Some(key) = parse_key(key_code) else {
            log::warn!("unsupported key name {key_code:?}");
            return false;
        };
        let registered = self.dispatcher.register(purpose, key, modifiers);
        if registered {
            log::info!("registered {purpose:?} hotkey {key_code}");
        }
        registered
    }

    fn handle_raw(&mut self, raw: RawTransition) {
        for event in self.dispatcher.on_raw(raw) {
            // The window focused at the initial press is the injection
            // target for whatever transcription follows.
            if event.transition == KeyTransition::Down && !event.is_repeat {
                if let Some(target) = self.focus.capture() {
                    self.last_target = Some(target);
                }
            }
            if let Err(err) = self.event_tx.try_send(event.into()) {
                log::warn!("dropping key event, channel unavailable: {err}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::KeyObservation;
    use crate::keys::NativeKey;
    use crate::overlay::new_shared_view_model;

    struct NullBackend {
        watched: Vec<u32>,
    }

    impl KeyObservation for NullBackend {
        fn watch(&mut self, key: NativeKey, _modifiers: Option<u8>) -> bool {
            self.watched.push(key.vk);
            true
        }

        fn unwatch(&mut self, vk: u32) {
            self.watched.retain(|&v| v != vk);
        }

        fn watch_count(&self) -> usize {
            self.watched.len()
        }

        fn reports_release(&self) -> bool {
            true
        }
    }

    fn test_engine() -> (Engine, mpsc::Receiver<Event>) {
        let (event_tx, event_rx) = mpsc::channel(16);
        let dispatcher = HotkeyDispatcher::new(Box::new(NullBackend {
            watched: Vec::new(),
        }));
        let engine = Engine::new(
            dispatcher,
            TextInjector::new(0, 0),
            new_shared_view_model(),
            UiContext::new(),
            event_tx,
            Box::new(NoopFocusTracker),
            Box::new(NoopHostWindow),
        );
        (engine, event_rx)
    }

    fn show(state: &str, duration: &str, level: f64) -> Command {
        Command::ShowOverlay {
            state: state.into(),
            duration: duration.into(),
            level,
            status_label: None,
        }
    }

    #[test]
    fn show_then_update_drives_view_model() {
        let (mut engine, _rx) = test_engine();

        assert_eq!(
            engine.handle_command(show("recording", "0:01", 0.5)),
            CommandOutcome::Ack
        );
        {
            let vm = engine.vm.lock().unwrap();
            assert_eq!(vm.state, OverlayState::Recording);
            assert!(vm.visible);
            assert_eq!(vm.duration_text, "0:01");
        }

        engine.handle_command(Command::UpdateOverlay {
            state: "transcribing".into(),
            duration: String::new(),
            level: 0.0,
            status_label: None,
        });
        let vm = engine.vm.lock().unwrap();
        assert_eq!(vm.state, OverlayState::Transcribing);
        assert!(vm.visible, "update must not change visibility");
    }

    #[test]
    fn hide_is_idempotent() {
        let (mut engine, _rx) = test_engine();
        engine.handle_command(show("recording", "0:01", 0.5));
        engine.handle_command(Command::HideOverlay);
        engine.handle_command(Command::HideOverlay);

        let vm = engine.vm.lock().unwrap();
        assert!(!vm.visible);
        assert_eq!(vm.state, OverlayState::Hidden);
    }

    #[test]
    fn register_unsupported_key_reports_false() {
        let (mut engine, _rx) = test_engine();

        let outcome = engine.handle_command(Command::RegisterHotkey {
            key_code: "F1".into(),
            modifiers: None,
        });
        assert_eq!(outcome, CommandOutcome::Bool(false));
        assert_eq!(engine.dispatcher.binding_count(), 0);
    }

    #[test]
    fn register_unregister_register_cycle() {
        let (mut engine, _rx) = test_engine();

        assert_eq!(
            engine.handle_command(Command::RegisterHotkey {
                key_code: "F2".into(),
                modifiers: None,
            }),
            CommandOutcome::Bool(true)
        );
        engine.handle_command(Command::UnregisterHotkey);
        assert_eq!(
            engine.handle_command(Command::RegisterHotkey {
                key_code: "F3".into(),
                modifiers: None,
            }),
            CommandOutcome::Bool(true)
        );
        assert_eq!(engine.dispatcher.binding_count(), 1);
    }

    #[test]
    fn empty_insert_text_is_acknowledged_without_work() {
        let (mut engine, _rx) = test_engine();
        assert_eq!(
            engine.handle_command(Command::InsertText {
                text: String::new()
            }),
            CommandOutcome::Ack
        );
    }

    #[test]
    fn key_events_reach_the_event_channel() {
        let (mut engine, mut rx) = test_engine();
        engine.handle_command(Command::RegisterHotkey {
            key_code: "F2".into(),
            modifiers: None,
        });

        engine.handle_raw(RawTransition {
            vk: 0x71,
            transition: KeyTransition::Down,
            has_modifiers: false,
        });
        let Event::OnGlobalKeyEvent {
            key_code,
            transition,
            is_repeat,
            ..
        } = rx.try_recv().expect("event");
        assert_eq!(key_code, 0x71);
        assert_eq!(transition, KeyTransition::Down);
        assert!(!is_repeat);
    }

    async fn roundtrip(cmd_tx: &mpsc::Sender<CommandRequest>, command: Command) -> CommandOutcome {
        let (reply, reply_rx) = oneshot::channel();
        cmd_tx
            .send(CommandRequest { command, reply })
            .await
            .expect("engine alive");
        reply_rx.await.expect("reply")
    }

    #[tokio::test]
    async fn engine_serves_commands_without_a_window() {
        // No egui context is ever attached, as when window creation failed:
        // overlay commands degrade to view-model writes and every command
        // still gets its reply.
        let (engine, _event_rx) = test_engine();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (raw_tx, raw_rx) = mpsc::channel(8);
        let task = tokio::spawn(engine.run(cmd_rx, raw_rx));

        assert_eq!(
            roundtrip(&cmd_tx, show("recording", "0:01", 0.5)).await,
            CommandOutcome::Ack
        );
        assert_eq!(
            roundtrip(
                &cmd_tx,
                Command::RegisterHotkey {
                    key_code: "F2".into(),
                    modifiers: None,
                }
            )
            .await,
            CommandOutcome::Bool(true)
        );
        assert_eq!(
            roundtrip(&cmd_tx, Command::HideOverlay).await,
            CommandOutcome::Ack
        );

        drop(cmd_tx);
        drop(raw_tx);
        task.await.expect("engine exits cleanly");
    }

    // ---- wire format ----

    #[test]
    fn commands_deserialize_from_host_json() {
        let cmd: Command = serde_json::from_str(
            r#"{"method":"showOverlay","state":"recording","duration":"0:05","level":0.4}"#,
        )
        .expect("showOverlay");
        assert!(matches!(cmd, Command::ShowOverlay { level, .. } if level == 0.4));

        let cmd: Command =
            serde_json::from_str(r#"{"method":"registerHotkey","keyCode":"F9"}"#).expect("register");
        let Command::RegisterHotkey {
            key_code,
            modifiers,
        } = cmd
        else {
            panic!("wrong variant");
        };
        assert_eq!(key_code, "F9");
        assert_eq!(modifiers, None);

        let cmd: Command = serde_json::from_str(r#"{"method":"hideOverlay"}"#).expect("hide");
        assert!(matches!(cmd, Command::HideOverlay));
    }

    #[test]
    fn events_serialize_with_method_tag() {
        let event = Event::OnGlobalKeyEvent {
            key_code: 0x71,
            transition: KeyTransition::Up,
            is_repeat: false,
            has_modifiers: true,
        };
        let json = serde_json::to_value(&event).expect("json");
        assert_eq!(json["method"], "onGlobalKeyEvent");
        assert_eq!(json["keyCode"], 113);
        assert_eq!(json["type"], "up");
        assert_eq!(json["hasModifiers"], true);
    }

    #[test]
    fn outcomes_serialize_bare() {
        assert_eq!(
            serde_json::to_string(&CommandOutcome::Ack).expect("json"),
            "null"
        );
        assert_eq!(
            serde_json::to_string(&CommandOutcome::Bool(true)).expect("json"),
            "true"
        );
    }
}
