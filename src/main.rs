#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::io::{BufRead, Write};

use anyhow::Result;
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

use voicetype_overlay::app::{
    Command, CommandOutcome, CommandRequest, Engine, Event, NoopFocusTracker, NoopHostWindow,
};
use voicetype_overlay::config::{AppConfig, ObservationStrategy};
use voicetype_overlay::hotkey::{
    AcceleratorBackend, HotkeyDispatcher, KeyObservation, LowLevelFilter, RawTransition,
};
use voicetype_overlay::inject::TextInjector;
use voicetype_overlay::overlay::{self, new_shared_view_model, OverlayApp, UiContext};

/// One line on stdin: a command envelope with an optional correlation id.
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<u64>,
    #[serde(flatten)]
    command: Command,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("failed to load config, using defaults: {e}");
        AppConfig::default()
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let (cmd_tx, cmd_rx) = mpsc::channel::<CommandRequest>(64);
    let (raw_tx, raw_rx) = mpsc::channel::<RawTransition>(64);
    let (event_tx, mut event_rx) = mpsc::channel::<Event>(64);

    let backend: Box<dyn KeyObservation> = match config.hotkey.strategy {
        ObservationStrategy::Filter => Box::new(LowLevelFilter::new(raw_tx)),
        ObservationStrategy::Accelerator => Box::new(AcceleratorBackend::new(raw_tx)),
    };
    log::info!("key observation strategy: {:?}", config.hotkey.strategy);

    let vm = new_shared_view_model();
    let ui = UiContext::new();

    let engine = Engine::new(
        HotkeyDispatcher::new(backend),
        TextInjector::new(config.inject.settle_ms, config.inject.restore_ms),
        vm.clone(),
        ui.clone(),
        event_tx,
        Box::new(NoopFocusTracker),
        Box::new(NoopHostWindow),
    );
    runtime.spawn(engine.run(cmd_rx, raw_rx));

    // Register the configured default hotkey; the host may replace it
    // later with registerHotkey.
    let default_key = config.hotkey.key.clone();
    let startup_tx = cmd_tx.clone();
    runtime.spawn(async move {
        let (reply, reply_rx) = oneshot::channel();
        let request = CommandRequest {
            command: Command::RegisterHotkey {
                key_code: default_key.clone(),
                modifiers: None,
            },
            reply,
        };
        if startup_tx.send(request).await.is_err() {
            return;
        }
        match reply_rx.await {
            Ok(CommandOutcome::Bool(true)) => {
                log::info!("default hotkey {default_key} registered")
            }
            _ => log::warn!("default hotkey {default_key} could not be registered"),
        }
    });

    // Event writer: one JSON line on stdout per key event.
    runtime.spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => {
                    let mut out = std::io::stdout().lock();
                    if writeln!(out, "{line}").and_then(|_| out.flush()).is_err() {
                        log::warn!("stdout closed, stopping event writer");
                        break;
                    }
                }
                Err(e) => log::error!("failed to serialize event: {e}"),
            }
        }
    });

    // Command reader: JSON lines on stdin, replies correlated by id.
    let bridge = spawn_stdin_bridge(cmd_tx);

    let overlay_config = config.overlay.clone();
    let window = eframe::run_native(
        "VoiceType Overlay",
        overlay::window::native_options(),
        Box::new(move |cc| Ok(Box::new(OverlayApp::new(cc, vm, ui, overlay_config)))),
    );

    // Window creation failing must not take the helper down: the UiContext
    // stays detached, overlay commands become no-ops, and hotkeys plus
    // insertText keep working. Block on the command reader instead of
    // returning.
    if let Err(e) = window {
        log::error!("overlay window unavailable, continuing without it: {e}");
        if let Some(bridge) = bridge {
            let _ = bridge.join();
        }
    }

    Ok(())
}

/// Read command envelopes from stdin on a plain OS thread (stdin reads
/// block) and bridge each into the engine, writing the reply back as
/// `{"id":…,"result":…}`.
fn spawn_stdin_bridge(cmd_tx: mpsc::Sender<CommandRequest>) -> Option<std::thread::JoinHandle<()>> {
    let spawned = std::thread::Builder::new()
        .name("cmd-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::warn!("stdin read failed: {e}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let envelope: Envelope = match serde_json::from_str(&line) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        log::warn!("ignoring malformed command line: {e}");
                        continue;
                    }
                };

                let (reply_tx, reply_rx) = oneshot::channel();
                let request = CommandRequest {
                    command: envelope.command,
                    reply: reply_tx,
                };
                if cmd_tx.blocking_send(request).is_err() {
                    log::warn!("engine gone, stopping command reader");
                    break;
                }
                match reply_rx.blocking_recv() {
                    Ok(outcome) => {
                        if let Some(id) = envelope.id {
                            match serde_json::to_string(&outcome) {
                                Ok(result) => println!("{{\"id\":{id},\"result\":{result}}}"),
                                Err(e) => log::error!("failed to serialize reply: {e}"),
                            }
                        }
                    }
                    Err(_) => {
                        log::warn!("engine dropped a reply, stopping command reader");
                        break;
                    }
                }
            }
        });
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::error!("failed to spawn command reader thread: {e}");
            None
        }
    }
}
