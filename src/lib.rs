//! Global hotkey capture and status overlay engine.
//!
//! Watches system-wide hotkeys, renders a borderless always-on-top status
//! pill near the bottom of the screen, and injects transcribed text into
//! whatever window was focused when the hotkey went down.  A host process
//! drives it over a JSON-lines command channel on stdin and receives key
//! events on stdout.
//!
//! # Module map
//!
//! * [`keys`] — portable key names and native translations.
//! * [`hotkey`] — dispatcher plus the two OS observation strategies.
//! * [`overlay`] — overlay state machine, view model and egui window.
//! * [`inject`] — clipboard-mediated text injection.
//! * [`app`] — the engine task and the command/event wire types.
//! * [`config`] — TOML settings and platform paths.

pub mod app;
pub mod config;
pub mod hotkey;
pub mod inject;
pub mod keys;
pub mod overlay;
