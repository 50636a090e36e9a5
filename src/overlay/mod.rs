//! Status overlay — state machine, shared view model and level-bar shaping.
//!
//! [`OverlayState`] drives which pill elements render and which colors are
//! used.  State transitions come exclusively from inbound `show` / `update` /
//! `hide` commands; the pulse animation modulates dot opacity but never
//! changes state.
//!
//! [`OverlayViewModel`] is the single consolidated state object shared
//! between the engine task (writer) and the egui render loop (reader).  It
//! lives behind one `Arc<Mutex<…>>` ([`SharedViewModel`]); both sides hold
//! the lock only long enough to copy fields in or out — no OS / drawing
//! calls are ever made while it is held.

pub mod layout;
pub mod pulse;
pub mod window;

use std::sync::{Arc, Mutex};

pub use pulse::PulseAnimator;
pub use window::OverlayApp;

/// Number of level-meter bars in the pill.
pub const BAR_COUNT: usize = 6;

// ---------------------------------------------------------------------------
// OverlayState
// ---------------------------------------------------------------------------

/// States of the status overlay.
///
/// ```text
/// Hidden → Starting → Recording → Transcribing → Enhancing → Hidden
///                                      └───────▶ Failed ───▶ Hidden
/// ```
///
/// Every transition is driven by a command from the host; the engine never
/// advances the state on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    /// Not shown; the window is invisible.
    Hidden,
    /// Microphone is spinning up.
    Starting,
    /// Audio is being captured — duration text and level bars are visible
    /// and the status dot pulses.
    Recording,
    /// Speech-to-text is running.
    Transcribing,
    /// Text enhancement is running.
    Enhancing,
    /// Transcription failed.
    Failed,
}

impl OverlayState {
    /// Parse a wire state string.
    ///
    /// Unknown strings map to `Hidden`, mirroring how the host treats an
    /// unparseable state as "nothing to show".
    pub fn parse(state: &str) -> Self {
        match state {
            "starting" => OverlayState::Starting,
            "recording" => OverlayState::Recording,
            "transcribing" => OverlayState::Transcribing,
            "enhancing" => OverlayState::Enhancing,
            "failed" | "transcribe_failed" => OverlayState::Failed,
            _ => OverlayState::Hidden,
        }
    }

    /// Default status label shown when the host supplies no override.
    pub fn default_label(&self) -> &'static str {
        match self {
            OverlayState::Hidden => "",
            OverlayState::Starting => "Starting microphone…",
            OverlayState::Recording => "Recording",
            OverlayState::Transcribing => "Transcribing…",
            OverlayState::Enhancing => "Enhancing…",
            OverlayState::Failed => "Transcription failed",
        }
    }

    /// Recording is the only state with duration text and live level bars.
    pub fn shows_recording_widgets(&self) -> bool {
        matches!(self, OverlayState::Recording)
    }
}

// ---------------------------------------------------------------------------
// Level-bar shaping
// ---------------------------------------------------------------------------

/// Shape a single input level into per-bar heights.
///
/// Bars nearer the pill center respond more strongly than edge bars:
/// `shaped(i) = level * (0.6 + 0.4 * (1 - |i/(N-1) - 0.5| * 2))`.
///
/// The level is clamped to `[0, 1]` before shaping, so out-of-range input
/// can never push a bar outside `[0, 1]`.
pub fn shape_level_bars(level: f64) -> [f32; BAR_COUNT] {
    let clamped = level.clamp(0.0, 1.0);
    let mut bars = [0.0f32; BAR_COUNT];
    for (i, bar) in bars.iter_mut().enumerate() {
        let phase = i as f64 / (BAR_COUNT - 1) as f64;
        *bar = (clamped * (0.6 + 0.4 * (1.0 - (phase - 0.5).abs() * 2.0))) as f32;
    }
    bars
}

// ---------------------------------------------------------------------------
// OverlayViewModel
// ---------------------------------------------------------------------------

/// Everything the render loop needs to draw one frame of the pill.
///
/// Written by the engine on `show` / `update` / `hide`; read (copied out)
/// by [`OverlayApp`] each frame.
#[derive(Debug, Clone)]
pub struct OverlayViewModel {
    /// Current overlay state.
    pub state: OverlayState,
    /// Pre-formatted duration text (e.g. `"00:05"`); shown while Recording.
    pub duration_text: String,
    /// Last raw input level, clamped on use.
    pub level: f64,
    /// Host-supplied status label override; `None` uses the state default.
    pub status_label: Option<String>,
    /// Shaped bar heights; recomputed on update while Recording, frozen
    /// otherwise.
    pub bar_heights: [f32; BAR_COUNT],
    /// Whether the window should be on screen.
    pub visible: bool,
    /// Set by the engine on `show`; the render loop repositions the window
    /// once and clears it.
    pub needs_reposition: bool,
}

impl Default for OverlayViewModel {
    fn default() -> Self {
        Self {
            state: OverlayState::Hidden,
            duration_text: String::new(),
            level: 0.0,
            status_label: None,
            bar_heights: [0.0; BAR_COUNT],
            visible: false,
            needs_reposition: false,
        }
    }
}

impl OverlayViewModel {
    /// Apply a `show` command: overwrite all fields and make the window
    /// visible at its anchored position.
    pub fn apply_show(
        &mut self,
        state: OverlayState,
        duration: String,
        level: f64,
        status_label: Option<String>,
    ) {
        self.apply_update(state, duration, level, status_label);
        self.visible = true;
        self.needs_reposition = true;
    }

    /// Apply an `update` command: overwrite the fields without touching
    /// visibility or position.
    pub fn apply_update(
        &mut self,
        state: OverlayState,
        duration: String,
        level: f64,
        status_label: Option<String>,
    ) {
        self.state = state;
        self.duration_text = duration;
        self.level = level;
        self.status_label = status_label;
        if state.shows_recording_widgets() {
            self.bar_heights = shape_level_bars(level);
        }
    }

    /// Apply a `hide` command.  Idempotent — hiding an already-hidden
    /// overlay changes nothing.
    pub fn apply_hide(&mut self) {
        self.state = OverlayState::Hidden;
        self.visible = false;
    }
}

/// Thread-safe handle to the view model.  Cheap to clone.
pub type SharedViewModel = Arc<Mutex<OverlayViewModel>>;

/// Construct a fresh hidden [`SharedViewModel`].
pub fn new_shared_view_model() -> SharedViewModel {
    Arc::new(Mutex::new(OverlayViewModel::default()))
}

// ---------------------------------------------------------------------------
// UiContext
// ---------------------------------------------------------------------------

/// Late-bound handle to the egui context.
///
/// The engine is spawned before `eframe::run_native` creates the window, so
/// the context is attached by [`OverlayApp`] during creation.  If window
/// creation fails the handle stays empty and every repaint request becomes
/// a no-op — the degraded mode required when the overlay cannot be created.
#[derive(Clone, Default)]
pub struct UiContext {
    ctx: Arc<Mutex<Option<egui::Context>>>,
}

impl UiContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the live egui context.  Called once from the app constructor.
    pub fn attach(&self, ctx: egui::Context) {
        *self.ctx.lock().unwrap() = Some(ctx);
    }

    /// Whether a window exists to paint into.
    pub fn is_attached(&self) -> bool {
        self.ctx.lock().unwrap().is_some()
    }

    /// Ask the render loop for a repaint pass.  No-op while detached.
    pub fn request_repaint(&self) {
        if let Some(ctx) = self.ctx.lock().unwrap().as_ref() {
            ctx.request_repaint();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- OverlayState::parse ---

    #[test]
    fn parse_known_states() {
        assert_eq!(OverlayState::parse("starting"), OverlayState::Starting);
        assert_eq!(OverlayState::parse("recording"), OverlayState::Recording);
        assert_eq!(
            OverlayState::parse("transcribing"),
            OverlayState::Transcribing
        );
        assert_eq!(OverlayState::parse("enhancing"), OverlayState::Enhancing);
        assert_eq!(OverlayState::parse("failed"), OverlayState::Failed);
        assert_eq!(
            OverlayState::parse("transcribe_failed"),
            OverlayState::Failed
        );
    }

    #[test]
    fn parse_unknown_state_is_hidden() {
        assert_eq!(OverlayState::parse(""), OverlayState::Hidden);
        assert_eq!(OverlayState::parse("bogus"), OverlayState::Hidden);
    }

    #[test]
    fn only_recording_shows_recording_widgets() {
        assert!(OverlayState::Recording.shows_recording_widgets());
        assert!(!OverlayState::Starting.shows_recording_widgets());
        assert!(!OverlayState::Transcribing.shows_recording_widgets());
        assert!(!OverlayState::Enhancing.shows_recording_widgets());
        assert!(!OverlayState::Failed.shows_recording_widgets());
        assert!(!OverlayState::Hidden.shows_recording_widgets());
    }

    // ---- shape_level_bars ---

    #[test]
    fn bars_clamped_for_out_of_range_levels() {
        for level in [-1.0, -0.01, 1.01, 5.0, f64::INFINITY, f64::NEG_INFINITY] {
            let bars = shape_level_bars(level);
            for &bar in &bars {
                assert!((0.0..=1.0).contains(&bar), "level {level} bar {bar}");
            }
        }
    }

    #[test]
    fn center_bars_respond_more_than_edges() {
        let bars = shape_level_bars(0.8);
        // Symmetric shaping: edges weakest, center pair strongest.
        assert!(bars[0] < bars[2]);
        assert!(bars[5] < bars[3]);
        assert!((bars[0] - bars[5]).abs() < 1e-6);
        assert!((bars[2] - bars[3]).abs() < 1e-6);
    }

    #[test]
    fn edge_bar_matches_shaping_formula() {
        let bars = shape_level_bars(1.0);
        // phase 0 → weight 0.6, center phases 0.4/0.6 → weight 0.92.
        assert!((bars[0] - 0.6).abs() < 1e-6);
        assert!((bars[2] - 0.92).abs() < 1e-4);
    }

    #[test]
    fn zero_level_gives_flat_bars() {
        assert_eq!(shape_level_bars(0.0), [0.0; BAR_COUNT]);
    }

    // ---- OverlayViewModel ---

    #[test]
    fn show_makes_visible_and_requests_reposition() {
        let mut vm = OverlayViewModel::default();
        vm.apply_show(OverlayState::Recording, "00:05".into(), 0.8, None);
        assert!(vm.visible);
        assert!(vm.needs_reposition);
        assert_eq!(vm.state, OverlayState::Recording);
        assert_eq!(vm.duration_text, "00:05");
    }

    #[test]
    fn update_recomputes_bars_only_while_recording() {
        let mut vm = OverlayViewModel::default();
        vm.apply_show(OverlayState::Recording, "00:05".into(), 0.8, None);
        let recording_bars = vm.bar_heights;
        assert!(recording_bars.iter().any(|&b| b > 0.0));

        // Leaving Recording freezes the bars even though level changes.
        vm.apply_update(OverlayState::Transcribing, "00:05".into(), 0.1, None);
        assert_eq!(vm.bar_heights, recording_bars);

        vm.apply_update(OverlayState::Recording, "00:06".into(), 0.2, None);
        assert_ne!(vm.bar_heights, recording_bars);
    }

    #[test]
    fn hide_is_idempotent() {
        let mut vm = OverlayViewModel::default();
        vm.apply_hide();
        vm.apply_hide();
        assert_eq!(vm.state, OverlayState::Hidden);
        assert!(!vm.visible);
    }

    #[test]
    fn status_label_override_round_trips() {
        let mut vm = OverlayViewModel::default();
        vm.apply_show(
            OverlayState::Transcribing,
            String::new(),
            0.0,
            Some("Almost there".into()),
        );
        assert_eq!(vm.status_label.as_deref(), Some("Almost there"));
        vm.apply_update(OverlayState::Transcribing, String::new(), 0.0, None);
        assert!(vm.status_label.is_none());
    }

    // ---- UiContext ---

    #[test]
    fn detached_ui_context_is_a_noop() {
        let ui = UiContext::new();
        assert!(!ui.is_attached());
        ui.request_repaint(); // must not panic
    }
}
