//! The overlay window — an eframe app painting the status pill.
//!
//! The viewport is borderless, transparent, always-on-top, non-activating,
//! excluded from the taskbar and mouse-passthrough, so it behaves as a pure
//! status indicator: it never steals focus and clicks fall through to
//! whatever is beneath it.  egui composites each frame into an off-screen
//! alpha surface and presents it atomically, so the pill never flickers
//! while elements appear or disappear.
//!
//! Each frame the app copies the [`OverlayViewModel`] out under its lock and
//! then paints from the copy — no OS drawing happens while the lock shared
//! with the engine task is held.

use std::time::Instant;

use eframe::egui;

use crate::config::OverlayConfig;

use super::layout::{self, PillLayout, CORNER_RADIUS, PILL_HEIGHT, PILL_WIDTH};
use super::{OverlayState, OverlayViewModel, PulseAnimator, SharedViewModel, UiContext};

// ---------------------------------------------------------------------------
// Viewport options
// ---------------------------------------------------------------------------

/// Build the native options for the overlay viewport.
///
/// Starts hidden; the first `showOverlay` command makes it visible at its
/// anchored position.
pub fn native_options() -> eframe::NativeOptions {
    let vp = egui::ViewportBuilder::default()
        .with_decorations(false)
        .with_transparent(true)
        .with_always_on_top()
        .with_inner_size([PILL_WIDTH, PILL_HEIGHT])
        .with_resizable(false)
        .with_visible(false)
        .with_active(false)
        .with_taskbar(false)
        .with_mouse_passthrough(true);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// OverlayApp
// ---------------------------------------------------------------------------

/// eframe application owning the render side of the overlay.
pub struct OverlayApp {
    vm: SharedViewModel,
    config: OverlayConfig,
    pulse: PulseAnimator,
    /// State seen on the previous frame, to start/stop the pulse on
    /// Recording transitions.
    last_state: OverlayState,
    /// Visibility last applied to the viewport, to avoid resending the
    /// command every frame.
    applied_visible: Option<bool>,
    /// Monitor size seen on the previous frame; a change means the display
    /// or resolution changed and the pill must be re-anchored.
    last_monitor: Option<egui::Vec2>,
    last_tick: Instant,
}

/// Where the pill's top-left corner goes for a given monitor size: centered
/// horizontally, a fixed margin above the bottom edge.
///
/// `monitor_size` includes the taskbar/dock (egui exposes no work-area
/// query); the bottom margin keeps the pill clear of it.
fn anchored_position(monitor: egui::Vec2, bottom_margin: f32) -> egui::Pos2 {
    egui::pos2(
        (monitor.x - PILL_WIDTH) / 2.0,
        monitor.y - PILL_HEIGHT - bottom_margin,
    )
}

/// Did the monitor size change since the last frame?  `None` (unknown
/// monitor) never triggers a move.
fn monitor_changed(last: Option<egui::Vec2>, current: Option<egui::Vec2>) -> bool {
    current.is_some() && current != last
}

impl OverlayApp {
    /// Create the app and attach the live egui context to `ui` so the
    /// engine task can request repaints.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        vm: SharedViewModel,
        ui: UiContext,
        config: OverlayConfig,
    ) -> Self {
        ui.attach(cc.egui_ctx.clone());
        Self {
            vm,
            config,
            pulse: PulseAnimator::new(),
            last_state: OverlayState::Hidden,
            applied_visible: None,
            last_monitor: None,
            last_tick: Instant::now(),
        }
    }

    /// Center the pill horizontally on the primary display and anchor it a
    /// fixed margin above the bottom edge.
    fn reposition(&self, ctx: &egui::Context, monitor: egui::Vec2) {
        let pos = anchored_position(monitor, self.config.bottom_margin);
        ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(pos));
    }

    /// Keep the pulse running exactly while the state is Recording, and
    /// advance it at its fixed tick interval.
    fn drive_pulse(&mut self, state: OverlayState) {
        if state == OverlayState::Recording && self.last_state != OverlayState::Recording {
            self.pulse.start();
            self.last_tick = Instant::now();
        } else if state != OverlayState::Recording && self.pulse.is_running() {
            self.pulse.stop();
        }
        self.last_state = state;

        while self.pulse.is_running() && self.last_tick.elapsed() >= PulseAnimator::TICK {
            self.pulse.tick();
            self.last_tick += PulseAnimator::TICK;
        }
    }

    fn paint_pill(&self, ui: &mut egui::Ui, snapshot: &OverlayViewModel) {
        let pill: PillLayout = layout::compute_layout(snapshot.state, &snapshot.bar_heights);

        let painter = ui.painter();
        painter.rect_filled(pill.pill, CORNER_RADIUS as u8, layout::PILL_FILL);
        painter.rect_stroke(
            pill.pill,
            CORNER_RADIUS as u8,
            egui::Stroke::new(1.0, layout::PILL_BORDER),
            egui::StrokeKind::Inside,
        );

        // Status dot, alpha-modulated by the pulse while Recording.
        let mut dot = layout::dot_color(snapshot.state);
        if snapshot.state == OverlayState::Recording {
            dot = dot.gamma_multiply(self.pulse.alpha());
        }
        painter.circle_filled(pill.dot_center, pill.dot_radius, dot);

        if let Some(pos) = pill.duration_pos {
            painter.text(
                pos,
                egui::Align2::LEFT_CENTER,
                &snapshot.duration_text,
                egui::FontId::monospace(13.0),
                layout::DURATION_COLOR,
            );
        }

        for bar in &pill.bars {
            painter.rect_filled(*bar, 2u8, layout::BAR_COLOR);
        }

        let text = layout::label_text(snapshot.state, snapshot.status_label.as_deref());
        if !text.is_empty() {
            let mut job = egui::text::LayoutJob::simple_singleline(
                text.to_owned(),
                egui::FontId::proportional(12.0),
                layout::LABEL_COLOR,
            );
            job.wrap = egui::text::TextWrapping::truncate_at_width(pill.label_max_width);
            let galley = ui.fonts(|fonts| fonts.layout_job(job));
            let pos = egui::pos2(pill.label_pos.x, pill.label_pos.y - galley.size().y / 2.0);
            painter.galley(pos, galley, layout::LABEL_COLOR);
        }
    }
}

impl eframe::App for OverlayApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::TRANSPARENT.to_array()
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Copy the view model out under the lock; clear the one-shot
        // reposition flag while we hold it.
        let snapshot = {
            let mut vm = self.vm.lock().unwrap();
            let snapshot = vm.clone();
            vm.needs_reposition = false;
            snapshot
        };

        if self.applied_visible != Some(snapshot.visible) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Visible(snapshot.visible));
            self.applied_visible = Some(snapshot.visible);
        }

        // Re-anchor on show and whenever the display/resolution changes
        // while the pill is on screen.
        let monitor = ctx.input(|i| i.viewport().monitor_size);
        if snapshot.visible && (snapshot.needs_reposition || monitor_changed(self.last_monitor, monitor))
        {
            if let Some(monitor) = monitor {
                self.reposition(ctx, monitor);
            }
        }
        self.last_monitor = monitor;

        self.drive_pulse(snapshot.state);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                if snapshot.visible && snapshot.state != OverlayState::Hidden {
                    self.paint_pill(ui, &snapshot);
                }
            });

        if self.pulse.is_running() {
            ctx.request_repaint_after(PulseAnimator::TICK);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pill_is_centered_and_bottom_anchored() {
        let pos = anchored_position(egui::vec2(1920.0, 1080.0), 80.0);
        assert_eq!(pos.x, (1920.0 - PILL_WIDTH) / 2.0);
        assert_eq!(pos.y, 1080.0 - PILL_HEIGHT - 80.0);
    }

    #[test]
    fn anchor_follows_the_bottom_margin() {
        let near = anchored_position(egui::vec2(1920.0, 1080.0), 20.0);
        let far = anchored_position(egui::vec2(1920.0, 1080.0), 200.0);
        assert!(far.y < near.y);
    }

    #[test]
    fn resolution_change_triggers_a_move() {
        let old = Some(egui::vec2(1920.0, 1080.0));
        let new = Some(egui::vec2(2560.0, 1440.0));
        assert!(monitor_changed(None, new), "first reading anchors");
        assert!(monitor_changed(old, new));
        assert!(!monitor_changed(old, old), "same size stays put");
        assert!(!monitor_changed(old, None), "unknown monitor never moves");
    }
}
