//! Pure pill geometry and palette.
//!
//! Computes where every element of the status pill goes for a given state
//! so the paint pass in [`super::window`] is a straight sequence of painter
//! calls.  Keeping this free of any draw calls makes the per-state
//! visibility rules (duration and bars appear only while Recording) and the
//! label overflow budget unit-testable.

use egui::{pos2, Color32, Pos2, Rect};

use super::{OverlayState, BAR_COUNT};

/// Pill dimensions.
pub const PILL_WIDTH: f32 = 280.0;
pub const PILL_HEIGHT: f32 = 44.0;
pub const CORNER_RADIUS: f32 = 22.0;

/// Translucent dark pill fill.
pub const PILL_FILL: Color32 = Color32::from_rgba_premultiplied(22, 22, 33, 220);
/// Faint 1 px border.
pub const PILL_BORDER: Color32 = Color32::from_rgba_premultiplied(40, 40, 40, 40);
/// Duration text color.
pub const DURATION_COLOR: Color32 = Color32::WHITE;
/// Level-bar fill.
pub const BAR_COLOR: Color32 = Color32::from_rgba_premultiplied(200, 200, 200, 200);
/// Status label color (dimmer than the duration).
pub const LABEL_COLOR: Color32 = Color32::from_rgba_premultiplied(150, 150, 150, 150);

const DOT_SIZE: f32 = 10.0;
const DOT_X: f32 = 16.0;
const DURATION_ADVANCE: f32 = 52.0;
const BAR_WIDTH: f32 = 4.0;
const BAR_GAP: f32 = 3.0;
const BAR_MIN_HEIGHT: f32 = 4.0;
const BAR_MAX_HEIGHT: f32 = 18.0;
const ELEMENT_GAP: f32 = 8.0;
const RIGHT_PADDING: f32 = 12.0;

// ---------------------------------------------------------------------------
// Colors and labels
// ---------------------------------------------------------------------------

/// Status dot color — a pure function of the overlay state.
pub fn dot_color(state: OverlayState) -> Color32 {
    match state {
        OverlayState::Starting => Color32::from_rgb(255, 204, 0), // amber
        OverlayState::Recording => Color32::from_rgb(255, 59, 48), // red
        OverlayState::Transcribing => Color32::from_rgb(107, 99, 255), // violet
        OverlayState::Enhancing => Color32::from_rgb(79, 199, 158), // green
        OverlayState::Failed => Color32::from_rgb(255, 59, 48),   // red
        OverlayState::Hidden => Color32::TRANSPARENT,
    }
}

/// The label to draw: caller override, or the state default.
pub fn label_text<'a>(state: OverlayState, status_label: Option<&'a str>) -> &'a str {
    status_label.unwrap_or_else(|| state.default_label())
}

// ---------------------------------------------------------------------------
// PillLayout
// ---------------------------------------------------------------------------

/// Computed element placement for one paint pass, in pill-local
/// coordinates (origin at the pill's top-left corner).
#[derive(Debug, Clone)]
pub struct PillLayout {
    /// The whole pill rect.
    pub pill: Rect,
    pub dot_center: Pos2,
    pub dot_radius: f32,
    /// Left-center anchor of the duration text; `None` unless Recording.
    pub duration_pos: Option<Pos2>,
    /// Level-bar rects, left-aligned after the duration text; empty unless
    /// Recording.
    pub bars: Vec<Rect>,
    /// Left-center anchor of the status label.
    pub label_pos: Pos2,
    /// Width budget for the label; text wider than this is elided.
    pub label_max_width: f32,
}

/// Lay the pill out for `state` with the given (already shaped) bar heights.
pub fn compute_layout(state: OverlayState, bar_heights: &[f32; BAR_COUNT]) -> PillLayout {
    let pill = Rect::from_min_size(pos2(0.0, 0.0), egui::vec2(PILL_WIDTH, PILL_HEIGHT));
    let center_y = PILL_HEIGHT / 2.0;

    let dot_center = pos2(DOT_X + DOT_SIZE / 2.0, center_y);
    let mut cursor_x = DOT_X + DOT_SIZE + ELEMENT_GAP;

    let recording = state.shows_recording_widgets();

    let duration_pos = if recording {
        let pos = pos2(cursor_x, center_y);
        cursor_x += DURATION_ADVANCE;
        Some(pos)
    } else {
        None
    };

    let bars = if recording {
        let start_x = cursor_x + 4.0;
        let rects: Vec<Rect> = bar_heights
            .iter()
            .enumerate()
            .map(|(i, &h)| {
                let height = BAR_MIN_HEIGHT + (BAR_MAX_HEIGHT - BAR_MIN_HEIGHT) * h.clamp(0.0, 1.0);
                let x = start_x + i as f32 * (BAR_WIDTH + BAR_GAP);
                Rect::from_min_size(
                    pos2(x, center_y - height / 2.0),
                    egui::vec2(BAR_WIDTH, height),
                )
            })
            .collect();
        cursor_x = start_x + BAR_COUNT as f32 * (BAR_WIDTH + BAR_GAP) + ELEMENT_GAP;
        rects
    } else {
        Vec::new()
    };

    let label_pos = pos2(cursor_x, center_y);
    let label_max_width = (PILL_WIDTH - RIGHT_PADDING - cursor_x).max(0.0);

    PillLayout {
        pill,
        dot_center,
        dot_radius: DOT_SIZE / 2.0,
        duration_pos,
        bars,
        label_pos,
        label_max_width,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
