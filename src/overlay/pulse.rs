//! Breathing-alpha animation for the recording status dot.
//!
//! A triangle wave between an opacity floor and ceiling, advanced at ~20 Hz
//! by the render loop ([`super::window::OverlayApp`]).  The animator never
//! owns a timer or thread of its own; the render loop calls [`PulseAnimator::tick`]
//! at [`PulseAnimator::TICK`] intervals while Recording is active, so the
//! animation runs on the UI thread only.

use std::time::Duration;

/// Dimmest the dot gets.
const ALPHA_FLOOR: f32 = 0.4;
/// Brightest the dot gets (also the resting value while stopped).
const ALPHA_CEILING: f32 = 1.0;
/// Alpha change per tick.
const ALPHA_STEP: f32 = 0.05;

// ---------------------------------------------------------------------------
// PulseAnimator
// ---------------------------------------------------------------------------

/// Triangle-wave dot-alpha animator.
#[derive(Debug, Clone)]
pub struct PulseAnimator {
    alpha: f32,
    fading_out: bool,
    running: bool,
}

impl Default for PulseAnimator {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseAnimator {
    /// Interval between ticks (~20 Hz).
    pub const TICK: Duration = Duration::from_millis(50);

    pub fn new() -> Self {
        Self {
            alpha: ALPHA_CEILING,
            fading_out: false,
            running: false,
        }
    }

    /// Start (or restart) the wave from full opacity, descending.
    /// Idempotent: calling while running restarts the wave.
    pub fn start(&mut self) {
        self.alpha = ALPHA_CEILING;
        self.fading_out = true;
        self.running = true;
    }

    /// Stop the wave and reset alpha to full opacity so a subsequent static
    /// paint is never dimmed.
    pub fn stop(&mut self) {
        self.running = false;
        self.fading_out = false;
        self.alpha = ALPHA_CEILING;
    }

    /// Advance one tick.  Does nothing while stopped.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        if self.fading_out {
            self.alpha -= ALPHA_STEP;
            if self.alpha <= ALPHA_FLOOR {
                self.alpha = ALPHA_FLOOR;
                self.fading_out = false;
            }
        } else {
            self.alpha += ALPHA_STEP;
            if self.alpha >= ALPHA_CEILING {
                self.alpha = ALPHA_CEILING;
                self.fading_out = true;
            }
        }
    }

    /// Current dot alpha in `[0.4, 1.0]`.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
