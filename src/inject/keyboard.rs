//! Paste-chord synthesis backed by the `enigo` crate.
//!
//! The chord is emitted as low-level input events, not as messages to a
//! specific window, so it lands in whichever window currently has focus:
//!
//! | Platform | Chord |
//! |----------|-------|
//! | macOS    | ⌘ down, V down, V up, ⌘ up |
//! | Windows / Linux | Ctrl down, V down, V up, Ctrl up |

use enigo::{Direction, Enigo, Key, Keyboard, Settings};

use super::{InjectError, PastePort};

// ---------------------------------------------------------------------------
// Chord definition
// ---------------------------------------------------------------------------

/// The paste chord as an ordered sequence of key transitions.
///
/// Kept as data so the emission order is testable without an OS backend.
pub fn paste_chord_steps() -> [(Key, Direction); 4] {
    #[cfg(target_os = "macos")]
    let modifier = Key::Meta;
    #[cfg(not(target_os = "macos"))]
    let modifier = Key::Control;

    [
        (modifier, Direction::Press),
        (Key::Unicode('v'), Direction::Press),
        (Key::Unicode('v'), Direction::Release),
        (modifier, Direction::Release),
    ]
}

// ---------------------------------------------------------------------------
// EnigoPaste
// ---------------------------------------------------------------------------

/// Production [`PastePort`] implementation.
///
/// A new [`Enigo`] instance is created per chord because `Enigo` is not
/// `Send` and the handle is cheap to construct.
pub struct EnigoPaste;

impl PastePort for EnigoPaste {
    fn send_paste_chord(&mut self) -> Result<(), InjectError> {
        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| InjectError::KeySimulation(e.to_string()))?;

        for (key, direction) in paste_chord_steps() {
            enigo
                .key(key, direction)
                .map_err(|e| InjectError::KeySimulation(e.to_string()))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_os = "macos"))]
    fn chord_order_is_ctrl_down_v_down_v_up_ctrl_up() {
        let steps = paste_chord_steps();
        assert_eq!(steps[0], (Key::Control, Direction::Press));
        assert_eq!(steps[1], (Key::Unicode('v'), Direction::Press));
        assert_eq!(steps[2], (Key::Unicode('v'), Direction::Release));
        assert_eq!(steps[3], (Key::Control, Direction::Release));
    }

    #[test]
    #[cfg(target_os = "macos")]
    fn chord_order_is_meta_down_v_down_v_up_meta_up() {
        let steps = paste_chord_steps();
        assert_eq!(steps[0], (Key::Meta, Direction::Press));
        assert_eq!(steps[1], (Key::Unicode('v'), Direction::Press));
        assert_eq!(steps[2], (Key::Unicode('v'), Direction::Release));
        assert_eq!(steps[3], (Key::Meta, Direction::Release));
    }

    #[test]
    fn chord_presses_and_releases_are_balanced() {
        let steps = paste_chord_steps();
        let presses = steps
            .iter()
            .filter(|(_, d)| *d == Direction::Press)
            .count();
        let releases = steps
            .iter()
            .filter(|(_, d)| *d == Direction::Release)
            .count();
        assert_eq!(presses, 2);
        assert_eq!(releases, 2);
        // Last transition releases the first pressed key.
        assert_eq!(steps[0].0, steps[3].0);
    }
}
