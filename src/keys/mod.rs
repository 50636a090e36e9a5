//! Portable key identifiers and their native translations.
//!
//! The host registers hotkeys with portable key names (`"F2"`…`"F12"`,
//! `"Space"`, `"Enter"`, `"Escape"`, `"Tab"`).  [`parse_key`] turns a wire
//! name into a [`PortableKey`]; [`translate`] turns a [`PortableKey`] into
//! the three native representations the rest of the crate needs:
//!
//! * the Windows virtual-key number echoed back as `keyCode` in key events,
//! * the `rdev` key matched by the low-level filter strategy,
//! * the `global-hotkey` code registered by the accelerator strategy.
//!
//! Anything outside the table fails to parse; callers must treat that as a
//! registration failure rather than silently registering a default key.

use global_hotkey::hotkey::Code;

// ---------------------------------------------------------------------------
// PortableKey
// ---------------------------------------------------------------------------

/// The fixed set of keys a hotkey can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortableKey {
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Space,
    Enter,
    Escape,
    Tab,
}

// ---------------------------------------------------------------------------
// NativeKey
// ---------------------------------------------------------------------------

/// A portable key resolved to every native form the crate uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeKey {
    /// Windows virtual-key number — the `keyCode` reported on the event
    /// channel regardless of platform.
    pub vk: u32,
    /// The key as seen by the low-level `rdev` filter.
    pub observed: rdev::Key,
    /// The key as registered with the `global-hotkey` accelerator manager.
    pub accel: Code,
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

/// Parse a wire / config key name into a [`PortableKey`].
///
/// Returns `None` for unrecognised names so callers can report a
/// registration failure to the host.
///
/// # Examples
///
/// ```
/// use voicetype_overlay::keys::{parse_key, PortableKey};
///
/// assert_eq!(parse_key("F2"),     Some(PortableKey::F2));
/// assert_eq!(parse_key("Escape"), Some(PortableKey::Escape));
/// assert_eq!(parse_key("F1"),     None);
/// ```
pub fn parse_key(name: &str) -> Option<PortableKey> {
    match name {
        "F2" => Some(PortableKey::F2),
        "F3" => Some(PortableKey::F3),
        "F4" => Some(PortableKey::F4),
        "F5" => Some(PortableKey::F5),
        "F6" => Some(PortableKey::F6),
        "F7" => Some(PortableKey::F7),
        "F8" => Some(PortableKey::F8),
        "F9" => Some(PortableKey::F9),
        "F10" => Some(PortableKey::F10),
        "F11" => Some(PortableKey::F11),
        "F12" => Some(PortableKey::F12),
        "Space" => Some(PortableKey::Space),
        "Return" | "Enter" => Some(PortableKey::Enter),
        "Escape" | "Esc" => Some(PortableKey::Escape),
        "Tab" => Some(PortableKey::Tab),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// translate
// ---------------------------------------------------------------------------

/// Translate a [`PortableKey`] into its [`NativeKey`] forms.
///
/// Total over the [`PortableKey`] enum — the unsupported-key case lives in
/// [`parse_key`], which is the only way to obtain a `PortableKey` from the
/// outside world.
pub fn translate(key: PortableKey) -> NativeKey {
    match key {
        PortableKey::F2 => native(0x71, rdev::Key::F2, Code::F2),
        PortableKey::F3 => native(0x72, rdev::Key::F3, Code::F3),
        PortableKey::F4 => native(0x73, rdev::Key::F4, Code::F4),
        PortableKey::F5 => native(0x74, rdev::Key::F5, Code::F5),
        PortableKey::F6 => native(0x75, rdev::Key::F6, Code::F6),
        PortableKey::F7 => native(0x76, rdev::Key::F7, Code::F7),
        PortableKey::F8 => native(0x77, rdev::Key::F8, Code::F8),
        PortableKey::F9 => native(0x78, rdev::Key::F9, Code::F9),
        PortableKey::F10 => native(0x79, rdev::Key::F10, Code::F10),
        PortableKey::F11 => native(0x7A, rdev::Key::F11, Code::F11),
        PortableKey::F12 => native(0x7B, rdev::Key::F12, Code::F12),
        PortableKey::Space => native(0x20, rdev::Key::Space, Code::Space),
        PortableKey::Enter => native(0x0D, rdev::Key::Return, Code::Enter),
        PortableKey::Escape => native(0x1B, rdev::Key::Escape, Code::Escape),
        PortableKey::Tab => native(0x09, rdev::Key::Tab, Code::Tab),
    }
}

fn native(vk: u32, observed: rdev::Key, accel: Code) -> NativeKey {
    NativeKey {
        vk,
        observed,
        accel,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_function_keys() {
        assert_eq!(parse_key("F2"), Some(PortableKey::F2));
        assert_eq!(parse_key("F9"), Some(PortableKey::F9));
        assert_eq!(parse_key("F12"), Some(PortableKey::F12));
    }

    #[test]
    fn parse_named_keys() {
        assert_eq!(parse_key("Space"), Some(PortableKey::Space));
        assert_eq!(parse_key("Enter"), Some(PortableKey::Enter));
        assert_eq!(parse_key("Return"), Some(PortableKey::Enter));
        assert_eq!(parse_key("Escape"), Some(PortableKey::Escape));
        assert_eq!(parse_key("Esc"), Some(PortableKey::Escape));
        assert_eq!(parse_key("Tab"), Some(PortableKey::Tab));
    }

    #[test]
    fn parse_outside_table_returns_none() {
        // F1 is deliberately not bindable; only F2-F12 are in the table.
        assert_eq!(parse_key("F1"), None);
        assert_eq!(parse_key("F13"), None);
        assert_eq!(parse_key("A"), None);
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("Ctrl+V"), None);
    }

    #[test]
    fn translate_reports_windows_vk_numbers() {
        assert_eq!(translate(PortableKey::F2).vk, 0x71);
        assert_eq!(translate(PortableKey::F12).vk, 0x7B);
        assert_eq!(translate(PortableKey::Space).vk, 0x20);
        assert_eq!(translate(PortableKey::Enter).vk, 0x0D);
        assert_eq!(translate(PortableKey::Escape).vk, 0x1B);
        assert_eq!(translate(PortableKey::Tab).vk, 0x09);
    }

    #[test]
    fn translate_is_injective_over_vk() {
        let all = [
            PortableKey::F2,
            PortableKey::F3,
            PortableKey::F4,
            PortableKey::F5,
            PortableKey::F6,
            PortableKey::F7,
            PortableKey::F8,
            PortableKey::F9,
            PortableKey::F10,
            PortableKey::F11,
            PortableKey::F12,
            PortableKey::Space,
            PortableKey::Enter,
            PortableKey::Escape,
            PortableKey::Tab,
        ];
        let mut seen = std::collections::HashSet::new();
        for key in all {
            assert!(seen.insert(translate(key).vk), "duplicate vk for {key:?}");
        }
    }

    #[test]
    fn translate_matches_observed_keys() {
        assert_eq!(translate(PortableKey::F2).observed, rdev::Key::F2);
        assert_eq!(translate(PortableKey::Enter).observed, rdev::Key::Return);
        assert_eq!(translate(PortableKey::Space).observed, rdev::Key::Space);
    }
}
