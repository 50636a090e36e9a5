//! Configuration management: settings structs and platform paths.

mod paths;
mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, HotkeyConfig, InjectConfig, ObservationStrategy, OverlayConfig,
};
