// Settings module
// Bridge configuration loaded from a JSON file

pub mod settings;

pub use settings::{BridgeSettings, DisplaySettings, LibrarySettings, SerialSettings, TimingSettings};
