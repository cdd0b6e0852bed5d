// OS master volume
// The board's volume knob drives the system output level, not the decoded samples

#[cfg(windows)]
mod windows_volume;

#[cfg(windows)]
pub use windows_volume::*;

/// Sets the system output level
pub trait VolumeControl {
    /// `percent` is already clamped to 0..=100
    fn set_level(&self, percent: u8) -> Result<(), String>;
}

// ALSA mixer for non-Windows platforms
#[cfg(not(windows))]
mod mixer {
    use std::process::Command;

    use super::VolumeControl;

    const CONTROL: &str = "Master";

    pub struct SystemVolume;

    impl SystemVolume {
        pub fn new() -> Result<Self, String> {
            let status = Command::new("amixer")
                .args(["-q", "sget", CONTROL])
                .status()
                .map_err(|e| format!("Failed to run amixer: {}", e))?;
            if !status.success() {
                return Err(format!("amixer has no '{}' control", CONTROL));
            }
            Ok(Self)
        }
    }

    impl VolumeControl for SystemVolume {
        fn set_level(&self, percent: u8) -> Result<(), String> {
            let status = Command::new("amixer")
                .args(["-q", "sset", CONTROL, &format!("{}%", percent.min(100))])
                .status()
                .map_err(|e| format!("Failed to run amixer: {}", e))?;
            if status.success() {
                Ok(())
            } else {
                Err(format!("amixer exited with {}", status))
            }
        }
    }
}

#[cfg(not(windows))]
pub use mixer::*;

/// Open the system volume control; `None` (logged) when unavailable
pub fn open_system_volume() -> Option<Box<dyn VolumeControl>> {
    match SystemVolume::new() {
        Ok(volume) => {
            tracing::info!("volume control initialized");
            Some(Box::new(volume))
        }
        Err(e) => {
            tracing::warn!("volume control unavailable, volume commands will be ignored: {}", e);
            None
        }
    }
}

/// Records every level it is given
#[cfg(test)]
pub(crate) struct RecordingVolume(pub std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

#[cfg(test)]
impl VolumeControl for RecordingVolume {
    fn set_level(&self, percent: u8) -> Result<(), String> {
        self.0.lock().push(percent);
        Ok(())
    }
}
