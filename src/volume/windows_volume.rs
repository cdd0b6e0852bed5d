// Windows master volume using the Core Audio endpoint API via windows-rs

use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
use windows::Win32::Media::Audio::{eMultimedia, eRender, IMMDeviceEnumerator, MMDeviceEnumerator};
use windows::Win32::System::Com::{CoCreateInstance, CoInitializeEx, CLSCTX_ALL, COINIT_MULTITHREADED};

use super::VolumeControl;

/// Master volume of the default render endpoint.
/// COM objects stay on the thread that created them.
pub struct SystemVolume {
    endpoint: IAudioEndpointVolume,
    min_db: f32,
    max_db: f32,
}

impl SystemVolume {
    pub fn new() -> Result<Self, String> {
        unsafe {
            CoInitializeEx(None, COINIT_MULTITHREADED)
                .ok()
                .map_err(|e| format!("Failed to initialize COM: {}", e))?;

            let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                .map_err(|e| format!("Failed to create device enumerator: {}", e))?;

            let device = enumerator
                .GetDefaultAudioEndpoint(eRender, eMultimedia)
                .map_err(|e| format!("Failed to get default speakers: {}", e))?;

            let endpoint: IAudioEndpointVolume = device
                .Activate(CLSCTX_ALL, None)
                .map_err(|e| format!("Failed to activate endpoint volume: {}", e))?;

            let (mut min_db, mut max_db, mut step_db) = (0.0f32, 0.0f32, 0.0f32);
            endpoint
                .GetVolumeRange(&mut min_db, &mut max_db, &mut step_db)
                .map_err(|e| format!("Failed to read volume range: {}", e))?;

            Ok(Self { endpoint, min_db, max_db })
        }
    }
}

impl VolumeControl for SystemVolume {
    fn set_level(&self, percent: u8) -> Result<(), String> {
        let level_db = level_to_decibels(percent, self.min_db, self.max_db);
        unsafe {
            self.endpoint
                .SetMasterVolumeLevel(level_db, std::ptr::null())
                .map_err(|e| format!("Failed to set master volume: {}", e))
        }
    }
}

/// Linear position of `percent` within the endpoint's dB range
fn level_to_decibels(percent: u8, min_db: f32, max_db: f32) -> f32 {
    min_db + (max_db - min_db) * f32::from(percent.min(100)) / 100.0
}
