// Karaoke bridge - plays songs on command from the controller board
// and streams the matching lyrics back to its display
pub mod audio;
pub mod display;
pub mod library;
pub mod playback;
pub mod protocol;
pub mod settings;
pub mod transport;
pub mod volume;

use anyhow::Context;
use std::sync::Arc;

use audio::DeviceBackend;
use library::Library;
use playback::PlaybackController;
use protocol::CommandIngest;
use settings::BridgeSettings;

/// Run the bridge until the serial link closes
pub fn run(settings: BridgeSettings) -> anyhow::Result<()> {
    let library = Library::scan(&settings.library).context("Failed to load song library")?;
    if library.is_empty() {
        tracing::warn!(dir = %settings.library.song_dir.display(), "no songs found");
    }

    let (reader, writer) = transport::open_serial(&settings.serial)
        .with_context(|| format!("Failed to open serial port {}", settings.serial.port))?;

    // Created on this thread, which also runs the controller
    let volume = volume::open_system_volume();

    let controller = PlaybackController::new(
        library,
        Arc::new(DeviceBackend),
        writer,
        volume,
        settings.display.clone(),
        settings.timing.clone(),
    );

    let (commands_tx, commands_rx) = crossbeam_channel::unbounded();
    let ingest = std::thread::Builder::new()
        .name("ingest".to_string())
        .spawn(move || CommandIngest::new().run(reader, commands_tx))
        .context("Failed to start command reader")?;

    controller.run(commands_rx);

    if ingest.join().is_err() {
        anyhow::bail!("command reader panicked");
    }
    Ok(())
}
