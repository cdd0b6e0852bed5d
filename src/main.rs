use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use karaoke_bridge_lib::library::Library;
use karaoke_bridge_lib::settings::BridgeSettings;

#[derive(Parser, Debug)]
#[command(name = "karaoke-bridge", version, about)]
struct Args {
    /// Settings file (JSON); defaults are used if it does not exist
    #[arg(long, short = 'c', default_value = "karaoke-bridge.json")]
    config: PathBuf,

    /// Serial port the controller board is on
    #[arg(long, short = 'p')]
    port: Option<String>,

    #[arg(long)]
    baud: Option<u32>,

    /// Directory of `<number>_<name>.<ext>` song files
    #[arg(long)]
    songs: Option<PathBuf>,

    /// Directory of `<song file stem>.txt` lyric files
    #[arg(long)]
    lyrics: Option<PathBuf>,

    /// Save the effective settings to the config file and exit
    #[arg(long)]
    write_config: bool,

    /// Print the song list with the indexes the board uses and exit
    #[arg(long)]
    list_songs: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut settings = BridgeSettings::load(&args.config).map_err(anyhow::Error::msg)?;
    if let Some(port) = args.port {
        settings.serial.port = port;
    }
    if let Some(baud) = args.baud {
        settings.serial.baud_rate = baud;
    }
    if let Some(songs) = args.songs {
        settings.library.song_dir = songs;
    }
    if let Some(lyrics) = args.lyrics {
        settings.library.lyric_dir = lyrics;
    }

    if args.write_config {
        return settings.save(&args.config).map_err(anyhow::Error::msg);
    }

    if args.list_songs {
        let library = Library::scan(&settings.library).context("Failed to load song library")?;
        for song in library.songs() {
            println!("{:>3}  {}", song.index, song.file_name);
        }
        return Ok(());
    }

    karaoke_bridge_lib::run(settings)
}
