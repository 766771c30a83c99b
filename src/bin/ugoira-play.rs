use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, ValueEnum, error::ErrorKind};
use tracing_subscriber::EnvFilter;

use ugoira::{
    Manifest, ManifestSource, PlaybackConfig, Player, ScaleMode,
    viewer::{self, GpuTexture},
};

#[derive(Parser, Debug)]
#[command(name = "ugoira-play", version, about = "Play a Pixiv ugoira zip in a window")]
struct Cli {
    /// Ugoira zip archive.
    archive: PathBuf,

    /// Where to read frame delays from.
    #[arg(long, value_enum, default_value_t = ManifestChoice::Sibling)]
    manifest: ManifestChoice,

    /// Start with nearest-neighbour filtering instead of smooth.
    #[arg(long)]
    nearest: bool,

    /// Delay between loop iterations, in milliseconds.
    #[arg(long, default_value_t = ugoira::playback::DEFAULT_TICK_INTERVAL_MS)]
    tick_ms: u64,

    /// Duration for frames the manifest leaves unset, in milliseconds.
    #[arg(long, default_value_t = ugoira::playback::DEFAULT_FRAME_DURATION_MS)]
    default_delay_ms: u32,

    /// Print an ffmpeg concat script for the manifest and exit.
    #[arg(long)]
    ffconcat: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ManifestChoice {
    /// `<archive>.json` next to the archive.
    Sibling,
    /// `animation.json` inside the archive.
    Embedded,
}

impl From<ManifestChoice> for ManifestSource {
    fn from(c: ManifestChoice) -> Self {
        match c {
            ManifestChoice::Sibling => ManifestSource::Sibling,
            ManifestChoice::Embedded => ManifestSource::Embedded,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let contents = ugoira::read_whole_archive::<GpuTexture>(&cli.archive)
        .with_context(|| format!("load archive '{}'", cli.archive.display()))?;
    let ugoira::ArchiveContents {
        mut frames,
        head,
        manifest: embedded,
    } = contents;

    let source = ManifestSource::from(cli.manifest);
    if cli.ffconcat {
        let bytes = ugoira::load_manifest(source, &cli.archive, embedded.as_deref())
            .context("load manifest")?;
        return print_ffconcat(&cli.archive, bytes.as_deref());
    }

    ugoira::apply_manifest_source(&mut frames, head, source, &cli.archive, embedded.as_deref());

    let config = PlaybackConfig {
        scale_mode: if cli.nearest {
            ScaleMode::Nearest
        } else {
            ScaleMode::Smooth
        },
        default_duration_ms: cli.default_delay_ms,
        tick_interval_ms: cli.tick_ms,
    };
    let player = Player::new(frames, head, &config);
    viewer::run(player, cli.archive.display().to_string(), &config).context("viewer")?;
    Ok(())
}

fn print_ffconcat(archive: &Path, bytes: Option<&[u8]>) -> anyhow::Result<()> {
    let bytes = bytes.with_context(|| format!("no manifest found for '{}'", archive.display()))?;
    let manifest = Manifest::parse(bytes).context("parse manifest")?;
    print!("{}", manifest.to_ffconcat());
    Ok(())
}
