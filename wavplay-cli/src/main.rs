use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use wavplay_core::{
    CpalOutputDevice, OutputDevice, PlayConfig, PlaybackEngine, SampleSource, WavFileSource,
};

/// Play uncompressed PCM audio files through the host output device.
#[derive(Parser, Debug)]
#[command(name = "play", version)]
struct Args {
    /// Audio host to render through (defaults to the platform host)
    #[arg(short = 'm', long)]
    manufacturer: Option<String>,

    /// Print per-file format details
    #[arg(short, long, default_value_t = true)]
    verbose: bool,

    /// Audio files to play, in order
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let config = PlayConfig::new()
        .manufacturer(args.manufacturer)
        .verbose(args.verbose);

    run(&config, &args.files)
}

fn run(config: &PlayConfig, files: &[PathBuf]) -> Result<()> {
    let mut device = CpalOutputDevice::new(config.manufacturer.as_deref())?;
    device.initialize()?;
    let mut engine = PlaybackEngine::new(device);

    for path in files {
        println!("playing {}", path.display());
        // A bad file or a device hiccup skips to the next file; it does
        // not abort the batch.
        if let Err(err) = play_file(&mut engine, path, config.verbose) {
            eprintln!("{}: {}", path.display(), err);
        }
    }

    engine.device_mut().teardown()?;
    Ok(())
}

fn play_file(
    engine: &mut PlaybackEngine<CpalOutputDevice>,
    path: &Path,
    verbose: bool,
) -> wavplay_core::Result<()> {
    let source = WavFileSource::open(path)?;

    if verbose {
        println!(
            "{}:\n    sampling rate: {}\n    channels: {}\n    sample width: {}",
            path.display(),
            source.sample_rate(),
            source.channels(),
            source.sample_width_bytes()
        );
    }

    let stats = engine.play(Box::new(source))?;
    log::info!(
        "{}: rendered {} frames in {} pulls",
        path.display(),
        stats.frames_rendered,
        stats.pulls
    );
    Ok(())
}
