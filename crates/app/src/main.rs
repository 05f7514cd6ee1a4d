use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use brailleshelf_ui::EmulatedDisplay;
use clap::Parser;
use directories::ProjectDirs;
use tokio::task::LocalSet;

mod device;
mod dummy;

use dummy::DummyDriver;

/// Braille e-book reader for multi-line refreshable braille displays.
#[derive(Parser, Debug)]
#[command(name = "brailleshelf", version, about)]
struct Cli {
    /// Config file (default: the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the media directory the source roots live in
    #[arg(long)]
    media_dir: Option<String>,

    /// Run without a display, logging row writes instead
    #[arg(long)]
    dummy: bool,

    /// Log filter, e.g. `debug` or `storage=debug` (default: info or RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref(), cli.log_file.as_deref())?;

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let mut config = brailleshelf_storage::load_config(&config_path)?;
    if let Some(media_dir) = cli.media_dir {
        config.media_dir = media_dir;
    }
    log::info!("config {} media {}", config_path.display(), config.media_dir);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build runtime")?;
    let local = LocalSet::new();
    let dimensions = config.dimensions;

    if cli.dummy {
        local.block_on(&runtime, device::run(config, &mut DummyDriver::new(dimensions)))
    } else {
        let mut display = EmulatedDisplay::open(dimensions)?;
        let result = local.block_on(&runtime, device::run(config, &mut display));
        display.close()?;
        result
    }
}

fn default_config_path() -> anyhow::Result<PathBuf> {
    let project_dirs =
        ProjectDirs::from("org", "brailleshelf", "brailleshelf").context("resolve project dirs")?;
    Ok(project_dirs.config_dir().join("config.toml"))
}

fn init_logging(level: Option<&str>, file: Option<&Path>) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    if let Some(path) = file {
        let file = fs::File::create(path)
            .with_context(|| format!("create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}
