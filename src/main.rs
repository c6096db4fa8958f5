//! Binary entrypoint for glitch-frame.
//!
//! Runs the presentation loop against an in-memory panel; everything else
//! lives in the library crate.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use glitch_frame::catalog::{Catalog, DirectoryCatalog};
use glitch_frame::config::{Configuration, PixelFormat};
use glitch_frame::presentation::Presentation;
use glitch_frame::surface::{Panel, Rgb565Surface, RgbSurface};
use glitch_frame::tasks::ticker::{self, TickerOptions, TickerSummary};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "glitch-frame", about = "Glitched bitmap slideshow for LED matrix panels")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Stop after this many ticks instead of running until Ctrl-C
    #[arg(long, value_name = "COUNT")]
    ticks: Option<u64>,

    /// Write the final panel contents to this PNG on exit
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Override the configured RNG seed
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(
        format!("glitch_frame={level}")
            .parse()
            .context("invalid log directive")?,
    );
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn build_catalog(cfg: &Configuration) -> Result<DirectoryCatalog> {
    let catalog = if cfg.images.is_empty() {
        let root = cfg
            .library_path
            .as_deref()
            .context("library-path is required when no images are listed")?;
        DirectoryCatalog::scan(root)
            .with_context(|| format!("scanning {}", root.display()))?
    } else {
        DirectoryCatalog::from_paths(cfg.images.clone())?
    };
    info!(count = catalog.len(), "image catalog ready");
    Ok(catalog)
}

async fn present<P: Panel>(
    cfg: &Configuration,
    catalog: DirectoryCatalog,
    mut panel: P,
    rng: &mut StdRng,
    options: TickerOptions,
    cancel: CancellationToken,
) -> Result<(TickerSummary, P)> {
    panel.set_brightness(cfg.display.initial_brightness);
    let mut presentation = Presentation::from_config(catalog, cfg, Instant::now())?;
    let summary = ticker::run(&mut presentation, &mut panel, rng, options, cancel).await?;
    Ok((summary, panel))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = Configuration::from_yaml_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?
        .validated()
        .context("validating configuration")?;

    let catalog = build_catalog(&cfg)?;
    let mut rng = match cli.seed.or(cfg.seed) {
        Some(seed) => {
            info!(seed, "using fixed seed");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for ctrl-c");
                return;
            }
            info!("shutdown requested");
            cancel.cancel();
        });
    }

    let options = TickerOptions {
        interval: cfg.tick_interval,
        max_ticks: cli.ticks,
    };
    let (width, height) = (cfg.display.width, cfg.display.height);
    let started = Instant::now();
    let summary = match cfg.display.format {
        PixelFormat::Rgb565 => {
            let surface = Rgb565Surface::new(width, height);
            let (summary, surface) =
                present(&cfg, catalog, surface, &mut rng, options, cancel).await?;
            if let Some(path) = &cli.snapshot {
                surface.save_png(path)?;
            }
            summary
        }
        PixelFormat::Rgb888 => {
            let surface = RgbSurface::new(width, height);
            let (summary, surface) =
                present(&cfg, catalog, surface, &mut rng, options, cancel).await?;
            if let Some(path) = &cli.snapshot {
                surface.save_png(path)?;
            }
            summary
        }
    };

    if let Some(path) = &cli.snapshot {
        info!(path = %path.display(), "snapshot written");
    }
    info!(
        ticks = summary.ticks,
        cycles = summary.cycles,
        elapsed = %humantime::format_duration(started.elapsed()),
        "glitch-frame finished"
    );
    Ok(())
}
