mod driver;
mod script;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use ms_core::{EngineConfig, Mindscape, TextRasterizer, formation_text};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::driver::{RunOptions, Summary};
use crate::script::Script;

#[derive(Parser)]
#[command(name = "ms", about = "Headless mindscape host: replay sessions, export frames")]
struct Cli {
    /// Engine configuration file (TOML). Falls back to $MS_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a session script and print statistics
    Run {
        /// Script file (JSON)
        #[arg(long)]
        script: PathBuf,

        /// Frames to simulate. Defaults to one second past the last event.
        #[arg(long)]
        frames: Option<u64>,

        /// Pace frames at 16 ms like a live display
        #[arg(long)]
        realtime: bool,
    },

    /// Replay a session script and write the final frame as JSON
    Snapshot {
        /// Script file (JSON)
        #[arg(long)]
        script: PathBuf,

        /// Frames to simulate
        #[arg(long)]
        frames: u64,

        /// Output file path
        #[arg(long)]
        out: PathBuf,
    },

    /// Rasterize text into formation points and preview them
    Raster {
        /// Text to rasterize (shortened to a formation phrase)
        text: String,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var("MS_CONFIG").ok().map(PathBuf::from));
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: EngineConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config.validate().context("invalid config")?;
    tracing::info!("loaded config from {}", path.display());
    Ok(config)
}

fn open_engine(cli: &Cli) -> Result<Mindscape> {
    let config = load_config(cli)?;
    Mindscape::new(config).context("failed to start engine")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Run {
            script,
            frames,
            realtime,
        } => cmd_run(&cli, script, *frames, *realtime).await,
        Commands::Snapshot {
            script,
            frames,
            out,
        } => cmd_snapshot(&cli, script, *frames, out).await,
        Commands::Raster { text } => cmd_raster(&cli, text),
        Commands::Config => cmd_config(&cli),
    }
}

/// Frames needed to play the whole script plus one second of settling.
fn default_frames(script: &Script) -> u64 {
    ((script.duration() + 1.0) / ms_core::FRAME_DT as f64).ceil() as u64
}

async fn cmd_run(cli: &Cli, script: &Path, frames: Option<u64>, realtime: bool) -> Result<()> {
    let script = Script::load(script)?;
    let mut engine = open_engine(cli)?;
    let frames = frames.unwrap_or_else(|| default_frames(&script));

    let summary = driver::run(&mut engine, &script, RunOptions { frames, realtime }).await?;
    print_summary(&engine, &summary);
    engine.dispose();
    Ok(())
}

fn print_summary(engine: &Mindscape, summary: &Summary) {
    println!("frames:     {}", engine.frame());
    println!("clock:      {:.3}s", engine.clock());
    println!("particles:  {}", engine.particles().len());
    println!("nodes:      {}", engine.registry().len());
    println!("edges:      {}", engine.graph().edges().len());
    println!("camera:     {}", engine.camera_mode().as_str());
    println!("textures:   {}", engine.registry().textures().live_count());
    println!(
        "events:     spawned={}, ready={}, failed={}, removed={}, mode_changes={}",
        summary.spawned,
        summary.textures_ready,
        summary.textures_failed,
        summary.removed,
        summary.mode_changes,
    );
    println!("clicks:     {}/{} hit", summary.hits, summary.clicks);
}

async fn cmd_snapshot(cli: &Cli, script: &Path, frames: u64, out: &Path) -> Result<()> {
    if frames == 0 {
        bail!("--frames must be at least 1");
    }
    let script = Script::load(script)?;
    let mut engine = open_engine(cli)?;
    driver::run(
        &mut engine,
        &script,
        RunOptions {
            frames,
            realtime: false,
        },
    )
    .await?;

    let json = engine.export_json().context("failed to serialize frame")?;
    std::fs::write(out, &json).with_context(|| format!("failed to write {}", out.display()))?;

    println!(
        "wrote frame {} ({} nodes, {} edges) to {}",
        engine.frame(),
        engine.registry().len(),
        engine.graph().edges().len(),
        out.display()
    );
    engine.dispose();
    Ok(())
}

fn cmd_raster(cli: &Cli, text: &str) -> Result<()> {
    let config = load_config(cli)?;
    let mut rng = SmallRng::seed_from_u64(config.seed.unwrap_or(0));
    let rasterizer = TextRasterizer::new(config.text.clone());

    let phrase = formation_text(text);
    let points = rasterizer.rasterize(&phrase, &mut rng);
    println!("text:   {phrase:?}");
    println!("points: {}", points.len());

    let Some(canvas) = rasterizer.render_canvas(&phrase) else {
        println!("(nothing to draw)");
        return Ok(());
    };
    let stride = config.text.sample_stride.max(1);
    let threshold = config.text.luma_threshold;
    for y in (0..canvas.height()).step_by(stride as usize) {
        let row: String = (0..canvas.width())
            .step_by(stride as usize)
            .map(|x| {
                if canvas.get_pixel(x, y).0[0] > threshold {
                    '#'
                } else {
                    ' '
                }
            })
            .collect();
        println!("{}", row.trim_end());
    }
    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let text = toml::to_string_pretty(&config).context("failed to serialize config")?;
    print!("{text}");
    Ok(())
}
