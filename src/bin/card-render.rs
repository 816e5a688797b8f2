use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context as _;
use card_renderer::{CardRenderer, CardSet, RenderConfig, RenderError, RenderRequest, encode_png};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "card-render", version)]
struct Cli {
    /// Renderer config JSON. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single card as a PNG.
    Render(RenderArgs),
    /// Render a card list as a grid.
    Album(RenderArgs),
    /// Render a card list fanned along an arc.
    Fan(RenderArgs),
    /// Print the frame table.
    Frames,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Asset root holding `public/` and `private/`. Overrides the config.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Base64 hash: one card for `render`, `{"cards": [...]}` for `album` and `fan`.
    #[arg(long, conflicts_with = "request", required_unless_present = "request")]
    hash: Option<String>,

    /// The same payload as plain JSON.
    #[arg(long)]
    request: Option<String>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Render budget in milliseconds. Overrides the config.
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Single,
    Album,
    Fan,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Render failures carry a caller-safe message; everything else is ours
            match err.downcast_ref::<RenderError>() {
                Some(render) => eprintln!(
                    "error ({}): {}",
                    render.status_code(),
                    render.public_message()
                ),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => RenderConfig::default(),
    };

    match cli.cmd {
        Command::Frames => {
            let registry = config.registry().context("build frame registry")?;
            for frame in &registry {
                println!(
                    "{:>3}  {:<12} {:<12} {}x{}  mask={} static={}",
                    frame.id,
                    frame.name,
                    frame.display_name,
                    frame.width,
                    frame.height,
                    frame.has_mask_layer,
                    frame.has_static_layer,
                );
            }
            Ok(())
        }
        Command::Render(args) => render(config, Shape::Single, args),
        Command::Album(args) => render(config, Shape::Album, args),
        Command::Fan(args) => render(config, Shape::Fan, args),
    }
}

fn render(mut config: RenderConfig, shape: Shape, args: RenderArgs) -> anyhow::Result<()> {
    if let Some(assets) = args.assets {
        config.asset_root = assets;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = timeout_ms;
    }

    let payload = match (args.hash, args.request) {
        (Some(hash), _) => Payload::Hash(hash),
        (None, Some(json)) => Payload::Json(json),
        (None, None) => anyhow::bail!("either --hash or --request is required"),
    };

    let registry = config.registry().context("build frame registry")?;
    let renderer = CardRenderer::new(&registry, config.asset_store())
        .with_recolor_mode(config.recolor_mode);

    let started = Instant::now();
    let deadline = config.deadline();
    let image = match shape {
        Shape::Single => renderer.render(&payload.request()?, &deadline)?,
        Shape::Album => renderer.render_album(&payload.card_set()?.cards, &deadline)?,
        Shape::Fan => renderer.render_fan(&payload.card_set()?.cards, &deadline)?,
    };
    let png = encode_png(&image).context("encode image as PNG")?;

    write_png(&args.out, &png)?;
    tracing::info!(
        ?shape,
        path = %args.out.display(),
        bytes = png.len(),
        processing_ms = started.elapsed().as_secs_f64() * 1000.0,
        "rendered"
    );
    Ok(())
}

enum Payload {
    Hash(String),
    Json(String),
}

impl Payload {
    fn request(&self) -> anyhow::Result<RenderRequest> {
        match self {
            Self::Hash(hash) => RenderRequest::from_hash(hash).context("decode card hash"),
            Self::Json(json) => RenderRequest::from_json(json).context("parse request JSON"),
        }
    }

    fn card_set(&self) -> anyhow::Result<CardSet> {
        match self {
            Self::Hash(hash) => CardSet::from_hash(hash).context("decode card list hash"),
            Self::Json(json) => CardSet::from_json(json).context("parse card list JSON"),
        }
    }
}

fn write_png(out: &Path, png: &[u8]) -> anyhow::Result<()> {
    std::fs::write(out, png).with_context(|| format!("write {}", out.display()))
}
