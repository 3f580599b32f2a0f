use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use mockgen::{ExportFormat, SceneFile, Session};

#[derive(Parser, Debug)]
#[command(name = "mockgen", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the scene at canvas resolution and write a PNG.
    Preview(PreviewArgs),
    /// Export the scene as a downloadable artifact (2x raster or SVG).
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Render with the busy indicator raised.
    #[arg(long, default_value_t = false)]
    busy: bool,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Output format: png, jpg, or svg.
    #[arg(long, default_value = "png")]
    format: ExportFormat,

    /// Directory receiving `mockup.<ext>`.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Preview(args) => cmd_preview(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn load_session(scene_path: &std::path::Path) -> anyhow::Result<Session> {
    let json = std::fs::read_to_string(scene_path)
        .with_context(|| format!("read scene '{}'", scene_path.display()))?;
    let file: SceneFile = serde_json::from_str(&json)
        .with_context(|| format!("parse scene '{}'", scene_path.display()))?;
    let mut sess = Session::new();
    sess.load_scene_file(&file)?;
    Ok(sess)
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let mut sess = load_session(&args.scene)?;
    sess.scene.processing = args.busy;
    let frame = sess.preview()?;
    let png = mockgen::export::png_bytes(&frame)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let mut sess = load_session(&args.scene)?;
    let path = sess.export(args.format, &args.out_dir)?;
    eprintln!("wrote {}", path.display());
    Ok(())
}
