use anyhow::Context;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use weave::render::{self, OutputFormat};
use weave::Interpreter;

#[derive(Parser)]
#[command(name = "weave")]
#[command(version = env!("WEAVE_BUILD_INFO"))]
#[command(about = "weave - reactive draw-tree language")]
struct Cli {
    /// Path to a .weave source file to run
    file: PathBuf,
    /// Treat FILE as a JSON syntax tree instead of source text
    #[arg(long)]
    ast: bool,
    /// How the published draw tree is written to stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
    /// Debug logging on stderr (WEAVE_LOG overrides)
    #[arg(long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("WEAVE_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let src = fs::read_to_string(&cli.file)
        .with_context(|| format!("reading {}", cli.file.display()))?;
    let interp = Interpreter::new()?;
    interp.on_render(render::headless_sink(cli.format));
    let draw_tree = if cli.ast {
        interp.run_json(&src)?
    } else {
        interp.run_source(&src)?
    };
    interp.publish(&draw_tree);

    Ok(())
}
