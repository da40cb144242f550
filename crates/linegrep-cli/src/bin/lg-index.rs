use anyhow::Result;
use clap::Parser;

use linegrep_cli::config::{build_index, load_config};

#[derive(Parser, Debug)]
#[command(name = "lg-index", about = "Build a linegrep index from a JSON config")]
struct Args {
    /// JSON build config: {name, fs_paths, repositories}
    config: std::path::PathBuf,
    /// Where to write the dumped index
    #[arg(short, long)]
    output: std::path::PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let cfg = load_config(&args.config)?;
    let idx = build_index(&cfg)?;
    idx.dump(&args.output)?;
    tracing::info!(output = %args.output.display(), "index written");
    Ok(())
}
