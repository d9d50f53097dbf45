mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command};
use commands::render::{Overrides, RenderRequest};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise warn, or debug with --verbose.
    let default_level = if args.verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "toyscope={level},toyscope_core={level}",
            level = default_level
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Render {
            ty,
            address,
            source,
            config,
            keys_only,
            style,
            max_depth,
            json,
        } => commands::render::run(RenderRequest {
            ty,
            address,
            source,
            config,
            overrides: Overrides {
                keys_only,
                style,
                max_depth,
            },
            json,
        }),
        Command::Capture {
            source,
            regions,
            output,
        } => commands::capture::run(&source, &regions, &output),
        Command::Hexdump {
            address,
            size,
            source,
        } => commands::hexdump::run(address, size, &source),
    }
}
