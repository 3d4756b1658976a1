//! clixtragen: generate shell completion from a program's argparse calls.
//!
//! ```text
//! clixtragen [-o FILE] [-y] [-p PARSER] [-g GENERATOR] EXECNAME FILENAME
//! ```
//!
//! The log level is read from `CLIXTRAGEN_LOG` (`debug`, `info`, `warning`,
//! `error`); messages go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use clixtragen::Diagnostics;
use std::fs;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(
    name = "clixtragen",
    version,
    about = "Generate command line helpers from argument parser declarations"
)]
struct Cli {
    /// Name of the executable the helpers are generated for
    #[arg(value_name = "EXECNAME")]
    execname: String,

    /// Source file declaring the command line interface
    #[arg(value_name = "FILENAME")]
    filename: PathBuf,

    /// Write the result to FILE instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the invocation as YAML (same as --generator yaml)
    #[arg(short = 'y', long)]
    yaml: bool,

    /// Source parser
    #[arg(short = 'p', long, default_value = "python")]
    parser: String,

    /// Output format: zsh (default), bash, fish, yaml, json
    #[arg(short = 'g', long, default_value = "zsh")]
    generator: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let source = fs::read_to_string(&cli.filename)
        .with_context(|| format!("failed to read {}", cli.filename.display()))?;
    tracing::debug!("read {} bytes from {}", source.len(), cli.filename.display());

    let generator = if cli.yaml { "yaml" } else { cli.generator.as_str() };
    tracing::info!("generating {generator} output for {}", cli.execname);
    let mut diagnostics = Diagnostics::new();
    let text = clixtragen::generate(
        &source,
        &cli.execname,
        &cli.parser,
        generator,
        &mut diagnostics,
    )
    .with_context(|| format!("failed to process {}", cli.filename.display()))?;

    match &cli.output {
        Some(path) => fs::write(path, &text)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{text}"),
    }
    Ok(())
}

fn init_logging() -> Result<()> {
    let level = log_level(std::env::var("CLIXTRAGEN_LOG").ok().as_deref());
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Unknown or missing values fall back to warnings only.
fn log_level(value: Option<&str>) -> Level {
    match value.map(str::to_lowercase).as_deref() {
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("error") => Level::ERROR,
        _ => Level::WARN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_from_env_value() {
        assert_eq!(log_level(Some("debug")), Level::DEBUG);
        assert_eq!(log_level(Some("INFO")), Level::INFO);
        assert_eq!(log_level(Some("warning")), Level::WARN);
        assert_eq!(log_level(Some("error")), Level::ERROR);
        assert_eq!(log_level(Some("loud")), Level::WARN);
        assert_eq!(log_level(None), Level::WARN);
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["clixtragen", "tool", "tool.py"]);
        assert_eq!(cli.parser, "python");
        assert_eq!(cli.generator, "zsh");
        assert!(!cli.yaml);
        assert!(cli.output.is_none());
    }
}
