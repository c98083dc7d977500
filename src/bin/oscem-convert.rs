//! oscem-convert - flat instrument metadata to OSCEM JSON

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use oscem_converter::conversion::ConversionOptions;
use oscem_converter::observability::{
    CompositeObserver, ConversionObserver, FileObserver, Severity, TracingObserver,
};
use oscem_converter::pipeline::{run_conversion, MappingSource, PipelineOptions};

#[derive(Parser)]
#[command(name = "oscem-convert")]
#[command(about = "Convert flat instrument metadata JSON into an OSCEM document")]
#[command(version)]
struct Cli {
    /// Input JSON file
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output JSON file name (defaults to the working directory name)
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Custom CSV mapping file (defaults to the embedded table)
    #[arg(long = "map")]
    map: Option<PathBuf>,

    /// Spherical aberration (mm)
    #[arg(long)]
    cs: Option<String>,

    /// Whether and how to flip/rotate the gain reference
    #[arg(long = "gain-flip-rotate", alias = "gain_flip_rotate")]
    gain_flip_rotate: Option<String>,

    /// Append conversion events to this file
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse_from(normalize_legacy_flags(std::env::args_os()));

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Long flags that older invocations spell with a single dash.
const LEGACY_LONG_FLAGS: [&str; 3] = ["map", "cs", "gain_flip_rotate"];

/// Rewrite `-map`, `-cs` and `-gain_flip_rotate` (also `-flag=value`) to their `--` form.
fn normalize_legacy_flags(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let Some(rest) = text.strip_prefix('-').filter(|r| !r.starts_with('-')) else {
                return arg;
            };
            let name = rest.split_once('=').map_or(rest, |(name, _)| name);
            if LEGACY_LONG_FLAGS.contains(&name) {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut observers: Vec<Arc<dyn ConversionObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(path) = &cli.log_file {
        observers.push(Arc::new(FileObserver::new(path)));
    }

    let options = PipelineOptions {
        mapping: cli.map.map(MappingSource::Path).unwrap_or_default(),
        output_name: cli.output,
        output_dir: None,
        conversion: ConversionOptions {
            cs: cli.cs,
            gain_flip_rotate: cli.gain_flip_rotate,
        },
        observer: Some(Arc::new(CompositeObserver::new(observers))),
        alert_at_or_above: Severity::Critical,
    };

    let report = run_conversion(&cli.input, &options)
        .with_context(|| format!("conversion of {} failed", cli.input.display()))?;

    println!("Extracted data was written to: {}", report.output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(args: &[&str]) -> Vec<String> {
        normalize_legacy_flags(args.iter().map(OsString::from))
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect()
    }

    #[test]
    fn single_dash_long_flags_are_rewritten() {
        assert_eq!(
            normalized(&["oscem-convert", "-i", "in.json", "-map", "m.csv", "-cs=2.7", "-gain_flip_rotate", "flipy"]),
            ["oscem-convert", "-i", "in.json", "--map", "m.csv", "--cs=2.7", "--gain_flip_rotate", "flipy"]
        );
    }

    #[test]
    fn other_arguments_are_untouched() {
        assert_eq!(
            normalized(&["oscem-convert", "--map", "m.csv", "-o", "-", "-io"]),
            ["oscem-convert", "--map", "m.csv", "-o", "-", "-io"]
        );
    }
}
