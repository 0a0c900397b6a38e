use clap::Parser;

use repolake_core::error::{ConfigError, ExtractError, OutputError, RepolakeError};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "repolake",
    version,
    about = "Extract a file relationship graph from a repository",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(flatten)]
    extract: commands::extract::ExtractArgs,

    #[command(subcommand)]
    command: Option<commands::Command>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Map an error onto the process exit code.
///
///   0: success
///   1: general/unknown error
///   2: configuration error
///   3: root path not found / not a directory
///   4: output could not be written
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(err) = cause.downcast_ref::<RepolakeError>() {
            return match err {
                RepolakeError::Config(_) => 2,
                RepolakeError::Extract(inner) => extract_code(inner),
                RepolakeError::Output(inner) => output_code(inner),
                RepolakeError::Query(_) => 1,
            };
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return 2;
        }
        if let Some(inner) = cause.downcast_ref::<ExtractError>() {
            return extract_code(inner);
        }
        if let Some(inner) = cause.downcast_ref::<OutputError>() {
            return output_code(inner);
        }
    }
    1
}

fn extract_code(err: &ExtractError) -> i32 {
    match err {
        ExtractError::RootNotFound(_) | ExtractError::NotADirectory(_) => 3,
        ExtractError::Io { .. } => 1,
    }
}

fn output_code(err: &OutputError) -> i32 {
    match err {
        OutputError::Read { .. } => 1,
        _ => 4,
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let outcome = match cli.command {
        Some(command) => commands::run(command),
        None => commands::extract::run(cli.extract, cli.quiet),
    };

    match outcome {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}
