use clap::Parser;
use kindle_collections::cli::{Cli, run_cli};
use kindle_collections::output::OutputFormatter;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cli.log_level()))
        .with_writer(io::stderr)
        .with_target(false)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        run_cli(&cli, &mut io::stdout().lock())
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::from(e.exit_code())
        }
    }
}
