//! jdkfetch CLI
//!
//! Provisions Temurin JDKs into a local cache and prints where they live.

// The CLI reports results on stdout
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;
mod commands;
mod progress;
mod tracing;

use crate::tracing::{TracingConfig, init_tracing};
use jdkfetch::CancellationToken;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Tracing may be unusable while panicking
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    init_tracing(TracingConfig {
        format: cli.log_format.clone(),
        level: cli.level.clone().into(),
        ..Default::default()
    })?;

    let config = commands::load_config(&cli)?;
    let cancel = CancellationToken::new();
    commands::cancel_on_ctrl_c(cancel.clone());

    let output = commands::execute(&cli, config, cancel).await?;
    println!("{output}");
    Ok(())
}
