//! async-listing CLI
//!
//! Command-line interface for paging through JSON endpoints

use async_listing::cli::{App, Cli};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG directives still apply
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(cli.log_level().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let app = App::new(cli);
    if let Err(e) = app.run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
