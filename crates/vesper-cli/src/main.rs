//! Vesper command line entry point

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "vesper=info,vesper_cli=info,vesper_search=info,vesper_vector=info,vesper_runtime=info".into()
            }),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = vesper_cli::Cli::parse();
    tracing::debug!(command = ?cli.command, "Starting vesper v{}", env!("CARGO_PKG_VERSION"));

    let output = vesper_cli::run(cli).await?;
    println!("{output}");
    Ok(())
}
