use anyhow::Context;
use clap::Parser;
use leadhub::domain::config::ApiConfig;
use leadhub::kernel::config::load_config;
use leadhub_logger::Logger;
use leadhub_server::Server;
use std::path::PathBuf;

/// Realtime lead event relay.
#[derive(Debug, Parser)]
#[command(name = "leadhub-server", version, about)]
struct Cli {
    /// Config file; `leadhub.toml` in the working directory is used when present.
    #[arg(short, long, env = "LEADHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `server.port`.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg: ApiConfig =
        load_config(cli.config.as_deref()).context("Critical: Configuration is malformed")?;

    let _log = Logger::from_config(env!("CARGO_PKG_NAME"), &cfg.logging)?;

    let mut builder = Server::builder().config(cfg);
    if let Some(port) = cli.port {
        builder = builder.port(port);
    }

    builder.build().await?.run().await
}
