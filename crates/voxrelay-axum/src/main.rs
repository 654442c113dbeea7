//! `voxrelay` binary entry point.

use clap::Parser;

use voxrelay_axum::{Cli, start_server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // config.env first so its values win over a generic .env
    dotenvy::from_filename("config.env").ok();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let _log_guard = telemetry::init_tracing(cli.log_dir.as_deref());

    start_server(cli.server_config()).await
}
