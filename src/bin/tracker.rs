//! `torrent-tracker`: the `/announce` HTTP endpoint plus an interactive REPL.
use clap::Parser;
use rustorrent_core::config::cli::TrackerArgs;
use rustorrent_core::tracker::registry::Registry;
use rustorrent_core::tracker::server;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = TrackerArgs::parse();
    let registry = Arc::new(Registry::new());

    let app = server::router(Arc::clone(&registry));
    let listener = tokio::net::TcpListener::bind(&args.addr).await?;
    info!(addr = %args.addr, "tracker listening");

    let http_server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await
    });

    server::run_repl(registry).await;
    http_server.abort();
    Ok(())
}
