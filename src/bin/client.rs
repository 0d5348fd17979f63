//! `torrent-client`: create/seed/download single-file torrents.
use clap::Parser;
use rustorrent_core::builder;
use rustorrent_core::config::cli::{ClientArgs, ClientCommand};
use rustorrent_core::config::DEFAULT_PIECE_LENGTH_SMALL;
use rustorrent_core::peer::id::generate_peer_id;
use rustorrent_core::peer::leecher;
use rustorrent_core::peer::seeder::{self, SeederSlot, SeederStack};
use rustorrent_core::tracker::protocol::{build_announce_get_url, parse_announce_response, Event};
use rustorrent_core::torrent::TorrentDescriptor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = ClientArgs::parse();
    let peer_id = generate_peer_id();

    match args.command {
        ClientCommand::Create {
            file,
            tracker,
            piece_length,
            out,
        } => run_create(file, tracker, piece_length, out, args.peer_port, &peer_id).await,
        ClientCommand::Download { torrent, out } => {
            run_download(torrent, out, args.peer_port, &peer_id).await
        }
        ClientCommand::Seed { torrent, file } => {
            run_seed(torrent, file, args.peer_port, &peer_id).await
        }
    }
}

async fn run_create(
    file: PathBuf,
    tracker: String,
    piece_length: u32,
    out: Option<PathBuf>,
    peer_port: u16,
    peer_id: &str,
) -> anyhow::Result<()> {
    let piece_length = if piece_length == 0 {
        DEFAULT_PIECE_LENGTH_SMALL
    } else {
        piece_length
    };

    let seeder_stack = Arc::new(SeederStack::new());
    let http_client = reqwest::Client::builder()
        .timeout(rustorrent_core::config::TRACKER_HTTP_TIMEOUT)
        .build()?;

    let descriptor = builder::create_and_register(
        &file,
        &tracker,
        piece_length,
        peer_id,
        peer_port,
        Arc::clone(&seeder_stack),
        &http_client,
    )
    .await?;

    let out_path = out.unwrap_or_else(|| {
        let mut p = file.clone();
        p.set_extension("torrent");
        p
    });
    tokio::fs::write(&out_path, descriptor.to_bencode()).await?;
    info!(path = %out_path.display(), "wrote torrent descriptor");

    let bind_addr: std::net::SocketAddr = format!("0.0.0.0:{peer_port}").parse()?;
    let peer_id_wire = rustorrent_core::peer::id::peer_id_wire_bytes(peer_id);
    seeder::listen(seeder_stack, peer_id_wire, bind_addr).await?;
    Ok(())
}

async fn run_seed(
    torrent_path: PathBuf,
    file: PathBuf,
    peer_port: u16,
    peer_id: &str,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&torrent_path).await?;
    let descriptor = TorrentDescriptor::parse(&bytes)?;

    let seeder_stack = Arc::new(SeederStack::new());
    seeder_stack
        .add_slot(SeederSlot::new(
            descriptor.info_hash(),
            descriptor.info.piece_length,
            descriptor.info.length,
            file,
        ))
        .await;

    let bind_addr: std::net::SocketAddr = format!("0.0.0.0:{peer_port}").parse()?;
    let peer_id_wire = rustorrent_core::peer::id::peer_id_wire_bytes(peer_id);
    seeder::listen(seeder_stack, peer_id_wire, bind_addr).await?;
    Ok(())
}

async fn run_download(
    torrent_path: PathBuf,
    out: PathBuf,
    peer_port: u16,
    peer_id: &str,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&torrent_path).await?;
    let descriptor = TorrentDescriptor::parse(&bytes)?;
    let info_hash = descriptor.info_hash();

    let url = build_announce_get_url(&descriptor.announce, info_hash, peer_id, peer_port, Event::Started);
    let response = reqwest::get(&url).await?.bytes().await?;
    let peers = parse_announce_response(&response)?;
    if peers.is_empty() {
        error!("tracker returned no seeders for this torrent");
        anyhow::bail!("no seeders available");
    }

    let peer_id_wire = rustorrent_core::peer::id::peer_id_wire_bytes(peer_id);
    let data = leecher::download_from_peers(&descriptor, peer_id_wire, &peers).await?;
    tokio::fs::write(&out, data).await?;
    info!(path = %out.display(), "download complete");
    Ok(())
}
