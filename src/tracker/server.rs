//! The tracker's HTTP surface: `GET`/`POST /announce`, plus the stdin REPL
//! from the original tooling (`help`, `lp`, `exit`).
use super::protocol::{self, AnnounceRequest, Event};
use super::registry::Registry;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    registry: Arc<Registry>,
}

pub fn router(registry: Arc<Registry>) -> Router {
    let state = AppState { registry };
    Router::new()
        .route("/announce", get(handle_get).post(handle_post))
        .with_state(state)
}

async fn handle_get(
    State(state): State<AppState>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    addr: Option<axum::extract::ConnectInfo<std::net::SocketAddr>>,
) -> Result<(StatusCode, Vec<u8>), (StatusCode, String)> {
    let query = uri.query().unwrap_or("");
    let params = parse_raw_query(query);

    let info_hash_raw = params
        .get("info_hash")
        .ok_or((StatusCode::BAD_REQUEST, "missing info_hash".to_string()))?;
    let info_hash_bytes = protocol::percent_decode_bytes(info_hash_raw);
    if info_hash_bytes.len() != 20 {
        return Err((StatusCode::BAD_REQUEST, "info_hash must decode to 20 bytes".to_string()));
    }
    let mut info_hash = [0u8; 20];
    info_hash.copy_from_slice(&info_hash_bytes);

    let peer_id = params
        .get("peer_id")
        .ok_or((StatusCode::BAD_REQUEST, "missing peer_id".to_string()))?
        .clone();

    let port: u16 = params
        .get("port")
        .ok_or((StatusCode::BAD_REQUEST, "missing port".to_string()))?
        .parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid port".to_string()))?;

    let event = match params.get("event") {
        Some(raw) => {
            let value: i64 = raw
                .parse()
                .map_err(|_| (StatusCode::BAD_REQUEST, "invalid event".to_string()))?;
            Event::from_i64(value).ok_or((StatusCode::BAD_REQUEST, "invalid event".to_string()))?
        }
        None => Event::Started,
    };

    let ip = client_ip(&headers, addr.map(|a| a.0));

    info!(%ip, port, "announce GET");
    let seeders = state
        .registry
        .announce(info_hash, peer_id, ip, port, event, false);

    let body = protocol::encode_announce_response(&seeders);
    Ok((StatusCode::OK, body))
}

async fn handle_post(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Vec<u8>), (StatusCode, String)> {
    let request =
        AnnounceRequest::from_post_body(&body).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    info!(ip = %request.ip, port = request.port, "announce POST");
    let seeders = state.registry.announce(
        request.info_hash,
        request.peer_id,
        request.ip,
        request.port,
        request.event,
        true,
    );

    let body = protocol::encode_announce_response(&seeders);
    Ok((StatusCode::OK, body))
}

fn client_ip(_headers: &HeaderMap, addr: Option<std::net::SocketAddr>) -> String {
    addr.map(|a| a.ip().to_string()).unwrap_or_default()
}

fn parse_raw_query(query: &str) -> std::collections::HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?.to_string();
            let value = parts.next().unwrap_or("").to_string();
            Some((key, value))
        })
        .collect()
}

/// Runs the interactive REPL against `stdin`/`stdout`, mirroring the
/// original tooling's `help`/`lp`/`exit` commands.
pub async fn run_repl(registry: Arc<Registry>) {
    use std::io::Write as _;
    use tokio::io::{AsyncBufReadExt, BufReader};

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        if std::io::stdout().flush().is_err() {
            warn!("failed flushing stdout");
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "error reading from stdin");
                continue;
            }
        };

        match line.trim() {
            "help" => {
                println!("Commands:");
                println!("  help - display this message");
                println!("  lp - display the list of peers");
                println!("  exit - exit the program");
            }
            "lp" => {
                println!("Peers:");
                for (hash, peers) in registry.snapshot() {
                    println!("  InfoHash: {}", hex::encode(hash));
                    for peer in peers {
                        println!("    {}:{}", peer.ip, peer.port);
                    }
                }
            }
            "exit" => {
                println!("Exiting...");
                std::process::exit(0);
            }
            "" => {}
            _ => println!("Unknown command. Type 'help' for a list of commands."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_string_into_raw_pairs() {
        let params = parse_raw_query("info_hash=%01%02&peer_id=abc&port=6881");
        assert_eq!(params.get("info_hash").unwrap(), "%01%02");
        assert_eq!(params.get("peer_id").unwrap(), "abc");
        assert_eq!(params.get("port").unwrap(), "6881");
    }

    #[test]
    fn parses_an_empty_query_string() {
        assert!(parse_raw_query("").is_empty());
    }

    #[tokio::test]
    async fn get_on_an_unseen_info_hash_returns_no_peers() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let registry = Arc::new(Registry::new());
        let app = router(registry);

        let info_hash = [9u8; 20];
        let uri = format!(
            "/announce?info_hash={}&peer_id=leecher&port=6881",
            protocol::percent_encode_bytes(&info_hash)
        );
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let peers = protocol::parse_announce_response(&body).unwrap();
        assert!(peers.is_empty());
    }

    #[tokio::test]
    async fn post_then_get_returns_the_registered_seeder() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let registry = Arc::new(Registry::new());
        let app = router(registry);

        let info_hash = [8u8; 20];
        let announce = AnnounceRequest {
            info_hash,
            peer_id: "-GO0001-aabbccddeeff00112233".to_string(),
            ip: "203.0.113.9".to_string(),
            port: 6881,
            event: Event::Started,
            is_seeder: true,
        };
        let post_request = Request::builder()
            .method("POST")
            .uri("/announce")
            .header("Content-Type", "application/x-bittorrent")
            .body(Body::from(announce.to_bencode()))
            .unwrap();
        let post_response = app.clone().oneshot(post_request).await.unwrap();
        assert_eq!(post_response.status(), StatusCode::OK);

        let get_uri = format!(
            "/announce?info_hash={}&peer_id=leecher&port=7000",
            protocol::percent_encode_bytes(&info_hash)
        );
        let get_request = Request::builder()
            .method("GET")
            .uri(get_uri)
            .body(Body::empty())
            .unwrap();
        let get_response = app.oneshot(get_request).await.unwrap();
        assert_eq!(get_response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(get_response.into_body(), usize::MAX)
            .await
            .unwrap();
        let peers = protocol::parse_announce_response(&body).unwrap();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].ip, "203.0.113.9");
        assert_eq!(peers[0].port, 6881);
    }
}
