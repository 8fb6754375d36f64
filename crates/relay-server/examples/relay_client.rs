//! Minimal relay client: adds one torrent, heartbeats, and prints
//! every notification the coordinator sends back.
//!
//! Usage:
//!   cargo run --example relay_client -- [torrentID]
//!   RELAY_CLIENT_ADDR=127.0.0.1:9300 cargo run --example relay_client

use std::env;
use std::error::Error;
use std::time::Duration;

use relay_core::keys::{ClientKey, TorrentKey};
use relay_core::messages::{AddOptions, InboundEnvelope, Notification, Request};
use relay_proto::{decode_outbound, encode_inbound};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let addr = env::var("RELAY_CLIENT_ADDR").unwrap_or_else(|_| "127.0.0.1:9300".to_string());
    let torrent_id = env::args()
        .nth(1)
        .unwrap_or_else(|| "magnet:?xt=urn:btih:cafebabecafebabecafebabecafebabecafebabe".to_string());

    let client_key = ClientKey(uuid::Uuid::new_v4().to_string());
    let torrent_key = TorrentKey(uuid::Uuid::new_v4().to_string());

    println!("Connecting to {addr} as {client_key}...");
    let stream = TcpStream::connect(&addr).await?;
    let (read_half, mut write_half) = stream.into_split();

    // Add the torrent (and ask for the bridging endpoint right away).
    let add = InboundEnvelope {
        client_key: client_key.clone(),
        torrent_key: Some(torrent_key.clone()),
        request: Request::Add {
            torrent_id,
            options: AddOptions {
                server: Some(Default::default()),
                ..Default::default()
            },
        },
    };
    write_half
        .write_all(format!("{}\n", encode_inbound(&add)?).as_bytes())
        .await?;

    // Heartbeat loop keeps us alive past the server's timeout.
    let hb_key = client_key.clone();
    tokio::spawn(async move {
        let mut write_half = write_half;
        loop {
            tokio::time::sleep(Duration::from_secs(10)).await;
            let heartbeat = InboundEnvelope {
                client_key: hb_key.clone(),
                torrent_key: None,
                request: Request::Heartbeat,
            };
            let Ok(line) = encode_inbound(&heartbeat) else { return };
            if write_half
                .write_all(format!("{line}\n").as_bytes())
                .await
                .is_err()
            {
                return;
            }
        }
    });

    // Print notifications until the transfer finishes.
    let mut lines = BufReader::new(read_half).lines();
    while let Some(line) = lines.next_line().await? {
        let envelope = match decode_outbound(&line) {
            Ok(envelope) => envelope,
            Err(err) => {
                eprintln!("bad line from server: {err}");
                continue;
            }
        };
        println!("<< {:?}", envelope.notification);
        if matches!(envelope.notification, Notification::Done { .. }) {
            println!("Transfer complete.");
            break;
        }
    }

    Ok(())
}
