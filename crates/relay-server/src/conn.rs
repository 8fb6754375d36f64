//! Per-connection I/O.
//!
//! Each accepted socket gets:
//! - a writer task draining its outbound channel into JSON lines,
//! - a reader loop decoding JSON lines into coordinator turns.
//!
//! Malformed lines are logged and dropped; the connection stays up.
//! The reader never touches relay state directly; everything goes
//! through the turn channel.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::types::{ConnId, OutboundRx, OutboundTx, Turn, TurnTx};

/// Run the I/O loops for a single connection. Returns when the peer
/// disconnects or the relay is shutting down.
pub async fn run_conn(
    conn: ConnId,
    stream: TcpStream,
    turn_tx: TurnTx,
    out_tx: OutboundTx,
    mut out_rx: OutboundRx,
) -> Result<()> {
    let (read_half, write_half) = stream.into_split();

    // Writer task: serialize outbound envelopes, one JSON object per line.
    let writer = tokio::spawn(async move {
        let mut write_half = write_half;
        while let Some(envelope) = out_rx.recv().await {
            let line = match relay_proto::encode_outbound(&envelope) {
                Ok(line) => line,
                Err(err) => {
                    warn!(conn = conn.0, error = %err, "failed to encode outbound envelope");
                    continue;
                }
            };
            if write_half.write_all(line.as_bytes()).await.is_err()
                || write_half.write_all(b"\n").await.is_err()
            {
                break;
            }
        }
    });

    // Reader loop: one decoded envelope per line becomes one turn.
    let mut lines = BufReader::new(read_half).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match relay_proto::decode_inbound(&line) {
            Ok(envelope) => {
                let turn = Turn::Inbound {
                    conn,
                    reply: out_tx.clone(),
                    envelope,
                };
                if turn_tx.send(turn).is_err() {
                    debug!(conn = conn.0, "coordinator task gone; closing connection");
                    break;
                }
            }
            Err(err) => {
                warn!(conn = conn.0, error = %err, "dropping malformed line");
            }
        }
    }

    let _ = turn_tx.send(Turn::ConnClosed { conn });
    writer.abort();
    Ok(())
}
