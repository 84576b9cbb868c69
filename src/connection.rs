//! C5 Connection Handler: one task per accepted peer, speaking the framed
//! message protocol defined in [`crate::wire`].

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::service::RateService;
use crate::wire::{AssetHistoryMessage, AssetsMessage, ClientFrame, ServerFrame};

/// Accept one connection, serve it until it closes, then unsubscribe.
///
/// Deliberately not RAII: an explicit `service.unsubscribe` call after the
/// loop, rather than a `Drop` guard, keeps the unsubscribe visibly on the
/// same control-flow path as the rest of the handler (and avoids having to
/// make `unsubscribe` sync-callable from a destructor).
pub async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, service: Arc<RateService>) {
    let peer_id = peer_addr.to_string();
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!(%err, peer_id, "websocket handshake failed");
            return;
        }
    };
    let (mut outgoing, mut incoming) = ws_stream.split();

    // Frames the connection owns and relays to the socket: live points land
    // here once `subscribe` installs a sender with the service.
    let (point_tx, mut point_rx) = mpsc::channel(32);

    loop {
        tokio::select! {
            point = point_rx.recv() => {
                let Some(point) = point else { continue };
                let frame = ServerFrame::Point { message: point };
                if send_frame(&mut outgoing, &frame).await.is_err() {
                    break;
                }
            }
            message = incoming.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if handle_text_message(&text, &peer_id, &service, &mut outgoing, point_tx.clone())
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(peer_id, "connection closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(%err, peer_id, "error while reading message");
                        break;
                    }
                }
            }
        }
    }

    service.unsubscribe(&peer_id).await;
}

type WsSink = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<TcpStream>,
    Message,
>;

async fn handle_text_message(
    text: &str,
    peer_id: &str,
    service: &RateService,
    outgoing: &mut WsSink,
    point_tx: mpsc::Sender<crate::core::RatePoint>,
) -> Result<(), ()> {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(%err, peer_id, "invalid or unknown client frame");
            return Ok(());
        }
    };

    match frame {
        ClientFrame::Assets => {
            let reply = ServerFrame::Assets {
                message: AssetsMessage { assets: service.symbols() },
            };
            send_frame(outgoing, &reply).await
        }
        ClientFrame::Subscribe { message } => {
            let asset_id = message.asset_id;
            // Admissibility is checked before anything is sent: an unknown
            // asset id gets no reply at all, not an empty history.
            if !service.is_known_asset(asset_id) {
                warn!(peer_id, asset_id, "subscribe requested for unknown asset id");
                return Ok(());
            }
            // History is sent before the live subscription is installed
            // (spec P5): a client never sees a live point before its
            // backfill, even if a tick lands mid-handshake.
            let points = match service.history(asset_id).await {
                Ok(points) => points,
                Err(err) => {
                    warn!(%err, peer_id, asset_id, "failed to load history");
                    Vec::new()
                }
            };
            let reply = ServerFrame::AssetHistory {
                message: AssetHistoryMessage { points },
            };
            send_frame(outgoing, &reply).await?;
            service.subscribe(peer_id, asset_id, point_tx).await;
            Ok(())
        }
    }
}

async fn send_frame(outgoing: &mut WsSink, frame: &ServerFrame) -> Result<(), ()> {
    let text = match serde_json::to_string(frame) {
        Ok(text) => text,
        Err(err) => {
            warn!(%err, "failed to encode outgoing frame");
            return Err(());
        }
    };
    outgoing.send(Message::Text(text.into())).await.map_err(|err| {
        warn!(%err, "failed to send frame, closing connection");
    })
}
