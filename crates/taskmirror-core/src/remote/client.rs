//! WebSocket collection client
//!
//! `WsCollection` talks to the collection server over a single WebSocket.
//! A spawned IO task owns the socket; the handle sends requests over an
//! mpsc channel and each request resolves through its own oneshot. Live
//! events are fanned out to per-subscription channels, and dropping a
//! `Subscription` sends the unsubscribe.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::message::{ClientMessage, RequestId, ServerMessage};
use super::{ChangeEvent, EventKind, RemoteCollection, Subscription};
use crate::error::{RemoteError, RemoteResult};
use crate::models::TaskPayload;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// How long to wait for the server's welcome after connecting
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// A request in flight: where to deliver the reply, and, for subscribe
/// requests, the event channel to register once the server confirms.
struct Pending {
    reply: oneshot::Sender<RemoteResult<ServerMessage>>,
    events: Option<mpsc::UnboundedSender<ChangeEvent>>,
}

enum IoCommand {
    Request {
        id: RequestId,
        msg: ClientMessage,
        events: Option<mpsc::UnboundedSender<ChangeEvent>>,
        reply: oneshot::Sender<RemoteResult<ServerMessage>>,
    },
    Unsubscribe {
        subscription: u64,
    },
}

/// Handle to a remote collection reached over WebSocket
pub struct WsCollection {
    cmd_tx: mpsc::UnboundedSender<IoCommand>,
    next_request: AtomicU64,
    client_id: String,
}

impl WsCollection {
    /// Connect to the collection server and open the named collection
    pub async fn connect(url: &str, collection: &str) -> RemoteResult<Self> {
        info!(url, collection, "connecting to collection server");

        let (ws_stream, _response) = connect_async(url).await.map_err(RemoteError::Connect)?;
        let (mut write, mut read) = ws_stream.split();

        let client_id = format!("taskmirror-{}", &Uuid::new_v4().to_string()[..8]);
        let hello = ClientMessage::Hello {
            client_id: client_id.clone(),
            collection: collection.to_string(),
        };
        write.send(Message::Text(hello.encode())).await?;

        wait_for_welcome(&mut read, url).await?;
        debug!(client_id, "collection handshake complete");

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tokio::spawn(io_loop(write, read, cmd_rx));

        Ok(Self {
            cmd_tx,
            next_request: AtomicU64::new(1),
            client_id,
        })
    }

    /// Our client id on this connection
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Send one request and wait for its correlated reply
    async fn request(
        &self,
        make: impl FnOnce(RequestId) -> ClientMessage,
        events: Option<mpsc::UnboundedSender<ChangeEvent>>,
    ) -> RemoteResult<ServerMessage> {
        let id = self.next_request.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();

        self.cmd_tx
            .send(IoCommand::Request {
                id,
                msg: make(id),
                events,
                reply: reply_tx,
            })
            .map_err(|_| RemoteError::Closed)?;

        reply_rx.await.map_err(|_| RemoteError::Closed)?
    }
}

impl RemoteCollection for WsCollection {
    async fn snapshot(&self) -> RemoteResult<Vec<(String, TaskPayload)>> {
        let reply = self
            .request(|id| ClientMessage::Snapshot { request: id }, None)
            .await?;

        match reply {
            ServerMessage::SnapshotData { entries, .. } => Ok(entries
                .into_iter()
                .map(|entry| (entry.key, entry.payload))
                .collect()),
            other => Err(unexpected_reply("snapshot", &other)),
        }
    }

    async fn subscribe(&self, kind: EventKind) -> RemoteResult<Subscription> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let reply = self
            .request(
                |id| ClientMessage::Subscribe { request: id, kind },
                Some(event_tx),
            )
            .await?;

        let ServerMessage::Subscribed { subscription, .. } = reply else {
            return Err(unexpected_reply("subscribe", &reply));
        };

        let cmd_tx = self.cmd_tx.clone();
        Ok(Subscription::new(kind, event_rx, move || {
            // IO task may already be gone; then there is nothing to cancel
            let _ = cmd_tx.send(IoCommand::Unsubscribe { subscription });
        }))
    }

    async fn create(&self, payload: TaskPayload) -> RemoteResult<String> {
        let reply = self
            .request(
                |id| ClientMessage::Create {
                    request: id,
                    payload: payload.clone(),
                },
                None,
            )
            .await?;

        match reply {
            ServerMessage::Created { key, .. } => Ok(key),
            other => Err(unexpected_reply("create", &other)),
        }
    }

    async fn set_completed(&self, key: &str, completed: bool) -> RemoteResult<()> {
        let key = key.to_string();
        let reply = self
            .request(
                |id| ClientMessage::Update {
                    request: id,
                    key,
                    completed,
                },
                None,
            )
            .await?;

        match reply {
            ServerMessage::Done { .. } => Ok(()),
            other => Err(unexpected_reply("update", &other)),
        }
    }

    async fn remove(&self, key: &str) -> RemoteResult<()> {
        let key = key.to_string();
        let reply = self
            .request(|id| ClientMessage::Remove { request: id, key }, None)
            .await?;

        match reply {
            ServerMessage::Done { .. } => Ok(()),
            other => Err(unexpected_reply("remove", &other)),
        }
    }
}

fn unexpected_reply(operation: &str, reply: &ServerMessage) -> RemoteError {
    RemoteError::Protocol(format!("unexpected reply to {}: {:?}", operation, reply))
}

/// Wait for the handshake response
async fn wait_for_welcome(read: &mut WsSource, url: &str) -> RemoteResult<()> {
    let deadline = tokio::time::Instant::now() + HANDSHAKE_TIMEOUT;

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return Err(RemoteError::HandshakeTimeout {
                url: url.to_string(),
            });
        }

        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match ServerMessage::decode(&text)? {
                            ServerMessage::Welcome { server_id } => {
                                debug!(server_id, "collection server welcomed us");
                                return Ok(());
                            }
                            ServerMessage::Error { message, .. } => {
                                return Err(RemoteError::Rejected { message });
                            }
                            _ => {
                                // Ignore other messages during handshake
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(RemoteError::Closed);
                    }
                    Some(Err(e)) => {
                        return Err(e.into());
                    }
                    _ => {}
                }
            }
            _ = tokio::time::sleep(remaining) => {
                return Err(RemoteError::HandshakeTimeout { url: url.to_string() });
            }
        }
    }
}

/// IO task: owns the socket, correlates replies, fans out events
async fn io_loop(
    mut write: WsSink,
    mut read: WsSource,
    mut cmd_rx: mpsc::UnboundedReceiver<IoCommand>,
) {
    let mut pending: HashMap<RequestId, Pending> = HashMap::new();
    let mut subs: HashMap<u64, mpsc::UnboundedSender<ChangeEvent>> = HashMap::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(IoCommand::Request { id, msg, events, reply }) => {
                        let text = msg.encode();
                        pending.insert(id, Pending { reply, events });
                        if let Err(e) = write.send(Message::Text(text)).await {
                            if let Some(p) = pending.remove(&id) {
                                let _ = p.reply.send(Err(e.into()));
                            }
                        }
                    }
                    Some(IoCommand::Unsubscribe { subscription }) => {
                        subs.remove(&subscription);
                        let msg = ClientMessage::Unsubscribe { subscription };
                        if write.send(Message::Text(msg.encode())).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        // Handle dropped; close the socket and stop
                        let _ = write.close().await;
                        break;
                    }
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        dispatch_server_message(&text, &mut pending, &mut subs);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("collection server closed the connection");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "collection socket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // In-flight requests will never resolve; fail them all
    for (_, p) in pending.drain() {
        let _ = p.reply.send(Err(RemoteError::Closed));
    }
    // Dropping the event senders ends every live feed
    drop(subs);
}

fn dispatch_server_message(
    text: &str,
    pending: &mut HashMap<RequestId, Pending>,
    subs: &mut HashMap<u64, mpsc::UnboundedSender<ChangeEvent>>,
) {
    let msg = match ServerMessage::decode(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, "failed to decode server message");
            return;
        }
    };

    match msg {
        ServerMessage::Event {
            subscription,
            kind,
            key,
            payload,
        } => {
            // Already-unsubscribed feeds just drop their late events
            let Some(tx) = subs.get(&subscription) else {
                return;
            };
            let event = match (kind, payload) {
                (EventKind::Added, Some(payload)) => ChangeEvent::Added { key, payload },
                (EventKind::Changed, Some(payload)) => ChangeEvent::Changed { key, payload },
                (EventKind::Removed, _) => ChangeEvent::Removed { key },
                (kind, None) => {
                    warn!(?kind, "event missing payload");
                    return;
                }
            };
            if tx.send(event).is_err() {
                subs.remove(&subscription);
            }
        }

        ServerMessage::Error {
            request: Some(id),
            message,
        } => {
            if let Some(p) = pending.remove(&id) {
                let _ = p.reply.send(Err(RemoteError::Rejected { message }));
            } else {
                warn!(message, "server error for unknown request");
            }
        }

        ServerMessage::Error {
            request: None,
            message,
        } => {
            warn!(message, "collection server error");
        }

        other => {
            let Some(id) = other.request_id() else {
                warn!(message = ?other, "unsolicited server message");
                return;
            };
            let Some(Pending { reply, events }) = pending.remove(&id) else {
                warn!(request = id, "reply for unknown request");
                return;
            };
            if let (ServerMessage::Subscribed { subscription, .. }, Some(event_tx)) =
                (&other, events)
            {
                subs.insert(*subscription, event_tx);
            }
            let _ = reply.send(Ok(other));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_reply() -> (
        oneshot::Receiver<RemoteResult<ServerMessage>>,
        Pending,
    ) {
        let (tx, rx) = oneshot::channel();
        (
            rx,
            Pending {
                reply: tx,
                events: None,
            },
        )
    }

    #[tokio::test]
    async fn test_dispatch_correlates_reply() {
        let mut pending = HashMap::new();
        let mut subs = HashMap::new();

        let (rx, p) = pending_reply();
        pending.insert(5, p);

        dispatch_server_message(r#"{"type":"done","request":5}"#, &mut pending, &mut subs);

        let reply = rx.await.unwrap().unwrap();
        assert!(matches!(reply, ServerMessage::Done { request: 5 }));
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_rejection_resolves_as_error() {
        let mut pending = HashMap::new();
        let mut subs = HashMap::new();

        let (rx, p) = pending_reply();
        pending.insert(8, p);

        dispatch_server_message(
            r#"{"type":"error","request":8,"message":"no such key"}"#,
            &mut pending,
            &mut subs,
        );

        let reply = rx.await.unwrap();
        assert!(matches!(reply, Err(RemoteError::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_dispatch_registers_subscription_then_routes_events() {
        let mut pending = HashMap::new();
        let mut subs = HashMap::new();

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = oneshot::channel();
        pending.insert(
            1,
            Pending {
                reply: reply_tx,
                events: Some(event_tx),
            },
        );

        dispatch_server_message(
            r#"{"type":"subscribed","request":1,"subscription":77}"#,
            &mut pending,
            &mut subs,
        );
        assert!(reply_rx.await.unwrap().is_ok());
        assert!(subs.contains_key(&77));

        dispatch_server_message(
            r#"{"type":"event","subscription":77,"kind":"added","key":"k-1","payload":{"text":"Buy milk"}}"#,
            &mut pending,
            &mut subs,
        );

        let event = event_rx.recv().await.unwrap();
        assert_eq!(event.key(), "k-1");
        assert_eq!(event.kind(), EventKind::Added);
    }

    #[tokio::test]
    async fn test_dispatch_drops_event_for_unknown_subscription() {
        let mut pending = HashMap::new();
        let mut subs: HashMap<u64, mpsc::UnboundedSender<ChangeEvent>> = HashMap::new();

        // Must not panic or register anything
        dispatch_server_message(
            r#"{"type":"event","subscription":9,"kind":"removed","key":"k-1"}"#,
            &mut pending,
            &mut subs,
        );
        assert!(subs.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_prunes_closed_event_channel() {
        let mut pending = HashMap::new();
        let mut subs = HashMap::new();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        subs.insert(3, event_tx);
        drop(event_rx);

        dispatch_server_message(
            r#"{"type":"event","subscription":3,"kind":"removed","key":"k-1"}"#,
            &mut pending,
            &mut subs,
        );
        assert!(!subs.contains_key(&3));
    }
}
