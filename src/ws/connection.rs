#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::fmt::Debug;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use backoff::backoff::Backoff as _;
use futures::{SinkExt as _, StreamExt as _};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, sleep, timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use uuid::Uuid;

use super::config::{Config, LinearBackoff};
use super::error::WsError;
use super::handshake::Handshake;
use super::traits::{MessageParser, MessageRouter};
use crate::Result;
use crate::error::Error;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected, and no automatic recovery is pending
    Disconnected,
    /// First handshake in flight
    Connecting,
    /// Successfully connected
    Connected {
        /// When the connection was established
        since: Instant,
        /// Id sent with this connection's handshake
        id: Uuid,
    },
    /// Transport dropped; waiting for or performing a reconnection attempt
    Reconnecting {
        /// Current reconnection attempt number
        attempt: u32,
    },
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Check if a transport exists that is connected or working on becoming so.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    /// Id of the live connection, if any.
    #[must_use]
    pub const fn connection_id(self) -> Option<Uuid> {
        match self {
            Self::Connected { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Requests from the owning client to the connection task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Reconnect,
    Shutdown,
}

/// Why a live connection stopped being serviced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Dropped,
    Reconnect,
    Shutdown,
}

/// Outcome of one handshake attempt.
enum Establish {
    Connected(Box<WsStream>, Uuid),
    Failed(Error),
    Control(Control),
}

/// Manages the WebSocket connection lifecycle, reconnection, and heartbeat.
///
/// This connection manager handles all transport concerns:
/// - Performing the handshake with the bearer token attached
/// - Automatic reconnection with bounded linear backoff
/// - Heartbeat monitoring via WebSocket ping/pong frames
/// - Handing every parsed inbound message to a [`MessageRouter`] in arrival order
///
/// Only the first handshake's outcome is reported to the caller of [`ConnectionManager::open`].
/// Later failures are logged and retried until the reconnect budget is spent.
///
/// # Example
///
/// ```ignore
/// let (connection, first) = ConnectionManager::open(handshake, config, parser, router);
/// first.await??;
/// connection.send(&request)?;
/// ```
#[derive(Clone, Debug)]
pub struct ConnectionManager {
    /// Watch channel sender for state changes (enables reconnection detection)
    state_tx: watch::Sender<ConnectionState>,
    /// Watch channel receiver for state changes (for use in checking the current state)
    state_rx: watch::Receiver<ConnectionState>,
    /// Sender channel for outgoing messages
    sender_tx: mpsc::UnboundedSender<String>,
    /// Sender channel for lifecycle requests
    control_tx: mpsc::UnboundedSender<Control>,
    /// Reconnection attempts since the last successful handshake
    attempts: Arc<AtomicU32>,
}

impl ConnectionManager {
    /// Start the connection loop.
    ///
    /// The returned receiver resolves once with the outcome of the first handshake. On failure
    /// the loop has already stopped; on success it keeps the connection alive according to the
    /// config's `ReconnectConfig`.
    pub fn open<M, P, R>(
        handshake: Handshake,
        config: Config,
        parser: P,
        router: R,
    ) -> (Self, oneshot::Receiver<Result<()>>)
    where
        M: Debug + Send + 'static,
        P: MessageParser<M>,
        R: MessageRouter<M>,
    {
        let (sender_tx, sender_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (first_tx, first_rx) = oneshot::channel();
        let attempts = Arc::new(AtomicU32::new(0));

        let task = ConnectionTask {
            handshake,
            config,
            parser,
            router,
            state_tx: state_tx.clone(),
            attempts: Arc::clone(&attempts),
        };

        tokio::spawn(async move {
            task.run::<M>(sender_rx, control_rx, first_tx).await;
        });

        (
            Self {
                state_tx,
                state_rx,
                sender_tx,
                control_tx,
                attempts,
            },
            first_rx,
        )
    }

    /// Serialize `request` and queue it for the live socket.
    ///
    /// Frames that reach the task while the transport is down are discarded, not replayed.
    pub fn send<R: Serialize>(&self, request: &R) -> Result<()> {
        let json = serde_json::to_string(request)?;
        self.send_text(json)
    }

    /// Queue a pre-encoded text frame.
    pub fn send_text(&self, text: String) -> Result<()> {
        self.sender_tx
            .send(text)
            .map_err(|_e| WsError::ConnectionClosed)?;
        Ok(())
    }

    /// Drop the live socket (or skip a pending backoff wait) and handshake again.
    ///
    /// After the reconnect budget was exhausted this starts a fresh round of attempts.
    pub fn reconnect(&self) {
        if self.control_tx.send(Control::Reconnect).is_err() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Reconnect requested after the connection task stopped");
        }
    }

    /// Close the socket and stop the connection task.
    pub fn shutdown(&self) {
        _ = self.control_tx.send(Control::Shutdown);
        _ = self.state_tx.send(ConnectionState::Disconnected);
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Id of the live connection, if any.
    #[must_use]
    pub fn connection_id(&self) -> Option<Uuid> {
        self.state().connection_id()
    }

    /// Reconnection attempts since the last successful handshake.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }
}

/// State owned by the background task.
struct ConnectionTask<P, R> {
    handshake: Handshake,
    config: Config,
    parser: P,
    router: R,
    state_tx: watch::Sender<ConnectionState>,
    attempts: Arc<AtomicU32>,
}

impl<P, R> ConnectionTask<P, R> {
    /// Main connection loop with automatic reconnection.
    async fn run<M>(
        self,
        mut sender_rx: mpsc::UnboundedReceiver<String>,
        mut control_rx: mpsc::UnboundedReceiver<Control>,
        first_tx: oneshot::Sender<Result<()>>,
    ) where
        M: Debug + Send + 'static,
        P: MessageParser<M>,
        R: MessageRouter<M>,
    {
        let mut first_tx = Some(first_tx);
        let mut attempt = 0_u32;
        let mut backoff: LinearBackoff = self.config.reconnect.clone().into();

        loop {
            self.set_state(if attempt == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting { attempt }
            });

            match self.establish(&mut sender_rx, &mut control_rx).await {
                Establish::Connected(ws_stream, id) => {
                    attempt = 0;
                    self.attempts.store(0, Ordering::Release);
                    backoff.reset();
                    self.set_state(ConnectionState::Connected {
                        since: Instant::now(),
                        id,
                    });

                    if let Some(tx) = first_tx.take() {
                        self.router.wire();
                        #[cfg(feature = "tracing")]
                        tracing::info!(endpoint = %self.handshake.endpoint(), %id, "Connected");
                        _ = tx.send(Ok(()));
                    } else {
                        #[cfg(feature = "tracing")]
                        tracing::info!(endpoint = %self.handshake.endpoint(), %id, "Reconnected");
                    }

                    match self
                        .handle_connection::<M>(*ws_stream, &mut sender_rx, &mut control_rx)
                        .await
                    {
                        Ok(Exit::Shutdown) => break,
                        Ok(Exit::Reconnect) => continue,
                        Ok(Exit::Dropped) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(%id, "Connection dropped");
                        }
                        Err(e) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(%id, error = %e, "Connection lost");
                            #[cfg(not(feature = "tracing"))]
                            let _ = &e;
                        }
                    }
                }
                Establish::Failed(error) => {
                    if let Some(tx) = first_tx.take() {
                        #[cfg(feature = "tracing")]
                        tracing::error!(endpoint = %self.handshake.endpoint(), %error, "Unable to connect");
                        self.set_state(ConnectionState::Disconnected);
                        _ = tx.send(Err(error));
                        return;
                    }

                    #[cfg(feature = "tracing")]
                    tracing::warn!(attempt, %error, "Reconnection attempt failed");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &error;
                }
                Establish::Control(Control::Reconnect) => continue,
                Establish::Control(Control::Shutdown) => break,
            }

            let next = attempt.saturating_add(1);
            if !self.config.reconnect.allows(next) {
                #[cfg(feature = "tracing")]
                tracing::warn!(attempts = attempt, "Reconnection attempts exhausted, giving up");
                self.set_state(ConnectionState::Disconnected);

                match Self::wait_for_control(&mut sender_rx, &mut control_rx).await {
                    Control::Reconnect => {
                        attempt = 0;
                        self.attempts.store(0, Ordering::Release);
                        backoff.reset();
                        continue;
                    }
                    Control::Shutdown => break,
                }
            }

            attempt = next;
            self.attempts.store(attempt, Ordering::Release);
            self.set_state(ConnectionState::Reconnecting { attempt });

            let delay = backoff
                .next_backoff()
                .unwrap_or(self.config.reconnect.max_delay);
            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, ?delay, "Scheduling reconnection attempt");

            let mut wait = pin!(sleep(delay));
            let stop = loop {
                tokio::select! {
                    () = &mut wait => break false,
                    control = control_rx.recv() => match control {
                        Some(Control::Reconnect) => break false,
                        Some(Control::Shutdown) | None => break true,
                    },
                    Some(text) = sender_rx.recv() => discard_outbound(&text),
                }
            };
            if stop {
                break;
            }
        }

        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&self, state: ConnectionState) {
        _ = self.state_tx.send(state);
    }

    /// Perform one handshake, honoring shutdown requests while it is in flight.
    async fn establish(
        &self,
        sender_rx: &mut mpsc::UnboundedReceiver<String>,
        control_rx: &mut mpsc::UnboundedReceiver<Control>,
    ) -> Establish {
        let id = Uuid::new_v4();
        let request = match self.handshake.request(id) {
            Ok(request) => request,
            Err(e) => return Establish::Failed(e),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            endpoint = %self.handshake.endpoint(),
            %id,
            authenticated = self.handshake.has_token(),
            "Opening WebSocket"
        );

        let mut handshake = pin!(timeout(self.config.connect_timeout, connect_async(request)));

        loop {
            tokio::select! {
                outcome = &mut handshake => {
                    return match outcome {
                        Ok(Ok((ws_stream, _))) => Establish::Connected(Box::new(ws_stream), id),
                        Ok(Err(e)) => Establish::Failed(WsError::from_handshake(e).into()),
                        Err(_elapsed) => Establish::Failed(
                            WsError::ConnectTimeout {
                                after: self.config.connect_timeout,
                            }
                            .into(),
                        ),
                    };
                }
                control = control_rx.recv() => match control {
                    Some(Control::Reconnect) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("Handshake already in flight, ignoring reconnect request");
                    }
                    Some(Control::Shutdown) | None => return Establish::Control(Control::Shutdown),
                },
                Some(text) = sender_rx.recv() => discard_outbound(&text),
            }
        }
    }

    /// Park until the owner asks for a reconnect or a shutdown.
    async fn wait_for_control(
        sender_rx: &mut mpsc::UnboundedReceiver<String>,
        control_rx: &mut mpsc::UnboundedReceiver<Control>,
    ) -> Control {
        loop {
            tokio::select! {
                control = control_rx.recv() => return control.unwrap_or(Control::Shutdown),
                Some(text) = sender_rx.recv() => discard_outbound(&text),
            }
        }
    }

    /// Handle an active WebSocket connection.
    async fn handle_connection<M>(
        &self,
        ws_stream: WsStream,
        sender_rx: &mut mpsc::UnboundedReceiver<String>,
        control_rx: &mut mpsc::UnboundedReceiver<Control>,
    ) -> Result<Exit>
    where
        M: Debug + Send + 'static,
        P: MessageParser<M>,
        R: MessageRouter<M>,
    {
        let (mut write, mut read) = ws_stream.split();

        // Channel to notify heartbeat loop when a pong frame is received
        let (pong_tx, pong_rx) = watch::channel(Instant::now());
        let (ping_tx, mut ping_rx) = mpsc::unbounded_channel();

        let state_rx = self.state_tx.subscribe();
        let heartbeat_config = self.config.clone();
        let heartbeat_handle = tokio::spawn(async move {
            heartbeat_loop(ping_tx, state_rx, &heartbeat_config, pong_rx).await;
        });

        let exit = loop {
            tokio::select! {
                // Handle incoming messages
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Pong(_))) => {
                            _ = pong_tx.send(Instant::now());
                        }
                        Some(Ok(Message::Text(text))) => {
                            #[cfg(feature = "tracing")]
                            tracing::trace!(%text, "Received WebSocket text message");

                            match self.parser.parse(text.as_bytes()) {
                                Ok(messages) => {
                                    for message in messages {
                                        #[cfg(feature = "tracing")]
                                        tracing::trace!(?message, "Parsed WebSocket message");
                                        self.router.route(message);
                                    }
                                }
                                Err(e) => {
                                    #[cfg(feature = "tracing")]
                                    tracing::warn!(%text, error = %e, "Failed to parse WebSocket message");
                                    #[cfg(not(feature = "tracing"))]
                                    let _ = (&text, &e);
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            break Err(WsError::ConnectionClosed.into());
                        }
                        Some(Err(e)) => {
                            break Err(WsError::Connection(e).into());
                        }
                        Some(Ok(_)) => {
                            // Binary frames are ignored. Pings are answered by tungstenite.
                        }
                    }
                }

                // Handle outgoing messages from the client
                Some(text) = sender_rx.recv() => {
                    if write.send(Message::Text(text.into())).await.is_err() {
                        break Ok(Exit::Dropped);
                    }
                }

                // Handle ping requests from heartbeat loop
                ping = ping_rx.recv() => {
                    if ping.is_none() {
                        break Err(WsError::HeartbeatTimeout.into());
                    }
                    if write.send(Message::Ping(Vec::<u8>::new().into())).await.is_err() {
                        break Ok(Exit::Dropped);
                    }
                }

                control = control_rx.recv() => {
                    let exit = match control {
                        Some(Control::Reconnect) => Exit::Reconnect,
                        Some(Control::Shutdown) | None => Exit::Shutdown,
                    };
                    _ = write.send(Message::Close(None)).await;
                    break Ok(exit);
                }
            }
        };

        // Cleanup
        heartbeat_handle.abort();

        exit
    }
}

/// Heartbeat loop that requests WebSocket ping frames and monitors the pong replies.
///
/// Uses protocol-level control frames, which every RFC 6455 server answers.
///
/// Returning drops `ping_tx`, which the message loop treats as a dead connection.
async fn heartbeat_loop(
    ping_tx: mpsc::UnboundedSender<()>,
    state_rx: watch::Receiver<ConnectionState>,
    config: &Config,
    mut pong_rx: watch::Receiver<Instant>,
) {
    let start = tokio::time::Instant::now() + config.heartbeat_interval;
    let mut ping_interval = interval_at(start, config.heartbeat_interval);

    loop {
        ping_interval.tick().await;

        if !state_rx.borrow().is_connected() {
            break;
        }

        // Mark the current pong as seen so changed() only fires for a fresh one
        drop(pong_rx.borrow_and_update());

        let ping_sent = Instant::now();
        if ping_tx.send(()).is_err() {
            // Message loop has terminated
            break;
        }

        match timeout(config.heartbeat_timeout, pong_rx.changed()).await {
            Ok(Ok(())) => {
                let last_pong = *pong_rx.borrow_and_update();
                if last_pong < ping_sent {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        "Pong received but older than last ping, connection may be stale"
                    );
                    break;
                }
            }
            Ok(Err(_)) => {
                // Channel closed, connection is terminating
                break;
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Heartbeat timeout: no pong received within {:?}",
                    config.heartbeat_timeout
                );
                break;
            }
        }
    }
}

fn discard_outbound(text: &str) {
    #[cfg(feature = "tracing")]
    tracing::warn!(%text, "Transport is down, dropping outbound message");
    #[cfg(not(feature = "tracing"))]
    let _ = text;
}
