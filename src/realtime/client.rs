use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_stream::try_stream;
use futures::Stream;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use super::dispatcher::{Dispatcher, FrameParser};
use super::registry::{EventRegistry, Unsubscribe};
use super::subscription::{ChannelSubscriptions, send_if_connected};
use super::types::request::{ChannelKind, Convention, OutboundMessage};
use super::types::response::{
    BookingUpdate, ChargerStatusUpdate, CommandResult, EventName, FaultAlert, Frame, InboundEvent,
    MeterValues, Notification, SessionUpdate, StationUpdate, SystemMessage, TransactionUpdate,
};
use crate::auth::TokenStore;
use crate::ws::config::Config;
use crate::ws::{ConnectionManager, ConnectionState, Handshake, WsError};
use crate::{DEFAULT_ENDPOINT, ENDPOINT_VAR, Result};

const EVENTS_CAPACITY: usize = 1024;

/// Real-time client for the charging dashboard.
///
/// One client owns at most one transport and one handler registry. Handlers registered with
/// [`Client::on`] (or a typed wrapper) survive automatic reconnection and are only forgotten by
/// [`Client::disconnect`]. Cloning is cheap and every clone shares the same state.
///
/// # Examples
///
/// ```rust, no_run
/// use evcharge_realtime::auth::MemoryTokenStore;
/// use evcharge_realtime::realtime::Client;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = Client::from_env(MemoryTokenStore::with_token("jwt"))?;
///
///     let _status = client.on_charger_status(|update| {
///         println!("{} is {}", update.charger_id, update.status);
///     });
///
///     client.connect(None).await?;
///     client.subscribe_to_charger("CH001");
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    /// Endpoint used when `connect` is called without one
    endpoint: String,
    config: Config,
    tokens: Arc<dyn TokenStore>,
    registry: Arc<EventRegistry<InboundEvent>>,
    /// Publishes every dispatched event to `events()` streams
    events: broadcast::Sender<InboundEvent>,
    /// The live transport, if `connect` was called and `disconnect` was not
    connection: Mutex<Option<Connection>>,
}

#[derive(Clone)]
struct Connection {
    manager: ConnectionManager,
    dispatcher: Arc<Dispatcher>,
}

impl Connection {
    fn close(&self) {
        self.dispatcher.retire();
        self.manager.shutdown();
    }
}

impl Client {
    /// Create a client for `endpoint` with the given transport configuration.
    ///
    /// No connection is made until [`Client::connect`].
    pub fn new<T: TokenStore>(endpoint: &str, config: Config, tokens: T) -> Result<Self> {
        let endpoint = Handshake::new(endpoint, None)?.endpoint().to_string();
        let (events, _) = broadcast::channel(EVENTS_CAPACITY);

        Ok(Self {
            inner: Arc::new(ClientInner {
                endpoint,
                config,
                tokens: Arc::new(tokens),
                registry: Arc::new(EventRegistry::new()),
                events,
                connection: Mutex::new(None),
            }),
        })
    }

    /// Create a client for the endpoint in `EVCHARGE_WS_URL`, or `ws://localhost:3001`.
    pub fn from_env<T: TokenStore>(tokens: T) -> Result<Self> {
        let endpoint = std::env::var(ENDPOINT_VAR).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_owned());
        Self::new(&endpoint, Config::default(), tokens)
    }

    /// Endpoint used when [`Client::connect`] is given none.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Open the transport and wait for the first handshake.
    ///
    /// Returns immediately when a transport already exists and is connected, connecting or
    /// reconnecting; in particular a second call made while the first handshake is in flight
    /// does not wait for its outcome. Only a failure of the first handshake is reported here.
    /// Later drops are retried in the background and show up only through
    /// [`Client::is_connected`].
    ///
    /// The bearer token is read from the token store once per call.
    pub async fn connect(&self, endpoint: Option<&str>) -> Result<()> {
        let (first, dispatcher) = {
            let mut slot = self
                .inner
                .connection
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if let Some(existing) = slot.as_ref() {
                let state = existing.manager.state();
                if state.is_active() {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(?state, "Transport already active, not connecting again");
                    return Ok(());
                }
                existing.close();
            }

            let endpoint = endpoint.unwrap_or(&self.inner.endpoint);
            let handshake = Handshake::new(endpoint, self.inner.tokens.token())?;
            let dispatcher = Arc::new(Dispatcher::new(
                Arc::clone(&self.inner.registry),
                self.inner.events.clone(),
            ));
            let (manager, first) = ConnectionManager::open::<Frame, _, _>(
                handshake,
                self.inner.config.clone(),
                FrameParser,
                Arc::clone(&dispatcher),
            );

            *slot = Some(Connection {
                manager,
                dispatcher: Arc::clone(&dispatcher),
            });
            (first, dispatcher)
        };

        match first.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.release(&dispatcher);
                Err(e)
            }
            Err(_closed) => {
                self.release(&dispatcher);
                Err(WsError::ConnectionClosed.into())
            }
        }
    }

    /// Free the slot if it still holds the connection served by `dispatcher`.
    fn release(&self, dispatcher: &Arc<Dispatcher>) {
        let mut slot = self
            .inner
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot
            .as_ref()
            .is_some_and(|connection| Arc::ptr_eq(&connection.dispatcher, dispatcher))
            && let Some(connection) = slot.take()
        {
            connection.close();
        }
    }

    /// Close the transport and forget every registered handler.
    ///
    /// Messages still in flight from the closed transport are never delivered.
    pub fn disconnect(&self) {
        let connection = self
            .inner
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(connection) = connection {
            connection.close();
            #[cfg(feature = "tracing")]
            tracing::info!("Disconnected");
        }

        self.inner.registry.clear();
    }

    /// Ask the transport to handshake again. Does nothing before [`Client::connect`].
    pub fn reconnect(&self) {
        match self.connection() {
            Some(connection) => connection.manager.reconnect(),
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Reconnect requested without a transport");
            }
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection()
            .is_some_and(|connection| connection.manager.is_connected())
    }

    /// Id of the live connection, as sent in the handshake.
    #[must_use]
    pub fn id(&self) -> Option<Uuid> {
        self.connection()
            .and_then(|connection| connection.manager.connection_id())
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection()
            .map_or(ConnectionState::Disconnected, |connection| {
                connection.manager.state()
            })
    }

    /// Reconnection attempts since the last successful handshake.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.connection()
            .map_or(0, |connection| connection.manager.reconnect_attempts())
    }

    fn connection(&self) -> Option<Connection> {
        self.inner
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn manager(&self) -> Option<ConnectionManager> {
        self.connection().map(|connection| connection.manager)
    }

    /// Register `handler` for inbound `event`.
    ///
    /// Handlers for the same event run in registration order. A panicking handler is logged and
    /// does not affect the others. Every recognized event reaches these handlers, including ones
    /// whose payload did not decode ([`InboundEvent::Raw`]).
    pub fn on<S, F>(&self, event: S, handler: F) -> Unsubscribe
    where
        S: Into<String>,
        F: Fn(&InboundEvent) + Send + Sync + 'static,
    {
        self.inner.registry.on(event, handler)
    }

    /// Typed registration. Events delivered as [`InboundEvent::Raw`] are skipped; use
    /// [`Client::on`] to see those too.
    fn on_payload<T, F>(
        &self,
        name: EventName,
        extract: fn(&InboundEvent) -> Option<&T>,
        handler: F,
    ) -> Unsubscribe
    where
        T: 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on(name.as_str(), move |event| {
            if let Some(payload) = extract(event) {
                handler(payload);
            }
        })
    }

    /// Run `handler` for every decoded `chargerStatus` event.
    pub fn on_charger_status<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&ChargerStatusUpdate) + Send + Sync + 'static,
    {
        self.on_payload(
            EventName::ChargerStatus,
            InboundEvent::as_charger_status,
            handler,
        )
    }

    /// Run `handler` for every decoded `transactionUpdate` event.
    pub fn on_transaction_update<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&TransactionUpdate) + Send + Sync + 'static,
    {
        self.on_payload(
            EventName::TransactionUpdate,
            InboundEvent::as_transaction_update,
            handler,
        )
    }

    /// Run `handler` for every decoded `meterValues` event.
    pub fn on_meter_values<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&MeterValues) + Send + Sync + 'static,
    {
        self.on_payload(EventName::MeterValues, InboundEvent::as_meter_values, handler)
    }

    /// Run `handler` for every decoded `faultAlert` event.
    pub fn on_fault_alert<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&FaultAlert) + Send + Sync + 'static,
    {
        self.on_payload(EventName::FaultAlert, InboundEvent::as_fault_alert, handler)
    }

    /// Run `handler` for every decoded `commandResult` event.
    pub fn on_command_result<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&CommandResult) + Send + Sync + 'static,
    {
        self.on_payload(
            EventName::CommandResult,
            InboundEvent::as_command_result,
            handler,
        )
    }

    /// Run `handler` for every decoded `systemMessage` event.
    pub fn on_system_message<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&SystemMessage) + Send + Sync + 'static,
    {
        self.on_payload(
            EventName::SystemMessage,
            InboundEvent::as_system_message,
            handler,
        )
    }

    /// Run `handler` for every decoded `booking:update` event.
    pub fn on_booking_update<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&BookingUpdate) + Send + Sync + 'static,
    {
        self.on_payload(
            EventName::BookingUpdate,
            InboundEvent::as_booking_update,
            handler,
        )
    }

    /// Run `handler` for every decoded `station:update` event.
    pub fn on_station_update<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&StationUpdate) + Send + Sync + 'static,
    {
        self.on_payload(
            EventName::StationUpdate,
            InboundEvent::as_station_update,
            handler,
        )
    }

    /// Run `handler` for every decoded `session:update` event.
    pub fn on_session_update<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&SessionUpdate) + Send + Sync + 'static,
    {
        self.on_payload(
            EventName::SessionUpdate,
            InboundEvent::as_session_update,
            handler,
        )
    }

    /// Run `handler` for every decoded `notification:new` event.
    pub fn on_notification<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.on_payload(EventName::Notification, InboundEvent::as_notification, handler)
    }

    /// Forget every registered handler without touching the transport.
    pub fn clear_listeners(&self) {
        self.inner.registry.clear();
    }

    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.registry.listener_count(event)
    }

    /// Stream of every dispatched event, across reconnections and later `connect` calls.
    ///
    /// A consumer that falls too far behind receives [`WsError::Lagged`] and then continues
    /// with the newest events.
    pub fn events(&self) -> impl Stream<Item = Result<InboundEvent>> + use<> {
        let mut rx = self.inner.events.subscribe();

        try_stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(RecvError::Lagged(n)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Event stream lagged, missed {n} events");
                        Err(WsError::Lagged { count: n })?;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    /// Send an arbitrary event. Dropped with a warning while not connected.
    pub fn emit<S: Into<String>>(&self, event: S, data: Value) {
        send_if_connected(self.manager().as_ref(), &OutboundMessage::new(event, data));
    }

    /// Send an event and run `callback` with the backend's acknowledgement.
    ///
    /// The callback runs at most once. It never runs if the message is dropped because the
    /// client is not connected, or if the transport is closed before the reply arrives.
    pub fn emit_with_ack<S, F>(&self, event: S, data: Value, callback: F)
    where
        S: Into<String>,
        F: FnOnce(Value) + Send + 'static,
    {
        let message = OutboundMessage::new(event, data);
        let Some(connection) = self
            .connection()
            .filter(|connection| connection.manager.is_connected())
        else {
            send_if_connected(None, &message);
            return;
        };

        let ack = connection.dispatcher.register_ack(callback);
        if !send_if_connected(Some(&connection.manager), &message.with_ack(ack)) {
            connection.dispatcher.cancel_ack(ack);
        }
    }

    fn subscriptions(&self) -> ChannelSubscriptions {
        ChannelSubscriptions::new(self.manager())
    }

    pub fn subscribe_to_charger<S: Into<String>>(&self, charger_id: S) {
        self.subscriptions().subscribe_to_charger(charger_id);
    }

    pub fn unsubscribe_from_charger<S: Into<String>>(&self, charger_id: S) {
        self.subscriptions().unsubscribe_from_charger(charger_id);
    }

    pub fn subscribe_to_station<S: Into<String>>(&self, station_id: S) {
        self.subscriptions().subscribe_to_station(station_id);
    }

    pub fn unsubscribe_from_station<S: Into<String>>(&self, station_id: S) {
        self.subscriptions().unsubscribe_from_station(station_id);
    }

    pub fn subscribe_to_booking<S: Into<String>>(&self, booking_id: S) {
        self.subscriptions().subscribe_to_booking(booking_id);
    }

    pub fn unsubscribe_from_booking<S: Into<String>>(&self, booking_id: S) {
        self.subscriptions().unsubscribe_from_booking(booking_id);
    }

    pub fn subscribe_to_session<S: Into<String>>(&self, session_id: S) {
        self.subscriptions().subscribe_to_session(session_id);
    }

    pub fn unsubscribe_from_session<S: Into<String>>(&self, session_id: S) {
        self.subscriptions().unsubscribe_from_session(session_id);
    }

    /// Join a channel with an explicit naming convention.
    pub fn subscribe<S: Into<String>>(&self, kind: ChannelKind, id: S, convention: Convention) {
        self.subscriptions().subscribe(kind, id, convention);
    }

    /// Leave a channel with an explicit naming convention.
    pub fn unsubscribe<S: Into<String>>(&self, kind: ChannelKind, id: S, convention: Convention) {
        self.subscriptions().unsubscribe(kind, id, convention);
    }

    pub fn update_location(&self, lat: f64, lng: f64) {
        self.subscriptions().update_location(lat, lng);
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.inner.endpoint)
            .field("state", &self.connection_state())
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::auth::MemoryTokenStore;
    use crate::error::Kind;

    fn client() -> Client {
        Client::new("ws://127.0.0.1:9", Config::default(), MemoryTokenStore::new()).unwrap()
    }

    #[test]
    fn new_rejects_invalid_endpoint() {
        let err = Client::new("", Config::default(), MemoryTokenStore::new()).unwrap_err();
        assert_eq!(err.kind(), Kind::Validation);
    }

    #[test]
    fn new_normalizes_http_endpoint() {
        let client = Client::new(
            "https://dashboard.example.com/realtime",
            Config::default(),
            MemoryTokenStore::new(),
        )
        .unwrap();

        assert_eq!(client.endpoint(), "wss://dashboard.example.com/realtime");
    }

    #[test]
    fn fresh_client_is_disconnected() {
        let client = client();

        assert!(!client.is_connected());
        assert_eq!(client.id(), None);
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
        assert_eq!(client.reconnect_attempts(), 0);
    }

    #[test]
    fn operations_while_disconnected_are_noops() {
        let client = client();
        let acked = Arc::new(Mutex::new(false));

        client.subscribe_to_charger("X");
        client.unsubscribe_from_session("S-1");
        client.update_location(1.0, 2.0);
        client.emit("ping", Value::Null);
        {
            let acked = Arc::clone(&acked);
            client.emit_with_ack("startCharging", json!({ "chargerId": "X" }), move |_| {
                *acked.lock().unwrap() = true;
            });
        }
        client.reconnect();

        assert!(!*acked.lock().unwrap());
        assert!(!client.is_connected());
    }

    #[test]
    fn typed_wrappers_register_under_event_name() {
        let client = client();

        let status = client.on_charger_status(|_| {});
        let _booking = client.on_booking_update(|_| {});
        let _notification = client.on_notification(|_| {});

        assert_eq!(client.listener_count("chargerStatus"), 1);
        assert_eq!(client.listener_count("booking:update"), 1);
        assert_eq!(client.listener_count("notification:new"), 1);

        status.unsubscribe();
        assert_eq!(client.listener_count("chargerStatus"), 0);
    }

    #[test]
    fn disconnect_clears_listeners_even_without_transport() {
        let client = client();
        let _handle = client.on("faultAlert", |_| {});
        let clone = client.clone();

        clone.disconnect();

        assert_eq!(client.listener_count("faultAlert"), 0);
    }

    #[test]
    fn client_is_shareable_across_tasks() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<Client>();
        assert_send_sync::<Dispatcher>();
    }

    #[test]
    fn ack_callbacks_only_need_to_be_send() {
        let client = client();
        let fired = std::cell::Cell::new(false);

        client.emit_with_ack("getConfiguration", Value::Null, move |_| fired.set(true));

        assert!(!client.is_connected());
    }

    #[test]
    fn clear_listeners_keeps_client_usable() {
        let client = client();
        let _first = client.on("meterValues", |_| {});
        client.clear_listeners();
        let _second = client.on("meterValues", |_| {});

        assert_eq!(client.listener_count("meterValues"), 1);
    }
}
