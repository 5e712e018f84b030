use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;

use super::registry::{EventRegistry, panic_message};
use super::types::response::{EventName, Frame, InboundEvent, parse_frames};
use crate::ws::{MessageParser, MessageRouter};

/// Callbacks are only `Send`; the mutex makes the map `Sync`.
type AckCallback = Mutex<Box<dyn FnOnce(Value) + Send>>;

/// Parses text frames into [`Frame`]s for the connection task.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameParser;

impl MessageParser<Frame> for FrameParser {
    fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<Frame>> {
        parse_frames(bytes)
    }
}

/// Fans inbound frames of one connection out to the shared registry.
///
/// Nothing is delivered before [`MessageRouter::wire`] or after [`Dispatcher::retire`]. Every
/// recognized event is handed to the registry under its own name and then published to
/// [`crate::realtime::Client::events`] streams, typed when its payload decodes and as
/// [`InboundEvent::Raw`] when it does not.
pub struct Dispatcher {
    registry: Arc<EventRegistry<InboundEvent>>,
    events: broadcast::Sender<InboundEvent>,
    pending_acks: DashMap<u64, AckCallback>,
    next_ack: AtomicU64,
    wired: AtomicBool,
    retired: AtomicBool,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        registry: Arc<EventRegistry<InboundEvent>>,
        events: broadcast::Sender<InboundEvent>,
    ) -> Self {
        Self {
            registry,
            events,
            pending_acks: DashMap::new(),
            next_ack: AtomicU64::new(1),
            wired: AtomicBool::new(false),
            retired: AtomicBool::new(false),
        }
    }

    /// Store `callback` until the acknowledgement with the returned id arrives.
    pub fn register_ack<F>(&self, callback: F) -> u64
    where
        F: FnOnce(Value) + Send + 'static,
    {
        let id = self.next_ack.fetch_add(1, Ordering::Relaxed);
        self.pending_acks.insert(id, Mutex::new(Box::new(callback)));
        id
    }

    /// Drop a pending acknowledgement without running it.
    pub fn cancel_ack(&self, id: u64) -> bool {
        self.pending_acks.remove(&id).is_some()
    }

    #[must_use]
    pub fn pending_acks(&self) -> usize {
        self.pending_acks.len()
    }

    #[must_use]
    pub fn is_wired(&self) -> bool {
        self.wired.load(Ordering::Acquire) && !self.retired.load(Ordering::Acquire)
    }

    /// Stop delivering for good and drop pending acknowledgements.
    pub fn retire(&self) {
        self.retired.store(true, Ordering::Release);
        self.pending_acks.clear();
    }

    fn dispatch_event(&self, name: &str, data: Value) {
        let Some(event_name) = EventName::from_name(name) else {
            #[cfg(feature = "tracing")]
            tracing::trace!(event = name, "Ignoring unrecognized event");
            return;
        };

        let event = InboundEvent::from_wire(event_name, data);

        let handled = self.registry.dispatch(event_name.as_str(), &event);
        #[cfg(feature = "tracing")]
        tracing::trace!(event = name, handled, "Dispatched event");
        #[cfg(not(feature = "tracing"))]
        let _ = handled;

        // No receivers is fine, streams are optional
        _ = self.events.send(event);
    }

    fn resolve_ack(&self, id: u64, data: Value) {
        let Some((_, callback)) = self.pending_acks.remove(&id) else {
            #[cfg(feature = "tracing")]
            tracing::debug!(ack = id, "Acknowledgement without a pending callback");
            return;
        };

        let callback = callback.into_inner().unwrap_or_else(PoisonError::into_inner);
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(data))) {
            #[cfg(feature = "tracing")]
            tracing::error!(
                ack = id,
                panic = panic_message(panic.as_ref()),
                "Acknowledgement callback panicked"
            );
            #[cfg(not(feature = "tracing"))]
            let _ = panic_message(panic.as_ref());
        }
    }
}

impl MessageRouter<Frame> for Dispatcher {
    fn wire(&self) {
        if self.retired.load(Ordering::Acquire) {
            return;
        }
        if !self.wired.swap(true, Ordering::AcqRel) {
            #[cfg(feature = "tracing")]
            tracing::debug!(events = EventName::ALL.len(), "Wired inbound events");
        }
    }

    fn route(&self, frame: Frame) {
        if !self.is_wired() {
            #[cfg(feature = "tracing")]
            tracing::trace!(?frame, "Dispatcher not wired, dropping frame");
            return;
        }

        match frame {
            Frame::Event { name, data } => self.dispatch_event(&name, data),
            Frame::Ack { id, data } => self.resolve_ack(id, data),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("pending_acks", &self.pending_acks.len())
            .field("wired", &self.wired.load(Ordering::Relaxed))
            .field("retired", &self.retired.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::realtime::types::response::ChargerStatus;

    fn dispatcher() -> (
        Arc<EventRegistry<InboundEvent>>,
        broadcast::Receiver<InboundEvent>,
        Dispatcher,
    ) {
        let registry = Arc::new(EventRegistry::new());
        let (tx, rx) = broadcast::channel(16);
        let dispatcher = Dispatcher::new(Arc::clone(&registry), tx);
        (registry, rx, dispatcher)
    }

    fn event(name: &str, data: Value) -> Frame {
        Frame::Event {
            name: name.to_owned(),
            data,
        }
    }

    #[test]
    fn frames_before_wiring_are_dropped() {
        let (registry, _rx, dispatcher) = dispatcher();
        let seen = Arc::new(Mutex::new(0));
        let _handle = {
            let seen = Arc::clone(&seen);
            registry.on("chargerStatus", move |_| *seen.lock().unwrap() += 1)
        };

        let frame = event(
            "chargerStatus",
            json!({ "chargerId": "CH001", "status": "charging" }),
        );
        dispatcher.route(frame.clone());
        assert_eq!(*seen.lock().unwrap(), 0);

        dispatcher.wire();
        dispatcher.route(frame);
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn recognized_event_reaches_handlers_and_stream() {
        let (registry, mut rx, dispatcher) = dispatcher();
        let received = Arc::new(Mutex::new(Vec::new()));
        let _handle = {
            let received = Arc::clone(&received);
            registry.on("chargerStatus", move |event: &InboundEvent| {
                received.lock().unwrap().push(event.clone());
            })
        };

        dispatcher.wire();
        dispatcher.route(event(
            "chargerStatus",
            json!({ "chargerId": "CH001", "status": "charging" }),
        ));

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let InboundEvent::ChargerStatus(update) = &received[0] else {
            panic!("unexpected event: {:?}", received[0]);
        };
        assert_eq!(update.charger_id, "CH001");
        assert_eq!(update.status, ChargerStatus::Charging);

        assert_eq!(rx.try_recv().unwrap(), received[0]);
    }

    #[test]
    fn unknown_events_are_skipped() {
        let (registry, mut rx, dispatcher) = dispatcher();
        let seen = Arc::new(Mutex::new(0));
        let _handle = {
            let seen = Arc::clone(&seen);
            registry.on("firmwareStatus", move |_| *seen.lock().unwrap() += 1)
        };

        dispatcher.wire();
        dispatcher.route(event("firmwareStatus", json!({ "chargerId": "CH001" })));

        assert_eq!(*seen.lock().unwrap(), 0);
        rx.try_recv().unwrap_err();
    }

    #[test]
    fn undecodable_payloads_are_delivered_raw() {
        let (registry, mut rx, dispatcher) = dispatcher();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _faults = {
            let seen = Arc::clone(&seen);
            registry.on("faultAlert", move |event: &InboundEvent| {
                seen.lock().unwrap().push(event.clone());
            })
        };
        let _system = {
            let seen = Arc::clone(&seen);
            registry.on("systemMessage", move |event: &InboundEvent| {
                seen.lock().unwrap().push(event.clone());
            })
        };

        let payloads = [
            ("faultAlert", json!({ "chargerId": "CH001", "timestamp": 1_700_000_000 })),
            ("faultAlert", json!({ "chargerId": "CH002", "connectorId": "1" })),
            ("faultAlert", json!({ "chargerId": "CH003", "severity": 3 })),
            ("systemMessage", json!("Maintenance tonight")),
        ];

        dispatcher.wire();
        for (name, data) in payloads.clone() {
            dispatcher.route(event(name, data));
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), payloads.len());
        for ((name, data), event) in payloads.iter().zip(seen.iter()) {
            assert_eq!(event.name().as_str(), *name);
            assert_eq!(event.raw_data(), Some(data));
        }
        assert_eq!(seen[1].charger_id(), Some("CH002"));

        for expected in seen.iter() {
            assert_eq!(&rx.try_recv().unwrap(), expected);
        }
    }

    #[test]
    fn dispatcher_can_be_shared_with_the_connection_task() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<Dispatcher>();
        assert_send_sync::<Arc<Dispatcher>>();
    }

    #[test]
    fn ack_callback_runs_once() {
        let (_registry, _rx, dispatcher) = dispatcher();
        let replies = Arc::new(Mutex::new(Vec::new()));
        let id = {
            let replies = Arc::clone(&replies);
            dispatcher.register_ack(move |data| replies.lock().unwrap().push(data))
        };

        dispatcher.wire();
        dispatcher.route(Frame::Ack {
            id,
            data: json!({ "accepted": true }),
        });
        dispatcher.route(Frame::Ack {
            id,
            data: json!({ "accepted": false }),
        });

        assert_eq!(*replies.lock().unwrap(), [json!({ "accepted": true })]);
        assert_eq!(dispatcher.pending_acks(), 0);
    }

    #[test]
    fn ack_ids_are_distinct_and_cancellable() {
        let (_registry, _rx, dispatcher) = dispatcher();

        let first = dispatcher.register_ack(|_| {});
        let second = dispatcher.register_ack(|_| {});

        assert_ne!(first, second);
        assert!(dispatcher.cancel_ack(first));
        assert!(!dispatcher.cancel_ack(first));
        assert_eq!(dispatcher.pending_acks(), 1);
    }

    #[test]
    fn retired_dispatcher_stays_silent() {
        let (registry, _rx, dispatcher) = dispatcher();
        let seen = Arc::new(Mutex::new(0));
        let _handle = {
            let seen = Arc::clone(&seen);
            registry.on("systemMessage", move |_| *seen.lock().unwrap() += 1)
        };
        let _ack = dispatcher.register_ack(|_| panic!("must not run"));

        dispatcher.wire();
        dispatcher.retire();
        dispatcher.wire();
        dispatcher.route(event("systemMessage", json!({ "message": "hello" })));

        assert!(!dispatcher.is_wired());
        assert_eq!(*seen.lock().unwrap(), 0);
        assert_eq!(dispatcher.pending_acks(), 0);
    }

    #[test]
    fn frame_parser_delegates_to_parse_frames() {
        let frames = FrameParser
            .parse(br#"{"event":"station:update","data":{"stationId":"ST42"}}"#)
            .unwrap();

        assert_eq!(
            frames,
            vec![event("station:update", json!({ "stationId": "ST42" }))]
        );
    }
}
