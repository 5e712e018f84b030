use std::borrow::Cow;

use bon::Builder;
use serde::Serialize;
use serde_json::{Value, json};
use strum_macros::{Display, IntoStaticStr};

/// Outbound frame sent over the socket.
///
/// Serialized as `{"event": ..., "data": ..., "ack": n}`, `ack` only when a reply is expected.
#[non_exhaustive]
#[derive(Clone, Debug, Serialize, Builder)]
pub struct OutboundMessage {
    /// Event name the backend dispatches on
    #[builder(into)]
    pub event: String,
    /// Event payload, `null` when absent
    #[builder(default)]
    pub data: Value,
    /// Acknowledgement id the backend echoes back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
}

impl OutboundMessage {
    #[must_use]
    pub fn new<S: Into<String>>(event: S, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
            ack: None,
        }
    }

    /// Request an acknowledgement with id `ack`.
    #[must_use]
    pub fn with_ack(mut self, ack: u64) -> Self {
        self.ack = Some(ack);
        self
    }
}

/// Whether a request joins or leaves a channel.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Subscribe,
    Unsubscribe,
}

/// Entity kinds that own a channel on the backend.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChannelKind {
    Charger,
    Station,
    Booking,
    Session,
}

impl ChannelKind {
    /// Field carrying the entity id in namespaced requests, e.g. `chargerId`.
    #[must_use]
    pub const fn id_field(self) -> &'static str {
        match self {
            Self::Charger => "chargerId",
            Self::Station => "stationId",
            Self::Booking => "bookingId",
            Self::Session => "sessionId",
        }
    }

    /// Flat event name of the older API, where one exists.
    #[must_use]
    pub const fn legacy_event(self, operation: Operation) -> Option<&'static str> {
        match (self, operation) {
            (Self::Charger, Operation::Subscribe) => Some("subscribeCharger"),
            (Self::Charger, Operation::Unsubscribe) => Some("unsubscribeCharger"),
            _ => None,
        }
    }

    /// `subscribe:<kind>` / `unsubscribe:<kind>`.
    #[must_use]
    pub fn namespaced_event(self, operation: Operation) -> String {
        format!("{operation}:{self}")
    }

    /// Convention used when the caller does not pick one.
    #[must_use]
    pub const fn default_convention(self) -> Convention {
        match self {
            Self::Charger => Convention::Legacy,
            _ => Convention::Namespaced,
        }
    }
}

/// Naming scheme for channel requests. Both are understood by the backend.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Convention {
    /// `subscribeCharger` with the bare id as data
    Legacy,
    /// `subscribe:charger` with `{ "chargerId": id }` as data
    #[default]
    Namespaced,
}

/// Join or leave request for one entity channel.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Builder)]
pub struct ChannelRequest {
    pub operation: Operation,
    pub kind: ChannelKind,
    #[builder(into)]
    pub id: String,
    /// Requested naming scheme. Kinds without a legacy name always use the namespaced one.
    pub convention: Convention,
}

impl ChannelRequest {
    /// Join `kind`'s channel for `id` using the kind's default convention.
    #[must_use]
    pub fn subscribe<S: Into<String>>(kind: ChannelKind, id: S) -> Self {
        Self {
            operation: Operation::Subscribe,
            kind,
            id: id.into(),
            convention: kind.default_convention(),
        }
    }

    /// Leave `kind`'s channel for `id` using the kind's default convention.
    #[must_use]
    pub fn unsubscribe<S: Into<String>>(kind: ChannelKind, id: S) -> Self {
        Self {
            operation: Operation::Unsubscribe,
            kind,
            id: id.into(),
            convention: kind.default_convention(),
        }
    }

    #[must_use]
    pub fn with_convention(mut self, convention: Convention) -> Self {
        self.convention = convention;
        self
    }

    /// Convention actually used on the wire.
    #[must_use]
    pub fn effective_convention(&self) -> Convention {
        match self.convention {
            Convention::Legacy if self.kind.legacy_event(self.operation).is_some() => {
                Convention::Legacy
            }
            _ => Convention::Namespaced,
        }
    }

    #[must_use]
    pub fn event_name(&self) -> Cow<'static, str> {
        match self.effective_convention() {
            Convention::Legacy => self
                .kind
                .legacy_event(self.operation)
                .map_or_else(|| self.namespaced_name(), Cow::Borrowed),
            Convention::Namespaced => self.namespaced_name(),
        }
    }

    fn namespaced_name(&self) -> Cow<'static, str> {
        Cow::Owned(self.kind.namespaced_event(self.operation))
    }

    #[must_use]
    pub fn data(&self) -> Value {
        match self.effective_convention() {
            Convention::Legacy => Value::String(self.id.clone()),
            Convention::Namespaced => json!({ self.kind.id_field(): self.id }),
        }
    }
}

impl From<&ChannelRequest> for OutboundMessage {
    fn from(request: &ChannelRequest) -> Self {
        OutboundMessage::new(request.event_name(), request.data())
    }
}

/// Event name of the presence/geofencing update.
pub const LOCATION_UPDATE_EVENT: &str = "updateLocation";

/// Current position of the operator's device.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LocationUpdate {
    pub lat: f64,
    pub lng: f64,
}

impl LocationUpdate {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<&LocationUpdate> for OutboundMessage {
    fn from(update: &LocationUpdate) -> Self {
        OutboundMessage::new(
            LOCATION_UPDATE_EVENT,
            json!({ "lat": update.lat, "lng": update.lng }),
        )
    }
}
