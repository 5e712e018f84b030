#![expect(
    clippy::module_name_repetitions,
    reason = "Subscription types deliberately include the module name for clarity"
)]

use super::types::request::{ChannelKind, ChannelRequest, Convention, LocationUpdate, OutboundMessage};
use crate::ws::ConnectionManager;

/// Sends channel join/leave requests over the current transport.
///
/// Nothing is remembered: the backend owns channel membership, and a transport that reconnects
/// on its own comes back without any channel joined until the caller asks again. Requests made
/// while not connected are logged and dropped.
#[derive(Debug, Clone, Default)]
pub struct ChannelSubscriptions {
    connection: Option<ConnectionManager>,
}

impl ChannelSubscriptions {
    #[must_use]
    pub fn new(connection: Option<ConnectionManager>) -> Self {
        Self { connection }
    }

    pub fn subscribe_to_charger<S: Into<String>>(&self, charger_id: S) {
        self.request(&ChannelRequest::subscribe(ChannelKind::Charger, charger_id));
    }

    pub fn unsubscribe_from_charger<S: Into<String>>(&self, charger_id: S) {
        self.request(&ChannelRequest::unsubscribe(ChannelKind::Charger, charger_id));
    }

    pub fn subscribe_to_station<S: Into<String>>(&self, station_id: S) {
        self.request(&ChannelRequest::subscribe(ChannelKind::Station, station_id));
    }

    pub fn unsubscribe_from_station<S: Into<String>>(&self, station_id: S) {
        self.request(&ChannelRequest::unsubscribe(ChannelKind::Station, station_id));
    }

    pub fn subscribe_to_booking<S: Into<String>>(&self, booking_id: S) {
        self.request(&ChannelRequest::subscribe(ChannelKind::Booking, booking_id));
    }

    pub fn unsubscribe_from_booking<S: Into<String>>(&self, booking_id: S) {
        self.request(&ChannelRequest::unsubscribe(ChannelKind::Booking, booking_id));
    }

    pub fn subscribe_to_session<S: Into<String>>(&self, session_id: S) {
        self.request(&ChannelRequest::subscribe(ChannelKind::Session, session_id));
    }

    pub fn unsubscribe_from_session<S: Into<String>>(&self, session_id: S) {
        self.request(&ChannelRequest::unsubscribe(ChannelKind::Session, session_id));
    }

    /// Join `kind`'s channel for `id` with an explicit naming convention.
    pub fn subscribe<S: Into<String>>(&self, kind: ChannelKind, id: S, convention: Convention) {
        self.request(&ChannelRequest::subscribe(kind, id).with_convention(convention));
    }

    /// Leave `kind`'s channel for `id` with an explicit naming convention.
    pub fn unsubscribe<S: Into<String>>(&self, kind: ChannelKind, id: S, convention: Convention) {
        self.request(&ChannelRequest::unsubscribe(kind, id).with_convention(convention));
    }

    /// Report the device position for presence and geofencing.
    pub fn update_location(&self, lat: f64, lng: f64) {
        send_if_connected(
            self.connection.as_ref(),
            &OutboundMessage::from(&LocationUpdate::new(lat, lng)),
        );
    }

    pub fn request(&self, request: &ChannelRequest) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            operation = %request.operation,
            kind = %request.kind,
            id = %request.id,
            "Channel request"
        );
        send_if_connected(self.connection.as_ref(), &OutboundMessage::from(request));
    }
}

/// Send `message` if `connection` is live. Returns whether it was handed to the transport.
pub(crate) fn send_if_connected(
    connection: Option<&ConnectionManager>,
    message: &OutboundMessage,
) -> bool {
    let Some(connection) = connection.filter(|connection| connection.is_connected()) else {
        #[cfg(feature = "tracing")]
        tracing::warn!(event = %message.event, "Not connected, dropping outbound message");
        return false;
    };

    match connection.send(message) {
        Ok(()) => true,
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(event = %message.event, error = %e, "Failed to send outbound message");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
            false
        }
    }
}
