use bon::Builder;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use serde_with::serde_as;
use strum_macros::{Display, IntoStaticStr};

use crate::serde_helpers::{StringFromAny, decode_payload};
use crate::types::Decimal;

/// Inbound event names the dashboard backend pushes.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum EventName {
    #[strum(serialize = "chargerStatus")]
    ChargerStatus,
    #[strum(serialize = "transactionUpdate")]
    TransactionUpdate,
    #[strum(serialize = "meterValues")]
    MeterValues,
    #[strum(serialize = "faultAlert")]
    FaultAlert,
    #[strum(serialize = "commandResult")]
    CommandResult,
    #[strum(serialize = "systemMessage")]
    SystemMessage,
    #[strum(serialize = "booking:update")]
    BookingUpdate,
    #[strum(serialize = "station:update")]
    StationUpdate,
    #[strum(serialize = "session:update")]
    SessionUpdate,
    #[strum(serialize = "notification:new")]
    Notification,
}

impl EventName {
    /// Every recognized inbound name, in catalogue order.
    pub const ALL: [EventName; 10] = [
        EventName::ChargerStatus,
        EventName::TransactionUpdate,
        EventName::MeterValues,
        EventName::FaultAlert,
        EventName::CommandResult,
        EventName::SystemMessage,
        EventName::BookingUpdate,
        EventName::StationUpdate,
        EventName::SessionUpdate,
        EventName::Notification,
    ];

    /// Wire name, e.g. `chargerStatus`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Look up a wire name. Returns `None` for names outside the catalogue.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

/// One JSON envelope as it arrives on the socket.
#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    ack: Option<u64>,
}

/// A decoded text frame, before payload typing.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Server-pushed event
    Event { name: String, data: Value },
    /// Reply to an outbound message that requested an acknowledgement
    Ack { id: u64, data: Value },
}

/// Parse one text frame into zero or more [`Frame`]s.
///
/// Accepts a single envelope or an array of envelopes. Envelopes without an event name and
/// without an ack id carry nothing routable and are skipped.
pub fn parse_frames(bytes: &[u8]) -> crate::Result<Vec<Frame>> {
    let trimmed = bytes.trim_ascii();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let envelopes: Vec<Envelope> = if trimmed.starts_with(b"[") {
        serde_json::from_slice(trimmed)?
    } else {
        vec![serde_json::from_slice(trimmed)?]
    };

    Ok(envelopes
        .into_iter()
        .filter_map(|envelope| match envelope {
            Envelope {
                event: Some(name),
                data,
                ..
            } => Some(Frame::Event { name, data }),
            Envelope {
                event: None,
                ack: Some(id),
                data,
            } => Some(Frame::Ack { id, data }),
            Envelope { .. } => {
                #[cfg(feature = "tracing")]
                tracing::trace!("Skipping envelope without event name or ack id");
                None
            }
        })
        .collect())
}

/// A recognized inbound event with its typed payload.
///
/// Events whose payload does not match the expected schema are kept as [`InboundEvent::Raw`]
/// so that name-based handlers still see them.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    ChargerStatus(ChargerStatusUpdate),
    TransactionUpdate(TransactionUpdate),
    MeterValues(MeterValues),
    FaultAlert(FaultAlert),
    CommandResult(CommandResult),
    SystemMessage(SystemMessage),
    BookingUpdate(BookingUpdate),
    StationUpdate(StationUpdate),
    SessionUpdate(SessionUpdate),
    Notification(Notification),
    /// A recognized event whose payload could not be decoded
    Raw { name: EventName, data: Value },
}

impl InboundEvent {
    /// Decode `data` into the payload type registered for `name`.
    pub fn decode(name: EventName, data: Value) -> crate::Result<Self> {
        let event = name.as_str();
        Ok(match name {
            EventName::ChargerStatus => Self::ChargerStatus(decode_payload(event, data)?),
            EventName::TransactionUpdate => Self::TransactionUpdate(decode_payload(event, data)?),
            EventName::MeterValues => Self::MeterValues(decode_payload(event, data)?),
            EventName::FaultAlert => Self::FaultAlert(decode_payload(event, data)?),
            EventName::CommandResult => Self::CommandResult(decode_payload(event, data)?),
            EventName::SystemMessage => Self::SystemMessage(decode_payload(event, data)?),
            EventName::BookingUpdate => Self::BookingUpdate(decode_payload(event, data)?),
            EventName::StationUpdate => Self::StationUpdate(decode_payload(event, data)?),
            EventName::SessionUpdate => Self::SessionUpdate(decode_payload(event, data)?),
            EventName::Notification => Self::Notification(decode_payload(event, data)?),
        })
    }

    /// Decode `data`, falling back to [`InboundEvent::Raw`] when it does not fit the schema.
    #[must_use]
    pub fn from_wire(name: EventName, data: Value) -> Self {
        match Self::decode(name, data.clone()) {
            Ok(event) => event,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(event = name.as_str(), error = %e, "Delivering undecodable payload raw");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
                Self::Raw { name, data }
            }
        }
    }

    /// The undecoded payload of a [`InboundEvent::Raw`] event.
    #[must_use]
    pub const fn raw_data(&self) -> Option<&Value> {
        match self {
            Self::Raw { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Name the event was received under.
    #[must_use]
    pub const fn name(&self) -> EventName {
        match self {
            Self::ChargerStatus(_) => EventName::ChargerStatus,
            Self::TransactionUpdate(_) => EventName::TransactionUpdate,
            Self::MeterValues(_) => EventName::MeterValues,
            Self::FaultAlert(_) => EventName::FaultAlert,
            Self::CommandResult(_) => EventName::CommandResult,
            Self::SystemMessage(_) => EventName::SystemMessage,
            Self::BookingUpdate(_) => EventName::BookingUpdate,
            Self::StationUpdate(_) => EventName::StationUpdate,
            Self::SessionUpdate(_) => EventName::SessionUpdate,
            Self::Notification(_) => EventName::Notification,
            Self::Raw { name, .. } => *name,
        }
    }

    /// Charger id the event concerns, where the payload names one.
    #[must_use]
    pub fn charger_id(&self) -> Option<&str> {
        match self {
            Self::ChargerStatus(update) => Some(&update.charger_id),
            Self::MeterValues(values) => Some(&values.charger_id),
            Self::FaultAlert(alert) => Some(&alert.charger_id),
            Self::TransactionUpdate(update) => update.charger_id.as_deref(),
            Self::CommandResult(result) => result.charger_id.as_deref(),
            Self::BookingUpdate(update) => update.charger_id.as_deref(),
            Self::SessionUpdate(update) => update.charger_id.as_deref(),
            Self::Raw { data, .. } => data.get("chargerId").and_then(Value::as_str),
            Self::SystemMessage(_) | Self::StationUpdate(_) | Self::Notification(_) => None,
        }
    }

    #[must_use]
    pub const fn as_charger_status(&self) -> Option<&ChargerStatusUpdate> {
        match self {
            Self::ChargerStatus(update) => Some(update),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_transaction_update(&self) -> Option<&TransactionUpdate> {
        match self {
            Self::TransactionUpdate(update) => Some(update),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_meter_values(&self) -> Option<&MeterValues> {
        match self {
            Self::MeterValues(values) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_fault_alert(&self) -> Option<&FaultAlert> {
        match self {
            Self::FaultAlert(alert) => Some(alert),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_command_result(&self) -> Option<&CommandResult> {
        match self {
            Self::CommandResult(result) => Some(result),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_system_message(&self) -> Option<&SystemMessage> {
        match self {
            Self::SystemMessage(message) => Some(message),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_booking_update(&self) -> Option<&BookingUpdate> {
        match self {
            Self::BookingUpdate(update) => Some(update),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_station_update(&self) -> Option<&StationUpdate> {
        match self {
            Self::StationUpdate(update) => Some(update),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_session_update(&self) -> Option<&SessionUpdate> {
        match self {
            Self::SessionUpdate(update) => Some(update),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_notification(&self) -> Option<&Notification> {
        match self {
            Self::Notification(notification) => Some(notification),
            _ => None,
        }
    }
}

/// Operational status of a charger.
///
/// Accepts the dashboard's lowercase names as well as OCPP 1.6 `ChargePointStatus` values.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChargerStatus {
    #[serde(alias = "Available")]
    Available,
    #[serde(alias = "Preparing")]
    Preparing,
    #[serde(alias = "Charging")]
    Charging,
    #[serde(alias = "SuspendedEV", alias = "suspended_ev")]
    SuspendedEv,
    #[serde(alias = "SuspendedEVSE", alias = "suspended_evse")]
    SuspendedEvse,
    #[serde(alias = "Finishing")]
    Finishing,
    #[serde(alias = "Reserved")]
    Reserved,
    #[serde(alias = "Unavailable")]
    Unavailable,
    #[serde(alias = "Faulted")]
    Faulted,
    #[serde(alias = "Offline")]
    Offline,
    #[serde(other)]
    Unknown,
}

/// Severity attached to faults and system messages.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
    Critical,
    #[serde(other)]
    Unknown,
}

/// `chargerStatus`: a charger or one of its connectors changed status.
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct ChargerStatusUpdate {
    #[serde_as(as = "StringFromAny")]
    #[builder(into)]
    pub charger_id: String,
    pub status: ChargerStatus,
    #[serde(default)]
    pub connector_id: Option<u32>,
    /// OCPP error code reported alongside the status
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// `transactionUpdate`: a charging transaction started, progressed or stopped.
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    #[serde_as(as = "StringFromAny")]
    #[builder(into)]
    pub transaction_id: String,
    #[serde_as(as = "Option<StringFromAny>")]
    #[serde(default)]
    pub charger_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Energy delivered so far, kWh
    #[serde(default)]
    pub energy_kwh: Option<Decimal>,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stopped_at: Option<DateTime<Utc>>,
}

/// `meterValues`: live readings from a connector.
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct MeterValues {
    #[serde_as(as = "StringFromAny")]
    #[builder(into)]
    pub charger_id: String,
    #[serde(default)]
    pub connector_id: Option<u32>,
    #[serde_as(as = "Option<StringFromAny>")]
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Cumulative energy register, kWh
    #[serde(default)]
    pub energy_kwh: Option<Decimal>,
    /// Instantaneous power, kW
    #[serde(default)]
    pub power_kw: Option<Decimal>,
    #[serde(default)]
    pub voltage: Option<Decimal>,
    #[serde(default)]
    pub current: Option<Decimal>,
    /// Vehicle state of charge, percent
    #[serde(default)]
    pub soc: Option<Decimal>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// `faultAlert`: a charger reported a fault.
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct FaultAlert {
    #[serde_as(as = "StringFromAny")]
    #[builder(into)]
    pub charger_id: String,
    #[serde(default)]
    pub connector_id: Option<u32>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// `commandResult`: outcome of a remote command sent to a charger.
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    #[builder(into)]
    pub command: String,
    #[serde_as(as = "Option<StringFromAny>")]
    #[serde(default)]
    pub command_id: Option<String>,
    #[serde_as(as = "Option<StringFromAny>")]
    #[serde(default)]
    pub charger_id: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// `systemMessage`: free-form broadcast from the backend.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct SystemMessage {
    #[builder(into)]
    pub message: String,
    #[serde(default, alias = "severity")]
    pub level: Option<Severity>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// `booking:update`: a reservation changed.
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct BookingUpdate {
    #[serde_as(as = "StringFromAny")]
    #[builder(into)]
    pub booking_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde_as(as = "Option<StringFromAny>")]
    #[serde(default)]
    pub station_id: Option<String>,
    #[serde_as(as = "Option<StringFromAny>")]
    #[serde(default)]
    pub charger_id: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

/// `station:update`: aggregate state of a station changed.
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct StationUpdate {
    #[serde_as(as = "StringFromAny")]
    #[builder(into)]
    pub station_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub available_chargers: Option<u32>,
    #[serde(default)]
    pub total_chargers: Option<u32>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// `session:update`: a charging session's running totals changed.
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    #[serde_as(as = "StringFromAny")]
    #[builder(into)]
    pub session_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde_as(as = "Option<StringFromAny>")]
    #[serde(default)]
    pub charger_id: Option<String>,
    #[serde(default)]
    pub energy_kwh: Option<Decimal>,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub duration_seconds: Option<u64>,
}

/// `notification:new`: a user-facing notification was created.
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde_as(as = "Option<StringFromAny>")]
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[builder(into)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    #[test]
    fn event_names_round_trip_through_catalogue() {
        for name in EventName::ALL {
            assert_eq!(EventName::from_name(name.as_str()), Some(name));
            assert_eq!(name.to_string(), name.as_str());
        }

        assert_eq!(
            EventName::from_name("booking:update"),
            Some(EventName::BookingUpdate)
        );
        assert_eq!(EventName::from_name("bookingUpdate"), None);
    }

    #[test]
    fn parse_single_event_frame() {
        let frames = parse_frames(
            br#"{"event":"chargerStatus","data":{"chargerId":"CH001","status":"charging"}}"#,
        )
        .unwrap();

        assert_eq!(
            frames,
            vec![Frame::Event {
                name: "chargerStatus".to_owned(),
                data: json!({ "chargerId": "CH001", "status": "charging" }),
            }]
        );
    }

    #[test]
    fn parse_batch_keeps_order() {
        let frames = parse_frames(
            br#"[
                {"event":"meterValues","data":{"chargerId":"CH001"}},
                {"ack":3,"data":{"ok":true}},
                {"event":"faultAlert","data":{"chargerId":"CH002"}}
            ]"#,
        )
        .unwrap();

        assert_eq!(frames.len(), 3);
        assert!(matches!(&frames[0], Frame::Event { name, .. } if name == "meterValues"));
        assert_eq!(
            frames[1],
            Frame::Ack {
                id: 3,
                data: json!({ "ok": true })
            }
        );
        assert!(matches!(&frames[2], Frame::Event { name, .. } if name == "faultAlert"));
    }

    #[test]
    fn parse_empty_and_unroutable_frames() {
        assert!(parse_frames(b"   ").unwrap().is_empty());
        assert!(parse_frames(br#"{"data":1}"#).unwrap().is_empty());
    }

    #[test]
    fn parse_invalid_json_fails() {
        parse_frames(b"{not json").unwrap_err();
    }

    #[test]
    fn event_without_data_is_null() {
        let frames = parse_frames(br#"{"event":"systemMessage"}"#).unwrap();

        assert_eq!(
            frames,
            vec![Frame::Event {
                name: "systemMessage".to_owned(),
                data: Value::Null,
            }]
        );
    }

    #[test]
    fn decode_charger_status() {
        let event = InboundEvent::decode(
            EventName::ChargerStatus,
            json!({ "chargerId": "CH001", "status": "charging" }),
        )
        .unwrap();

        let expected = ChargerStatusUpdate::builder()
            .charger_id("CH001")
            .status(ChargerStatus::Charging)
            .build();
        assert_eq!(event, InboundEvent::ChargerStatus(expected));
        assert_eq!(event.name(), EventName::ChargerStatus);
        assert_eq!(event.charger_id(), Some("CH001"));
        assert!(event.as_charger_status().is_some());
        assert!(event.as_fault_alert().is_none());
    }

    #[test]
    fn charger_status_accepts_ocpp_names_and_unknowns() {
        let ocpp: ChargerStatusUpdate =
            serde_json::from_value(json!({ "chargerId": 17, "status": "SuspendedEV" })).unwrap();
        let unknown: ChargerStatusUpdate =
            serde_json::from_value(json!({ "chargerId": "CH9", "status": "melting" })).unwrap();

        assert_eq!(ocpp.charger_id, "17");
        assert_eq!(ocpp.status, ChargerStatus::SuspendedEv);
        assert_eq!(unknown.status, ChargerStatus::Unknown);
    }

    #[test]
    fn decode_meter_values_with_decimals() {
        let event = InboundEvent::decode(
            EventName::MeterValues,
            json!({
                "chargerId": "CH001",
                "connectorId": 1,
                "transactionId": 5501,
                "energyKwh": "12.345",
                "powerKw": 7.4,
                "soc": 63,
                "timestamp": "2026-03-01T10:15:00Z"
            }),
        )
        .unwrap();

        let InboundEvent::MeterValues(values) = event else {
            panic!("unexpected event: {event:?}");
        };
        assert_eq!(values.transaction_id.as_deref(), Some("5501"));
        assert_eq!(values.energy_kwh, Some(dec!(12.345)));
        assert_eq!(values.power_kw, Some(dec!(7.4)));
        assert_eq!(values.soc, Some(dec!(63)));
        assert!(values.timestamp.is_some());
    }

    #[test]
    fn decode_namespaced_updates() {
        let booking = InboundEvent::decode(
            EventName::BookingUpdate,
            json!({ "bookingId": "B-1", "status": "confirmed", "stationId": 42 }),
        )
        .unwrap();
        let notification = InboundEvent::decode(
            EventName::Notification,
            json!({ "id": 9, "message": "Charging complete", "type": "session" }),
        )
        .unwrap();

        let InboundEvent::BookingUpdate(booking) = booking else {
            panic!("unexpected event: {booking:?}");
        };
        assert_eq!(booking.station_id.as_deref(), Some("42"));

        let InboundEvent::Notification(notification) = notification else {
            panic!("unexpected event: {notification:?}");
        };
        assert_eq!(notification.id.as_deref(), Some("9"));
        assert_eq!(notification.kind.as_deref(), Some("session"));
        assert!(!notification.read);
    }

    #[test]
    fn decode_system_message_with_severity_alias() {
        let event = InboundEvent::decode(
            EventName::SystemMessage,
            json!({ "message": "maintenance at 02:00", "severity": "warn" }),
        )
        .unwrap();

        let InboundEvent::SystemMessage(message) = event else {
            panic!("unexpected event: {event:?}");
        };
        assert_eq!(message.level, Some(Severity::Warning));
    }

    #[test]
    fn decode_missing_required_field_fails() {
        InboundEvent::decode(EventName::StationUpdate, json!({ "status": "online" })).unwrap_err();
        InboundEvent::decode(EventName::CommandResult, Value::Null).unwrap_err();
    }

    #[test]
    fn from_wire_keeps_undecodable_payloads() {
        let data = json!({ "chargerId": "CH007", "timestamp": 1_700_000_000 });
        let event = InboundEvent::from_wire(EventName::FaultAlert, data.clone());

        assert_eq!(event.name(), EventName::FaultAlert);
        assert_eq!(event.raw_data(), Some(&data));
        assert_eq!(event.charger_id(), Some("CH007"));
        assert!(event.as_fault_alert().is_none());

        let text = InboundEvent::from_wire(EventName::SystemMessage, json!("Maintenance tonight"));
        assert_eq!(text.raw_data(), Some(&json!("Maintenance tonight")));
        assert_eq!(text.charger_id(), None);
    }

    #[test]
    fn from_wire_decodes_valid_payloads() {
        let event = InboundEvent::from_wire(
            EventName::FaultAlert,
            json!({ "chargerId": "CH007", "severity": "critical" }),
        );

        assert!(event.raw_data().is_none());
        let alert = event.as_fault_alert().unwrap();
        assert_eq!(alert.severity, Some(Severity::Critical));
    }
}
