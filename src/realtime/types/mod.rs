pub mod request;
pub mod response;

pub use request::{
    ChannelKind, ChannelRequest, Convention, LOCATION_UPDATE_EVENT, LocationUpdate, Operation,
    OutboundMessage,
};
pub use response::{
    BookingUpdate, ChargerStatus, ChargerStatusUpdate, CommandResult, EventName, FaultAlert, Frame,
    InboundEvent, MeterValues, Notification, SessionUpdate, Severity, StationUpdate,
    SystemMessage, TransactionUpdate, parse_frames,
};
