//! Live dashboard feed.
//!
//! Connects to the dashboard backend, joins a charger and a station channel and logs every
//! update for a minute:
//! 1. Typed handlers for charger status, meter values and faults
//! 2. A catch-all `events()` stream
//! 3. A remote command sent with an acknowledgement
//!
//! Run against a local backend:
//! ```sh
//! EVCHARGE_WS_URL=ws://localhost:3001 EVCHARGE_TOKEN=... RUST_LOG=info \
//!     cargo run --example live_dashboard
//! ```

use std::time::Duration;

use evcharge_realtime::auth::MemoryTokenStore;
use evcharge_realtime::realtime::Client;
use futures::StreamExt as _;
use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let tokens = match std::env::var("EVCHARGE_TOKEN") {
        Ok(token) => MemoryTokenStore::with_token(token),
        Err(_) => MemoryTokenStore::new(),
    };
    let charger_id = std::env::var("EVCHARGE_CHARGER").unwrap_or_else(|_| "CH001".to_owned());
    let station_id = std::env::var("EVCHARGE_STATION").unwrap_or_else(|_| "ST42".to_owned());

    let client = Client::from_env(tokens)?;

    let _status = client.on_charger_status(|update| {
        info!(
            stream = "chargerStatus",
            charger = %update.charger_id,
            status = %update.status,
            connector = ?update.connector_id
        );
    });
    let _meter = client.on_meter_values(|values| {
        info!(
            stream = "meterValues",
            charger = %values.charger_id,
            energy_kwh = ?values.energy_kwh,
            power_kw = ?values.power_kw
        );
    });
    let _faults = client.on_fault_alert(|alert| {
        warn!(
            stream = "faultAlert",
            charger = %alert.charger_id,
            code = ?alert.error_code,
            message = ?alert.message
        );
    });

    client.connect(None).await?;
    info!(endpoint = %client.endpoint(), id = ?client.id(), "Connected");

    client.subscribe_to_charger(charger_id.as_str());
    client.subscribe_to_station(station_id.as_str());

    client.emit_with_ack(
        "getConfiguration",
        json!({ "chargerId": charger_id }),
        |reply| info!(stream = "ack", reply = %reply),
    );

    let mut events = Box::pin(client.events());
    let mut count = 0_u32;
    while let Ok(Some(result)) = timeout(Duration::from_secs(60), events.next()).await {
        match result {
            Ok(event) => {
                debug!(stream = "events", name = %event.name());
                count += 1;
            }
            Err(e) => warn!(stream = "events", error = %e),
        }
        if !client.is_connected() {
            info!(
                state = ?client.connection_state(),
                attempts = client.reconnect_attempts(),
                "Transport is down"
            );
        }
    }
    info!(stream = "events", received = count);

    client.unsubscribe_from_station(station_id.as_str());
    client.unsubscribe_from_charger(charger_id.as_str());
    client.disconnect();

    Ok(())
}
