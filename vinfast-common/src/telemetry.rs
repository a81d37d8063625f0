//! Vehicle telemetry as reported by the connected car API.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Is the car currently charging?
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChargingStatus {
    /// Charging is starting
    Starting,

    /// Charging is in progress
    Charging,

    /// Charging is complete
    Complete,

    /// Charging is not in progress
    Stopped,

    /// Charging is not in progress and we are disconnected
    Disconnected,

    /// Charger cable is connected but not getting power
    NoPower,

    /// A value we don't know about.
    Unknown(String),
}

impl ChargingStatus {
    /// Is the car currently charging?
    #[must_use]
    pub const fn is_charging(&self) -> bool {
        match self {
            ChargingStatus::Starting | ChargingStatus::Charging => true,
            ChargingStatus::Complete
            | ChargingStatus::Stopped
            | ChargingStatus::Disconnected
            | ChargingStatus::NoPower
            | ChargingStatus::Unknown(_) => false,
        }
    }

    /// The value as sent upstream.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ChargingStatus::Starting => "Starting",
            ChargingStatus::Charging => "Charging",
            ChargingStatus::Complete => "Complete",
            ChargingStatus::Stopped => "Stopped",
            ChargingStatus::Disconnected => "Disconnected",
            ChargingStatus::NoPower => "NoPower",
            ChargingStatus::Unknown(value) => value,
        }
    }
}

impl From<&str> for ChargingStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().replace(['_', ' '], "").as_str() {
            "starting" => Self::Starting,
            "charging" => Self::Charging,
            "complete" | "completed" | "full" => Self::Complete,
            "stopped" | "notcharging" => Self::Stopped,
            "disconnected" | "unplugged" => Self::Disconnected,
            "nopower" => Self::NoPower,
            _ => Self::Unknown(value.to_string()),
        }
    }
}

impl From<String> for ChargingStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<ChargingStatus> for String {
    fn from(value: ChargingStatus) -> Self {
        value.as_str().to_string()
    }
}

/// Location of the vehicle.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

/// Tire pressures in kPa.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct TirePressures {
    pub front_left: Option<f64>,
    pub front_right: Option<f64>,
    pub rear_left: Option<f64>,
    pub rear_right: Option<f64>,
}

/// Normalized telemetry values.
///
/// Every field is optional, the API omits values the car did not report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Telemetry {
    /// Odometer in km
    pub odometer: Option<f64>,

    /// Battery level in percent
    pub battery_level: Option<u8>,

    /// The current charge state
    pub charging_status: Option<ChargingStatus>,

    /// Estimated range in km
    pub remaining_range: Option<f64>,

    /// The current charge limit in percent
    pub charge_limit: Option<u8>,

    /// Estimated time to full charge in minutes
    pub time_to_full_charge: Option<f64>,

    /// Charging power in kW
    pub charging_power: Option<f64>,

    /// Cabin temperature in °C
    pub inside_temperature: Option<f64>,

    /// Ambient temperature in °C
    pub outside_temperature: Option<f64>,

    /// Gear position, e.g. "P"
    pub gear: Option<String>,

    /// Tire pressures
    pub tire_pressures: TirePressures,

    /// Are the doors locked?
    pub locked: Option<bool>,

    /// Is the charge cable plugged in?
    pub plug_connected: Option<bool>,

    /// Is the car powered on?
    pub ignition_on: Option<bool>,

    /// Is any door open?
    pub doors_open: Option<bool>,

    /// Is any window open?
    pub windows_open: Option<bool>,

    /// Is the trunk open?
    pub trunk_open: Option<bool>,

    /// Is the hood open?
    pub hood_open: Option<bool>,

    /// Last known position
    pub location: Option<Location>,
}

fn field<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    data.get(key).filter(|value| !value.is_null())
}

fn mistyped<T>(key: &str, value: &Value) -> Option<T> {
    debug!("Ignoring telemetry field {key} with unexpected value {value}");
    None
}

fn f64_field(data: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = field(data, key)?;
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .or_else(|| mistyped(key, value)),
        _ => mistyped(key, value),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent_field(data: &Map<String, Value>, key: &str) -> Option<u8> {
    let value = f64_field(data, key)?;
    if (0.0..=100.0).contains(&value) {
        Some(value.round() as u8)
    } else {
        debug!("Ignoring telemetry field {key} with out of range value {value}");
        None
    }
}

fn bool_field(data: &Map<String, Value>, key: &str) -> Option<bool> {
    let value = field(data, key)?;
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => mistyped(key, value),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" => Some(true),
            "false" | "0" | "off" => Some(false),
            _ => mistyped(key, value),
        },
        _ => mistyped(key, value),
    }
}

fn string_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    let value = field(data, key)?;
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => mistyped(key, value),
    }
}

impl Telemetry {
    /// Decode telemetry from the upstream JSON object.
    ///
    /// Missing or mistyped fields become `None`; anything other than an object
    /// yields empty telemetry.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let Some(data) = value.as_object() else {
            debug!("Telemetry payload is not an object: {value}");
            return Self::default();
        };

        let location = f64_field(data, "latitude")
            .zip(f64_field(data, "longitude"))
            .map(|(latitude, longitude)| Location {
                latitude,
                longitude,
            });

        Self {
            odometer: f64_field(data, "odometer"),
            battery_level: percent_field(data, "batteryLevel"),
            charging_status: string_field(data, "chargingStatus").map(ChargingStatus::from),
            remaining_range: f64_field(data, "remainingRange"),
            charge_limit: percent_field(data, "chargeLimit"),
            time_to_full_charge: f64_field(data, "timeToFullCharge"),
            charging_power: f64_field(data, "chargingPower"),
            inside_temperature: f64_field(data, "insideTemperature"),
            outside_temperature: f64_field(data, "outsideTemperature"),
            gear: string_field(data, "gearPosition"),
            tire_pressures: TirePressures {
                front_left: f64_field(data, "tirePressureFrontLeft"),
                front_right: f64_field(data, "tirePressureFrontRight"),
                rear_left: f64_field(data, "tirePressureRearLeft"),
                rear_right: f64_field(data, "tirePressureRearRight"),
            },
            locked: bool_field(data, "locked"),
            plug_connected: bool_field(data, "plugConnected"),
            ignition_on: bool_field(data, "ignitionOn"),
            doors_open: bool_field(data, "doorsOpen"),
            windows_open: bool_field(data, "windowsOpen"),
            trunk_open: bool_field(data, "trunkOpen"),
            hood_open: bool_field(data, "hoodOpen"),
            location,
        }
    }

    /// Is the car currently charging?
    #[must_use]
    pub fn is_charging(&self) -> bool {
        self.charging_status
            .as_ref()
            .is_some_and(ChargingStatus::is_charging)
    }
}

/// The last successfully fetched state of a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Vehicle identification number.
    pub vin: String,

    /// When the payload was received.
    pub fetched_at: DateTime<Utc>,

    /// The payload exactly as received.
    pub raw: Value,

    /// Normalized values decoded from `raw`.
    pub telemetry: Telemetry,
}

impl Snapshot {
    /// Create a snapshot from a raw payload.
    #[must_use]
    pub fn new(vin: impl Into<String>, fetched_at: DateTime<Utc>, raw: Value) -> Self {
        let telemetry = Telemetry::from_json(&raw);
        Self {
            vin: vin.into(),
            fetched_at,
            raw,
            telemetry,
        }
    }

    /// Was the car charging when this snapshot was taken?
    #[must_use]
    pub fn is_charging(&self) -> bool {
        self.telemetry.is_charging()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn test_decode_full_payload() {
        let raw = json!({
            "odometer": 12345.6,
            "batteryLevel": 81,
            "chargingStatus": "Charging",
            "remainingRange": "310.5",
            "chargeLimit": 90,
            "timeToFullCharge": 42,
            "chargingPower": 7.2,
            "insideTemperature": 21.5,
            "outsideTemperature": 14,
            "gearPosition": "P",
            "tirePressureFrontLeft": 240,
            "tirePressureRearRight": 238.5,
            "locked": true,
            "plugConnected": 1,
            "ignitionOn": "off",
            "doorsOpen": false,
            "latitude": 21.0285,
            "longitude": 105.8542,
        });

        let telemetry = Telemetry::from_json(&raw);
        assert_relative_eq!(telemetry.odometer.unwrap(), 12345.6);
        assert_eq!(telemetry.battery_level, Some(81));
        assert_eq!(telemetry.charging_status, Some(ChargingStatus::Charging));
        assert_relative_eq!(telemetry.remaining_range.unwrap(), 310.5);
        assert_eq!(telemetry.charge_limit, Some(90));
        assert_eq!(telemetry.gear.as_deref(), Some("P"));
        assert_relative_eq!(telemetry.tire_pressures.front_left.unwrap(), 240.0);
        assert_eq!(telemetry.tire_pressures.front_right, None);
        assert_eq!(telemetry.locked, Some(true));
        assert_eq!(telemetry.plug_connected, Some(true));
        assert_eq!(telemetry.ignition_on, Some(false));
        assert_eq!(telemetry.doors_open, Some(false));
        assert_eq!(telemetry.windows_open, None);
        let location = telemetry.location.unwrap();
        assert_relative_eq!(location.latitude, 21.0285);
        assert!(telemetry.is_charging());
    }

    #[test]
    fn test_decode_tolerates_bad_fields() {
        let raw = json!({
            "odometer": "lots",
            "batteryLevel": 250,
            "chargingStatus": null,
            "locked": "maybe",
            "latitude": 10.0,
        });

        let telemetry = Telemetry::from_json(&raw);
        assert_eq!(telemetry, Telemetry::default());
        assert!(!telemetry.is_charging());
    }

    #[rstest::rstest]
    #[case("NaN")]
    #[case("nan")]
    #[case("inf")]
    #[case("-Infinity")]
    fn test_decode_rejects_non_finite(#[case] input: &str) {
        let raw = json!({
            "odometer": input,
            "remainingRange": input,
            "batteryLevel": 80,
        });

        let telemetry = Telemetry::from_json(&raw);
        assert_eq!(telemetry.odometer, None);
        assert_eq!(telemetry.remaining_range, None);
        assert_eq!(telemetry.battery_level, Some(80));
        assert_eq!(telemetry, Telemetry::from_json(&raw));
    }

    #[test]
    fn test_decode_non_object() {
        assert_eq!(Telemetry::from_json(&json!([1, 2])), Telemetry::default());
    }

    #[rstest::rstest]
    #[case("Charging", ChargingStatus::Charging, true)]
    #[case("STARTING", ChargingStatus::Starting, true)]
    #[case("not_charging", ChargingStatus::Stopped, false)]
    #[case("No Power", ChargingStatus::NoPower, false)]
    #[case("Complete", ChargingStatus::Complete, false)]
    #[case("Weird", ChargingStatus::Unknown("Weird".to_string()), false)]
    fn test_charging_status(
        #[case] input: &str,
        #[case] expected: ChargingStatus,
        #[case] charging: bool,
    ) {
        let status = ChargingStatus::from(input);
        assert_eq!(status, expected);
        assert_eq!(status.is_charging(), charging);
    }

    #[test]
    fn test_snapshot_keeps_raw_payload() {
        let raw = json!({"batteryLevel": 55, "vendorSpecific": {"x": 1}});
        let snapshot = Snapshot::new("VIN1", Utc::now(), raw.clone());
        assert_eq!(snapshot.raw, raw);
        assert_eq!(snapshot.telemetry.battery_level, Some(55));
        assert!(!snapshot.is_charging());
    }
}
