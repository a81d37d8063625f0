//! Entities exposed for each vehicle.
use serde::{Deserialize, Serialize};

use crate::telemetry::{Location, Telemetry};

/// A unique identifier for a configured vehicle
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq, Hash)]
pub struct Id(String);

impl Id {
    /// Create a new identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a str
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What sort of entity this is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// A measured value.
    Sensor,
    /// An on/off value.
    BinarySensor,
    /// A position.
    DeviceTracker,
}

/// The state of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric sensor value.
    Number(f64),
    /// Text sensor value.
    Text(String),
    /// Binary sensor value.
    Flag(bool),
    /// Tracker position.
    Location(Location),
    /// The car did not report this value.
    Unavailable,
}

impl Value {
    fn number(value: Option<f64>) -> Self {
        value.map_or(Value::Unavailable, Value::Number)
    }

    fn percent(value: Option<u8>) -> Self {
        value.map_or(Value::Unavailable, |v| Value::Number(f64::from(v)))
    }

    fn flag(value: Option<bool>) -> Self {
        value.map_or(Value::Unavailable, Value::Flag)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Flag(true) => write!(f, "on"),
            Value::Flag(false) => write!(f, "off"),
            Value::Location(l) => write!(f, "{},{}", l.latitude, l.longitude),
            Value::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Static description of an entity and how to read it from telemetry.
#[derive(Debug)]
pub struct Description {
    /// Stable key, used as the entity suffix.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Entity type.
    pub kind: Kind,
    /// Unit of measurement.
    pub unit: Option<&'static str>,
    /// Extract the value.
    pub value: fn(&Telemetry) -> Value,
}

impl Description {
    /// The entity id for a vehicle, e.g. `sensor.vf8_battery`.
    #[must_use]
    pub fn entity_id(&self, vehicle: &Id) -> String {
        let domain = match self.kind {
            Kind::Sensor => "sensor",
            Kind::BinarySensor => "binary_sensor",
            Kind::DeviceTracker => "device_tracker",
        };
        format!("{domain}.{}_{}", vehicle.as_str(), self.key)
    }
}

/// All entities, in display order.
pub static ENTITIES: &[Description] = &[
    Description {
        key: "odometer",
        name: "Odometer",
        kind: Kind::Sensor,
        unit: Some("km"),
        value: |t| Value::number(t.odometer),
    },
    Description {
        key: "battery",
        name: "Battery",
        kind: Kind::Sensor,
        unit: Some("%"),
        value: |t| Value::percent(t.battery_level),
    },
    Description {
        key: "range",
        name: "Range",
        kind: Kind::Sensor,
        unit: Some("km"),
        value: |t| Value::number(t.remaining_range),
    },
    Description {
        key: "charge_limit",
        name: "Charge limit",
        kind: Kind::Sensor,
        unit: Some("%"),
        value: |t| Value::percent(t.charge_limit),
    },
    Description {
        key: "charging_status",
        name: "Charging status",
        kind: Kind::Sensor,
        unit: None,
        value: |t| {
            t.charging_status
                .as_ref()
                .map_or(Value::Unavailable, |s| Value::Text(s.as_str().to_string()))
        },
    },
    Description {
        key: "time_to_full",
        name: "Time to full charge",
        kind: Kind::Sensor,
        unit: Some("min"),
        value: |t| Value::number(t.time_to_full_charge),
    },
    Description {
        key: "charging_power",
        name: "Charging power",
        kind: Kind::Sensor,
        unit: Some("kW"),
        value: |t| Value::number(t.charging_power),
    },
    Description {
        key: "inside_temperature",
        name: "Inside temperature",
        kind: Kind::Sensor,
        unit: Some("°C"),
        value: |t| Value::number(t.inside_temperature),
    },
    Description {
        key: "outside_temperature",
        name: "Outside temperature",
        kind: Kind::Sensor,
        unit: Some("°C"),
        value: |t| Value::number(t.outside_temperature),
    },
    Description {
        key: "gear",
        name: "Gear",
        kind: Kind::Sensor,
        unit: None,
        value: |t| t.gear.clone().map_or(Value::Unavailable, Value::Text),
    },
    Description {
        key: "tire_pressure_fl",
        name: "Tire pressure front left",
        kind: Kind::Sensor,
        unit: Some("kPa"),
        value: |t| Value::number(t.tire_pressures.front_left),
    },
    Description {
        key: "tire_pressure_fr",
        name: "Tire pressure front right",
        kind: Kind::Sensor,
        unit: Some("kPa"),
        value: |t| Value::number(t.tire_pressures.front_right),
    },
    Description {
        key: "tire_pressure_rl",
        name: "Tire pressure rear left",
        kind: Kind::Sensor,
        unit: Some("kPa"),
        value: |t| Value::number(t.tire_pressures.rear_left),
    },
    Description {
        key: "tire_pressure_rr",
        name: "Tire pressure rear right",
        kind: Kind::Sensor,
        unit: Some("kPa"),
        value: |t| Value::number(t.tire_pressures.rear_right),
    },
    Description {
        key: "charging",
        name: "Charging",
        kind: Kind::BinarySensor,
        unit: None,
        value: |t| {
            t.charging_status
                .as_ref()
                .map_or(Value::Unavailable, |s| Value::Flag(s.is_charging()))
        },
    },
    Description {
        key: "locked",
        name: "Locked",
        kind: Kind::BinarySensor,
        unit: None,
        value: |t| Value::flag(t.locked),
    },
    Description {
        key: "plug",
        name: "Plug",
        kind: Kind::BinarySensor,
        unit: None,
        value: |t| Value::flag(t.plug_connected),
    },
    Description {
        key: "power",
        name: "Power",
        kind: Kind::BinarySensor,
        unit: None,
        value: |t| Value::flag(t.ignition_on),
    },
    Description {
        key: "door",
        name: "Door",
        kind: Kind::BinarySensor,
        unit: None,
        value: |t| Value::flag(t.doors_open),
    },
    Description {
        key: "window",
        name: "Window",
        kind: Kind::BinarySensor,
        unit: None,
        value: |t| Value::flag(t.windows_open),
    },
    Description {
        key: "trunk",
        name: "Trunk",
        kind: Kind::BinarySensor,
        unit: None,
        value: |t| Value::flag(t.trunk_open),
    },
    Description {
        key: "hood",
        name: "Hood",
        kind: Kind::BinarySensor,
        unit: None,
        value: |t| Value::flag(t.hood_open),
    },
    Description {
        key: "location",
        name: "Location",
        kind: Kind::DeviceTracker,
        unit: None,
        value: |t| t.location.map_or(Value::Unavailable, Value::Location),
    },
];

/// Every entity with its value for the given telemetry.
pub fn states(telemetry: &Telemetry) -> impl Iterator<Item = (&'static Description, Value)> + '_ {
    ENTITIES.iter().map(move |d| (d, (d.value)(telemetry)))
}

/// Entities whose value differs between two telemetry readings.
///
/// With no previous reading every entity counts as changed.
pub fn changed<'a>(
    old: Option<&'a Telemetry>,
    new: &'a Telemetry,
) -> impl Iterator<Item = (&'static Description, Value)> + 'a {
    states(new).filter(move |(d, value)| old.map_or(true, |old| (d.value)(old) != *value))
}
