//! Copter telemetry lines.
//!
//! The copter streams one ASCII line per datagram made of space-separated
//! tokens. Readings are `KEY=VALUE` tokens; anything else is ignored.
//!
//! ```text
//! ITHAKICOPTER IP=... TIME=... LMOTOR=150 RMOTOR=150 ALTITUDE=220 TEMPERATURE=+27.50 PRESSURE=1012.34
//! ```

use std::collections::HashMap;
use std::str::FromStr;

use crate::core::TelemetryError;

/// One telemetry line.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CopterReading {
    /// Left motor setting.
    pub left_motor: u16,
    /// Right motor setting.
    pub right_motor: u16,
    /// Altitude.
    pub altitude: u16,
    /// Temperature in °C.
    pub temperature: f64,
    /// Pressure in mbar.
    pub pressure: f64,
}

impl FromStr for CopterReading {
    type Err = TelemetryError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tags: HashMap<&str, &str> = line
            .split_whitespace()
            .filter_map(|token| token.split_once('='))
            .collect();

        Ok(Self {
            left_motor: field(&tags, "LMOTOR")?,
            right_motor: field(&tags, "RMOTOR")?,
            altitude: field(&tags, "ALTITUDE")?,
            temperature: field(&tags, "TEMPERATURE")?,
            pressure: field(&tags, "PRESSURE")?,
        })
    }
}

fn field<T: FromStr>(tags: &HashMap<&str, &str>, name: &'static str) -> Result<T, TelemetryError> {
    let raw = tags.get(name).ok_or(TelemetryError::MissingField(name))?;
    raw.trim_start_matches('+')
        .parse()
        .map_err(|_| TelemetryError::InvalidValue {
            field: name,
            value: (*raw).to_string(),
        })
}
