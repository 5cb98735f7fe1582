//! Vehicle OBD-II (mode 01) replies.
//!
//! A reply is a space-separated hex line `41 <PID> XX [YY]`: the mode echo
//! (`0x40 + 0x01`), the PID, then one or two data bytes depending on the PID.

use std::fmt;

use crate::core::TelemetryError;

/// Mode 01 reply header.
const MODE_REPLY: u8 = 0x41;

/// Supported mode 01 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleParameter {
    /// Engine run time in seconds (PID 1F).
    EngineRunTime,
    /// Intake air temperature in °C (PID 0F).
    IntakeAirTemperature,
    /// Throttle position in % (PID 11).
    ThrottlePosition,
    /// Engine speed in RPM (PID 0C).
    EngineRpm,
    /// Vehicle speed in km/h (PID 0D).
    VehicleSpeed,
    /// Coolant temperature in °C (PID 05).
    CoolantTemperature,
}

impl VehicleParameter {
    /// All supported parameters.
    pub const ALL: [VehicleParameter; 6] = [
        VehicleParameter::EngineRunTime,
        VehicleParameter::IntakeAirTemperature,
        VehicleParameter::ThrottlePosition,
        VehicleParameter::EngineRpm,
        VehicleParameter::VehicleSpeed,
        VehicleParameter::CoolantTemperature,
    ];

    /// PID byte.
    pub const fn pid_byte(self) -> u8 {
        match self {
            VehicleParameter::EngineRunTime => 0x1F,
            VehicleParameter::IntakeAirTemperature => 0x0F,
            VehicleParameter::ThrottlePosition => 0x11,
            VehicleParameter::EngineRpm => 0x0C,
            VehicleParameter::VehicleSpeed => 0x0D,
            VehicleParameter::CoolantTemperature => 0x05,
        }
    }

    /// PID as two uppercase hex digits.
    pub fn pid(self) -> String {
        format!("{:02X}", self.pid_byte())
    }

    /// Data bytes carried by a reply.
    pub const fn data_len(self) -> usize {
        match self {
            VehicleParameter::EngineRunTime | VehicleParameter::EngineRpm => 2,
            _ => 1,
        }
    }

    /// Look up a parameter by PID byte.
    pub fn from_pid(pid: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.pid_byte() == pid)
    }

    /// Short name, usable as an output file stem.
    pub const fn name(self) -> &'static str {
        match self {
            VehicleParameter::EngineRunTime => "engine_run_time",
            VehicleParameter::IntakeAirTemperature => "intake_air_temperature",
            VehicleParameter::ThrottlePosition => "throttle_position",
            VehicleParameter::EngineRpm => "engine_rpm",
            VehicleParameter::VehicleSpeed => "vehicle_speed",
            VehicleParameter::CoolantTemperature => "coolant_temperature",
        }
    }

    fn value(self, xx: u8, yy: u8) -> f64 {
        let (xx, yy) = (xx as f64, yy as f64);
        match self {
            VehicleParameter::EngineRunTime => 256.0 * xx + yy,
            VehicleParameter::IntakeAirTemperature => xx - 40.0,
            VehicleParameter::ThrottlePosition => xx * 100.0 / 255.0,
            VehicleParameter::EngineRpm => ((256.0 * xx + yy) / 4.0).floor(),
            VehicleParameter::VehicleSpeed => xx,
            VehicleParameter::CoolantTemperature => xx - 40.0,
        }
    }
}

impl fmt::Display for VehicleParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded reading.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleReading {
    /// Which parameter was read.
    pub parameter: VehicleParameter,
    /// Value in the parameter's unit.
    pub value: f64,
}

/// Parse a reply line to a request for `expected`.
pub fn parse_reply(
    line: &str,
    expected: VehicleParameter,
) -> Result<VehicleReading, TelemetryError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let want = 2 + expected.data_len();
    if fields.len() != want {
        return Err(TelemetryError::FieldCount {
            expected: want,
            actual: fields.len(),
        });
    }

    let mode = hex_byte("mode", fields[0])?;
    let pid = hex_byte("pid", fields[1])?;
    if mode != MODE_REPLY || pid != expected.pid_byte() {
        return Err(TelemetryError::UnexpectedHeader(format!(
            "{} {}",
            fields[0], fields[1]
        )));
    }

    let xx = hex_byte("data", fields[2])?;
    let yy = match fields.get(3) {
        Some(field) => hex_byte("data", field)?,
        None => 0,
    };

    Ok(VehicleReading {
        parameter: expected,
        value: expected.value(xx, yy),
    })
}

fn hex_byte(field: &'static str, value: &str) -> Result<u8, TelemetryError> {
    u8::from_str_radix(value, 16).map_err(|_| TelemetryError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_round_trip() {
        for parameter in VehicleParameter::ALL {
            assert_eq!(VehicleParameter::from_pid(parameter.pid_byte()), Some(parameter));
        }
        assert_eq!(VehicleParameter::EngineRunTime.pid(), "1F");
        assert_eq!(VehicleParameter::CoolantTemperature.pid(), "05");
    }

    #[test]
    fn test_two_byte_formulas() {
        let run = parse_reply("41 1F 01 2C", VehicleParameter::EngineRunTime).unwrap();
        assert_eq!(run.value, 300.0);

        let rpm = parse_reply("41 0C 1A F8", VehicleParameter::EngineRpm).unwrap();
        assert_eq!(rpm.value, ((0x1A * 256 + 0xF8) / 4) as f64);
    }

    #[test]
    fn test_one_byte_formulas() {
        let intake = parse_reply("41 0F 50", VehicleParameter::IntakeAirTemperature).unwrap();
        assert_eq!(intake.value, 40.0);

        let coolant = parse_reply("41 05 28", VehicleParameter::CoolantTemperature).unwrap();
        assert_eq!(coolant.value, 0.0);

        let speed = parse_reply("41 0D 3C", VehicleParameter::VehicleSpeed).unwrap();
        assert_eq!(speed.value, 60.0);

        let throttle = parse_reply("41 11 FF", VehicleParameter::ThrottlePosition).unwrap();
        assert!((throttle.value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_field_count_validated() {
        assert_eq!(
            parse_reply("41 0C 1A", VehicleParameter::EngineRpm),
            Err(TelemetryError::FieldCount {
                expected: 4,
                actual: 3
            })
        );
        assert!(matches!(
            parse_reply("41 0D 3C 00", VehicleParameter::VehicleSpeed),
            Err(TelemetryError::FieldCount { .. })
        ));
    }

    #[test]
    fn test_header_validated() {
        assert!(matches!(
            parse_reply("41 0D 3C", VehicleParameter::CoolantTemperature),
            Err(TelemetryError::UnexpectedHeader(_))
        ));
        assert!(matches!(
            parse_reply("7F 0D 3C", VehicleParameter::VehicleSpeed),
            Err(TelemetryError::UnexpectedHeader(_))
        ));
        assert!(matches!(
            parse_reply("41 0D ZZ", VehicleParameter::VehicleSpeed),
            Err(TelemetryError::InvalidValue { field: "data", .. })
        ));
    }
}
