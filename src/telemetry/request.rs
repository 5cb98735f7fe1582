//! Lab request codes.
//!
//! Every lab operation starts with an ASCII request datagram (or TCP line)
//! naming the operation and the session code issued by the lab.

use std::fmt;

use crate::core::constants::{ECHO_REPLY_LEN, ECHO_TEMPERATURE_REPLY_LEN};

use super::vehicle::VehicleParameter;

/// Where a DPCM sound request is sourced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundSource {
    /// A recorded track (`T`).
    Track,
    /// The frequency generator (`F`).
    Frequency,
}

impl SoundSource {
    fn code(self) -> char {
        match self {
            SoundSource::Track => 'T',
            SoundSource::Frequency => 'F',
        }
    }
}

/// A request sent to the lab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Echo, optionally with temperature readings appended to the reply.
    Echo {
        /// Echo session code.
        code: String,
        /// Ask for temperature readings.
        temperature: bool,
    },
    /// Image capture.
    Image {
        /// Image session code.
        code: String,
        /// Camera name (e.g. `FIX`, `PTZ`).
        camera: String,
        /// Datagram size for the transfer.
        packet_len: usize,
        /// Ask the lab to wait for a `NEXT` before each datagram.
        flow: bool,
    },
    /// Flow-control acknowledgement during an image transfer.
    Next,
    /// Move the PTZ camera.
    CameraMove {
        /// Image session code.
        code: String,
        /// Direction keyword (`L`, `R`, `U`, `D`, `C`, `M`).
        direction: String,
    },
    /// DPCM sound stream.
    Sound {
        /// Sound session code.
        code: String,
        /// Track or frequency generator.
        source: SoundSource,
        /// Packets to stream.
        packets: u32,
    },
    /// AQ-DPCM sound stream.
    SoundAq {
        /// Sound session code.
        code: String,
        /// Packets to stream.
        packets: u32,
    },
    /// Copter autopilot command (TCP).
    CopterAutopilot {
        /// Target flight level.
        flight_level: u16,
        /// Motor setting for both motors.
        motor: u16,
    },
    /// Vehicle OBD-II query (TCP).
    Vehicle(VehicleParameter),
}

impl Request {
    /// Wire bytes of the request.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Size of the expected reply datagram, for requests with a fixed one.
    pub fn reply_len(&self) -> Option<usize> {
        match self {
            Request::Echo { temperature, .. } => Some(if *temperature {
                ECHO_TEMPERATURE_REPLY_LEN
            } else {
                ECHO_REPLY_LEN
            }),
            Request::Image { packet_len, .. } => Some(*packet_len),
            _ => None,
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Echo {
                code,
                temperature: false,
            } => write!(f, "echo_request_code=E{code}"),
            Request::Echo {
                code,
                temperature: true,
            } => write!(f, "echo_request_codeT00=E{code}"),
            Request::Image {
                code,
                camera,
                packet_len,
                flow,
            } => {
                write!(f, "image_request_code=M{code}")?;
                if *flow {
                    f.write_str("FLOW=ON")?;
                }
                write!(f, "CAM={camera}UDP={packet_len}")
            }
            Request::Next => f.write_str("NEXT"),
            Request::CameraMove { code, direction } => {
                write!(f, "image_request_code=M{code}CAM=PTZDIR={direction}")
            }
            Request::Sound {
                code,
                source,
                packets,
            } => write!(f, "sound_request_code=A{code}{}{packets}", source.code()),
            Request::SoundAq { code, packets } => {
                write!(f, "sound_request_code=A{code}AQF{packets}")
            }
            Request::CopterAutopilot {
                flight_level,
                motor,
            } => write!(
                f,
                "AUTO FLIGHTLEVEL={flight_level} LMOTOR={motor} RMOTOR={motor} PILOT \r\n"
            ),
            Request::Vehicle(parameter) => write!(f, "01 {}\r", parameter.pid()),
        }
    }
}
