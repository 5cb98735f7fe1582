//! Ithaki lab session runner.
//!
//! Runs one lab session and writes every measured series, one value per
//! line, plus a `summary.json` into the output directory. Audio sessions
//! also write `dpcm.wav` or `aqdpcm.wav` (8 kHz mono).
//!
//! Environment variables:
//! - ITHAKI_MODE: echo | dpcm | aqdpcm | image | copter | vehicle
//! - ITHAKI_CODE: request code for the session
//! - ITHAKI_ECHO_CODE: echo code used to open the session (default ITHAKI_CODE)
//! - ITHAKI_OUT_DIR: output directory (default .)
//! - ITHAKI_TEMPERATURE: request temperature echoes (echo only)
//! - ITHAKI_PACKETS: audio packets to stream (default 999)
//! - ITHAKI_SOURCE: T | F, DPCM source (default F)
//! - ITHAKI_CAMERA: FIX | PTZ (default FIX)
//! - ITHAKI_FLOW: use image flow control
//! - ITHAKI_READINGS: copter/vehicle readings (default 120)
//! - ITHAKI_VEHICLE_PID: OBD-II PID in hex (default 0C)
//! - ITHAKI_LOG_LEVEL: trace|debug|info|warn|error
//!
//! Lab addresses and timeouts come from `LabConfig::from_env`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use ithaki_telemetry::LabError;
use ithaki_telemetry::client::{LabClient, LabConfig};
use ithaki_telemetry::codec::{WavSink, WavSpec};
use ithaki_telemetry::estimate::EchoReport;
use ithaki_telemetry::export::write_series_file;
use ithaki_telemetry::telemetry::{SoundSource, VehicleParameter};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Lab(#[from] LabError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Settings(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Mode {
    Echo,
    Dpcm,
    AqDpcm,
    Image,
    Copter,
    Vehicle,
}

impl FromStr for Mode {
    type Err = RunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "echo" => Ok(Mode::Echo),
            "dpcm" => Ok(Mode::Dpcm),
            "aqdpcm" => Ok(Mode::AqDpcm),
            "image" => Ok(Mode::Image),
            "copter" => Ok(Mode::Copter),
            "vehicle" => Ok(Mode::Vehicle),
            other => Err(RunError::Settings(format!("unknown ITHAKI_MODE {other:?}"))),
        }
    }
}

#[derive(Debug)]
struct Settings {
    mode: Mode,
    code: String,
    echo_code: String,
    out_dir: PathBuf,
    temperature: bool,
    packets: u32,
    source: SoundSource,
    camera: String,
    flow: bool,
    readings: usize,
    vehicle: VehicleParameter,
}

impl Settings {
    fn from_env() -> Result<Self, RunError> {
        let mode = var("ITHAKI_MODE")
            .ok_or_else(|| RunError::Settings("ITHAKI_MODE is not set".into()))?
            .parse()?;
        let code = var("ITHAKI_CODE").unwrap_or_default();
        let echo_code = var("ITHAKI_ECHO_CODE").unwrap_or_else(|| code.clone());

        let source = match var("ITHAKI_SOURCE").as_deref() {
            None | Some("F") | Some("f") => SoundSource::Frequency,
            Some("T") | Some("t") => SoundSource::Track,
            Some(other) => return Err(RunError::Settings(format!("ITHAKI_SOURCE: {other:?}"))),
        };

        let vehicle = match var("ITHAKI_VEHICLE_PID") {
            None => VehicleParameter::EngineRpm,
            Some(pid) => u8::from_str_radix(&pid, 16)
                .ok()
                .and_then(VehicleParameter::from_pid)
                .ok_or_else(|| RunError::Settings(format!("ITHAKI_VEHICLE_PID: {pid:?}")))?,
        };

        Ok(Self {
            mode,
            code,
            echo_code,
            out_dir: var("ITHAKI_OUT_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from),
            temperature: flag("ITHAKI_TEMPERATURE"),
            packets: parsed("ITHAKI_PACKETS", 999)?,
            source,
            camera: var("ITHAKI_CAMERA").unwrap_or_else(|| "FIX".into()),
            flow: flag("ITHAKI_FLOW"),
            readings: parsed("ITHAKI_READINGS", 120)?,
            vehicle,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn flag(key: &str) -> bool {
    matches!(var(key).as_deref(), Some("1" | "true" | "on" | "yes"))
}

fn parsed<T: FromStr>(key: &str, default: T) -> Result<T, RunError> {
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| RunError::Settings(format!("{key}: invalid value {raw:?}"))),
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    mode: Mode,
    code: String,
    files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    echo: Option<EchoReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    packets: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejected: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    readings: Option<usize>,
}

struct Output {
    dir: PathBuf,
    files: Vec<String>,
}

impl Output {
    fn series<T: std::fmt::Display>(&mut self, name: &str, values: &[T]) -> Result<(), RunError> {
        write_series_file(self.dir.join(name), values, None)?;
        self.files.push(name.to_string());
        Ok(())
    }

    fn dpcm_wav(&mut self, name: &str, samples: &[i8]) -> Result<(), RunError> {
        let mut sink = WavSink::create(self.dir.join(name), WavSpec::dpcm())?;
        sink.write_pcm8(samples)?;
        sink.finish()?;
        self.files.push(name.to_string());
        Ok(())
    }

    fn aqdpcm_wav(&mut self, name: &str, samples: &[i32]) -> Result<(), RunError> {
        let mut sink = WavSink::create(self.dir.join(name), WavSpec::aqdpcm())?;
        sink.write_pcm16(samples)?;
        sink.finish()?;
        self.files.push(name.to_string());
        Ok(())
    }

    fn bytes(&mut self, name: &str, data: &[u8]) -> Result<(), RunError> {
        fs::write(self.dir.join(name), data)?;
        self.files.push(name.to_string());
        Ok(())
    }
}

async fn run(settings: Settings) -> Result<(), RunError> {
    let config = LabConfig::from_env()?;
    fs::create_dir_all(&settings.out_dir)?;

    let mut client = LabClient::connect(config).await?;
    let answered = client.initiate(&settings.echo_code).await?;
    info!(answered, "session opened");

    let mut out = Output {
        dir: settings.out_dir.clone(),
        files: Vec::new(),
    };
    let mut summary = Summary {
        mode: settings.mode,
        code: settings.code.clone(),
        files: Vec::new(),
        echo: None,
        packets: None,
        rejected: None,
        readings: None,
    };

    match settings.mode {
        Mode::Echo => {
            let report = client
                .echo_session(&settings.code, settings.temperature, None)
                .await?;
            out.series("rtt.txt", &report.rtts_ms())?;
            let srtt: Vec<f64> = report.rtt.iter().map(|s| s.srtt).collect();
            let deviation: Vec<f64> = report.rtt.iter().map(|s| s.mean_deviation).collect();
            let rto: Vec<f64> = report.rtt.iter().map(|s| s.rto).collect();
            out.series("srtt.txt", &srtt)?;
            out.series("deviation.txt", &deviation)?;
            out.series("rto.txt", &rto)?;
            for (window_ms, name) in [
                (8000, "throughput_8s.txt"),
                (16000, "throughput_16s.txt"),
                (32000, "throughput_32s.txt"),
            ] {
                out.series(name, &report.rates_for(window_ms))?;
            }
            summary.echo = Some(report);
        }
        Mode::Dpcm => {
            let stream = client
                .dpcm_session(&settings.code, settings.source, settings.packets)
                .await?;
            out.series("samples.txt", &stream.samples)?;
            out.series("differences.txt", &stream.differences)?;
            out.dpcm_wav("dpcm.wav", &stream.samples)?;
            summary.packets = Some(stream.packets);
            summary.rejected = Some(stream.rejected.len());
        }
        Mode::AqDpcm => {
            let stream = client.aqdpcm_session(&settings.code, settings.packets).await?;
            out.series("samples.txt", &stream.samples)?;
            out.series("differences.txt", &stream.differences)?;
            out.series("means.txt", &stream.means)?;
            out.series("steps.txt", &stream.steps)?;
            out.aqdpcm_wav("aqdpcm.wav", &stream.samples)?;
            summary.packets = Some(stream.packets());
            summary.rejected = Some(stream.rejected.len());
        }
        Mode::Image => {
            let packet_len = client.config().image_packet_len;
            let frame = client
                .image(&settings.code, &settings.camera, packet_len, settings.flow)
                .await?;
            out.bytes("image.jpg", &frame)?;
        }
        Mode::Copter => {
            let readings = client.copter_telemetry(settings.readings).await?;
            let column = |f: fn(&ithaki_telemetry::telemetry::CopterReading) -> f64| -> Vec<f64> {
                readings.iter().map(f).collect()
            };
            out.series("left_motor.txt", &column(|r| r.left_motor as f64))?;
            out.series("right_motor.txt", &column(|r| r.right_motor as f64))?;
            out.series("altitude.txt", &column(|r| r.altitude as f64))?;
            out.series("temperature.txt", &column(|r| r.temperature))?;
            out.series("pressure.txt", &column(|r| r.pressure))?;
            summary.readings = Some(readings.len());
        }
        Mode::Vehicle => {
            let readings = client.vehicle(settings.vehicle, settings.readings).await?;
            let values: Vec<f64> = readings.iter().map(|r| r.value).collect();
            out.series(&format!("{}.txt", settings.vehicle.name()), &values)?;
            summary.readings = Some(readings.len());
        }
    }

    summary.files = out.files;
    write_summary(&settings.out_dir, &summary)?;
    info!(files = summary.files.len(), dir = %settings.out_dir.display(), "session exported");
    Ok(())
}

fn write_summary(dir: &Path, summary: &Summary) -> Result<(), RunError> {
    let file = fs::File::create(dir.join("summary.json"))?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}

fn init_logging() {
    let level = var("ITHAKI_LOG_LEVEL")
        .and_then(|l| l.parse().ok())
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let result = match Settings::from_env() {
        Ok(settings) => run(settings).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "lab session failed");
            ExitCode::FAILURE
        }
    }
}
