//! Lab request codes and the text/image telemetry the lab returns.

pub mod copter;
pub mod image;
pub mod request;
pub mod vehicle;

pub use copter::CopterReading;
pub use image::ImageAssembler;
pub use request::{Request, SoundSource};
pub use vehicle::{VehicleParameter, VehicleReading};
