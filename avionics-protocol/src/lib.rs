#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod fmt;

pub mod anemoi;
pub mod ar62xx;
pub mod checksum;
pub mod device;
pub mod framer;
pub mod input_line;
pub mod nmea;

pub use anemoi::AnemoiDevice;
pub use ar62xx::{Ar62xxDevice, CommandError};
pub use device::Device;
pub use framer::{FrameError, FrameLength, FrameProtocol, FrameResynchronizer, FramerStats};
pub use input_line::NmeaInputLine;
pub use nmea::NmeaDevice;

#[cfg(test)]
mod tests;
