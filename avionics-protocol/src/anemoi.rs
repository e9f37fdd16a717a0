//! Anemoi wind and attitude sensor.
//!
//! Frames are `['$'][code][payload][crc8]` with a fixed payload length per
//! code and all multi-byte fields big endian. The CRC-8 over the whole
//! frame, CRC byte included, is zero.

use packed_struct::prelude::*;
use wind_estimator_core::{
    NmeaInfo, SpeedVector,
    units::{flight_level_to_meters, kmh_to_mps},
};

use crate::{
    checksum::ANEMOI_CRC,
    device::Device,
    framer::{FrameLength, FrameProtocol, FrameResynchronizer},
};

/// `$` + code + crc
const FRAME_OVERHEAD: usize = 3;

/// km/h
const MAX_WIND_SPEED: u8 = 200;

fn payload_length(code: u8) -> Option<usize> {
    match code {
        b'S' => Some(2),
        b'w' | b'W' => Some(8),
        b'a' | b'A' => Some(7),
        b'd' | b'D' => Some(12),
        b'M' => Some(4),
        _ => None,
    }
}

#[derive(PackedStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[packed_struct(endian = "msb")]
struct AttitudeRaw {
    roll: i16,
    pitch: i8,
    heading: i16,
    circle_diameter: i16,
}

#[derive(PackedStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[packed_struct(endian = "msb")]
struct WindRaw {
    live_direction: i16,
    live_speed: u8,
    average_direction: i16,
    average_speed: u8,
    heading: i16,
}

#[derive(PackedStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[packed_struct(endian = "msb")]
struct DataRaw {
    ground_speed: i16,
    true_airspeed: i16,
    track: i16,
    heading: i16,
    temperature: i8,
    pitot_calibration: i8,
    flight_level: i16,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnemoiProtocol;

impl FrameProtocol for AnemoiProtocol {
    const START_BYTE: u8 = b'$';

    fn frame_length(&self, data: &[u8]) -> FrameLength {
        let Some(&code) = data.get(1) else {
            return FrameLength::Pending;
        };
        match payload_length(code) {
            Some(n) => FrameLength::Complete(n + FRAME_OVERHEAD),
            None => FrameLength::Discard(1),
        }
    }

    fn verify(&self, frame: &[u8]) -> bool {
        ANEMOI_CRC.checksum(frame) == 0
    }
}

fn provide_heading(heading: i16, info: &mut NmeaInfo) {
    if (0..=360).contains(&heading) {
        info.provide_heading(heading as f32);
    }
}

fn wind_vector(direction: i16, speed: u8) -> Option<SpeedVector> {
    if (0..=360).contains(&direction) && speed <= MAX_WIND_SPEED {
        Some(SpeedVector::new(
            direction as f32 % 360.0,
            kmh_to_mps(speed as f32),
        ))
    } else {
        None
    }
}

fn parse_attitude(raw: AttitudeRaw, info: &mut NmeaInfo) {
    let AttitudeRaw {
        roll,
        pitch,
        heading,
        circle_diameter: _,
    } = raw;
    if (-180..=180).contains(&roll) {
        info.attitude.bank_angle = roll as f32;
        info.attitude.bank_angle_available.update(info.clock);
    }
    if (-90..=90).contains(&pitch) {
        info.attitude.pitch_angle = pitch as f32;
        info.attitude.pitch_angle_available.update(info.clock);
    }
    provide_heading(heading, info);
}

fn parse_wind(raw: WindRaw, info: &mut NmeaInfo) {
    if let Some(wind) = wind_vector(raw.live_direction, raw.live_speed) {
        info.provide_external_instantaneous_wind(wind);
    }
    if let Some(wind) = wind_vector(raw.average_direction, raw.average_speed) {
        info.provide_external_wind(wind);
    }
    provide_heading(raw.heading, info);
}

fn parse_data(raw: DataRaw, info: &mut NmeaInfo) {
    if (0..500).contains(&raw.ground_speed) {
        info.provide_ground_speed(kmh_to_mps(raw.ground_speed as f32));
    }
    if (0..500).contains(&raw.true_airspeed) {
        info.provide_true_airspeed(kmh_to_mps(raw.true_airspeed as f32));
    }
    if (0..=360).contains(&raw.track) {
        info.provide_track(raw.track as f32 % 360.0);
    }
    provide_heading(raw.heading, info);
    if (-50..=100).contains(&raw.temperature) {
        info.temperature = raw.temperature as f32;
        info.temperature_available = true;
    }
    if (0..=300).contains(&raw.flight_level) {
        info.provide_baro_altitude(flight_level_to_meters(raw.flight_level as f32));
    }
}

/// Decodes a verified frame. Returns false for codes without blackboard
/// values (sensor health, `M`).
fn handle_frame(frame: &[u8], info: &mut NmeaInfo) -> bool {
    let payload = &frame[2..frame.len() - 1];
    let decoded = match frame[1] {
        b'a' | b'A' => AttitudeRaw::unpack_from_slice(payload).map(|raw| parse_attitude(raw, info)),
        b'w' | b'W' => WindRaw::unpack_from_slice(payload).map(|raw| parse_wind(raw, info)),
        b'd' | b'D' => DataRaw::unpack_from_slice(payload).map(|raw| parse_data(raw, info)),
        _ => return false,
    };
    decoded.is_ok()
}

pub struct AnemoiDevice {
    framer: FrameResynchronizer<AnemoiProtocol>,
}

impl AnemoiDevice {
    pub fn new() -> Self {
        Self {
            framer: FrameResynchronizer::new(AnemoiProtocol),
        }
    }

    pub fn framer(&self) -> &FrameResynchronizer<AnemoiProtocol> {
        &self.framer
    }
}

impl Default for AnemoiDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for AnemoiDevice {
    fn data_received(&mut self, data: &[u8], info: &mut NmeaInfo) -> bool {
        let mut received = false;
        self.framer.push(data, |frame| {
            received = true;
            info.alive.update(info.clock);
            if !handle_frame(frame, info) {
                log_trace!("anemoi frame {} carries no data", frame[1]);
            }
        });
        received
    }

    fn reset(&mut self) {
        self.framer.clear();
    }
}
