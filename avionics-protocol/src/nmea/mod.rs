//! Line based NMEA 0183 input: standard GPS sentences plus the `$POV` and
//! `$PLARW` vendor sentences.

mod gps;
mod vendor;

use wind_estimator_core::NmeaInfo;

use crate::{
    checksum::{trim_line_end, verify_nmea_checksum},
    device::Device,
    framer::{FrameLength, FrameProtocol, FrameResynchronizer},
    input_line::NmeaInputLine,
};

pub use gps::GpsParser;

/// Longest line accepted, including `$`, checksum and CR/LF.
pub const MAX_LINE_LENGTH: usize = 128;

#[derive(Debug, Clone, Copy, Default)]
pub struct NmeaLineProtocol;

impl FrameProtocol for NmeaLineProtocol {
    const START_BYTE: u8 = b'$';

    fn frame_length(&self, data: &[u8]) -> FrameLength {
        for (i, &b) in data.iter().enumerate().take(MAX_LINE_LENGTH).skip(1) {
            match b {
                b'\n' => return FrameLength::Complete(i + 1),
                // line cut short, resync on the new start
                b'$' => return FrameLength::Discard(i),
                _ => {}
            }
        }

        if data.len() >= MAX_LINE_LENGTH {
            FrameLength::Discard(MAX_LINE_LENGTH)
        } else {
            FrameLength::Pending
        }
    }

    fn verify(&self, frame: &[u8]) -> bool {
        verify_nmea_checksum(frame)
    }
}

/// Decodes one checksummed line. Returns true if any value was stored.
pub fn parse_line(gps: &mut GpsParser, line: &str, info: &mut NmeaInfo) -> bool {
    let mut input = NmeaInputLine::new(line);
    match input.read_view() {
        "$POV" => vendor::parse_pov(input, info),
        "$PLARW" => vendor::parse_plarw(input, info),
        _ => gps.parse(line, info),
    }
}

pub struct NmeaDevice {
    framer: FrameResynchronizer<NmeaLineProtocol>,
    gps: GpsParser,
}

impl NmeaDevice {
    pub fn new() -> Self {
        Self {
            framer: FrameResynchronizer::new(NmeaLineProtocol),
            gps: GpsParser::default(),
        }
    }

    pub fn framer(&self) -> &FrameResynchronizer<NmeaLineProtocol> {
        &self.framer
    }
}

impl Default for NmeaDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for NmeaDevice {
    fn data_received(&mut self, data: &[u8], info: &mut NmeaInfo) -> bool {
        let Self { framer, gps } = self;
        let mut received = false;
        framer.push(data, |frame| {
            received = true;
            info.alive.update(info.clock);

            let Ok(line) = core::str::from_utf8(trim_line_end(frame)) else {
                log_debug!("dropping non ascii line");
                return;
            };
            if !parse_line(gps, line, info) {
                log_trace!("nothing decoded from {}", line);
            }
        });
        received
    }

    fn reset(&mut self) {
        self.framer.clear();
    }
}
