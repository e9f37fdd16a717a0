//! Becker AR62xx / RT62xx VHF transceivers.
//!
//! Frames are `[0xA5][0x14][LEN][FRAME-ID][value block][CRC16 BE]` where
//! `LEN` covers frame id and value block. The radio broadcasts frame 22
//! with its active and standby frequency ids; the same frame sets both.
//! Setting a single frequency through frames 1/2 is undone by the control
//! head, so commands always carry both.

use wind_estimator_core::{NmeaInfo, RadioFrequency};

use crate::{
    checksum::AR62XX_CRC,
    device::Device,
    framer::{FrameLength, FrameProtocol, FrameResynchronizer},
};

pub const HEADER: u8 = 0xA5;
pub const PROTOCOL_ID: u8 = 0x14;
pub const FREQUENCY_FRAME_ID: u8 = 22;
/// header, protocol id, length
const PREFIX_LENGTH: usize = 3;
const CRC_LENGTH: usize = 2;
/// frame id + two u16 ids
const FREQUENCY_BLOCK_LENGTH: u8 = 5;
pub const FREQUENCY_FRAME_LENGTH: usize =
    PREFIX_LENGTH + FREQUENCY_BLOCK_LENGTH as usize + CRC_LENGTH;

/// kHz offsets within each 100 kHz step, 25 kHz and 8.33 kHz raster.
pub const CHANNELS: [u32; 16] = [0, 5, 10, 15, 25, 30, 35, 40, 50, 55, 60, 65, 75, 80, 85, 90];
/// 118.0 MHz in units of 100 kHz.
const FIRST_FREQUENCY: u32 = 1180;
pub const MAX_FREQUENCY_ID: u16 = 3039;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The radio has not reported its current frequencies yet, sending
    /// would overwrite the other station.
    FrequencyUnknown,
    /// Outside the airband or not on the channel raster.
    FrequencyOutOfRange,
}

pub fn id_to_frequency(id: u16) -> Option<RadioFrequency> {
    if id > MAX_FREQUENCY_ID {
        return None;
    }
    let id = id as u32;
    let channel = CHANNELS[(id % 16) as usize];
    let hundreds = id / 16 + FIRST_FREQUENCY;
    Some(RadioFrequency::from_kilohertz(hundreds * 100 + channel))
}

pub fn frequency_to_id(frequency: RadioFrequency) -> Result<u16, CommandError> {
    if !frequency.is_in_airband() {
        return Err(CommandError::FrequencyOutOfRange);
    }
    let khz = frequency.kilohertz();
    let channel = CHANNELS
        .iter()
        .position(|&c| c == khz % 100)
        .ok_or(CommandError::FrequencyOutOfRange)?;
    Ok(((khz / 100 - FIRST_FREQUENCY) * 16) as u16 + channel as u16)
}

/// Frame 22 setting both stations.
pub fn encode_frequency_command(
    active: RadioFrequency,
    standby: RadioFrequency,
) -> Result<[u8; FREQUENCY_FRAME_LENGTH], CommandError> {
    let active = frequency_to_id(active)?.to_be_bytes();
    let standby = frequency_to_id(standby)?.to_be_bytes();

    let mut command = [0u8; FREQUENCY_FRAME_LENGTH];
    command[..8].copy_from_slice(&[
        HEADER,
        PROTOCOL_ID,
        FREQUENCY_BLOCK_LENGTH,
        FREQUENCY_FRAME_ID,
        active[0],
        active[1],
        standby[0],
        standby[1],
    ]);
    let crc = AR62XX_CRC.checksum(&command[..8]);
    command[8..].copy_from_slice(&crc.to_be_bytes());
    Ok(command)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ar62xxProtocol;

impl FrameProtocol for Ar62xxProtocol {
    const START_BYTE: u8 = HEADER;

    fn frame_length(&self, data: &[u8]) -> FrameLength {
        match data {
            [_, protocol, ..] if *protocol != PROTOCOL_ID => FrameLength::Discard(1),
            [_, _, length, ..] => {
                FrameLength::Complete(PREFIX_LENGTH + *length as usize + CRC_LENGTH)
            }
            _ => FrameLength::Pending,
        }
    }

    fn verify(&self, frame: &[u8]) -> bool {
        if frame.len() < PREFIX_LENGTH + CRC_LENGTH {
            return false;
        }
        let (body, crc) = frame.split_at(frame.len() - CRC_LENGTH);
        AR62XX_CRC.checksum(body) == u16::from_be_bytes([crc[0], crc[1]])
    }
}

pub struct Ar62xxDevice {
    framer: FrameResynchronizer<Ar62xxProtocol>,
    active_frequency: Option<RadioFrequency>,
    standby_frequency: Option<RadioFrequency>,
}

impl Ar62xxDevice {
    pub fn new() -> Self {
        Self {
            framer: FrameResynchronizer::new(Ar62xxProtocol),
            active_frequency: None,
            standby_frequency: None,
        }
    }

    pub fn active_frequency(&self) -> Option<RadioFrequency> {
        self.active_frequency
    }

    pub fn standby_frequency(&self) -> Option<RadioFrequency> {
        self.standby_frequency
    }

    pub fn framer(&self) -> &FrameResynchronizer<Ar62xxProtocol> {
        &self.framer
    }

    /// Command frame changing the active station, keeping the standby one.
    pub fn put_active_frequency(
        &mut self,
        frequency: RadioFrequency,
    ) -> Result<[u8; FREQUENCY_FRAME_LENGTH], CommandError> {
        let standby = self
            .standby_frequency
            .ok_or(CommandError::FrequencyUnknown)?;
        self.active_frequency.ok_or(CommandError::FrequencyUnknown)?;
        let command = encode_frequency_command(frequency, standby)?;
        self.active_frequency = Some(frequency);
        Ok(command)
    }

    /// Command frame changing the standby station, keeping the active one.
    pub fn put_standby_frequency(
        &mut self,
        frequency: RadioFrequency,
    ) -> Result<[u8; FREQUENCY_FRAME_LENGTH], CommandError> {
        let active = self.active_frequency.ok_or(CommandError::FrequencyUnknown)?;
        self.standby_frequency.ok_or(CommandError::FrequencyUnknown)?;
        let command = encode_frequency_command(active, frequency)?;
        self.standby_frequency = Some(frequency);
        Ok(command)
    }
}

impl Default for Ar62xxDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// `(active, standby)` from a verified frequency broadcast.
fn decode_frequencies(frame: &[u8]) -> Option<(RadioFrequency, RadioFrequency)> {
    match frame {
        [_, _, FREQUENCY_BLOCK_LENGTH, FREQUENCY_FRAME_ID, a0, a1, s0, s1, _, _] => Some((
            id_to_frequency(u16::from_be_bytes([*a0, *a1]))?,
            id_to_frequency(u16::from_be_bytes([*s0, *s1]))?,
        )),
        _ => None,
    }
}

impl Device for Ar62xxDevice {
    fn data_received(&mut self, data: &[u8], info: &mut NmeaInfo) -> bool {
        let Self {
            framer,
            active_frequency,
            standby_frequency,
        } = self;
        let mut received = false;
        framer.push(data, |frame| {
            received = true;
            info.alive.update(info.clock);

            let Some((active, standby)) = decode_frequencies(frame) else {
                // volume, test status and other broadcasts
                return;
            };
            if *active_frequency != Some(active) || *standby_frequency != Some(standby) {
                log_info!("radio reports active {} standby {}", active.kilohertz(), standby.kilohertz());
            }
            *active_frequency = Some(active);
            *standby_frequency = Some(standby);
            info.radio.active_frequency = Some(active);
            info.radio.standby_frequency = Some(standby);
        });
        received
    }

    fn reset(&mut self) {
        self.framer.clear();
    }
}
