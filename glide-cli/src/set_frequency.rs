use std::{
    io::{ErrorKind, Read, Write},
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow, bail};
use avionics_protocol::{Ar62xxDevice, CommandError, Device};
use log::{debug, info};
use wind_estimator_core::NmeaInfo;

use crate::{args::SetFrequencyCli, config::GlideConfig};

fn command_error(e: CommandError) -> anyhow::Error {
    match e {
        CommandError::FrequencyUnknown => anyhow!("radio did not report its frequencies"),
        CommandError::FrequencyOutOfRange => anyhow!("frequency is not a valid airband channel"),
    }
}

/// Waits for the frequency broadcast so the other station is kept, then
/// writes one command frame.
pub fn set_frequency(args: SetFrequencyCli, config: &GlideConfig) -> Result<()> {
    let baud_rate = args.baud.unwrap_or(config.serial.baud_rate);
    let mut port = serialport::new(&args.port_name, baud_rate)
        .timeout(Duration::from_millis(config.serial.read_timeout))
        .open()?;

    let mut device = Ar62xxDevice::new();
    let mut info = NmeaInfo::default();
    let mut buffer = [0u8; 64];
    let start = Instant::now();
    let deadline = Duration::from_secs(args.timeout);

    while device.active_frequency().is_none() || device.standby_frequency().is_none() {
        if start.elapsed() > deadline {
            bail!("no frequency broadcast from {} within {}s", args.port_name, args.timeout);
        }
        let length = match port.read(&mut buffer) {
            Ok(length) => length,
            Err(e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) => return Err(e.into()),
        };
        info.clock = start.elapsed().as_secs_f64();
        device.data_received(&buffer[..length], &mut info);
    }
    debug!("framer stats {:?}", device.framer().stats());

    if let Some(active) = args.active {
        let command = device.put_active_frequency(active).map_err(command_error)?;
        port.write_all(&command)?;
        info!("active frequency set to {}", active);
    }
    if let Some(standby) = args.standby {
        let command = device.put_standby_frequency(standby).map_err(command_error)?;
        port.write_all(&command)?;
        info!("standby frequency set to {}", standby);
    }
    port.flush()?;
    Ok(())
}
