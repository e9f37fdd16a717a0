use std::fs;

use anyhow::{Result, bail};
use avionics_protocol::{AnemoiDevice, Ar62xxDevice, Device, NmeaDevice};
use log::info;
use wind_estimator_core::{AnyWindEstimator, NmeaInfo, units::mps_to_kmh};

use crate::{
    args::{DriverKind, ReplayCli},
    computer::{GlideComputer, make_estimators},
    config::GlideConfig,
};

pub fn make_device(driver: DriverKind) -> Box<dyn Device + Send> {
    match driver {
        DriverKind::Nmea => Box::new(NmeaDevice::new()),
        DriverKind::Anemoi => Box::new(AnemoiDevice::new()),
        DriverKind::Ar62xx => Box::new(Ar62xxDevice::new()),
    }
}

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Clock for recorded logs. Follows the GPS time of day once the log
/// carries one. Before that, time advances as if the bytes arrived at the
/// configured baud rate, 10 bits per byte.
///
/// A fix is decoded with the clock of the previous fix and moves the clock
/// afterwards, so its own validity stamps trail by one GPS epoch.
struct ReplayClock {
    bytes_per_second: f64,
    bytes: usize,
    now: f64,
    /// GPS time of day and clock at the first fix carrying a time
    gps_anchor: Option<(f64, f64)>,
    last_gps_time: f64,
    /// seconds added for each UTC midnight passed
    day_offset: f64,
}

impl ReplayClock {
    fn new(baud_rate: u32) -> Self {
        Self {
            bytes_per_second: baud_rate.max(10) as f64 / 10.0,
            bytes: 0,
            now: 0.0,
            gps_anchor: None,
            last_gps_time: 0.0,
            day_offset: 0.0,
        }
    }

    /// Clock to decode the next `bytes` with.
    fn advance(&mut self, bytes: usize) -> f64 {
        self.bytes += bytes;
        if self.gps_anchor.is_none() {
            self.now = self.bytes as f64 / self.bytes_per_second;
        }
        self.now
    }

    /// Moves the clock to the GPS time in `info`, if there is one.
    fn follow_gps(&mut self, info: &NmeaInfo) -> f64 {
        if !info.time_available.is_valid() {
            return self.now;
        }
        let time = info.time;
        match self.gps_anchor {
            None => {
                info!("clock locked to GPS time {:.0}s", time);
                self.gps_anchor = Some((time, self.now));
            }
            Some((anchor_time, anchor_clock)) => {
                if time == self.last_gps_time {
                    return self.now;
                }
                if time < self.last_gps_time - SECONDS_PER_DAY / 2.0 {
                    self.day_offset += SECONDS_PER_DAY;
                }
                self.now = anchor_clock + time + self.day_offset - anchor_time;
            }
        }
        self.last_gps_time = time;
        self.now
    }
}

/// Runs a recorded byte stream through one driver and the computer.
fn replay_log(
    log: &[u8],
    driver: DriverKind,
    estimators: Vec<AnyWindEstimator>,
    chunk: usize,
    baud_rate: u32,
) -> GlideComputer {
    let mut device = make_device(driver);
    let mut computer = GlideComputer::new(estimators);
    let mut clock = ReplayClock::new(baud_rate);
    let mut link = NmeaInfo::default();

    for part in log.chunks(chunk.max(1)) {
        link.clock = clock.advance(part.len());
        if device.data_received(part, &mut link) {
            link.clock = clock.follow_gps(&link);
            computer.replace(&link);
        } else {
            computer.tick(link.clock);
        }
    }
    computer
}

pub fn replay(args: ReplayCli, config: &GlideConfig) -> Result<()> {
    if args.chunk == 0 {
        bail!("chunk size must be at least 1");
    }
    let log = fs::read(&args.log_path)?;
    info!(
        "replaying {} bytes from {:?} with the {} driver",
        log.len(),
        args.log_path,
        args.driver
    );

    let computer = replay_log(
        &log,
        args.driver,
        make_estimators(&config.wind, args.estimator),
        args.chunk,
        config.serial.baud_rate,
    );
    print_summary(&computer);
    Ok(())
}

pub fn print_summary(computer: &GlideComputer) {
    let basic = computer.basic();
    println!("{:.1}s of data", basic.clock);
    if let (Some(active), Some(standby)) = (
        basic.radio.active_frequency,
        basic.radio.standby_frequency,
    ) {
        println!("radio: active {} standby {}", active, standby);
    }
    if basic.external_wind_available.is_valid() {
        println!(
            "external wind: {:.0}° {:.1} km/h",
            basic.external_wind.bearing,
            mps_to_kmh(basic.external_wind.norm)
        );
    }
    for (name, result) in computer.results() {
        match result {
            Some(result) => println!(
                "{}: {:.0}° {:.1} km/h, quality {}",
                name,
                result.wind.bearing,
                mps_to_kmh(result.wind.norm),
                result.quality
            ),
            None => println!("{}: no estimate", name),
        }
    }
}
