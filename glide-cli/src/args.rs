use std::{fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Result, anyhow};
use clap::{ArgGroup, Parser, Subcommand};
use wind_estimator_core::RadioFrequency;

#[derive(Parser, Debug)]
#[command(name = "Glide CLI")]
#[command(bin_name = "glide-cli")]
pub struct Cli {
    #[arg(long, global = true, help = "config file, defaults to .glide-cli.toml")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "log debug output")]
    pub verbose: bool,

    #[clap(subcommand)]
    pub mode: ModeSelect,
}

#[derive(Subcommand, Debug)]
pub enum ModeSelect {
    #[command(about = "feed a recorded byte log through a driver and the wind estimators")]
    Replay(ReplayCli),

    #[command(about = "read live serial ports and estimate wind")]
    Attach(AttachCli),

    #[command(about = "set the active or standby frequency of an AR62xx radio")]
    SetFrequency(SetFrequencyCli),
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverKind {
    Nmea,
    Anemoi,
    Ar62xx,
}

impl Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverKind::Nmea => write!(f, "nmea"),
            DriverKind::Anemoi => write!(f, "anemoi"),
            DriverKind::Ar62xx => write!(f, "ar62xx"),
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EstimatorKind {
    Ekf,
    Zigzag,
    Circling,
    /// ekf and zigzag
    Both,
    /// ekf, zigzag and circling
    All,
}

#[derive(Parser, Debug)]
pub struct ReplayCli {
    pub log_path: PathBuf,
    #[arg(long, value_enum, default_value_t = DriverKind::Nmea)]
    pub driver: DriverKind,
    #[arg(long, value_enum, default_value_t = EstimatorKind::All)]
    pub estimator: EstimatorKind,
    #[arg(long, default_value_t = 64, help = "bytes handed to the driver per read")]
    pub chunk: usize,
}

/// `PORT` or `PORT@DRIVER`, e.g. `/dev/ttyUSB0@anemoi`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortSpec {
    pub port_name: String,
    pub driver: DriverKind,
}

impl FromStr for PortSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (port_name, driver) = match s.rsplit_once('@') {
            Some((port_name, driver)) => (
                port_name,
                <DriverKind as clap::ValueEnum>::from_str(driver, true)
                    .map_err(|e| anyhow!("unknown driver {}: {}", driver, e))?,
            ),
            None => (s, DriverKind::Nmea),
        };
        if port_name.is_empty() {
            return Err(anyhow!("empty port name"));
        }
        Ok(Self {
            port_name: port_name.to_string(),
            driver,
        })
    }
}

#[derive(Parser, Debug)]
pub struct AttachCli {
    #[arg(required = true, help = "PORT or PORT@DRIVER (nmea, anemoi, ar62xx)")]
    pub ports: Vec<PortSpec>,
    #[arg(long, help = "overrides the baud rate from the config")]
    pub baud: Option<u32>,
    #[arg(long, value_enum, default_value_t = EstimatorKind::All)]
    pub estimator: EstimatorKind,
}

/// Frequency in MHz, e.g. `123.450`.
pub fn parse_megahertz(s: &str) -> Result<RadioFrequency> {
    let mhz: f64 = s.trim().parse()?;
    let khz = (mhz * 1000.0).round();
    if !(0.0..=u32::MAX as f64).contains(&khz) {
        return Err(anyhow!("{} MHz is not a frequency", s));
    }
    Ok(RadioFrequency::from_kilohertz(khz as u32))
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("station").required(true).args(["active", "standby"])))]
pub struct SetFrequencyCli {
    pub port_name: String,
    #[arg(long, value_parser = parse_megahertz)]
    pub active: Option<RadioFrequency>,
    #[arg(long, value_parser = parse_megahertz)]
    pub standby: Option<RadioFrequency>,
    #[arg(long)]
    pub baud: Option<u32>,
    #[arg(long, default_value_t = 5, help = "seconds to wait for the radio broadcast")]
    pub timeout: u64,
}
