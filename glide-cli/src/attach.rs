use std::{
    io::{ErrorKind, Read},
    sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, sync_channel},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow};
use log::{error, info, warn};
use wind_estimator_core::NmeaInfo;

use crate::{
    args::{AttachCli, PortSpec},
    computer::{GlideComputer, make_estimators},
    config::GlideConfig,
    replay::{make_device, print_summary},
};

const CHANNEL_CAPACITY: usize = 64;

enum LinkEvent {
    Data(NmeaInfo),
    Closed(String),
}

/// Reads one port until it fails, sending a blackboard snapshot after
/// every read that produced a frame.
fn run_link(
    spec: PortSpec,
    baud_rate: u32,
    read_timeout: Duration,
    start: Instant,
    tx: SyncSender<LinkEvent>,
) -> Result<()> {
    info!(
        "opening {} at {} baud, {} driver",
        spec.port_name, baud_rate, spec.driver
    );
    let mut port = serialport::new(&spec.port_name, baud_rate)
        .timeout(read_timeout)
        .open()?;
    let mut device = make_device(spec.driver);
    let mut info = NmeaInfo::default();
    let mut buffer = [0u8; 256];

    loop {
        let length = match port.read(&mut buffer) {
            Ok(0) => return Err(anyhow!("{} closed", spec.port_name)),
            Ok(length) => length,
            Err(e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        info.clock = start.elapsed().as_secs_f64();
        if device.data_received(&buffer[..length], &mut info)
            && tx.send(LinkEvent::Data(info.clone())).is_err()
        {
            // computer is gone
            return Ok(());
        }
    }
}

fn run_computer(mut computer: GlideComputer, rx: Receiver<LinkEvent>, links: usize, start: Instant) {
    let mut open_links = links;
    while open_links > 0 {
        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(LinkEvent::Data(info)) => computer.merge(&info),
            Ok(LinkEvent::Closed(port_name)) => {
                warn!("link {} closed", port_name);
                open_links -= 1;
            }
            Err(RecvTimeoutError::Timeout) => computer.tick(start.elapsed().as_secs_f64()),
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    print_summary(&computer);
}

pub fn attach(args: AttachCli, config: &GlideConfig) -> Result<()> {
    let baud_rate = args.baud.unwrap_or(config.serial.baud_rate);
    let read_timeout = Duration::from_millis(config.serial.read_timeout);
    let start = Instant::now();
    let (tx, rx) = sync_channel::<LinkEvent>(CHANNEL_CAPACITY);

    let links = args.ports.len();
    for spec in args.ports {
        let tx = tx.clone();
        thread::Builder::new()
            .name(format!("link {}", spec.port_name))
            .spawn(move || {
                let port_name = spec.port_name.clone();
                if let Err(e) = run_link(spec, baud_rate, read_timeout, start, tx.clone()) {
                    error!("{}: {:?}", port_name, e);
                }
                let _ = tx.send(LinkEvent::Closed(port_name));
            })?;
    }
    drop(tx);

    let computer = GlideComputer::new(make_estimators(&config.wind, args.estimator));
    run_computer(computer, rx, links, start);
    Ok(())
}
