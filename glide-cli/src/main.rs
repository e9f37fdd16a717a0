mod args;
mod attach;
mod computer;
mod config;
mod replay;
mod set_frequency;

use anyhow::Result;
use args::{Cli, ModeSelect};
use clap::Parser;
use config::GlideConfig;
use log::LevelFilter;

fn main() -> Result<()> {
    let args = Cli::parse();
    let _ = env_logger::builder()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .try_init();

    let config = GlideConfig::load(args.config.as_deref())?;

    match args.mode {
        ModeSelect::Replay(args) => replay::replay(args, &config),
        ModeSelect::Attach(args) => attach::attach(args, &config),
        ModeSelect::SetFrequency(args) => set_frequency::set_frequency(args, &config),
    }
}
