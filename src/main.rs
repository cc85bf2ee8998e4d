mod emulator;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use emulator::{DEFAULT_FRAME_RATE, DEFAULT_INSTRUCTIONS_PER_SECOND, Emulator, Settings};

/// CHIP-8 interpreter
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// ROM to load and execute
    rom: PathBuf,

    /// Display refresh and timer rate in Hz
    #[clap(long, default_value_t = DEFAULT_FRAME_RATE)]
    frame_rate: u64,

    /// Instructions executed per second
    #[clap(long, default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND)]
    ips: u64,

    /// Seed for the random number generator
    #[clap(long)]
    seed: Option<u64>,

    /// Step over unknown opcodes instead of halting
    #[clap(long)]
    skip_unknown: bool,

    /// Run without a terminal UI and print the final screen
    #[clap(long)]
    headless: bool,

    /// Instructions to execute in headless mode
    #[clap(long, default_value_t = 10_000, requires = "headless")]
    cycles: u64,
}

fn main() -> Result<()> {
    let env = env_logger::Env::default()
        .filter_or("CHIP8_LOG", "warn")
        .write_style_or("CHIP8_LOG_STYLE", "auto");
    env_logger::init_from_env(env);

    let args = Args::parse();
    let settings = Settings {
        frame_rate: args.frame_rate,
        ips: args.ips,
        rom: args.rom,
        seed: args.seed,
        skip_unknown: args.skip_unknown,
    };
    let mut emulator = Emulator::new(settings)?;

    if args.headless {
        print!("{}", emulator.run_headless(args.cycles)?);
    } else {
        emulator.run()?;
    }
    Ok(())
}
