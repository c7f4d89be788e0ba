//! Headless BBC Micro runner.
//!
//! Loads an OS ROM and optional sideways ROMs, runs a number of frames and
//! prints a summary of the machine state.

use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use emu_bbc_micro::{Bbc, BbcConfig, BbcError};
use emu_core::{FramePacer, MasterClock, Ticks};

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    rom_path: Option<PathBuf>,
    paged: Vec<(u8, PathBuf)>,
    frames: u32,
    throttle: bool,
    verbose: bool,
}

fn usage() {
    eprintln!("Usage: emu-bbc-micro --rom <file> [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --rom <file>           16K OS ROM");
    eprintln!("  --paged <bank>:<file>  Sideways ROM in bank 0-15 (repeatable)");
    eprintln!("  --frames <n>           Frames to run [default: 250]");
    eprintln!("  --unthrottled          Run as fast as possible");
    eprintln!("  --verbose              Log debug messages to stderr");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        rom_path: None,
        paged: Vec::new(),
        frames: 250,
        throttle: true,
        verbose: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rom" => {
                i += 1;
                cli.rom_path = args.get(i).map(PathBuf::from);
            }
            "--paged" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    eprintln!("--paged needs <bank>:<file>");
                    process::exit(1);
                };
                match parse_paged(value) {
                    Some(entry) => cli.paged.push(entry),
                    None => {
                        eprintln!("Bad --paged value: {value} (expected <bank>:<file>)");
                        process::exit(1);
                    }
                }
            }
            "--frames" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.frames = s.parse().unwrap_or(250);
                }
            }
            "--unthrottled" => {
                cli.throttle = false;
            }
            "--verbose" | "-v" => {
                cli.verbose = true;
            }
            "--help" | "-h" => {
                usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Parse `<bank>:<file>`. The bank is decimal or `0x`-prefixed hex.
fn parse_paged(value: &str) -> Option<(u8, PathBuf)> {
    let (bank, path) = value.split_once(':')?;
    let bank = match bank.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16).ok()?,
        None => bank.parse().ok()?,
    };
    if path.is_empty() {
        return None;
    }
    Some((bank, PathBuf::from(path)))
}

fn read_file(path: &Path) -> Result<Vec<u8>, BbcError> {
    std::fs::read(path).map_err(|e| BbcError::io(path.display().to_string(), e))
}

fn make_bbc(cli: &CliArgs) -> Result<Bbc, BbcError> {
    let Some(rom_path) = cli.rom_path.as_ref() else {
        usage();
        process::exit(1);
    };

    let mut config = BbcConfig::new(read_file(rom_path)?);
    for (bank, path) in &cli.paged {
        config = config.with_paged_rom(*bank, read_file(path)?);
    }
    config.cpu.throttle = cli.throttle;
    Bbc::new(&config)
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Writes `log` records to stderr alongside the runner's own messages.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// ---------------------------------------------------------------------------
// Headless run
// ---------------------------------------------------------------------------

fn main() {
    let cli = parse_args();
    init_logging(cli.verbose);

    let mut bbc = match make_bbc(&cli) {
        Ok(bbc) => bbc,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let mut pacer = if cli.throttle {
        FramePacer::new(emu_bbc_micro::FRAME_RATE)
    } else {
        FramePacer::unthrottled(emu_bbc_micro::FRAME_RATE)
    };

    let started = Instant::now();
    let mut halted = false;
    for _ in 0..cli.frames {
        if bbc.run_frame() == 0 {
            halted = true;
            break;
        }
        pacer.wait_for_next_frame();
    }
    let elapsed = started.elapsed().as_secs_f64();

    let cpu = bbc.cpu();
    println!(
        "Frames: {}  Cycles: {}  Speed: {:.2} MHz{}",
        bbc.frame_count(),
        bbc.total_cycles(),
        MasterClock::mhz(Ticks::new(bbc.total_cycles()), elapsed),
        if halted { "  (halted)" } else { "" }
    );
    println!(
        "PC=${:04X} A=${:02X} X=${:02X} Y=${:02X} S=${:02X} P=${:02X}",
        cpu.regs.pc,
        cpu.regs.a,
        cpu.regs.x,
        cpu.regs.y,
        cpu.regs.s,
        cpu.regs.p.0
    );
    println!(
        "ROMSEL={}  IC32=${:02X}  System VIA IFR=${:02X} IER=${:02X}",
        bbc.bus().memory.romsel(),
        bbc.bus().system_via.ic32().0,
        bbc.bus().system_via.via().ifr(),
        bbc.bus().system_via.via().ier()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paged_arg_parsing() {
        assert_eq!(parse_paged("15:basic.rom"), Some((15, PathBuf::from("basic.rom"))));
        assert_eq!(parse_paged("0xF:basic.rom"), Some((15, PathBuf::from("basic.rom"))));
        assert_eq!(parse_paged("basic.rom"), None);
        assert_eq!(parse_paged("x:basic.rom"), None);
        assert_eq!(parse_paged("3:"), None);
    }

    #[test]
    fn logger_filters_by_max_level() {
        use log::Log;

        init_logging(false);
        let warn = log::Metadata::builder().level(log::Level::Warn).build();
        let debug = log::Metadata::builder().level(log::Level::Debug).build();
        assert!(LOGGER.enabled(&warn));
        assert!(!LOGGER.enabled(&debug));
    }
}
