//! NEC16 Emulator - CLI Entry Point
//!
//! Usage: `nec16-emu <romfile> [-d] [instruction-limit] [--json]`
//!
//! Runs a ROM image on the TIOS reference system. Program output goes to
//! stdout; `-d` traces every bus access and instruction on stderr.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use nec16::system::{load_rom, HarnessError, Tios, TiosConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nec16-emu")]
#[command(version = "0.1.0")]
#[command(about = "Run a ROM image on the NEC16 TIOS reference system")]
struct Cli {
    /// Path to the raw ROM image (mapped at address 3)
    romfile: PathBuf,
    /// Trace every bus access and executed instruction
    #[arg(short = 'd', long = "debug")]
    debug: bool,
    /// Stop after this many instructions
    instruction_limit: Option<u64>,
    /// Print the final run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = TiosConfig::new()
        .with_trace(cli.debug)
        .with_instruction_limit(cli.instruction_limit);

    let rom = match load_rom(&cli.romfile) {
        Ok(rom) => rom,
        Err(e) => {
            eprintln!("[ERROR] >> {}", e);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut tios = Tios::new(&rom, stdin.lock(), io::stdout(), config);

    match tios.run() {
        Ok(summary) => {
            if cli.json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("[ERROR] >> failed to encode summary: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        }
        Err(e) => {
            report_failure(&tios, &e);
            std::process::exit(1);
        }
    }
}

fn report_failure<R: io::Read, W: io::Write>(tios: &Tios<R, W>, error: &HarnessError) {
    eprintln!("[ERROR] >> {}", error);
    eprintln!("[ERROR] >> after {} instructions: {:?}", tios.executed(), tios.cpu().regs);
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "trace" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
