//! mflash - Command-line front end for the Montana flash driver
//!
//! The tool drives [`montana_flash_core::FlashController`] over the
//! in-memory chip model of `montana-flash-sim`, persisted between runs as
//! an image file. Every public driver operation has a subcommand.
//!
//! Driver status codes (1..=9) become the process exit code. Any other
//! failure, such as an unreadable input file, exits with
//! [`EXIT_OTHER_FAILURE`].

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Session;

/// Exit code for failures that carry no driver status
const EXIT_OTHER_FAILURE: i32 = 0x10;

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(e.as_ref()));
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::LockMask { addr, words } = cli.command {
        // Pure address arithmetic, no chip needed
        return commands::info::run_lock_mask(addr, words);
    }

    let mut session = Session::open(&cli.image, cli.clock)?;

    match cli.command {
        Commands::Info => {
            commands::info::run_info(&session);
            Ok(())
        }
        Commands::Read {
            addr,
            words,
            output,
        } => commands::read::run_read(&mut session, addr, words, output.as_deref()),
        Commands::Write {
            addr,
            input,
            erase,
            endurance,
        } => commands::write::run_write(&mut session, addr, &input, erase, endurance),
        Commands::WriteWord {
            addr,
            value,
            endurance,
        } => commands::write::run_write_word(&mut session, addr, value, endurance),
        Commands::WriteDouble {
            addr,
            data,
            ecc,
            endurance,
        } => commands::write::run_write_double(&mut session, addr, data, ecc, endurance),
        Commands::ReadDouble { addr } => commands::read::run_read_double(&mut session, addr),
        Commands::EraseSector {
            addr,
            count,
            endurance,
        } => commands::erase::run_erase_sectors(&mut session, addr, count, endurance),
        Commands::EraseBank { bank } => commands::erase::run_erase_bank(&mut session, bank),
        Commands::EraseChip => commands::erase::run_erase_chip(&mut session),
        Commands::BlankCheck { addr, words } => {
            commands::read::run_blank_check(&mut session, addr, words)
        }
        Commands::LockMask { addr, words } => commands::info::run_lock_mask(addr, words),
    }
}

/// Process exit code for an error returned by a command
fn exit_code(e: &(dyn std::error::Error + 'static)) -> i32 {
    match e.downcast_ref::<montana_flash_core::Error>() {
        Some(status) => status.code() as i32,
        None => EXIT_OTHER_FAILURE,
    }
}
