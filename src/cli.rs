//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "mflash")]
#[command(author, version, about = "Montana on-chip flash tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Flash image backing the simulated chip (created on first write)
    #[arg(long, global = true, default_value = "montana-flash.bin")]
    pub image: PathBuf,

    /// System clock in Hz used to initialize both flash instances
    #[arg(long, global = true, default_value = "48000000", value_parser = parse_hex_u32)]
    pub clock: u32,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the region map and current lock configuration
    Info,

    /// Read words to a file, or dump them to stdout
    Read {
        /// Start address (hex, e.g., 0x100000)
        #[arg(short, long, value_parser = parse_hex_u32)]
        addr: u32,

        /// Number of 32-bit words to read
        #[arg(short, long, value_parser = parse_hex_u32)]
        words: u32,

        /// Output file (little-endian words)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a file to flash
    Write {
        /// Start address (hex, e.g., 0x100000)
        #[arg(short, long, value_parser = parse_hex_u32)]
        addr: u32,

        /// Input file, padded with 0xFF to a whole number of words
        #[arg(short, long)]
        input: PathBuf,

        /// Erase every covered sector before programming it
        #[arg(long)]
        erase: bool,

        /// Use endurance mode (pre-program and stepped erase)
        #[arg(long)]
        endurance: bool,
    },

    /// Program and verify one word
    WriteWord {
        /// Word address
        #[arg(short, long, value_parser = parse_hex_u32)]
        addr: u32,

        /// Value to program
        #[arg(long, value_parser = parse_hex_u32)]
        value: u32,

        /// Pre-program before programming
        #[arg(long)]
        endurance: bool,
    },

    /// Program and verify one raw 38-bit double word
    WriteDouble {
        /// Word address
        #[arg(short, long, value_parser = parse_hex_u32)]
        addr: u32,

        /// 32 data bits
        #[arg(long, value_parser = parse_hex_u32)]
        data: u32,

        /// 6 bits stored in place of the ECC
        #[arg(long, value_parser = parse_hex_u32)]
        ecc: u32,

        /// Pre-program before programming
        #[arg(long)]
        endurance: bool,
    },

    /// Read one raw 38-bit double word
    ReadDouble {
        /// Word address
        #[arg(short, long, value_parser = parse_hex_u32)]
        addr: u32,
    },

    /// Erase the sectors starting at an address
    EraseSector {
        /// Address inside the first sector
        #[arg(short, long, value_parser = parse_hex_u32)]
        addr: u32,

        /// Number of consecutive sectors
        #[arg(short, long, default_value = "1", value_parser = parse_hex_u32)]
        count: u32,

        /// Step the retry level until the sector verifies blank
        #[arg(long)]
        endurance: bool,
    },

    /// Mass erase the code and data regions of one instance
    EraseBank {
        /// Instance number (0 or 1)
        #[arg(short, long)]
        bank: usize,
    },

    /// Mass erase both instances
    EraseChip,

    /// Check that a range is erased
    BlankCheck {
        /// Start address
        #[arg(short, long, value_parser = parse_hex_u32)]
        addr: u32,

        /// Number of 32-bit words to check
        #[arg(short, long, value_parser = parse_hex_u32)]
        words: u32,
    },

    /// Show the lock regions a write range would unlock
    LockMask {
        /// Start address
        #[arg(short, long, value_parser = parse_hex_u32)]
        addr: u32,

        /// Number of 32-bit words
        #[arg(short, long, value_parser = parse_hex_u32)]
        words: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x100000"), Ok(0x10_0000));
        assert_eq!(parse_hex_u32("0XFF"), Ok(0xFF));
        assert_eq!(parse_hex_u32("48000000"), Ok(48_000_000));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert!(parse_hex_u32("-1").is_err());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_write() {
        let cli = Cli::try_parse_from([
            "mflash", "--image", "chip.bin", "write", "-a", "0x1b0000", "-i", "fw.bin", "--erase",
        ])
        .unwrap();
        assert_eq!(cli.image, PathBuf::from("chip.bin"));
        assert_eq!(cli.clock, 48_000_000);
        match cli.command {
            Commands::Write {
                addr,
                erase,
                endurance,
                ..
            } => {
                assert_eq!(addr, 0x1B_0000);
                assert!(erase);
                assert!(!endurance);
            }
            _ => panic!("expected write"),
        }
    }
}
