//! montana-flash-core - Driver for the Montana on-chip flash controller
//!
//! This crate turns word-range requests ("write this buffer", "erase this
//! sector", "blank-check this range") into the register sequences the flash
//! macro requires. It enforces region locking, offers endurance versus fast
//! erase strategies and verifies sequential writes with a hardware CRC.
//!
//! The hardware is reached only through the register-bank traits in
//! [`regs`], so the same driver runs against memory-mapped registers
//! ([`mmio`]) or against an in-memory model.
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for [`Error`]
//! - `cortex-m` - Provide [`mmio::CortexMInterrupts`] backed by PRIMASK
//!
//! # Example
//!
//! ```ignore
//! use montana_flash_core::{FlashController, mmio};
//!
//! let mut ctrl = FlashController::new(flash0, flash1, crc, irq);
//! ctrl.initialize(0, 48_000_000, &mut power)?;
//! ctrl.erase_sector(0x0010_0000, true)?;
//! ctrl.write_buffer(0x0010_0000, &image, true)?;
//! ```
//!
//! # Busy waits
//!
//! Every wait on a controller status bit spins without a timeout. A bit that
//! never clears hangs the caller until the external watchdog resets the
//! device. This matches the hardware-verified behaviour of the controller.

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod clock;
pub mod controller;
pub mod copier;
pub mod erase;
pub mod error;
pub mod guard;
pub mod lock;
pub mod mmio;
pub mod program;
pub mod region;
pub mod regs;
pub mod resolve;
pub mod sequencer;
pub mod sequential;

pub use controller::FlashController;
pub use error::{status_code, Error, Result};
pub use region::{FlashInstance, RegionDescriptor, RegionKind};

/// Library version: `major << 12 | minor << 8 | revision`
pub const VERSION: u16 = (VERSION_MAJOR << 12) | (VERSION_MINOR << 8) | VERSION_REVISION;
/// Library major version
pub const VERSION_MAJOR: u16 = 0x03;
/// Library minor version
pub const VERSION_MINOR: u16 = 0x00;
/// Library revision
pub const VERSION_REVISION: u16 = 0x02;
