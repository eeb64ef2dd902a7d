//! Erase engine
//!
//! Sector erase comes in two strategies. The endurance strategy raises the
//! retry level pulse by pulse and stops as soon as the sector verifies
//! blank. The fast strategy issues one long pulse and checks once.

use crate::copier;
use crate::error::{Error, Result};
use crate::guard::{EraseDelayGuard, IfCtrlGuard};
use crate::regs::{Command, FlashRegisters, RetryLevel};
use crate::sequencer;

/// Erase pulse stretch applied by the fast strategy
pub const FAST_ERASE_DELAY_FACTOR: u32 = 4;

/// Issue one sector erase pulse at `level`
pub fn erase_sector_operation<F: FlashRegisters + ?Sized>(
    flash: &mut F,
    addr: u32,
    level: RetryLevel,
) {
    let mut flash = IfCtrlGuard::new(flash);
    sequencer::precondition_sector_erase(&mut *flash);
    sequencer::apply_retry_level(&mut *flash, level);

    flash.set_addr(addr);
    sequencer::execute_command(&mut *flash, Command::SectorErase);
}

/// Erase a sector with increasing retry levels until it verifies blank
///
/// Levels 1 to 3 are checked with verified reads. After level 4 the
/// accumulated pulse time leaves enough margin for a plain check.
pub fn erase_sector_endurance<F: FlashRegisters + ?Sized>(
    flash: &mut F,
    addr: u32,
    sector_length: u32,
) -> Result<()> {
    for level in RetryLevel::ALL {
        erase_sector_operation(flash, addr, level);
        let verified_read = level < RetryLevel::Retry4;
        match copier::verify_empty(flash, addr, sector_length, verified_read) {
            Ok(()) => {
                log::debug!("sector {:#010x} blank after {:?}", addr, level);
                return Ok(());
            }
            Err(_) => log::warn!("sector {:#010x} not blank after {:?}", addr, level),
        }
    }
    Err(Error::Unknown)
}

/// Erase a sector with a single stretched pulse
pub fn erase_sector_fast<F: FlashRegisters + ?Sized>(
    flash: &mut F,
    addr: u32,
    sector_length: u32,
) -> Result<()> {
    {
        let mut flash = EraseDelayGuard::scale(flash, FAST_ERASE_DELAY_FACTOR);
        erase_sector_operation(&mut *flash, addr, RetryLevel::Retry4);
    }
    copier::verify_empty(flash, addr, sector_length, false)
}

/// Erase every unlocked code and data lock region of the instance
pub fn erase_mass<F: FlashRegisters + ?Sized>(flash: &mut F) {
    let mut flash = IfCtrlGuard::new(flash);
    sequencer::precondition_mass_erase(&mut *flash);
    sequencer::apply_retry_level(&mut *flash, RetryLevel::Retry4);
    sequencer::execute_command(&mut *flash, Command::MassErase);
}
