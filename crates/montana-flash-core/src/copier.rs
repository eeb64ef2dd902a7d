//! Copier engine
//!
//! The copier moves, compares or checksums a word range without a CPU
//! loop. A transfer is only reported as complete when the error bit is
//! clear and the source pointer ended exactly one word past the range: an
//! isolation event can stop the copier early without raising the error
//! bit.

use crate::error::{Error, Result};
use crate::guard::{CrcGuard, IfCtrlGuard};
use crate::regs::defs::COPY_SRC_ADDR_REG_MAX_VALUE;
use crate::regs::{CopyCfg, CopyCtrl, CrcRegisters, FlashRegisters};
use crate::sequencer;

/// Erased pattern compared against by the blank check
const ERASED_WORD: u32 = 0xFFFF_FFFF;

/// Start a configured transfer and check it ran to the end
fn run<F: FlashRegisters + ?Sized>(flash: &mut F, src: u32, word_length: u32) -> Result<()> {
    flash.set_copy_ctrl(CopyCtrl::START);
    sequencer::wait_copier(flash);

    if flash.copy_ctrl().contains(CopyCtrl::ERROR) {
        return Err(Error::Unknown);
    }

    let expected = src.wrapping_add(word_length << 2) & COPY_SRC_ADDR_REG_MAX_VALUE;
    let reached = flash.copy_src();
    if reached != expected {
        log::debug!(
            "copier stopped at {:#010x}, expected {:#010x}",
            reached,
            expected
        );
        return Err(Error::Unknown);
    }
    Ok(())
}

/// Check that `word_length` words from `addr` read as erased
///
/// With `verified_read` the comparison runs with the tighter verified-read
/// margin, otherwise with plain reads.
pub fn verify_empty<F: FlashRegisters + ?Sized>(
    flash: &mut F,
    addr: u32,
    word_length: u32,
    verified_read: bool,
) -> Result<()> {
    let mut flash = IfCtrlGuard::new(flash);
    if verified_read {
        sequencer::precondition_verified_read(&mut *flash);
    } else {
        sequencer::precondition_verify_empty(&mut *flash);
    }

    flash.set_copy_src(addr);
    flash.set_copy_word_cnt(word_length);
    flash.set_copy_cfg(CopyCfg::VERIFY_EMPTY);
    flash.set_data(0, ERASED_WORD);
    // ECC is off in comparator mode, so the extra bits are compared too
    flash.set_data(1, ERASED_WORD);

    run(&mut *flash, addr, word_length)
}

/// CRC over `word_length` words from `addr`, computed by the copier
///
/// The CRC peripheral is configured like the sequential write engine
/// configures it, so both values are comparable.
pub fn crc_calculate<F, C>(flash: &mut F, crc: &mut C, addr: u32, word_length: u32) -> Result<u32>
where
    F: FlashRegisters + ?Sized,
    C: CrcRegisters + ?Sized,
{
    let mut flash = IfCtrlGuard::new(flash);
    sequencer::precondition_read(&mut *flash);
    let crc = CrcGuard::verify_write(crc);

    flash.set_copy_src(addr);
    flash.set_copy_word_cnt(word_length);
    flash.set_copy_cfg(CopyCfg::CRC);

    run(&mut *flash, addr, word_length)?;
    Ok(crc.final_value())
}

/// Copy `dst.len()` words from flash address `src` into `dst`
///
/// Runs in whatever read mode the controller is currently in.
pub fn copy<F: FlashRegisters + ?Sized>(flash: &mut F, src: u32, dst: &mut [u32]) -> Result<()> {
    let word_length = dst.len() as u32;
    flash.set_copy_src(src);
    // SAFETY: `dst` stays mutably borrowed until the copier is idle again
    unsafe { flash.set_copy_dst(dst.as_mut_ptr()) };
    flash.set_copy_word_cnt(word_length);
    flash.set_copy_cfg(CopyCfg::COPY);

    run(flash, src, word_length)
}
