//! Sequential programming engine
//!
//! A sequential session streams words into one open program command. The
//! controller advances ADDR after each word but wraps back to the start of
//! the row instead of moving on to the next row, so every row boundary
//! closes the running session and opens a new one at the next row.
//!
//! Every word is also fed into the CRC peripheral. After programming, the
//! copier recomputes the CRC over the written range, which verifies the
//! whole write without a word-by-word read back.

use crate::copier;
use crate::error::{Error, Result};
use crate::guard::{CrcGuard, IfCtrlGuard, InterruptGuard};
use crate::regs::{Command, CrcRegisters, FlashRegisters, InterruptControl, RetryLevel};
use crate::sequencer;

/// Program `words` from `addr` with the sequential command `cmd`
///
/// `row_word_length` is the row size of the region being written. Returns
/// the CRC of every word fed to the controller.
///
/// Interrupts are masked for the whole operation and briefly unmasked at
/// every row boundary, while no session is open.
pub fn write_sequential<F, C, I>(
    flash: &mut F,
    crc: &mut C,
    irq: &mut I,
    addr: u32,
    words: &[u32],
    row_word_length: u32,
    cmd: Command,
) -> Result<u32>
where
    F: FlashRegisters + ?Sized,
    C: CrcRegisters + ?Sized,
    I: InterruptControl + ?Sized,
{
    let Some((&first, _)) = words.split_first() else {
        return Err(Error::ZeroLen);
    };
    let row_bytes = row_word_length << 2;

    let mut flash = IfCtrlGuard::new(flash);
    sequencer::precondition_write(&mut *flash);
    sequencer::apply_retry_level(&mut *flash, RetryLevel::Retry4);

    let mut irq = InterruptGuard::disable(irq);
    let mut crc = CrcGuard::verify_write(crc);

    log::debug!(
        "sequential {:?} of {} words at {:#010x}, row {} words",
        cmd,
        words.len(),
        addr,
        row_word_length
    );

    flash.set_addr(addr);
    flash.set_data(0, first);
    crc.add_32(first);
    sequencer::execute_seq_command(&mut *flash, cmd);

    let mut result = if sequencer::read_busy(&*flash) {
        Ok(())
    } else {
        Err(Error::Unknown)
    };

    if result.is_ok() {
        for (i, &word) in words.iter().enumerate().skip(1) {
            sequencer::wait_seq_req(&*flash);

            if row_bytes != 0 && flash.addr() % row_bytes == 0 {
                // ADDR wrapped to the start of the row just completed
                sequencer::end_operation_wait_idle(&mut *flash);
                irq.open_window();

                let next = addr.wrapping_add((i as u32) << 2);
                log::trace!("row boundary, restarting at {:#010x}", next);
                flash.set_addr(next);
                flash.set_data(0, word);
                crc.add_32(word);
                sequencer::execute_seq_command(&mut *flash, cmd);

                if !sequencer::read_busy(&*flash) {
                    result = Err(Error::Unknown);
                    break;
                }
            } else {
                flash.set_data(0, word);
                crc.add_32(word);
                sequencer::wait_seq_req(&*flash);
            }
        }
    }

    sequencer::end_operation_wait_idle(&mut *flash);

    result.map(|()| crc.final_value())
}

/// Program `words` sequentially and verify them with a copier CRC
///
/// In endurance mode a sequential pre-program pass runs first. Fails with
/// [`Error::CrcCheck`] when the CRC recomputed from flash differs from the
/// CRC of the data that was fed to the controller.
pub fn write_word_sequential<F, C, I>(
    flash: &mut F,
    crc: &mut C,
    irq: &mut I,
    addr: u32,
    words: &[u32],
    row_word_length: u32,
    endurance: bool,
) -> Result<()>
where
    F: FlashRegisters + ?Sized,
    C: CrcRegisters + ?Sized,
    I: InterruptControl + ?Sized,
{
    if endurance {
        write_sequential(
            flash,
            crc,
            irq,
            addr,
            words,
            row_word_length,
            Command::PreProgramSeq,
        )?;
    }

    let written = write_sequential(
        flash,
        crc,
        irq,
        addr,
        words,
        row_word_length,
        Command::ProgramSeq,
    )?;

    let verified = copier::crc_calculate(flash, crc, addr, words.len() as u32)?;
    if written != verified {
        log::warn!(
            "CRC mismatch at {:#010x}: wrote {:#010x}, flash holds {:#010x}",
            addr,
            written,
            verified
        );
        return Err(Error::CrcCheck);
    }
    Ok(())
}
