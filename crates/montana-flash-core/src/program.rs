//! Single word and double word programming
//!
//! A double word is the raw 38-bit storage cell: 32 data bits in DATA[0]
//! and the 6 bits otherwise used for ECC in DATA[1]. Double word accesses
//! are only meaningful while automatic ECC is bypassed, see
//! [`crate::guard::EccBypassGuard`].

use crate::error::{Error, Result};
use crate::guard::IfCtrlGuard;
use crate::regs::{Command, FlashRegisters, RetryLevel};
use crate::sequencer;

/// Valid bits of the second half of a double word
pub const DOUBLE_EXTRA_MASK: u32 = 0x3F;

/// Program one word with `cmd` at the maximum retry level
pub fn write_word_operation<F: FlashRegisters + ?Sized>(
    flash: &mut F,
    addr: u32,
    word: u32,
    cmd: Command,
) {
    let mut flash = IfCtrlGuard::new(flash);
    sequencer::precondition_write(&mut *flash);
    sequencer::apply_retry_level(&mut *flash, RetryLevel::Retry4);

    flash.set_addr(addr);
    flash.set_data(0, word);
    sequencer::execute_command(&mut *flash, cmd);
}

/// Program one double word with `cmd` at the maximum retry level
pub fn write_double_operation<F: FlashRegisters + ?Sized>(
    flash: &mut F,
    addr: u32,
    words: [u32; 2],
    cmd: Command,
) {
    let mut flash = IfCtrlGuard::new(flash);
    sequencer::precondition_write(&mut *flash);
    sequencer::apply_retry_level(&mut *flash, RetryLevel::Retry4);

    flash.set_addr(addr);
    flash.set_data(1, words[1]);
    flash.set_data(0, words[0]);
    sequencer::execute_command(&mut *flash, cmd);
}

/// Read one word over the CPU bus with plain reads
pub fn read_word<F: FlashRegisters + ?Sized>(flash: &mut F, addr: u32) -> u32 {
    let mut flash = IfCtrlGuard::new(flash);
    sequencer::precondition_read(&mut *flash);
    flash.cbus_read(addr)
}

/// Read one double word through the command interface
pub fn read_double<F: FlashRegisters + ?Sized>(flash: &mut F, addr: u32) -> [u32; 2] {
    let mut flash = IfCtrlGuard::new(flash);
    sequencer::precondition_read(&mut *flash);

    flash.set_addr(addr);
    sequencer::execute_command(&mut *flash, Command::Read);
    [flash.data(0), flash.data(1)]
}

/// Program one word and read it back
///
/// In endurance mode a pre-program pass runs first.
pub fn write_word<F: FlashRegisters + ?Sized>(
    flash: &mut F,
    addr: u32,
    word: u32,
    endurance: bool,
) -> Result<()> {
    if endurance {
        write_word_operation(flash, addr, word, Command::PreProgramNoSeq);
    }
    write_word_operation(flash, addr, word, Command::ProgramNoSeq);

    let readback = read_word(flash, addr);
    if readback != word {
        log::warn!(
            "word at {:#010x} reads {:#010x} after programming {:#010x}",
            addr,
            readback,
            word
        );
        return Err(Error::Unknown);
    }
    Ok(())
}

/// Program one double word and read it back
///
/// Only the low 6 bits of `words[1]` are stored and compared.
pub fn write_double<F: FlashRegisters + ?Sized>(
    flash: &mut F,
    addr: u32,
    words: [u32; 2],
    endurance: bool,
) -> Result<()> {
    if endurance {
        write_double_operation(flash, addr, words, Command::PreProgramNoSeq);
    }
    write_double_operation(flash, addr, words, Command::ProgramNoSeq);

    let readback = read_double(flash, addr);
    if readback[0] != words[0] || readback[1] != (words[1] & DOUBLE_EXTRA_MASK) {
        log::warn!(
            "double word at {:#010x} reads {:#010x}:{:#04x}",
            addr,
            readback[0],
            readback[1]
        );
        return Err(Error::Unknown);
    }
    Ok(())
}
