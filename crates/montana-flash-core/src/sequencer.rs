//! Command sequencer
//!
//! Raw command issue, status waits and the per-operation preconditions.
//!
//! VREAD1, RECALL and LP_MODE in IF_CTRL are mutually exclusive and each
//! change is carried out by the controller as a command, so they may only
//! be changed from idle. Every precondition therefore starts by
//! terminating whatever command is in flight.
//!
//! The controller modes are not tracked in software. Each precondition
//! leaves the controller in the mode its operation needs: idle with plain
//! reads, verified read, or write ready. A sequential session stays active
//! from [`execute_seq_command`] until [`end_operation_wait_idle`].
//!
//! None of the waits in this module has a timeout. If a status bit never
//! changes, the call never returns; recovery is left to the watchdog.

use crate::error::{Error, Result};
use crate::regs::defs::{CMD_CTRL_CMD_END, CMD_CTRL_COMMAND_MASK};
use crate::regs::{Command, CopyCtrl, FlashRegisters, IfCtrl, IfStatus, RetryLevel};

/// Fail with [`Error::Inaccessible`] while the interface is isolated
pub fn interface_sanity<F: FlashRegisters + ?Sized>(flash: &F) -> Result<()> {
    if flash.if_status().contains(IfStatus::ISOLATE) {
        log::warn!("flash interface is isolated");
        return Err(Error::Inaccessible);
    }
    Ok(())
}

// ============================================================================
// Status waits
// ============================================================================

/// Whether the command interface is busy
#[inline]
pub fn read_busy<F: FlashRegisters + ?Sized>(flash: &F) -> bool {
    flash.if_status().contains(IfStatus::BUSY)
}

/// Spin until the command interface is idle (no timeout)
#[inline]
pub fn wait_busy<F: FlashRegisters + ?Sized>(flash: &F) {
    while read_busy(flash) {
        core::hint::spin_loop();
    }
}

/// Whether sequential programming requests a new data word
#[inline]
pub fn read_seq_req<F: FlashRegisters + ?Sized>(flash: &F) -> bool {
    flash.if_status().contains(IfStatus::PROG_SEQ_DATA_REQ)
}

/// Spin until sequential programming requests a new data word (no timeout)
#[inline]
pub fn wait_seq_req<F: FlashRegisters + ?Sized>(flash: &F) {
    while !read_seq_req(flash) {
        core::hint::spin_loop();
    }
}

/// Whether the copier is running
#[inline]
pub fn copier_busy<F: FlashRegisters + ?Sized>(flash: &F) -> bool {
    flash.copy_ctrl().contains(CopyCtrl::BUSY)
}

/// Spin until the copier is idle (no timeout)
#[inline]
pub fn wait_copier<F: FlashRegisters + ?Sized>(flash: &F) {
    while copier_busy(flash) {
        core::hint::spin_loop();
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Issue `cmd` and wait for it to complete
pub fn execute_command<F: FlashRegisters + ?Sized>(flash: &mut F, cmd: Command) {
    log::trace!("CMD {:?}", cmd);
    flash.set_cmd_ctrl(cmd.bits() & CMD_CTRL_COMMAND_MASK);
    wait_busy(flash);
}

/// Issue a sequential `cmd` without waiting
///
/// Busy stays asserted for the whole session, until it is ended with
/// [`end_operation_wait_idle`].
pub fn execute_seq_command<F: FlashRegisters + ?Sized>(flash: &mut F, cmd: Command) {
    log::trace!("CMD {:?} (sequential)", cmd);
    flash.set_cmd_ctrl(cmd.bits() & CMD_CTRL_COMMAND_MASK);
}

/// Terminate the current command unconditionally
pub fn terminate_command<F: FlashRegisters + ?Sized>(flash: &mut F) {
    flash.set_cmd_ctrl(CMD_CTRL_CMD_END);
}

/// Close any open session and wait for idle
///
/// A running sequential command first has to acknowledge the last word it
/// was fed (sequence request), otherwise that word would be lost.
pub fn end_operation_wait_idle<F: FlashRegisters + ?Sized>(flash: &mut F) {
    if Command::from_bits(flash.cmd_ctrl()).is_some_and(Command::is_sequential) {
        wait_seq_req(flash);
    }
    terminate_command(flash);
    wait_busy(flash);
}

/// Set the program/erase retry level; issues no command and does not wait
pub fn apply_retry_level<F: FlashRegisters + ?Sized>(flash: &mut F, level: RetryLevel) {
    let ctrl = (flash.if_ctrl() & !IfCtrl::RETRY) | level.bits();
    flash.set_if_ctrl(ctrl);
}

/// Restore a saved IF_CTRL value
///
/// A single write changes at most one of VREAD1, RECALL and LP_MODE, so
/// the value is written three times, each followed by a busy wait.
pub fn apply_if_ctrl<F: FlashRegisters + ?Sized>(flash: &mut F, value: IfCtrl) {
    for _ in 0..3 {
        flash.set_if_ctrl(value);
        wait_busy(flash);
    }
}

// ============================================================================
// Preconditions
// ============================================================================

/// Prepare for program commands
pub fn precondition_write<F: FlashRegisters + ?Sized>(flash: &mut F) {
    end_operation_wait_idle(flash);
}

/// Prepare for plain reads
pub fn precondition_read<F: FlashRegisters + ?Sized>(flash: &mut F) {
    end_operation_wait_idle(flash);
    execute_command(flash, Command::UnsetRecall);
    execute_command(flash, Command::UnsetVread1);
}

/// Prepare for reads with the tighter verified-read margin
pub fn precondition_verified_read<F: FlashRegisters + ?Sized>(flash: &mut F) {
    end_operation_wait_idle(flash);
    execute_command(flash, Command::SetVread1);
    execute_command(flash, Command::UnsetRecall);
}

/// Prepare for a mass erase
pub fn precondition_mass_erase<F: FlashRegisters + ?Sized>(flash: &mut F) {
    end_operation_wait_idle(flash);
}

/// Prepare for a sector erase
pub fn precondition_sector_erase<F: FlashRegisters + ?Sized>(flash: &mut F) {
    end_operation_wait_idle(flash);
}

/// Prepare for a blank check: plain reads and an idle copier
pub fn precondition_verify_empty<F: FlashRegisters + ?Sized>(flash: &mut F) {
    end_operation_wait_idle(flash);
    precondition_read(flash);
    if copier_busy(flash) {
        flash.set_copy_ctrl(CopyCtrl::STOP);
        wait_copier(flash);
    }
}
