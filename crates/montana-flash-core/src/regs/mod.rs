//! Register-bank abstraction
//!
//! The driver never touches hardware directly. Each flash instance is a
//! [`FlashRegisters`] bank, the shared CRC peripheral is a [`CrcRegisters`]
//! bank, interrupt masking goes through [`InterruptControl`] and power
//! sequencing through [`MemoryPower`].
//!
//! Two families of implementations exist:
//! - [`crate::mmio`] - volatile accesses to the real register blocks
//! - an in-memory model used for testing (see the `montana-flash-sim` crate)

pub mod defs;

pub use defs::{CopyCfg, CopyCtrl, CrcCfg, EccCtrl, IfCtrl, IfStatus};

use crate::region::FlashInstance;

/// Commands accepted by the CMD_CTRL command field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    /// Read one 38-bit word into DATA[0]/DATA[1]
    Read = 0x1,
    /// Program one word
    ProgramNoSeq = 0x2,
    /// Pre-program pass for one word
    PreProgramNoSeq = 0x3,
    /// Open a sequential programming session
    ProgramSeq = 0x4,
    /// Open a sequential pre-program session
    PreProgramSeq = 0x5,
    /// Erase the sector containing ADDR
    SectorErase = 0x6,
    /// Erase every unlocked region of the instance
    MassErase = 0x7,
    /// Enter verified read mode
    SetVread1 = 0x8,
    /// Leave verified read mode
    UnsetVread1 = 0x9,
    /// Enter recall mode
    SetRecall = 0xA,
    /// Leave recall mode
    UnsetRecall = 0xB,
}

impl Command {
    /// Raw CMD_CTRL value for this command
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Decode the command field of a CMD_CTRL value
    pub fn from_bits(value: u32) -> Option<Self> {
        match value & defs::CMD_CTRL_COMMAND_MASK {
            0x1 => Some(Self::Read),
            0x2 => Some(Self::ProgramNoSeq),
            0x3 => Some(Self::PreProgramNoSeq),
            0x4 => Some(Self::ProgramSeq),
            0x5 => Some(Self::PreProgramSeq),
            0x6 => Some(Self::SectorErase),
            0x7 => Some(Self::MassErase),
            0x8 => Some(Self::SetVread1),
            0x9 => Some(Self::UnsetVread1),
            0xA => Some(Self::SetRecall),
            0xB => Some(Self::UnsetRecall),
            _ => None,
        }
    }

    /// Whether this command opens a sequential session
    pub const fn is_sequential(self) -> bool {
        matches!(self, Self::ProgramSeq | Self::PreProgramSeq)
    }
}

/// Program/erase retry level held in IF_CTRL.RETRY
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RetryLevel {
    /// Shortest pulse
    Retry1,
    /// Second level
    Retry2,
    /// Third level
    Retry3,
    /// Longest pulse; used for every program operation
    Retry4,
}

impl RetryLevel {
    /// Levels in increasing order
    pub const ALL: [RetryLevel; 4] = [
        RetryLevel::Retry1,
        RetryLevel::Retry2,
        RetryLevel::Retry3,
        RetryLevel::Retry4,
    ];

    /// IF_CTRL bits for this level
    pub const fn bits(self) -> IfCtrl {
        let field = match self {
            Self::Retry1 => 0,
            Self::Retry2 => 1,
            Self::Retry3 => 2,
            Self::Retry4 => 3,
        };
        IfCtrl::from_bits_retain(field << IfCtrl::RETRY.bits().trailing_zeros())
    }

    /// Decode the RETRY field of an IF_CTRL value
    pub fn from_if_ctrl(value: IfCtrl) -> Self {
        let field = (value & IfCtrl::RETRY).bits() >> IfCtrl::RETRY.bits().trailing_zeros();
        match field {
            0 => Self::Retry1,
            1 => Self::Retry2,
            2 => Self::Retry3,
            _ => Self::Retry4,
        }
    }
}

/// Register bank of one flash instance
///
/// Getters return the live register value; setters perform one register
/// write. No method waits, waiting is the sequencer's job.
pub trait FlashRegisters {
    /// Read IF_CTRL
    fn if_ctrl(&self) -> IfCtrl;
    /// Write IF_CTRL
    fn set_if_ctrl(&mut self, value: IfCtrl);
    /// Read IF_STATUS
    fn if_status(&self) -> IfStatus;

    /// Read the raw CMD_CTRL value
    fn cmd_ctrl(&self) -> u32;
    /// Write a raw CMD_CTRL value
    fn set_cmd_ctrl(&mut self, value: u32);

    /// Read ADDR
    fn addr(&self) -> u32;
    /// Write ADDR
    fn set_addr(&mut self, addr: u32);
    /// Read DATA[index] (`index` is 0 or 1)
    fn data(&self, index: usize) -> u32;
    /// Write DATA[index] (`index` is 0 or 1)
    fn set_data(&mut self, index: usize, value: u32);

    /// Read DELAY_CTRL
    fn delay_ctrl(&self) -> u32;
    /// Write DELAY_CTRL
    fn set_delay_ctrl(&mut self, value: u32);
    /// Read delay register 3 (erase pulse width)
    fn erase_delay(&self) -> u32;
    /// Write delay register 3 (erase pulse width)
    fn set_erase_delay(&mut self, value: u32);
    /// Read the internal timing trim word
    fn timing_trim(&self) -> u32;
    /// Write the internal timing trim word
    fn set_timing_trim(&mut self, value: u32);

    /// Read ECC_CTRL
    fn ecc_ctrl(&self) -> EccCtrl;
    /// Write ECC_CTRL
    fn set_ecc_ctrl(&mut self, value: EccCtrl);

    /// Write MAIN_CTRL (staged until the unlock key is written)
    fn set_main_ctrl(&mut self, value: u32);
    /// Write MAIN_WRITE_UNLOCK
    fn set_main_write_unlock(&mut self, key: u32);
    /// Write NVR_CTRL (staged until the unlock key is written)
    fn set_nvr_ctrl(&mut self, value: u32);
    /// Write NVR_WRITE_UNLOCK
    fn set_nvr_write_unlock(&mut self, key: u32);

    /// Read COPY_CTRL
    fn copy_ctrl(&self) -> CopyCtrl;
    /// Write COPY_CTRL
    fn set_copy_ctrl(&mut self, value: CopyCtrl);
    /// Write COPY_CFG
    fn set_copy_cfg(&mut self, value: CopyCfg);
    /// Read COPY_SRC_ADDR_PTR
    fn copy_src(&self) -> u32;
    /// Write COPY_SRC_ADDR_PTR
    fn set_copy_src(&mut self, addr: u32);
    /// Write COPY_WORD_CNT
    fn set_copy_word_cnt(&mut self, count: u32);
    /// Write COPY_DST_ADDR_PTR
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of COPY_WORD_CNT words until the
    /// copier reports idle again.
    unsafe fn set_copy_dst(&mut self, dst: *mut u32);

    /// Read one word of the flash array over the CPU bus
    fn cbus_read(&self, addr: u32) -> u32;
}

/// Shared CRC peripheral
pub trait CrcRegisters {
    /// Read CRC_CFG
    fn config(&self) -> CrcCfg;
    /// Write CRC_CFG
    fn set_config(&mut self, value: CrcCfg);
    /// Read the running CRC value
    fn value(&self) -> u32;
    /// Write the running CRC value (seed)
    fn set_value(&mut self, value: u32);
    /// Feed one 32-bit word
    fn add_32(&mut self, word: u32);
    /// Read the final (reversed and XORed) CRC
    fn final_value(&self) -> u32;
}

/// CPU interrupt mask (PRIMASK)
pub trait InterruptControl {
    /// Whether interrupts are currently masked
    fn primask(&self) -> bool;
    /// Mask (`true`) or unmask (`false`) interrupts
    fn set_primask(&mut self, masked: bool);
}

/// Memory power and access enables of the system controller
pub trait MemoryPower {
    /// Power up the macro of `instance`
    fn enable_power(&mut self, instance: FlashInstance);
    /// Enable bus access to `instance`
    fn enable_access(&mut self, instance: FlashInstance);
}
