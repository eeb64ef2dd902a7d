//! Flash interface register definitions
//!
//! Register offsets, bit fields and unlock keys for one flash instance
//! register block, the CRC peripheral and the memory power controller.

use bitflags::bitflags;

// ============================================================================
// Flash interface register offsets
// ============================================================================

/// Interface control register
pub const IF_CTRL_OFF: usize = 0x00;
/// Interface status register
pub const IF_STATUS_OFF: usize = 0x04;
/// Command control register
pub const CMD_CTRL_OFF: usize = 0x08;
/// Address register (21 bits)
pub const ADDR_OFF: usize = 0x0C;
/// Data register 0 (32 data bits)
pub const DATA0_OFF: usize = 0x10;
/// Data register 1 (6 raw ECC bits)
pub const DATA1_OFF: usize = 0x14;
/// Delay control register
pub const DELAY_CTRL_OFF: usize = 0x18;
/// Delay register 3, controls the erase pulse width
pub const DELAY_REG3_OFF: usize = DELAY_CTRL_OFF + DELAY_REG3_OFFSET_BYTES;
/// ECC control register
pub const ECC_CTRL_OFF: usize = 0x2C;
/// Main (code and data) write enable register
pub const MAIN_CTRL_OFF: usize = 0x30;
/// Main write unlock key register
pub const MAIN_WRITE_UNLOCK_OFF: usize = 0x34;
/// NVR write enable register
pub const NVR_CTRL_OFF: usize = 0x38;
/// NVR write unlock key register
pub const NVR_WRITE_UNLOCK_OFF: usize = 0x3C;
/// Copier configuration register
pub const COPY_CFG_OFF: usize = 0x40;
/// Copier control and status register
pub const COPY_CTRL_OFF: usize = 0x44;
/// Copier source address pointer
pub const COPY_SRC_ADDR_PTR_OFF: usize = 0x48;
/// Copier destination address pointer
pub const COPY_DST_ADDR_PTR_OFF: usize = 0x4C;
/// Copier word count
pub const COPY_WORD_CNT_OFF: usize = 0x50;
/// Internal timing trim (first reserved word)
pub const TIMING_TRIM_OFF: usize = 0x60;
/// Size of one flash interface register block
pub const FLASH_REGS_SIZE: usize = 0x64;

/// Byte distance from DELAY_CTRL to delay register 3
pub const DELAY_REG3_OFFSET_BYTES: usize = 16;

// ============================================================================
// Address limits and keys
// ============================================================================

/// Largest value the ADDR register can hold
pub const ADDR_REG_MAX_VALUE: u32 = 0x1F_FFFF;
/// Largest value the copier source register can hold
pub const COPY_SRC_ADDR_REG_MAX_VALUE: u32 = ADDR_REG_MAX_VALUE;

/// Key written to MAIN_WRITE_UNLOCK to commit MAIN_CTRL
pub const MAIN_KEY: u32 = 0xDBC8_264E;
/// Key written to NVR_WRITE_UNLOCK to commit NVR_CTRL
pub const NVR_KEY: u32 = 0xEB1F_71D2;

// ============================================================================
// Lock field positions
// ============================================================================

/// MAIN_CTRL position of the first code lock-region write enable
pub const MAIN_CTRL_CODE_W_EN_POS: u32 = 0;
/// MAIN_CTRL position of the first data lock-region write enable
pub const MAIN_CTRL_DATA_W_EN_POS: u32 = 8;
/// Code write enable bits in MAIN_CTRL
pub const CODE_WRITE_ENABLE_MASK: u32 = 0xF << MAIN_CTRL_CODE_W_EN_POS;
/// Data write enable bits in MAIN_CTRL
pub const DATA_WRITE_ENABLE_MASK: u32 = 0xFF << MAIN_CTRL_DATA_W_EN_POS;

/// NVR_CTRL position of NVR0 write enable
pub const NVR_CTRL_NVR0_W_EN_POS: u32 = 0;
/// NVR_CTRL position of NVR4 write enable
pub const NVR_CTRL_NVR4_W_EN_POS: u32 = 4;
/// NVR write enable bits in NVR_CTRL
pub const NVR_WRITE_ENABLE_MASK: u32 = 0xFF << NVR_CTRL_NVR0_W_EN_POS;

/// IF_STATUS position of NVR0 unlock status
pub const IF_STATUS_NVR0_W_UNLOCK_POS: u32 = 20;
/// IF_STATUS position of NVR4 unlock status
pub const IF_STATUS_NVR4_W_UNLOCK_POS: u32 = 24;
/// IF_STATUS position of the first code unlock status bit
pub const IF_STATUS_CODE_W_UNLOCK_POS: u32 = MAIN_CTRL_CODE_W_EN_POS;
/// IF_STATUS position of the first data unlock status bit
pub const IF_STATUS_DATA_W_UNLOCK_POS: u32 = MAIN_CTRL_DATA_W_EN_POS;

/// DELAY_CTRL position of the SYSCLK_FREQ field
pub const DELAY_CTRL_SYSCLK_FREQ_POS: u32 = 0;
/// SYSCLK_FREQ field mask in DELAY_CTRL
pub const DELAY_CTRL_SYSCLK_FREQ_MASK: u32 = 0xF << DELAY_CTRL_SYSCLK_FREQ_POS;
/// Timing trim field selecting internal delays for fast clocks
pub const TIMING_TRIM_MASK: u32 = 0x7;

// ============================================================================
// Register bit fields
// ============================================================================

bitflags! {
    /// IF_CTRL: retry level and the mutually exclusive read modes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IfCtrl: u32 {
        /// Program/erase retry level field
        const RETRY   = 0x3 << 4;
        /// Verified read (tighter read margin)
        const VREAD1  = 1 << 8;
        /// Recall read mode
        const RECALL  = 1 << 9;
        /// Low power mode
        const LP_MODE = 1 << 10;
    }
}

bitflags! {
    /// IF_STATUS: controller state and current unlock status
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IfStatus: u32 {
        /// Code lock regions currently unlocked
        const CODE_W_UNLOCKED   = 0xF << IF_STATUS_CODE_W_UNLOCK_POS;
        /// Data lock regions currently unlocked
        const DATA_W_UNLOCKED   = 0xFF << IF_STATUS_DATA_W_UNLOCK_POS;
        /// Command interface busy
        const BUSY              = 1 << 16;
        /// Sequential programming requests new data
        const PROG_SEQ_DATA_REQ = 1 << 17;
        /// Interface isolated
        const ISOLATE           = 1 << 18;
        /// NVR0..NVR7 currently unlocked
        const NVR_W_UNLOCKED    = 0xFF << IF_STATUS_NVR0_W_UNLOCK_POS;
    }
}

/// CMD_CTRL command field
pub const CMD_CTRL_COMMAND_MASK: u32 = 0xF;
/// CMD_CTRL bit terminating the current command
pub const CMD_CTRL_CMD_END: u32 = 1 << 4;

bitflags! {
    /// ECC_CTRL: automatic ECC generation and checking
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EccCtrl: u32 {
        /// Disable ECC on CPU bus reads
        const CBUS_ECC_DISABLE            = 1 << 0;
        /// Disable ECC on command interface program/read
        const CMD_ECC_DISABLE             = 1 << 1;
        /// Disable ECC on copier reads
        const COPIER_ECC_DISABLE          = 1 << 2;
        /// Correction interrupt disabled
        const COR_INT_THRESHOLD_DISABLED  = 0xFF << 8;
    }
}

impl EccCtrl {
    /// Configuration used while raw 38-bit words are moved
    pub const BYPASS: Self = Self::CBUS_ECC_DISABLE
        .union(Self::CMD_ECC_DISABLE)
        .union(Self::COPIER_ECC_DISABLE)
        .union(Self::COR_INT_THRESHOLD_DISABLED);
}

bitflags! {
    /// COPY_CFG: copier mode selection
    ///
    /// An empty configuration selects plain copy mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CopyCfg: u32 {
        /// Comparator mode instead of copy mode
        const COMPARATOR       = 1 << 0;
        /// Copy into the CRC peripheral instead of memory
        const TO_CRC           = 1 << 1;
        /// Compare against the constant held in DATA[0]/DATA[1]
        const COMP_CONSTANT    = 1 << 2;
        /// Walk addresses upwards
        const COMP_ADDR_UP     = 1 << 3;
        /// Advance by one word per step
        const COMP_ADDR_STEP_1 = 1 << 4;
    }
}

impl CopyCfg {
    /// Plain copy mode
    pub const COPY: Self = Self::empty();
    /// Blank check: compare every word upwards against a constant
    pub const VERIFY_EMPTY: Self = Self::COMPARATOR
        .union(Self::COMP_CONSTANT)
        .union(Self::COMP_ADDR_UP)
        .union(Self::COMP_ADDR_STEP_1);
    /// Feed the source range into the CRC peripheral
    pub const CRC: Self = Self::TO_CRC;
}

bitflags! {
    /// COPY_CTRL: copier control and status
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CopyCtrl: u32 {
        /// Start the configured transfer
        const START = 1 << 0;
        /// Stop a running transfer
        const STOP  = 1 << 1;
        /// Transfer in progress (read-only)
        const BUSY  = 1 << 8;
        /// Transfer stopped on a compare mismatch or bus error (read-only)
        const ERROR = 1 << 9;
    }
}

// ============================================================================
// CRC peripheral
// ============================================================================

/// CRC configuration register
pub const CRC_CFG_OFF: usize = 0x00;
/// CRC current value register
pub const CRC_VALUE_OFF: usize = 0x04;
/// CRC 32-bit data input
pub const CRC_ADD_32_OFF: usize = 0x14;
/// CRC final (reversed and XORed) value
pub const CRC_FINAL_OFF: usize = 0x18;
/// Size of the CRC register block
pub const CRC_REGS_SIZE: usize = 0x1C;

bitflags! {
    /// CRC_CFG
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CrcCfg: u32 {
        /// CRC-32 polynomial instead of CCITT
        const CRC_32               = 1 << 0;
        /// Words are fed most significant byte first
        const BIG_ENDIAN           = 1 << 1;
        /// Standard (non reflected) input bit order
        const BIT_ORDER_STANDARD   = 1 << 2;
        /// Standard final bit reversal
        const FINAL_REVERSE_STANDARD = 1 << 3;
        /// Standard final XOR
        const FINAL_XOR_STANDARD   = 1 << 4;
    }
}

/// CRC configuration used to verify sequential writes
pub const VERIFY_WRITE_CRC_CFG: CrcCfg = CrcCfg::FINAL_XOR_STANDARD
    .union(CrcCfg::FINAL_REVERSE_STANDARD)
    .union(CrcCfg::BIT_ORDER_STANDARD)
    .union(CrcCfg::CRC_32)
    .union(CrcCfg::BIG_ENDIAN);
/// CRC-32 seed
pub const CRC_32_INIT_VALUE: u32 = 0xFFFF_FFFF;

// ============================================================================
// Memory power controller
// ============================================================================

/// Memory power configuration register
pub const MEM_POWER_CFG_OFF: usize = 0x00;
/// Memory access configuration register
pub const MEM_ACCESS_CFG_OFF: usize = 0x04;
/// Size of the memory power register block
pub const MEM_POWER_REGS_SIZE: usize = 0x08;

/// FLASH0 power enable bit
pub const FLASH0_POWER_ENABLE: u32 = 1 << 0;
/// FLASH1 power enable bit
pub const FLASH1_POWER_ENABLE: u32 = 1 << 1;
/// FLASH0 access enable bit
pub const FLASH0_ACCESS_ENABLE: u32 = 1 << 0;
/// FLASH1 access enable bit
pub const FLASH1_ACCESS_ENABLE: u32 = 1 << 1;
