//! Memory-mapped register banks
//!
//! Implementations of the register-bank traits that access the real
//! register blocks with volatile loads and stores. Register blocks are
//! identified by their base address, supplied by the board support code.
//!
//! # Safety
//!
//! Constructing a bank is unsafe: the caller guarantees that the base
//! address points at the matching register block and that nothing else
//! accesses it while the bank is alive.

use crate::region::FlashInstance;
use crate::regs::defs::*;
use crate::regs::{
    CopyCfg, CopyCtrl, CrcCfg, CrcRegisters, EccCtrl, FlashRegisters, IfCtrl, IfStatus,
    MemoryPower,
};

/// A block of 32-bit memory-mapped registers
#[derive(Debug)]
pub struct MmioBlock {
    base: *mut u8,
    size: usize,
}

impl MmioBlock {
    /// Wrap the register block at `base`
    ///
    /// # Safety
    ///
    /// `base..base + size` must be a valid, exclusively owned register block.
    pub const unsafe fn new(base: usize, size: usize) -> Self {
        Self {
            base: base as *mut u8,
            size,
        }
    }

    /// Base address of the block
    pub fn base(&self) -> usize {
        self.base as usize
    }

    /// Read a 32-bit register
    #[inline]
    pub fn read32(&self, offset: usize) -> u32 {
        debug_assert!(offset + 4 <= self.size);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit read");
        // SAFETY: in bounds and aligned per the constructor contract
        unsafe { core::ptr::read_volatile(self.base.add(offset) as *const u32) }
    }

    /// Write a 32-bit register
    #[inline]
    pub fn write32(&self, offset: usize, value: u32) {
        debug_assert!(offset + 4 <= self.size);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit write");
        // SAFETY: in bounds and aligned per the constructor contract
        unsafe { core::ptr::write_volatile(self.base.add(offset) as *mut u32, value) }
    }
}

/// Flash interface register block of one instance
#[derive(Debug)]
pub struct MmioFlash {
    regs: MmioBlock,
}

impl MmioFlash {
    /// Wrap the flash interface register block at `base`
    ///
    /// # Safety
    ///
    /// See [`MmioBlock::new`]. The flash array itself must be readable at
    /// its bus addresses.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            regs: MmioBlock::new(base, FLASH_REGS_SIZE),
        }
    }
}

impl FlashRegisters for MmioFlash {
    fn if_ctrl(&self) -> IfCtrl {
        IfCtrl::from_bits_retain(self.regs.read32(IF_CTRL_OFF))
    }

    fn set_if_ctrl(&mut self, value: IfCtrl) {
        self.regs.write32(IF_CTRL_OFF, value.bits());
    }

    fn if_status(&self) -> IfStatus {
        IfStatus::from_bits_retain(self.regs.read32(IF_STATUS_OFF))
    }

    fn cmd_ctrl(&self) -> u32 {
        self.regs.read32(CMD_CTRL_OFF)
    }

    fn set_cmd_ctrl(&mut self, value: u32) {
        self.regs.write32(CMD_CTRL_OFF, value);
    }

    fn addr(&self) -> u32 {
        self.regs.read32(ADDR_OFF)
    }

    fn set_addr(&mut self, addr: u32) {
        self.regs.write32(ADDR_OFF, addr & ADDR_REG_MAX_VALUE);
    }

    fn data(&self, index: usize) -> u32 {
        self.regs.read32(DATA0_OFF + 4 * (index & 1))
    }

    fn set_data(&mut self, index: usize, value: u32) {
        self.regs.write32(DATA0_OFF + 4 * (index & 1), value);
    }

    fn delay_ctrl(&self) -> u32 {
        self.regs.read32(DELAY_CTRL_OFF)
    }

    fn set_delay_ctrl(&mut self, value: u32) {
        self.regs.write32(DELAY_CTRL_OFF, value);
    }

    fn erase_delay(&self) -> u32 {
        self.regs.read32(DELAY_REG3_OFF)
    }

    fn set_erase_delay(&mut self, value: u32) {
        self.regs.write32(DELAY_REG3_OFF, value);
    }

    fn timing_trim(&self) -> u32 {
        self.regs.read32(TIMING_TRIM_OFF)
    }

    fn set_timing_trim(&mut self, value: u32) {
        self.regs.write32(TIMING_TRIM_OFF, value);
    }

    fn ecc_ctrl(&self) -> EccCtrl {
        EccCtrl::from_bits_retain(self.regs.read32(ECC_CTRL_OFF))
    }

    fn set_ecc_ctrl(&mut self, value: EccCtrl) {
        self.regs.write32(ECC_CTRL_OFF, value.bits());
    }

    fn set_main_ctrl(&mut self, value: u32) {
        self.regs.write32(MAIN_CTRL_OFF, value);
    }

    fn set_main_write_unlock(&mut self, key: u32) {
        self.regs.write32(MAIN_WRITE_UNLOCK_OFF, key);
    }

    fn set_nvr_ctrl(&mut self, value: u32) {
        self.regs.write32(NVR_CTRL_OFF, value);
    }

    fn set_nvr_write_unlock(&mut self, key: u32) {
        self.regs.write32(NVR_WRITE_UNLOCK_OFF, key);
    }

    fn copy_ctrl(&self) -> CopyCtrl {
        CopyCtrl::from_bits_retain(self.regs.read32(COPY_CTRL_OFF))
    }

    fn set_copy_ctrl(&mut self, value: CopyCtrl) {
        self.regs.write32(COPY_CTRL_OFF, value.bits());
    }

    fn set_copy_cfg(&mut self, value: CopyCfg) {
        self.regs.write32(COPY_CFG_OFF, value.bits());
    }

    fn copy_src(&self) -> u32 {
        self.regs.read32(COPY_SRC_ADDR_PTR_OFF)
    }

    fn set_copy_src(&mut self, addr: u32) {
        self.regs.write32(COPY_SRC_ADDR_PTR_OFF, addr);
    }

    fn set_copy_word_cnt(&mut self, count: u32) {
        self.regs.write32(COPY_WORD_CNT_OFF, count);
    }

    unsafe fn set_copy_dst(&mut self, dst: *mut u32) {
        // The copier is a 32-bit bus master
        self.regs.write32(COPY_DST_ADDR_PTR_OFF, dst as usize as u32);
    }

    fn cbus_read(&self, addr: u32) -> u32 {
        // SAFETY: the flash array is mapped at its bus addresses
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }
}

/// CRC peripheral register block
#[derive(Debug)]
pub struct MmioCrc {
    regs: MmioBlock,
}

impl MmioCrc {
    /// Wrap the CRC register block at `base`
    ///
    /// # Safety
    ///
    /// See [`MmioBlock::new`].
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            regs: MmioBlock::new(base, CRC_REGS_SIZE),
        }
    }
}

impl CrcRegisters for MmioCrc {
    fn config(&self) -> CrcCfg {
        CrcCfg::from_bits_retain(self.regs.read32(CRC_CFG_OFF))
    }

    fn set_config(&mut self, value: CrcCfg) {
        self.regs.write32(CRC_CFG_OFF, value.bits());
    }

    fn value(&self) -> u32 {
        self.regs.read32(CRC_VALUE_OFF)
    }

    fn set_value(&mut self, value: u32) {
        self.regs.write32(CRC_VALUE_OFF, value);
    }

    fn add_32(&mut self, word: u32) {
        self.regs.write32(CRC_ADD_32_OFF, word);
    }

    fn final_value(&self) -> u32 {
        self.regs.read32(CRC_FINAL_OFF)
    }
}

/// System controller memory power and access registers
#[derive(Debug)]
pub struct MmioMemoryPower {
    regs: MmioBlock,
}

impl MmioMemoryPower {
    /// Wrap the memory power register block at `base`
    ///
    /// # Safety
    ///
    /// See [`MmioBlock::new`].
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            regs: MmioBlock::new(base, MEM_POWER_REGS_SIZE),
        }
    }

    fn set_bits(&mut self, offset: usize, bits: u32) {
        let value = self.regs.read32(offset);
        self.regs.write32(offset, value | bits);
    }
}

impl MemoryPower for MmioMemoryPower {
    fn enable_power(&mut self, instance: FlashInstance) {
        let bit = match instance {
            FlashInstance::Flash0 => FLASH0_POWER_ENABLE,
            FlashInstance::Flash1 => FLASH1_POWER_ENABLE,
        };
        self.set_bits(MEM_POWER_CFG_OFF, bit);
    }

    fn enable_access(&mut self, instance: FlashInstance) {
        let bit = match instance {
            FlashInstance::Flash0 => FLASH0_ACCESS_ENABLE,
            FlashInstance::Flash1 => FLASH1_ACCESS_ENABLE,
        };
        self.set_bits(MEM_ACCESS_CFG_OFF, bit);
    }
}

/// Interrupt masking through the Cortex-M PRIMASK register
#[cfg(feature = "cortex-m")]
#[derive(Debug, Default)]
pub struct CortexMInterrupts;

#[cfg(feature = "cortex-m")]
impl crate::regs::InterruptControl for CortexMInterrupts {
    fn primask(&self) -> bool {
        cortex_m::register::primask::read().is_inactive()
    }

    fn set_primask(&mut self, masked: bool) {
        if masked {
            cortex_m::interrupt::disable();
        } else {
            // SAFETY: only called to end a masked section this driver opened
            // or to restore the caller's unmasked state
            unsafe { cortex_m::interrupt::enable() };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::Command;

    #[test]
    fn test_flash_register_offsets() {
        let mut regs = [0u32; FLASH_REGS_SIZE / 4];
        // SAFETY: the array outlives the bank and is only read after it
        let mut flash = unsafe { MmioFlash::new(regs.as_mut_ptr() as usize) };
        flash.set_addr(0xFFF0_0004);
        flash.set_data(1, 0x15);
        flash.set_data(0, 0xCAFE_F00D);
        flash.set_cmd_ctrl(Command::ProgramNoSeq.bits());
        flash.set_erase_delay(0x100);
        flash.set_main_write_unlock(MAIN_KEY);
        flash.set_nvr_ctrl(0xF0);
        assert_eq!(flash.addr(), 0xFFF0_0004 & ADDR_REG_MAX_VALUE);
        assert_eq!(flash.data(1), 0x15);
        drop(flash);

        assert_eq!(regs[ADDR_OFF / 4], 0x0010_0004);
        assert_eq!(regs[DATA0_OFF / 4], 0xCAFE_F00D);
        assert_eq!(regs[DATA0_OFF / 4 + 1], 0x15);
        assert_eq!(regs[CMD_CTRL_OFF / 4], Command::ProgramNoSeq.bits());
        assert_eq!(regs[DELAY_REG3_OFF / 4], 0x100);
        assert_eq!(regs[MAIN_WRITE_UNLOCK_OFF / 4], MAIN_KEY);
        assert_eq!(regs[NVR_CTRL_OFF / 4], 0xF0);
    }

    #[test]
    fn test_crc_register_offsets() {
        let mut regs = [0u32; CRC_REGS_SIZE / 4];
        // SAFETY: the array outlives the block and is only read after it
        let mut crc = unsafe { MmioCrc::new(regs.as_mut_ptr() as usize) };
        crc.set_value(0xFFFF_FFFF);
        crc.add_32(0x1234_5678);
        drop(crc);
        assert_eq!(regs[CRC_VALUE_OFF / 4], 0xFFFF_FFFF);
        assert_eq!(regs[CRC_ADD_32_OFF / 4], 0x1234_5678);
    }

    #[test]
    fn test_memory_power_sets_bits() {
        let mut regs = [0u32; MEM_POWER_REGS_SIZE / 4];
        regs[MEM_POWER_CFG_OFF / 4] = 0x8000_0000;
        // SAFETY: the array outlives the block and is only read after it
        let mut power = unsafe { MmioMemoryPower::new(regs.as_mut_ptr() as usize) };
        power.enable_power(FlashInstance::Flash1);
        power.enable_access(FlashInstance::Flash0);
        drop(power);
        assert_eq!(regs[MEM_POWER_CFG_OFF / 4], 0x8000_0000 | FLASH1_POWER_ENABLE);
        assert_eq!(regs[MEM_ACCESS_CFG_OFF / 4], FLASH0_ACCESS_ENABLE);
    }
}
