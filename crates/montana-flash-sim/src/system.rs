//! CPU interrupt mask and memory power controller models

use montana_flash_core::region::{FlashInstance, FLASH_INSTANCE_NUM};
use montana_flash_core::regs::{InterruptControl, MemoryPower};

/// PRIMASK model that counts interrupt windows
#[derive(Debug, Clone, Default)]
pub struct SimIrq {
    masked: bool,
    windows: u32,
}

impl SimIrq {
    /// Create with interrupts unmasked
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times interrupts were unmasked while masked
    pub fn windows(&self) -> u32 {
        self.windows
    }

    /// Reset the window counter
    pub fn clear_windows(&mut self) {
        self.windows = 0;
    }
}

impl InterruptControl for SimIrq {
    fn primask(&self) -> bool {
        self.masked
    }

    fn set_primask(&mut self, masked: bool) {
        if self.masked && !masked {
            self.windows += 1;
        }
        self.masked = masked;
    }
}

/// Memory power and access enables
#[derive(Debug, Clone, Default)]
pub struct SimPower {
    powered: [bool; FLASH_INSTANCE_NUM],
    accessible: [bool; FLASH_INSTANCE_NUM],
}

impl SimPower {
    /// Create with every memory off
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `instance` is powered
    pub fn is_powered(&self, instance: FlashInstance) -> bool {
        self.powered[instance.index()]
    }

    /// Whether bus access to `instance` is enabled
    pub fn is_accessible(&self, instance: FlashInstance) -> bool {
        self.accessible[instance.index()]
    }
}

impl MemoryPower for SimPower {
    fn enable_power(&mut self, instance: FlashInstance) {
        self.powered[instance.index()] = true;
    }

    fn enable_access(&mut self, instance: FlashInstance) {
        self.accessible[instance.index()] = true;
    }
}
