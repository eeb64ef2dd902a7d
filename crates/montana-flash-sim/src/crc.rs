//! CRC peripheral model
//!
//! The peripheral is shared: the CPU feeds it through [`SimCrc`] and the
//! flash copier feeds it directly in copy-to-CRC mode, so both hold the
//! same [`SharedCrc`].

use std::cell::RefCell;
use std::rc::Rc;

use montana_flash_core::regs::{CrcCfg, CrcRegisters};

/// CRC register state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrcState {
    /// CRC_CFG
    pub config: CrcCfg,
    /// Running (non-inverted) CRC-32 register
    pub value: u32,
}

impl Default for CrcState {
    fn default() -> Self {
        Self {
            config: CrcCfg::empty(),
            value: 0,
        }
    }
}

impl CrcState {
    /// Feed one word, most significant byte first
    pub fn add_32(&mut self, word: u32) {
        // crc32fast keeps its state inverted
        let mut hasher = crc32fast::Hasher::new_with_initial(!self.value);
        hasher.update(&word.to_be_bytes());
        self.value = !hasher.finalize();
    }

    /// Final XORed value
    pub fn final_value(&self) -> u32 {
        !self.value
    }
}

/// CRC state shared between the CPU view and the copier
pub type SharedCrc = Rc<RefCell<CrcState>>;

/// CPU view of the CRC peripheral
#[derive(Debug, Clone, Default)]
pub struct SimCrc {
    state: SharedCrc,
}

impl SimCrc {
    /// Wrap a shared CRC state
    pub fn new(state: SharedCrc) -> Self {
        Self { state }
    }

    /// Shared state, for handing to the flash banks
    pub fn shared(&self) -> SharedCrc {
        Rc::clone(&self.state)
    }

    /// Snapshot of the current registers
    pub fn snapshot(&self) -> CrcState {
        self.state.borrow().clone()
    }
}

impl CrcRegisters for SimCrc {
    fn config(&self) -> CrcCfg {
        self.state.borrow().config
    }

    fn set_config(&mut self, value: CrcCfg) {
        self.state.borrow_mut().config = value;
    }

    fn value(&self) -> u32 {
        self.state.borrow().value
    }

    fn set_value(&mut self, value: u32) {
        self.state.borrow_mut().value = value;
    }

    fn add_32(&mut self, word: u32) {
        self.state.borrow_mut().add_32(word);
    }

    fn final_value(&self) -> u32 {
        self.state.borrow().final_value()
    }
}
