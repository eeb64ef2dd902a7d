//! Scoped save/restore of shared registers
//!
//! IF_CTRL, ECC_CTRL, the CRC peripheral, the interrupt mask, the erase
//! timing and the lock configuration are shared by every operation. Each
//! guard saves the register on construction and restores it when dropped,
//! so every exit path puts the hardware back the way it was found.
//!
//! Flash guards dereference to the wrapped bank, so guards nest:
//!
//! ```ignore
//! let mut flash = LockGuard::apply(flash, region.attr, mask);
//! let mut flash = EccBypassGuard::new(&mut *flash);
//! // ECC_CTRL is restored first, then the lock configuration
//! ```

use core::ops::{Deref, DerefMut};

use crate::region::RegionAttributes;
use crate::regs::defs::{CRC_32_INIT_VALUE, VERIFY_WRITE_CRC_CFG};
use crate::regs::{CrcCfg, CrcRegisters, EccCtrl, FlashRegisters, IfCtrl, InterruptControl};
use crate::sequencer;

macro_rules! deref_to_bank {
    ($guard:ident, $bound:ident, $field:ident) => {
        impl<R: $bound + ?Sized> Deref for $guard<'_, R> {
            type Target = R;

            fn deref(&self) -> &R {
                self.$field
            }
        }

        impl<R: $bound + ?Sized> DerefMut for $guard<'_, R> {
            fn deref_mut(&mut self) -> &mut R {
                self.$field
            }
        }
    };
}

/// Restores IF_CTRL with [`sequencer::apply_if_ctrl`] on drop
pub struct IfCtrlGuard<'a, R: FlashRegisters + ?Sized> {
    flash: &'a mut R,
    saved: IfCtrl,
}

impl<'a, R: FlashRegisters + ?Sized> IfCtrlGuard<'a, R> {
    /// Save the current IF_CTRL
    pub fn new(flash: &'a mut R) -> Self {
        let saved = flash.if_ctrl();
        Self { flash, saved }
    }

    /// The value that will be restored
    pub fn saved(&self) -> IfCtrl {
        self.saved
    }
}

impl<R: FlashRegisters + ?Sized> Drop for IfCtrlGuard<'_, R> {
    fn drop(&mut self) {
        sequencer::apply_if_ctrl(self.flash, self.saved);
    }
}

deref_to_bank!(IfCtrlGuard, FlashRegisters, flash);

/// Disables automatic ECC on every path; restores ECC_CTRL on drop
pub struct EccBypassGuard<'a, R: FlashRegisters + ?Sized> {
    flash: &'a mut R,
    saved: EccCtrl,
}

impl<'a, R: FlashRegisters + ?Sized> EccBypassGuard<'a, R> {
    /// Save ECC_CTRL and switch to raw 38-bit access
    pub fn new(flash: &'a mut R) -> Self {
        let saved = flash.ecc_ctrl();
        flash.set_ecc_ctrl(EccCtrl::BYPASS);
        Self { flash, saved }
    }
}

impl<R: FlashRegisters + ?Sized> Drop for EccBypassGuard<'_, R> {
    fn drop(&mut self) {
        self.flash.set_ecc_ctrl(self.saved);
    }
}

deref_to_bank!(EccBypassGuard, FlashRegisters, flash);

/// Applies a lock configuration to one region kind; restores it on drop
pub struct LockGuard<'a, R: FlashRegisters + ?Sized> {
    flash: &'a mut R,
    attr: &'static RegionAttributes,
    saved: u32,
}

impl<'a, R: FlashRegisters + ?Sized> LockGuard<'a, R> {
    /// Save the lock configuration of `attr`'s kind and apply `regions`
    pub fn apply(flash: &'a mut R, attr: &'static RegionAttributes, regions: u32) -> Self {
        let saved = attr.read_lock(&*flash);
        attr.write_lock(flash, regions);
        Self { flash, attr, saved }
    }

    /// The configuration that will be restored
    pub fn saved(&self) -> u32 {
        self.saved
    }
}

impl<R: FlashRegisters + ?Sized> Drop for LockGuard<'_, R> {
    fn drop(&mut self) {
        self.attr.write_lock(self.flash, self.saved);
    }
}

deref_to_bank!(LockGuard, FlashRegisters, flash);

/// Stretches the erase pulse; restores delay register 3 on drop
pub struct EraseDelayGuard<'a, R: FlashRegisters + ?Sized> {
    flash: &'a mut R,
    saved: u32,
}

impl<'a, R: FlashRegisters + ?Sized> EraseDelayGuard<'a, R> {
    /// Multiply the erase pulse width by `factor`
    pub fn scale(flash: &'a mut R, factor: u32) -> Self {
        let saved = flash.erase_delay();
        flash.set_erase_delay(saved.wrapping_mul(factor));
        Self { flash, saved }
    }
}

impl<R: FlashRegisters + ?Sized> Drop for EraseDelayGuard<'_, R> {
    fn drop(&mut self) {
        self.flash.set_erase_delay(self.saved);
    }
}

deref_to_bank!(EraseDelayGuard, FlashRegisters, flash);

/// Configures the CRC peripheral for write verification; restores
/// CFG and VALUE on drop
pub struct CrcGuard<'a, C: CrcRegisters + ?Sized> {
    crc: &'a mut C,
    saved_config: CrcCfg,
    saved_value: u32,
}

impl<'a, C: CrcRegisters + ?Sized> CrcGuard<'a, C> {
    /// Save CFG and VALUE, then seed a fresh CRC-32
    pub fn verify_write(crc: &'a mut C) -> Self {
        let saved_config = crc.config();
        let saved_value = crc.value();
        crc.set_config(VERIFY_WRITE_CRC_CFG);
        crc.set_value(CRC_32_INIT_VALUE);
        Self {
            crc,
            saved_config,
            saved_value,
        }
    }
}

impl<C: CrcRegisters + ?Sized> Drop for CrcGuard<'_, C> {
    fn drop(&mut self) {
        self.crc.set_config(self.saved_config);
        self.crc.set_value(self.saved_value);
    }
}

deref_to_bank!(CrcGuard, CrcRegisters, crc);

/// Masks interrupts; restores the previous PRIMASK on drop
pub struct InterruptGuard<'a, I: InterruptControl + ?Sized> {
    irq: &'a mut I,
    saved: bool,
}

impl<'a, I: InterruptControl + ?Sized> InterruptGuard<'a, I> {
    /// Save PRIMASK and mask interrupts
    pub fn disable(irq: &'a mut I) -> Self {
        let saved = irq.primask();
        irq.set_primask(true);
        Self { irq, saved }
    }

    /// Briefly unmask interrupts so pending critical handlers can run
    pub fn open_window(&mut self) {
        self.irq.set_primask(false);
        self.irq.set_primask(true);
    }
}

impl<I: InterruptControl + ?Sized> Drop for InterruptGuard<'_, I> {
    fn drop(&mut self) {
        self.irq.set_primask(self.saved);
    }
}
