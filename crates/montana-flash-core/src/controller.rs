//! Public flash API
//!
//! [`FlashController`] owns the register banks of both instances, the CRC
//! peripheral and the interrupt mask. Every operation resolves its address,
//! checks the interface, computes the lock regions it touches and enables
//! exactly those for its duration.

use crate::clock::ClockFrequency;
use crate::copier;
use crate::erase;
use crate::error::{Error, Result};
use crate::guard::{EccBypassGuard, LockGuard};
use crate::lock;
use crate::program;
use crate::region::{FlashInstance, RegionDescriptor, RegionKind, FLASH_INSTANCE_NUM};
use crate::regs::defs::{DELAY_CTRL_SYSCLK_FREQ_MASK, DELAY_CTRL_SYSCLK_FREQ_POS, TIMING_TRIM_MASK};
use crate::regs::{CrcRegisters, FlashRegisters, InterruptControl, MemoryPower};
use crate::resolve::{self, AddrInfo};
use crate::sequencer;
use crate::sequential;

/// Driver for both flash instances
pub struct FlashController<F, C, I> {
    banks: [F; FLASH_INSTANCE_NUM],
    crc: C,
    irq: I,
    ready: bool,
}

impl<F, C, I> FlashController<F, C, I>
where
    F: FlashRegisters,
    C: CrcRegisters,
    I: InterruptControl,
{
    /// Create a controller over the given register banks
    ///
    /// Operations fail with [`Error::Inaccessible`] until
    /// [`initialize`](Self::initialize) has succeeded once.
    pub fn new(flash0: F, flash1: F, crc: C, irq: I) -> Self {
        Self {
            banks: [flash0, flash1],
            crc,
            irq,
            ready: false,
        }
    }

    /// Configure the timing of instance `num` for `clock_hz`, then power
    /// and enable it
    ///
    /// DELAY_CTRL must match the clock before the macro wakes up, so it is
    /// written before power is applied.
    pub fn initialize<P: MemoryPower + ?Sized>(
        &mut self,
        num: usize,
        clock_hz: u32,
        power: &mut P,
    ) -> Result<()> {
        let instance = FlashInstance::from_index(num).ok_or(Error::InvalidParams)?;
        let clock = ClockFrequency::from_hz(clock_hz).ok_or(Error::InvalidParams)?;
        let flash = &mut self.banks[instance.index()];

        flash.set_delay_ctrl(
            (clock.delay_index() << DELAY_CTRL_SYSCLK_FREQ_POS) & DELAY_CTRL_SYSCLK_FREQ_MASK,
        );
        if let Some(trim) = clock.timing_trim() {
            let value = (flash.timing_trim() & !TIMING_TRIM_MASK) | trim;
            flash.set_timing_trim(value);
        }

        power.enable_power(instance);
        power.enable_access(instance);
        sequencer::wait_busy(flash);

        log::debug!("{} initialized at {}", instance, clock);
        self.ready = true;
        Ok(())
    }

    /// Whether [`initialize`](Self::initialize) has succeeded
    pub fn is_initialized(&self) -> bool {
        self.ready
    }

    /// Register bank of `instance`
    pub fn bank(&self, instance: FlashInstance) -> &F {
        &self.banks[instance.index()]
    }

    /// Mutable register bank of `instance`
    pub fn bank_mut(&mut self, instance: FlashInstance) -> &mut F {
        &mut self.banks[instance.index()]
    }

    /// CRC peripheral
    pub fn crc(&self) -> &C {
        &self.crc
    }

    /// Interrupt control
    pub fn irq(&self) -> &I {
        &self.irq
    }

    /// Give back the register banks
    pub fn into_parts(self) -> ([F; FLASH_INSTANCE_NUM], C, I) {
        (self.banks, self.crc, self.irq)
    }

    fn check_ready(&self) -> Result<()> {
        if !self.ready {
            return Err(Error::Inaccessible);
        }
        Ok(())
    }

    /// Resolve `addr` and check that its instance is usable
    fn locate(&self, addr: u32) -> Result<AddrInfo> {
        self.check_ready()?;
        let info = resolve::resolve(addr)?;
        sequencer::interface_sanity(self.bank(info.instance))?;
        Ok(info)
    }

    /// Program one word and verify it
    pub fn write_word(&mut self, addr: u32, word: u32, endurance: bool) -> Result<()> {
        let info = self.locate(addr)?;
        let mask = lock::calculate(info.region, addr, 1)?;
        log::debug!("write word {:#010x} at {:#010x}", word, addr);

        let mut flash = LockGuard::apply(
            &mut self.banks[info.instance.index()],
            info.region.attr,
            mask,
        );
        program::write_word(&mut *flash, addr, word, endurance)
    }

    /// Program one raw 38-bit double word and verify it
    ///
    /// `words[0]` holds the 32 data bits, the low 6 bits of `words[1]` the
    /// bits normally used for ECC.
    pub fn write_double(&mut self, addr: u32, words: [u32; 2], endurance: bool) -> Result<()> {
        let info = self.locate(addr)?;
        // Still a single word location
        let mask = lock::calculate(info.region, addr, 1)?;
        log::debug!(
            "write double {:#010x}:{:#04x} at {:#010x}",
            words[0],
            words[1],
            addr
        );

        let mut flash = LockGuard::apply(
            &mut self.banks[info.instance.index()],
            info.region.attr,
            mask,
        );
        let mut flash = EccBypassGuard::new(&mut *flash);
        program::write_double(&mut *flash, addr, words, endurance)
    }

    /// Program `words` from `addr` within one region and verify them by CRC
    pub fn write_buffer(&mut self, addr: u32, words: &[u32], endurance: bool) -> Result<()> {
        let info = self.locate(addr)?;
        if words.is_empty() {
            return Err(Error::ZeroLen);
        }
        let word_length = u32::try_from(words.len()).map_err(|_| Error::BadLength)?;
        let mask = lock::calculate(info.region, addr, word_length)?;
        log::debug!("write {} words at {:#010x}", word_length, addr);

        let Self {
            banks, crc, irq, ..
        } = self;
        let mut flash = LockGuard::apply(
            &mut banks[info.instance.index()],
            info.region.attr,
            mask,
        );
        sequential::write_word_sequential(
            &mut *flash,
            crc,
            irq,
            addr,
            words,
            info.region.attr.row_word_len,
            endurance,
        )
    }

    /// Read one word
    pub fn read_word(&mut self, addr: u32) -> Result<u32> {
        let info = self.locate(addr)?;
        Ok(program::read_word(
            &mut self.banks[info.instance.index()],
            addr,
        ))
    }

    /// Read one raw 38-bit double word
    pub fn read_double(&mut self, addr: u32) -> Result<[u32; 2]> {
        let info = self.locate(addr)?;
        let mut flash = EccBypassGuard::new(&mut self.banks[info.instance.index()]);
        Ok(program::read_double(&mut *flash, addr))
    }

    /// Copy `dst.len()` words starting at `addr` into `dst`
    ///
    /// The range may span several regions and both instances.
    pub fn read_buffer(&mut self, addr: u32, dst: &mut [u32]) -> Result<()> {
        if dst.is_empty() {
            return Err(Error::ZeroLen);
        }
        let mut done = 0usize;
        while done < dst.len() {
            let start = addr.wrapping_add((done as u32) << 2);
            let info = self.locate(start)?;
            let chunk = clip(info.region, start, dst.len() - done);
            copier::copy(
                &mut self.banks[info.instance.index()],
                start,
                &mut dst[done..done + chunk],
            )?;
            done += chunk;
        }
        Ok(())
    }

    /// Erase the sector containing `addr`
    ///
    /// With `endurance` the sector is erased pulse by pulse until it
    /// verifies blank, otherwise with one stretched pulse.
    pub fn erase_sector(&mut self, addr: u32, endurance: bool) -> Result<()> {
        let info = self.locate(addr)?;
        let sector_length = info.region.attr.sector_len;
        let mask = lock::calculate(info.region, addr, sector_length)?;
        log::debug!(
            "erase sector {:#010x} ({})",
            addr,
            if endurance { "endurance" } else { "fast" }
        );

        let mut flash = LockGuard::apply(
            &mut self.banks[info.instance.index()],
            info.region.attr,
            mask,
        );
        if endurance {
            erase::erase_sector_endurance(&mut *flash, addr, sector_length)
        } else {
            erase::erase_sector_fast(&mut *flash, addr, sector_length)
        }
    }

    /// Mass erase the code and data regions of instance `num`
    ///
    /// NVR is locked for the whole operation. All three lock
    /// configurations are restored afterwards, NVR last.
    pub fn erase_flash_bank(&mut self, num: usize) -> Result<()> {
        let instance = FlashInstance::from_index(num).ok_or(Error::InvalidParams)?;
        self.check_ready()?;
        sequencer::interface_sanity(self.bank(instance))?;
        log::debug!("mass erase {}", instance);

        let code = instance.region(RegionKind::Code).attr;
        let data = instance.region(RegionKind::Data).attr;
        let nvr = instance.region(RegionKind::Nvr).attr;

        let mut flash = LockGuard::apply(&mut self.banks[instance.index()], nvr, 0);
        let mut flash = LockGuard::apply(&mut *flash, code, code.all_regions_mask());
        let mut flash = LockGuard::apply(&mut *flash, data, data.all_regions_mask());
        erase::erase_mass(&mut *flash);
        Ok(())
    }

    /// Mass erase both instances, stopping at the first failure
    pub fn erase_chip(&mut self) -> Result<()> {
        for num in 0..FLASH_INSTANCE_NUM {
            self.erase_flash_bank(num)?;
        }
        Ok(())
    }

    /// Check that `word_length` words from `addr` are erased
    ///
    /// The range may span several regions and both instances.
    pub fn blank_check(&mut self, addr: u32, word_length: u32) -> Result<()> {
        if word_length == 0 {
            return Err(Error::ZeroLen);
        }
        let mut done = 0u32;
        while done < word_length {
            let start = addr.wrapping_add(done << 2);
            let info = self.locate(start)?;
            let chunk = clip(info.region, start, (word_length - done) as usize) as u32;
            copier::verify_empty(
                &mut self.banks[info.instance.index()],
                start,
                chunk,
                false,
            )?;
            done += chunk;
        }
        Ok(())
    }
}

/// Words of `[start, start + remaining * 4)` that lie inside `region`
fn clip(region: &RegionDescriptor, start: u32, remaining: usize) -> usize {
    let end = start as u64 + ((remaining as u64) << 2) - 1;
    let end = end.min(region.top as u64);
    ((end - start as u64 + 1) >> 2) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip() {
        let code0 = FlashInstance::Flash0.region(RegionKind::Code);
        assert_eq!(clip(code0, code0.base, 4), 4);
        assert_eq!(clip(code0, code0.top - 3, 4), 1);
        assert_eq!(clip(code0, code0.top - 7, 2), 2);
        assert_eq!(clip(code0, code0.base, usize::MAX >> 3), code0.word_len() as usize);
    }
}
