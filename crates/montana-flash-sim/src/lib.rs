//! montana-flash-sim - In-memory model of the Montana flash controller
//!
//! This crate implements the register-bank traits of `montana-flash-core`
//! on top of an in-memory model of both flash instances, the shared CRC
//! peripheral, the interrupt mask and the memory power controller. It lets
//! the driver run unchanged on a development host, and persists flash
//! contents as image files.

pub mod crc;
pub mod flash;
pub mod image;
pub mod system;

pub use crc::{CrcState, SharedCrc, SimCrc};
pub use flash::{Cell, EraseEvent, ProgramEvent, SimFlash};
pub use image::ImageError;
pub use system::{SimIrq, SimPower};

use montana_flash_core::region::{FlashInstance, FLASH_INSTANCE_NUM};
use montana_flash_core::FlashController;

/// Controller driving the simulated chip
pub type SimController = FlashController<SimFlash, SimCrc, SimIrq>;

/// Behaviour of the simulated chip
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Row length in words used by sequential programming, instead of the
    /// region's real row length
    pub row_words_override: Option<u32>,
    /// Erase pulses a sector needs before it reads blank
    pub erase_pulses_required: u32,
    /// Start with every lock region write-enabled
    pub unlocked: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            row_words_override: None,
            erase_pulses_required: 1,
            unlocked: false,
        }
    }
}

/// Build a controller over an erased, uninitialized chip
pub fn new_controller(config: &SimConfig) -> SimController {
    let crc = SimCrc::default();
    let flash0 = SimFlash::new(FlashInstance::Flash0, config, crc.shared());
    let flash1 = SimFlash::new(FlashInstance::Flash1, config, crc.shared());
    FlashController::new(flash0, flash1, crc, SimIrq::new())
}

/// Build a controller and initialize both instances at `clock_hz`
pub fn initialized_controller(
    config: &SimConfig,
    clock_hz: u32,
) -> montana_flash_core::Result<(SimController, SimPower)> {
    let mut ctrl = new_controller(config);
    let mut power = SimPower::new();
    for num in 0..FLASH_INSTANCE_NUM {
        ctrl.initialize(num, clock_hz, &mut power)?;
    }
    Ok((ctrl, power))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::{DEFAULT_ERASE_DELAY, ERASED_DATA};
    use montana_flash_core::region::{RegionDescriptor, RegionKind};
    use montana_flash_core::regs::{Command, EccCtrl, FlashRegisters, IfCtrl, IfStatus, InterruptControl, RetryLevel};
    use montana_flash_core::{sequencer, sequential, Error};

    const CLOCK: u32 = 48_000_000;

    fn ready() -> SimController {
        ready_with(&SimConfig::default())
    }

    fn ready_with(config: &SimConfig) -> SimController {
        initialized_controller(config, CLOCK).unwrap().0
    }

    fn region(instance: FlashInstance, kind: RegionKind) -> &'static RegionDescriptor {
        instance.region(kind)
    }

    fn unlock_bits(bank: &SimFlash) -> IfStatus {
        bank.if_status()
            & (IfStatus::CODE_W_UNLOCKED | IfStatus::DATA_W_UNLOCKED | IfStatus::NVR_W_UNLOCKED)
    }

    #[test]
    fn test_initialize_rejects_bad_params() {
        let mut ctrl = new_controller(&SimConfig::default());
        let mut power = SimPower::new();
        assert_eq!(ctrl.initialize(2, CLOCK, &mut power), Err(Error::InvalidParams));
        assert_eq!(
            ctrl.initialize(0, 7_000_000, &mut power),
            Err(Error::InvalidParams)
        );
        assert!(!power.is_powered(FlashInstance::Flash0));
        assert!(!ctrl.is_initialized());

        let code0 = region(FlashInstance::Flash0, RegionKind::Code);
        assert_eq!(ctrl.read_word(code0.base), Err(Error::Inaccessible));
        assert_eq!(ctrl.write_word(code0.base, 0, false), Err(Error::Inaccessible));
        assert_eq!(ctrl.erase_flash_bank(0), Err(Error::Inaccessible));
        assert_eq!(ctrl.blank_check(code0.base, 4), Err(Error::Inaccessible));
    }

    #[test]
    fn test_initialize_programs_timing_and_power() {
        let mut ctrl = new_controller(&SimConfig::default());
        let mut power = SimPower::new();

        ctrl.initialize(1, 48_000_000, &mut power).unwrap();
        let bank = ctrl.bank(FlashInstance::Flash1);
        assert_eq!(bank.delay_ctrl(), 9);
        assert_eq!(bank.timing_trim() & 0x7, 2);
        assert!(power.is_powered(FlashInstance::Flash1));
        assert!(power.is_accessible(FlashInstance::Flash1));
        assert!(!power.is_powered(FlashInstance::Flash0));

        ctrl.initialize(0, 3_000_000, &mut power).unwrap();
        let bank = ctrl.bank(FlashInstance::Flash0);
        assert_eq!(bank.delay_ctrl(), 0);
        assert_eq!(bank.timing_trim(), 0);

        ctrl.initialize(0, 24_000_000, &mut power).unwrap();
        let bank = ctrl.bank(FlashInstance::Flash0);
        assert_eq!(bank.delay_ctrl(), 8);
        assert_eq!(bank.timing_trim() & 0x7, 1);
        assert!(ctrl.is_initialized());
    }

    #[test]
    fn test_write_read_round_trip() {
        let mut ctrl = ready();
        let cases = [
            (region(FlashInstance::Flash0, RegionKind::Code).base, 0x0000_0000),
            (region(FlashInstance::Flash0, RegionKind::Code).base + 0x15FFC, 0xDEAD_BEEF),
            (region(FlashInstance::Flash0, RegionKind::Data).base + 0x100, 0x1234_5678),
            (region(FlashInstance::Flash0, RegionKind::Nvr).base, 0xA5A5_5A5A),
            (region(FlashInstance::Flash1, RegionKind::Code).top - 3, 0x0F0F_0F0F),
            (region(FlashInstance::Flash1, RegionKind::Data).base, 0x0000_0001),
            (region(FlashInstance::Flash1, RegionKind::Nvr).top - 3, 0x8000_0000),
        ];
        for (i, &(addr, word)) in cases.iter().enumerate() {
            ctrl.write_word(addr, word, i % 2 == 0).unwrap();
            assert_eq!(ctrl.read_word(addr), Ok(word), "{:#010x}", addr);
        }
        for instance in FlashInstance::ALL {
            assert_eq!(unlock_bits(ctrl.bank(instance)), IfStatus::empty());
        }
    }

    #[test]
    fn test_write_word_reports_mismatch() {
        let mut ctrl = ready();
        let addr = region(FlashInstance::Flash1, RegionKind::Data).base + 0x40;
        ctrl.write_word(addr, 0x0000_FFFF, false).unwrap();
        // Programming can only clear bits
        assert_eq!(ctrl.write_word(addr, 0xFFFF_0000, false), Err(Error::Unknown));
        assert_eq!(ctrl.read_word(addr), Ok(0));
    }

    #[test]
    fn test_address_and_interface_checks() {
        let mut ctrl = ready();
        let code0 = region(FlashInstance::Flash0, RegionKind::Code);
        let code1 = region(FlashInstance::Flash1, RegionKind::Code);

        assert_eq!(ctrl.write_word(code0.base + 2, 0, false), Err(Error::AddressWordAlign));
        assert_eq!(ctrl.write_word(0x0000_0000, 0, false), Err(Error::BadAddress));
        assert_eq!(ctrl.read_word(0x0008_0000), Err(Error::BadAddress));

        ctrl.bank_mut(FlashInstance::Flash1).set_isolated(true);
        assert_eq!(ctrl.write_word(code1.base, 0, false), Err(Error::Inaccessible));
        assert_eq!(ctrl.erase_flash_bank(1), Err(Error::Inaccessible));
        assert_eq!(ctrl.write_word(code0.base, 0, false), Ok(()));
    }

    #[test]
    fn test_existing_lock_config_is_restored() {
        let mut ctrl = ready();
        let code0 = region(FlashInstance::Flash0, RegionKind::Code);
        code0.attr.write_lock(ctrl.bank_mut(FlashInstance::Flash0), 0b1000);

        ctrl.write_word(code0.base, 0x55AA_55AA, false).unwrap();
        assert_eq!(code0.attr.read_lock(ctrl.bank(FlashInstance::Flash0)), 0b1000);

        assert_eq!(ctrl.write_word(code0.base, 0xFFFF_FFFF, false), Err(Error::Unknown));
        assert_eq!(code0.attr.read_lock(ctrl.bank(FlashInstance::Flash0)), 0b1000);
    }

    #[test]
    fn test_if_ctrl_restored() {
        let mut ctrl = ready();
        let data0 = region(FlashInstance::Flash0, RegionKind::Data);
        sequencer::apply_if_ctrl(ctrl.bank_mut(FlashInstance::Flash0), IfCtrl::VREAD1);

        ctrl.write_word(data0.base, 0x1234, true).unwrap();
        assert_eq!(ctrl.bank(FlashInstance::Flash0).if_ctrl(), IfCtrl::VREAD1);
        ctrl.read_word(data0.base).unwrap();
        assert_eq!(ctrl.bank(FlashInstance::Flash0).if_ctrl(), IfCtrl::VREAD1);
        ctrl.erase_sector(data0.base, true).unwrap();
        assert_eq!(ctrl.bank(FlashInstance::Flash0).if_ctrl(), IfCtrl::VREAD1);
    }

    #[test]
    fn test_write_double_round_trip() {
        let mut ctrl = ready();
        let addr = region(FlashInstance::Flash0, RegionKind::Data).base + 0x40;

        ctrl.write_double(addr, [0x1234_5678, 0xFFFF_FF15], true).unwrap();
        assert_eq!(ctrl.read_double(addr), Ok([0x1234_5678, 0x15]));
        assert_eq!(ctrl.read_word(addr), Ok(0x1234_5678));

        let bank = ctrl.bank(FlashInstance::Flash0);
        assert_eq!(bank.peek_ecc(addr), Some(0x15));
        assert_eq!(bank.ecc_ctrl(), EccCtrl::empty());
        assert_eq!(unlock_bits(bank), IfStatus::empty());
    }

    #[test]
    fn test_read_double_returns_generated_ecc() {
        let mut ctrl = ready();
        let addr = region(FlashInstance::Flash1, RegionKind::Nvr).base + 0x10;
        ctrl.write_word(addr, 0xCAFE_F00D, false).unwrap();
        assert_eq!(
            ctrl.read_double(addr),
            Ok([0xCAFE_F00D, flash::ecc6(0xCAFE_F00D) as u32])
        );
    }

    #[test]
    fn test_write_buffer_across_rows() {
        let mut ctrl = ready();
        let code0 = region(FlashInstance::Flash0, RegionKind::Code);
        // Four words before the first row boundary
        let addr = code0.base + 0x1F0;
        let words: Vec<u32> = (0..300).map(|i| 0x1000_0000 + i * 7).collect();

        ctrl.write_buffer(addr, &words, false).unwrap();

        let bank = ctrl.bank(FlashInstance::Flash0);
        for (i, &w) in words.iter().enumerate() {
            assert_eq!(bank.peek(addr + 4 * i as u32), Some(w));
        }
        let programmed: Vec<u32> = bank
            .program_log()
            .iter()
            .filter(|e| e.cmd == Command::ProgramSeq)
            .map(|e| e.addr)
            .collect();
        let expected: Vec<u32> = (0..300).map(|i| addr + 4 * i).collect();
        assert_eq!(programmed, expected);
        assert_eq!(unlock_bits(bank), IfStatus::empty());
        assert!(!bank.session_open());
        assert!(!ctrl.irq().primask());
    }

    #[test]
    fn test_write_buffer_endurance_pre_programs() {
        let mut ctrl = ready();
        let addr = region(FlashInstance::Flash1, RegionKind::Data).base;
        let words = [0x0101_0101u32; 40];

        ctrl.write_buffer(addr, &words, true).unwrap();

        let log = ctrl.bank(FlashInstance::Flash1).program_log();
        let pre = log.iter().filter(|e| e.cmd == Command::PreProgramSeq).count();
        let prog = log.iter().filter(|e| e.cmd == Command::ProgramSeq).count();
        assert_eq!(pre, 40);
        assert_eq!(prog, 40);
        // The pre-program pass runs first
        assert!(log[..40].iter().all(|e| e.cmd == Command::PreProgramSeq));
    }

    #[test]
    fn test_write_buffer_detects_corruption() {
        let mut ctrl = ready();
        let addr = region(FlashInstance::Flash1, RegionKind::Data).base + 0x80;
        ctrl.bank_mut(FlashInstance::Flash1)
            .inject_stuck_bits(addr + 8, 0x0000_0100);

        assert_eq!(ctrl.write_buffer(addr, &[0u32; 16], false), Err(Error::CrcCheck));
        assert_eq!(unlock_bits(ctrl.bank(FlashInstance::Flash1)), IfStatus::empty());

        let clean = region(FlashInstance::Flash1, RegionKind::Data).base + 0x200;
        assert_eq!(ctrl.write_buffer(clean, &[0u32; 16], false), Ok(()));
    }

    #[test]
    fn test_write_buffer_params() {
        let mut ctrl = ready();
        let nvr0 = region(FlashInstance::Flash0, RegionKind::Nvr);
        assert_eq!(ctrl.write_buffer(nvr0.base, &[], false), Err(Error::ZeroLen));
        assert_eq!(
            ctrl.write_buffer(nvr0.top - 3, &[0, 0], false),
            Err(Error::BadLength)
        );
        assert_eq!(ctrl.write_buffer(nvr0.top - 3, &[0], false), Ok(()));
    }

    #[test]
    fn test_sequential_row_wrap() {
        let code0 = region(FlashInstance::Flash0, RegionKind::Code);
        for row in [2u32, 3, 5] {
            let row_bytes = row * 4;
            let first_row = code0.base + (row_bytes - code0.base % row_bytes) % row_bytes;
            for start_word in 0..row {
                for len in [1, 2, row, row + 1, 2 * row + 1, 4 * row + 3] {
                    let config = SimConfig {
                        row_words_override: Some(row),
                        unlocked: true,
                        ..SimConfig::default()
                    };
                    let mut crc = SimCrc::default();
                    let mut flash = SimFlash::new(FlashInstance::Flash0, &config, crc.shared());
                    let mut irq = SimIrq::new();
                    // Caller runs with interrupts masked
                    irq.set_primask(true);

                    let addr = first_row + 16 * row_bytes + start_word * 4;
                    let words: Vec<u32> = (0..len).map(|i| 0xA000_0000 | (row << 16) | i).collect();
                    let crc_written = sequential::write_sequential(
                        &mut flash,
                        &mut crc,
                        &mut irq,
                        addr,
                        &words,
                        row,
                        Command::ProgramSeq,
                    )
                    .unwrap();

                    let what = format!("row {} start {} len {}", row, start_word, len);
                    let programmed: Vec<u32> =
                        flash.program_log().iter().map(|e| e.addr).collect();
                    let expected: Vec<u32> = (0..len).map(|i| addr + 4 * i).collect();
                    assert_eq!(programmed, expected, "{}", what);
                    for (i, &w) in words.iter().enumerate() {
                        assert_eq!(flash.peek(addr + 4 * i as u32), Some(w), "{}", what);
                    }

                    let boundaries = (1..len).filter(|i| (addr + 4 * i) % row_bytes == 0).count();
                    assert_eq!(irq.windows() as usize, boundaries, "{}", what);
                    assert!(irq.primask());

                    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
                    assert_eq!(crc_written, crc32fast::hash(&bytes), "{}", what);
                    assert!(!flash.session_open());
                }
            }
        }
    }

    #[test]
    fn test_sequential_command_not_accepted() {
        let code0 = region(FlashInstance::Flash0, RegionKind::Code);
        let first_row = code0.base + (8 - code0.base % 8) % 8;
        // Dropped at the start, then at the first row boundary
        for (accepted, programmed) in [(0u32, 0usize), (1, 2)] {
            let config = SimConfig {
                row_words_override: Some(2),
                unlocked: true,
                ..SimConfig::default()
            };
            let mut crc = SimCrc::default();
            crc.shared().borrow_mut().value = 0x0BAD_F00D;
            let mut flash = SimFlash::new(FlashInstance::Flash0, &config, crc.shared());
            sequencer::apply_if_ctrl(&mut flash, IfCtrl::RECALL);
            let mut irq = SimIrq::new();
            irq.set_primask(true);
            flash.inject_sequential_reject(accepted);

            let result = sequential::write_sequential(
                &mut flash,
                &mut crc,
                &mut irq,
                first_row,
                &[1, 2, 3, 4, 5],
                2,
                Command::ProgramSeq,
            );

            assert_eq!(result, Err(Error::Unknown));
            assert_eq!(flash.program_log().len(), programmed);
            assert!(!flash.session_open());
            assert!(!sequencer::read_busy(&flash));
            assert_eq!(flash.if_ctrl(), IfCtrl::RECALL);
            assert!(irq.primask());
            let state = crc.snapshot();
            assert_eq!(state.value, 0x0BAD_F00D);
            assert_eq!(state.config, montana_flash_core::regs::CrcCfg::empty());
        }
    }

    #[test]
    fn test_write_buffer_reports_rejected_command() {
        let mut ctrl = ready();
        let addr = region(FlashInstance::Flash1, RegionKind::Data).base;
        ctrl.bank_mut(FlashInstance::Flash1).inject_sequential_reject(0);

        assert_eq!(ctrl.write_buffer(addr, &[7; 8], false), Err(Error::Unknown));
        let bank = ctrl.bank(FlashInstance::Flash1);
        assert!(!bank.session_open());
        assert_eq!(unlock_bits(bank), IfStatus::empty());
        assert_eq!(bank.peek(addr), Some(ERASED_DATA));
        assert!(!ctrl.irq().primask());

        assert_eq!(ctrl.write_buffer(addr, &[7; 8], false), Ok(()));
    }

    #[test]
    fn test_sequential_restores_crc_peripheral() {
        let mut ctrl = ready();
        let addr = region(FlashInstance::Flash0, RegionKind::Data).base;
        {
            let shared = ctrl.crc().shared();
            let mut state = shared.borrow_mut();
            state.value = 0x1357_9BDF;
        }
        ctrl.write_buffer(addr, &[1, 2, 3, 4, 5], false).unwrap();
        let after = ctrl.crc().snapshot();
        assert_eq!(after.value, 0x1357_9BDF);
        assert_eq!(after.config, montana_flash_core::regs::CrcCfg::empty());
    }

    #[test]
    fn test_endurance_erase_blank_after_third_pulse() {
        let config = SimConfig {
            erase_pulses_required: 3,
            ..SimConfig::default()
        };
        let mut ctrl = ready_with(&config);
        let sector = region(FlashInstance::Flash0, RegionKind::Data).base + 0x400;
        ctrl.write_word(sector + 8, 0x1234, false).unwrap();
        ctrl.bank_mut(FlashInstance::Flash0).clear_logs();

        assert_eq!(ctrl.erase_sector(sector, true), Ok(()));

        let bank = ctrl.bank(FlashInstance::Flash0);
        let levels: Vec<RetryLevel> = bank.erase_log().iter().map(|e| e.level).collect();
        assert_eq!(levels, [RetryLevel::Retry1, RetryLevel::Retry2, RetryLevel::Retry3]);
        assert_eq!(bank.compare_log(), &[true, true, true]);
        assert!(bank.erase_log().iter().all(|e| e.allowed));
        assert_eq!(bank.peek(sector + 8), Some(ERASED_DATA));
        assert_eq!(unlock_bits(bank), IfStatus::empty());
        assert_eq!(ctrl.blank_check(sector, 0x40), Ok(()));
    }

    #[test]
    fn test_endurance_erase_never_blank() {
        let config = SimConfig {
            erase_pulses_required: 5,
            ..SimConfig::default()
        };
        let mut ctrl = ready_with(&config);
        let sector = region(FlashInstance::Flash1, RegionKind::Code).base + 0x800;
        ctrl.write_word(sector, 0, false).unwrap();
        ctrl.bank_mut(FlashInstance::Flash1).clear_logs();

        assert_eq!(ctrl.erase_sector(sector, true), Err(Error::Unknown));

        let bank = ctrl.bank(FlashInstance::Flash1);
        let levels: Vec<RetryLevel> = bank.erase_log().iter().map(|e| e.level).collect();
        assert_eq!(levels, RetryLevel::ALL);
        // Verified reads after levels 1 to 3, a plain read after level 4
        assert_eq!(bank.compare_log(), &[true, true, true, false]);
        assert_eq!(bank.if_ctrl(), IfCtrl::empty());
        assert_eq!(bank.peek(sector), Some(0));
        assert_eq!(unlock_bits(bank), IfStatus::empty());
    }

    #[test]
    fn test_fast_erase() {
        let mut ctrl = ready();
        let sector = region(FlashInstance::Flash0, RegionKind::Code).base + 0x1000;
        ctrl.write_word(sector + 0x1FC, 0, false).unwrap();
        ctrl.bank_mut(FlashInstance::Flash0).clear_logs();

        assert_eq!(ctrl.erase_sector(sector, false), Ok(()));

        let bank = ctrl.bank(FlashInstance::Flash0);
        let log = bank.erase_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].level, RetryLevel::Retry4);
        assert_eq!(log[0].delay, DEFAULT_ERASE_DELAY * 4);
        assert_eq!(bank.compare_log(), &[false]);
        assert_eq!(bank.erase_delay(), DEFAULT_ERASE_DELAY);
        assert_eq!(bank.peek(sector + 0x1FC), Some(ERASED_DATA));
    }

    #[test]
    fn test_fast_erase_single_pulse_not_enough() {
        let config = SimConfig {
            erase_pulses_required: 2,
            ..SimConfig::default()
        };
        let mut ctrl = ready_with(&config);
        let sector = region(FlashInstance::Flash0, RegionKind::Nvr).base;
        ctrl.write_word(sector, 0, false).unwrap();
        ctrl.bank_mut(FlashInstance::Flash0).clear_logs();
        assert_eq!(ctrl.erase_sector(sector, false), Err(Error::Unknown));
        let bank = ctrl.bank(FlashInstance::Flash0);
        assert_eq!(bank.erase_delay(), DEFAULT_ERASE_DELAY);
        assert_eq!(bank.compare_log(), &[false]);
    }

    #[test]
    fn test_mass_erase_isolates_nvr() {
        let mut ctrl = ready();
        let code = region(FlashInstance::Flash0, RegionKind::Code);
        let data = region(FlashInstance::Flash0, RegionKind::Data);
        let nvr = region(FlashInstance::Flash0, RegionKind::Nvr);
        let other = region(FlashInstance::Flash1, RegionKind::Code);

        ctrl.write_word(code.base, 0x1111_1111, false).unwrap();
        ctrl.write_word(code.top - 3, 0x2222_2222, false).unwrap();
        ctrl.write_word(data.base + 0x100, 0x3333_3333, false).unwrap();
        ctrl.write_word(nvr.base, 0x4444_4444, false).unwrap();
        ctrl.write_word(other.base, 0x5555_5555, false).unwrap();

        for nvr_before in [0, 0b0011] {
            {
                let bank = ctrl.bank_mut(FlashInstance::Flash0);
                code.attr.write_lock(bank, 0b0101);
                data.attr.write_lock(bank, 0x0F);
                nvr.attr.write_lock(bank, nvr_before);
                bank.clear_logs();
            }

            ctrl.erase_flash_bank(0).unwrap();

            let bank = ctrl.bank(FlashInstance::Flash0);
            assert_eq!(code.attr.read_lock(bank), 0b0101);
            assert_eq!(data.attr.read_lock(bank), 0x0F);
            assert_eq!(nvr.attr.read_lock(bank), nvr_before);
            assert_eq!(bank.mass_erase_nvr_states(), &[0]);
            // NVR is locked first and only restored at the very end
            let history = bank.nvr_history();
            assert_eq!(history.first(), Some(&0));
            assert!(history[..history.len() - 1].iter().all(|&v| v == 0));

            assert_eq!(bank.peek(code.base), Some(ERASED_DATA));
            assert_eq!(bank.peek(code.top - 3), Some(ERASED_DATA));
            assert_eq!(bank.peek(data.base + 0x100), Some(ERASED_DATA));
            assert_eq!(bank.peek(nvr.base), Some(0x4444_4444));
        }
        assert_eq!(
            ctrl.bank(FlashInstance::Flash1).peek(other.base),
            Some(0x5555_5555)
        );
    }

    #[test]
    fn test_erase_chip() {
        let mut ctrl = ready();
        let data0 = region(FlashInstance::Flash0, RegionKind::Data);
        let data1 = region(FlashInstance::Flash1, RegionKind::Data);
        ctrl.write_word(data0.top - 3, 0, false).unwrap();
        ctrl.write_word(data1.base, 0, false).unwrap();

        assert_eq!(ctrl.erase_flash_bank(2), Err(Error::InvalidParams));
        assert_eq!(ctrl.erase_chip(), Ok(()));
        assert_eq!(ctrl.blank_check(data0.top - 3, 2), Ok(()));
        for instance in FlashInstance::ALL {
            assert_eq!(ctrl.bank(instance).mass_erase_nvr_states(), &[0]);
        }
    }

    #[test]
    fn test_erase_chip_stops_at_first_failure() {
        let mut ctrl = ready();
        ctrl.bank_mut(FlashInstance::Flash0).set_isolated(true);
        assert_eq!(ctrl.erase_chip(), Err(Error::Inaccessible));
        assert!(ctrl.bank(FlashInstance::Flash1).mass_erase_nvr_states().is_empty());
    }

    #[test]
    fn test_read_buffer_across_instances() {
        let mut ctrl = ready();
        let code0 = region(FlashInstance::Flash0, RegionKind::Code);
        let code1 = region(FlashInstance::Flash1, RegionKind::Code);
        let start = code0.top + 1 - 16;
        for i in 0..10u32 {
            ctrl.write_word(start + 4 * i, 0x5000_0000 + i, false).unwrap();
        }

        let mut spanning = [0u32; 10];
        ctrl.read_buffer(start, &mut spanning).unwrap();

        let mut first = [0u32; 4];
        let mut second = [0u32; 6];
        ctrl.read_buffer(start, &mut first).unwrap();
        ctrl.read_buffer(code1.base, &mut second).unwrap();

        assert_eq!(spanning[..4], first);
        assert_eq!(spanning[4..], second);
        let expected: [u32; 10] = core::array::from_fn(|i| 0x5000_0000 + i as u32);
        assert_eq!(spanning, expected);
    }

    #[test]
    fn test_read_buffer_errors() {
        let mut ctrl = ready();
        let data1 = region(FlashInstance::Flash1, RegionKind::Data);
        assert_eq!(ctrl.read_buffer(data1.base, &mut []), Err(Error::ZeroLen));
        // Runs off the end of the address map
        assert_eq!(
            ctrl.read_buffer(data1.top - 7, &mut [0; 4]),
            Err(Error::BadAddress)
        );

        // Copier stopped early without raising its error bit
        let code0 = region(FlashInstance::Flash0, RegionKind::Code);
        ctrl.bank_mut(FlashInstance::Flash0).inject_copier_preempt(2);
        assert_eq!(ctrl.read_buffer(code0.base, &mut [0; 4]), Err(Error::Unknown));
        assert_eq!(ctrl.read_buffer(code0.base, &mut [0; 4]), Ok(()));
    }

    #[test]
    fn test_blank_check() {
        let mut ctrl = ready();
        let code0 = region(FlashInstance::Flash0, RegionKind::Code);
        let data0 = region(FlashInstance::Flash0, RegionKind::Data);
        let data1 = region(FlashInstance::Flash1, RegionKind::Data);

        assert_eq!(ctrl.blank_check(code0.base, code0.word_len()), Ok(()));
        assert_eq!(ctrl.blank_check(code0.base, 0), Err(Error::ZeroLen));

        ctrl.write_word(data1.base + 0x20, 0, false).unwrap();
        // Four words in FLASH0 data, four in FLASH1 data
        assert_eq!(ctrl.blank_check(data0.top - 15, 8), Ok(()));
        // Reaches the programmed word in FLASH1 data
        assert_eq!(ctrl.blank_check(data0.top - 15, 20), Err(Error::Unknown));

        ctrl.bank_mut(FlashInstance::Flash0).inject_copier_preempt(1);
        assert_eq!(ctrl.blank_check(code0.base, 8), Err(Error::Unknown));
    }
}
