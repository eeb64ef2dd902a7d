//! In-memory model of one flash instance
//!
//! Commands complete as soon as they are written, so BUSY is only observed
//! while a sequential session is open. The model enforces the lock
//! configuration on program and erase, interprets IF_CTRL mode changes one
//! field per write like the hardware does and records what it was asked to
//! do so tests can inspect it afterwards.

use std::collections::HashMap;

use montana_flash_core::region::{FlashInstance, RegionDescriptor, RegionKind};
use montana_flash_core::regs::defs::{
    ADDR_REG_MAX_VALUE, CMD_CTRL_CMD_END, COPY_SRC_ADDR_REG_MAX_VALUE,
    IF_STATUS_NVR0_W_UNLOCK_POS, MAIN_CTRL_CODE_W_EN_POS, MAIN_CTRL_DATA_W_EN_POS, MAIN_KEY,
    NVR_KEY, NVR_WRITE_ENABLE_MASK,
};
use montana_flash_core::regs::{
    Command, CopyCfg, CopyCtrl, EccCtrl, FlashRegisters, IfCtrl, IfStatus, RetryLevel,
};

use crate::crc::SharedCrc;
use crate::SimConfig;

/// Value of an erased data word
pub const ERASED_DATA: u32 = 0xFFFF_FFFF;
/// Value of erased ECC bits
pub const ERASED_ECC: u8 = 0x3F;

/// Erase pulse width held in delay register 3 after reset
pub const DEFAULT_ERASE_DELAY: u32 = 0x40;

/// One 38-bit storage cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Data bits
    pub data: u32,
    /// ECC bits
    pub ecc: u8,
}

impl Cell {
    /// Erased cell
    pub const ERASED: Cell = Cell {
        data: ERASED_DATA,
        ecc: ERASED_ECC,
    };

    /// Cell holding `data` with generated ECC
    pub fn with_data(data: u32) -> Self {
        Self {
            data,
            ecc: ecc6(data),
        }
    }
}

/// 6-bit check code generated for a data word; all ones for erased data
pub fn ecc6(data: u32) -> u8 {
    let inverted = !data;
    let folded = (0..6).fold(0u32, |acc, i| acc ^ (inverted >> (i * 6)));
    !(folded as u8) & ERASED_ECC
}

/// A program command that reached the array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramEvent {
    /// Programmed address
    pub addr: u32,
    /// Command that programmed it
    pub cmd: Command,
    /// Whether the lock configuration allowed the write
    pub allowed: bool,
}

/// One sector erase pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseEvent {
    /// ADDR at the time of the pulse
    pub addr: u32,
    /// Retry level the pulse ran at
    pub level: RetryLevel,
    /// Erase pulse width (delay register 3)
    pub delay: u32,
    /// Whether the lock configuration allowed the erase
    pub allowed: bool,
}

/// Register bank and storage of one simulated flash instance
#[derive(Debug)]
pub struct SimFlash {
    instance: FlashInstance,
    row_words_override: Option<u32>,
    erase_pulses_required: u32,
    cells: [Vec<Cell>; 3],
    stuck: HashMap<u32, u32>,
    pulses: HashMap<u32, u32>,
    crc: SharedCrc,

    if_ctrl: IfCtrl,
    isolated: bool,
    cmd_ctrl: u32,
    session: Option<Command>,
    addr: u32,
    data: [u32; 2],
    delay_ctrl: u32,
    erase_delay: u32,
    timing_trim: u32,
    ecc_ctrl: EccCtrl,
    main_staged: u32,
    main_committed: u32,
    nvr_staged: u32,
    nvr_committed: u32,
    copy_cfg: CopyCfg,
    copy_error: bool,
    copy_src: u32,
    copy_dst: *mut u32,
    copy_word_cnt: u32,
    preempt_after: Option<u32>,
    reject_sequential_after: Option<u32>,

    program_log: Vec<ProgramEvent>,
    erase_log: Vec<EraseEvent>,
    compare_log: Vec<bool>,
    nvr_history: Vec<u32>,
    mass_erase_nvr: Vec<u32>,
}

impl SimFlash {
    /// Create an erased instance
    pub fn new(instance: FlashInstance, config: &SimConfig, crc: SharedCrc) -> Self {
        let cells = instance
            .regions()
            .map(|r| vec![Cell::ERASED; r.word_len() as usize]);
        let main_mask = (IfStatus::CODE_W_UNLOCKED | IfStatus::DATA_W_UNLOCKED).bits();
        let (main, nvr) = if config.unlocked {
            (main_mask, NVR_WRITE_ENABLE_MASK)
        } else {
            (0, 0)
        };
        Self {
            instance,
            row_words_override: config.row_words_override,
            erase_pulses_required: config.erase_pulses_required.max(1),
            cells,
            stuck: HashMap::new(),
            pulses: HashMap::new(),
            crc,
            if_ctrl: IfCtrl::empty(),
            isolated: false,
            cmd_ctrl: 0,
            session: None,
            addr: 0,
            data: [0; 2],
            delay_ctrl: 0,
            erase_delay: DEFAULT_ERASE_DELAY,
            timing_trim: 0,
            ecc_ctrl: EccCtrl::empty(),
            main_staged: 0,
            main_committed: main,
            nvr_staged: 0,
            nvr_committed: nvr,
            copy_cfg: CopyCfg::empty(),
            copy_error: false,
            copy_src: 0,
            copy_dst: core::ptr::null_mut(),
            copy_word_cnt: 0,
            preempt_after: None,
            reject_sequential_after: None,
            program_log: Vec::new(),
            erase_log: Vec::new(),
            compare_log: Vec::new(),
            nvr_history: Vec::new(),
            mass_erase_nvr: Vec::new(),
        }
    }

    /// Instance this bank models
    pub fn instance(&self) -> FlashInstance {
        self.instance
    }

    // ------------------------------------------------------------------------
    // Storage access for tests and images
    // ------------------------------------------------------------------------

    fn locate(&self, addr: u32) -> Option<(&'static RegionDescriptor, usize)> {
        self.instance
            .regions()
            .iter()
            .find(|r| r.contains(addr))
            .map(|r| (r, ((addr - r.base) >> 2) as usize))
    }

    fn cell(&self, addr: u32) -> Option<Cell> {
        let (region, index) = self.locate(addr)?;
        Some(self.cells[region.kind().index()][index])
    }

    fn cell_mut(&mut self, addr: u32) -> Option<&mut Cell> {
        let (region, index) = self.locate(addr)?;
        Some(&mut self.cells[region.kind().index()][index])
    }

    /// Stored data word, bypassing the controller
    pub fn peek(&self, addr: u32) -> Option<u32> {
        self.cell(addr).map(|c| c.data)
    }

    /// Stored ECC bits, bypassing the controller
    pub fn peek_ecc(&self, addr: u32) -> Option<u8> {
        self.cell(addr).map(|c| c.ecc)
    }

    /// Overwrite a data word with generated ECC, bypassing the controller
    pub fn poke(&mut self, addr: u32, data: u32) {
        if let Some(cell) = self.cell_mut(addr) {
            *cell = Cell::with_data(data);
        }
    }

    /// Data words of one region
    pub fn region_words(&self, kind: RegionKind) -> impl Iterator<Item = u32> + '_ {
        self.cells[kind.index()].iter().map(|c| c.data)
    }

    /// Replace the data words of one region, regenerating ECC
    pub fn load_region(&mut self, kind: RegionKind, words: impl IntoIterator<Item = u32>) {
        for (cell, data) in self.cells[kind.index()].iter_mut().zip(words) {
            *cell = Cell::with_data(data);
        }
    }

    // ------------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------------

    /// Bits of `mask` at `addr` read as one whatever is programmed
    pub fn inject_stuck_bits(&mut self, addr: u32, mask: u32) {
        *self.stuck.entry(addr).or_insert(0) |= mask;
    }

    /// Assert or release IF_STATUS.ISOLATE
    pub fn set_isolated(&mut self, isolated: bool) {
        self.isolated = isolated;
    }

    /// Stop the next copier transfer after `words` words without setting
    /// the error bit, as an isolation event does
    pub fn inject_copier_preempt(&mut self, words: u32) {
        self.preempt_after = Some(words);
    }

    /// Drop the sequential command issued after `accepted` more sequential
    /// commands: CMD_CTRL and BUSY stay clear and nothing is programmed
    pub fn inject_sequential_reject(&mut self, accepted: u32) {
        self.reject_sequential_after = Some(accepted);
    }

    fn sequential_rejected(&mut self) -> bool {
        match self.reject_sequential_after {
            Some(0) => {
                self.reject_sequential_after = None;
                true
            }
            Some(n) => {
                self.reject_sequential_after = Some(n - 1);
                false
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------------
    // Recorded activity
    // ------------------------------------------------------------------------

    /// Every program command that reached the array, in order
    pub fn program_log(&self) -> &[ProgramEvent] {
        &self.program_log
    }

    /// Every sector erase pulse, in order
    pub fn erase_log(&self) -> &[EraseEvent] {
        &self.erase_log
    }

    /// VREAD1 at the start of every comparator run, in order
    pub fn compare_log(&self) -> &[bool] {
        &self.compare_log
    }

    /// Every NVR_CTRL value committed with the NVR key, in order
    pub fn nvr_history(&self) -> &[u32] {
        &self.nvr_history
    }

    /// Committed NVR_CTRL at each mass erase
    pub fn mass_erase_nvr_states(&self) -> &[u32] {
        &self.mass_erase_nvr
    }

    /// Forget recorded activity
    pub fn clear_logs(&mut self) {
        self.program_log.clear();
        self.erase_log.clear();
        self.compare_log.clear();
        self.nvr_history.clear();
        self.mass_erase_nvr.clear();
    }

    /// Whether a sequential session is open
    pub fn session_open(&self) -> bool {
        self.session.is_some()
    }

    // ------------------------------------------------------------------------
    // Array behaviour
    // ------------------------------------------------------------------------

    fn row_bytes(&self, region: &RegionDescriptor) -> u32 {
        self.row_words_override.unwrap_or(region.attr.row_word_len) << 2
    }

    fn write_enabled(&self, region: &RegionDescriptor, addr: u32) -> bool {
        let attr = region.attr;
        let lock_region = (addr - region.base) / attr.bytes_per_lock_region;
        match attr.kind {
            RegionKind::Code => {
                self.main_committed & (1 << (MAIN_CTRL_CODE_W_EN_POS + lock_region)) != 0
            }
            RegionKind::Data => {
                self.main_committed & (1 << (MAIN_CTRL_DATA_W_EN_POS + lock_region)) != 0
            }
            RegionKind::Nvr => {
                self.nvr_committed & (1 << (attr.nvr_first_lock_bit + lock_region)) != 0
            }
        }
    }

    fn program(&mut self, addr: u32, cmd: Command) {
        let Some((region, _)) = self.locate(addr) else {
            log::warn!("{}: program of unmapped {:#010x}", self.instance, addr);
            return;
        };
        let allowed = self.write_enabled(region, addr);
        self.program_log.push(ProgramEvent { addr, cmd, allowed });
        if !allowed {
            log::warn!("{}: program of locked {:#010x}", self.instance, addr);
            return;
        }
        if matches!(cmd, Command::PreProgramNoSeq | Command::PreProgramSeq) {
            return;
        }

        let data = self.data[0];
        let ecc = if self.ecc_ctrl.contains(EccCtrl::CMD_ECC_DISABLE) {
            (self.data[1] as u8) & ERASED_ECC
        } else {
            ecc6(data)
        };
        let stuck = self.stuck.get(&addr).copied().unwrap_or(0);
        if let Some(cell) = self.cell_mut(addr) {
            cell.data &= data;
            cell.data |= stuck;
            cell.ecc &= ecc;
        }
    }

    /// Program DATA[0] at ADDR and advance ADDR, wrapping inside the row
    fn program_sequential(&mut self, cmd: Command) {
        let addr = self.addr;
        self.program(addr, cmd);
        let row_bytes = self
            .locate(addr)
            .map(|(r, _)| self.row_bytes(r))
            .unwrap_or(4);
        let row_start = addr - addr % row_bytes;
        let next = row_start + (addr + 4 - row_start) % row_bytes;
        self.addr = next & ADDR_REG_MAX_VALUE;
    }

    fn sector_erase(&mut self) {
        let addr = self.addr;
        let level = RetryLevel::from_if_ctrl(self.if_ctrl);
        let Some((region, _)) = self.locate(addr) else {
            log::warn!("{}: erase of unmapped {:#010x}", self.instance, addr);
            return;
        };
        let sector_bytes = region.attr.sector_len << 2;
        let sector = region.base + (addr - region.base) / sector_bytes * sector_bytes;
        let allowed = self.write_enabled(region, sector);
        self.erase_log.push(EraseEvent {
            addr,
            level,
            delay: self.erase_delay,
            allowed,
        });
        if !allowed {
            log::warn!("{}: erase of locked sector {:#010x}", self.instance, sector);
            return;
        }

        let pulses = self.pulses.entry(sector).or_insert(0);
        *pulses += 1;
        if *pulses < self.erase_pulses_required {
            log::trace!("{}: sector {:#010x} pulse {}", self.instance, sector, pulses);
            return;
        }
        self.pulses.remove(&sector);

        let kind = region.kind().index();
        let first = ((sector - region.base) >> 2) as usize;
        let count = region.attr.sector_len as usize;
        self.cells[kind][first..first + count].fill(Cell::ERASED);
    }

    fn mass_erase(&mut self) {
        self.mass_erase_nvr.push(self.nvr_committed);
        for region in self.instance.regions() {
            let attr = region.attr;
            for lock_region in 0..attr.total_lock_regions {
                let start = region.base + lock_region * attr.bytes_per_lock_region;
                if !self.write_enabled(region, start) {
                    continue;
                }
                let first = ((lock_region * attr.bytes_per_lock_region) >> 2) as usize;
                let count = (attr.bytes_per_lock_region >> 2) as usize;
                self.cells[region.kind().index()][first..first + count].fill(Cell::ERASED);
            }
        }
    }

    fn execute(&mut self, cmd: Command) {
        log::trace!("{}: {:?} at {:#010x}", self.instance, cmd, self.addr);
        match cmd {
            Command::Read => match self.cell(self.addr) {
                Some(cell) => {
                    self.data = [cell.data, cell.ecc as u32];
                }
                None => self.data = [ERASED_DATA, ERASED_ECC as u32],
            },
            Command::ProgramNoSeq | Command::PreProgramNoSeq => self.program(self.addr, cmd),
            Command::ProgramSeq | Command::PreProgramSeq => {
                self.program_sequential(cmd);
                self.session = Some(cmd);
            }
            Command::SectorErase => self.sector_erase(),
            Command::MassErase => self.mass_erase(),
            Command::SetVread1 => self.if_ctrl.insert(IfCtrl::VREAD1),
            Command::UnsetVread1 => self.if_ctrl.remove(IfCtrl::VREAD1),
            Command::SetRecall => self.if_ctrl.insert(IfCtrl::RECALL),
            Command::UnsetRecall => self.if_ctrl.remove(IfCtrl::RECALL),
        }
    }

    // ------------------------------------------------------------------------
    // Copier
    // ------------------------------------------------------------------------

    fn copier_start(&mut self) {
        let src = self.copy_src;
        let total = self.copy_word_cnt;
        let limit = self.preempt_after.take().map_or(total, |n| n.min(total));
        self.copy_error = false;
        if self.copy_cfg.contains(CopyCfg::COMPARATOR) {
            self.compare_log.push(self.if_ctrl.contains(IfCtrl::VREAD1));
        }

        let mut done = 0;
        while done < limit {
            let addr = src.wrapping_add(done << 2);
            let Some(cell) = self.cell(addr) else {
                self.copy_error = true;
                break;
            };
            if self.copy_cfg.contains(CopyCfg::COMPARATOR) {
                let expected = Cell {
                    data: self.data[0],
                    ecc: (self.data[1] as u8) & ERASED_ECC,
                };
                if cell != expected {
                    log::trace!("{}: compare mismatch at {:#010x}", self.instance, addr);
                    self.copy_error = true;
                    break;
                }
            } else if self.copy_cfg.contains(CopyCfg::TO_CRC) {
                self.crc.borrow_mut().add_32(cell.data);
            } else {
                // SAFETY: the driver keeps the destination valid for
                // COPY_WORD_CNT words until the copier is idle
                unsafe { self.copy_dst.add(done as usize).write(cell.data) };
            }
            done += 1;
        }

        self.copy_src = src.wrapping_add(done << 2) & COPY_SRC_ADDR_REG_MAX_VALUE;
    }
}

impl FlashRegisters for SimFlash {
    fn if_ctrl(&self) -> IfCtrl {
        self.if_ctrl
    }

    fn set_if_ctrl(&mut self, value: IfCtrl) {
        // A single write changes at most one read mode field
        let mut next = (self.if_ctrl & !IfCtrl::RETRY) | (value & IfCtrl::RETRY);
        for field in [IfCtrl::VREAD1, IfCtrl::RECALL, IfCtrl::LP_MODE] {
            if next.contains(field) != value.contains(field) {
                next.set(field, value.contains(field));
                break;
            }
        }
        self.if_ctrl = next;
    }

    fn if_status(&self) -> IfStatus {
        let mut status = IfStatus::from_bits_retain(
            self.main_committed
                | ((self.nvr_committed & NVR_WRITE_ENABLE_MASK) << IF_STATUS_NVR0_W_UNLOCK_POS),
        );
        status.set(IfStatus::BUSY, self.session.is_some());
        status.set(IfStatus::PROG_SEQ_DATA_REQ, self.session.is_some());
        status.set(IfStatus::ISOLATE, self.isolated);
        status
    }

    fn cmd_ctrl(&self) -> u32 {
        self.cmd_ctrl
    }

    fn set_cmd_ctrl(&mut self, value: u32) {
        if value & CMD_CTRL_CMD_END != 0 {
            self.session = None;
            self.cmd_ctrl = 0;
            return;
        }
        match Command::from_bits(value) {
            Some(cmd) if cmd.is_sequential() && self.sequential_rejected() => {
                self.cmd_ctrl = 0;
                log::trace!("{}: {:?} dropped", self.instance, cmd);
            }
            Some(cmd) => {
                self.cmd_ctrl = cmd.bits();
                self.execute(cmd);
            }
            None => log::warn!("{}: unknown command {:#x}", self.instance, value),
        }
    }

    fn addr(&self) -> u32 {
        self.addr
    }

    fn set_addr(&mut self, addr: u32) {
        self.addr = addr & ADDR_REG_MAX_VALUE;
    }

    fn data(&self, index: usize) -> u32 {
        self.data[index & 1]
    }

    fn set_data(&mut self, index: usize, value: u32) {
        self.data[index & 1] = value;
        if index & 1 == 0 {
            if let Some(cmd) = self.session {
                self.program_sequential(cmd);
            }
        }
    }

    fn delay_ctrl(&self) -> u32 {
        self.delay_ctrl
    }

    fn set_delay_ctrl(&mut self, value: u32) {
        self.delay_ctrl = value;
    }

    fn erase_delay(&self) -> u32 {
        self.erase_delay
    }

    fn set_erase_delay(&mut self, value: u32) {
        self.erase_delay = value;
    }

    fn timing_trim(&self) -> u32 {
        self.timing_trim
    }

    fn set_timing_trim(&mut self, value: u32) {
        self.timing_trim = value;
    }

    fn ecc_ctrl(&self) -> EccCtrl {
        self.ecc_ctrl
    }

    fn set_ecc_ctrl(&mut self, value: EccCtrl) {
        self.ecc_ctrl = value;
    }

    fn set_main_ctrl(&mut self, value: u32) {
        self.main_staged = value;
    }

    fn set_main_write_unlock(&mut self, key: u32) {
        if key == MAIN_KEY {
            self.main_committed =
                self.main_staged & (IfStatus::CODE_W_UNLOCKED | IfStatus::DATA_W_UNLOCKED).bits();
        } else {
            log::warn!("{}: wrong MAIN key {:#010x}", self.instance, key);
        }
    }

    fn set_nvr_ctrl(&mut self, value: u32) {
        self.nvr_staged = value;
    }

    fn set_nvr_write_unlock(&mut self, key: u32) {
        if key == NVR_KEY {
            self.nvr_committed = self.nvr_staged & NVR_WRITE_ENABLE_MASK;
            self.nvr_history.push(self.nvr_committed);
        } else {
            log::warn!("{}: wrong NVR key {:#010x}", self.instance, key);
        }
    }

    fn copy_ctrl(&self) -> CopyCtrl {
        if self.copy_error {
            CopyCtrl::ERROR
        } else {
            CopyCtrl::empty()
        }
    }

    fn set_copy_ctrl(&mut self, value: CopyCtrl) {
        if value.contains(CopyCtrl::START) {
            self.copier_start();
        }
    }

    fn set_copy_cfg(&mut self, value: CopyCfg) {
        self.copy_cfg = value;
    }

    fn copy_src(&self) -> u32 {
        self.copy_src
    }

    fn set_copy_src(&mut self, addr: u32) {
        self.copy_src = addr & COPY_SRC_ADDR_REG_MAX_VALUE;
    }

    fn set_copy_word_cnt(&mut self, count: u32) {
        self.copy_word_cnt = count;
    }

    unsafe fn set_copy_dst(&mut self, dst: *mut u32) {
        self.copy_dst = dst;
    }

    fn cbus_read(&self, addr: u32) -> u32 {
        self.cell(addr).map_or(ERASED_DATA, |c| c.data)
    }
}
