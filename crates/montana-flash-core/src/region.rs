//! Region model
//!
//! Each flash instance exposes three regions: Code, Data and NVR. A region
//! kind fixes the row and sector geometry, the lock-region layout and the
//! way its lock configuration is read and written.

use crate::regs::defs::{
    CODE_WRITE_ENABLE_MASK, DATA_WRITE_ENABLE_MASK, IF_STATUS_CODE_W_UNLOCK_POS,
    IF_STATUS_DATA_W_UNLOCK_POS, IF_STATUS_NVR0_W_UNLOCK_POS, IF_STATUS_NVR4_W_UNLOCK_POS,
    MAIN_CTRL_CODE_W_EN_POS, MAIN_CTRL_DATA_W_EN_POS, MAIN_KEY, NVR_CTRL_NVR0_W_EN_POS,
    NVR_CTRL_NVR4_W_EN_POS, NVR_KEY, NVR_WRITE_ENABLE_MASK,
};
use crate::regs::{FlashRegisters, IfStatus};

/// Number of flash instances
pub const FLASH_INSTANCE_NUM: usize = 2;
/// Number of regions per instance
pub const REGIONS_PER_INSTANCE: usize = 3;

/// Code row length in words
pub const CODE_ROW_LEN_WORDS: u32 = 0x80;
/// Code sector length in words
pub const CODE_SECTOR_LEN_WORDS: u32 = 0x200;
/// Bytes covered by one code lock region
pub const CODE_UNLOCK_REGION_LEN_BYTES: u32 = 0x16000;
/// Number of code lock regions
pub const CODE_UNLOCK_REGION_NUM: u32 = 4;

/// Data row length in words
pub const DATA_ROW_LEN_WORDS: u32 = 0x20;
/// Data sector length in words
pub const DATA_SECTOR_LEN_WORDS: u32 = 0x40;
/// Bytes covered by one data lock region
pub const DATA_UNLOCK_REGION_LEN_BYTES: u32 = 0x5000;
/// Number of data lock regions
pub const DATA_UNLOCK_REGION_NUM: u32 = 8;

/// NVR row length in words
pub const NVR_ROW_LEN_WORDS: u32 = DATA_ROW_LEN_WORDS;
/// NVR sector length in words
pub const NVR_SECTOR_LEN_WORDS: u32 = DATA_SECTOR_LEN_WORDS;
/// Bytes covered by one NVR lock region
pub const NVR_UNLOCK_REGION_LEN_BYTES: u32 = 0x100;
/// NVR lock regions usable on FLASH0 (NVR4..NVR7)
pub const NVR_UNLOCK_FLASH0_REGION_NUM: u32 = 4;
/// NVR lock regions on FLASH1 (NVR0..NVR7)
pub const NVR_UNLOCK_FLASH_REGION_NUM: u32 = 8;

// ============================================================================
// Address map
// ============================================================================

/// FLASH0 code base
pub const FLASH0_CODE_BASE: u32 = 0x0010_0000;
/// FLASH0 code top (inclusive)
pub const FLASH0_CODE_TOP: u32 = 0x0015_7FFF;
/// FLASH0 data base
pub const FLASH0_DATA_BASE: u32 = 0x001B_0000;
/// FLASH0 data top (inclusive)
pub const FLASH0_DATA_TOP: u32 = 0x001D_7FFF;
/// FLASH0 NVR4 base (NVR0..NVR3 are reserved)
pub const FLASH0_NVR4_BASE: u32 = 0x0008_0400;
/// FLASH0 NVR7 top (inclusive)
pub const FLASH0_NVR7_TOP: u32 = 0x0008_07FF;

/// FLASH1 code base
pub const FLASH1_CODE_BASE: u32 = 0x0015_8000;
/// FLASH1 code top (inclusive)
pub const FLASH1_CODE_TOP: u32 = 0x001A_FFFF;
/// FLASH1 data base
pub const FLASH1_DATA_BASE: u32 = 0x001D_8000;
/// FLASH1 data top (inclusive)
pub const FLASH1_DATA_TOP: u32 = 0x001F_FFFF;
/// FLASH1 NVR0 base
pub const FLASH1_NVR0_BASE: u32 = 0x0008_1000;
/// FLASH1 NVR7 top (inclusive)
pub const FLASH1_NVR7_TOP: u32 = 0x0008_17FF;

/// One of the two flash instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlashInstance {
    /// First instance (FLASH0)
    Flash0,
    /// Second instance (FLASH1)
    Flash1,
}

impl FlashInstance {
    /// Both instances in resolution order
    pub const ALL: [FlashInstance; FLASH_INSTANCE_NUM] =
        [FlashInstance::Flash0, FlashInstance::Flash1];

    /// Instance number (0 or 1)
    pub const fn index(self) -> usize {
        match self {
            Self::Flash0 => 0,
            Self::Flash1 => 1,
        }
    }

    /// Instance from its number
    pub fn from_index(num: usize) -> Option<Self> {
        Self::ALL.get(num).copied()
    }

    /// Regions of this instance, ordered Code, Data, NVR
    pub fn regions(self) -> &'static [RegionDescriptor; REGIONS_PER_INSTANCE] {
        &INTERFACES[self.index()]
    }

    /// Region of a given kind on this instance
    pub fn region(self, kind: RegionKind) -> &'static RegionDescriptor {
        &self.regions()[kind.index()]
    }
}

impl core::fmt::Display for FlashInstance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "FLASH{}", self.index())
    }
}

/// Region kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// Program memory
    Code,
    /// Data memory
    Data,
    /// Non-volatile information rows (excluded from mass erase)
    Nvr,
}

impl RegionKind {
    /// Position in an instance's region table
    pub const fn index(self) -> usize {
        match self {
            Self::Code => 0,
            Self::Data => 1,
            Self::Nvr => 2,
        }
    }

    /// Short name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Data => "data",
            Self::Nvr => "nvr",
        }
    }
}

impl core::fmt::Display for RegionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.pad(self.name())
    }
}

/// Geometry and lock layout shared by every region of a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionAttributes {
    /// Region kind, selects the lock registers
    pub kind: RegionKind,
    /// Words per row
    pub row_word_len: u32,
    /// Words per sector
    pub sector_len: u32,
    /// Bytes covered by one lock region
    pub bytes_per_lock_region: u32,
    /// Number of lock regions
    pub total_lock_regions: u32,
    /// First lock bit in NVR_CTRL (NVR kinds only)
    pub nvr_first_lock_bit: u32,
}

impl RegionAttributes {
    /// Mask with one bit per lock region
    pub const fn all_regions_mask(&self) -> u32 {
        (1u32 << self.total_lock_regions) - 1
    }

    /// Current lock configuration: bit `i` set means lock region `i` is
    /// write-enabled
    pub fn read_lock<F: FlashRegisters + ?Sized>(&self, flash: &F) -> u32 {
        let status = flash.if_status();
        match self.kind {
            RegionKind::Code => {
                (status & IfStatus::CODE_W_UNLOCKED).bits() >> IF_STATUS_CODE_W_UNLOCK_POS
            }
            RegionKind::Data => {
                (status & IfStatus::DATA_W_UNLOCKED).bits() >> IF_STATUS_DATA_W_UNLOCK_POS
            }
            RegionKind::Nvr => {
                let pos = if self.nvr_first_lock_bit == NVR_CTRL_NVR4_W_EN_POS {
                    IF_STATUS_NVR4_W_UNLOCK_POS
                } else {
                    IF_STATUS_NVR0_W_UNLOCK_POS
                };
                (status & IfStatus::NVR_W_UNLOCKED).bits() >> pos
            }
        }
    }

    /// Apply a lock configuration and commit it with the unlock key
    pub fn write_lock<F: FlashRegisters + ?Sized>(&self, flash: &mut F, regions: u32) {
        match self.kind {
            RegionKind::Code => {
                let current = main_unlock_status(flash);
                let value = (current & !CODE_WRITE_ENABLE_MASK)
                    | ((regions << MAIN_CTRL_CODE_W_EN_POS) & CODE_WRITE_ENABLE_MASK);
                write_main_access(flash, value);
            }
            RegionKind::Data => {
                let current = main_unlock_status(flash);
                let value = (current & !DATA_WRITE_ENABLE_MASK)
                    | ((regions << MAIN_CTRL_DATA_W_EN_POS) & DATA_WRITE_ENABLE_MASK);
                write_main_access(flash, value);
            }
            RegionKind::Nvr => {
                let value = (regions << self.nvr_first_lock_bit) & NVR_WRITE_ENABLE_MASK;
                log::trace!("NVR_CTRL <- {:#010x}", value);
                flash.set_nvr_ctrl(value);
                flash.set_nvr_write_unlock(NVR_KEY);
            }
        }
    }
}

/// Code and data unlock bits, aligned with the MAIN_CTRL layout
fn main_unlock_status<F: FlashRegisters + ?Sized>(flash: &F) -> u32 {
    (flash.if_status() & (IfStatus::CODE_W_UNLOCKED | IfStatus::DATA_W_UNLOCKED)).bits()
}

fn write_main_access<F: FlashRegisters + ?Sized>(flash: &mut F, value: u32) {
    log::trace!("MAIN_CTRL <- {:#010x}", value);
    flash.set_main_ctrl(value);
    flash.set_main_write_unlock(MAIN_KEY);
}

/// Code region attributes
pub const CODE_ATTRIBUTES: RegionAttributes = RegionAttributes {
    kind: RegionKind::Code,
    row_word_len: CODE_ROW_LEN_WORDS,
    sector_len: CODE_SECTOR_LEN_WORDS,
    bytes_per_lock_region: CODE_UNLOCK_REGION_LEN_BYTES,
    total_lock_regions: CODE_UNLOCK_REGION_NUM,
    nvr_first_lock_bit: 0,
};

/// Data region attributes
pub const DATA_ATTRIBUTES: RegionAttributes = RegionAttributes {
    kind: RegionKind::Data,
    row_word_len: DATA_ROW_LEN_WORDS,
    sector_len: DATA_SECTOR_LEN_WORDS,
    bytes_per_lock_region: DATA_UNLOCK_REGION_LEN_BYTES,
    total_lock_regions: DATA_UNLOCK_REGION_NUM,
    nvr_first_lock_bit: 0,
};

/// FLASH0 NVR attributes (NVR4..NVR7)
pub const NVR_ATTRIBUTES_FLASH0: RegionAttributes = RegionAttributes {
    kind: RegionKind::Nvr,
    row_word_len: NVR_ROW_LEN_WORDS,
    sector_len: NVR_SECTOR_LEN_WORDS,
    bytes_per_lock_region: NVR_UNLOCK_REGION_LEN_BYTES,
    total_lock_regions: NVR_UNLOCK_FLASH0_REGION_NUM,
    nvr_first_lock_bit: NVR_CTRL_NVR4_W_EN_POS,
};

/// FLASH1 NVR attributes (NVR0..NVR7)
pub const NVR_ATTRIBUTES_FLASH1: RegionAttributes = RegionAttributes {
    kind: RegionKind::Nvr,
    row_word_len: NVR_ROW_LEN_WORDS,
    sector_len: NVR_SECTOR_LEN_WORDS,
    bytes_per_lock_region: NVR_UNLOCK_REGION_LEN_BYTES,
    total_lock_regions: NVR_UNLOCK_FLASH_REGION_NUM,
    nvr_first_lock_bit: NVR_CTRL_NVR0_W_EN_POS,
};

/// One concrete region on one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionDescriptor {
    /// Owning instance
    pub instance: FlashInstance,
    /// First byte address
    pub base: u32,
    /// Last byte address (inclusive)
    pub top: u32,
    /// Geometry and lock layout
    pub attr: &'static RegionAttributes,
}

impl RegionDescriptor {
    /// Region kind
    pub fn kind(&self) -> RegionKind {
        self.attr.kind
    }

    /// Region size in bytes
    pub fn size(&self) -> u32 {
        self.top - self.base + 1
    }

    /// Region size in words
    pub fn word_len(&self) -> u32 {
        self.size() / 4
    }

    /// Whether `addr` lies inside the region
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr <= self.top
    }
}

const fn region(
    instance: FlashInstance,
    base: u32,
    top: u32,
    attr: &'static RegionAttributes,
) -> RegionDescriptor {
    RegionDescriptor {
        instance,
        base,
        top,
        attr,
    }
}

/// Region tables of both instances, each ordered Code, Data, NVR
pub static INTERFACES: [[RegionDescriptor; REGIONS_PER_INSTANCE]; FLASH_INSTANCE_NUM] = [
    [
        region(FlashInstance::Flash0, FLASH0_CODE_BASE, FLASH0_CODE_TOP, &CODE_ATTRIBUTES),
        region(FlashInstance::Flash0, FLASH0_DATA_BASE, FLASH0_DATA_TOP, &DATA_ATTRIBUTES),
        region(FlashInstance::Flash0, FLASH0_NVR4_BASE, FLASH0_NVR7_TOP, &NVR_ATTRIBUTES_FLASH0),
    ],
    [
        region(FlashInstance::Flash1, FLASH1_CODE_BASE, FLASH1_CODE_TOP, &CODE_ATTRIBUTES),
        region(FlashInstance::Flash1, FLASH1_DATA_BASE, FLASH1_DATA_TOP, &DATA_ATTRIBUTES),
        region(FlashInstance::Flash1, FLASH1_NVR0_BASE, FLASH1_NVR7_TOP, &NVR_ATTRIBUTES_FLASH1),
    ],
];

/// Iterate every region of both instances in resolution order
pub fn all_regions() -> impl Iterator<Item = &'static RegionDescriptor> {
    INTERFACES.iter().flat_map(|regions| regions.iter())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regions_are_disjoint() {
        let regions: [&RegionDescriptor; 6] = {
            let mut it = all_regions();
            core::array::from_fn(|_| it.next().unwrap())
        };
        for (i, a) in regions.iter().enumerate() {
            assert!(a.base <= a.top);
            assert_eq!(a.base % 4, 0);
            assert_eq!((a.top + 1) % 4, 0);
            for b in regions.iter().skip(i + 1) {
                assert!(a.top < b.base || b.top < a.base, "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_lock_geometry_covers_regions() {
        for r in all_regions() {
            let lockable = r.attr.bytes_per_lock_region * r.attr.total_lock_regions;
            assert_eq!(lockable, r.size(), "{} {}", r.instance, r.kind());
            assert_eq!(r.size() % (r.attr.sector_len * 4), 0);
        }
    }

    #[test]
    fn test_sizes() {
        assert_eq!(FlashInstance::Flash0.region(RegionKind::Code).size(), 0x58000);
        assert_eq!(FlashInstance::Flash1.region(RegionKind::Data).size(), 0x28000);
        assert_eq!(FlashInstance::Flash0.region(RegionKind::Nvr).size(), 0x400);
        assert_eq!(FlashInstance::Flash1.region(RegionKind::Nvr).size(), 0x800);
        // FLASH1 code directly follows FLASH0 code
        assert_eq!(FLASH0_CODE_TOP + 1, FLASH1_CODE_BASE);
    }

    #[test]
    fn test_all_regions_mask() {
        assert_eq!(CODE_ATTRIBUTES.all_regions_mask(), 0xF);
        assert_eq!(DATA_ATTRIBUTES.all_regions_mask(), 0xFF);
        assert_eq!(NVR_ATTRIBUTES_FLASH0.all_regions_mask(), 0xF);
        assert_eq!(NVR_ATTRIBUTES_FLASH1.all_regions_mask(), 0xFF);
    }

    #[test]
    fn test_instance_index() {
        assert_eq!(FlashInstance::from_index(0), Some(FlashInstance::Flash0));
        assert_eq!(FlashInstance::from_index(1), Some(FlashInstance::Flash1));
        assert_eq!(FlashInstance::from_index(2), None);
    }
}
