//! Address resolution
//!
//! Maps a flash address to the instance and region that own it.

use crate::error::{Error, Result};
use crate::region::{FlashInstance, RegionDescriptor, INTERFACES};

/// Owner of a resolved address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrInfo {
    /// Instance that owns the address
    pub instance: FlashInstance,
    /// Region that contains the address
    pub region: &'static RegionDescriptor,
}

/// Fail unless `addr` is aligned to a 32-bit word
pub fn check_word_aligned(addr: u32) -> Result<()> {
    if addr & 0x3 != 0 {
        return Err(Error::AddressWordAlign);
    }
    Ok(())
}

/// Resolve `addr` to its instance and region
///
/// Instances are scanned in order, then regions within an instance; the
/// first region whose `[base, top]` contains the address wins. Overlapping
/// regions are not detected.
pub fn resolve(addr: u32) -> Result<AddrInfo> {
    check_word_aligned(addr)?;

    for regions in INTERFACES.iter() {
        if let Some(region) = regions.iter().find(|r| r.contains(addr)) {
            return Ok(AddrInfo {
                instance: region.instance,
                region,
            });
        }
    }

    Err(Error::BadAddress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{
        all_regions, RegionKind, FLASH0_CODE_TOP, FLASH1_DATA_TOP, FLASH1_NVR7_TOP,
    };

    #[test]
    fn test_misaligned_rejected_before_lookup() {
        assert_eq!(resolve(0x0010_0001), Err(Error::AddressWordAlign));
        // Not in any region, but alignment is checked first
        assert_eq!(resolve(0x0000_0002), Err(Error::AddressWordAlign));
    }

    #[test]
    fn test_resolution_totality() {
        for r in all_regions() {
            // Sample the whole region with a coarse stride plus the edges
            let step = (r.size() / 64).max(4) & !3;
            let mut addr = r.base;
            while addr <= r.top - 3 {
                let info = resolve(addr).unwrap();
                assert_eq!(info.region, r);
                assert_eq!(info.instance, r.instance);
                addr += step;
            }
            assert_eq!(resolve(r.top - 3).unwrap().region, r);
        }
    }

    #[test]
    fn test_top_plus_one() {
        for r in all_regions() {
            let next = r.top + 1;
            match all_regions().find(|other| other.base == next) {
                Some(adjacent) => assert_eq!(resolve(next).unwrap().region, adjacent),
                None => assert_eq!(resolve(next), Err(Error::BadAddress)),
            }
        }
        // Code and data of both instances form contiguous address ranges
        let info = resolve(FLASH0_CODE_TOP + 1).unwrap();
        assert_eq!(info.instance, FlashInstance::Flash1);
        assert_eq!(info.region.kind(), RegionKind::Code);
        assert_eq!(resolve(FLASH1_DATA_TOP + 1), Err(Error::BadAddress));
        assert_eq!(resolve(FLASH1_NVR7_TOP + 1), Err(Error::BadAddress));
    }

    #[test]
    fn test_unmapped() {
        assert_eq!(resolve(0x0000_0000), Err(Error::BadAddress));
        // FLASH0 NVR0..NVR3 are not exposed
        assert_eq!(resolve(0x0008_0000), Err(Error::BadAddress));
        assert_eq!(resolve(0x0008_03FC), Err(Error::BadAddress));
        assert_eq!(resolve(0x0020_0000), Err(Error::BadAddress));
    }
}
