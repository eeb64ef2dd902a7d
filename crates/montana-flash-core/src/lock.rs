//! Lock-region calculation
//!
//! A region is split into `total_lock_regions` equal lock regions, each with
//! its own write-enable bit. Before writing or erasing, the driver enables
//! exactly the lock regions the operation touches.

use crate::error::{Error, Result};
use crate::region::RegionDescriptor;

/// Bitmask of the lock regions of `region` overlapped by
/// `[addr, addr + word_length * 4)`
///
/// `addr` must lie inside `region`. Fails with [`Error::ZeroLen`] for an
/// empty range and [`Error::BadLength`] when the range ends past the
/// lockable part of the region.
///
/// Lock regions are walked in increasing order. Every region from the one
/// holding the first word to the one holding the last word is enabled,
/// including the word right after each boundary.
pub fn calculate(region: &RegionDescriptor, addr: u32, word_length: u32) -> Result<u32> {
    if word_length == 0 {
        return Err(Error::ZeroLen);
    }

    let attr = region.attr;
    let start = addr.wrapping_sub(region.base);
    let lockable = attr.total_lock_regions * attr.bytes_per_lock_region;
    let end = (word_length as u64 * 4)
        .checked_add(start as u64)
        .map(|e| e - 1)
        .filter(|&e| e <= lockable as u64)
        .ok_or(Error::BadLength)? as u32;

    let mut mask = 0u32;
    for i in 1..=attr.total_lock_regions {
        let boundary = attr.bytes_per_lock_region * i;
        if start < boundary {
            mask |= 1 << (i - 1);
            if end < boundary {
                break;
            }
        }
    }

    log::trace!(
        "lock mask for {:#010x}+{} words in {} {}: {:#x}",
        addr,
        word_length,
        region.instance,
        region.kind(),
        mask
    );
    Ok(mask)
}
