//! Erase command implementations

use montana_flash_core::{resolve, Error};

use super::{create_progress_bar_with_phase, Session};

/// Erase `count` consecutive sectors starting with the one holding `addr`
pub fn run_erase_sectors(
    session: &mut Session,
    addr: u32,
    count: u32,
    endurance: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if count == 0 {
        return Err(Error::ZeroLen.into());
    }

    let pb = create_progress_bar_with_phase(count as u64, "Erasing sectors")?;
    let mut sector = sector_start(addr)?;
    let mut result = Ok(());
    for _ in 0..count {
        if let Err(e) = session.ctrl.erase_sector(sector, endurance) {
            log::warn!("Erase of sector at 0x{:08X} failed: {}", sector, e);
            result = Err(e);
            break;
        }
        pb.inc(1);
        match next_sector(sector) {
            Ok(next) => sector = next,
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }

    if result.is_ok() {
        pb.finish_with_message("Erase complete");
        println!("Erased {} sector(s) from 0x{:08X}", count, addr);
    } else {
        pb.abandon();
    }
    session.save()?;
    result?;
    Ok(())
}

/// Start of the sector holding `addr`
pub(super) fn sector_start(addr: u32) -> Result<u32, Error> {
    let region = resolve::resolve(addr)?.region;
    let sector_bytes = region.attr.sector_len << 2;
    Ok(region.base + (addr - region.base) / sector_bytes * sector_bytes)
}

/// Start of the sector after the one holding `addr`
fn next_sector(addr: u32) -> Result<u32, Error> {
    let region = resolve::resolve(addr)?.region;
    Ok(sector_start(addr)? + (region.attr.sector_len << 2))
}

/// Mass erase one instance
pub fn run_erase_bank(session: &mut Session, bank: usize) -> Result<(), Box<dyn std::error::Error>> {
    session.ctrl.erase_flash_bank(bank)?;
    println!("Erased code and data of FLASH{}", bank);
    session.save()
}

/// Mass erase both instances
pub fn run_erase_chip(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    session.ctrl.erase_chip()?;
    println!("Erased code and data of both instances");
    session.save()
}
