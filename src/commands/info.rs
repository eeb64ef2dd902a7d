//! Info and lock-mask commands

use montana_flash_core::regs::FlashRegisters;
use montana_flash_core::{lock, resolve, FlashInstance, VERSION};

use super::Session;

/// Print the region map of both instances and their lock configuration
pub fn run_info(session: &Session) {
    println!("Montana Flash Information");
    println!("=========================");
    println!();
    println!(
        "Driver version:  {}.{}.{}",
        VERSION >> 12,
        (VERSION >> 8) & 0xF,
        VERSION & 0xFF
    );

    for instance in FlashInstance::ALL {
        let bank = session.ctrl.bank(instance);
        println!();
        println!("{} (IF_STATUS {:#010x}):", instance, bank.if_status().bits());
        for region in instance.regions() {
            let attr = region.attr;
            println!(
                "  {:4} 0x{:08X} - 0x{:08X} ({} KiB), row {} words, sector {} words",
                region.kind(),
                region.base,
                region.top,
                region.size() / 1024,
                attr.row_word_len,
                attr.sector_len
            );
            println!(
                "       {} lock regions of {} bytes, write-enabled mask {:#04x}",
                attr.total_lock_regions,
                attr.bytes_per_lock_region,
                attr.read_lock(bank)
            );
        }
    }
}

/// Print the lock regions a write of `words` words at `addr` would enable
pub fn run_lock_mask(addr: u32, words: u32) -> Result<(), Box<dyn std::error::Error>> {
    let info = resolve::resolve(addr)?;
    let mask = lock::calculate(info.region, addr, words)?;
    println!(
        "{} {}: lock mask 0x{:02X} ({} of {} regions)",
        info.instance,
        info.region.kind(),
        mask,
        mask.count_ones(),
        info.region.attr.total_lock_regions
    );
    Ok(())
}
