//! Read, read-double and blank-check commands

use std::fs::File;
use std::io::Write;
use std::path::Path;

use montana_flash_core::Error;
use montana_flash_sim::image;

use super::Session;

/// Words printed per line of a dump
const DUMP_WORDS_PER_LINE: usize = 4;

/// Read `words` words at `addr` into a file or dump them to stdout
pub fn run_read(
    session: &mut Session,
    addr: u32,
    words: u32,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    // No range longer than the whole address map can be read
    if words as usize > image::image_size() / 4 {
        return Err(Error::BadLength.into());
    }
    let mut data = vec![0u32; words as usize];
    session.ctrl.read_buffer(addr, &mut data)?;

    match output {
        Some(path) => {
            let bytes: Vec<u8> = data.iter().flat_map(|w| w.to_le_bytes()).collect();
            let mut file = File::create(path)?;
            file.write_all(&bytes)?;
            println!("Wrote {} bytes to {:?}", bytes.len(), path);
        }
        None => {
            for (i, line) in data.chunks(DUMP_WORDS_PER_LINE).enumerate() {
                let line_addr = addr.wrapping_add((i * DUMP_WORDS_PER_LINE * 4) as u32);
                let hex: Vec<String> = line.iter().map(|w| format!("{:08X}", w)).collect();
                println!("0x{:08X}: {}", line_addr, hex.join(" "));
            }
        }
    }
    Ok(())
}

/// Print the raw 38-bit cell at `addr`
pub fn run_read_double(session: &mut Session, addr: u32) -> Result<(), Box<dyn std::error::Error>> {
    let [data, ecc] = session.ctrl.read_double(addr)?;
    println!("0x{:08X}: data 0x{:08X} ecc 0x{:02X}", addr, data, ecc);
    Ok(())
}

/// Check that `words` words at `addr` are erased
pub fn run_blank_check(
    session: &mut Session,
    addr: u32,
    words: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    session.ctrl.blank_check(addr, words)?;
    println!("0x{:08X}: {} words blank", addr, words);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use montana_flash_core::region::{FlashInstance, RegionKind};

    #[test]
    fn test_read_rejects_oversized_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::open(&dir.path().join("chip.bin"), 48_000_000).unwrap();
        let code0 = FlashInstance::Flash0.region(RegionKind::Code);

        let err = run_read(&mut session, code0.base, u32::MAX, None).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::BadLength));

        let output = dir.path().join("dump.bin");
        run_read(&mut session, code0.base, 8, Some(&output)).unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), vec![0xFF; 32]);
    }
}
