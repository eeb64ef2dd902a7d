//! Write, write-word and write-double commands

use montana_flash_core::{resolve, Error};
use std::path::Path;

use super::erase::sector_start;
use super::{create_progress_bar_with_phase, Session};

/// Part of a write that lies inside one sector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece {
    addr: u32,
    offset: usize,
    len: usize,
}

/// Pack file bytes into little-endian words, padding the tail with 0xFF
fn bytes_to_words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks(4)
        .map(|chunk| {
            let mut word = [0xFF; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_le_bytes(word)
        })
        .collect()
}

/// Split `len` words from `addr` at every sector boundary
fn sector_pieces(addr: u32, len: usize) -> Result<Vec<Piece>, Error> {
    let mut pieces = Vec::new();
    let mut offset = 0usize;
    while offset < len {
        let start = addr.wrapping_add((offset as u32) << 2);
        let info = resolve::resolve(start)?;
        let region = info.region;
        let sector_bytes = region.attr.sector_len << 2;
        let sector_end = region.base + ((start - region.base) / sector_bytes + 1) * sector_bytes;
        let chunk = (((sector_end - start) >> 2) as usize).min(len - offset);
        pieces.push(Piece {
            addr: start,
            offset,
            len: chunk,
        });
        offset += chunk;
    }
    Ok(pieces)
}

/// Write the contents of `input` starting at `addr`
///
/// The image is saved even when a sector fails, so it reflects what was
/// actually programmed.
pub fn run_write(
    session: &mut Session,
    addr: u32,
    input: &Path,
    erase: bool,
    endurance: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(input)?;
    println!("Read {} bytes from {:?}", bytes.len(), input);
    let words = bytes_to_words(&bytes);
    if words.is_empty() {
        return Err(Error::ZeroLen.into());
    }
    let pieces = sector_pieces(addr, words.len())?;
    log::info!(
        "Writing {} words at 0x{:08X} ({} sectors)",
        words.len(),
        addr,
        pieces.len()
    );

    let phase = if erase { "Erasing + writing" } else { "Writing" };
    let pb = create_progress_bar_with_phase(words.len() as u64, phase)?;
    let mut result = Ok(());
    for piece in &pieces {
        if let Err(e) = write_piece(session, piece, &words, erase, endurance) {
            log::warn!("Sector at 0x{:08X} failed: {}", piece.addr, e);
            result = Err(e);
            break;
        }
        pb.inc(piece.len as u64);
    }

    if result.is_ok() {
        pb.finish_with_message("Write complete");
        println!("Wrote {} words at 0x{:08X}", words.len(), addr);
    } else {
        pb.abandon();
    }
    session.save()?;
    result?;
    Ok(())
}

fn write_piece(
    session: &mut Session,
    piece: &Piece,
    words: &[u32],
    erase: bool,
    endurance: bool,
) -> Result<(), Error> {
    if erase {
        session.ctrl.erase_sector(sector_start(piece.addr)?, endurance)?;
    }
    session
        .ctrl
        .write_buffer(piece.addr, &words[piece.offset..piece.offset + piece.len], endurance)
}

/// Program one word
pub fn run_write_word(
    session: &mut Session,
    addr: u32,
    value: u32,
    endurance: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    session.ctrl.write_word(addr, value, endurance)?;
    println!("0x{:08X}: wrote 0x{:08X}", addr, value);
    session.save()
}

/// Program one raw 38-bit double word
pub fn run_write_double(
    session: &mut Session,
    addr: u32,
    data: u32,
    ecc: u32,
    endurance: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    session.ctrl.write_double(addr, [data, ecc], endurance)?;
    println!("0x{:08X}: wrote data 0x{:08X} ecc 0x{:02X}", addr, data, ecc & 0x3F);
    session.save()
}
