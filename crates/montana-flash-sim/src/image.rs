//! Flash image persistence
//!
//! An image is every region of both instances in resolution order (FLASH0
//! code, data, NVR, then FLASH1 code, data, NVR), as little-endian words.
//! ECC bits are not stored; they are regenerated on load.

use std::path::{Path, PathBuf};

use montana_flash_core::region::{all_regions, FlashInstance, RegionKind};
use thiserror::Error;

use crate::SimController;

/// Image persistence errors
#[derive(Debug, Error)]
pub enum ImageError {
    /// Failed to read the image
    #[error("Failed to read image {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the image
    #[error("Failed to write image {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image has the wrong size
    #[error("Image is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Result type for image operations
pub type Result<T> = std::result::Result<T, ImageError>;

/// Size in bytes of a full image
pub fn image_size() -> usize {
    all_regions().map(|r| r.size() as usize).sum()
}

/// Serialize the contents of both instances
pub fn encode(ctrl: &SimController) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(image_size());
    for instance in FlashInstance::ALL {
        let bank = ctrl.bank(instance);
        for region in instance.regions() {
            for word in bank.region_words(region.kind()) {
                bytes.extend_from_slice(&word.to_le_bytes());
            }
        }
    }
    bytes
}

/// Replace the contents of both instances with an encoded image
pub fn decode_into(ctrl: &mut SimController, bytes: &[u8]) -> Result<()> {
    let expected = image_size();
    if bytes.len() != expected {
        return Err(ImageError::SizeMismatch {
            expected,
            actual: bytes.len(),
        });
    }

    let mut rest = bytes;
    for instance in FlashInstance::ALL {
        for kind in [RegionKind::Code, RegionKind::Data, RegionKind::Nvr] {
            let size = instance.region(kind).size() as usize;
            let (chunk, tail) = rest.split_at(size);
            let words = chunk
                .chunks_exact(4)
                .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]));
            ctrl.bank_mut(instance).load_region(kind, words);
            rest = tail;
        }
    }
    Ok(())
}

/// Write the image of both instances to `path`
pub fn save(ctrl: &SimController, path: &Path) -> Result<()> {
    std::fs::write(path, encode(ctrl)).map_err(|source| ImageError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("saved image to {}", path.display());
    Ok(())
}

/// Load the image at `path` into both instances
///
/// Returns `false` and leaves the flash untouched if the file does not
/// exist.
pub fn load(ctrl: &mut SimController, path: &Path) -> Result<bool> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("no image at {}, starting erased", path.display());
            return Ok(false);
        }
        Err(source) => {
            return Err(ImageError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    decode_into(ctrl, &bytes)?;
    log::debug!("loaded image from {}", path.display());
    Ok(true)
}
