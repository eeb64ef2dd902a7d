//! CLI command implementations
//!
//! Every command runs against a [`Session`]: a simulated chip loaded from
//! the image file, with both instances initialized at the requested clock.
//! Commands that change the flash save the image when they succeed.

pub mod erase;
pub mod info;
pub mod read;
pub mod write;

use indicatif::{ProgressBar, ProgressStyle};
use montana_flash_sim::{image, initialized_controller, SimConfig, SimController};
use std::path::{Path, PathBuf};

/// Simulated chip backed by an image file
pub struct Session {
    pub ctrl: SimController,
    image: PathBuf,
}

impl Session {
    /// Load the image at `path` and initialize both instances at `clock_hz`
    pub fn open(path: &Path, clock_hz: u32) -> Result<Self, Box<dyn std::error::Error>> {
        let (mut ctrl, _power) = initialized_controller(&SimConfig::default(), clock_hz)?;
        if image::load(&mut ctrl, path)? {
            log::info!("Loaded image {}", path.display());
        } else {
            log::info!("No image at {}, starting with erased flash", path.display());
        }
        Ok(Self {
            ctrl,
            image: path.to_path_buf(),
        })
    }

    /// Write the flash contents back to the image file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        image::save(&self.ctrl, &self.image)?;
        log::info!("Saved image {}", self.image.display());
        Ok(())
    }
}

/// Create a progress bar with custom phase message
fn create_progress_bar_with_phase(
    total: u64,
    phase: &str,
) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
