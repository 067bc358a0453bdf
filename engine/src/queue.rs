//! Queue folders on disk.
//!
//! A queue folder is a directory of whiteboard photos under the queue root.
//! Once every photo in it has been enhanced it can be moved to the processed
//! root, which is a plain rename and never a copy.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Local;
use color_eyre::{Result, eyre::WrapErr as _};
use log::info;

use crate::{Config, config::ConfigError};

/// Directories under the queue root, sorted by name.
pub fn list_queue_folders(config: &Config) -> Result<Vec<PathBuf>> {
    let queue_dir = config.queue_dir();
    if !queue_dir.is_dir() {
        return Err(ConfigError::MissingQueueDir(queue_dir).into());
    }

    let mut folders = fs::read_dir(&queue_dir)?
        .map(|entry| Ok(entry?.path()))
        .filter(|path: &Result<PathBuf>| path.as_ref().map_or(true, |p| p.is_dir()))
        .collect::<Result<Vec<_>>>()?;
    folders.sort();
    Ok(folders)
}

/// Image files directly inside `folder`, sorted by name.
pub fn list_images(config: &Config, folder: &Path) -> Result<Vec<PathBuf>> {
    let mut images = fs::read_dir(folder)
        .wrap_err_with(|| format!("Couldn't read {}", folder.display()))?
        .map(|entry| Ok(entry?.path()))
        .filter(|path: &Result<PathBuf>| {
            path.as_ref()
                .map_or(true, |p| p.is_file() && config.is_image(p))
        })
        .collect::<Result<Vec<_>>>()?;
    images.sort();
    Ok(images)
}

/// `<folder>-<NN>-enhanced-<YYYYMMDD>.png`, without the index for single-image folders.
///
/// `index` is 1-based.
pub fn output_name(folder_name: &str, index: usize, total: usize) -> String {
    let date = Local::now().format("%Y%m%d");
    let clean_name = folder_name.replace([' ', '_'], "-").to_lowercase();

    if total == 1 {
        format!("{clean_name}-enhanced-{date}.png")
    } else {
        format!("{clean_name}-{index:02}-enhanced-{date}.png")
    }
}

/// Renames `folder` into the processed root. An existing folder of the same
/// name is left alone and the new one gets a timestamp suffix.
pub fn move_to_processed(config: &Config, folder: &Path) -> Result<PathBuf> {
    let processed_dir = config.processed_dir();
    fs::create_dir_all(&processed_dir)?;

    let name = file_name(folder);
    let mut destination = processed_dir.join(&name);
    if destination.exists() {
        let timestamp = Local::now().format("%Y%m%d-%H%M%S");
        destination = processed_dir.join(format!("{name}-{timestamp}"));
    }

    fs::rename(folder, &destination).wrap_err_with(|| {
        format!(
            "Couldn't move {} to {}",
            folder.display(),
            destination.display()
        )
    })?;
    info!("Moved {} to {}", folder.display(), destination.display());
    Ok(destination)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
