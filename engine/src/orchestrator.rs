use std::{fs, path::Path};

use color_eyre::{Result, eyre::WrapErr as _};
use log::{info, warn};
use tokio::time::sleep;

use crate::{
    Config,
    image_model::ModelDescriptor,
    inference::{InferenceProvider, ProcessError, process_image},
    queue,
};

/// Per-image updates while a folder is processed.
#[derive(Debug)]
pub enum Progress<'a> {
    Started {
        image: &'a str,
        index: usize,
        total: usize,
    },
    Completed {
        image: &'a str,
        output_name: &'a str,
    },
    Failed {
        image: &'a str,
        error: &'a ProcessError,
    },
}

/// Successes and attempts for one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub success: usize,
    pub total: usize,
}

impl Tally {
    pub fn all_succeeded(&self) -> bool {
        self.total > 0 && self.success == self.total
    }
}

/// Runs `model` over every image in `folder`, one at a time.
///
/// Outputs go to `<enhanced>/<folder name>/`. A failing image is reported and
/// counted but never stops the loop. Only I/O errors on the output directory
/// itself abort the run.
pub async fn process_folder(
    config: &Config,
    provider: &dyn InferenceProvider,
    folder: &Path,
    model: &ModelDescriptor,
    prompt: &str,
    report: &mut dyn FnMut(Progress<'_>),
) -> Result<Tally> {
    let images = queue::list_images(config, folder)?;
    let folder_name = queue::file_name(folder);
    if images.is_empty() {
        warn!("No images found in {folder_name}");
        return Ok(Tally::default());
    }

    let output_dir = config.enhanced_dir().join(&folder_name);
    fs::create_dir_all(&output_dir)
        .wrap_err_with(|| format!("Couldn't create {}", output_dir.display()))?;

    let total = images.len();
    let mut success = 0;
    info!("Processing {total} image(s) from '{folder_name}' using {}", model.name);

    for (i, image) in images.iter().enumerate() {
        let index = i + 1;
        let image_name = queue::file_name(image);
        report(Progress::Started {
            image: &image_name,
            index,
            total,
        });

        let output_name = queue::output_name(&folder_name, index, total);
        let output_path = output_dir.join(&output_name);

        let outcome = match process_image(provider, model, prompt, image).await {
            Ok(bytes) => write_output(&output_path, &bytes),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                success += 1;
                info!("{image_name} -> {}", output_path.display());
                report(Progress::Completed {
                    image: &image_name,
                    output_name: &output_name,
                });
            }
            Err(e) => {
                warn!("Error processing {image_name}: {e}");
                report(Progress::Failed {
                    image: &image_name,
                    error: &e,
                });
            }
        }

        if index < total {
            sleep(config.api_delay()).await;
        }
    }

    Ok(Tally { success, total })
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), ProcessError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)
    };
    write().map_err(|e| ProcessError::Download(format!("couldn't save {}: {e}", path.display())))
}
