//! Runs every registered model over every source image so their outputs can be
//! compared side by side.
//!
//! Each run gets its own `runs/<timestamp>/` directory holding
//! `<image stem>_<model>.png` files and a `results.txt` log.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Local;
use color_eyre::{
    Result,
    eyre::{WrapErr as _, ensure},
};
use log::error;
use strum::Display;

use crate::{
    Config, data_uri,
    image_model::ModelDescriptor,
    inference::{InferenceProvider, generate},
    queue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    Success,
    ApiFailed,
    DownloadFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalResult {
    pub image: String,
    pub model: String,
    pub status: Status,
}

#[derive(Debug)]
pub struct EvalRun {
    pub timestamp: String,
    pub run_dir: PathBuf,
    pub log_path: PathBuf,
    pub results: Vec<EvalResult>,
}

impl EvalRun {
    pub fn successes(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == Status::Success)
            .count()
    }
}

/// PNG files in the evaluation source directory, sorted by name.
pub fn source_images(config: &Config) -> Result<Vec<PathBuf>> {
    let source_dir = config.eval_source_dir();
    let mut images = vec![];
    if source_dir.is_dir() {
        for entry in fs::read_dir(&source_dir)? {
            let path = entry?.path();
            let is_png = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
            if path.is_file() && is_png {
                images.push(path);
            }
        }
    }
    images.sort();
    Ok(images)
}

pub async fn run(
    config: &Config,
    provider: &dyn InferenceProvider,
    models: &[ModelDescriptor],
    prompt: &str,
    out: &mut dyn Write,
) -> Result<EvalRun> {
    let images = source_images(config)?;
    ensure!(
        !images.is_empty(),
        "No PNG images found in {}",
        config.eval_source_dir().display()
    );

    writeln!(out, "\nFound {} source image(s)", images.len())?;
    writeln!(out, "Testing {} model(s)", models.len())?;

    let timestamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let run_dir = config.eval_runs_dir().join(&timestamp);
    fs::create_dir_all(&run_dir)?;
    writeln!(out, "Output directory: {}\n", run_dir.display())?;

    let mut results = vec![];
    for image in &images {
        let image_name = queue::file_name(image);
        writeln!(out, "\nProcessing: {image_name}")?;
        writeln!(out, "{}", "-".repeat(40))?;

        let image_uri = match data_uri::encode(image) {
            Ok(uri) => uri,
            Err(e) => {
                error!("Couldn't encode {image_name}: {e:#}");
                writeln!(out, "  ✗ Couldn't read image")?;
                results.extend(models.iter().map(|model| EvalResult {
                    image: image_name.clone(),
                    model: model.name.to_string(),
                    status: Status::ApiFailed,
                }));
                continue;
            }
        };
        let stem = image
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        for model in models {
            write!(out, "  Running {}... ", model.name)?;
            out.flush()?;

            let output_path = run_dir.join(format!("{stem}_{}.png", model.name));
            let status = run_one(provider, model, prompt, &image_uri, &output_path).await;
            let line = match status {
                Status::Success => "✓ Saved",
                Status::DownloadFailed => "✗ Download failed",
                Status::ApiFailed => "✗ Failed",
            };
            writeln!(out, "{line}")?;

            results.push(EvalResult {
                image: image_name.clone(),
                model: model.name.to_string(),
                status,
            });
        }
    }

    let log_path = run_dir.join("results.txt");
    let run = EvalRun {
        timestamp,
        run_dir,
        log_path,
        results,
    };
    fs::write(&run.log_path, results_log(&run, prompt))
        .wrap_err_with(|| format!("Couldn't write {}", run.log_path.display()))?;

    let rule = "=".repeat(60);
    writeln!(out, "\n{rule}\nSUMMARY\n{rule}")?;
    writeln!(out, "Total: {}/{} successful", run.successes(), run.results.len())?;
    writeln!(out, "Results saved to: {}", run.run_dir.display())?;
    writeln!(out, "Log saved to: {}", run.log_path.display())?;

    Ok(run)
}

async fn run_one(
    provider: &dyn InferenceProvider,
    model: &ModelDescriptor,
    prompt: &str,
    image_uri: &str,
    output_path: &Path,
) -> Status {
    let url = match generate(provider, model, prompt, image_uri).await {
        Ok(url) => url,
        Err(e) => {
            error!("Error with {}: {e}", model.name);
            return Status::ApiFailed;
        }
    };

    let saved = match provider.download(&url).await {
        Ok(bytes) => fs::write(output_path, bytes).map_err(color_eyre::Report::from),
        Err(e) => Err(e),
    };
    match saved {
        Ok(()) => Status::Success,
        Err(e) => {
            error!("Download error: {e:#}");
            Status::DownloadFailed
        }
    }
}

fn results_log(run: &EvalRun, prompt: &str) -> String {
    let mut log = format!(
        "Evaluation Run: {}\nPrompt:\n{prompt}\n\nResults:\n",
        run.timestamp
    );
    for r in &run.results {
        log.push_str(&format!("  {} + {}: {}\n", r.image, r.model, r.status));
    }
    log
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;
    use crate::{
        Model,
        inference::testing::{FakeProvider, Scripted},
    };

    #[tokio::test]
    async fn every_model_runs_on_every_image() -> Result<()> {
        let root = tempfile::tempdir()?;
        let config = Config::with_root(root.path());
        let source = config.eval_source_dir();
        fs::create_dir_all(&source)?;
        fs::write(source.join("b.png"), b"b")?;
        fs::write(source.join("a.png"), b"a")?;
        fs::write(source.join("skip.jpg"), b"j")?;

        let models = [
            Model::NanoBanana.descriptor(),
            Model::QwenImageEdit.descriptor(),
        ];
        let provider = FakeProvider::new([
            Scripted::Url("https://cdn/1".into()),
            Scripted::Fail,
            Scripted::Url("https://broken/3".into()),
            Scripted::Nothing,
        ]);
        let mut out: Vec<u8> = vec![];

        let run = run(&config, &provider, &models, "Clean it up", &mut out).await?;

        assert_eq!(provider.call_count(), 4);
        assert_eq!(run.successes(), 1);
        assert!(run.run_dir.join("a_nano-banana.png").is_file());
        assert!(!run.run_dir.join("b_nano-banana.png").exists());

        let log = fs::read_to_string(&run.log_path)?;
        let log = log.replace(&run.timestamp, "<ts>");
        expect![[r#"
            Evaluation Run: <ts>
            Prompt:
            Clean it up

            Results:
              a.png + nano-banana: success
              a.png + qwen-image-edit: api_failed
              b.png + nano-banana: download_failed
              b.png + qwen-image-edit: api_failed
        "#]]
        .assert_eq(&log);

        let printed = String::from_utf8(out)?;
        assert!(printed.contains("Total: 1/4 successful"), "{printed}");
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn unreadable_image_does_not_stop_the_run() -> Result<()> {
        let root = tempfile::tempdir()?;
        let config = Config::with_root(root.path());
        let source = config.eval_source_dir();
        fs::create_dir_all(&source)?;
        fs::write(source.join("a.png"), b"a")?;
        // A regular file as far as metadata goes, but every read fails.
        std::os::unix::fs::symlink("/proc/self/mem", source.join("b.png"))?;
        fs::write(source.join("c.png"), b"c")?;

        let models = [Model::NanoBanana.descriptor()];
        let provider = FakeProvider::new([
            Scripted::Url("https://cdn/a".into()),
            Scripted::Url("https://cdn/c".into()),
        ]);

        let run = run(&config, &provider, &models, "P", &mut std::io::sink()).await?;

        assert_eq!(provider.call_count(), 2);
        assert_eq!(run.successes(), 2);
        assert!(run.run_dir.join("c_nano-banana.png").is_file());

        let log = fs::read_to_string(&run.log_path)?;
        assert!(log.contains("a.png + nano-banana: success"), "{log}");
        assert!(log.contains("b.png + nano-banana: api_failed"), "{log}");
        assert!(log.contains("c.png + nano-banana: success"), "{log}");
        Ok(())
    }

    #[tokio::test]
    async fn empty_source_dir_is_an_error() -> Result<()> {
        let root = tempfile::tempdir()?;
        let config = Config::with_root(root.path());
        let provider = FakeProvider::new([]);

        let err = run(&config, &provider, &[], "P", &mut std::io::sink())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No PNG images found"));
        assert!(!config.eval_runs_dir().exists());
        Ok(())
    }
}
