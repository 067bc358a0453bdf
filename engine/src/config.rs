use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use color_eyre::{Result, eyre::WrapErr as _};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "whiteboard.ron";
pub const ROOT_ENV_VAR: &str = "WHITEBOARD_ROOT";
pub const API_KEY_ENV_VAR: &str = "REPLICATE_API_KEY";
const API_TOKEN_ENV_VAR: &str = "REPLICATE_API_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} not found in environment variables. Please set it in your .env file or environment.")]
    MissingApiKey { var: &'static str },

    #[error("Queue directory not found: {}", .0.display())]
    MissingQueueDir(PathBuf),
}

/// Directory layout and tuning knobs shared by the CLI and the evaluation run.
///
/// Relative paths are resolved against `root`, which is never read from the
/// config file itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub root: PathBuf,
    pub queue_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub enhanced_dir: PathBuf,
    pub eval_source_dir: PathBuf,
    pub eval_runs_dir: PathBuf,
    pub image_extensions: Vec<String>,
    pub api_delay_secs: u64,
    pub download_timeout_secs: u64,
    pub api_base: String,
    pub poll_interval_ms: u64,
    pub poll_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            queue_dir: "images/originals/queue".into(),
            processed_dir: "images/originals/processed".into(),
            enhanced_dir: "images/enhanced".into(),
            eval_source_dir: "eval/source".into(),
            eval_runs_dir: "eval/runs".into(),
            image_extensions: ["png", "jpg", "jpeg", "webp", "gif", "bmp"]
                .into_iter()
                .map(String::from)
                .collect(),
            api_delay_secs: 2,
            download_timeout_secs: 60,
            api_base: "https://api.replicate.com/v1".into(),
            poll_interval_ms: 500,
            poll_timeout_secs: 600,
        }
    }
}

impl Config {
    /// Default layout rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Reads `whiteboard.ron` from `root` if it exists, otherwise uses the defaults.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let path = root.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            debug!("Loading config from {}", path.display());
            load_ron_file::<Config>(&path)
                .wrap_err_with(|| format!("Invalid config file {}", path.display()))?
        } else {
            Config::default()
        };
        config.root = root;
        Ok(config)
    }

    /// `$WHITEBOARD_ROOT`, or the working directory.
    pub fn project_root() -> Result<PathBuf> {
        match env::var_os(ROOT_ENV_VAR) {
            Some(root) if !root.is_empty() => Ok(PathBuf::from(root)),
            _ => Ok(env::current_dir()?),
        }
    }

    pub fn queue_dir(&self) -> PathBuf {
        self.root.join(&self.queue_dir)
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join(&self.processed_dir)
    }

    pub fn enhanced_dir(&self) -> PathBuf {
        self.root.join(&self.enhanced_dir)
    }

    pub fn eval_source_dir(&self) -> PathBuf {
        self.root.join(&self.eval_source_dir)
    }

    pub fn eval_runs_dir(&self) -> PathBuf {
        self.root.join(&self.eval_runs_dir)
    }

    pub fn api_delay(&self) -> Duration {
        Duration::from_secs(self.api_delay_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    /// Case-insensitive check against the recognized image extensions.
    pub fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.image_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    /// Loads `<root>/.env` without overriding variables that are already set.
    pub fn load_dotenv(&self) {
        match dotenvy::from_path(self.root.join(".env")) {
            Ok(()) => debug!("Loaded .env from {}", self.root.display()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("Couldn't read .env: {e}"),
        }
    }
}

/// Returns the provider credential, failing if it is missing or empty.
pub fn api_key() -> Result<String, ConfigError> {
    [API_KEY_ENV_VAR, API_TOKEN_ENV_VAR]
        .into_iter()
        .filter_map(|var| env::var(var).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .ok_or(ConfigError::MissingApiKey {
            var: API_KEY_ENV_VAR,
        })
}

pub fn load_ron_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let src = fs::read_to_string(path)?;
    Ok(ron::from_str(&src)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_project_layout() {
        let config = Config::with_root("/project");
        assert_eq!(
            config.queue_dir(),
            PathBuf::from("/project/images/originals/queue")
        );
        assert_eq!(
            config.processed_dir(),
            PathBuf::from("/project/images/originals/processed")
        );
        assert_eq!(config.enhanced_dir(), PathBuf::from("/project/images/enhanced"));
        assert_eq!(config.eval_runs_dir(), PathBuf::from("/project/eval/runs"));
        assert_eq!(config.api_delay(), Duration::from_secs(2));
        assert_eq!(config.download_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn image_extensions_are_case_insensitive() {
        let config = Config::default();
        assert!(config.is_image(Path::new("board.PNG")));
        assert!(config.is_image(Path::new("board.JpEg")));
        assert!(config.is_image(Path::new("board.bmp")));
        assert!(!config.is_image(Path::new("notes.txt")));
        assert!(!config.is_image(Path::new("README")));
    }

    #[test]
    fn config_file_overrides_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"(api_delay_secs: 0, enhanced_dir: "/tmp/out")"#,
        )?;

        let config = Config::load(dir.path())?;
        assert_eq!(config.api_delay(), Duration::ZERO);
        assert_eq!(config.enhanced_dir(), PathBuf::from("/tmp/out"));
        assert_eq!(config.queue_dir(), dir.path().join("images/originals/queue"));
        assert_eq!(config.download_timeout_secs, 60);
        Ok(())
    }

    #[test]
    fn missing_config_file_uses_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config::load(dir.path())?;
        assert_eq!(config.root, dir.path());
        assert_eq!(config.api_delay_secs, 2);
        Ok(())
    }
}
