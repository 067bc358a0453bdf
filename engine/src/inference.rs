use std::{future::Future, path::Path, pin::Pin};

use color_eyre::Result;
use log::debug;
use serde_json::Value;
use thiserror::Error;

use crate::{data_uri, image_model::ModelDescriptor};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A hosted image model provider.
pub trait InferenceProvider {
    /// Runs `model_id` with the given `input` object and returns whatever the
    /// provider produced, or `None` when it produced nothing.
    fn run<'a>(
        &'a self,
        model_id: &'a str,
        input: Value,
    ) -> BoxFuture<'a, Result<Option<PredictionOutput>>>;

    /// Fetches a generated image.
    fn download<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// The shapes a prediction's output can take.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutput {
    /// An object carrying a retrievable `url`.
    File { url: String },
    Text(String),
    Sequence(Vec<PredictionOutput>),
    Opaque(Value),
}

impl PredictionOutput {
    /// Maps a provider's JSON `output` field. `null` means no output.
    pub fn from_json(value: Value) -> Option<Self> {
        Some(match value {
            Value::Null => return None,
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::Sequence(
                items
                    .into_iter()
                    .map(|item| Self::from_json(item).unwrap_or(Self::Opaque(Value::Null)))
                    .collect(),
            ),
            Value::Object(obj) => match obj.get("url").and_then(Value::as_str) {
                Some(url) => Self::File {
                    url: url.to_string(),
                },
                None => Self::Opaque(Value::Object(obj)),
            },
            other => Self::Opaque(other),
        })
    }

    /// Picks the single location to download from.
    ///
    /// Order matters: a direct `url`, then an http string, then the first
    /// match among sequence items, and finally the stringified value.
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::File { url } => Some(url.as_str()),
            Self::Text(s) if is_http(s) => Some(s.as_str()),
            Self::Text(_) => None,
            Self::Sequence(items) => items.iter().find_map(|item| match item {
                Self::File { url } => Some(url.as_str()),
                Self::Text(s) if is_http(s) => Some(s.as_str()),
                _ => None,
            }),
            Self::Opaque(Value::String(s)) if is_http(s) => Some(s.as_str()),
            Self::Opaque(_) => None,
        }
    }
}

fn is_http(s: &str) -> bool {
    s.starts_with("http")
}

/// Why a single image couldn't be processed.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("could not prepare image: {0}")]
    Encode(String),

    #[error("prediction failed: {0}")]
    Prediction(String),

    #[error("no image was generated in the response")]
    NoOutput,

    #[error("download failed: {0}")]
    Download(String),
}

impl ProcessError {
    /// Whether the failure happened before anything could be downloaded.
    pub fn is_api_failure(&self) -> bool {
        !matches!(self, ProcessError::Download(_))
    }
}

/// Runs `model` on an already encoded image and returns the output location.
pub async fn generate(
    provider: &dyn InferenceProvider,
    model: &ModelDescriptor,
    prompt: &str,
    image_uri: &str,
) -> Result<String, ProcessError> {
    let input = model.input(prompt, image_uri);
    debug!("{} input: {}", model.name, redact_image(&input, image_uri));
    let output = provider
        .run(model.id, input)
        .await
        .map_err(|e| ProcessError::Prediction(format!("{e:#}")))?;
    debug!("{} output: {output:?}", model.name);

    output
        .as_ref()
        .and_then(PredictionOutput::location)
        .map(str::to_string)
        .ok_or(ProcessError::NoOutput)
}

/// Copy of `input` with the embedded image replaced by its length, for logging.
fn redact_image(input: &Value, image_uri: &str) -> Value {
    match input {
        Value::String(s) if s == image_uri => {
            Value::String(format!("<data uri, {} bytes>", image_uri.len()))
        }
        Value::Array(items) => items.iter().map(|v| redact_image(v, image_uri)).collect(),
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), redact_image(v, image_uri)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Encodes the image, runs `model` on it and downloads the result.
pub async fn process_image(
    provider: &dyn InferenceProvider,
    model: &ModelDescriptor,
    prompt: &str,
    image: &Path,
) -> Result<Vec<u8>, ProcessError> {
    let image_uri = data_uri::encode(image).map_err(|e| ProcessError::Encode(format!("{e:#}")))?;
    let url = generate(provider, model, prompt, &image_uri).await?;
    debug!("Downloading {url}");
    provider
        .download(&url)
        .await
        .map_err(|e| ProcessError::Download(format!("{e:#}")))
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{testing::*, *};
    use crate::Model;

    #[test]
    fn location_prefers_direct_url() {
        let out = PredictionOutput::File {
            url: "https://replicate.delivery/a.png".into(),
        };
        assert_eq!(out.location(), Some("https://replicate.delivery/a.png"));
    }

    #[test]
    fn location_from_plain_string() {
        let out = PredictionOutput::Text("https://x/y.png".into());
        assert_eq!(out.location(), Some("https://x/y.png"));
        assert_eq!(PredictionOutput::Text("not a url".into()).location(), None);
    }

    #[test]
    fn location_picks_first_match_in_sequence() {
        let out = PredictionOutput::Sequence(vec![
            PredictionOutput::Text("starting".into()),
            PredictionOutput::Opaque(json!(3)),
            PredictionOutput::File {
                url: "https://x/first.png".into(),
            },
            PredictionOutput::Text("https://x/second.png".into()),
        ]);
        assert_eq!(out.location(), Some("https://x/first.png"));
    }

    #[test]
    fn location_of_opaque_value_is_none() {
        assert_eq!(PredictionOutput::Opaque(json!(42)).location(), None);
        assert_eq!(
            PredictionOutput::Opaque(json!({"status": "ok"})).location(),
            None
        );
        assert_eq!(PredictionOutput::Sequence(vec![]).location(), None);
    }

    #[test]
    fn json_outputs_map_onto_variants() {
        assert_eq!(PredictionOutput::from_json(Value::Null), None);
        assert_eq!(
            PredictionOutput::from_json(json!("https://x/a.png")),
            Some(PredictionOutput::Text("https://x/a.png".into()))
        );
        assert_eq!(
            PredictionOutput::from_json(json!({"url": "https://x/a.png"})),
            Some(PredictionOutput::File {
                url: "https://x/a.png".into()
            })
        );
        let list = PredictionOutput::from_json(json!(["log line", "https://x/b.png"])).unwrap();
        assert_eq!(list.location(), Some("https://x/b.png"));
        assert_eq!(
            PredictionOutput::from_json(json!(true)),
            Some(PredictionOutput::Opaque(json!(true)))
        );
    }

    #[test]
    fn logged_payload_elides_the_image() {
        let uri = "data:image/png;base64,YWJj";
        let input = Model::NanoBanana.descriptor().input("P", uri);
        let logged = redact_image(&input, uri);

        assert_eq!(logged["prompt"], "P");
        assert_eq!(logged["image_input"], json!(["<data uri, 26 bytes>"]));
        assert!(!logged.to_string().contains("YWJj"));
    }

    #[tokio::test]
    async fn process_image_classifies_failures() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("board.jpg");
        std::fs::write(&image, b"jpeg")?;
        let model = Model::QwenImageEdit.descriptor();

        let provider = FakeProvider::new([
            Scripted::Url("https://ok/out.png".into()),
            Scripted::Fail,
            Scripted::Nothing,
            Scripted::Url("https://broken/out.png".into()),
        ]);

        let bytes = process_image(&provider, &model, "P", &image).await?;
        assert_eq!(bytes, b"https://ok/out.png");

        let err = process_image(&provider, &model, "P", &image).await.unwrap_err();
        assert!(matches!(err, ProcessError::Prediction(_)));
        assert!(err.is_api_failure());

        let err = process_image(&provider, &model, "P", &image).await.unwrap_err();
        assert!(matches!(err, ProcessError::NoOutput));

        let err = process_image(&provider, &model, "P", &image).await.unwrap_err();
        assert!(matches!(err, ProcessError::Download(_)));
        assert!(!err.is_api_failure());

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls[0].0, "qwen/qwen-image-edit");
        assert_eq!(calls[0].1["image"], "data:image/jpeg;base64,anBlZw==");
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_image_never_reaches_the_provider() {
        let provider = FakeProvider::new([]);
        let model = Model::NanoBanana.descriptor();
        let err = process_image(&provider, &model, "P", Path::new("/nope/missing.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Encode(_)));
        assert_eq!(provider.call_count(), 0);
    }
}
