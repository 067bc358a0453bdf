use std::time::{Duration, Instant};

use color_eyre::{
    Result,
    eyre::{WrapErr as _, bail, ensure, eyre},
};
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::sleep;

use crate::{
    Config,
    inference::{BoxFuture, InferenceProvider, PredictionOutput},
};

#[derive(Clone)]
pub struct Replicate {
    client: Client,
    api_key: String,
    api_base: String,
    poll_interval: Duration,
    poll_timeout: Duration,
    download_timeout: Duration,
}

impl Replicate {
    pub fn new(api_key: String, config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            poll_interval: config.poll_interval(),
            poll_timeout: config.poll_timeout(),
            download_timeout: config.download_timeout(),
        }
    }

    /// `owner/name` runs the model's latest version, `owner/name:version` pins one.
    fn create_request(&self, model_id: &str, input: Value) -> (String, Value) {
        match model_id.split_once(':') {
            Some((_, version)) => (
                format!("{}/predictions", self.api_base),
                json!({ "version": version, "input": input }),
            ),
            None => (
                format!("{}/models/{model_id}/predictions", self.api_base),
                json!({ "input": input }),
            ),
        }
    }

    async fn predict(&self, model_id: &str, input: Value) -> Result<Option<PredictionOutput>> {
        let (url, body) = self.create_request(model_id, input);
        debug!("Creating prediction at {url}");

        let create_resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await?;

        let status = create_resp.status();
        let text = create_resp.text().await?;
        ensure!(status.is_success(), "Prediction request error: {status} - {text}");

        let mut prediction: Prediction = serde_json::from_str(&text)
            .wrap_err_with(|| format!("Unexpected prediction response: {text}"))?;

        let started = Instant::now();
        loop {
            debug!("Prediction {} is {}", prediction.id, prediction.status);
            match prediction.status.as_str() {
                "succeeded" => return Ok(PredictionOutput::from_json(prediction.output)),
                "failed" | "canceled" => bail!(
                    "Replicate prediction {}: {}",
                    prediction.status,
                    prediction.error.unwrap_or(Value::Null)
                ),
                _ => {}
            }

            if started.elapsed() >= self.poll_timeout {
                bail!(
                    "Replicate prediction timed out after {}s",
                    self.poll_timeout.as_secs()
                );
            }
            sleep(self.poll_interval).await;

            let poll_url = prediction
                .urls
                .get
                .clone()
                .ok_or_else(|| eyre!("Missing prediction get URL: {prediction:#?}"))?;
            let poll_resp = self
                .client
                .get(&poll_url)
                .bearer_auth(&self.api_key)
                .send()
                .await?;
            let status = poll_resp.status();
            let text = poll_resp.text().await?;
            ensure!(status.is_success(), "Prediction poll error: {status} - {text}");
            prediction = serde_json::from_str(&text)
                .wrap_err_with(|| format!("Unexpected prediction response: {text}"))?;
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: String,
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: PredictionUrls,
}

#[derive(Debug, Default, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

impl InferenceProvider for Replicate {
    fn run<'a>(
        &'a self,
        model_id: &'a str,
        input: Value,
    ) -> BoxFuture<'a, Result<Option<PredictionOutput>>> {
        Box::pin(self.predict(model_id, input))
    }

    fn download<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(self.fetch(url))
    }
}
