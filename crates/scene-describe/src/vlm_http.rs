//! HTTP client for a vision-language inference shim.
//!
//! `POST {endpoint}/describe?prompt=..&model=..&max_tokens=..` with the frame
//! as an `image/jpeg` body; the server answers `{"response": "..."}`.
//! `GET {endpoint}/health` is used by the startup probe.

use crate::{DescriberConfig, Error, Result, SceneDescriber};
use camera_session::{io::encode_jpeg, Frame};
use std::time::Duration;

pub struct VlmHttpDescriber {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

#[derive(serde::Deserialize)]
struct DescribeResponse {
    response: String,
}

impl VlmHttpDescriber {
    pub fn new(config: &DescriberConfig) -> Result<Self> {
        // blocking clients default to 30s; no timeout unless configured
        let timeout = config
            .timeout_s
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Request(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    pub fn describe_url(&self) -> String {
        format!("{}/describe", self.endpoint)
    }
}

impl SceneDescriber for VlmHttpDescriber {
    fn name(&self) -> &str {
        &self.model
    }

    fn describe(&mut self, frame: &Frame, prompt: &str) -> Result<String> {
        let jpeg = encode_jpeg(frame)?;
        let max_tokens = self.max_tokens.to_string();
        let start = std::time::Instant::now();
        let resp = self
            .client
            .post(self.describe_url())
            .query(&[
                ("prompt", prompt),
                ("model", self.model.as_str()),
                ("max_tokens", max_tokens.as_str()),
            ])
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(jpeg)
            .send()
            .map_err(|e| Error::Request(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::Status(resp.status().as_u16()));
        }
        let body: DescribeResponse = resp.json().map_err(|e| Error::Request(e.to_string()))?;
        tracing::debug!(
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "vlm response"
        );
        Ok(body.response.trim().to_string())
    }
}

/// `Ok(())` when `GET {endpoint}/health` answers 2xx within two seconds.
pub(crate) fn check_health(config: &DescriberConfig) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .map_err(|e| Error::Request(e.to_string()))?;
    let url = format!("{}/health", config.endpoint.trim_end_matches('/'));
    let resp = client
        .get(&url)
        .send()
        .map_err(|e| Error::Unavailable(format!("{url}: {e}")))?;
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(Error::Status(resp.status().as_u16()))
    }
}
