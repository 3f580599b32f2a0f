//! Background removal adapter: one outbound call to the remove.bg service.
//!
//! The session talks to the `BackgroundRemover` seam so tests can inject
//! stubs; `RemoveBgClient` is the real HTTP implementation. No retry is
//! attempted; a failed call is reported once and the user re-triggers it.

use crate::error::{MockgenError, MockgenResult};
use crate::scene::SceneImage;

/// Environment variable supplying the remove.bg credential. Its absence
/// disables the removal feature without affecting the rest of the pipeline.
pub const API_KEY_ENV: &str = "REMOVE_BG_API_KEY";

const ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";

/// Strips the background from a PNG-encoded image, returning the matted
/// replacement.
pub trait BackgroundRemover {
    fn remove(&self, image_png: &[u8]) -> MockgenResult<SceneImage>;
}

/// HTTP client for the remove.bg v1.0 API.
pub struct RemoveBgClient {
    api_key: String,
    endpoint: String,
    http: reqwest::blocking::Client,
}

impl RemoveBgClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: ENDPOINT.to_string(),
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Build a client from [`API_KEY_ENV`]; `None` when unset or empty.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var(API_KEY_ENV).ok()?;
        if key.trim().is_empty() {
            return None;
        }
        Some(Self::new(key))
    }

    /// Point the client at a different endpoint (test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl BackgroundRemover for RemoveBgClient {
    #[tracing::instrument(skip(self, image_png), fields(bytes = image_png.len()))]
    fn remove(&self, image_png: &[u8]) -> MockgenResult<SceneImage> {
        let part = reqwest::blocking::multipart::Part::bytes(image_png.to_vec())
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| MockgenError::upload(format!("build multipart part: {e}")))?;
        let form = reqwest::blocking::multipart::Form::new()
            .part("image_file", part)
            .text("size", "auto")
            .text("format", "png");

        let resp = self
            .http
            .post(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| MockgenError::upload(format!("removal request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            // The service does not guarantee a structured error body.
            return Err(MockgenError::upload(format!(
                "removal service returned {status}"
            )));
        }

        let bytes = resp
            .bytes()
            .map_err(|e| MockgenError::upload(format!("read removal response: {e}")))?;
        SceneImage::decode(&bytes)
            .map_err(|e| MockgenError::upload(format!("decode removal response: {e}")))
    }
}
