//! Text-to-image endpoint client

use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::settings::IllustrationSettings;

use super::image_ref::ImageRef;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Image API key not set (expected in ${env_var})")]
    MissingCredential { env_var: String },

    #[error("Image API error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Image API unreachable: {0}")]
    Transport(String),

    #[error("Image API returned an unreadable response: {0}")]
    InvalidPayload(String),

    #[error("No image returned from image API")]
    MissingImage,
}

/// Something that turns a prompt into an image.
pub trait ImageGenerator: Send + Sync {
    /// Fail-fast check performed before any request is issued
    fn check_ready(&self) -> Result<(), GenerationError> {
        Ok(())
    }

    /// Generate one image for the caller's text; blocks until done
    fn generate(&self, text: &str) -> Result<ImageRef, GenerationError>;
}

#[derive(Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct TextToImageRequest<'a> {
    text_prompts: [TextPrompt<'a>; 1],
    cfg_scale: f32,
    height: u32,
    width: u32,
    samples: u32,
    steps: u32,
}

#[derive(Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Deserialize)]
struct Artifact {
    #[serde(default)]
    base64: Option<String>,
}

/// Client for a Stability-style `text-to-image` endpoint.
pub struct StabilityClient {
    agent: ureq::Agent,
    api_key: Option<String>,
    settings: IllustrationSettings,
}

impl StabilityClient {
    /// Build a client, reading the credential from the environment variable
    /// named in the settings.
    #[must_use]
    pub fn from_settings(settings: &IllustrationSettings) -> Self {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Self::new(settings.clone(), api_key)
    }

    #[must_use]
    pub fn new(settings: IllustrationSettings, api_key: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build();
        Self {
            agent,
            api_key,
            settings,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Style preamble followed by the caller's text
    pub fn compose_prompt(&self, text: &str) -> String {
        let preamble = self.settings.style_preamble.trim();
        if preamble.is_empty() {
            text.to_string()
        } else {
            format!("{preamble} {text}")
        }
    }

    fn request_body(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = TextToImageRequest {
            text_prompts: [TextPrompt { text: prompt }],
            cfg_scale: self.settings.cfg_scale,
            height: self.settings.height,
            width: self.settings.width,
            samples: self.settings.samples,
            steps: self.settings.steps,
        };
        serde_json::to_string(&request).map_err(|e| GenerationError::InvalidPayload(e.to_string()))
    }

    fn credential(&self) -> Result<&str, GenerationError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| GenerationError::MissingCredential {
                env_var: self.settings.api_key_env.clone(),
            })
    }
}

impl ImageGenerator for StabilityClient {
    fn check_ready(&self) -> Result<(), GenerationError> {
        self.credential().map(|_| ())
    }

    fn generate(&self, text: &str) -> Result<ImageRef, GenerationError> {
        let api_key = self.credential()?;
        let body = self.request_body(&self.compose_prompt(text))?;

        debug!("POST {} ({} bytes)", self.settings.endpoint, body.len());

        let response = self
            .agent
            .post(&self.settings.endpoint)
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
            .set("Authorization", &format!("Bearer {api_key}"))
            .send_string(&body);

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(GenerationError::Http { status, body });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(GenerationError::Transport(transport.to_string()));
            }
        };

        let body = response
            .into_string()
            .map_err(|e| GenerationError::InvalidPayload(e.to_string()))?;
        parse_response(&body)
    }
}

/// Pull the first base64 artifact out of an endpoint response.
pub fn parse_response(body: &str) -> Result<ImageRef, GenerationError> {
    let response: TextToImageResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::InvalidPayload(e.to_string()))?;

    response
        .artifacts
        .into_iter()
        .next()
        .and_then(|artifact| artifact.base64)
        .filter(|data| !data.is_empty())
        .map(|data| ImageRef::from_base64_png(&data))
        .ok_or(GenerationError::MissingImage)
}
