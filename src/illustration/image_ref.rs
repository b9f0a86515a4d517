//! Displayable image references produced by the image endpoint

use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const PNG_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("not a base64 data URI")]
    NotDataUri,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("cannot write image: {0}")]
    Io(#[from] std::io::Error),
}

/// A `data:` URI holding one base64-encoded image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRef(String);

impl ImageRef {
    /// Wrap a base64-encoded PNG as returned by the endpoint.
    #[must_use]
    pub fn from_base64_png(base64: &str) -> Self {
        Self(format!("{PNG_PREFIX}{base64}"))
    }

    /// Encode raw PNG bytes.
    #[must_use]
    pub fn from_png_bytes(bytes: &[u8]) -> Self {
        Self::from_base64_png(&STANDARD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Media type declared in the URI, e.g. `image/png`
    pub fn media_type(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("data:")?;
        let (media, _) = rest.split_once(';')?;
        Some(media)
    }

    /// Decoded image bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, ImageError> {
        let (_, payload) = self
            .0
            .split_once(";base64,")
            .ok_or(ImageError::NotDataUri)?;
        Ok(STANDARD.decode(payload)?)
    }

    pub fn decode(&self) -> Result<image::DynamicImage, ImageError> {
        Ok(image::load_from_memory(&self.bytes()?)?)
    }

    /// Write the decoded image to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ImageError> {
        fs::write(path, self.bytes()?)?;
        Ok(())
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
