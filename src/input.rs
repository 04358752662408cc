//! Image inputs handed to the assembler, and the optional upload limits that
//! mirror what the upload layer enforces.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

use crate::error::AssembleError;
use crate::format::SourceFormat;

/// At most this many images per request by default.
pub const DEFAULT_MAX_IMAGES: usize = 20;
/// At most this many bytes per image by default (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// One uploaded image: a name, its raw bytes and an optional MIME hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    name: String,
    bytes: Vec<u8>,
    mime: Option<String>,
}

impl ImageInput {
    /// Create an input whose format is declared by the extension of `name`.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime: None,
        }
    }

    /// Declare the format through a MIME type such as `image/png`.
    ///
    /// An `image/*` hint takes precedence over the filename extension.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Build an input from a `data:<mime>;base64,<data>` URI.
    ///
    /// The MIME type in the URI header becomes the format hint.
    pub fn from_data_uri(name: impl Into<String>, uri: &str) -> Result<Self, AssembleError> {
        let name = name.into();
        let (mime, bytes) =
            parse_data_uri(uri).map_err(|detail| AssembleError::decode(&name, detail))?;
        let input = Self::new(name, bytes);
        Ok(match mime {
            Some(mime) => input.with_mime(mime),
            None => input,
        })
    }

    /// Read an input from disk, named after the file.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    /// The declared format tag, before normalisation.
    ///
    /// `image/<subtype>` MIME hints win; otherwise the filename extension is
    /// used. An input with neither yields an empty tag.
    pub fn format_tag(&self) -> &str {
        if let Some(subtype) = self
            .mime
            .as_deref()
            .and_then(|m| m.split(';').next())
            .and_then(|m| m.trim().strip_prefix("image/"))
        {
            return subtype;
        }
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
    }

    /// Dispatch the declared tag onto a [`SourceFormat`].
    pub fn format(&self) -> Result<SourceFormat, AssembleError> {
        SourceFormat::from_tag(self.format_tag())
    }
}

/// Request-shape limits the upload layer applies before assembly.
///
/// The assembler itself places no limit on page count; set
/// [`crate::pipeline::AssemblerConfig::limits`] to have it enforce these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_images: usize,
    pub max_image_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_images: DEFAULT_MAX_IMAGES,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl UploadLimits {
    /// Reject requests with too many images or any oversized image.
    pub fn check(&self, images: &[ImageInput]) -> Result<(), AssembleError> {
        if images.len() > self.max_images {
            return Err(AssembleError::TooManyImages {
                count: images.len(),
                limit: self.max_images,
            });
        }
        if let Some(big) = images.iter().find(|i| i.bytes.len() > self.max_image_bytes) {
            return Err(AssembleError::ImageTooLarge {
                name: big.name.clone(),
                size: big.bytes.len(),
                limit: self.max_image_bytes,
            });
        }
        Ok(())
    }
}

/// Parse a `data:<mime>;base64,<data>` URI into its MIME type (if any) and
/// decoded bytes.
fn parse_data_uri(src: &str) -> Result<(Option<String>, Vec<u8>), String> {
    let rest = src.strip_prefix("data:").ok_or_else(|| {
        let preview: String = src.chars().take(80).collect();
        format!(
            "Image source must be a base64 data URI \
             (e.g. `data:image/png;base64,...`). Got: {preview:?}"
        )
    })?;
    let comma_pos = rest.find(',').ok_or_else(|| {
        "Invalid data URI: missing `,` separator between header and data".to_string()
    })?;
    let header = &rest[..comma_pos];
    if !header.contains(";base64") {
        return Err("Only base64-encoded data URIs are supported. \
             The header must contain `;base64` (e.g. `data:image/png;base64,...`)."
            .to_string());
    }
    let mime = header
        .split(';')
        .next()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    let bytes = BASE64_STD
        .decode(rest[comma_pos + 1..].trim())
        .map_err(|e| format!("Base64 decode error: {e}"))?;
    Ok((mime, bytes))
}
