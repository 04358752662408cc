//! Format dispatch – maps a declared format tag onto the closed set of
//! formats this crate knows about, and each format onto its decoder.
//!
//! Dispatch is driven only by the declared tag (file extension or MIME
//! subtype). File contents are never sniffed.

use crate::error::AssembleError;

/// Remediation hint for formats that are recognised but cannot be embedded.
pub const CONVERT_HINT: &str =
    "WebP format requires additional processing. Please convert to JPG or PNG first.";

/// Every image format the assembler recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Png,
    Jpeg,
    /// Accepted by upload validation, but no decoder is wired in.
    WebP,
}

/// How a [`SourceFormat`] is turned into pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// Decoded by the `image` crate with a fixed format.
    Native(image::ImageFormat),
    /// Recognised, but rejected with a remediation hint.
    Unsupported { remediation: &'static str },
}

impl SourceFormat {
    /// Parse a declared tag such as `".PNG"`, `"jpg"` or `"webp"`.
    ///
    /// The tag is lowercased and a single leading `.` is stripped.
    pub fn from_tag(tag: &str) -> Result<Self, AssembleError> {
        let normalized = normalize_tag(tag);
        match normalized.as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::WebP),
            _ => Err(AssembleError::UnsupportedFormat {
                extension: if normalized.is_empty() {
                    "(none)".to_string()
                } else {
                    normalized
                },
                remediation: None,
            }),
        }
    }

    /// Canonical tag, used in error messages and logs.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::WebP => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    pub fn decoder(self) -> Decoder {
        match self {
            Self::Png => Decoder::Native(image::ImageFormat::Png),
            Self::Jpeg => Decoder::Native(image::ImageFormat::Jpeg),
            Self::WebP => Decoder::Unsupported {
                remediation: CONVERT_HINT,
            },
        }
    }

    /// The `image` crate format to decode with, or an `UnsupportedFormat`
    /// error for formats without a decoder.
    pub fn native(self) -> Result<image::ImageFormat, AssembleError> {
        match self.decoder() {
            Decoder::Native(format) => Ok(format),
            Decoder::Unsupported { remediation } => Err(AssembleError::UnsupportedFormat {
                extension: self.tag().to_string(),
                remediation: Some(remediation),
            }),
        }
    }
}

/// Lowercase and strip a single leading separator.
pub fn normalize_tag(tag: &str) -> String {
    let trimmed = tag.trim();
    trimmed
        .strip_prefix('.')
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_supported_tags() {
        assert_eq!(SourceFormat::from_tag("png").unwrap(), SourceFormat::Png);
        assert_eq!(SourceFormat::from_tag(".PNG").unwrap(), SourceFormat::Png);
        assert_eq!(SourceFormat::from_tag("jpg").unwrap(), SourceFormat::Jpeg);
        assert_eq!(SourceFormat::from_tag(".JPEG").unwrap(), SourceFormat::Jpeg);
    }

    #[test]
    fn webp_is_recognised_but_has_no_decoder() {
        let format = SourceFormat::from_tag(".webp").unwrap();
        assert_eq!(format, SourceFormat::WebP);
        match format.native() {
            Err(AssembleError::UnsupportedFormat {
                extension,
                remediation: Some(hint),
            }) => {
                assert_eq!(extension, "webp");
                assert!(hint.contains("convert to JPG or PNG first"));
            }
            other => panic!("expected unsupported webp, got {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_names_the_extension() {
        match SourceFormat::from_tag(".GIF") {
            Err(AssembleError::UnsupportedFormat {
                extension,
                remediation: None,
            }) => assert_eq!(extension, "gif"),
            other => panic!("expected unsupported gif, got {other:?}"),
        }
    }

    #[test]
    fn empty_tag_is_unsupported() {
        let err = SourceFormat::from_tag("").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported image format: (none)");
    }

    #[test]
    fn native_decoders() {
        assert_eq!(
            SourceFormat::Png.decoder(),
            Decoder::Native(image::ImageFormat::Png)
        );
        assert_eq!(
            SourceFormat::Jpeg.native().unwrap(),
            image::ImageFormat::Jpeg
        );
    }
}
