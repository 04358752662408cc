//! Decoding – turns an [`ImageInput`] into a [`DecodedImage`] through the
//! decoder its declared format dispatches to.

use printpdf::{PdfWarnMsg, RawImage};

use crate::error::AssembleError;
use crate::format::SourceFormat;
use crate::input::ImageInput;

/// A decoded image, ready to be placed on exactly one page.
pub struct DecodedImage {
    /// Identifier of the input (its name, or `#<index>` when unnamed).
    pub source: String,
    pub format: SourceFormat,
    /// Pixel width, always > 0.
    pub width: u32,
    /// Pixel height, always > 0.
    pub height: u32,
    /// Pixel data in the form printpdf embeds.
    pub raw: RawImage,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("source", &self.source)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// The name used to tag errors and pages for the input at `index`.
pub fn source_name(input: &ImageInput, index: usize) -> String {
    if input.name().is_empty() {
        format!("#{index}")
    } else {
        input.name().to_string()
    }
}

/// Dispatch and decode only far enough to learn the pixel dimensions.
///
/// The full pixel buffer is decoded so corrupt or truncated data is caught
/// here, not later at embedding time.
pub fn probe(input: &ImageInput, index: usize) -> Result<(SourceFormat, u32, u32), AssembleError> {
    let name = source_name(input, index);
    let format = input.format()?;
    let native = format.native()?;

    let img = image::load_from_memory_with_format(input.bytes(), native)
        .map_err(|e| AssembleError::decode(&name, e))?;
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(AssembleError::decode(
            &name,
            format!("image has no pixels ({width}x{height})"),
        ));
    }
    Ok((format, width, height))
}

/// Fully decode `input` into a [`DecodedImage`].
pub fn decode(input: &ImageInput, index: usize) -> Result<DecodedImage, AssembleError> {
    let (format, width, height) = probe(input, index)?;
    let source = source_name(input, index);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let raw = RawImage::decode_from_bytes(input.bytes(), &mut warnings)
        .map_err(|e| AssembleError::decode(&source, e))?;
    for warning in &warnings {
        log::warn!("{source}: {warning:?}");
    }

    log::debug!("decoded {source} as {} ({width}x{height})", format.tag());
    Ok(DecodedImage {
        source,
        format,
        width,
        height,
        raw,
    })
}
