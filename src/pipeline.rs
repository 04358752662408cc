//! Pipeline – ties together format dispatch, decoding, layout, rendering and
//! persistence into a single call.
//!
//! ```no_run
//! use img_forge::{Assembler, AssemblerConfig, ImageInput};
//!
//! let assembler = Assembler::new(AssemblerConfig::with_output_dir("uploads"));
//! let images = vec![ImageInput::new("cover.png", std::fs::read("cover.png")?)];
//! let artifact = assembler.assemble(images)?;
//! println!("{}", artifact.path.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::artifact::{Artifact, ArtifactStore, RenderedDocument};
#[cfg(feature = "parallel")]
use crate::decode::DecodedImage;
use crate::decode::{decode, probe, source_name};
use crate::error::{AssembleError, GenerateError};
use crate::input::{ImageInput, UploadLimits};
use crate::layout_config::{LayoutConfig, PageEnvelope};
use crate::render::DocumentBuilder;

/// Configuration for the assembler.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Directory artifacts are written to (default: `uploads`).
    pub output_dir: PathBuf,
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Largest page a scaled image is placed on (default: A4, 595 × 842 pt).
    pub envelope: PageEnvelope,
    /// Request limits to enforce before decoding. `None` enforces nothing.
    pub limits: Option<UploadLimits>,
    /// Decode all images on the rayon pool before building pages. Only takes
    /// effect with the `parallel` feature.
    pub parallel_decode: bool,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("uploads"),
            title: "img-forge output".to_string(),
            envelope: PageEnvelope::a4(),
            limits: None,
            parallel_decode: false,
        }
    }
}

impl AssemblerConfig {
    pub fn with_output_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: dir.into(),
            ..Self::default()
        }
    }
}

/// Cooperative cancellation flag shared between a caller and an in-flight
/// assembly.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<(), AssembleError> {
        if self.is_cancelled() {
            Err(AssembleError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Turns an ordered list of images into one PDF, one page per image.
///
/// An `Assembler` holds no per-call state; share it freely across threads.
#[derive(Debug, Clone)]
pub struct Assembler {
    config: AssemblerConfig,
    store: ArtifactStore,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(AssemblerConfig::default())
    }
}

impl Assembler {
    pub fn new(config: AssemblerConfig) -> Self {
        let store = ArtifactStore::new(config.output_dir.clone());
        Self { config, store }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Assemble `images` and persist the PDF in the output directory.
    pub fn assemble(&self, images: Vec<ImageInput>) -> Result<Artifact, GenerateError> {
        self.assemble_with_cancel(images, &CancelToken::new())
    }

    /// Like [`Assembler::assemble`], stopping early once `cancel` is set.
    pub fn assemble_with_cancel(
        &self,
        images: Vec<ImageInput>,
        cancel: &CancelToken,
    ) -> Result<Artifact, GenerateError> {
        self.build(images, cancel)
            .and_then(|document| {
                cancel.check()?;
                self.store.persist(document)
            })
            .map_err(report)
    }

    /// Assemble `images` in memory without persisting anything.
    pub fn render(&self, images: Vec<ImageInput>) -> Result<RenderedDocument, GenerateError> {
        self.render_with_cancel(images, &CancelToken::new())
    }

    pub fn render_with_cancel(
        &self,
        images: Vec<ImageInput>,
        cancel: &CancelToken,
    ) -> Result<RenderedDocument, GenerateError> {
        self.build(images, cancel).map_err(report)
    }

    /// Compute the page layout only (no PDF rendering) – useful for testing
    /// and previews.
    pub fn plan(&self, images: &[ImageInput]) -> Result<LayoutConfig, GenerateError> {
        self.plan_inner(images).map_err(report)
    }

    fn plan_inner(&self, images: &[ImageInput]) -> Result<LayoutConfig, AssembleError> {
        self.validate(images)?;
        let mut layout = LayoutConfig::new(self.config.title.clone(), self.config.envelope);
        for (index, input) in images.iter().enumerate() {
            let (_, width, height) = probe(input, index)?;
            layout.push_page(&source_name(input, index), width, height);
        }
        Ok(layout)
    }

    fn validate(&self, images: &[ImageInput]) -> Result<(), AssembleError> {
        if images.is_empty() {
            return Err(AssembleError::NoImages);
        }
        if let Some(limits) = &self.config.limits {
            limits.check(images)?;
        }
        Ok(())
    }

    fn build(
        &self,
        images: Vec<ImageInput>,
        cancel: &CancelToken,
    ) -> Result<RenderedDocument, AssembleError> {
        self.validate(&images)?;
        log::info!("assembling {} image(s) into a PDF", images.len());

        let mut builder = DocumentBuilder::new(&self.config.title, self.config.envelope);

        #[cfg(feature = "parallel")]
        {
            if self.config.parallel_decode {
                for image in decode_parallel(&images, cancel)? {
                    cancel.check()?;
                    builder.append(image);
                }
                let (bytes, layout) = builder.finish()?;
                return Ok(RenderedDocument { bytes, layout });
            }
        }

        // Sequential: each input is decoded, placed and released before the
        // next one is touched.
        for (index, input) in images.into_iter().enumerate() {
            cancel.check()?;
            let image = decode(&input, index)?;
            drop(input);
            builder.append(image);
        }

        let (bytes, layout) = builder.finish()?;
        Ok(RenderedDocument { bytes, layout })
    }
}

/// Decode every input on the rayon pool.
///
/// Results are collected by input index, so the returned order is the input
/// order regardless of which decode finishes first. Every input is attempted;
/// the error reported is the first one in input order.
#[cfg(feature = "parallel")]
fn decode_parallel(
    images: &[ImageInput],
    cancel: &CancelToken,
) -> Result<Vec<DecodedImage>, AssembleError> {
    use rayon::prelude::*;

    let results: Vec<Result<DecodedImage, AssembleError>> = images
        .par_iter()
        .enumerate()
        .map(|(index, input)| {
            cancel.check()?;
            decode(input, index)
        })
        .collect();
    results.into_iter().collect()
}

fn report(err: AssembleError) -> GenerateError {
    match &err {
        AssembleError::Cancelled => log::info!("PDF generation cancelled"),
        other => log::error!("PDF generation failed: {other}"),
    }
    GenerateError::from(err)
}

/// Convenience: render `images` in memory with the default configuration.
pub fn generate_pdf(images: Vec<ImageInput>) -> Result<RenderedDocument, GenerateError> {
    Assembler::default().render(images)
}

/// Convenience: compute the layout of `images` with the default configuration.
pub fn compute_layout(images: &[ImageInput]) -> Result<LayoutConfig, GenerateError> {
    Assembler::default().plan(images)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbImage};

    use super::*;

    fn encoded(name: &str, width: u32, height: u32, format: ImageFormat) -> ImageInput {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([0, 90, 40])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        ImageInput::new(name, buf)
    }

    #[test]
    fn pipeline_basic() {
        let doc = generate_pdf(vec![encoded("a.png", 40, 30, ImageFormat::Png)]).unwrap();
        assert_eq!(&doc.bytes[0..5], b"%PDF-");
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = generate_pdf(Vec::new()).unwrap_err();
        assert!(matches!(err.kind(), AssembleError::NoImages));
        assert!(err.to_string().starts_with("Failed to generate PDF: "));
    }

    #[test]
    fn limits_apply_only_when_configured() {
        let images = || vec![encoded("a.png", 4, 4, ImageFormat::Png); 3];

        assert!(Assembler::default().render(images()).is_ok());

        let limited = Assembler::new(AssemblerConfig {
            limits: Some(UploadLimits {
                max_images: 2,
                ..UploadLimits::default()
            }),
            ..AssemblerConfig::default()
        });
        let err = limited.render(images()).unwrap_err();
        assert!(err.kind().is_input_error());
    }

    #[test]
    fn plan_matches_render_layout() {
        let images = vec![
            encoded("wide.jpg", 1600, 400, ImageFormat::Jpeg),
            encoded("small.png", 120, 80, ImageFormat::Png),
        ];
        let planned = compute_layout(&images).unwrap();
        let rendered = generate_pdf(images).unwrap();
        assert_eq!(planned.pages, rendered.layout.pages);
    }

    #[test]
    fn cancelled_token_stops_before_decoding() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = Assembler::default()
            .render_with_cancel(vec![encoded("a.png", 4, 4, ImageFormat::Png)], &cancel)
            .unwrap_err();
        assert!(matches!(err.kind(), AssembleError::Cancelled));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_decode_keeps_input_order() {
        let images: Vec<ImageInput> = (1..=12)
            .map(|i| encoded(&format!("{i:02}.png"), 10 * i, 7 * i, ImageFormat::Png))
            .collect();
        let assembler = Assembler::new(AssemblerConfig {
            parallel_decode: true,
            ..AssemblerConfig::default()
        });
        let doc = assembler.render(images).unwrap();
        let sources: Vec<&str> = doc.layout.pages.iter().map(|p| p.source.as_str()).collect();
        let expected: Vec<String> = (1..=12).map(|i| format!("{i:02}.png")).collect();
        assert_eq!(sources, expected);
        for (i, page) in doc.layout.pages.iter().enumerate() {
            assert_eq!(page.page_index, i);
            assert_eq!(page.px_width, 10 * (i as u32 + 1));
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_decode_reports_first_failure_in_order() {
        let images = vec![
            encoded("ok.png", 5, 5, ImageFormat::Png),
            ImageInput::new("bad.png", vec![0u8; 8]),
            ImageInput::new("photo.webp", vec![0u8; 8]),
        ];
        let assembler = Assembler::new(AssemblerConfig {
            parallel_decode: true,
            ..AssemblerConfig::default()
        });
        let err = assembler.render(images).unwrap_err();
        assert!(matches!(err.kind(), AssembleError::Decode { name, .. } if name == "bad.png"));
    }
}
