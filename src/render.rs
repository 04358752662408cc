//! PDF renderer – appends one image page at a time and serialises the
//! finished document with `printpdf` (v0.8 ops-based API).

use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, XObjectTransform,
};

use crate::decode::DecodedImage;
use crate::error::AssembleError;
use crate::layout_config::{LayoutConfig, PageEnvelope, PageLayout};

/// Points → millimetres.
const PT_TO_MM: f32 = 0.352778;

/// Builds a PDF incrementally, one page per decoded image.
///
/// Pages are only ever appended, so page order is the order of
/// [`DocumentBuilder::append`] calls.
pub struct DocumentBuilder {
    doc: PdfDocument,
    pages: Vec<PdfPage>,
    layout: LayoutConfig,
}

impl DocumentBuilder {
    pub fn new(title: &str, envelope: PageEnvelope) -> Self {
        Self {
            doc: PdfDocument::new(title),
            pages: Vec::new(),
            layout: LayoutConfig::new(title, envelope),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Fit `image` into the envelope and append it as a new page.
    ///
    /// The decoded pixels are moved into the document's image resources and
    /// dropped from `image` here.
    pub fn append(&mut self, image: DecodedImage) -> &PageLayout {
        let page = self
            .layout
            .push_page(&image.source, image.width, image.height)
            .clone();

        let xobj_id = self.doc.add_image(&image.raw);

        // PDF origin is bottom-left. At dpi=72 printpdf renders 1 px = 1 pt,
        // so the layout scale maps pixels straight to placed points.
        let ops = vec![Op::UseXobject {
            id: xobj_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(page.offset_x)),
                translate_y: Some(Pt(page.offset_y)),
                dpi: Some(72.0),
                scale_x: Some(page.image_width / image.width as f32),
                scale_y: Some(page.image_height / image.height as f32),
                rotate: None,
            },
        }];

        log::debug!(
            "page {}: {} {}x{} px -> {:.1}x{:.1} pt on {:.1}x{:.1} pt page",
            page.page_index + 1,
            page.source,
            page.px_width,
            page.px_height,
            page.image_width,
            page.image_height,
            page.page_width,
            page.page_height,
        );

        self.pages.push(PdfPage::new(
            Mm(page.page_width * PT_TO_MM),
            Mm(page.page_height * PT_TO_MM),
            ops,
        ));

        &self.layout.pages[self.layout.pages.len() - 1]
    }

    /// Serialise the document. Consumes the builder.
    pub fn finish(self) -> Result<(Vec<u8>, LayoutConfig), AssembleError> {
        let Self {
            mut doc,
            pages,
            layout,
        } = self;

        if pages.is_empty() {
            return Err(AssembleError::Serialization(
                "document has no pages".to_string(),
            ));
        }

        doc.with_pages(pages);
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        for warning in &warnings {
            log::warn!("pdf save: {warning:?}");
        }

        if !bytes.starts_with(b"%PDF-") {
            return Err(AssembleError::Serialization(format!(
                "encoder produced {} bytes without a PDF header",
                bytes.len()
            )));
        }
        Ok((bytes, layout))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbaImage};

    use super::*;
    use crate::decode::decode;
    use crate::input::ImageInput;

    fn png(width: u32, height: u32) -> ImageInput {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([200, 30, 30, 255]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        ImageInput::new(format!("{width}x{height}.png"), buf)
    }

    #[test]
    fn empty_document_is_a_serialization_error() {
        let builder = DocumentBuilder::new("empty", PageEnvelope::a4());
        assert!(matches!(
            builder.finish(),
            Err(AssembleError::Serialization(_))
        ));
    }

    #[test]
    fn renders_one_page_per_image() {
        let mut builder = DocumentBuilder::new("pages", PageEnvelope::a4());
        for (i, input) in [png(20, 10), png(1200, 900)].iter().enumerate() {
            builder.append(decode(input, i).unwrap());
        }
        assert_eq!(builder.page_count(), 2);

        let (bytes, layout) = builder.finish().unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
        assert_eq!(layout.pages.len(), 2);
        assert_eq!(layout.pages[0].source, "20x10.png");
        assert_eq!(layout.pages[1].page_width, 595.0);
    }

    #[test]
    fn append_returns_fitted_page() {
        let mut builder = DocumentBuilder::new("fit", PageEnvelope::a4());
        let page = builder.append(decode(&png(300, 300), 0).unwrap());
        assert_eq!((page.page_width, page.page_height), (300.0, 300.0));
        assert_eq!((page.offset_x, page.offset_y), (0.0, 0.0));
    }
}
