//! Layout config – the intermediate representation between decoding and PDF
//! rendering. It records exactly what size each page is and where its image
//! sits on it, and can be serialised to JSON for inspection.

use serde::{Deserialize, Serialize};

/// A4 width in points (1 pt = 1/72 inch), rounded to whole points.
pub const A4_WIDTH_PT: f32 = 595.0;
/// A4 height in points, rounded to whole points.
pub const A4_HEIGHT_PT: f32 = 842.0;

/// Upper bound for page dimensions. Smaller images get smaller pages;
/// larger images are scaled down to fit this envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope {
    pub max_width: f32,
    pub max_height: f32,
}

impl Default for PageEnvelope {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageEnvelope {
    pub fn a4() -> Self {
        Self {
            max_width: A4_WIDTH_PT,
            max_height: A4_HEIGHT_PT,
        }
    }
}

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "LayoutConfig::default_title")]
    pub title: String,
    pub envelope: PageEnvelope,
    /// One entry per input image, in input order.
    pub pages: Vec<PageLayout>,
}

/// Geometry of one page and the single image placed on it, in points.
///
/// Offsets are measured from the bottom-left corner of the page. Because the
/// image is centered the value is the same from the top-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    /// Name of the input image shown on this page.
    pub source: String,
    /// Pixel dimensions of the source image.
    pub px_width: u32,
    pub px_height: u32,
    pub page_width: f32,
    pub page_height: f32,
    pub image_width: f32,
    pub image_height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl PageLayout {
    /// Fit a `px_width × px_height` image into `envelope`.
    ///
    /// Pixels are treated numerically as points. An image that already fits
    /// gets a page of exactly its own size. Anything larger is scaled by
    /// `min(max_width / w, max_height / h)` onto a page the size of the
    /// envelope and centered.
    pub fn fit(px_width: u32, px_height: u32, envelope: &PageEnvelope) -> Self {
        let width = px_width as f32;
        let height = px_height as f32;

        let (page_width, page_height, image_width, image_height) =
            if width <= envelope.max_width && height <= envelope.max_height {
                (width, height, width, height)
            } else {
                let scale = (envelope.max_width / width).min(envelope.max_height / height);
                (
                    envelope.max_width,
                    envelope.max_height,
                    width * scale,
                    height * scale,
                )
            };

        Self {
            page_index: 0,
            source: String::new(),
            px_width,
            px_height,
            page_width,
            page_height,
            image_width,
            image_height,
            offset_x: (page_width - image_width) / 2.0,
            offset_y: (page_height - image_height) / 2.0,
        }
    }

    /// Points per source pixel (1.0 when the image was not scaled).
    pub fn scale(&self) -> f32 {
        if self.px_width == 0 {
            1.0
        } else {
            self.image_width / self.px_width as f32
        }
    }
}

impl LayoutConfig {
    pub fn new(title: impl Into<String>, envelope: PageEnvelope) -> Self {
        Self {
            title: title.into(),
            envelope,
            pages: Vec::new(),
        }
    }

    /// Fit the next image and append its page. Returns the new page.
    pub fn push_page(&mut self, source: &str, px_width: u32, px_height: u32) -> &PageLayout {
        let mut page = PageLayout::fit(px_width, px_height, &self.envelope);
        page.page_index = self.pages.len();
        page.source = source.to_string();
        self.pages.push(page);
        &self.pages[self.pages.len() - 1]
    }

    fn default_title() -> String {
        "img-forge output".to_string()
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::new(Self::default_title(), PageEnvelope::a4())
    }
}
