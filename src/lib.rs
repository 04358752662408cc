//! # img-forge – images → multi-page PDF
//!
//! Converts an ordered list of PNG/JPEG images into one PDF with one image per
//! page. The pipeline stages are:
//!
//! 1. **Dispatch** – declared format tag → supported format ([`format`])
//! 2. **Decode** – bytes → pixels and pixel dimensions ([`decode`])
//! 3. **Layout** – fit each image into the page envelope ([`layout_config`])
//! 4. **Render** – append pages and serialise via printpdf ([`render`])
//! 5. **Persist** – write the PDF under a unique name ([`artifact`])
//!
//! [`pipeline::Assembler`] runs all of them. A C-compatible FFI surface is
//! exposed via the [`ffi`] module.

pub mod artifact;
pub mod decode;
pub mod error;
pub mod ffi;
pub mod format;
pub mod input;
pub mod layout_config;
pub mod pipeline;
pub mod render;

// Re-exports for convenience
pub use artifact::{Artifact, RenderedDocument};
pub use error::{AssembleError, ErrorResponse, GenerateError};
pub use format::SourceFormat;
pub use input::{ImageInput, UploadLimits};
pub use layout_config::{LayoutConfig, PageEnvelope, PageLayout};
pub use pipeline::{compute_layout, generate_pdf, Assembler, AssemblerConfig, CancelToken};
