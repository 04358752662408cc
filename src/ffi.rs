//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Memory management
//! - Buffers returned by `imgforge_*` functions are allocated on the Rust heap.
//! - Callers **must** free them with `imgforge_free_buffer` / `imgforge_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int` (0 = success, non-zero = error).
//! - Error details can be retrieved via `imgforge_last_error`; the message
//!   always starts with `Failed to generate PDF:` for assembly failures.
//!
//! ## Thread safety
//! - `imgforge_last_error` uses a thread-local, so it is safe to call from
//!   multiple threads.
//!
//! ## Usage from Go (cgo)
//! ```go
//! // #cgo LDFLAGS: -limg_forge
//! // #include "imgforge.h"
//! import "C"
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

use crate::input::ImageInput;
use crate::layout_config::PageEnvelope;
use crate::pipeline::{Assembler, AssemblerConfig};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Return codes.
const OK: c_int = 0;
const ERR_NULL_POINTER: c_int = 1;
const ERR_INVALID_INPUT: c_int = 2;
const ERR_GENERATE: c_int = 3;

// ---------------------------------------------------------------------------
// C-compatible types
// ---------------------------------------------------------------------------

/// One input image.
///
/// The format is declared by the extension of `name` (e.g. `scan.png`), or by
/// `mime` when it is a non-null `image/*` type.
#[repr(C)]
pub struct ImgforgeImage {
    /// Null-terminated UTF-8 file name.
    pub name: *const c_char,
    /// Optional null-terminated MIME type; `NULL` to use the extension.
    pub mime: *const c_char,
    /// Pointer to the encoded image bytes.
    pub data: *const u8,
    /// Length of `data` in bytes.
    pub len: u32,
}

/// Optional configuration passed to the `*_ex` functions.
///
/// Fields set to `0` (or `NULL` for `title`) fall back to their defaults:
/// - `max_width`  → 595 pt
/// - `max_height` → 842 pt
/// - `title`      → "img-forge output"
#[repr(C)]
pub struct ImgforgeConfig {
    /// Null-terminated UTF-8 document title. `NULL` for the default.
    pub title: *const c_char,
    /// Page envelope width in points. `0.0` for A4.
    pub max_width: f32,
    /// Page envelope height in points. `0.0` for A4.
    pub max_height: f32,
}

/// Convert an `ImgforgeConfig` (FFI) to an `AssemblerConfig` (Rust).
///
/// # Safety
/// `cfg.title`, if non-null, must point to a valid null-terminated string.
unsafe fn assembler_config_from_c(cfg: &ImgforgeConfig) -> AssemblerConfig {
    let defaults = AssemblerConfig::default();
    let a4 = PageEnvelope::a4();

    let title = if cfg.title.is_null() {
        defaults.title.clone()
    } else {
        CStr::from_ptr(cfg.title).to_string_lossy().into_owned()
    };
    let max_width = if cfg.max_width > 0.0 { cfg.max_width } else { a4.max_width };
    let max_height = if cfg.max_height > 0.0 { cfg.max_height } else { a4.max_height };

    AssemblerConfig {
        title,
        envelope: PageEnvelope {
            max_width,
            max_height,
        },
        ..defaults
    }
}

/// Copy the C image array into owned [`ImageInput`]s.
///
/// # Safety
/// `images` must point to `count` valid `ImgforgeImage` values whose pointers
/// satisfy the documented contract.
unsafe fn inputs_from_c(images: *const ImgforgeImage, count: u32) -> Result<Vec<ImageInput>, String> {
    let mut inputs = Vec::with_capacity(count as usize);
    if count == 0 {
        return Ok(inputs);
    }
    for (index, image) in slice::from_raw_parts(images, count as usize).iter().enumerate() {
        if image.data.is_null() && image.len > 0 {
            return Err(format!("Image #{index} has a null data pointer"));
        }
        let name = if image.name.is_null() {
            String::new()
        } else {
            CStr::from_ptr(image.name)
                .to_str()
                .map_err(|e| format!("Image #{index} name is not UTF-8: {e}"))?
                .to_string()
        };
        let bytes = if image.len == 0 {
            Vec::new()
        } else {
            slice::from_raw_parts(image.data, image.len as usize).to_vec()
        };
        let mut input = ImageInput::new(name, bytes);
        if !image.mime.is_null() {
            input = input.with_mime(CStr::from_ptr(image.mime).to_string_lossy().into_owned());
        }
        inputs.push(input);
    }
    Ok(inputs)
}

/// Hand a PDF buffer over to the caller.
unsafe fn export_buffer(bytes: Vec<u8>, out_buf: *mut *mut u8, out_len: *mut u32) {
    let len = bytes.len() as u32;
    let buf = bytes.into_boxed_slice();
    *out_buf = Box::into_raw(buf) as *mut u8;
    *out_len = len;
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Assemble images into an in-memory PDF with the default configuration.
///
/// # Parameters
/// - `images`: pointer to `count` [`ImgforgeImage`] values, in page order
/// - `count`: number of images
/// - `out_buf`: on success, receives a pointer to heap-allocated PDF bytes
/// - `out_len`: on success, receives the length of the PDF buffer
///
/// # Returns
/// `0` on success, non-zero on error. On error, call `imgforge_last_error`.
///
/// # Safety
/// - `images` must point to `count` valid entries (it may be null when `count` is 0).
/// - `out_buf` and `out_len` must be valid pointers.
/// - The caller must free `*out_buf` by calling `imgforge_free_buffer`.
#[no_mangle]
pub unsafe extern "C" fn imgforge_generate_pdf(
    images: *const ImgforgeImage,
    count: u32,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    imgforge_generate_pdf_ex(images, count, ptr::null(), out_buf, out_len)
}

/// Assemble images into an in-memory PDF with a custom [`ImgforgeConfig`].
///
/// # Safety
/// Same as `imgforge_generate_pdf`. `cfg`, if non-null, must point to a
/// fully-initialised [`ImgforgeConfig`].
#[no_mangle]
pub unsafe extern "C" fn imgforge_generate_pdf_ex(
    images: *const ImgforgeImage,
    count: u32,
    cfg: *const ImgforgeConfig,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if (images.is_null() && count > 0) || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL_POINTER;
    }

    let inputs = match inputs_from_c(images, count) {
        Ok(inputs) => inputs,
        Err(e) => {
            set_last_error(&e);
            return ERR_INVALID_INPUT;
        }
    };

    let config = if cfg.is_null() {
        AssemblerConfig::default()
    } else {
        assembler_config_from_c(&*cfg)
    };

    match Assembler::new(config).render(inputs) {
        Ok(document) => {
            export_buffer(document.bytes, out_buf, out_len);
            OK
        }
        Err(e) => {
            set_last_error(&e.to_string());
            ERR_GENERATE
        }
    }
}

/// Compute only the page layout (no PDF rendering). Returns JSON.
///
/// # Safety
/// - `images` must point to `count` valid entries.
/// - `*out_json_ptr` must be freed with `imgforge_free_string`.
#[no_mangle]
pub unsafe extern "C" fn imgforge_compute_layout(
    images: *const ImgforgeImage,
    count: u32,
    out_json_ptr: *mut *mut c_char,
) -> c_int {
    if (images.is_null() && count > 0) || out_json_ptr.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL_POINTER;
    }

    let inputs = match inputs_from_c(images, count) {
        Ok(inputs) => inputs,
        Err(e) => {
            set_last_error(&e);
            return ERR_INVALID_INPUT;
        }
    };

    match Assembler::default().plan(&inputs) {
        Ok(layout) => match CString::new(layout.to_json()) {
            Ok(cs) => {
                *out_json_ptr = cs.into_raw();
                OK
            }
            Err(_) => {
                set_last_error("JSON contained null byte");
                ERR_GENERATE
            }
        },
        Err(e) => {
            set_last_error(&e.to_string());
            ERR_GENERATE
        }
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer returned by `imgforge_generate_pdf`.
///
/// # Safety
/// `buf` must have been returned by a previous `imgforge_generate_pdf*`
/// call, and `len` must be the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn imgforge_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a layout JSON string.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn imgforge_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `imgforge_*` call on the same
/// thread. The caller should **not** free this pointer.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn imgforge_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn imgforge_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbImage};

    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn last_error() -> String {
        let ptr = imgforge_last_error();
        assert!(!ptr.is_null());
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string()
    }

    #[test]
    fn ffi_generate_pdf() {
        let data = png_bytes(64, 48);
        let name = CString::new("page.png").unwrap();
        let images = [ImgforgeImage {
            name: name.as_ptr(),
            mime: ptr::null(),
            data: data.as_ptr(),
            len: data.len() as u32,
        }];
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe { imgforge_generate_pdf(images.as_ptr(), 1, &mut out_buf, &mut out_len) };

        assert_eq!(rc, 0, "Expected success");
        assert!(!out_buf.is_null());
        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert_eq!(&bytes[0..5], b"%PDF-");
        unsafe { imgforge_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn ffi_compute_layout_keeps_input_order() {
        let small = png_bytes(100, 50);
        let big = png_bytes(1190, 1684);
        let names = [CString::new("small.png").unwrap(), CString::new("big").unwrap()];
        let mime = CString::new("image/png").unwrap();
        let images = [
            ImgforgeImage {
                name: names[0].as_ptr(),
                mime: ptr::null(),
                data: small.as_ptr(),
                len: small.len() as u32,
            },
            ImgforgeImage {
                name: names[1].as_ptr(),
                mime: mime.as_ptr(),
                data: big.as_ptr(),
                len: big.len() as u32,
            },
        ];
        let mut json_ptr: *mut c_char = ptr::null_mut();

        let rc = unsafe { imgforge_compute_layout(images.as_ptr(), 2, &mut json_ptr) };

        assert_eq!(rc, 0);
        let json = unsafe { CStr::from_ptr(json_ptr) }.to_str().unwrap().to_string();
        unsafe { imgforge_free_string(json_ptr) };

        let layout = crate::layout_config::LayoutConfig::from_json(&json).unwrap();
        assert_eq!(layout.pages.len(), 2);
        assert_eq!(layout.pages[0].source, "small.png");
        assert_eq!(layout.pages[0].page_width, 100.0);
        assert_eq!(layout.pages[1].source, "big");
        assert_eq!(layout.pages[1].page_width, 595.0);
    }

    #[test]
    fn ffi_empty_input_reports_error() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe { imgforge_generate_pdf(ptr::null(), 0, &mut out_buf, &mut out_len) };

        assert_eq!(rc, ERR_GENERATE);
        assert!(out_buf.is_null());
        assert_eq!(
            last_error(),
            "Failed to generate PDF: No images provided for PDF generation"
        );
    }

    #[test]
    fn ffi_null_output_pointer() {
        let rc = unsafe { imgforge_generate_pdf(ptr::null(), 0, ptr::null_mut(), ptr::null_mut()) };
        assert_eq!(rc, ERR_NULL_POINTER);
    }

    #[test]
    fn ffi_webp_is_rejected_with_hint() {
        let data = [0u8; 32];
        let name = CString::new("photo.webp").unwrap();
        let images = [ImgforgeImage {
            name: name.as_ptr(),
            mime: ptr::null(),
            data: data.as_ptr(),
            len: data.len() as u32,
        }];
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe { imgforge_generate_pdf(images.as_ptr(), 1, &mut out_buf, &mut out_len) };

        assert_eq!(rc, ERR_GENERATE);
        assert!(last_error().contains("Please convert to JPG or PNG first"));
    }

    #[test]
    fn ffi_generate_pdf_ex_custom_envelope() {
        let data = png_bytes(400, 400);
        let name = CString::new("square.png").unwrap();
        let title = CString::new("Small pages").unwrap();
        let images = [ImgforgeImage {
            name: name.as_ptr(),
            mime: ptr::null(),
            data: data.as_ptr(),
            len: data.len() as u32,
        }];
        let cfg = ImgforgeConfig {
            title: title.as_ptr(),
            max_width: 200.0,
            max_height: 0.0, // default
        };
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            imgforge_generate_pdf_ex(images.as_ptr(), 1, &cfg, &mut out_buf, &mut out_len)
        };

        assert_eq!(rc, 0);
        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert_eq!(&bytes[0..5], b"%PDF-");
        unsafe { imgforge_free_buffer(out_buf, out_len) };

        let config = unsafe { assembler_config_from_c(&cfg) };
        assert_eq!(config.title, "Small pages");
        assert_eq!(config.envelope.max_width, 200.0);
        assert_eq!(config.envelope.max_height, 842.0);
    }

    #[test]
    fn ffi_version() {
        let v = imgforge_version();
        let version = unsafe { CStr::from_ptr(v) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}
