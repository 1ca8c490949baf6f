// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Splitting stored documents into decoded pages
//!
//! Images decode to a single page. PDFs are rendered with pdfium (the
//! `pdf` feature) and only the first [`MAX_DOCUMENT_PAGES`] pages are
//! kept; registration forms carry everything on the first two.

use tracing::debug;

use super::image_utils::{decode_image_bytes, is_pdf, to_source_page, ImageError, SourcePage};

/// Pages read from a multi-page document
pub const MAX_DOCUMENT_PAGES: usize = 2;

/// Target render width for PDF pages, roughly 200 DPI on A4
#[cfg_attr(not(feature = "pdf"), allow(dead_code))]
const PDF_RENDER_WIDTH: i32 = 1654;

/// Decode a stored document into at most [`MAX_DOCUMENT_PAGES`] pages
///
/// `name_hint` is the object path; a `.pdf` suffix is treated as PDF
/// even when the header is missing.
pub fn load_pages(bytes: &[u8], name_hint: &str) -> Result<Vec<SourcePage>, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    if is_pdf(bytes) || name_hint.to_lowercase().ends_with(".pdf") {
        let pages = render_pdf_pages(bytes)?;
        debug!("Rendered {} PDF page(s) from {}", pages.len(), name_hint);
        return Ok(pages);
    }

    let (image, info) = decode_image_bytes(bytes)?;
    debug!(
        "Decoded {} as {:?} {}x{}",
        name_hint, info.format, info.width, info.height
    );
    Ok(vec![to_source_page(image)])
}

#[cfg(feature = "pdf")]
fn render_pdf_pages(bytes: &[u8]) -> Result<Vec<SourcePage>, ImageError> {
    use pdfium_render::prelude::*;

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ImageError::PdfRender(format!("failed to bind pdfium: {}", e)))?;
    let pdfium = Pdfium::new(bindings);

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ImageError::PdfRender(e.to_string()))?;

    let config = PdfRenderConfig::new().set_target_width(PDF_RENDER_WIDTH);

    let mut pages = Vec::new();
    for page in document.pages().iter().take(MAX_DOCUMENT_PAGES) {
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| ImageError::PdfRender(e.to_string()))?;
        pages.push(to_source_page(bitmap.as_image()));
    }

    if pages.is_empty() {
        return Err(ImageError::PdfRender("document has no pages".to_string()));
    }

    Ok(pages)
}

#[cfg(not(feature = "pdf"))]
fn render_pdf_pages(_bytes: &[u8]) -> Result<Vec<SourcePage>, ImageError> {
    Err(ImageError::UnsupportedFormat)
}
