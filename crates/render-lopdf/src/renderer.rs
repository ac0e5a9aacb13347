use crate::helpers::{self, BODY_FONT};
use crate::writer::BufferedPdfWriter;
use collate_render_core::{DocumentInfo, DocumentWriter, Picture, RenderError};
use log::debug;
use lopdf::{dictionary, Dictionary, Object};
use std::io::Cursor;
use std::sync::Arc;

/// Standard Type1 font every reader ships with.
const BASE_FONT: &str = "Helvetica";

/// Writes composed pages as a PDF document, one page per picture.
///
/// The output only depends on the pictures and the document info, so the
/// same composition always produces the same bytes.
#[derive(Debug, Clone)]
pub struct LopdfDocumentWriter {
    pdf_version: String,
}

impl Default for LopdfDocumentWriter {
    fn default() -> Self {
        Self { pdf_version: "1.7".to_string() }
    }
}

impl LopdfDocumentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pdf_version(mut self, version: impl Into<String>) -> Self {
        self.pdf_version = version.into();
        self
    }

    fn font_dict() -> Dictionary {
        let mut font_dict = Dictionary::new();
        let single_font_dict = dictionary! {
            "Type" => "Font", "Subtype" => "Type1", "BaseFont" => BASE_FONT, "Encoding" => "WinAnsiEncoding",
        };
        font_dict.set(BODY_FONT, Object::Dictionary(single_font_dict));
        font_dict
    }
}

#[cfg(not(feature = "parallel-render"))]
fn encode_pages(pages: &[Arc<Picture>]) -> Result<Vec<Vec<u8>>, RenderError> {
    pages
        .iter()
        .map(|page| helpers::render_picture_to_content(page).encode().map_err(pdf_error))
        .collect()
}

#[cfg(feature = "parallel-render")]
fn encode_pages(pages: &[Arc<Picture>]) -> Result<Vec<Vec<u8>>, RenderError> {
    use rayon::prelude::*;

    pages
        .par_iter()
        .map(|page| helpers::render_picture_to_content(page).encode().map_err(pdf_error))
        .collect()
}

fn pdf_error(err: lopdf::Error) -> RenderError {
    RenderError::Pdf(err.to_string())
}

impl DocumentWriter for LopdfDocumentWriter {
    fn write_document(&self, pages: &[Arc<Picture>], info: &DocumentInfo) -> Result<Vec<u8>, RenderError> {
        if pages.is_empty() {
            return Err(RenderError::NoPages);
        }

        let encoded = encode_pages(pages)?;
        let mut writer = BufferedPdfWriter::new(Cursor::new(Vec::new()), &self.pdf_version, Self::font_dict())?;

        for (page, stream) in pages.iter().zip(encoded) {
            let content_id = writer.buffer_encoded_stream(stream);
            let page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => writer.pages_id,
                "MediaBox" => vec![0.0.into(), 0.0.into(), page.size.width.into(), page.size.height.into()],
                "Contents" => Object::Reference(content_id),
                "Resources" => writer.resources_id,
            };
            let page_id = writer.buffer_object(page_dict.into());
            writer.push_page_id(page_id);
        }

        if let Some(title) = &info.title {
            writer.set_info_entry("Title", title);
        }
        if let Some(url) = &info.source_url {
            writer.set_info_entry("Subject", url);
        }
        writer.set_info_entry("Producer", "collate");

        debug!("[PDF] Writing document with {} pages.", writer.page_count());
        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}
