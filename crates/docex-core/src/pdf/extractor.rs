//! Text layer and page scan access for PDFs, via lopdf and pdf-extract.

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, trace};

use super::Result;
use crate::error::PdfError;

/// A parsed PDF whose pages are expected to carry one scanned image each.
pub struct ScannedPdf {
    doc: Document,
    /// Bytes handed to pdf-extract; re-serialized when the file was encrypted.
    bytes: Vec<u8>,
}

impl ScannedPdf {
    /// Parse a PDF from memory. Encrypted files are opened with the empty
    /// user password or rejected.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let bytes = if doc.is_encrypted() {
            doc.decrypt("").map_err(|_| PdfError::Encrypted)?;
            let mut plain = Vec::new();
            doc.save_to(&mut plain)
                .map_err(|e| PdfError::Parse(format!("re-saving decrypted PDF: {}", e)))?;
            debug!("Opened encrypted PDF with empty password");
            plain
        } else {
            data.to_vec()
        };

        if doc.get_pages().is_empty() {
            return Err(PdfError::NoPages);
        }

        Ok(Self { doc, bytes })
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// The embedded text layer of the whole document.
    pub fn text_layer(&self) -> Result<String> {
        pdf_extract::extract_text_from_mem(&self.bytes)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    /// The scan of a 1-based page: the largest decodable image it references.
    ///
    /// Some producers hang the images off the catalog instead of the page.
    /// In that case the page-th decodable image of the file is used.
    pub fn page_scan(&self, page: u32) -> Result<DynamicImage> {
        let page_id = *self
            .doc
            .get_pages()
            .get(&page)
            .ok_or(PdfError::InvalidPage(page))?;

        let on_page = self.page_images(page_id);
        trace!("Page {} references {} decodable images", page, on_page.len());

        let largest = on_page
            .into_iter()
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()));
        if let Some(img) = largest {
            return Ok(img);
        }

        self.doc
            .objects
            .values()
            .filter_map(|obj| match obj {
                Object::Stream(stream) => decode_image_stream(&self.doc, stream),
                _ => None,
            })
            .nth(page.saturating_sub(1) as usize)
            .ok_or_else(|| {
                PdfError::ImageExtraction(format!("no decodable image for page {}", page))
            })
    }

    fn page_images(&self, page_id: ObjectId) -> Vec<DynamicImage> {
        let Some(resources) = inherited_resources(&self.doc, page_id) else {
            return Vec::new();
        };
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| self.doc.dereference(obj).ok())
            .and_then(|(_, obj)| obj.as_dict().ok())
        else {
            return Vec::new();
        };

        xobjects
            .iter()
            .filter_map(|(_, reference)| self.doc.dereference(reference).ok())
            .filter_map(|(_, obj)| obj.as_stream().ok())
            .filter_map(|stream| decode_image_stream(&self.doc, stream))
            .collect()
    }
}

/// Walks up the page tree until a node carries `Resources`.
fn inherited_resources(doc: &Document, node: ObjectId) -> Option<Dictionary> {
    let dict = doc.get_dictionary(node).ok()?;
    if let Some((_, Object::Dictionary(resources))) = dict
        .get(b"Resources")
        .ok()
        .and_then(|obj| doc.dereference(obj).ok())
    {
        return Some(resources.clone());
    }
    let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
    inherited_resources(doc, parent)
}

/// First name of a `Name` or `[Name ...]` entry, resolving one reference.
fn leading_name<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a [u8]> {
    match obj {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(items) => items.first()?.as_name().ok(),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_name().ok(),
        _ => None,
    }
}

/// Decode an image XObject. JPEG streams are decoded as-is; other streams
/// must be 8-bit gray or RGB samples after the stream filters.
fn decode_image_stream(doc: &Document, stream: &Stream) -> Option<DynamicImage> {
    let dict = &stream.dict;
    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }
    let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;

    match dict.get(b"Filter").ok().and_then(|f| leading_name(doc, f)) {
        Some(b"DCTDecode") => {
            return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg).ok();
        }
        Some(b"JPXDecode" | b"CCITTFaxDecode" | b"JBIG2Decode") => {
            trace!("Skipping {}x{} image with unsupported filter", width, height);
            return None;
        }
        _ => {}
    }

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|b| b.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        trace!("Skipping {}x{} image with {} bits per component", width, height, bits);
        return None;
    }

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|cs| leading_name(doc, cs))
        .unwrap_or(b"DeviceRGB");
    let samples = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    samples_to_image(samples, width, height, color_space)
}

fn samples_to_image(
    mut samples: Vec<u8>,
    width: u32,
    height: u32,
    color_space: &[u8],
) -> Option<DynamicImage> {
    let pixels = width as usize * height as usize;
    match color_space {
        b"DeviceGray" | b"G" => {
            samples.truncate(pixels);
            GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8)
        }
        b"DeviceRGB" | b"RGB" => {
            samples.truncate(pixels * 3);
            RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8)
        }
        other => {
            trace!("Unsupported color space {}", String::from_utf8_lossy(other));
            None
        }
    }
}
