//! OCR backends.
//!
//! The pipeline only needs "image in, text out", which is what
//! [`OcrBackend`] describes. The shipped implementation wraps
//! `pure-onnx-ocr` (PaddleOCR models run in pure Rust) behind the
//! `onnx-ocr` feature.

#[cfg(feature = "onnx-ocr")]
mod pure_engine;

#[cfg(feature = "onnx-ocr")]
pub use pure_engine::PureOcrEngine;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Recognizes text in an image.
pub trait OcrBackend {
    /// Run OCR and return the recognized text in reading order.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        (**self).recognize(image)
    }
}

/// A recognized span of text and the axis-aligned box around it, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub text: String,
    pub confidence: f32,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl TextBox {
    fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }
}

/// Everything one OCR pass produced for an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    /// Boxes in reading order.
    pub boxes: Vec<TextBox>,
    /// Lines of the page, joined with `\n`; boxes on a line are joined with a space.
    pub text: String,
    pub elapsed_ms: u64,
    pub image_size: (u32, u32),
}

impl OcrResult {
    /// Order boxes into lines and render the page text.
    ///
    /// A box belongs to the current line while its vertical center lies
    /// inside the line's vertical extent.
    pub fn from_boxes(mut boxes: Vec<TextBox>, elapsed_ms: u64, image_size: (u32, u32)) -> Self {
        boxes.retain(|b| !b.text.trim().is_empty());
        boxes.sort_by(|a, b| a.top.total_cmp(&b.top));

        let mut lines: Vec<Vec<TextBox>> = Vec::new();
        let mut extent = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for text_box in boxes {
            let c = text_box.center_y();
            match lines.last_mut() {
                Some(line) if c >= extent.0 && c <= extent.1 => {
                    extent.1 = extent.1.max(text_box.bottom);
                    line.push(text_box);
                }
                _ => {
                    extent = (text_box.top, text_box.bottom);
                    lines.push(vec![text_box]);
                }
            }
        }

        let mut text = String::new();
        let mut ordered = Vec::new();
        for mut line in lines {
            line.sort_by(|a, b| a.left.total_cmp(&b.left));
            if !text.is_empty() {
                text.push('\n');
            }
            let words: Vec<&str> = line.iter().map(|b| b.text.trim()).collect();
            text.push_str(&words.join(" "));
            ordered.extend(line);
        }

        Self {
            boxes: ordered,
            text,
            elapsed_ms,
            image_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_box(left: f32, top: f32, text: &str) -> TextBox {
        TextBox {
            text: text.to_string(),
            confidence: 0.9,
            left,
            top,
            right: left + 50.0,
            bottom: top + 12.0,
        }
    }

    #[test]
    fn test_reading_order() {
        let result = OcrResult::from_boxes(
            vec![
                text_box(10.0, 60.0, "Vendor: Acme"),
                text_box(200.0, 5.0, "#123"),
                text_box(10.0, 2.0, "INVOICE"),
                text_box(300.0, 90.0, " "),
            ],
            12,
            (400, 200),
        );
        assert_eq!(result.text, "INVOICE #123\nVendor: Acme");
        assert_eq!(result.boxes.len(), 3);
        assert_eq!(result.boxes[1].text, "#123");
    }

    #[test]
    fn test_empty_page() {
        let result = OcrResult::from_boxes(Vec::new(), 0, (10, 10));
        assert!(result.text.is_empty());
    }
}
