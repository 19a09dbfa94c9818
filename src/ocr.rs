//! OCR over rendered page images using Tesseract
//!
//! Recognition runs in two stages: the page image is grayscaled and
//! binarized with a global Otsu threshold, then handed to Tesseract via
//! leptess. Scanned EOBs are high-contrast machine print, so the hard
//! black/white split measurably beats feeding Tesseract the raw render.

use crate::EobError;
use image::DynamicImage;
use image::GrayImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use leptess::{LepTess, Variable};

/// Configuration for the Tesseract adapter
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Tesseract language code (e.g., "eng")
    pub language: String,
    /// Explicit tessdata directory; `None` uses the engine's default lookup
    pub datapath: Option<String>,
    /// Page segmentation mode (Tesseract PSM; 3 = fully automatic)
    pub page_segmentation_mode: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            datapath: None,
            page_segmentation_mode: 3,
        }
    }
}

/// Grayscale + Otsu-binarize a rendered page.
///
/// Pure function, separate from recognition so the preprocessing can be
/// inspected and tested without a Tesseract install.
pub fn preprocess(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let level = otsu_level(&gray);
    threshold(&gray, level, ThresholdType::Binary)
}

/// Tesseract-backed text recognition for page images
pub struct OcrEngine {
    config: OcrConfig,
}

impl OcrEngine {
    /// Create the engine, verifying Tesseract can initialize with the
    /// configured language data.
    pub fn new(config: OcrConfig) -> Result<Self, EobError> {
        LepTess::new(config.datapath.as_deref(), &config.language).map_err(|e| {
            EobError::Ocr(format!(
                "failed to initialize Tesseract with language '{}': {}",
                config.language, e
            ))
        })?;
        Ok(Self { config })
    }

    /// Recognize the text on one rendered page.
    ///
    /// Returns whatever Tesseract produces, untrimmed; a blank page yields
    /// an empty (or whitespace-only) string, not an error.
    pub fn recognize(&self, image: &DynamicImage) -> Result<String, EobError> {
        let binarized = preprocess(image);

        let mut engine =
            LepTess::new(self.config.datapath.as_deref(), &self.config.language)
                .map_err(|e| EobError::Ocr(format!("failed to initialize Tesseract: {}", e)))?;
        engine
            .set_variable(
                Variable::TesseditPagesegMode,
                &self.config.page_segmentation_mode.to_string(),
            )
            .map_err(|e| EobError::Ocr(format!("failed to set page segmentation mode: {}", e)))?;

        // leptess wants encoded image bytes, so round the binarized page
        // through an in-memory PNG.
        let mut png_buf = std::io::Cursor::new(Vec::new());
        binarized
            .write_to(&mut png_buf, image::ImageFormat::Png)
            .map_err(|e| EobError::Ocr(format!("failed to encode page to PNG: {}", e)))?;
        engine
            .set_image_from_mem(png_buf.get_ref())
            .map_err(|e| EobError::Ocr(format!("failed to load page into Tesseract: {}", e)))?;

        engine
            .get_utf8_text()
            .map_err(|e| EobError::Ocr(format!("failed to read recognized text: {}", e)))
    }
}
