//! PDF page rasterization via pdfium
//!
//! Scanned EOBs carry no extractable text layer, so every page goes
//! straight to pixels: each page is rendered to an RGB image at a fixed
//! DPI, in document order, and handed to the OCR stage.

use crate::EobError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};

/// PDF points per inch - standard PostScript/PDF unit conversion factor.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Default render resolution. 200 DPI keeps label text crisp enough for
/// Tesseract without ballooning page bitmaps.
pub const DEFAULT_RENDER_DPI: u32 = 200;

/// Configuration for page rendering
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Render resolution in dots per inch
    pub dpi: u32,
    /// Directory holding the pdfium dynamic library; `None` tries the
    /// working directory and then the system library path
    pub library_dir: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_RENDER_DPI,
            library_dir: None,
        }
    }
}

/// pdfium-backed page renderer
pub struct PageRenderer {
    pdfium: Pdfium,
    config: RenderConfig,
}

impl PageRenderer {
    /// Bind the pdfium library and build a renderer.
    ///
    /// Binding tries the configured library directory (or the working
    /// directory) first, then falls back to the system library.
    pub fn new(config: RenderConfig) -> Result<Self, EobError> {
        let search_dir = config
            .library_dir
            .as_deref()
            .map(|d| d.to_string_lossy().into_owned())
            .unwrap_or_else(|| "./".to_string());

        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
            &search_dir,
        ))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| EobError::Render(format!("failed to bind pdfium library: {}", e)))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
            config,
        })
    }

    /// Render every page of `path` to an RGB image, in page order.
    pub fn render_pages<P: AsRef<Path>>(&self, path: P) -> Result<Vec<DynamicImage>, EobError> {
        let path = path.as_ref();
        let document = self.pdfium.load_pdf_from_file(path, None).map_err(|e| {
            EobError::Render(format!("failed to load {}: {}", path.display(), e))
        })?;

        let scale = self.config.dpi as f32 / PDF_POINTS_PER_INCH;
        let mut pages = Vec::with_capacity(document.pages().len() as usize);

        for (i, page) in document.pages().iter().enumerate() {
            let render_config = PdfRenderConfig::new()
                .set_target_width((page.width().value * scale) as i32)
                .set_target_height((page.height().value * scale) as i32);

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                EobError::Render(format!("failed to render page {}: {}", i + 1, e))
            })?;

            pages.push(bitmap.as_image());
        }

        Ok(pages)
    }
}
