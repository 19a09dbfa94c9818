use eob_extractor::{OcrConfig, OcrEngine, PageRenderer, RenderConfig};
use image::GenericImageView;
use std::env;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: debug_ocr <pdf_path> [dpi]");
        eprintln!("Renders each page and dumps the raw OCR text.");
        std::process::exit(1);
    }

    let mut render_config = RenderConfig::default();
    if let Some(dpi) = args.get(2) {
        render_config.dpi = dpi.parse().unwrap_or(render_config.dpi);
    }

    let renderer = PageRenderer::new(render_config).expect("Failed to bind pdfium");
    let ocr = OcrEngine::new(OcrConfig::default()).expect("Failed to initialize Tesseract");

    let pages = renderer.render_pages(&args[1]).expect("Failed to render PDF");
    for (i, page) in pages.iter().enumerate() {
        let (width, height) = page.dimensions();
        println!("=== PAGE {} ({}x{}) ===", i + 1, width, height);
        match ocr.recognize(page) {
            Ok(text) => println!("{}", text),
            Err(e) => println!("  [OCR error: {}]", e),
        }
        println!();
    }
}
