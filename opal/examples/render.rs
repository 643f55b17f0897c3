//! Render one page of a PDF file to a PNG.
//!
//! Usage: `render <input.pdf> [page] [output.png]`

use opal::{Document, RenderOptions};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);

    let Some(input) = args.next() else {
        eprintln!("usage: render <input.pdf> [page] [output.png]");

        return ExitCode::from(1);
    };

    let page: usize = args
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);

    let output = args.next().unwrap_or_else(|| "out.png".to_string());

    let doc = match Document::open(&input) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("failed to open {input}: {e}");

            return ExitCode::from(1);
        }
    };

    eprintln!("{input}: {} pages, version {}", doc.page_count(), doc.version());

    let pixmap = match doc.render(page, &RenderOptions::default()) {
        Ok(pixmap) => pixmap,
        Err(e) => {
            eprintln!("failed to render page {page}: {e}");

            return ExitCode::from(1);
        }
    };

    let (width, height) = (pixmap.width(), pixmap.height());

    let Some(buffer) = image::RgbaImage::from_raw(width, height, pixmap.into_vec()) else {
        eprintln!("failed to build image buffer");

        return ExitCode::from(1);
    };

    if let Err(e) = buffer.save(&output) {
        eprintln!("failed to write {output}: {e}");

        return ExitCode::from(1);
    }

    eprintln!("wrote {output} ({width}x{height})");

    ExitCode::SUCCESS
}
