//! Page rendering through poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use super::{temp_image_path, ImageFormat, PageRenderer, RenderedImage, SourceFile};
use crate::document::PdfDocument;
use crate::error::{Error, Result};

/// Points per inch; a zoom of 1.0 renders one pixel per point.
const POINTS_PER_INCH: f32 = 72.0;

/// Renders pages by running `pdftoppm` on the document file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdftoppmRenderer {
    /// Executable to run.
    pub program: PathBuf,
    /// Raster format handed to the OCR engine.
    pub format: ImageFormat,
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pdftoppm"),
            format: ImageFormat::Png,
        }
    }
}

impl PdftoppmRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Whether the executable can be started.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program).arg("-v").output().is_ok()
    }

    fn command(&self, source: &SourceFile<'_>, page_number: usize, dpi: f32, out_base: &Path) -> Command {
        let page = page_number.to_string();
        let mut cmd = Command::new(&self.program);
        cmd.arg("-f")
            .arg(&page)
            .arg("-l")
            .arg(&page)
            .arg("-r")
            .arg(format!("{}", dpi))
            .arg("-cropbox")
            .arg("-singlefile")
            .arg(match self.format {
                ImageFormat::Png => "-png",
                ImageFormat::Jpeg => "-jpeg",
            })
            .arg(source.path())
            .arg(out_base);
        cmd
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    fn render(&self, doc: &PdfDocument, page_index: usize, zoom: f32) -> Result<RenderedImage> {
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(Error::InvalidArgument(format!("invalid zoom factor {}", zoom)));
        }
        if page_index >= doc.page_count() {
            return Err(Error::PageOutOfRange(page_index, doc.page_count()));
        }

        let source = SourceFile::for_document(doc)?;
        let target = temp_image_path(self.format)?;
        // pdftoppm appends the extension itself.
        let out_base = target.with_extension("");

        let dpi = POINTS_PER_INCH * zoom;
        let output = self
            .command(&source, page_index + 1, dpi, &out_base)
            .output()
            .map_err(|e| {
                Error::Render(format!("cannot run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Render(format!(
                "pdftoppm failed on page {} ({}): {}",
                page_index,
                output.status,
                stderr.trim()
            )));
        }

        let (width, height) = image::image_dimensions(&target)
            .map_err(|e| Error::Render(format!("cannot read rendered page image: {}", e)))?;
        log::debug!(
            "rendered page {} at {} dpi: {}x{} px",
            page_index,
            dpi,
            width,
            height
        );
        Ok(RenderedImage::new(target, width, height, self.format))
    }
}
