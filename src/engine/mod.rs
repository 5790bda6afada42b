//! Rendering and recognition engines.
//!
//! The pipeline only talks to the [`PageRenderer`] and [`OcrEngine`] traits,
//! so any rasterizer or recognizer can be plugged in. The default
//! implementations drive the poppler `pdftoppm` and `tesseract` binaries;
//! the `pdfium` feature adds an in-process renderer.

mod pdftoppm;
mod tesseract;

#[cfg(feature = "pdfium")]
mod pdfium;

pub use pdftoppm::PdftoppmRenderer;
pub use tesseract::{parse_language_list, TesseractEngine};

#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRenderer;

use std::path::Path;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tempfile::TempPath;

use crate::document::PdfDocument;
use crate::error::{Error, Result};

/// Encoded raster format of a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// A rendered page, encoded into a temporary file.
///
/// The file is deleted when the value is dropped.
#[derive(Debug)]
pub struct RenderedImage {
    path: TempPath,
    width: u32,
    height: u32,
    format: ImageFormat,
}

impl RenderedImage {
    pub fn new(path: TempPath, width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            path,
            width,
            height,
            format,
        }
    }

    /// Encode an in-memory image into a fresh temporary file.
    pub fn from_image(image: &DynamicImage, format: ImageFormat) -> Result<Self> {
        let path = temp_image_path(format)?;
        let encoded = match format {
            ImageFormat::Png => image.save_with_format(&path, format.to_image_format()),
            // JPEG has no alpha channel.
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
                .save_with_format(&path, format.to_image_format()),
        };
        encoded.map_err(|e| Error::Render(format!("cannot encode page image: {}", e)))?;
        Ok(Self::new(path, image.width(), image.height(), format))
    }

    pub fn path(&self) -> &Path {
        self.path.as_ref()
    }

    /// Pixel width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Delete the backing file now, reporting failures.
    pub fn close(self) -> Result<()> {
        self.path.close()?;
        Ok(())
    }
}

/// Reserve a temporary file for an encoded page image.
pub(crate) fn temp_image_path(format: ImageFormat) -> Result<TempPath> {
    let file = tempfile::Builder::new()
        .prefix("searchpdf-page-")
        .suffix(&format!(".{}", format.extension()))
        .tempfile()?;
    Ok(file.into_temp_path())
}

/// Rasterizes single pages.
pub trait PageRenderer {
    fn name(&self) -> &str;

    /// Render the visible area of a page at `zoom` (1.0 is 72 pixels per
    /// inch), in the orientation the page is displayed in.
    fn render(&self, doc: &PdfDocument, page_index: usize, zoom: f32) -> Result<RenderedImage>;
}

/// Turns a page image into a single-page PDF carrying the recognized text.
pub trait OcrEngine {
    fn name(&self) -> &str;

    /// Recognize `image` using `language` (a Tesseract language expression
    /// such as `eng` or `deu+eng`). Returns the bytes of a one-page PDF whose
    /// page corresponds to the whole image.
    fn recognize(&self, image: &RenderedImage, language: &str) -> Result<Vec<u8>>;

    /// Language codes the engine has models for.
    fn installed_languages(&self) -> Result<Vec<String>>;
}

impl<T: PageRenderer + ?Sized> PageRenderer for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn render(&self, doc: &PdfDocument, page_index: usize, zoom: f32) -> Result<RenderedImage> {
        (**self).render(doc, page_index, zoom)
    }
}

impl<T: OcrEngine + ?Sized> OcrEngine for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn recognize(&self, image: &RenderedImage, language: &str) -> Result<Vec<u8>> {
        (**self).recognize(image, language)
    }

    fn installed_languages(&self) -> Result<Vec<String>> {
        (**self).installed_languages()
    }
}

/// Location of the document's bytes for engines that read files.
///
/// Documents that were not opened from a file are written to a temporary
/// copy, which lives as long as the returned value.
pub(crate) enum SourceFile<'a> {
    Original(&'a Path),
    Copy(TempPath),
}

impl<'a> SourceFile<'a> {
    pub(crate) fn for_document(doc: &'a PdfDocument) -> Result<Self> {
        if let Some(path) = doc.source_path() {
            return Ok(SourceFile::Original(path));
        }
        log::debug!("writing in-memory document to a temporary file for rendering");
        let mut copy = doc.raw_doc().clone();
        let mut file = tempfile::Builder::new()
            .prefix("searchpdf-source-")
            .suffix(".pdf")
            .tempfile()?;
        copy.save_to(&mut file)
            .map_err(|e| Error::Render(format!("cannot write document for rendering: {}", e)))?;
        Ok(SourceFile::Copy(file.into_temp_path()))
    }

    pub(crate) fn path(&self) -> &Path {
        match self {
            SourceFile::Original(path) => *path,
            SourceFile::Copy(path) => path.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_rendered_image_file_is_removed_on_drop() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([255, 255, 255])));
        let rendered = RenderedImage::from_image(&img, ImageFormat::Png).unwrap();
        let path = rendered.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "png");
        assert_eq!((rendered.width(), rendered.height()), (20, 10));
        assert_eq!(image::image_dimensions(&path).unwrap(), (20, 10));

        drop(rendered);
        assert!(!path.exists());
    }

    #[test]
    fn test_jpeg_encoding() {
        let img = DynamicImage::new_rgba8(8, 8);
        let rendered = RenderedImage::from_image(&img, ImageFormat::Jpeg).unwrap();
        assert_eq!(rendered.format(), ImageFormat::Jpeg);
        let path = rendered.path().to_path_buf();
        rendered.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_image_format_serde() {
        assert_eq!(serde_json::to_string(&ImageFormat::Jpeg).unwrap(), "\"jpeg\"");
        let format: ImageFormat = serde_json::from_str("\"png\"").unwrap();
        assert_eq!(format, ImageFormat::Png);
    }
}
