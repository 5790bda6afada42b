//! Shared fixtures: in-memory PDFs and scripted engines.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use image::DynamicImage;
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

use searchpdf::{
    Error, ImageFormat, OcrEngine, PageRenderer, PdfDocument, RenderedImage, Result,
};

/// Content of a typical scanned page: a border path, the scan image and a
/// stray text object.
pub const SCAN_CONTENT: &[u8] =
    b"0.5 w 10 10 m 20 20 l S q 612 0 0 792 0 0 cm /Scan Do Q BT /F1 8 Tf 10 10 Td (p) Tj ET";

pub struct PageSpec {
    pub media_box: [i64; 4],
    pub rotate: Option<i64>,
    pub content: Vec<u8>,
}

impl PageSpec {
    pub fn letter() -> Self {
        Self::sized(612, 792)
    }

    pub fn sized(width: i64, height: i64) -> Self {
        Self {
            media_box: [0, 0, width, height],
            rotate: None,
            content: SCAN_CONTENT.to_vec(),
        }
    }

    pub fn rotated(mut self, degrees: i64) -> Self {
        self.rotate = Some(degrees);
        self
    }
}

/// Build a document whose pages share one resources dictionary holding an
/// image `/Scan` and a font `/F1`.
pub fn build_document(pages: &[PageSpec], lang: Option<&str>) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![0x80],
    ));
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Scan" => image_id },
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for spec in pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), spec.content.clone()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => spec.media_box.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
            "Resources" => resources_id,
            "Contents" => content_id,
        };
        if let Some(rotate) = spec.rotate {
            page.set("Rotate", rotate);
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let mut catalog = dictionary! { "Type" => "Catalog", "Pages" => pages_id };
    if let Some(lang) = lang {
        catalog.set("Lang", Object::string_literal(lang));
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn write_pdf(dir: &Path, name: &str, mut doc: Document) -> PathBuf {
    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// Renders blank images of the page's display size at the requested zoom.
#[derive(Default)]
pub struct MockRenderer {
    /// Fail when asked for this page.
    pub fail_on: Option<usize>,
    pub calls: Cell<usize>,
    /// Every image file handed out.
    pub files: RefCell<Vec<PathBuf>>,
}

impl MockRenderer {
    pub fn failing_on(page: usize) -> Self {
        Self {
            fail_on: Some(page),
            ..Self::default()
        }
    }

    pub fn all_files_removed(&self) -> bool {
        self.files.borrow().iter().all(|path| !path.exists())
    }
}

impl PageRenderer for MockRenderer {
    fn name(&self) -> &str {
        "mock"
    }

    fn render(&self, doc: &PdfDocument, page_index: usize, zoom: f32) -> Result<RenderedImage> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_on == Some(page_index) {
            return Err(Error::Render(format!("cannot draw page {}", page_index)));
        }
        let (width, height) = doc.page_info(page_index)?.display_size();
        let zoom = f64::from(zoom);
        let image = DynamicImage::new_luma8(
            (width * zoom).round() as u32,
            (height * zoom).round() as u32,
        );
        let rendered = RenderedImage::from_image(&image, ImageFormat::Png)?;
        self.files.borrow_mut().push(rendered.path().to_path_buf());
        Ok(rendered)
    }
}

/// Answers every image with a page of the image's pixel size holding a
/// background image and `words` invisible text objects.
pub struct MockOcr {
    pub installed: Vec<String>,
    pub words: usize,
    pub fail: bool,
    /// Languages recognition was requested with.
    pub requests: RefCell<Vec<String>>,
}

impl Default for MockOcr {
    fn default() -> Self {
        Self {
            installed: vec!["eng".to_string(), "deu".to_string(), "osd".to_string()],
            words: 2,
            fail: false,
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl MockOcr {
    pub fn with_languages(languages: &[&str]) -> Self {
        Self {
            installed: languages.iter().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl OcrEngine for MockOcr {
    fn name(&self) -> &str {
        "mock"
    }

    fn recognize(&self, image: &RenderedImage, language: &str) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(language.to_string());
        if self.fail {
            return Err(Error::Ocr("engine crashed".to_string()));
        }
        assert!(image.path().exists(), "image must exist while recognizing");
        Ok(ocr_page(image.width(), image.height(), self.words))
    }

    fn installed_languages(&self) -> Result<Vec<String>> {
        Ok(self.installed.clone())
    }
}

/// A Tesseract-like result page: full-page image plus invisible text.
pub fn ocr_page(width: u32, height: u32, words: usize) -> Vec<u8> {
    let mut content = format!("q {} 0 0 {} 0 0 cm /Im0 Do Q\n", width, height);
    for i in 0..words {
        content.push_str(&format!(
            "BT 3 Tr /GlyphLessFont 24 Tf 1 0 0 1 100 {} Tm (word{}) Tj ET\n",
            height.saturating_sub(100 + 40 * i as u32),
            i
        ));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(
        dictionary! { "Type" => "XObject", "Subtype" => "Image", "Width" => 1, "Height" => 1 },
        vec![0],
    ));
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "GlyphLessFont",
    });
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), Object::Integer(width as i64), Object::Integer(height as i64)],
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
            "Font" => dictionary! { "GlyphLessFont" => font_id },
        },
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
