//! Stamping a recognized text layer onto a destination page.

use lopdf::content::Operation;
use lopdf::Object;

use crate::content::{retain_text, ContentObject, ContentStream, ObjectKind};
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::geometry::{Matrix, Rect};

/// Resource name prefix of the text layer forms.
pub const LAYER_PREFIX: &str = "OCRLayer";

/// The single page an OCR engine produced for one rendered image.
pub struct OcrPage {
    document: PdfDocument,
    page_box: Rect,
    content: ContentStream,
}

impl OcrPage {
    /// Parse the engine's PDF output.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = PdfDocument::from_bytes(data)
            .map_err(|e| Error::Ocr(format!("engine output is not a readable PDF: {}", e)))?;
        match document.page_count() {
            0 => return Err(Error::Ocr("engine output has no pages".to_string())),
            1 => {}
            n => log::warn!("engine output has {} pages, using the first", n),
        }
        let page_box = document
            .page_info(0)
            .map_err(|e| Error::Ocr(format!("engine output page is malformed: {}", e)))?
            .crop_box;
        let content = document
            .page_content(0)
            .map_err(|e| Error::Ocr(format!("engine output content is malformed: {}", e)))?;
        Ok(Self {
            document,
            page_box,
            content,
        })
    }

    /// The page's own crop box.
    pub fn page_box(&self) -> Rect {
        self.page_box
    }

    pub fn content(&self) -> &ContentStream {
        &self.content
    }

    /// Drop everything but recognized text. Returns the number of objects removed.
    pub fn strip_to_text(&mut self) -> usize {
        retain_text(&mut self.content)
    }

    pub fn text_object_count(&self) -> usize {
        self.content.count(ObjectKind::Text)
    }
}

/// Paint `layer` over page `page_index` of `dest`, placed by `matrix`.
///
/// The layer's content becomes a form XObject of `dest`; the page gets one
/// new object drawing it, after all of its existing content. A layer with no
/// text (a blank scan) is still placed, as an empty form. Returns the
/// resource name the form was registered under.
pub fn composite(dest: &mut PdfDocument, page_index: usize, layer: &OcrPage, matrix: &Matrix) -> Result<String> {
    if !matrix.is_finite() {
        return Err(Error::Composite(format!(
            "placement matrix is not finite: {:?}",
            matrix.to_array()
        )));
    }

    let form_id = dest
        .create_form_from_page(&layer.document, 0, &layer.content)
        .map_err(|e| Error::Composite(format!("cannot create form from OCR page: {}", e)))?;
    let name = dest
        .add_page_xobject(page_index, form_id, LAYER_PREFIX)
        .map_err(|e| Error::Composite(format!("cannot register text layer form: {}", e)))?;

    let mut placement = ContentStream::new();
    placement.push(ContentObject::new(
        ObjectKind::Form,
        *matrix,
        vec![Operation::new("Do", vec![Object::Name(name.clone())])],
    ));
    dest.append_page_content(page_index, placement.to_operations())
        .map_err(|e| Error::Composite(format!("cannot append text layer: {}", e)))?;

    Ok(String::from_utf8_lossy(&name).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{OverlayTransform, Rotation};
    use lopdf::{dictionary, Dictionary, Document, Stream};

    /// A one-page document; `image` names an image XObject in its resources.
    fn one_page(media_box: [i64; 4], content: &[u8], image: Option<&str>) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut xobjects = Dictionary::new();
        if let Some(name) = image {
            let image_id = doc.add_object(Stream::new(
                dictionary! { "Type" => "XObject", "Subtype" => "Image", "Width" => 1, "Height" => 1 },
                vec![0],
            ));
            xobjects.set(name, image_id);
        }
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
            "Resources" => dictionary! { "XObject" => xobjects },
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
        doc
    }

    fn ocr_page_bytes() -> Vec<u8> {
        let content = b"q 1224 0 0 1584 0 0 cm /Im0 Do Q \
                        BT 3 Tr /F1 24 Tf 100 1400 Td (Hello) Tj ET \
                        BT 3 Tr /F1 24 Tf 100 1300 Td (World) Tj ET";
        let mut doc = one_page([0, 0, 1224, 1584], content, Some("Im0"));
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_ocr_page_strip_to_text() {
        let mut page = OcrPage::from_bytes(&ocr_page_bytes()).unwrap();
        assert_eq!(page.page_box(), Rect::new(0.0, 0.0, 1224.0, 1584.0));
        assert_eq!(page.content().len(), 3);

        assert_eq!(page.strip_to_text(), 1);
        assert_eq!(page.content().kinds(), vec![ObjectKind::Text, ObjectKind::Text]);
        assert_eq!(page.text_object_count(), 2);
    }

    #[test]
    fn test_ocr_page_rejects_garbage() {
        assert!(matches!(OcrPage::from_bytes(b"garbage"), Err(Error::Ocr(_))));
    }

    #[test]
    fn test_composite_appends_one_form_after_existing_objects() {
        let dest_doc = one_page(
            [0, 0, 612, 792],
            b"0 0 m 612 792 l S q 612 0 0 792 0 0 cm /Scan Do Q BT /F1 12 Tf (x) Tj ET",
            Some("Scan"),
        );
        let mut dest = PdfDocument::from_lopdf(dest_doc).unwrap();
        let before = dest.page_content(0).unwrap().kinds();

        let mut layer = OcrPage::from_bytes(&ocr_page_bytes()).unwrap();
        layer.strip_to_text();
        let info = dest.page_info(0).unwrap();
        let transform = OverlayTransform::compute(&info.crop_box, Rotation::None, &layer.page_box()).unwrap();

        let name = composite(&mut dest, 0, &layer, &transform.matrix).unwrap();
        assert_eq!(name, "OCRLayer0");

        let after = dest.page_content(0).unwrap();
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(&after.kinds()[..before.len()], &before[..]);

        let added = after.last().unwrap();
        assert_eq!(added.kind(), ObjectKind::Form);
        assert_eq!(added.xobject_name(), Some(&b"OCRLayer0"[..]));
        assert!(added.ctm().approx_eq(&transform.matrix, 1e-4));
    }

    #[test]
    fn test_composite_places_empty_layer() {
        let mut dest = PdfDocument::from_lopdf(one_page(
            [0, 0, 612, 792],
            b"q 612 0 0 792 0 0 cm /Scan Do Q",
            Some("Scan"),
        ))
        .unwrap();

        let mut doc = one_page([0, 0, 1224, 1584], b"q 1224 0 0 1584 0 0 cm /Im0 Do Q", Some("Im0"));
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        let mut layer = OcrPage::from_bytes(&bytes).unwrap();
        assert_eq!(layer.strip_to_text(), 1);
        assert_eq!(layer.text_object_count(), 0);
        assert!(layer.content().is_empty());

        let name = composite(&mut dest, 0, &layer, &Matrix::scaling(0.5, 0.5)).unwrap();
        assert_eq!(name, "OCRLayer0");

        let content = dest.page_content(0).unwrap();
        assert_eq!(content.kinds(), vec![ObjectKind::Image, ObjectKind::Form]);

        let page_id = dest.page_id(0).unwrap();
        let page = dest.raw_doc().get_dictionary(page_id).unwrap();
        let xobjects = page
            .get(b"Resources")
            .and_then(Object::as_dict)
            .and_then(|r| r.get(b"XObject"))
            .and_then(Object::as_dict)
            .unwrap();
        let form_id = xobjects.get(b"OCRLayer0").and_then(Object::as_reference).unwrap();
        let form = dest.raw_doc().get_object(form_id).and_then(Object::as_stream).unwrap();
        assert!(form.content.is_empty());
    }

    #[test]
    fn test_composite_rejects_bad_page() {
        let mut dest = PdfDocument::from_lopdf(one_page([0, 0, 612, 792], b"", None)).unwrap();
        let layer = OcrPage::from_bytes(&ocr_page_bytes()).unwrap();
        assert!(matches!(
            composite(&mut dest, 4, &layer, &Matrix::identity()),
            Err(Error::Composite(_))
        ));
        assert!(matches!(
            composite(&mut dest, 0, &layer, &Matrix::new(f64::NAN, 0.0, 0.0, 1.0, 0.0, 0.0)),
            Err(Error::Composite(_))
        ));
    }
}
