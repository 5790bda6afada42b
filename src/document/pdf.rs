//! `lopdf`-backed document access: loading, saving and page inspection.

use std::io::Read;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};
use serde::Serialize;

use crate::content::{number, ContentStream, ObjectKind, XObjectKinds};
use crate::detect::detect_format_from_path;
use crate::error::{Error, Result};
use crate::geometry::{Rect, Rotation};

/// Depth limit when walking up the page tree for inherited attributes.
const MAX_TREE_DEPTH: usize = 32;

/// Geometry of one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageInfo {
    /// Zero-based page index.
    pub index: usize,
    /// Visible region: the crop box clipped to the media box.
    pub crop_box: Rect,
    pub media_box: Rect,
    pub rotation: Rotation,
}

impl PageInfo {
    /// Width and height of the page as displayed, i.e. after rotation.
    pub fn display_size(&self) -> (f64, f64) {
        if self.rotation.swaps_axes() {
            (self.crop_box.height(), self.crop_box.width())
        } else {
            (self.crop_box.width(), self.crop_box.height())
        }
    }
}

/// A PDF document opened for reading and in-place modification.
pub struct PdfDocument {
    pub(crate) doc: LopdfDocument,
    pages: Vec<ObjectId>,
    source: Option<PathBuf>,
}

impl PdfDocument {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        detect_format_from_path(path)?;

        let doc = LopdfDocument::load(path)
            .map_err(|e| Error::Document(format!("unable to open {}: {}", path.display(), e)))?;
        let mut document = Self::from_lopdf(doc)?;
        document.source = Some(path.to_path_buf());
        Ok(document)
    }

    /// Load a PDF from an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)
            .map_err(|e| Error::Document(format!("unable to load PDF data: {}", e)))?;
        Self::from_lopdf(doc)
    }

    /// Load a PDF from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Wrap an already loaded `lopdf::Document`.
    pub fn from_lopdf(doc: LopdfDocument) -> Result<Self> {
        if doc.is_encrypted() {
            return Err(Error::Document(
                "encrypted documents are not supported".to_string(),
            ));
        }
        let pages = doc.get_pages().into_values().collect();
        Ok(Self {
            doc,
            pages,
            source: None,
        })
    }

    /// Path the document was opened from, if it came from a file.
    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub(crate) fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or(Error::PageOutOfRange(index, self.pages.len()))
    }

    /// Crop box, media box and rotation of a page, resolving inheritance.
    pub fn page_info(&self, index: usize) -> Result<PageInfo> {
        let page_id = self.page_id(index)?;

        let media_box = match self.inherited(page_id, b"MediaBox").and_then(|o| self.rect(o)) {
            Some(rect) => rect,
            None => {
                log::warn!("page {} has no usable MediaBox, assuming US Letter", index);
                Rect::letter()
            }
        };
        let crop_box = self
            .inherited(page_id, b"CropBox")
            .and_then(|o| self.rect(o))
            .and_then(|crop| crop.intersect(&media_box))
            .unwrap_or(media_box);

        let degrees = self
            .inherited(page_id, b"Rotate")
            .and_then(|o| self.resolve(o).as_i64().ok())
            .unwrap_or(0);
        let rotation = Rotation::from_degrees(degrees)?;

        Ok(PageInfo {
            index,
            crop_box,
            media_box,
            rotation,
        })
    }

    /// Decoded content of a page, grouped into objects.
    pub fn page_content(&self, index: usize) -> Result<ContentStream> {
        let page_id = self.page_id(index)?;
        let data = self.page_content_bytes(page_id)?;
        ContentStream::decode(&data, &self.xobject_kinds(page_id))
    }

    /// The document's natural language (`/Lang` in the catalog).
    pub fn language(&self) -> Option<String> {
        let catalog = self.catalog()?;
        let lang = self.resolve(catalog.get(b"Lang").ok()?);
        let bytes = lang.as_str().ok()?;
        let text = decode_text_simple(bytes).trim().to_string();
        (!text.is_empty()).then_some(text)
    }

    /// Save to `path`, replacing it only once the whole file has been written.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        self.doc
            .save_to(&mut file)
            .map_err(|e| Error::Document(format!("unable to save PDF: {}", e)))?;
        file.persist(path).map_err(|e| {
            Error::Document(format!("unable to save {}: {}", path.display(), e.error))
        })?;
        Ok(())
    }

    /// Serialize the document to bytes.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| Error::Document(format!("unable to serialize PDF: {}", e)))?;
        Ok(out)
    }

    /// Flate-compress streams that are not compressed yet.
    pub fn compress(&mut self) {
        self.doc.compress();
    }

    /// Stamp `/ModDate` in the document information dictionary.
    pub fn touch_modified(&mut self) -> Result<()> {
        let stamp = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
        let info_id = match self.doc.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(id) => id,
            Err(_) => {
                let id = self.doc.add_object(Dictionary::new());
                self.doc.trailer.set("Info", Object::Reference(id));
                id
            }
        };
        let info = self
            .doc
            .get_object_mut(info_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| Error::Document(format!("invalid Info dictionary: {}", e)))?;
        info.set("ModDate", Object::string_literal(stamp));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Object graph helpers
    // ------------------------------------------------------------------

    /// Follow a reference to the object it points at (one level).
    pub(crate) fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(object),
            _ => object,
        }
    }

    /// Clone of a dictionary, following a reference if needed.
    pub(crate) fn resolved_dict(&self, object: &Object) -> Option<Dictionary> {
        match self.resolve(object) {
            Object::Dictionary(dict) => Some(dict.clone()),
            _ => None,
        }
    }

    /// Look up a page attribute, walking up the page tree when it is inherited.
    pub(crate) fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut node = self.doc.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = node.get(key) {
                return Some(value);
            }
            let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
            node = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn catalog(&self) -> Option<&Dictionary> {
        let root = self.doc.trailer.get(b"Root").ok()?;
        match self.resolve(root) {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    fn rect(&self, object: &Object) -> Option<Rect> {
        let items = self.resolve(object).as_array().ok()?;
        if items.len() != 4 {
            return None;
        }
        let values: Vec<f64> = items
            .iter()
            .filter_map(|o| number(self.resolve(o)))
            .collect();
        if values.len() != 4 || values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Rect::new(values[0], values[1], values[2], values[3]))
    }

    /// All content stream parts of a page, decompressed and concatenated.
    fn page_content_bytes(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page = self.doc.get_dictionary(page_id)?;
        let contents = match page.get(b"Contents") {
            Ok(contents) => self.resolve(contents),
            Err(_) => return Ok(Vec::new()),
        };

        let parts: Vec<&Object> = match contents {
            Object::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let mut content = Vec::new();
        for part in parts {
            match self.resolve(part) {
                Object::Stream(stream) => {
                    let data = if stream.dict.has(b"Filter") {
                        stream.decompressed_content().map_err(|e| {
                            Error::Document(format!("cannot decompress content stream: {}", e))
                        })?
                    } else {
                        stream.content.clone()
                    };
                    content.extend_from_slice(&data);
                    content.push(b'\n');
                }
                Object::Null => {}
                _ => {
                    return Err(Error::Document(
                        "page Contents entry is not a stream".to_string(),
                    ))
                }
            }
        }
        Ok(content)
    }

    /// Kinds of the XObjects a page's resources declare.
    pub(crate) fn xobject_kinds(&self, page_id: ObjectId) -> XObjectKinds {
        let mut kinds = XObjectKinds::new();
        let xobjects = self
            .inherited(page_id, b"Resources")
            .and_then(|r| self.resolved_dict(r))
            .and_then(|r| r.get(b"XObject").ok().and_then(|x| self.resolved_dict(x)));

        if let Some(xobjects) = xobjects {
            for (name, value) in xobjects.iter() {
                let subtype = match self.resolve(value) {
                    Object::Stream(stream) => stream
                        .dict
                        .get(b"Subtype")
                        .and_then(Object::as_name)
                        .ok()
                        .map(<[u8]>::to_vec),
                    _ => None,
                };
                let kind = match subtype.as_deref() {
                    Some(b"Image") => ObjectKind::Image,
                    Some(b"Form") => ObjectKind::Form,
                    _ => ObjectKind::Other,
                };
                kinds.insert(name.clone(), kind);
            }
        }
        kinds
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8, or Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    /// A one-page document whose attributes live partly on the Pages node.
    fn inherited_doc(page_extra: Dictionary, pages_extra: Dictionary) -> PdfDocument {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            b"BT /F1 12 Tf (x) Tj ET".to_vec(),
        ));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        for (k, v) in page_extra.into_iter() {
            page.set(k, v);
        }
        let page_id = doc.add_object(page);
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        for (k, v) in pages_extra.into_iter() {
            pages.set(k, v);
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "Lang" => Object::string_literal("de-DE"),
        });
        doc.trailer.set("Root", catalog_id);
        PdfDocument::from_lopdf(doc).unwrap()
    }

    fn rect_obj(l: i64, b: i64, r: i64, t: i64) -> Object {
        Object::Array(vec![l.into(), b.into(), r.into(), t.into()])
    }

    #[test]
    fn test_inherited_media_box_and_rotation() {
        let doc = inherited_doc(
            Dictionary::new(),
            dictionary! { "MediaBox" => rect_obj(0, 0, 595, 842), "Rotate" => 90 },
        );
        let info = doc.page_info(0).unwrap();
        assert_eq!(info.crop_box, Rect::new(0.0, 0.0, 595.0, 842.0));
        assert_eq!(info.rotation, Rotation::Cw90);
        assert_eq!(info.display_size(), (842.0, 595.0));
    }

    #[test]
    fn test_crop_box_is_clipped_to_media_box() {
        let doc = inherited_doc(
            dictionary! {
                "MediaBox" => rect_obj(0, 0, 612, 792),
                "CropBox" => rect_obj(-10, 36, 700, 756),
            },
            Dictionary::new(),
        );
        let info = doc.page_info(0).unwrap();
        assert_eq!(info.crop_box, Rect::new(0.0, 36.0, 612.0, 756.0));
    }

    #[test]
    fn test_missing_media_box_defaults_to_letter() {
        let doc = inherited_doc(Dictionary::new(), Dictionary::new());
        assert_eq!(doc.page_info(0).unwrap().crop_box, Rect::letter());
    }

    #[test]
    fn test_negative_rotation_is_normalized() {
        let doc = inherited_doc(dictionary! { "Rotate" => -90 }, Dictionary::new());
        assert_eq!(doc.page_info(0).unwrap().rotation, Rotation::Cw270);
    }

    #[test]
    fn test_page_out_of_range() {
        let doc = inherited_doc(Dictionary::new(), Dictionary::new());
        assert!(matches!(doc.page_info(3), Err(Error::PageOutOfRange(3, 1))));
    }

    #[test]
    fn test_language_and_content() {
        let doc = inherited_doc(Dictionary::new(), Dictionary::new());
        assert_eq!(doc.language().as_deref(), Some("de-DE"));
        let content = doc.page_content(0).unwrap();
        assert_eq!(content.kinds(), vec![ObjectKind::Text]);
    }

    #[test]
    fn test_touch_modified_creates_info() {
        let mut doc = inherited_doc(Dictionary::new(), Dictionary::new());
        doc.touch_modified().unwrap();
        let info_id = doc.raw_doc().trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.raw_doc().get_dictionary(info_id).unwrap();
        let stamp = info.get(b"ModDate").unwrap().as_str().unwrap();
        assert!(stamp.starts_with(b"D:"));
    }

    #[test]
    fn test_bytes_round_trip_keeps_pages() {
        let mut doc = inherited_doc(Dictionary::new(), Dictionary::new());
        let bytes = doc.to_bytes().unwrap();
        let reloaded = PdfDocument::from_bytes(&bytes).unwrap();
        assert_eq!(reloaded.page_count(), 1);
        assert!(reloaded.source_path().is_none());
    }

    #[test]
    fn test_from_reader_loads_document() {
        let mut doc = inherited_doc(
            Dictionary::new(),
            dictionary! { "MediaBox" => rect_obj(0, 0, 595, 842) },
        );
        let bytes = doc.to_bytes().unwrap();
        let loaded = PdfDocument::from_reader(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(loaded.page_count(), 1);
        assert_eq!(loaded.page_info(0).unwrap().crop_box, Rect::new(0.0, 0.0, 595.0, 842.0));
        assert_eq!(loaded.language().as_deref(), Some("de-DE"));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(
            PdfDocument::from_bytes(b"not a pdf"),
            Err(Error::Document(_))
        ));
    }

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(b"en-US"), "en-US");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x66, 0x00, 0x72]), "fr");
        assert_eq!(decode_text_simple(&[0x48, 0xE9]), "Hé");
    }
}
