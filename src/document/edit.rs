//! In-place document edits: copying object graphs between documents,
//! creating form XObjects and appending content to pages.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use super::PdfDocument;
use crate::content::ContentStream;
use crate::error::{Error, Result};

/// Maps object ids of a source document to their copies.
type IdMap = BTreeMap<ObjectId, ObjectId>;

impl PdfDocument {
    /// Turn a page of another document into a form XObject owned by this one.
    ///
    /// The form draws `content` with the source page's resources. Its bounding
    /// box is the source crop box, and its matrix moves that box's lower-left
    /// corner to the origin.
    pub fn create_form_from_page(
        &mut self,
        source: &PdfDocument,
        source_page: usize,
        content: &ContentStream,
    ) -> Result<ObjectId> {
        let info = source.page_info(source_page)?;
        let page_id = source.page_id(source_page)?;
        let resources = source
            .inherited(page_id, b"Resources")
            .cloned()
            .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));

        let mut ids = IdMap::new();
        let resources = self.import_object(&source.doc, &resources, &mut ids);

        let data = content.encode()?;
        let bbox = info.crop_box;

        // BBox and Matrix are stored as f32 reals.
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Form".to_vec()));
        dict.set("FormType", Object::Integer(1));
        dict.set(
            "BBox",
            Object::Array(bbox.to_array().iter().map(|v| Object::Real(*v as f32)).collect()),
        );
        dict.set(
            "Matrix",
            Object::Array(
                [1.0, 0.0, 0.0, 1.0, -bbox.left, -bbox.bottom]
                    .iter()
                    .map(|v| Object::Real(*v as f32))
                    .collect(),
            ),
        );
        dict.set("Resources", resources);

        Ok(self.doc.add_object(Object::Stream(Stream::new(dict, data))))
    }

    /// Register an XObject in a page's resources under a fresh name
    /// starting with `prefix`, and return that name.
    ///
    /// Shared or inherited resource dictionaries are copied onto the page
    /// first, so other pages never see the new entry.
    pub fn add_page_xobject(
        &mut self,
        page_index: usize,
        xobject: ObjectId,
        prefix: &str,
    ) -> Result<Vec<u8>> {
        let page_id = self.page_id(page_index)?;

        let mut resources = self
            .inherited(page_id, b"Resources")
            .and_then(|r| self.resolved_dict(r))
            .unwrap_or_default();
        let mut xobjects = resources
            .get(b"XObject")
            .ok()
            .and_then(|x| self.resolved_dict(x))
            .unwrap_or_default();

        let name = (0..)
            .map(|n| format!("{}{}", prefix, n).into_bytes())
            .find(|candidate| !xobjects.has(candidate))
            .unwrap_or_else(|| prefix.as_bytes().to_vec());

        xobjects.set(name.clone(), Object::Reference(xobject));
        resources.set("XObject", Object::Dictionary(xobjects));

        self.doc
            .get_dictionary_mut(page_id)?
            .set("Resources", Object::Dictionary(resources));
        Ok(name)
    }

    /// Paint `operations` after everything already on the page.
    ///
    /// The existing content streams are left byte-for-byte as they are and
    /// bracketed by a `q`/`Q` pair so that state they leave behind cannot
    /// leak into the appended operations.
    pub fn append_page_content(&mut self, page_index: usize, operations: Vec<Operation>) -> Result<()> {
        let page_id = self.page_id(page_index)?;

        let existing: Vec<Object> = match self.doc.get_dictionary(page_id)?.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        };

        let appended = Content { operations }
            .encode()
            .map_err(|e| Error::Document(format!("cannot encode content stream: {}", e)))?;

        let mut contents = Vec::with_capacity(existing.len() + 2);
        if existing.is_empty() {
            contents.push(self.add_content_stream(appended));
        } else {
            contents.push(self.add_content_stream(b"q\n".to_vec()));
            contents.extend(existing);
            let mut closing = b"\nQ\n".to_vec();
            closing.extend_from_slice(&appended);
            contents.push(self.add_content_stream(closing));
        }

        self.doc
            .get_dictionary_mut(page_id)?
            .set("Contents", Object::Array(contents));
        Ok(())
    }

    fn add_content_stream(&mut self, data: Vec<u8>) -> Object {
        Object::Reference(self.doc.add_object(Stream::new(Dictionary::new(), data)))
    }

    /// Deep-copy an object from `source`, giving every referenced object a new
    /// id in this document. Links back into the source page tree are dropped.
    fn import_object(&mut self, source: &LopdfDocument, object: &Object, ids: &mut IdMap) -> Object {
        match object {
            Object::Reference(id) => {
                if let Some(copied) = ids.get(id) {
                    return Object::Reference(*copied);
                }
                let new_id = self.doc.new_object_id();
                ids.insert(*id, new_id);
                let copied = match source.get_object(*id) {
                    Ok(target) => self.import_object(source, target, ids),
                    Err(_) => Object::Null,
                };
                self.doc.objects.insert(new_id, copied);
                Object::Reference(new_id)
            }
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.import_object(source, item, ids))
                    .collect(),
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.import_dictionary(source, dict, ids)),
            Object::Stream(stream) => {
                let dict = self.import_dictionary(source, &stream.dict, ids);
                Object::Stream(Stream::new(dict, stream.content.clone()))
            }
            other => other.clone(),
        }
    }

    fn import_dictionary(&mut self, source: &LopdfDocument, dict: &Dictionary, ids: &mut IdMap) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            let value = self.import_object(source, value, ids);
            copy.set(key.clone(), value);
        }
        copy
    }
}
