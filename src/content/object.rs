//! Grouping of content stream operations into page objects.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::Object;

use crate::error::{Error, Result};
use crate::geometry::Matrix;

/// Kind of a drawable page object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A `BT … ET` text object.
    Text,
    /// An image XObject or an inline image.
    Image,
    /// A constructed path and its painting (or clipping) operator.
    Path,
    /// A form XObject placement.
    Form,
    /// Shadings, marked content and anything else.
    Other,
}

/// XObject resource names mapped to the kind of object they draw.
pub type XObjectKinds = HashMap<Vec<u8>, ObjectKind>;

/// One drawable object together with the graphics state it was drawn in.
#[derive(Debug, Clone)]
pub struct ContentObject {
    kind: ObjectKind,
    ctm: Matrix,
    state: Vec<Operation>,
    operations: Vec<Operation>,
}

impl ContentObject {
    pub fn new(kind: ObjectKind, ctm: Matrix, operations: Vec<Operation>) -> Self {
        Self {
            kind,
            ctm,
            state: Vec::new(),
            operations,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn is_text(&self) -> bool {
        self.kind == ObjectKind::Text
    }

    /// Transformation matrix in effect when the object was drawn.
    pub fn ctm(&self) -> &Matrix {
        &self.ctm
    }

    /// Graphics state operators (colour, line style, text state, `gs`) in effect.
    pub fn state(&self) -> &[Operation] {
        &self.state
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Resource name of the XObject a `Do` object paints.
    pub fn xobject_name(&self) -> Option<&[u8]> {
        self.operations
            .iter()
            .find(|op| op.operator == "Do")
            .and_then(|op| op.operands.first())
            .and_then(|o| o.as_name().ok())
    }

    /// Self-contained operations: `q`, the CTM, the state, the object, `Q`.
    fn encode_into(&self, out: &mut Vec<Operation>) {
        out.push(Operation::new("q", vec![]));
        if !self.ctm.is_identity() {
            // lopdf reals are f32, so coefficients keep about 7 significant digits.
            out.push(Operation::new(
                "cm",
                self.ctm
                    .to_array()
                    .iter()
                    .map(|v| Object::Real(*v as f32))
                    .collect(),
            ));
        }
        out.extend(self.state.iter().cloned());
        out.extend(self.operations.iter().cloned());
        out.push(Operation::new("Q", vec![]));
    }
}

/// Ordered list of the objects making up a page's appearance.
#[derive(Debug, Clone, Default)]
pub struct ContentStream {
    objects: Vec<ContentObject>,
}

impl ContentStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode raw (already decompressed) content stream bytes.
    pub fn decode(data: &[u8], xobjects: &XObjectKinds) -> Result<Self> {
        let content = Content::decode(data)
            .map_err(|e| Error::Document(format!("cannot decode content stream: {}", e)))?;
        Ok(Self::from_operations(content.operations, xobjects))
    }

    /// Group a flat operation list into objects.
    pub fn from_operations(operations: Vec<Operation>, xobjects: &XObjectKinds) -> Self {
        let mut builder = StreamBuilder::new(xobjects);
        for op in operations {
            builder.feed(op);
        }
        builder.finish()
    }

    /// Encode back to content stream bytes. Every object is wrapped in its
    /// own `q … Q` so that any subset of objects stays well formed.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Content {
            operations: self.to_operations(),
        }
        .encode()
        .map_err(|e| Error::Document(format!("cannot encode content stream: {}", e)))
    }

    /// The flat operation list [`encode`](Self::encode) serializes.
    pub fn to_operations(&self) -> Vec<Operation> {
        let mut operations = Vec::new();
        for object in &self.objects {
            object.encode_into(&mut operations);
        }
        operations
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ContentObject> {
        self.objects.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContentObject> {
        self.objects.iter()
    }

    pub fn last(&self) -> Option<&ContentObject> {
        self.objects.last()
    }

    pub fn push(&mut self, object: ContentObject) {
        self.objects.push(object);
    }

    /// Remove the object at `index`, shifting later objects down by one.
    pub fn remove(&mut self, index: usize) -> Option<ContentObject> {
        (index < self.objects.len()).then(|| self.objects.remove(index))
    }

    /// Number of objects of the given kind.
    pub fn count(&self, kind: ObjectKind) -> usize {
        self.objects.iter().filter(|o| o.kind == kind).count()
    }

    /// Object kinds in paint order.
    pub fn kinds(&self) -> Vec<ObjectKind> {
        self.objects.iter().map(|o| o.kind).collect()
    }
}

impl<'a> IntoIterator for &'a ContentStream {
    type Item = &'a ContentObject;
    type IntoIter = std::slice::Iter<'a, ContentObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

const PATH_CONSTRUCTION: &[&str] = &["m", "l", "c", "v", "y", "h", "re"];
const PATH_PAINTING: &[&str] = &["S", "s", "f", "F", "f*", "B", "B*", "b", "b*", "n"];
const CLIPPING: &[&str] = &["W", "W*"];
const GRAPHICS_STATE: &[&str] = &[
    "w", "J", "j", "M", "d", "ri", "i", "gs", "CS", "cs", "SC", "SCN", "sc", "scn", "G", "g",
    "RG", "rg", "K", "k", "Tc", "Tw", "Tz", "TL", "Tf", "Tr", "Ts",
];

/// Tracks the graphics state while operations are grouped into objects.
struct StreamBuilder<'a> {
    xobjects: &'a XObjectKinds,
    ctm: Matrix,
    state: Vec<Operation>,
    saved: Vec<(Matrix, Vec<Operation>)>,
    open: Option<ContentObject>,
    objects: Vec<ContentObject>,
}

impl<'a> StreamBuilder<'a> {
    fn new(xobjects: &'a XObjectKinds) -> Self {
        Self {
            xobjects,
            ctm: Matrix::identity(),
            state: Vec::new(),
            saved: Vec::new(),
            open: None,
            objects: Vec::new(),
        }
    }

    fn feed(&mut self, op: Operation) {
        let operator = op.operator.clone();
        let operator = operator.as_str();

        if let Some(open) = self.open.as_mut() {
            match open.kind {
                ObjectKind::Text => {
                    let done = operator == "ET";
                    open.operations.push(op);
                    if done {
                        self.close();
                    }
                    return;
                }
                ObjectKind::Image => {
                    let done = operator == "EI";
                    open.operations.push(op);
                    if done {
                        self.close();
                    }
                    return;
                }
                ObjectKind::Path
                    if PATH_CONSTRUCTION.contains(&operator) || CLIPPING.contains(&operator) =>
                {
                    open.operations.push(op);
                    return;
                }
                ObjectKind::Path if PATH_PAINTING.contains(&operator) => {
                    open.operations.push(op);
                    self.close();
                    return;
                }
                // A path left unpainted ends where something else begins.
                _ => self.close(),
            }
        }

        match operator {
            "q" => self.saved.push((self.ctm, self.state.clone())),
            "Q" => {
                if let Some((ctm, state)) = self.saved.pop() {
                    self.ctm = ctm;
                    self.state = state;
                }
            }
            "cm" => match matrix_operands(&op.operands) {
                Some(m) => self.ctm = m.multiply(&self.ctm),
                None => log::warn!("ignoring malformed cm operands: {:?}", op.operands),
            },
            "BT" => self.open_object(ObjectKind::Text, op),
            "BI" => {
                // Some decoders hand over a whole inline image as one operation.
                let packed = op.operands.iter().any(|o| matches!(o, Object::Stream(_)));
                self.open_object(ObjectKind::Image, op);
                if packed {
                    self.close();
                }
            }
            "Do" => {
                let kind = op
                    .operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .and_then(|name| self.xobjects.get(name).copied())
                    .unwrap_or(ObjectKind::Other);
                self.push_single(kind, op);
            }
            _ if PATH_CONSTRUCTION.contains(&operator) || CLIPPING.contains(&operator) => {
                self.open_object(ObjectKind::Path, op)
            }
            _ if PATH_PAINTING.contains(&operator) => self.push_single(ObjectKind::Path, op),
            _ if GRAPHICS_STATE.contains(&operator) => self.set_state(op),
            _ => self.push_single(ObjectKind::Other, op),
        }
    }

    fn set_state(&mut self, op: Operation) {
        // A later setting of the same parameter supersedes the earlier one.
        if op.operator != "gs" {
            self.state.retain(|existing| existing.operator != op.operator);
        }
        self.state.push(op);
    }

    fn open_object(&mut self, kind: ObjectKind, op: Operation) {
        let mut object = ContentObject::new(kind, self.ctm, vec![op]);
        object.state = self.state.clone();
        self.open = Some(object);
    }

    fn push_single(&mut self, kind: ObjectKind, op: Operation) {
        self.open_object(kind, op);
        self.close();
    }

    fn close(&mut self) {
        if let Some(object) = self.open.take() {
            self.objects.push(object);
        }
    }

    fn finish(mut self) -> ContentStream {
        self.close();
        ContentStream {
            objects: self.objects,
        }
    }
}

/// Numeric value of an integer or real operand.
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn matrix_operands(operands: &[Object]) -> Option<Matrix> {
    if operands.len() != 6 {
        return None;
    }
    let mut values = [0.0; 6];
    for (slot, operand) in values.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(Matrix::from_array(values))
}
