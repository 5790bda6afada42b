//! Page content as an ordered list of drawable objects.
//!
//! A raw content stream is a flat list of operators. To edit it object by
//! object, operations are grouped into [`ContentObject`]s (text, image, path,
//! form, other), each remembering the transformation matrix and graphics
//! state it was drawn with.

mod filter;
mod object;

pub use filter::retain_text;
pub(crate) use object::number;
pub use object::{ContentObject, ContentStream, ObjectKind, XObjectKinds};
