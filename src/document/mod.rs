//! PDF documents: loading, page geometry, content access and the edits
//! needed to stamp a layer onto a page.

mod edit;
mod pdf;

pub use pdf::{decode_text_simple, PageInfo, PdfDocument};
