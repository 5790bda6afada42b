//! Reduction of an OCR result page to its recognized text.

use super::{ContentStream, ObjectKind};

/// Remove every object that is not a text object, in place.
///
/// Objects are visited from the last index down to the first, so removing an
/// object only shifts positions that have already been visited. Remaining
/// text objects keep their relative order. Returns the number of objects
/// removed.
pub fn retain_text(stream: &mut ContentStream) -> usize {
    let mut removed = 0;
    for index in (0..stream.len()).rev() {
        let is_text = stream
            .get(index)
            .map(|object| object.kind() == ObjectKind::Text)
            .unwrap_or(true);
        if !is_text && stream.remove(index).is_some() {
            removed += 1;
        }
    }
    removed
}
