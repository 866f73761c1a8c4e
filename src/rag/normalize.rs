//! Boilerplate stripping for public-domain book texts.
//!
//! Project Gutenberg files fence the actual body between
//! `*** START OF ... ***` and `*** END OF ... ***` marker lines; the legal
//! boilerplate outside the fence would pollute retrieval context.

const START_MARKER: &str = "*** START OF";
const END_MARKER: &str = "*** END OF";

/// Strip the Gutenberg header and footer if present.
///
/// Text without the markers passes through unchanged, which also makes the
/// function idempotent: a body that already had its fences removed is left
/// alone by a second pass.
pub fn normalize(text: &str) -> &str {
    let mut body = text;

    if let Some(start) = body.find(START_MARKER) {
        let after = &body[start + START_MARKER.len()..];
        // The marker line ends with its own "***"; the body starts after it.
        body = match after.find("***") {
            Some(close) => &after[close + 3..],
            None => after,
        };
    }

    if let Some(end) = body.find(END_MARKER) {
        body = &body[..end];
    }

    body
}
