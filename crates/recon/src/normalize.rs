/// Cut a raw part number down to its canonical comparison form.
///
/// Returns the first `width` characters of `raw`, or `raw` unchanged when it
/// is shorter. Identifiers are never padded. Counting is by `char`, so a
/// multi-byte character is never split.
pub fn normalize(raw: &str, width: usize) -> &str {
    match raw.char_indices().nth(width) {
        Some((byte_idx, _)) => &raw[..byte_idx],
        None => raw,
    }
}
