//! Filesystem-safe track identities

/// Characters that may not appear in a file name on Windows (and are awkward elsewhere)
pub const RESERVED_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replacement for every reserved character
pub const PLACEHOLDER: char = '_';

/// Identity used when a title has no usable characters
pub const EMPTY_TITLE_IDENTITY: &str = "untitled";

/// Map a title to a filesystem-safe identity
///
/// Single left-to-right pass: each reserved character becomes [`PLACEHOLDER`], everything else
/// is kept. The placeholder is not itself reserved, so the function is idempotent. Distinct
/// titles may map to the same identity; callers accept that collision.
///
/// # Examples
///
/// ```
/// use tunefetch::sanitize::sanitize;
///
/// assert_eq!(sanitize("AC/DC: Back In Black"), "AC_DC_ Back In Black");
/// assert_eq!(sanitize("Believer"), "Believer");
/// assert_eq!(sanitize(""), "untitled");
/// ```
#[must_use]
pub fn sanitize(title: &str) -> String {
    if title.trim().is_empty() {
        return EMPTY_TITLE_IDENTITY.to_string();
    }

    title
        .chars()
        .map(|c| if is_reserved(c) { PLACEHOLDER } else { c })
        .collect()
}

/// Whether `c` is one of [`RESERVED_CHARS`]
#[must_use]
pub fn is_reserved(c: char) -> bool {
    RESERVED_CHARS.contains(&c)
}
