//! Filesystem-safe filename sanitization.

/// Longest filename most filesystems accept (Linux NAME_MAX).
const NAME_MAX: usize = 255;

/// Makes a URL-derived name safe to create in the current directory.
///
/// Separators, NUL, whitespace and control characters become `_` (runs
/// collapse to one), leading/trailing dots and underscores are trimmed so the
/// result is never hidden, and the name is capped at `NAME_MAX` bytes.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let unsafe_char = c == '/' || c == '\\' || c.is_control() || c.is_whitespace();
        if unsafe_char {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
