//! Identifier sanitization for the pattern language.

/// Map an arbitrary BFIR name to a valid pattern-language identifier:
/// separators become `_`, characters outside `[A-Za-z0-9_]` are dropped,
/// and a leading digit gets an underscore prefix. Pure and deterministic;
/// an empty result becomes `_`.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else if matches!(c, ' ' | '-' | '.' | '/' | ':') {
            // Collapse runs of separators into a single underscore.
            if !out.ends_with('_') {
                out.push('_');
            }
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    if out.as_bytes()[0].is_ascii_digit() {
        out.insert(0, '_');
    }
    out
}
