//! DOT format utilities for graph visualization.
//!
//! Labels produced for control-flow nodes contain IR text such as
//! `x = (x + 1)` or `[a] = b`, so they need escaping before they are
//! embedded in a Graphviz document.

/// Escapes a string for use inside a double-quoted DOT label.
///
/// Quotes, backslashes and angle brackets are escaped, line breaks become the
/// literal `\n` sequence understood by Graphviz, and carriage returns are dropped.
///
/// # Examples
///
/// ```rust
/// use cfgopt::utils::escape_dot;
///
/// assert_eq!(escape_dot("x < \"y\""), "x \\< \\\"y\\\"");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '<' => out.push_str("\\<"),
            '>' => out.push_str("\\>"),
            other => out.push(other),
        }
    }
    out
}
