//! Inline image markup for rendered snippets.

use crate::key::CacheKey;
use crate::scanner::Mode;

/// Build the `<img>` tag that replaces a snippet.
///
/// The class encodes the mode (`math-true` / `math-false`), `alt` carries a
/// sanitized copy of the source, `id` the short cache key and `src` a PNG
/// data URI.
///
/// # Example
///
/// ```
/// use mdtex_latex::{CacheKey, Mode, image_tag};
///
/// let key = CacheKey::new("x^2", Mode::Math, false);
/// let tag = image_tag("x^2", Mode::Math, &key, "iVBORw0KGgo=");
/// assert_eq!(
///     tag,
///     "<img class='latex-inline math-true' alt='x^2' id='x2' \
///      src='data:image/png;base64,iVBORw0KGgo='>"
/// );
/// ```
#[must_use]
pub fn image_tag(content: &str, mode: Mode, key: &CacheKey, payload: &str) -> String {
    format!(
        "<img class='latex-inline math-{}' alt='{}' id='{}' src='data:image/png;base64,{}'>",
        mode.is_math(),
        alt_text(content),
        key.short_id(),
        payload
    )
}

/// Sanitize snippet source for the `alt` attribute.
///
/// Quotes are dropped, whitespace runs (including newlines) collapse to a
/// single space, and HTML metacharacters are escaped.
fn alt_text(content: &str) -> String {
    let mut alt = String::with_capacity(content.len());
    let mut pending_space = false;

    for c in content.chars() {
        match c {
            '\'' | '"' => {}
            c if c.is_whitespace() => pending_space = !alt.is_empty(),
            c => {
                if pending_space {
                    alt.push(' ');
                    pending_space = false;
                }
                match c {
                    '&' => alt.push_str("&amp;"),
                    '<' => alt.push_str("&lt;"),
                    '>' => alt.push_str("&gt;"),
                    c => alt.push(c),
                }
            }
        }
    }

    alt
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_mode_class() {
        let key = CacheKey::new("Hello", Mode::Text, false);
        let tag = image_tag("Hello", Mode::Text, &key, "AAAA");
        assert!(tag.starts_with("<img class='latex-inline math-false'"));
        assert!(tag.contains("id='Hello'"));
    }

    #[test]
    fn test_alt_strips_quotes() {
        assert_eq!(alt_text("f'(x) = \"y\""), "f(x) = y");
    }

    #[test]
    fn test_alt_escapes_html() {
        assert_eq!(alt_text("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
    }

    #[test]
    fn test_alt_collapses_whitespace() {
        assert_eq!(alt_text("  a +\n\n   b  "), "a + b");
    }

    #[test]
    fn test_id_is_truncated_key() {
        let content = "\\sum_{i=1}^{n} i = \\frac{n(n+1)}{2}";
        let key = CacheKey::new(content, Mode::Math, false);
        let tag = image_tag(content, Mode::Math, &key, "AAAA");
        assert!(tag.contains("id='sumi1nifracnn12'"));
    }
}
