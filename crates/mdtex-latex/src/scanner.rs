//! Delimiter scanning for LaTeX snippets.
//!
//! Three kinds of regions are recognized:
//!
//! - `%%...%%`: preamble fragments, removed by [`extract_preamble`]
//! - `%...%`: text-mode snippets
//! - `$...$`: math-mode snippets
//!
//! A delimiter immediately preceded by a backslash is literal. Regions close
//! at the first matching delimiter, may span lines, and never nest: inside a
//! math region `%` is ordinary content and vice versa. An opening delimiter
//! without a matching close is left as literal text.

use std::fmt;
use std::ops::Range;

/// Preamble fragment marker.
const PREAMBLE_MARKER: &str = "%%";

/// Escape character for delimiters.
const ESCAPE: char = '\\';

/// Rendering mode of a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Inserted verbatim into the document body (`%...%`).
    Text,
    /// Wrapped in inline math delimiters (`$...$`).
    Math,
}

impl Mode {
    /// Delimiter character that opens and closes this mode.
    #[must_use]
    pub fn delimiter(self) -> char {
        match self {
            Self::Text => '%',
            Self::Math => '$',
        }
    }

    /// Mode opened by `c`, if it is a snippet delimiter.
    #[must_use]
    pub fn from_delimiter(c: char) -> Option<Self> {
        match c {
            '%' => Some(Self::Text),
            '$' => Some(Self::Math),
            _ => None,
        }
    }

    /// Whether this is math mode.
    #[must_use]
    pub fn is_math(self) -> bool {
        matches!(self, Self::Math)
    }

    /// Lowercase mode name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Math => "math",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delimited snippet found in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet<'a> {
    /// Raw content between the delimiters.
    pub content: &'a str,
    /// Rendering mode.
    pub mode: Mode,
    /// Byte range of the whole region, delimiters included.
    pub span: Range<usize>,
}

/// Scan `text` for text-mode and math-mode snippets.
///
/// # Example
///
/// ```
/// use mdtex_latex::{Mode, scan};
///
/// let snippets: Vec<_> = scan(r"Area $\pi r^2$ costs 5\$").collect();
/// assert_eq!(snippets.len(), 1);
/// assert_eq!(snippets[0].content, r"\pi r^2");
/// assert_eq!(snippets[0].mode, Mode::Math);
/// ```
#[must_use]
pub fn scan(text: &str) -> Scanner<'_> {
    Scanner::new(text)
}

/// Lazy iterator over the snippets of a text.
///
/// Single pass over the characters with an outside/inside state and an escape
/// flag; no backtracking except past an unterminated opening delimiter.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a scanner positioned at the start of `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// Byte offset where the next search starts.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Restart scanning at `offset`.
    ///
    /// Offsets past the end, or inside a multi-byte character, are clamped
    /// forward to the next character boundary.
    pub fn resume_at(&mut self, offset: usize) {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset += 1;
        }
        self.pos = offset;
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Snippet<'a>;

    fn next(&mut self) -> Option<Snippet<'a>> {
        // Delimiter kinds already known to have no closing mark ahead
        let mut unterminated: Option<Mode> = None;

        'search: loop {
            let mut open: Option<(usize, Mode)> = None;
            let mut escaped = self.pos > 0 && self.text[..self.pos].ends_with(ESCAPE);

            for (rel, c) in self.text[self.pos..].char_indices() {
                let idx = self.pos + rel;
                let literal = escaped;
                escaped = c == ESCAPE;
                if literal {
                    continue;
                }

                match open {
                    None => {
                        if let Some(mode) = Mode::from_delimiter(c)
                            && unterminated != Some(mode)
                        {
                            open = Some((idx, mode));
                        }
                    }
                    Some((start, mode)) if c == mode.delimiter() => {
                        let end = idx + c.len_utf8();
                        self.pos = end;
                        return Some(Snippet {
                            content: &self.text[start + 1..idx],
                            mode,
                            span: start..end,
                        });
                    }
                    Some(_) => {}
                }
            }

            match open {
                Some((start, mode)) => {
                    // No closing mark: the opener is literal, rescan after it
                    tracing::trace!(offset = start, %mode, "unterminated delimiter");
                    unterminated = Some(mode);
                    self.pos = start + 1;
                    continue 'search;
                }
                None => {
                    self.pos = self.text.len();
                    return None;
                }
            }
        }
    }
}

/// Remove `%%...%%` preamble fragments from `text`.
///
/// Returns the remaining text and the fragments in source order. A marker
/// preceded by a backslash is literal; an unpaired marker is left in place.
///
/// # Example
///
/// ```
/// use mdtex_latex::extract_preamble;
///
/// let (text, fragments) = extract_preamble("%%\\usepackage{tikz}%%Body");
/// assert_eq!(text, "Body");
/// assert_eq!(fragments, vec!["\\usepackage{tikz}".to_owned()]);
/// ```
#[must_use]
pub fn extract_preamble(text: &str) -> (String, Vec<String>) {
    let mut stripped = String::with_capacity(text.len());
    let mut fragments = Vec::new();
    let mut copied = 0;

    while let Some(open) = find_marker(text, copied)
        && let Some(close) = find_marker(text, open + PREAMBLE_MARKER.len())
    {
        stripped.push_str(&text[copied..open]);
        fragments.push(text[open + PREAMBLE_MARKER.len()..close].to_owned());
        copied = close + PREAMBLE_MARKER.len();
    }

    stripped.push_str(&text[copied..]);
    (stripped, fragments)
}

/// Find the next unescaped preamble marker at or after `from`.
fn find_marker(text: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(rel) = text[search..].find(PREAMBLE_MARKER) {
        let idx = search + rel;
        if !text[..idx].ends_with(ESCAPE) {
            return Some(idx);
        }
        search = idx + 1;
    }
    None
}
