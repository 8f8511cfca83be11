//! Render document synthesis.

use crate::consts::{CORE_PACKAGES, DEFAULT_DOCUMENT_CLASS};
use crate::scanner::Mode;

/// Document header shared by every snippet rendered in a run.
///
/// Holds the document class, the packages to load and the fragments
/// harvested from `%%...%%` regions. [`document`](Self::document) wraps a
/// snippet into a complete standalone LaTeX document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    document_class: String,
    packages: Vec<String>,
    fragments: Vec<String>,
}

impl Preamble {
    /// Create a preamble with the core math packages plus `extra_packages`.
    #[must_use]
    pub fn new(document_class: impl Into<String>, extra_packages: &[String]) -> Self {
        let mut packages: Vec<String> = CORE_PACKAGES.iter().map(|p| (*p).to_owned()).collect();
        for package in extra_packages {
            if !packages.contains(package) {
                packages.push(package.clone());
            }
        }

        Self {
            document_class: document_class.into(),
            packages,
            fragments: Vec::new(),
        }
    }

    /// Append a raw preamble fragment.
    pub fn push_fragment(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }

    /// Fragments appended so far.
    #[must_use]
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Build the standalone document for a snippet.
    #[must_use]
    pub fn document(&self, content: &str, mode: Mode) -> String {
        let mut doc = String::with_capacity(256 + content.len());

        doc.push_str("\\documentclass{");
        doc.push_str(&self.document_class);
        doc.push_str("}\n");
        for package in &self.packages {
            doc.push_str("\\usepackage{");
            doc.push_str(package);
            doc.push_str("}\n");
        }
        doc.push_str("\\pagestyle{empty}\n");
        for fragment in &self.fragments {
            doc.push_str(fragment);
            doc.push('\n');
        }

        doc.push_str("\\begin{document}\n");
        match mode {
            Mode::Math => {
                doc.push('$');
                doc.push_str(content);
                doc.push('$');
            }
            Mode::Text => doc.push_str(content),
        }
        doc.push_str("\n\\end{document}\n");
        doc
    }
}

impl Default for Preamble {
    fn default() -> Self {
        Self::new(DEFAULT_DOCUMENT_CLASS, &[])
    }
}
