//! Line-level preprocessor trait.

/// Error returned by a [`Preprocessor`] stage.
pub type StageError = Box<dyn std::error::Error + Send + Sync>;

/// A named stage that rewrites document lines before markdown parsing.
///
/// Preprocessors see the raw document, so they can capture constructs that
/// span what the markdown parser would treat as block boundaries (blank lines,
/// list items, HTML blocks).
///
/// # Example
///
/// ```
/// use mdtex_renderer::{Preprocessor, StageError};
///
/// struct Shout;
///
/// impl Preprocessor for Shout {
///     fn name(&self) -> &str {
///         "shout"
///     }
///
///     fn run(&mut self, lines: Vec<String>) -> Result<Vec<String>, StageError> {
///         Ok(lines.into_iter().map(|l| l.to_uppercase()).collect())
///     }
/// }
///
/// let lines = Shout.run(vec!["hi".to_owned()]).unwrap();
/// assert_eq!(lines, vec!["HI".to_owned()]);
/// ```
pub trait Preprocessor {
    /// Stage name used in logs and errors.
    fn name(&self) -> &str;

    /// Rewrite the document, returning the new lines.
    fn run(&mut self, lines: Vec<String>) -> Result<Vec<String>, StageError>;
}
