//! CLI command implementations.

mod common;
pub(crate) mod html;
pub(crate) mod preprocess;

pub(crate) use html::HtmlArgs;
pub(crate) use preprocess::PreprocessArgs;
