//! Constants for snippet rendering.

/// Packages loaded by every synthesized render document.
pub const CORE_PACKAGES: [&str; 4] = ["amsmath", "amsthm", "amssymb", "bm"];

/// Default document class of the render document.
pub const DEFAULT_DOCUMENT_CLASS: &str = "article";

/// Default rasterizer magnification (`dvipng -x`).
pub const DEFAULT_MAGNIFICATION: u32 = 1200;

/// Characters of the cache key used in the image `id` attribute.
pub const ID_LEN: usize = 15;

/// Name under which the preprocessor registers with a markdown pipeline.
pub const STAGE_NAME: &str = "latex";
