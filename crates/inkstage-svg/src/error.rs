use thiserror::Error;

/// Markup that cannot become a raster skin.
///
/// Returned before any skin state is touched; callers keep their previous
/// content when they see this.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContentFormatError {
    /// Input was empty or whitespace only.
    #[error("vector markup is empty")]
    Empty,

    /// Document parsed far enough to find a root, but it is not `<svg>`.
    #[error("document does not appear to be SVG (root element `{root}`)")]
    NotSvg { root: String },

    /// The XML/SVG parser rejected the document.
    #[error("malformed vector markup: {0}")]
    Malformed(String),
}
