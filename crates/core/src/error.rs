/// Domain-level error shared by every crate in the workspace.
///
/// HTTP mapping lives in the API crate; consumers map these onto their own
/// invocation errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A required field was missing or empty. Never retried.
    #[error("{0}")]
    Validation(String),

    /// An unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}
