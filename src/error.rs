use thiserror::Error;

use crate::models::Target;

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Failure of a single link. Never affects other links of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Missing scheme, unusable host/port, missing credentials or a
    /// cipher rejected under the strict cipher policy.
    #[error("malformed uri: {0}")]
    MalformedUri(String),

    /// Known or unknown scheme without an outbound mapping for the target.
    #[error("unsupported scheme {scheme} for target {target}")]
    UnsupportedScheme { scheme: String, target: Target },

    /// No base64 variant decoded the segment. Callers fall back to plain text.
    #[error("ambiguous encoding: {0}")]
    EncodingAmbiguous(String),
}

impl ParseError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ParseError::MalformedUri(msg.into())
    }
}
