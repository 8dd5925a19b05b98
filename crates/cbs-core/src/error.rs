//! Error taxonomy shared by the framework and every codec plug-in.

use thiserror::Error;

/// Errors produced by the coded bitstream framework.
///
/// Codec plug-ins define their own error enum and convert into this one at
/// the [`crate::plugin::CodecPlugin`] boundary, the same way each of this
/// crate's sibling codec crates keeps a codec-tagged error type and maps it
/// onto the shared one rather than reusing it directly.
#[derive(Debug, Error)]
pub enum CbsError {
    #[error("insufficient data: needed {needed} bits, {available} available")]
    InsufficientData { needed: usize, available: usize },

    #[error("invalid data in {element}: {message}")]
    InvalidData { element: String, message: String },

    #[error("write buffer too small: needed {needed} bytes, {available} available")]
    Overflow { needed: usize, available: usize },

    #[error("out of memory")]
    OutOfMemory,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("unit dropped by operating point filter")]
    TryAgain,

    #[error("{0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, CbsError>;

impl CbsError {
    pub fn invalid_data(element: impl Into<String>, message: impl Into<String>) -> Self {
        CbsError::InvalidData {
            element: element.into(),
            message: message.into(),
        }
    }

    pub fn insufficient_data(needed: usize, available: usize) -> Self {
        CbsError::InsufficientData { needed, available }
    }

    /// True if the fragment should be discarded on this error. Per-unit
    /// `Unsupported` is recoverable and `TryAgain` is a deliberate per-unit
    /// drop, neither aborts the whole fragment.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CbsError::Unsupported(_) | CbsError::TryAgain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_and_try_again_are_not_fatal() {
        assert!(!CbsError::Unsupported("scalability".into()).is_fatal());
        assert!(!CbsError::TryAgain.is_fatal());
    }

    #[test]
    fn invalid_data_is_fatal() {
        assert!(CbsError::invalid_data("obu_size", "too large").is_fatal());
    }
}
