//! Error types for liveseq views.

use thiserror::Error;

/// Result type alias for liveseq operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for view, tracker and mapping operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The object was used after it had been disposed.
    #[error("object already disposed: {object}")]
    Disposed {
        object: &'static str,
    },
    /// The operation is not supported by this configuration.
    #[error("operation not supported: {operation}")]
    Unsupported {
        operation: &'static str,
    },
    /// An index fell outside the bounds of the current snapshot.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
    },
    /// A required argument was not provided.
    #[error("missing required argument: {name}")]
    MissingArgument {
        name: &'static str,
    },
}

impl Error {
    /// Creates a use-after-dispose error.
    pub fn disposed(object: &'static str) -> Self {
        Error::Disposed { object }
    }

    /// Creates an unsupported operation error.
    pub fn unsupported(operation: &'static str) -> Self {
        Error::Unsupported { operation }
    }

    /// Creates an out-of-bounds error.
    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        Error::IndexOutOfBounds { index, len }
    }

    /// Creates a missing argument error.
    pub fn missing_argument(name: &'static str) -> Self {
        Error::MissingArgument { name }
    }

    /// Returns true if this error reports use of a disposed object.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        matches!(self, Error::Disposed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::disposed("FilteredView");
        assert!(err.to_string().contains("already disposed"));
        assert!(err.to_string().contains("FilteredView"));

        let err = Error::out_of_bounds(7, 3);
        assert_eq!(err.to_string(), "index 7 out of bounds for length 3");

        let err = Error::missing_argument("selector");
        assert!(err.to_string().contains("selector"));
    }

    #[test]
    fn test_error_constructors() {
        let err = Error::unsupported("update_index");
        match err {
            Error::Unsupported { operation } => assert_eq!(operation, "update_index"),
            _ => panic!("Wrong error type"),
        }
        assert!(Error::disposed("x").is_disposed());
        assert!(!Error::unsupported("x").is_disposed());
    }
}
