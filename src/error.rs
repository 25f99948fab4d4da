//! Error types for the segment-lens explanation engine.
//!
//! All failures surface through the [`LensError`] enum; nothing is retried or
//! recovered inside the engine, and no partial results are returned on failure.

use thiserror::Error;

/// The main error type for the segment-lens engine.
#[derive(Error, Debug)]
pub enum LensError {
    /// A requested enumeration order outside the supported range of 1..=3.
    #[error("Unsupported enumeration order {order}: only orders 1 through 3 are supported")]
    UnsupportedOrder {
        /// The order that was requested
        order: usize,
    },

    /// A fixed-capacity aggregate table overflowed.
    ///
    /// Tables never resize; callers size them to the largest frontier they can
    /// produce, so overflow indicates a programming error in capacity sizing.
    #[error("Aggregate table capacity of {capacity} slots exceeded")]
    CapacityExceeded {
        /// Capacity of the table that overflowed
        capacity: usize,
    },

    /// A worker thread panicked during candidate enumeration.
    ///
    /// The controller joins every worker before reporting the first panic.
    #[error("Worker thread panicked: {message}")]
    WorkerPanicked {
        /// Payload of the first observed panic
        message: String,
    },

    /// Inputs that violate the engine's dimensional contracts.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A type alias for `Result<T, LensError>`.
pub type Result<T> = std::result::Result<T, LensError>;

impl LensError {
    /// Creates an invalid input error with the given message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_order_message() {
        let err = LensError::UnsupportedOrder { order: 4 };
        assert_eq!(
            err.to_string(),
            "Unsupported enumeration order 4: only orders 1 through 3 are supported"
        );
    }

    #[test]
    fn test_capacity_exceeded_message() {
        let err = LensError::CapacityExceeded { capacity: 1024 };
        assert_eq!(err.to_string(), "Aggregate table capacity of 1024 slots exceeded");
    }

    #[test]
    fn test_invalid_input_constructor() {
        let err = LensError::invalid_input("aggregate column 1 has 3 rows, expected 4");
        assert!(err.to_string().contains("expected 4"));
    }
}
