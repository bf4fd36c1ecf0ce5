//! Error types for quantized weight packing and precision casts

use crate::api::types::ComputeType;
use thiserror::Error;

/// Result type for qnbit operations
pub type QuantResult<T> = Result<T, QuantError>;

/// Errors raised by the checked entry points before any kernel runs
#[derive(Debug, Error)]
pub enum QuantError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },

    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("Block length {0} must be a power of two in [16, 256]")]
    InvalidBlockLen(usize),

    #[error("Unsupported quantization bit width: {0}")]
    UnsupportedBits(usize),

    #[error("No packing rule for compute type {0}")]
    UnsupportedComputeType(ComputeType),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}
