//! Error types for the neuron dynamics runtime

use fxsnn_scaling::ScalingError;
use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur while building or stepping a population
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Float-to-fixed scaling failed
    #[error("Scaling error: {source}")]
    Scaling {
        #[from]
        /// Source scaling error
        source: ScalingError,
    },

    /// Invalid population configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Reason for invalid configuration
        reason: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Input vector does not match the population size
    #[error("Input length {actual} does not match population size {expected}")]
    InputLength {
        /// Population size
        expected: usize,
        /// Length of the rejected input
        actual: usize,
    },

    /// Input value the core cannot accept
    #[error("Input {value} for neuron {index} out of range (expected {constraint})")]
    InputRange {
        /// Neuron index
        index: usize,
        /// Rejected value
        value: String,
        /// Admissible range
        constraint: String,
    },

    /// Shape or broadcast error
    #[error("Shape error: {reason}")]
    Shape {
        /// Reason for shape error
        reason: String,
    },

    /// Operation not available for a model variant
    #[error("Variant '{variant}' does not support {operation}")]
    Unsupported {
        /// Variant name
        variant: String,
        /// Requested operation
        operation: String,
    },

    /// Fixed-point run disagrees with the float reference
    #[error("Validation failed: agreement {agreement:.3} below {required:.3}")]
    ValidationFailed {
        /// Observed spike agreement ratio
        agreement: f64,
        /// Required agreement ratio
        required: f64,
    },

    /// A float value has no fixed-point representation
    #[error("Cannot quantize {parameter}={value}: {reason}")]
    Quantization {
        /// Parameter name
        parameter: String,
        /// Float value
        value: f64,
        /// Reason for failure
        reason: String,
    },
}

impl RuntimeError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Create a shape error
    pub fn shape(reason: impl Into<String>) -> Self {
        Self::Shape {
            reason: reason.into(),
        }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(variant: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            variant: variant.into(),
            operation: operation.into(),
        }
    }

    /// Create a quantization error
    pub fn quantization(parameter: impl Into<String>, value: f64, reason: impl Into<String>) -> Self {
        Self::Quantization {
            parameter: parameter.into(),
            value,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RuntimeError::invalid_config("empty shape");
        assert!(matches!(err, RuntimeError::InvalidConfiguration { .. }));

        let err = RuntimeError::invalid_parameter("bias_exp", "9", "|exp| <= 7");
        assert!(matches!(err, RuntimeError::InvalidParameter { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = RuntimeError::InputLength {
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Input length 3 does not match population size 4"
        );

        let err = RuntimeError::unsupported("lif_delta", "float-to-fixed scaling");
        assert!(err.to_string().contains("lif_delta"));
    }

    #[test]
    fn test_scaling_error_converts() {
        let err: RuntimeError = ScalingError::InvalidTimestep { dt: 0.0 }.into();
        assert!(matches!(err, RuntimeError::Scaling { .. }));
    }
}
