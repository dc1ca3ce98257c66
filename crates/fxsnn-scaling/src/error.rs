//! Error types for float-to-fixed scaling

use crate::variables::VariableClass;
use core::fmt;
use thiserror::Error;

/// Result type for scaling operations
pub type Result<T> = std::result::Result<T, ScalingError>;

/// Which side of the admissible amplitude interval is meant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Smallest amplitude keeping nonzero values representable
    Lower,
    /// Largest amplitude keeping values below their ceiling
    Upper,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Lower => write!(f, "lower"),
            Bound::Upper => write!(f, "upper"),
        }
    }
}

/// Errors that can occur while solving for scaling parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScalingError {
    /// Lower and upper amplitude bounds cross; the ranges cannot be
    /// represented with the available bit budget
    #[error(
        "Parameter ranges not compatible for F2F conversion: \
         upper bound A={max_a:e} set by '{upper_variable}' ({upper_class}) \
         is below lower bound A={min_a:e} set by '{lower_variable}' ({lower_class})"
    )]
    Infeasible {
        /// Largest admissible amplitude
        max_a: f64,
        /// Smallest admissible amplitude
        min_a: f64,
        /// Variable that set the upper bound
        upper_variable: String,
        /// Class of the upper-bound variable
        upper_class: VariableClass,
        /// Variable that set the lower bound
        lower_variable: String,
        /// Class of the lower-bound variable
        lower_class: VariableClass,
    },

    /// Simulation step size unusable for deriving alpha
    #[error("Invalid timestep dt={dt} (expected finite value > 0)")]
    InvalidTimestep {
        /// Offending step size
        dt: f64,
    },

    /// Observed range rejected at capture time
    #[error("Invalid range for '{name}': [{min}, {max}]")]
    InvalidRange {
        /// Variable name
        name: String,
        /// Observed minimum
        min: f64,
        /// Observed maximum
        max: f64,
    },

    /// Observed variable has no entry in the model's scaling table
    #[error("Variable '{name}' has no forward scaling law in model '{model}'")]
    UnknownVariable {
        /// Variable name
        name: String,
        /// Model the table belongs to
        model: String,
    },

    /// No variable constrained the requested side of the interval
    #[error("No variable constrains the {bound} amplitude bound")]
    Unconstrained {
        /// Unconstrained side
        bound: Bound,
    },

    /// Hardware table with a register width or shift the core cannot have
    #[error("Invalid hardware {field}={value} (expected {expected})")]
    InvalidHardware {
        /// Offending field of the hardware table
        field: &'static str,
        /// Its value
        value: u32,
        /// Admissible values
        expected: String,
    },
}

impl ScalingError {
    /// Create an invalid range error
    pub fn invalid_range(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self::InvalidRange {
            name: name.into(),
            min,
            max,
        }
    }

    /// Create an invalid hardware error
    pub fn invalid_hardware(field: &'static str, value: u32, expected: impl Into<String>) -> Self {
        Self::InvalidHardware {
            field,
            value,
            expected: expected.into(),
        }
    }

    /// Create an unknown variable error
    pub fn unknown_variable(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self::UnknownVariable {
            name: name.into(),
            model: model.into(),
        }
    }
}
