//! Arithmetic back-ends shared by every model variant
//!
//! Model equations are written once against [`Arithmetic`]. [`FloatArith`]
//! runs them as the floating-point reference, [`FixedArith`] runs them
//! bit-exactly as the neuro-core would.

use crate::{
    error::{Result, RuntimeError},
    fixed::{self, DecayConstant, FixedBias},
};
use core::fmt;
use core::ops::{Add, Sub};
use fxsnn_scaling::HardwareSpec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Numeric back-end of a neuron population
pub trait Arithmetic: fmt::Debug + Clone + Send + Sync {
    /// State and parameter values
    type Value: Copy
        + Default
        + PartialEq
        + PartialOrd
        + fmt::Debug
        + Send
        + Sync
        + Add<Output = Self::Value>
        + Sub<Output = Self::Value>;
    /// Per-step decay (and coupling) constants
    type Decay: Copy + PartialEq + fmt::Debug + Send + Sync;
    /// Bias encoding
    type Bias: Copy + PartialEq + fmt::Debug + Send + Sync;

    /// `x * (1 - d)`
    fn decay(&self, x: Self::Value, d: Self::Decay) -> Self::Value;

    /// `x * factor`, with `factor` encoded like a decay constant
    fn scale(&self, x: Self::Value, factor: Self::Decay) -> Self::Value;

    /// Incoming activation as seen by the core
    fn align_input(&self, input: Self::Value) -> Self::Value;

    /// Add an input to an already decayed synaptic trace, wrapping on
    /// overflow
    fn integrate(&self, decayed: Self::Value, input: Self::Value) -> Self::Value;

    /// Saturate a voltage-like register
    fn clip(&self, x: Self::Value) -> Self::Value;

    /// Bias contribution per step
    fn effective_bias(&self, bias: Self::Bias) -> Self::Value;

    /// Threshold register as compared against the voltage
    fn scale_threshold(&self, threshold: Self::Value) -> Self::Value;

    /// Check a decay constant
    fn check_decay(&self, name: &str, d: Self::Decay) -> Result<()>;

    /// Check a bias
    fn check_bias(&self, name: &str, bias: Self::Bias) -> Result<()>;

    /// Check an unscaled threshold register
    fn check_threshold(&self, name: &str, threshold: Self::Value) -> Result<()>;

    /// Check one incoming activation before it reaches the core
    fn check_input(&self, index: usize, input: Self::Value) -> Result<()>;

    /// Widen a value for snapshots and recordings
    fn to_f64(x: Self::Value) -> f64;
}

/// Floating-point reference arithmetic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FloatArith;

impl FloatArith {
    fn check_finite(name: &str, x: f64) -> Result<()> {
        if x.is_finite() {
            Ok(())
        } else {
            Err(RuntimeError::invalid_parameter(name, x.to_string(), "finite"))
        }
    }
}

impl Arithmetic for FloatArith {
    type Value = f64;
    type Decay = f64;
    type Bias = f64;

    #[inline]
    fn decay(&self, x: f64, d: f64) -> f64 {
        x * (1.0 - d)
    }

    #[inline]
    fn scale(&self, x: f64, factor: f64) -> f64 {
        x * factor
    }

    #[inline]
    fn align_input(&self, input: f64) -> f64 {
        input
    }

    #[inline]
    fn integrate(&self, decayed: f64, input: f64) -> f64 {
        decayed + input
    }

    #[inline]
    fn clip(&self, x: f64) -> f64 {
        x
    }

    #[inline]
    fn effective_bias(&self, bias: f64) -> f64 {
        bias
    }

    #[inline]
    fn scale_threshold(&self, threshold: f64) -> f64 {
        threshold
    }

    fn check_decay(&self, name: &str, d: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&d) {
            return Err(RuntimeError::invalid_parameter(name, d.to_string(), "in [0, 1]"));
        }
        Ok(())
    }

    fn check_bias(&self, name: &str, bias: f64) -> Result<()> {
        Self::check_finite(name, bias)
    }

    fn check_threshold(&self, name: &str, threshold: f64) -> Result<()> {
        Self::check_finite(name, threshold)
    }

    fn check_input(&self, index: usize, input: f64) -> Result<()> {
        if input.is_finite() {
            Ok(())
        } else {
            Err(RuntimeError::InputRange {
                index,
                value: input.to_string(),
                constraint: "finite".into(),
            })
        }
    }

    #[inline]
    fn to_f64(x: f64) -> f64 {
        x
    }
}

/// Bit-exact fixed-point arithmetic over an injected hardware table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FixedArith {
    spec: HardwareSpec,
}

impl FixedArith {
    /// Create a back-end for the given hardware
    pub fn new(spec: HardwareSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self { spec })
    }

    /// Hardware table in use
    pub fn spec(&self) -> &HardwareSpec {
        &self.spec
    }

    fn max_val(&self) -> i64 {
        self.spec.max_val() as i64
    }
}

impl Arithmetic for FixedArith {
    type Value = i32;
    type Decay = DecayConstant;
    type Bias = FixedBias;

    #[inline]
    fn decay(&self, x: i32, d: DecayConstant) -> i32 {
        fixed::decay(x, d.effective(), self.spec.decay_bits)
    }

    #[inline]
    fn scale(&self, x: i32, factor: DecayConstant) -> i32 {
        fixed::scale(x, factor.effective(), self.spec.decay_bits)
    }

    #[inline]
    fn align_input(&self, input: i32) -> i32 {
        ((input as i64) << self.spec.activation_shift) as i32
    }

    #[inline]
    fn integrate(&self, decayed: i32, input: i32) -> i32 {
        let unfolded = decayed as i64 + ((input as i64) << self.spec.activation_shift);
        fixed::wrap(unfolded, self.max_val()) as i32
    }

    #[inline]
    fn clip(&self, x: i32) -> i32 {
        fixed::clip(x as i64, self.max_val())
    }

    #[inline]
    fn effective_bias(&self, bias: FixedBias) -> i32 {
        bias.effective()
    }

    #[inline]
    fn scale_threshold(&self, threshold: i32) -> i32 {
        threshold << self.spec.threshold_shift
    }

    fn check_decay(&self, name: &str, d: DecayConstant) -> Result<()> {
        d.check(&self.spec).map_err(|_| {
            RuntimeError::invalid_parameter(
                name,
                format!("{}+{}", d.value(), d.offset()),
                format!("value < {} and offset in {{0, 1}}", self.spec.decay_unity()),
            )
        })
    }

    fn check_bias(&self, _name: &str, bias: FixedBias) -> Result<()> {
        bias.check(&self.spec)
    }

    fn check_input(&self, index: usize, input: i32) -> Result<()> {
        let max = self.spec.max_activation();
        if input < -max || input > max {
            return Err(RuntimeError::InputRange {
                index,
                value: input.to_string(),
                constraint: format!("in [-{}, {}]", max, max),
            });
        }
        Ok(())
    }

    fn check_threshold(&self, name: &str, threshold: i32) -> Result<()> {
        if threshold < 0 || threshold > self.spec.threshold_max() {
            return Err(RuntimeError::invalid_parameter(
                name,
                threshold.to_string(),
                format!("in [0, {}]", self.spec.threshold_max()),
            ));
        }
        Ok(())
    }

    #[inline]
    fn to_f64(x: i32) -> f64 {
        x as f64
    }
}
