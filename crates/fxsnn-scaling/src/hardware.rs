//! Hardware constant table for the fixed-point target
//!
//! Register widths and alignment shifts are injected wherever they are
//! needed (solver, fixed-point arithmetic, quantizer) instead of living in
//! module-level state.

use crate::{
    error::{Result, ScalingError},
    variables::VariableClass,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bit widths and MSB alignment shifts of the target neuro-core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HardwareSpec {
    /// Width of state registers (synaptic trace, voltage), signed
    pub state_bits: u32,
    /// Precision of decay constants, unsigned
    pub decay_bits: u32,
    /// Width of the bias mantissa, signed
    pub bias_mant_bits: u32,
    /// Width of the bias exponent
    pub bias_exp_bits: u32,
    /// Width of threshold registers, unsigned
    pub threshold_bits: u32,
    /// Width of synaptic weights including sign
    pub weight_bits: u32,
    /// Left shift applied to incoming activation
    pub activation_shift: u32,
    /// Left shift applied to thresholds before comparison
    pub threshold_shift: u32,
    /// Threshold steps of growth reserved below the ceiling for adaptive
    /// thresholds
    pub headroom_steps: u32,
}

impl Default for HardwareSpec {
    fn default() -> Self {
        Self {
            state_bits: 24,
            decay_bits: 12,
            bias_mant_bits: 13,
            bias_exp_bits: 3,
            threshold_bits: 17,
            weight_bits: 9,
            activation_shift: 6,
            threshold_shift: 6,
            headroom_steps: 3,
        }
    }
}

impl HardwareSpec {
    /// Same register widths with both alignment shifts disabled, for
    /// parameters that were MSB-aligned before reaching the core
    pub fn unaligned() -> Self {
        Self {
            activation_shift: 0,
            threshold_shift: 0,
            ..Self::default()
        }
    }

    /// Check that every width and shift fits the 32-bit datapath.
    ///
    /// Three state terms are summed in 32 bits before saturation, and an
    /// aligned threshold or activation must fit the state register.
    pub fn validate(&self) -> Result<()> {
        if !(2..=28).contains(&self.state_bits) {
            return Err(ScalingError::invalid_hardware("state_bits", self.state_bits, "2..=28"));
        }
        if !(1..=15).contains(&self.decay_bits) {
            return Err(ScalingError::invalid_hardware("decay_bits", self.decay_bits, "1..=15"));
        }
        if !(2..=16).contains(&self.bias_mant_bits) {
            return Err(ScalingError::invalid_hardware(
                "bias_mant_bits",
                self.bias_mant_bits,
                "2..=16",
            ));
        }
        if self.bias_exp_bits > 3 {
            return Err(ScalingError::invalid_hardware(
                "bias_exp_bits",
                self.bias_exp_bits,
                "0..=3",
            ));
        }
        if !(1..=16).contains(&self.weight_bits) {
            return Err(ScalingError::invalid_hardware("weight_bits", self.weight_bits, "1..=16"));
        }
        let threshold_width = self.threshold_bits + self.threshold_shift;
        if self.threshold_bits == 0 || threshold_width > self.state_bits {
            return Err(ScalingError::invalid_hardware(
                "threshold_bits",
                self.threshold_bits,
                format!(
                    "1..={} with a threshold shift of {}",
                    self.state_bits.saturating_sub(self.threshold_shift),
                    self.threshold_shift
                ),
            ));
        }
        if self.activation_shift >= self.state_bits - 1 {
            return Err(ScalingError::invalid_hardware(
                "activation_shift",
                self.activation_shift,
                format!("< {}", self.state_bits - 1),
            ));
        }
        Ok(())
    }

    /// Set the activation alignment shift
    pub fn with_activation_shift(mut self, shift: u32) -> Self {
        self.activation_shift = shift;
        self
    }

    /// Set the threshold alignment shift
    pub fn with_threshold_shift(mut self, shift: u32) -> Self {
        self.threshold_shift = shift;
        self
    }

    /// Set the adaptive-threshold headroom
    pub fn with_headroom_steps(mut self, steps: u32) -> Self {
        self.headroom_steps = steps;
        self
    }

    /// Wrap modulus of state registers, `2^(state_bits - 1)`
    pub const fn max_val(&self) -> i32 {
        1 << (self.state_bits - 1)
    }

    /// Fixed-point representation of 1.0 for decay constants
    pub const fn decay_unity(&self) -> i64 {
        1 << self.decay_bits
    }

    /// Inclusive range of the signed bias mantissa
    pub const fn bias_mant_range(&self) -> (i32, i32) {
        let half = 1 << (self.bias_mant_bits - 1);
        (-half, half - 1)
    }

    /// Largest bias exponent magnitude
    pub const fn bias_exp_max(&self) -> i32 {
        (1 << self.bias_exp_bits) - 1
    }

    /// Largest activation magnitude whose aligned value stays inside the
    /// state register
    pub const fn max_activation(&self) -> i32 {
        (self.max_val() >> self.activation_shift) - 1
    }

    /// Largest unsigned threshold register value
    pub const fn threshold_max(&self) -> i32 {
        (1 << self.threshold_bits) - 1
    }

    /// Representable ceiling of a variable class before alignment.
    ///
    /// Scaled magnitudes must stay strictly below `ceiling - 1`.
    pub fn ceiling(&self, class: VariableClass) -> f64 {
        let bits = match class {
            VariableClass::Voltage
            | VariableClass::Current
            | VariableClass::RefractoryState
            | VariableClass::TimeConstant => self.state_bits - 1,
            VariableClass::Weight => self.weight_bits - 1,
            VariableClass::BiasMantissa => self.bias_mant_bits - 1,
            VariableClass::BiasExponent => self.bias_exp_bits,
            VariableClass::Threshold => self.threshold_bits,
            VariableClass::Activation => self.state_bits - 1 - self.activation_shift,
        };
        2f64.powi(bits as i32)
    }
}
