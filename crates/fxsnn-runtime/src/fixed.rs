//! Fixed-point register primitives of the neuro-core
//!
//! State registers are 24-bit signed values carried in `i32`. Products are
//! promoted to `i64` before shifting back, so no intermediate overflows.
//! Two overflow policies exist: the synaptic trace wraps modulo
//! `2 * max_val`, everything else saturates one below `max_val`.

use crate::error::{Result, RuntimeError};
use fxsnn_scaling::HardwareSpec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Decay constant: unsigned fraction of `2^decay_bits` plus a 1-bit offset.
///
/// The offset lets a decay reach exactly `2^decay_bits` (full decay), which
/// the value register alone cannot hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecayConstant {
    value: u16,
    offset: u16,
}

impl DecayConstant {
    /// No decay: the register keeps its value
    pub const NONE: Self = Self {
        value: 0,
        offset: 0,
    };

    /// Create a validated decay constant
    pub fn new(value: u16, offset: u16, spec: &HardwareSpec) -> Result<Self> {
        let decay = Self { value, offset };
        decay.check(spec)?;
        Ok(decay)
    }

    /// Full decay, the register is cleared every step
    pub fn full(spec: &HardwareSpec) -> Self {
        Self {
            value: (spec.decay_unity() - 1) as u16,
            offset: 1,
        }
    }

    /// Value register
    pub const fn value(&self) -> u16 {
        self.value
    }

    /// Offset bit
    pub const fn offset(&self) -> u16 {
        self.offset
    }

    /// `value + offset`, in `[0, 2^decay_bits]`
    pub const fn effective(&self) -> i64 {
        self.value as i64 + self.offset as i64
    }

    /// Check both registers against the hardware widths
    pub fn check(&self, spec: &HardwareSpec) -> Result<()> {
        if self.offset > 1 {
            return Err(RuntimeError::invalid_parameter(
                "decay offset",
                self.offset.to_string(),
                "0 or 1",
            ));
        }
        if self.value as i64 >= spec.decay_unity() {
            return Err(RuntimeError::invalid_parameter(
                "decay value",
                self.value.to_string(),
                format!("< {}", spec.decay_unity()),
            ));
        }
        Ok(())
    }
}

/// Bias as mantissa and exponent registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FixedBias {
    /// Signed mantissa
    pub mant: i16,
    /// Signed exponent, applied as a shift
    pub exp: i8,
}

impl FixedBias {
    /// Create a bias without range checks
    pub const fn new(mant: i16, exp: i8) -> Self {
        Self { mant, exp }
    }

    /// `mant << exp` for non-negative exponents, `mant >> -exp` otherwise
    pub const fn effective(&self) -> i32 {
        let mant = self.mant as i32;
        if self.exp >= 0 {
            mant << self.exp
        } else {
            mant >> -(self.exp as i32)
        }
    }

    /// Check mantissa and exponent against the hardware widths
    pub fn check(&self, spec: &HardwareSpec) -> Result<()> {
        let (lo, hi) = spec.bias_mant_range();
        let mant = self.mant as i32;
        if mant < lo || mant > hi {
            return Err(RuntimeError::invalid_parameter(
                "bias_mant",
                mant.to_string(),
                format!("in [{}, {}]", lo, hi),
            ));
        }
        if (self.exp as i32).abs() > spec.bias_exp_max() {
            return Err(RuntimeError::invalid_parameter(
                "bias_exp",
                self.exp.to_string(),
                format!("|exp| <= {}", spec.bias_exp_max()),
            ));
        }
        Ok(())
    }
}

/// `x * (2^bits - effective) >> bits`, truncated toward zero
#[inline]
pub const fn decay(x: i32, effective: i64, decay_bits: u32) -> i32 {
    scale(x, (1i64 << decay_bits) - effective, decay_bits)
}

/// `x * factor >> bits`, truncated toward zero
#[inline]
pub const fn scale(x: i32, factor: i64, bits: u32) -> i32 {
    let product = x as i64 * factor;
    let magnitude = product.abs() >> bits;
    (if product < 0 { -magnitude } else { magnitude }) as i32
}

/// Fold an unfolded trace value back into the signed register range
#[inline]
pub const fn wrap(x: i64, max_val: i64) -> i64 {
    if x >= max_val {
        x - 2 * max_val
    } else if x <= -max_val {
        x + 2 * max_val
    } else {
        x
    }
}

/// Saturate to `[-max_val + 1, max_val - 1]`
#[inline]
pub const fn clip(x: i64, max_val: i64) -> i32 {
    if x > max_val - 1 {
        (max_val - 1) as i32
    } else if x < -max_val + 1 {
        (-max_val + 1) as i32
    } else {
        x as i32
    }
}
