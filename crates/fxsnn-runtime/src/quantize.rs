//! Quantization of float discrete-time parameters into fixed registers
//!
//! Discrete-time parameters already carry the step size, so every
//! amplitude-like value scales by `A` alone. Aligned registers (inputs,
//! thresholds) store the scaled value shifted right by their alignment, the
//! core shifts it back.

use crate::{
    arith::FixedArith,
    error::{Result, RuntimeError},
    fixed::{DecayConstant, FixedBias},
    models::Variant,
};
use fxsnn_scaling::{
    HardwareSpec, Objective, ScalingLaw, ScalingParameters, ScalingSolver, VariableRangeTable,
};

/// Maps float values to fixed registers for one `(alpha, A)` pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    params: ScalingParameters,
    spec: HardwareSpec,
}

impl Quantizer {
    /// Create a quantizer for solved scaling parameters
    pub fn new(params: ScalingParameters, spec: HardwareSpec) -> Self {
        Self { params, spec }
    }

    /// Solve the scaling of `variant` for the observed ranges
    pub fn solve(
        variant: Variant,
        ranges: &VariableRangeTable,
        spec: HardwareSpec,
        objective: Objective,
    ) -> Result<Self> {
        let table = variant.scaling_table(&spec)?;
        let params = ScalingSolver::new(spec).solve(ranges, &table, objective)?;
        Ok(Self::new(params, spec))
    }

    /// Scaling parameters in use
    pub fn params(&self) -> &ScalingParameters {
        &self.params
    }

    /// Hardware table in use
    pub fn spec(&self) -> &HardwareSpec {
        &self.spec
    }

    /// Fixed back-end matching this quantizer's hardware
    pub fn arith(&self) -> Result<FixedArith> {
        FixedArith::new(self.spec)
    }

    /// Forward-scale a float value
    pub fn value(&self, law: ScalingLaw, x: f64) -> f64 {
        self.params.forward(law, x)
    }

    /// `round(x / 2^shift)` as a register value
    pub fn register(&self, name: &str, x: f64, shift: u32) -> Result<i32> {
        let r = (x / 2f64.powi(shift as i32)).round();
        if !r.is_finite() || r < i32::MIN as f64 || r > i32::MAX as f64 {
            return Err(RuntimeError::quantization(name, x, "outside the 32-bit range"));
        }
        Ok(r as i32)
    }

    /// Amplitude-scaled register stored right-shifted by `shift`; a nonzero
    /// value must not truncate to zero
    fn aligned(&self, name: &str, x: f64, shift: u32) -> Result<i32> {
        let r = self.register(name, self.value(ScalingLaw::Amplitude, x), shift)?;
        if r == 0 && x != 0.0 {
            return Err(RuntimeError::quantization(
                name,
                x,
                format!(
                    "rounds to zero at A={:e} with a {}-bit alignment",
                    self.params.amplitude(),
                    shift
                ),
            ));
        }
        Ok(r)
    }

    /// Voltage-like state or parameter
    pub fn voltage(&self, name: &str, x: f64) -> Result<i32> {
        let r = self.register(name, self.value(ScalingLaw::Amplitude, x), 0)?;
        let max = self.spec.max_val();
        if r <= -max || r >= max {
            return Err(RuntimeError::quantization(
                name,
                x,
                format!("scaled value {} exceeds {}-bit state", r, self.spec.state_bits),
            ));
        }
        Ok(r)
    }

    /// Incoming activation, before the core's input alignment
    pub fn input(&self, x: f64) -> Result<i32> {
        let r = self.aligned("input", x, self.spec.activation_shift)?;
        let max = self.spec.max_activation();
        if r < -max || r > max {
            return Err(RuntimeError::quantization(
                "input",
                x,
                format!("register {} outside [-{}, {}]", r, max, max),
            ));
        }
        Ok(r)
    }

    /// A whole input vector
    pub fn inputs(&self, xs: &[f64]) -> Result<Vec<i32>> {
        xs.iter().map(|&x| self.input(x)).collect()
    }

    /// Unsigned threshold register, before the core's threshold alignment
    pub fn threshold(&self, name: &str, x: f64) -> Result<i32> {
        let r = self.aligned(name, x, self.spec.threshold_shift)?;
        if r < 0 || r > self.spec.threshold_max() {
            return Err(RuntimeError::quantization(
                name,
                x,
                format!("register {} outside [0, {}]", r, self.spec.threshold_max()),
            ));
        }
        Ok(r)
    }

    /// Fraction in `[0, 1]` as a decay constant; exactly 1 uses the offset
    /// bit
    pub fn decay(&self, name: &str, delta: f64) -> Result<DecayConstant> {
        if !(0.0..=1.0).contains(&delta) {
            return Err(RuntimeError::quantization(name, delta, "decay outside [0, 1]"));
        }
        let unity = self.spec.decay_unity();
        let scaled = (delta * unity as f64).round() as i64;
        if scaled >= unity {
            Ok(DecayConstant::full(&self.spec))
        } else {
            DecayConstant::new(scaled as u16, 0, &self.spec)
        }
    }

    /// Bias as mantissa and the smallest exponent that fits it
    pub fn bias(&self, name: &str, x: f64) -> Result<FixedBias> {
        let scaled = self.value(ScalingLaw::Amplitude, x);
        let (lo, hi) = self.spec.bias_mant_range();
        for exp in 0..=self.spec.bias_exp_max() {
            let mant = (scaled / 2f64.powi(exp)).round();
            if mant >= lo as f64 && mant <= hi as f64 {
                return Ok(FixedBias::new(mant as i16, exp as i8));
            }
        }
        Err(RuntimeError::quantization(
            name,
            x,
            format!(
                "no exponent up to {} fits a {}-bit mantissa",
                self.spec.bias_exp_max(),
                self.spec.bias_mant_bits
            ),
        ))
    }
}
