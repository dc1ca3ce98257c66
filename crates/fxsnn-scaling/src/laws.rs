//! Forward scaling laws and per-model scaling tables
//!
//! Every variable of a model maps to a factor `A^p * alpha^q` that turns its
//! floating-point value into its scaled, integer-range value:
//!
//! ```text
//! v      ->  A * v               (voltage-like)
//! j      ->  A/alpha * j         (current-like)
//! w      ->  A/alpha^2 * w       (weight, current-based synapses)
//! tau    ->  alpha * tau         (time constants, dt)
//! ```

use crate::{
    solver::ScalingParameters,
    variables::{VariableClass, VariableRangeTable},
};
use std::collections::BTreeMap;

/// How a variable scales under `(alpha, A)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalingLaw {
    /// Unaffected by scaling (decay fractions, coupling constants)
    Dimensionless,
    /// `A`
    Amplitude,
    /// `A / alpha`
    AmplitudePerTime,
    /// `A / alpha^2`
    AmplitudePerTimeSquared,
    /// `alpha`
    Time,
}

impl ScalingLaw {
    /// Exponents `(p, q)` of the factor `A^p * alpha^q`
    pub const fn powers(self) -> (i32, i32) {
        match self {
            ScalingLaw::Dimensionless => (0, 0),
            ScalingLaw::Amplitude => (1, 0),
            ScalingLaw::AmplitudePerTime => (1, -1),
            ScalingLaw::AmplitudePerTimeSquared => (1, -2),
            ScalingLaw::Time => (0, 1),
        }
    }

    /// Whether the amplitude factor enters this law at all
    pub const fn depends_on_amplitude(self) -> bool {
        self.powers().0 != 0
    }

    /// Multiplicative factor for the given scale pair
    pub fn factor(self, alpha: f64, amplitude: f64) -> f64 {
        let (p, q) = self.powers();
        amplitude.powi(p) * alpha.powi(q)
    }

    /// Amplitude at which a value of `magnitude` scales to exactly `target`.
    ///
    /// `None` for laws that do not depend on the amplitude.
    pub fn amplitude_for(self, magnitude: f64, target: f64, alpha: f64) -> Option<f64> {
        if !self.depends_on_amplitude() {
            return None;
        }
        let (_, q) = self.powers();
        Some(target / (magnitude * alpha.powi(q)))
    }
}

/// Safety margin added to an observed maximum before inverting its law
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Headroom {
    /// Observed maximum used as-is
    None,
    /// Reserve growth of the adaptive threshold by a number of steps of the
    /// named step variable
    ThresholdSteps {
        /// Variable holding the threshold step
        step: String,
    },
    /// Reserve the threshold floor plus its step growth, for refractory
    /// state that is charged from the threshold on every spike
    RefractoryWindow {
        /// Variable holding the threshold floor
        floor: String,
        /// Variable holding the threshold step
        step: String,
    },
}

impl Headroom {
    /// Inflate `peak` using the observed maxima of the referenced variables.
    ///
    /// Never returns less than `peak`.
    pub fn inflate(&self, peak: f64, ranges: &VariableRangeTable, steps: u32) -> f64 {
        let observed_max = |name: &str| ranges.get(name).map_or(0.0, |v| v.range.max());
        let inflated = match self {
            Headroom::None => peak,
            Headroom::ThresholdSteps { step } => peak + steps as f64 * observed_max(step),
            Headroom::RefractoryWindow { floor, step } => {
                peak + observed_max(floor) + steps as f64 * observed_max(step)
            }
        };
        inflated.max(peak)
    }
}

/// Scaling rule for one variable of a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingEntry {
    /// Forward scaling law
    pub law: ScalingLaw,
    /// Register class
    pub class: VariableClass,
    /// Margin applied before inversion
    pub headroom: Headroom,
    /// Hardware left-alignment of this variable, in bits. The register
    /// holds the scaled value shifted right by this amount.
    pub alignment_shift: u32,
    /// Largest exponent of a mantissa-exponent register, in bits of extra
    /// range above the mantissa ceiling
    pub exponent_range: u32,
}

impl ScalingEntry {
    /// Entry without headroom, alignment or exponent
    pub fn new(law: ScalingLaw, class: VariableClass) -> Self {
        Self {
            law,
            class,
            headroom: Headroom::None,
            alignment_shift: 0,
            exponent_range: 0,
        }
    }

    /// Attach a headroom rule
    pub fn with_headroom(mut self, headroom: Headroom) -> Self {
        self.headroom = headroom;
        self
    }

    /// Attach an alignment shift
    pub fn with_alignment(mut self, shift: u32) -> Self {
        self.alignment_shift = shift;
        self
    }

    /// Attach the exponent range of a mantissa-exponent register
    pub fn with_exponent(mut self, exp_max: u32) -> Self {
        self.exponent_range = exp_max;
        self
    }
}

/// Per-model mapping from variable name to its scaling rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardScalingTable {
    model: String,
    entries: BTreeMap<String, ScalingEntry>,
}

impl ForwardScalingTable {
    /// Create an empty table for `model`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Add a variable with a plain law
    pub fn entry(self, name: impl Into<String>, law: ScalingLaw, class: VariableClass) -> Self {
        self.with(name, ScalingEntry::new(law, class))
    }

    /// Add a fully specified entry
    pub fn with(mut self, name: impl Into<String>, entry: ScalingEntry) -> Self {
        self.entries.insert(name.into(), entry);
        self
    }

    /// Add time constants, all scaling by `alpha`
    pub fn time_constants(mut self, names: &[&str]) -> Self {
        for name in names {
            self.entries.insert(
                (*name).to_string(),
                ScalingEntry::new(ScalingLaw::Time, VariableClass::TimeConstant),
            );
        }
        self
    }

    /// Model this table belongs to
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Rule for a variable
    pub fn get(&self, name: &str) -> Option<&ScalingEntry> {
        self.entries.get(name)
    }

    /// Iterate `(name, entry)` in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalingEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scale a float value of `name` forward
    pub fn forward(&self, name: &str, params: &ScalingParameters, value: f64) -> Option<f64> {
        self.get(name).map(|e| params.forward(e.law, value))
    }

    /// Undo [`forward`](Self::forward)
    pub fn inverse(&self, name: &str, params: &ScalingParameters, value: f64) -> Option<f64> {
        self.get(name).map(|e| params.inverse(e.law, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_law_factors() {
        let (alpha, a) = (10.0, 3.0);
        assert_eq!(ScalingLaw::Amplitude.factor(alpha, a), 3.0);
        assert!((ScalingLaw::AmplitudePerTime.factor(alpha, a) - 0.3).abs() < 1e-12);
        assert!((ScalingLaw::AmplitudePerTimeSquared.factor(alpha, a) - 0.03).abs() < 1e-12);
        assert_eq!(ScalingLaw::Time.factor(alpha, a), 10.0);
        assert_eq!(ScalingLaw::Dimensionless.factor(alpha, a), 1.0);
    }

    #[test]
    fn test_amplitude_for_inverts_law() {
        // j = 0.5 with alpha = 10 must reach 1 at A = alpha / j = 20
        let a = ScalingLaw::AmplitudePerTime.amplitude_for(0.5, 1.0, 10.0).unwrap();
        assert!((a - 20.0).abs() < 1e-9);
        assert!((ScalingLaw::AmplitudePerTime.factor(10.0, a) * 0.5 - 1.0).abs() < 1e-12);
        assert!(ScalingLaw::Time.amplitude_for(0.5, 1.0, 10.0).is_none());
    }

    #[test]
    fn test_headroom_inflation() {
        let ranges = VariableRangeTable::new(1.0)
            .unwrap()
            .with_range("theta_0", VariableClass::Threshold, 5.0, 10.0)
            .unwrap()
            .with_range("theta_step", VariableClass::Threshold, 1.0, 2.0)
            .unwrap();

        let steps = Headroom::ThresholdSteps { step: "theta_step".into() };
        assert_eq!(steps.inflate(10.0, &ranges, 3), 16.0);

        let window = Headroom::RefractoryWindow {
            floor: "theta_0".into(),
            step: "theta_step".into(),
        };
        assert_eq!(window.inflate(4.0, &ranges, 3), 20.0);

        // Missing step variable reserves nothing
        let missing = Headroom::ThresholdSteps { step: "nope".into() };
        assert_eq!(missing.inflate(10.0, &ranges, 3), 10.0);
    }

    #[test]
    fn test_table_builder() {
        let table = ForwardScalingTable::new("toy")
            .entry("v", ScalingLaw::Amplitude, VariableClass::Voltage)
            .with(
                "w",
                ScalingEntry::new(ScalingLaw::AmplitudePerTime, VariableClass::Weight)
                    .with_alignment(6),
            )
            .with(
                "bias",
                ScalingEntry::new(ScalingLaw::AmplitudePerTime, VariableClass::BiasMantissa)
                    .with_exponent(7),
            )
            .time_constants(&["tau_v"]);

        assert_eq!(table.model(), "toy");
        assert_eq!(table.len(), 4);
        assert_eq!(table.get("w").unwrap().alignment_shift, 6);
        assert_eq!(table.get("bias").unwrap().alignment_shift, 0);
        assert_eq!(table.get("bias").unwrap().exponent_range, 7);
        assert_eq!(table.get("tau_v").unwrap().law, ScalingLaw::Time);
    }
}
