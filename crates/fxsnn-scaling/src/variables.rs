//! Observed variable ranges and their hardware bit-classes

use crate::error::{Result, ScalingError};
use core::fmt;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Semantic class of a model variable; selects the register it lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum VariableClass {
    /// Membrane voltage and voltage-like quantities
    Voltage,
    /// Synaptic current / postsynaptic trace
    Current,
    /// Synaptic weight
    Weight,
    /// Mantissa part of the bias
    BiasMantissa,
    /// Exponent part of the bias
    BiasExponent,
    /// Time constant
    TimeConstant,
    /// Spike threshold
    Threshold,
    /// Refractory state variable
    RefractoryState,
    /// Incoming activation, before the core's input alignment
    Activation,
}

impl VariableClass {
    /// Stable name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            VariableClass::Voltage => "voltage",
            VariableClass::Current => "current",
            VariableClass::Weight => "weight",
            VariableClass::BiasMantissa => "bias-mantissa",
            VariableClass::BiasExponent => "bias-exponent",
            VariableClass::TimeConstant => "time-constant",
            VariableClass::Threshold => "threshold",
            VariableClass::RefractoryState => "refractory-state",
            VariableClass::Activation => "activation",
        }
    }
}

impl fmt::Display for VariableClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observed `[min, max]` of a variable across a population
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableRange {
    min: f64,
    max: f64,
}

impl VariableRange {
    /// Create a validated range
    pub fn new(min: f64, max: f64) -> Option<Self> {
        if min.is_finite() && max.is_finite() && min <= max {
            Some(Self { min, max })
        } else {
            None
        }
    }

    /// Range spanning the finite values of `samples`
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let mut finite = samples.iter().copied().filter(|x| x.is_finite());
        let first = finite.next()?;
        let (min, max) = finite.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x)));
        Some(Self { min, max })
    }

    /// Observed minimum
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Observed maximum
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Smallest nonzero endpoint magnitude.
    ///
    /// `None` when the observed minimum is exactly zero: such a variable
    /// puts no lower constraint on the amplitude. For a range straddling
    /// zero, such as `[-1, 0.001]`, the endpoint closer to zero sets the
    /// floor, so small values of either sign stay representable.
    pub fn floor_magnitude(&self) -> Option<f64> {
        if self.min == 0.0 {
            return None;
        }
        let lo = self.min.abs();
        if self.max == 0.0 {
            Some(lo)
        } else {
            Some(lo.min(self.max.abs()))
        }
    }

    /// Largest endpoint magnitude, `None` when both endpoints are zero
    pub fn peak_magnitude(&self) -> Option<f64> {
        let peak = self.min.abs().max(self.max.abs());
        if peak == 0.0 {
            None
        } else {
            Some(peak)
        }
    }
}

/// A named, classified variable with its observed range
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Variable {
    /// Identifier as used in the model equations
    pub name: String,
    /// Bit-class of the register holding this variable
    pub class: VariableClass,
    /// Observed range
    pub range: VariableRange,
}

/// Snapshot of variable ranges for one model instance, plus the
/// population-wide simulation step size
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableRangeTable {
    dt: f64,
    variables: BTreeMap<String, Variable>,
}

impl VariableRangeTable {
    /// Create an empty table for a population simulated with step `dt`
    pub fn new(dt: f64) -> Result<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(ScalingError::InvalidTimestep { dt });
        }
        Ok(Self {
            dt,
            variables: BTreeMap::new(),
        })
    }

    /// Simulation step size
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Record the range of a variable, replacing an earlier capture
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        class: VariableClass,
        min: f64,
        max: f64,
    ) -> Result<()> {
        let name = name.into();
        let range = VariableRange::new(min, max)
            .ok_or_else(|| ScalingError::invalid_range(name.clone(), min, max))?;
        self.variables
            .insert(name.clone(), Variable { name, class, range });
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_range(
        mut self,
        name: impl Into<String>,
        class: VariableClass,
        min: f64,
        max: f64,
    ) -> Result<Self> {
        self.insert(name, class, min, max)?;
        Ok(self)
    }

    /// Capture a variable's range from population samples.
    ///
    /// Returns `false` if no finite sample was present; nothing is recorded
    /// in that case.
    pub fn observe(
        &mut self,
        name: impl Into<String>,
        class: VariableClass,
        samples: &[f64],
    ) -> bool {
        let name = name.into();
        match VariableRange::from_samples(samples) {
            Some(range) => {
                self.variables
                    .insert(name.clone(), Variable { name, class, range });
                true
            }
            None => {
                log::warn!("No finite samples observed for '{}', skipping", name);
                false
            }
        }
    }

    /// Look up a variable
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Whether a variable was captured
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Iterate variables in name order
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Number of captured variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// True when no variable was captured
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_validation() {
        assert!(VariableRange::new(1.0, 2.0).is_some());
        assert!(VariableRange::new(2.0, 1.0).is_none());
        assert!(VariableRange::new(f64::NAN, 1.0).is_none());
        assert!(VariableRange::new(0.0, f64::INFINITY).is_none());
    }

    #[test]
    fn test_range_from_samples_skips_non_finite() {
        let r = VariableRange::from_samples(&[3.0, f64::NAN, -1.5, 7.25]).unwrap();
        assert_eq!(r.min(), -1.5);
        assert_eq!(r.max(), 7.25);
        assert!(VariableRange::from_samples(&[]).is_none());
        assert!(VariableRange::from_samples(&[f64::NAN]).is_none());
    }

    #[test]
    fn test_magnitudes() {
        let r = VariableRange::new(0.5, 4.0).unwrap();
        assert_eq!(r.floor_magnitude(), Some(0.5));
        assert_eq!(r.peak_magnitude(), Some(4.0));

        let zero_min = VariableRange::new(0.0, 4.0).unwrap();
        assert_eq!(zero_min.floor_magnitude(), None);
        assert_eq!(zero_min.peak_magnitude(), Some(4.0));

        let negative = VariableRange::new(-8.0, -2.0).unwrap();
        assert_eq!(negative.floor_magnitude(), Some(2.0));
        assert_eq!(negative.peak_magnitude(), Some(8.0));

        let zeros = VariableRange::new(0.0, 0.0).unwrap();
        assert_eq!(zeros.floor_magnitude(), None);
        assert_eq!(zeros.peak_magnitude(), None);

        // Straddling zero: the endpoint nearest zero is the floor
        let straddle = VariableRange::new(-1.0, 0.001).unwrap();
        assert_eq!(straddle.floor_magnitude(), Some(0.001));
        assert_eq!(straddle.peak_magnitude(), Some(1.0));
    }

    #[test]
    fn test_table_rejects_bad_timestep() {
        assert!(matches!(
            VariableRangeTable::new(0.0),
            Err(ScalingError::InvalidTimestep { .. })
        ));
        assert!(VariableRangeTable::new(-1.0).is_err());
        assert!(VariableRangeTable::new(f64::NAN).is_err());
    }

    #[test]
    fn test_table_insert_and_observe() {
        let mut table = VariableRangeTable::new(0.1).unwrap();
        table.insert("v", VariableClass::Voltage, 0.01, 1.0).unwrap();
        assert!(table.observe("j", VariableClass::Current, &[0.5, 2.0, 1.0]));
        assert!(!table.observe("w", VariableClass::Weight, &[]));

        assert_eq!(table.len(), 2);
        assert!(table.contains("v"));
        assert!(!table.contains("w"));
        assert_eq!(table.get("j").unwrap().range.max(), 2.0);

        let err = table.insert("bias", VariableClass::BiasMantissa, 3.0, 1.0);
        assert!(matches!(err, Err(ScalingError::InvalidRange { .. })));
    }
}
