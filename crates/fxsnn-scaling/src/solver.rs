//! Scaling solver: admissible `(alpha, A)` for a model instance
//!
//! `alpha` is fixed by the simulation step alone (`alpha = 1/dt`), so the
//! search is one-dimensional over the amplitude `A`. Each variable bounds
//! `A` from below (its smallest nonzero value must land on a nonzero
//! register) and from above (its largest value, plus headroom, must stay
//! under the register ceiling). Aligned registers hold `value >> shift`, so
//! both bounds of an aligned variable move by `2^shift`.

use crate::{
    error::{Bound, Result, ScalingError},
    hardware::HardwareSpec,
    laws::{ForwardScalingTable, ScalingLaw},
    variables::{VariableClass, VariableRangeTable},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Time and amplitude scale factors
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScalingParameters {
    alpha: f64,
    amplitude: f64,
}

impl ScalingParameters {
    pub(crate) fn new(alpha: f64, amplitude: f64) -> Self {
        Self { alpha, amplitude }
    }

    /// Time scale factor, reciprocal of the simulation step
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Amplitude gain applied to voltage-like quantities
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Same `alpha` with a different amplitude
    pub fn with_amplitude(self, amplitude: f64) -> Self {
        Self { amplitude, ..self }
    }

    /// Factor of `law` under these parameters
    pub fn factor(&self, law: ScalingLaw) -> f64 {
        law.factor(self.alpha, self.amplitude)
    }

    /// Scale a float value forward
    pub fn forward(&self, law: ScalingLaw, value: f64) -> f64 {
        value * self.factor(law)
    }

    /// Map a scaled value back to float units
    pub fn inverse(&self, law: ScalingLaw, value: f64) -> f64 {
        value / self.factor(law)
    }
}

/// What the solver optimizes for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Objective {
    /// Smallest amplitude keeping all nonzero values representable
    Minimal,
    /// Largest amplitude without overflow
    Maximal,
    /// Best precision; equal to [`Objective::Maximal`] since the dynamics
    /// are invariant under `(alpha, A)`
    #[default]
    Optimal,
}

/// Amplitude bounds contributed by one variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableBound {
    /// Variable name
    pub name: String,
    /// Register class
    pub class: VariableClass,
    /// Smallest amplitude keeping the variable's floor on a nonzero register
    pub lower: Option<f64>,
    /// Largest amplitude keeping the variable under its ceiling
    pub upper: Option<f64>,
}

/// Stateless solver over an injected hardware table
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalingSolver {
    spec: HardwareSpec,
}

impl ScalingSolver {
    /// Create a solver for the given hardware
    pub fn new(spec: HardwareSpec) -> Self {
        Self { spec }
    }

    /// Hardware table in use
    pub fn spec(&self) -> &HardwareSpec {
        &self.spec
    }

    /// Per-variable amplitude bounds.
    ///
    /// The register class comes from the scaling table, not from the range
    /// table. Variables whose law ignores the amplitude are left out;
    /// variables observed but missing from `table` are an error.
    pub fn bounds(
        &self,
        ranges: &VariableRangeTable,
        table: &ForwardScalingTable,
    ) -> Result<Vec<VariableBound>> {
        self.spec.validate()?;
        let alpha = 1.0 / ranges.dt();
        let mut bounds = Vec::with_capacity(ranges.len());

        for var in ranges.iter() {
            let entry = table
                .get(&var.name)
                .ok_or_else(|| ScalingError::unknown_variable(&var.name, table.model()))?;
            if !entry.law.depends_on_amplitude() {
                continue;
            }

            // Aligned registers hold value >> shift: the floor must reach
            // 2^shift and the peak stay below (ceiling - 1) << shift
            let unit = 2f64.powi(entry.alignment_shift as i32);
            let lower = var
                .range
                .floor_magnitude()
                .and_then(|floor| entry.law.amplitude_for(floor, unit, alpha));

            let upper = var.range.peak_magnitude().and_then(|peak| {
                let peak = entry.headroom.inflate(peak, ranges, self.spec.headroom_steps);
                let limit = (self.spec.ceiling(entry.class) - 1.0)
                    * unit
                    * 2f64.powi(entry.exponent_range as i32);
                entry.law.amplitude_for(peak, limit, alpha)
            });

            log::debug!(
                "{}: '{}' ({}) bounds A in [{:?}, {:?}]",
                table.model(),
                var.name,
                entry.class,
                lower,
                upper
            );

            bounds.push(VariableBound {
                name: var.name.clone(),
                class: entry.class,
                lower,
                upper,
            });
        }

        Ok(bounds)
    }

    /// Smallest amplitude such that no nonzero variable rounds to a zero
    /// register
    pub fn minimum_scaling(
        &self,
        ranges: &VariableRangeTable,
        table: &ForwardScalingTable,
    ) -> Result<ScalingParameters> {
        let bounds = self.bounds(ranges, table)?;
        let (a, _) = tightest_lower(&bounds)?;
        Ok(ScalingParameters::new(1.0 / ranges.dt(), a))
    }

    /// Largest amplitude such that every scaled variable stays strictly
    /// below its register ceiling.
    ///
    /// Fails with [`ScalingError::Infeasible`] when that amplitude is below
    /// the one returned by [`minimum_scaling`](Self::minimum_scaling).
    pub fn maximum_scaling(
        &self,
        ranges: &VariableRangeTable,
        table: &ForwardScalingTable,
    ) -> Result<ScalingParameters> {
        let bounds = self.bounds(ranges, table)?;
        let (max_a, upper) = tightest_upper(&bounds)?;
        let (min_a, lower) = tightest_lower(&bounds)?;

        if max_a < min_a {
            log::error!(
                "{}: infeasible scaling, '{}' caps A at {:e} but '{}' needs {:e}",
                table.model(),
                upper.name,
                max_a,
                lower.name,
                min_a
            );
            return Err(ScalingError::Infeasible {
                max_a,
                min_a,
                upper_variable: upper.name.clone(),
                upper_class: upper.class,
                lower_variable: lower.name.clone(),
                lower_class: lower.class,
            });
        }

        Ok(ScalingParameters::new(1.0 / ranges.dt(), max_a))
    }

    /// Scaling parameters for the given objective.
    ///
    /// Feasibility is checked for every objective, so a minimal solution is
    /// never returned for ranges that would overflow.
    pub fn solve(
        &self,
        ranges: &VariableRangeTable,
        table: &ForwardScalingTable,
        objective: Objective,
    ) -> Result<ScalingParameters> {
        let maximal = self.maximum_scaling(ranges, table)?;
        let params = match objective {
            Objective::Minimal => self.minimum_scaling(ranges, table)?,
            Objective::Maximal | Objective::Optimal => maximal,
        };
        log::info!(
            "{}: {:?} scaling alpha={} A={:e}",
            table.model(),
            objective,
            params.alpha(),
            params.amplitude()
        );
        Ok(params)
    }
}

fn tightest_lower(bounds: &[VariableBound]) -> Result<(f64, &VariableBound)> {
    let mut best: Option<(f64, &VariableBound)> = None;
    for bound in bounds {
        if let Some(a) = bound.lower {
            if best.map_or(true, |(current, _)| a > current) {
                best = Some((a, bound));
            }
        }
    }
    best.ok_or(ScalingError::Unconstrained { bound: Bound::Lower })
}

fn tightest_upper(bounds: &[VariableBound]) -> Result<(f64, &VariableBound)> {
    let mut best: Option<(f64, &VariableBound)> = None;
    for bound in bounds {
        if let Some(a) = bound.upper {
            if best.map_or(true, |(current, _)| a < current) {
                best = Some((a, bound));
            }
        }
    }
    best.ok_or(ScalingError::Unconstrained { bound: Bound::Upper })
}
