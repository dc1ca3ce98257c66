//! Float-to-fixed (F2F) scaling for fixed-point neuromorphic targets
//!
//! This crate computes the scale pair `(alpha, A)` that maps every variable
//! of a floating-point neuron model into the integer range of the target's
//! registers. `alpha` rescales time (so the simulation step becomes an
//! integer), `A` rescales amplitudes; each variable follows its own forward
//! scaling law declared in a per-model [`ForwardScalingTable`].
//!
//! ```
//! use fxsnn_scaling::{
//!     ForwardScalingTable, Objective, ScalingLaw, ScalingSolver, VariableClass,
//!     VariableRangeTable,
//! };
//!
//! let table = ForwardScalingTable::new("lif")
//!     .entry("v", ScalingLaw::Amplitude, VariableClass::Voltage)
//!     .entry("j", ScalingLaw::AmplitudePerTime, VariableClass::Current);
//! let ranges = VariableRangeTable::new(0.1)?
//!     .with_range("v", VariableClass::Voltage, 0.01, 1.0)?
//!     .with_range("j", VariableClass::Current, 0.5, 2.0)?;
//!
//! let params = ScalingSolver::default().solve(&ranges, &table, Objective::Optimal)?;
//! assert_eq!(params.alpha(), 10.0);
//! # Ok::<(), fxsnn_scaling::ScalingError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod hardware;
pub mod laws;
pub mod solver;
pub mod variables;

pub use error::{Bound, Result, ScalingError};
pub use hardware::HardwareSpec;
pub use laws::{ForwardScalingTable, Headroom, ScalingEntry, ScalingLaw};
pub use solver::{Objective, ScalingParameters, ScalingSolver, VariableBound};
pub use variables::{Variable, VariableClass, VariableRange, VariableRangeTable};
