//! Bit-exact fixed-point neuron dynamics for neuromorphic targets
//!
//! Populations of LIF, LIF-RP, ALIF, ATRLIF and LIF-Delta neurons advance in
//! lock-step, one input vector per step. Every variant is written once
//! against the [`Arithmetic`] trait and runs either on the floating-point
//! reference ([`FloatArith`]) or on the integer engine ([`FixedArith`]),
//! which reproduces the target's wraparound, saturation and alignment shifts
//! bit for bit.
//!
//! Float models are converted with a [`Quantizer`] built from the
//! `fxsnn-scaling` solver, and the two runs can be compared spike by spike.
//!
//! ```
//! use fxsnn_runtime::{FloatArith, Lif, NeuronPopulation, Shape};
//!
//! let lif = Lif::<FloatArith>::new(1.0, 0.0, 0.0, 9.0);
//! let mut population = NeuronPopulation::new(lif, FloatArith, Shape::flat(1)?)?;
//! assert_eq!(population.step(&[5.0])?, vec![false]);
//! assert_eq!(population.step(&[5.0])?, vec![true]);
//! # Ok::<(), fxsnn_runtime::RuntimeError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export the scaling layer
pub use fxsnn_scaling::{
    ForwardScalingTable, HardwareSpec, Objective, ScalingError, ScalingLaw, ScalingParameters,
    ScalingSolver, VariableClass, VariableRangeTable,
};

// Core modules
pub mod arith;
pub mod config;
pub mod error;
pub mod fixed;
pub mod models;
pub mod population;
pub mod quantize;
pub mod shape;
pub mod simulation;

// Re-export essential types
pub use arith::{Arithmetic, FixedArith, FloatArith};
pub use config::{ConversionConfig, ModelConfig, PopulationConfig};
pub use error::{Result, RuntimeError};
pub use fixed::{DecayConstant, FixedBias};
pub use models::{
    Alif, Atrlif, Lif, LifDelta, LifRefractory, ModelVariantRegistry, NeuronModel, Variant,
};
pub use population::{NeuronPopulation, StateSnapshot, StepOutput};
pub use quantize::Quantizer;
pub use shape::{Init, Shape};
pub use simulation::{
    compare_spike_trains, Simulation, SimulationParams, SimulationResult, SpikeTrainComparison,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_integration() {
        let spec = HardwareSpec::default();
        let arith = FixedArith::new(spec).unwrap();
        assert_eq!(arith.spec().max_val(), 1 << 23);

        let registry = ModelVariantRegistry::new();
        assert_eq!(registry.scalable(&spec).len(), 4);

        let params = SimulationParams::default();
        assert!(!params.record_membrane);
    }
}
