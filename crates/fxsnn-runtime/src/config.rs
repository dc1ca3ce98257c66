//! Population configuration
//!
//! A configuration names the variant, its float discrete-time parameters,
//! the population shape and the conversion settings. All of it is fixed at
//! instantiation.

use crate::{
    arith::FloatArith,
    error::Result,
    models::{Alif, Atrlif, Lif, LifDelta, LifRefractory, NeuronModel, Variant},
    quantize::Quantizer,
    shape::Shape,
};
use fxsnn_scaling::{HardwareSpec, Objective, VariableRangeTable};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Float parameters of one neuron variant, tagged by `variant`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "variant", rename_all = "snake_case"))]
pub enum ModelConfig {
    /// Leaky integrate-and-fire
    Lif(Lif<FloatArith>),
    /// LIF with refractory period
    #[cfg_attr(feature = "serde", serde(rename = "lif_rp"))]
    LifRefractory(LifRefractory<FloatArith>),
    /// Adaptive LIF
    Alif(Alif<FloatArith>),
    /// LIF with adaptive threshold and refractoriness
    Atrlif(Atrlif<FloatArith>),
    /// LIF with delta-shaped input
    LifDelta(LifDelta<FloatArith>),
}

impl ModelConfig {
    /// Variant tag
    pub fn variant(&self) -> Variant {
        match self {
            ModelConfig::Lif(_) => Variant::Lif,
            ModelConfig::LifRefractory(_) => Variant::LifRefractory,
            ModelConfig::Alif(_) => Variant::Alif,
            ModelConfig::Atrlif(_) => Variant::Atrlif,
            ModelConfig::LifDelta(_) => Variant::LifDelta,
        }
    }

    /// Check the float parameters
    pub fn validate(&self) -> Result<()> {
        match self {
            ModelConfig::Lif(m) => m.validate(&FloatArith),
            ModelConfig::LifRefractory(m) => m.validate(&FloatArith),
            ModelConfig::Alif(m) => m.validate(&FloatArith),
            ModelConfig::Atrlif(m) => m.validate(&FloatArith),
            ModelConfig::LifDelta(m) => m.validate(&FloatArith),
        }
    }
}

impl From<Lif<FloatArith>> for ModelConfig {
    fn from(model: Lif<FloatArith>) -> Self {
        ModelConfig::Lif(model)
    }
}

impl From<LifRefractory<FloatArith>> for ModelConfig {
    fn from(model: LifRefractory<FloatArith>) -> Self {
        ModelConfig::LifRefractory(model)
    }
}

impl From<Alif<FloatArith>> for ModelConfig {
    fn from(model: Alif<FloatArith>) -> Self {
        ModelConfig::Alif(model)
    }
}

impl From<Atrlif<FloatArith>> for ModelConfig {
    fn from(model: Atrlif<FloatArith>) -> Self {
        ModelConfig::Atrlif(model)
    }
}

impl From<LifDelta<FloatArith>> for ModelConfig {
    fn from(model: LifDelta<FloatArith>) -> Self {
        ModelConfig::LifDelta(model)
    }
}

/// Float-to-fixed conversion settings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConversionConfig {
    /// What the scaling solver optimizes for
    pub objective: Objective,
    /// Target register widths and alignment
    pub hardware: HardwareSpec,
}

impl ConversionConfig {
    /// Set the solver objective
    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    /// Set the hardware table
    pub fn with_hardware(mut self, hardware: HardwareSpec) -> Self {
        self.hardware = hardware;
        self
    }
}

/// Complete description of one population
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PopulationConfig {
    /// Population shape
    pub shape: Shape,
    /// Variant and float parameters
    pub model: ModelConfig,
    /// Conversion settings
    #[cfg_attr(feature = "serde", serde(default))]
    pub conversion: ConversionConfig,
}

impl PopulationConfig {
    /// Create a configuration with default conversion settings
    pub fn new(shape: Shape, model: impl Into<ModelConfig>) -> Self {
        Self {
            shape,
            model: model.into(),
            conversion: ConversionConfig::default(),
        }
    }

    /// Set the conversion settings
    pub fn with_conversion(mut self, conversion: ConversionConfig) -> Self {
        self.conversion = conversion;
        self
    }

    /// Variant tag
    pub fn variant(&self) -> Variant {
        self.model.variant()
    }

    /// Check the model parameters and the hardware table
    pub fn validate(&self) -> Result<()> {
        self.conversion.hardware.validate()?;
        self.model.validate()
    }

    /// Solve the scaling for observed ranges under these settings
    pub fn quantizer(&self, ranges: &VariableRangeTable) -> Result<Quantizer> {
        self.validate()?;
        Quantizer::solve(
            self.variant(),
            ranges,
            self.conversion.hardware,
            self.conversion.objective,
        )
    }
}
