//! Neuron model variants
//!
//! Every variant implements [`NeuronModel`] once, generically over an
//! [`Arithmetic`] back-end, so the floating-point reference and the
//! bit-exact fixed-point engine share the same equations.

use crate::{
    arith::Arithmetic,
    error::{Result, RuntimeError},
    shape::Shape,
};
use core::{fmt, str::FromStr};
use fxsnn_scaling::{ForwardScalingTable, HardwareSpec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod alif;
pub mod atrlif;
pub mod lif;
pub mod lif_delta;
pub mod lif_rp;

pub use alif::{Alif, AlifState};
pub use atrlif::{Atrlif, AtrlifState};
pub use lif::{Lif, LifState};
pub use lif_delta::{LifDelta, LifDeltaState};
pub use lif_rp::{LifRefractory, LifRefractoryState};

/// Value type of a model's arithmetic back-end
pub type ValueOf<M> = <<M as NeuronModel>::Arith as Arithmetic>::Value;

/// Result of advancing one neuron by one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeuronUpdate<S, V> {
    /// State after subthreshold update and, if spiked, reset
    pub state: S,
    /// Spike emitted this step
    pub spiked: bool,
    /// Membrane value before reset
    pub membrane: V,
}

/// Equations of one neuron variant
pub trait NeuronModel: fmt::Debug + Clone + Send + Sync {
    /// Numeric back-end
    type Arith: Arithmetic;
    /// Per-neuron state
    type State: Copy + PartialEq + fmt::Debug + Send + Sync;

    /// Variant tag
    const VARIANT: Variant;

    /// Check parameters against the back-end's register ranges
    fn validate(&self, arith: &Self::Arith) -> Result<()>;

    /// Left-align threshold registers; only the first call has an effect
    fn scale_threshold(&mut self, arith: &Self::Arith);

    /// Whether [`scale_threshold`](Self::scale_threshold) already ran
    fn is_threshold_scaled(&self) -> bool;

    /// Broadcast per-neuron values to `shape` and produce initial states
    fn bind(&mut self, shape: &Shape) -> Result<Vec<Self::State>>;

    /// Subthreshold update of neuron `index` at `time_step`
    fn subthreshold(
        &self,
        arith: &Self::Arith,
        index: usize,
        state: &Self::State,
        input: ValueOf<Self>,
        time_step: u64,
    ) -> Self::State;

    /// Whether the updated state emits a spike
    fn spike_condition(&self, index: usize, state: &Self::State) -> bool;

    /// Post-spike reset
    fn reset(&self, arith: &Self::Arith, index: usize, state: &mut Self::State, time_step: u64);

    /// Membrane value reported to recorders
    fn membrane(state: &Self::State) -> ValueOf<Self>;

    /// Named state values, including derived ones
    fn state_values(&self, state: &Self::State) -> Vec<(&'static str, f64)>;

    /// Subthreshold update, spike check and reset in sequence
    fn update(
        &self,
        arith: &Self::Arith,
        index: usize,
        state: &Self::State,
        input: ValueOf<Self>,
        time_step: u64,
    ) -> NeuronUpdate<Self::State, ValueOf<Self>> {
        let mut next = self.subthreshold(arith, index, state, input, time_step);
        let membrane = Self::membrane(&next);
        let spiked = self.spike_condition(index, &next);
        if spiked {
            self.reset(arith, index, &mut next, time_step);
        }
        NeuronUpdate {
            state: next,
            spiked,
            membrane,
        }
    }
}

/// Tag of a supported neuron variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Variant {
    /// Leaky integrate-and-fire with current-based synapses
    Lif,
    /// LIF with refractory period and voltage-input synaptic trace
    #[cfg_attr(feature = "serde", serde(rename = "lif_rp"))]
    LifRefractory,
    /// Adaptive LIF
    Alif,
    /// LIF with adaptive threshold and refractoriness
    Atrlif,
    /// LIF with delta-shaped input, per-neuron decay and reversal voltage
    LifDelta,
}

impl Variant {
    /// All variants in registry order
    pub const ALL: [Variant; 5] = [
        Variant::Lif,
        Variant::LifRefractory,
        Variant::Alif,
        Variant::Atrlif,
        Variant::LifDelta,
    ];

    /// Registry name
    pub fn name(self) -> &'static str {
        match self {
            Variant::Lif => "lif",
            Variant::LifRefractory => "lif_rp",
            Variant::Alif => "alif",
            Variant::Atrlif => "atrlif",
            Variant::LifDelta => "lif_delta",
        }
    }

    /// Per-neuron state variables
    pub fn state_variables(self) -> &'static [&'static str] {
        match self {
            Variant::Lif => &["u", "v"],
            Variant::LifRefractory => &["v_psp", "v", "t_rp_end"],
            Variant::Alif => &["i", "y", "w", "u"],
            Variant::Atrlif => &["i", "v", "theta", "r"],
            Variant::LifDelta => &["v"],
        }
    }

    /// Discrete-time parameters
    pub fn parameters(self) -> &'static [&'static str] {
        match self {
            Variant::Lif => &["du", "dv", "bias", "vth", "vrs"],
            Variant::LifRefractory => &["delta_psp", "delta_v", "bias", "vth", "vrs", "t_rp"],
            Variant::Alif => &[
                "decay_i", "decay_u", "decay_w", "beta", "delta_w", "bias", "vth", "u_rest",
            ],
            Variant::Atrlif => &[
                "delta_i",
                "delta_v",
                "delta_theta",
                "delta_r",
                "theta_0",
                "theta_step",
                "bias",
            ],
            Variant::LifDelta => &["delta_v", "bias", "vth", "vrs", "v_rev"],
        }
    }

    /// Forward scaling table for float-to-fixed conversion
    pub fn scaling_table(self, spec: &HardwareSpec) -> Result<ForwardScalingTable> {
        match self {
            Variant::Lif => Ok(lif::scaling_table(spec)),
            Variant::LifRefractory => Ok(lif_rp::scaling_table(spec)),
            Variant::Alif => Ok(alif::scaling_table(spec)),
            Variant::Atrlif => Ok(atrlif::scaling_table(spec)),
            Variant::LifDelta => Err(RuntimeError::unsupported(
                self.name(),
                "float-to-fixed scaling",
            )),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self> {
        Variant::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| RuntimeError::invalid_config(format!("unknown neuron variant '{}'", s)))
    }
}

/// Lookup of the supported variants by name
#[derive(Debug, Clone)]
pub struct ModelVariantRegistry {
    variants: Vec<Variant>,
}

impl Default for ModelVariantRegistry {
    fn default() -> Self {
        Self {
            variants: Variant::ALL.to_vec(),
        }
    }
}

impl ModelVariantRegistry {
    /// Registry of every built-in variant
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a variant by registry name
    pub fn get(&self, name: &str) -> Result<Variant> {
        let variant: Variant = name.parse()?;
        if self.variants.contains(&variant) {
            Ok(variant)
        } else {
            Err(RuntimeError::invalid_config(format!(
                "variant '{}' is not registered",
                name
            )))
        }
    }

    /// Iterate registered variants
    pub fn iter(&self) -> impl Iterator<Item = Variant> + '_ {
        self.variants.iter().copied()
    }

    /// Registered names
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(Variant::name).collect()
    }

    /// Variants that can be converted float-to-fixed
    pub fn scalable(&self, spec: &HardwareSpec) -> Vec<Variant> {
        self.iter()
            .filter(|v| v.scaling_table(spec).is_ok())
            .collect()
    }
}
