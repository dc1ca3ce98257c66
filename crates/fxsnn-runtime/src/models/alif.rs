//! Adaptive leaky integrate-and-fire
//!
//! The voltage is tracked relative to rest, `y = u - u_rest`:
//!
//! ```text
//! i[t] = i[t-1] * (1 - decay_i) + a_in
//! y[t] = y[t-1] * (1 - decay_u) - w[t-1] + i[t] + bias
//! w[t] = w[t-1] * (1 - decay_w) + beta * y[t-1]
//! s[t] = y[t] >= vth
//! y[t] = 0, w[t] += delta_w                       if s[t]
//! ```
//!
//! The adaptation update reads the previous step's `y`, never the value
//! computed in the same step.

use super::{NeuronModel, ValueOf, Variant};
use crate::{
    arith::{Arithmetic, FixedArith, FloatArith},
    error::Result,
    quantize::Quantizer,
    shape::{Init, Shape},
};
use fxsnn_scaling::{ForwardScalingTable, HardwareSpec, ScalingEntry, ScalingLaw, VariableClass};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// ALIF parameters and initial values
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "A::Value: Serialize, A::Decay: Serialize, A::Bias: Serialize",
        deserialize = "A::Value: Deserialize<'de>, A::Decay: Deserialize<'de>, A::Bias: Deserialize<'de>"
    ))
)]
pub struct Alif<A: Arithmetic> {
    /// Current decay
    pub decay_i: A::Decay,
    /// Voltage decay
    pub decay_u: A::Decay,
    /// Adaptation decay
    pub decay_w: A::Decay,
    /// Coupling of voltage into adaptation
    pub beta: A::Decay,
    /// Adaptation increment per spike
    pub delta_w: A::Value,
    /// Bias added every step
    pub bias: A::Bias,
    /// Spike threshold, relative to rest
    pub vth: A::Value,
    /// Resting voltage
    #[cfg_attr(feature = "serde", serde(default))]
    pub u_rest: A::Value,
    /// Initial current
    #[cfg_attr(feature = "serde", serde(default))]
    pub i: Init<A::Value>,
    /// Initial absolute voltage
    #[cfg_attr(feature = "serde", serde(default))]
    pub u: Init<A::Value>,
    /// Initial adaptation
    #[cfg_attr(feature = "serde", serde(default))]
    pub w: Init<A::Value>,
    #[cfg_attr(feature = "serde", serde(skip))]
    threshold_scaled: bool,
}

/// ALIF per-neuron state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AlifState<V> {
    /// Synaptic current
    pub i: V,
    /// Voltage relative to rest
    pub y: V,
    /// Adaptation
    pub w: V,
}

impl<A: Arithmetic> Alif<A> {
    /// Create an ALIF model starting at rest
    pub fn new(
        decay_i: A::Decay,
        decay_u: A::Decay,
        decay_w: A::Decay,
        beta: A::Decay,
        delta_w: A::Value,
        bias: A::Bias,
        vth: A::Value,
    ) -> Self {
        Self {
            decay_i,
            decay_u,
            decay_w,
            beta,
            delta_w,
            bias,
            vth,
            u_rest: A::Value::default(),
            i: Init::default(),
            u: Init::default(),
            w: Init::default(),
            threshold_scaled: false,
        }
    }

    /// Set the resting voltage; the initial voltage follows it
    pub fn with_rest(mut self, u_rest: A::Value) -> Self {
        self.u_rest = u_rest;
        self.u = Init::Scalar(u_rest);
        self
    }

    /// Set initial current, absolute voltage and adaptation
    pub fn with_initial(
        mut self,
        i: Init<A::Value>,
        u: Init<A::Value>,
        w: Init<A::Value>,
    ) -> Self {
        self.i = i;
        self.u = u;
        self.w = w;
        self
    }
}

impl Alif<FloatArith> {
    /// Quantize to fixed-point registers
    pub fn to_fixed(&self, q: &Quantizer) -> Result<Alif<FixedArith>> {
        Ok(Alif {
            decay_i: q.decay("decay_i", self.decay_i)?,
            decay_u: q.decay("decay_u", self.decay_u)?,
            decay_w: q.decay("decay_w", self.decay_w)?,
            beta: q.decay("beta", self.beta)?,
            delta_w: q.voltage("delta_w", self.delta_w)?,
            bias: q.bias("bias", self.bias)?,
            vth: q.threshold("vth", self.vth)?,
            u_rest: q.voltage("u_rest", self.u_rest)?,
            i: self.i.try_map(|&x| q.voltage("i", x))?,
            u: self.u.try_map(|&x| q.voltage("u", x))?,
            w: self.w.try_map(|&x| q.voltage("w", x))?,
            threshold_scaled: false,
        })
    }
}

impl<A: Arithmetic> NeuronModel for Alif<A> {
    type Arith = A;
    type State = AlifState<A::Value>;

    const VARIANT: Variant = Variant::Alif;

    fn validate(&self, arith: &A) -> Result<()> {
        arith.check_decay("decay_i", self.decay_i)?;
        arith.check_decay("decay_u", self.decay_u)?;
        arith.check_decay("decay_w", self.decay_w)?;
        arith.check_decay("beta", self.beta)?;
        arith.check_bias("bias", self.bias)?;
        if !self.threshold_scaled {
            arith.check_threshold("vth", self.vth)?;
        }
        Ok(())
    }

    fn scale_threshold(&mut self, arith: &A) {
        if !self.threshold_scaled {
            self.vth = arith.scale_threshold(self.vth);
            self.threshold_scaled = true;
        }
    }

    fn is_threshold_scaled(&self) -> bool {
        self.threshold_scaled
    }

    fn bind(&mut self, shape: &Shape) -> Result<Vec<Self::State>> {
        let i = self.i.broadcast(shape)?;
        let u = self.u.broadcast(shape)?;
        let w = self.w.broadcast(shape)?;
        let u_rest = self.u_rest;
        Ok(i.into_iter()
            .zip(u)
            .zip(w)
            .map(|((i, u), w)| AlifState { i, y: u - u_rest, w })
            .collect())
    }

    fn subthreshold(
        &self,
        arith: &A,
        _index: usize,
        state: &Self::State,
        input: A::Value,
        _time_step: u64,
    ) -> Self::State {
        let i = arith.integrate(arith.decay(state.i, self.decay_i), input);
        let y = arith.clip(
            arith.decay(state.y, self.decay_u) - state.w + i + arith.effective_bias(self.bias),
        );
        let w = arith.clip(arith.decay(state.w, self.decay_w) + arith.scale(state.y, self.beta));
        AlifState { i, y, w }
    }

    fn spike_condition(&self, _index: usize, state: &Self::State) -> bool {
        state.y >= self.vth
    }

    fn reset(&self, arith: &A, _index: usize, state: &mut Self::State, _time_step: u64) {
        state.y = A::Value::default();
        state.w = arith.clip(state.w + self.delta_w);
    }

    fn membrane(state: &Self::State) -> ValueOf<Self> {
        state.y
    }

    fn state_values(&self, state: &Self::State) -> Vec<(&'static str, f64)> {
        vec![
            ("i", A::to_f64(state.i)),
            ("y", A::to_f64(state.y)),
            ("w", A::to_f64(state.w)),
            ("u", A::to_f64(state.y + self.u_rest)),
        ]
    }
}

/// Forward scaling of the continuous-time ALIF variables
pub fn scaling_table(spec: &HardwareSpec) -> ForwardScalingTable {
    ForwardScalingTable::new(Variant::Alif.name())
        .entry("u", ScalingLaw::Amplitude, VariableClass::Voltage)
        .entry("u_rest", ScalingLaw::Amplitude, VariableClass::Voltage)
        .entry("y", ScalingLaw::Amplitude, VariableClass::Voltage)
        .with(
            "vth",
            ScalingEntry::new(ScalingLaw::Amplitude, VariableClass::Threshold)
                .with_alignment(spec.threshold_shift),
        )
        .entry("w", ScalingLaw::Amplitude, VariableClass::Voltage)
        .entry("delta_w", ScalingLaw::Amplitude, VariableClass::Voltage)
        .entry("i", ScalingLaw::AmplitudePerTime, VariableClass::Current)
        .with(
            "weight",
            ScalingEntry::new(ScalingLaw::AmplitudePerTimeSquared, VariableClass::Weight)
                .with_alignment(spec.activation_shift),
        )
        .with(
            "a_in",
            ScalingEntry::new(ScalingLaw::Amplitude, VariableClass::Activation)
                .with_alignment(spec.activation_shift),
        )
        .with(
            "bias",
            ScalingEntry::new(ScalingLaw::AmplitudePerTime, VariableClass::BiasMantissa)
                .with_exponent(spec.bias_exp_max() as u32),
        )
        .time_constants(&["tau_u", "tau_i", "tau_w"])
}
