//! LIF with adaptive threshold and refractoriness
//!
//! ```text
//! i[t]     = i[t-1] * (1 - delta_i) + a_in
//! v[t]     = v[t-1] * (1 - delta_v) + i[t] + bias
//! theta[t] = theta_0 + (theta[t-1] - theta_0) * (1 - delta_theta)
//! r[t]     = r[t-1] * (1 - delta_r)
//! s[t]     = v[t] - r[t] >= theta[t]
//! r[t] += 2 * theta[t], theta[t] += theta_step     if s[t]
//! ```
//!
//! The voltage is never reset; the refractory state pulls the effective
//! voltage `v - r` down after a spike instead.

use super::{NeuronModel, ValueOf, Variant};
use crate::{
    arith::{Arithmetic, FixedArith, FloatArith},
    error::Result,
    quantize::Quantizer,
    shape::{Init, Shape},
};
use fxsnn_scaling::{
    ForwardScalingTable, HardwareSpec, Headroom, ScalingEntry, ScalingLaw, VariableClass,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// ATRLIF parameters and initial values
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "A::Value: Serialize, A::Decay: Serialize, A::Bias: Serialize",
        deserialize = "A::Value: Deserialize<'de>, A::Decay: Deserialize<'de>, A::Bias: Deserialize<'de>"
    ))
)]
pub struct Atrlif<A: Arithmetic> {
    /// Current decay
    pub delta_i: A::Decay,
    /// Voltage decay
    pub delta_v: A::Decay,
    /// Threshold relaxation toward `theta_0`
    pub delta_theta: A::Decay,
    /// Refractory state decay
    pub delta_r: A::Decay,
    /// Baseline threshold
    pub theta_0: A::Value,
    /// Threshold increment per spike
    pub theta_step: A::Value,
    /// Bias added every step
    pub bias: A::Bias,
    /// Initial current
    #[cfg_attr(feature = "serde", serde(default))]
    pub i: Init<A::Value>,
    /// Initial voltage
    #[cfg_attr(feature = "serde", serde(default))]
    pub v: Init<A::Value>,
    /// Initial refractory state
    #[cfg_attr(feature = "serde", serde(default))]
    pub r: Init<A::Value>,
    #[cfg_attr(feature = "serde", serde(skip))]
    threshold_scaled: bool,
}

/// ATRLIF per-neuron state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AtrlifState<V> {
    /// Synaptic current
    pub i: V,
    /// Membrane voltage
    pub v: V,
    /// Adaptive threshold
    pub theta: V,
    /// Refractory state
    pub r: V,
}

impl<A: Arithmetic> Atrlif<A> {
    /// Create an ATRLIF model from a zero initial state
    pub fn new(
        delta_i: A::Decay,
        delta_v: A::Decay,
        delta_theta: A::Decay,
        delta_r: A::Decay,
        theta_0: A::Value,
        theta_step: A::Value,
        bias: A::Bias,
    ) -> Self {
        Self {
            delta_i,
            delta_v,
            delta_theta,
            delta_r,
            theta_0,
            theta_step,
            bias,
            i: Init::default(),
            v: Init::default(),
            r: Init::default(),
            threshold_scaled: false,
        }
    }

    /// Set initial current, voltage and refractory state
    pub fn with_initial(
        mut self,
        i: Init<A::Value>,
        v: Init<A::Value>,
        r: Init<A::Value>,
    ) -> Self {
        self.i = i;
        self.v = v;
        self.r = r;
        self
    }
}

impl Atrlif<FloatArith> {
    /// Quantize to fixed-point registers
    pub fn to_fixed(&self, q: &Quantizer) -> Result<Atrlif<FixedArith>> {
        Ok(Atrlif {
            delta_i: q.decay("delta_i", self.delta_i)?,
            delta_v: q.decay("delta_v", self.delta_v)?,
            delta_theta: q.decay("delta_theta", self.delta_theta)?,
            delta_r: q.decay("delta_r", self.delta_r)?,
            theta_0: q.threshold("theta_0", self.theta_0)?,
            theta_step: q.threshold("theta_step", self.theta_step)?,
            bias: q.bias("bias", self.bias)?,
            i: self.i.try_map(|&x| q.voltage("i", x))?,
            v: self.v.try_map(|&x| q.voltage("v", x))?,
            r: self.r.try_map(|&x| q.voltage("r", x))?,
            threshold_scaled: false,
        })
    }
}

impl<A: Arithmetic> NeuronModel for Atrlif<A> {
    type Arith = A;
    type State = AtrlifState<A::Value>;

    const VARIANT: Variant = Variant::Atrlif;

    fn validate(&self, arith: &A) -> Result<()> {
        arith.check_decay("delta_i", self.delta_i)?;
        arith.check_decay("delta_v", self.delta_v)?;
        arith.check_decay("delta_theta", self.delta_theta)?;
        arith.check_decay("delta_r", self.delta_r)?;
        arith.check_bias("bias", self.bias)?;
        if !self.threshold_scaled {
            arith.check_threshold("theta_0", self.theta_0)?;
            arith.check_threshold("theta_step", self.theta_step)?;
        }
        Ok(())
    }

    fn scale_threshold(&mut self, arith: &A) {
        if !self.threshold_scaled {
            self.theta_0 = arith.scale_threshold(self.theta_0);
            self.theta_step = arith.scale_threshold(self.theta_step);
            self.threshold_scaled = true;
        }
    }

    fn is_threshold_scaled(&self) -> bool {
        self.threshold_scaled
    }

    fn bind(&mut self, shape: &Shape) -> Result<Vec<Self::State>> {
        let i = self.i.broadcast(shape)?;
        let v = self.v.broadcast(shape)?;
        let r = self.r.broadcast(shape)?;
        let theta = self.theta_0;
        Ok(i.into_iter()
            .zip(v)
            .zip(r)
            .map(|((i, v), r)| AtrlifState { i, v, theta, r })
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
        let i = arith.integrate(arith.decay(state.i, self.delta_i), input);
        let v = arith.clip(arith.decay(state.v, self.delta_v) + i + arith.effective_bias(self.bias));
        let theta =
            arith.clip(self.theta_0 + arith.decay(state.theta - self.theta_0, self.delta_theta));
        let r = arith.clip(arith.decay(state.r, self.delta_r));
        AtrlifState { i, v, theta, r }
    }

    fn spike_condition(&self, _index: usize, state: &Self::State) -> bool {
        state.v - state.r >= state.theta
    }

    fn reset(&self, arith: &A, _index: usize, state: &mut Self::State, _time_step: u64) {
        state.r = arith.clip(state.r + state.theta + state.theta);
        state.theta = arith.clip(state.theta + self.theta_step);
    }

    fn membrane(state: &Self::State) -> ValueOf<Self> {
        state.v
    }

    fn state_values(&self, state: &Self::State) -> Vec<(&'static str, f64)> {
        vec![
            ("i", A::to_f64(state.i)),
            ("v", A::to_f64(state.v)),
            ("theta", A::to_f64(state.theta)),
            ("r", A::to_f64(state.r)),
        ]
    }
}

/// Forward scaling of the continuous-time ATRLIF variables.
///
/// The threshold floor reserves room for `headroom_steps` threshold
/// increments; the refractory state additionally reserves the floor itself,
/// since every spike charges it with twice the threshold.
pub fn scaling_table(spec: &HardwareSpec) -> ForwardScalingTable {
    let threshold = |headroom| {
        ScalingEntry::new(ScalingLaw::Amplitude, VariableClass::Threshold)
            .with_alignment(spec.threshold_shift)
            .with_headroom(headroom)
    };
    ForwardScalingTable::new(Variant::Atrlif.name())
        .entry("v", ScalingLaw::Amplitude, VariableClass::Voltage)
        .with(
            "theta_0",
            threshold(Headroom::ThresholdSteps {
                step: "theta_step".into(),
            }),
        )
        .with("theta", threshold(Headroom::None))
        .with("theta_step", threshold(Headroom::None))
        .with(
            "r",
            ScalingEntry::new(ScalingLaw::Amplitude, VariableClass::RefractoryState).with_headroom(
                Headroom::RefractoryWindow {
                    floor: "theta_0".into(),
                    step: "theta_step".into(),
                },
            ),
        )
        .entry("j", ScalingLaw::AmplitudePerTime, VariableClass::Current)
        .with(
            "w",
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
        .time_constants(&["tau_v", "tau_j", "tau_theta", "tau_r"])
}
