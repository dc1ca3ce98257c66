//! LIF with refractory period and a voltage-input synaptic trace
//!
//! ```text
//! v_psp[t] = v_psp[t-1] * (1 - delta_psp) + a_in
//! v[t]     = v[t-1] * (1 - delta_v) + v_psp[t] + bias   if t_rp_end < t
//! s[t]     = v[t] > vth
//! v[t] = vrs, t_rp_end = t + t_rp                          if s[t]
//! ```
//!
//! While refractory the voltage register is left untouched, bit for bit;
//! the synaptic trace keeps integrating.

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

/// LIF-RP parameters and initial values
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "A::Value: Serialize, A::Decay: Serialize, A::Bias: Serialize",
        deserialize = "A::Value: Deserialize<'de>, A::Decay: Deserialize<'de>, A::Bias: Deserialize<'de>"
    ))
)]
pub struct LifRefractory<A: Arithmetic> {
    /// Synaptic trace decay
    pub delta_psp: A::Decay,
    /// Voltage decay
    pub delta_v: A::Decay,
    /// Bias added every non-refractory step
    pub bias: A::Bias,
    /// Spike threshold
    pub vth: A::Value,
    /// Reset voltage
    #[cfg_attr(feature = "serde", serde(default))]
    pub vrs: A::Value,
    /// Refractory period in steps
    pub t_rp: u64,
    /// Initial synaptic trace
    #[cfg_attr(feature = "serde", serde(default))]
    pub v_psp: Init<A::Value>,
    /// Initial voltage
    #[cfg_attr(feature = "serde", serde(default))]
    pub v: Init<A::Value>,
    #[cfg_attr(feature = "serde", serde(skip))]
    threshold_scaled: bool,
}

/// LIF-RP per-neuron state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LifRefractoryState<V> {
    /// Synaptic trace
    pub v_psp: V,
    /// Membrane voltage
    pub v: V,
    /// Last step of the current refractory window
    pub t_rp_end: u64,
}

impl<V> LifRefractoryState<V> {
    /// Whether the voltage is frozen at `time_step`
    pub fn is_refractory(&self, time_step: u64) -> bool {
        self.t_rp_end >= time_step
    }
}

impl<A: Arithmetic> LifRefractory<A> {
    /// Create a LIF-RP model resetting to zero from a zero initial state
    pub fn new(
        delta_psp: A::Decay,
        delta_v: A::Decay,
        bias: A::Bias,
        vth: A::Value,
        t_rp: u64,
    ) -> Self {
        Self {
            delta_psp,
            delta_v,
            bias,
            vth,
            vrs: A::Value::default(),
            t_rp,
            v_psp: Init::default(),
            v: Init::default(),
            threshold_scaled: false,
        }
    }

    /// Set the reset voltage
    pub fn with_reset(mut self, vrs: A::Value) -> Self {
        self.vrs = vrs;
        self
    }

    /// Set initial trace and voltage
    pub fn with_initial(mut self, v_psp: Init<A::Value>, v: Init<A::Value>) -> Self {
        self.v_psp = v_psp;
        self.v = v;
        self
    }
}

impl LifRefractory<FloatArith> {
    /// Quantize to fixed-point registers
    pub fn to_fixed(&self, q: &Quantizer) -> Result<LifRefractory<FixedArith>> {
        Ok(LifRefractory {
            delta_psp: q.decay("delta_psp", self.delta_psp)?,
            delta_v: q.decay("delta_v", self.delta_v)?,
            bias: q.bias("bias", self.bias)?,
            vth: q.threshold("vth", self.vth)?,
            vrs: q.voltage("vrs", self.vrs)?,
            t_rp: self.t_rp,
            v_psp: self.v_psp.try_map(|&x| q.voltage("v_psp", x))?,
            v: self.v.try_map(|&x| q.voltage("v", x))?,
            threshold_scaled: false,
        })
    }
}

impl<A: Arithmetic> NeuronModel for LifRefractory<A> {
    type Arith = A;
    type State = LifRefractoryState<A::Value>;

    const VARIANT: Variant = Variant::LifRefractory;

    fn validate(&self, arith: &A) -> Result<()> {
        arith.check_decay("delta_psp", self.delta_psp)?;
        arith.check_decay("delta_v", self.delta_v)?;
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
        let v_psp = self.v_psp.broadcast(shape)?;
        let v = self.v.broadcast(shape)?;
        Ok(v_psp
            .into_iter()
            .zip(v)
            .map(|(v_psp, v)| LifRefractoryState {
                v_psp,
                v,
                t_rp_end: 0,
            })
            .collect())
    }

    fn subthreshold(
        &self,
        arith: &A,
        _index: usize,
        state: &Self::State,
        input: A::Value,
        time_step: u64,
    ) -> Self::State {
        let v_psp = arith.integrate(arith.decay(state.v_psp, self.delta_psp), input);
        let v = if state.is_refractory(time_step) {
            state.v
        } else {
            arith.clip(arith.decay(state.v, self.delta_v) + v_psp + arith.effective_bias(self.bias))
        };
        LifRefractoryState {
            v_psp,
            v,
            t_rp_end: state.t_rp_end,
        }
    }

    fn spike_condition(&self, _index: usize, state: &Self::State) -> bool {
        state.v > self.vth
    }

    fn reset(&self, _arith: &A, _index: usize, state: &mut Self::State, time_step: u64) {
        state.v = self.vrs;
        state.t_rp_end = time_step + self.t_rp;
    }

    fn membrane(state: &Self::State) -> ValueOf<Self> {
        state.v
    }

    fn state_values(&self, state: &Self::State) -> Vec<(&'static str, f64)> {
        vec![
            ("v_psp", A::to_f64(state.v_psp)),
            ("v", A::to_f64(state.v)),
            ("t_rp_end", state.t_rp_end as f64),
        ]
    }
}

/// Forward scaling of the continuous-time LIF-RP variables
pub fn scaling_table(spec: &HardwareSpec) -> ForwardScalingTable {
    ForwardScalingTable::new(Variant::LifRefractory.name())
        .entry("v", ScalingLaw::Amplitude, VariableClass::Voltage)
        .entry("v_rs", ScalingLaw::Amplitude, VariableClass::Voltage)
        .with(
            "v_th",
            ScalingEntry::new(ScalingLaw::Amplitude, VariableClass::Threshold)
                .with_alignment(spec.threshold_shift),
        )
        .entry("j", ScalingLaw::AmplitudePerTime, VariableClass::Current)
        .with(
            "w",
            ScalingEntry::new(ScalingLaw::AmplitudePerTime, VariableClass::Weight)
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
}
