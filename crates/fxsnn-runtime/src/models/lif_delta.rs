//! LIF with delta-shaped input, per-neuron voltage decay and a reversal
//! voltage
//!
//! ```text
//! v[t] = v_rev + (v[t-1] - v_rev) * (1 - delta_v[n]) + (a_in + bias[n]) * delta_v[n]
//! s[t] = v[t] > vth
//! v[t] = vrs                                        if s[t]
//! ```
//!
//! There is no synaptic trace: the input enters the voltage directly,
//! weighted by the neuron's own decay.

use super::{NeuronModel, ValueOf, Variant};
use crate::{
    arith::{Arithmetic, FixedArith, FloatArith},
    error::Result,
    quantize::Quantizer,
    shape::{Init, Shape},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// LIF-Delta parameters and initial values
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "A::Value: Serialize, A::Decay: Serialize, A::Bias: Serialize",
        deserialize = "A::Value: Deserialize<'de>, A::Decay: Deserialize<'de>, A::Bias: Deserialize<'de>"
    ))
)]
pub struct LifDelta<A: Arithmetic> {
    /// Per-neuron voltage decay, also the input gain
    pub delta_v: Init<A::Decay>,
    /// Per-neuron bias
    pub bias: Init<A::Bias>,
    /// Spike threshold
    pub vth: A::Value,
    /// Reset voltage
    #[cfg_attr(feature = "serde", serde(default))]
    pub vrs: A::Value,
    /// Reversal voltage the membrane relaxes toward
    #[cfg_attr(feature = "serde", serde(default))]
    pub v_rev: A::Value,
    /// Initial voltage
    #[cfg_attr(feature = "serde", serde(default))]
    pub v: Init<A::Value>,
    #[cfg_attr(feature = "serde", serde(skip))]
    threshold_scaled: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    bound: Vec<(A::Decay, A::Bias)>,
}

/// LIF-Delta per-neuron state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LifDeltaState<V> {
    /// Membrane voltage
    pub v: V,
}

impl<A: Arithmetic> LifDelta<A> {
    /// Create a LIF-Delta model with zero reset and reversal voltage
    pub fn new(delta_v: Init<A::Decay>, bias: Init<A::Bias>, vth: A::Value) -> Self {
        Self {
            delta_v,
            bias,
            vth,
            vrs: A::Value::default(),
            v_rev: A::Value::default(),
            v: Init::default(),
            threshold_scaled: false,
            bound: Vec::new(),
        }
    }

    /// Set the reset voltage
    pub fn with_reset(mut self, vrs: A::Value) -> Self {
        self.vrs = vrs;
        self
    }

    /// Set the reversal voltage
    pub fn with_reversal(mut self, v_rev: A::Value) -> Self {
        self.v_rev = v_rev;
        self
    }

    /// Set the initial voltage
    pub fn with_initial(mut self, v: Init<A::Value>) -> Self {
        self.v = v;
        self
    }
}

impl LifDelta<FloatArith> {
    /// Quantize to fixed-point registers
    pub fn to_fixed(&self, q: &Quantizer) -> Result<LifDelta<FixedArith>> {
        Ok(LifDelta {
            delta_v: self.delta_v.try_map(|&d| q.decay("delta_v", d))?,
            bias: self.bias.try_map(|&b| q.bias("bias", b))?,
            vth: q.threshold("vth", self.vth)?,
            vrs: q.voltage("vrs", self.vrs)?,
            v_rev: q.voltage("v_rev", self.v_rev)?,
            v: self.v.try_map(|&x| q.voltage("v", x))?,
            threshold_scaled: false,
            bound: Vec::new(),
        })
    }
}

impl<A: Arithmetic> NeuronModel for LifDelta<A> {
    type Arith = A;
    type State = LifDeltaState<A::Value>;

    const VARIANT: Variant = Variant::LifDelta;

    fn validate(&self, arith: &A) -> Result<()> {
        for &d in self.delta_v.values() {
            arith.check_decay("delta_v", d)?;
        }
        for &b in self.bias.values() {
            arith.check_bias("bias", b)?;
        }
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
        let delta = self.delta_v.broadcast(shape)?;
        let bias = self.bias.broadcast(shape)?;
        let v = self.v.broadcast(shape)?;
        self.bound = delta.into_iter().zip(bias).collect();
        Ok(v.into_iter().map(|v| LifDeltaState { v }).collect())
    }

    fn subthreshold(
        &self,
        arith: &A,
        index: usize,
        state: &Self::State,
        input: A::Value,
        _time_step: u64,
    ) -> Self::State {
        let (delta, bias) = self.bound[index];
        let drive = arith.align_input(input) + arith.effective_bias(bias);
        let v = arith.clip(
            self.v_rev + arith.decay(state.v - self.v_rev, delta) + arith.scale(drive, delta),
        );
        LifDeltaState { v }
    }

    fn spike_condition(&self, _index: usize, state: &Self::State) -> bool {
        state.v > self.vth
    }

    fn reset(&self, _arith: &A, _index: usize, state: &mut Self::State, _time_step: u64) {
        state.v = self.vrs;
    }

    fn membrane(state: &Self::State) -> ValueOf<Self> {
        state.v
    }

    fn state_values(&self, state: &Self::State) -> Vec<(&'static str, f64)> {
        vec![("v", A::to_f64(state.v))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{DecayConstant, FixedBias};
    use fxsnn_scaling::HardwareSpec;

    #[test]
    fn test_per_neuron_decay() {
        let arith = FloatArith;
        let mut model = LifDelta::<FloatArith>::new(Init::List(vec![0.5, 0.25]), Init::Scalar(0.0), 100.0);
        let states = model.bind(&Shape::flat(2).unwrap()).unwrap();

        let a = model.subthreshold(&arith, 0, &states[0], 8.0, 1);
        let b = model.subthreshold(&arith, 1, &states[1], 8.0, 1);
        assert_eq!(a.v, 4.0);
        assert_eq!(b.v, 2.0);
    }

    #[test]
    fn test_relaxes_toward_reversal_voltage() {
        let arith = FloatArith;
        let mut model = LifDelta::<FloatArith>::new(Init::Scalar(0.5), Init::Scalar(0.0), 100.0)
            .with_reversal(-10.0)
            .with_initial(Init::Scalar(10.0));
        let state = model.bind(&Shape::flat(1).unwrap()).unwrap()[0];
        let next = model.subthreshold(&arith, 0, &state, 0.0, 1);
        // -10 + (10 + 10) * 0.5
        assert_eq!(next.v, 0.0);
    }

    #[test]
    fn test_spike_and_reset() {
        let arith = FloatArith;
        let mut model = LifDelta::<FloatArith>::new(Init::Scalar(1.0), Init::Scalar(0.0), 5.0)
            .with_reset(-1.0);
        let state = model.bind(&Shape::flat(1).unwrap()).unwrap()[0];
        let update = model.update(&arith, 0, &state, 6.0, 1);
        assert!(update.spiked);
        assert_eq!(update.membrane, 6.0);
        assert_eq!(update.state.v, -1.0);
    }

    #[test]
    fn test_fixed_bias_scaled_by_decay() {
        let spec = HardwareSpec::unaligned();
        let arith = FixedArith::new(spec).unwrap();
        let half = DecayConstant::new(2048, 0, &spec).unwrap();
        let mut model = LifDelta::<FixedArith>::new(
            Init::Scalar(half),
            Init::List(vec![FixedBias::new(10, 0), FixedBias::new(10, 2)]),
            1000,
        );
        let states = model.bind(&Shape::flat(2).unwrap()).unwrap();
        assert_eq!(model.subthreshold(&arith, 0, &states[0], 0, 1).v, 5);
        assert_eq!(model.subthreshold(&arith, 1, &states[1], 0, 1).v, 20);
    }

    #[test]
    fn test_validate_checks_every_neuron() {
        let model = LifDelta::<FloatArith>::new(Init::List(vec![0.5, 1.5]), Init::Scalar(0.0), 1.0);
        assert!(model.validate(&FloatArith).is_err());
    }
}
