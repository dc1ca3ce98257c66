//! Leaky integrate-and-fire with current-based synapses
//!
//! ```text
//! u[t] = u[t-1] * (1 - du) + a_in
//! v[t] = v[t-1] * (1 - dv) + u[t] + bias
//! s[t] = v[t] > vth
//! v[t] = vrs                               if s[t]
//! ```

use super::{NeuronModel, ValueOf, Variant};
use crate::{
    arith::{Arithmetic, FixedArith, FloatArith},
    error::Result,
    quantize::Quantizer,
    shape::{Init, Shape},
};
use fxsnn_scaling::{
    ForwardScalingTable, HardwareSpec, ScalingEntry, ScalingLaw, VariableClass,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// LIF parameters and initial values
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "A::Value: Serialize, A::Decay: Serialize, A::Bias: Serialize",
        deserialize = "A::Value: Deserialize<'de>, A::Decay: Deserialize<'de>, A::Bias: Deserialize<'de>"
    ))
)]
pub struct Lif<A: Arithmetic> {
    /// Current decay
    pub du: A::Decay,
    /// Voltage decay
    pub dv: A::Decay,
    /// Bias added every step
    pub bias: A::Bias,
    /// Spike threshold
    pub vth: A::Value,
    /// Reset voltage
    #[cfg_attr(feature = "serde", serde(default))]
    pub vrs: A::Value,
    /// Initial current
    #[cfg_attr(feature = "serde", serde(default))]
    pub u: Init<A::Value>,
    /// Initial voltage
    #[cfg_attr(feature = "serde", serde(default))]
    pub v: Init<A::Value>,
    #[cfg_attr(feature = "serde", serde(skip))]
    threshold_scaled: bool,
}

/// LIF per-neuron state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LifState<V> {
    /// Synaptic current
    pub u: V,
    /// Membrane voltage
    pub v: V,
}

impl<A: Arithmetic> Lif<A> {
    /// Create a LIF model resetting to zero from a zero initial state
    pub fn new(du: A::Decay, dv: A::Decay, bias: A::Bias, vth: A::Value) -> Self {
        Self {
            du,
            dv,
            bias,
            vth,
            vrs: A::Value::default(),
            u: Init::default(),
            v: Init::default(),
            threshold_scaled: false,
        }
    }

    /// Set the reset voltage
    pub fn with_reset(mut self, vrs: A::Value) -> Self {
        self.vrs = vrs;
        self
    }

    /// Set initial current and voltage
    pub fn with_initial(mut self, u: Init<A::Value>, v: Init<A::Value>) -> Self {
        self.u = u;
        self.v = v;
        self
    }
}

impl Lif<FloatArith> {
    /// Quantize to fixed-point registers
    pub fn to_fixed(&self, q: &Quantizer) -> Result<Lif<FixedArith>> {
        Ok(Lif {
            du: q.decay("du", self.du)?,
            dv: q.decay("dv", self.dv)?,
            bias: q.bias("bias", self.bias)?,
            vth: q.threshold("vth", self.vth)?,
            vrs: q.voltage("vrs", self.vrs)?,
            u: self.u.try_map(|&x| q.voltage("u", x))?,
            v: self.v.try_map(|&x| q.voltage("v", x))?,
            threshold_scaled: false,
        })
    }
}

impl<A: Arithmetic> NeuronModel for Lif<A> {
    type Arith = A;
    type State = LifState<A::Value>;

    const VARIANT: Variant = Variant::Lif;

    fn validate(&self, arith: &A) -> Result<()> {
        arith.check_decay("du", self.du)?;
        arith.check_decay("dv", self.dv)?;
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
        let u = self.u.broadcast(shape)?;
        let v = self.v.broadcast(shape)?;
        Ok(u.into_iter()
            .zip(v)
            .map(|(u, v)| LifState { u, v })
            .collect())
    }

    #[inline]
    fn subthreshold(
        &self,
        arith: &A,
        _index: usize,
        state: &Self::State,
        input: A::Value,
        _time_step: u64,
    ) -> Self::State {
        let u = arith.integrate(arith.decay(state.u, self.du), input);
        let v = arith.clip(arith.decay(state.v, self.dv) + u + arith.effective_bias(self.bias));
        LifState { u, v }
    }

    #[inline]
    fn spike_condition(&self, _index: usize, state: &Self::State) -> bool {
        state.v > self.vth
    }

    #[inline]
    fn reset(&self, _arith: &A, _index: usize, state: &mut Self::State, _time_step: u64) {
        state.v = self.vrs;
    }

    fn membrane(state: &Self::State) -> ValueOf<Self> {
        state.v
    }

    fn state_values(&self, state: &Self::State) -> Vec<(&'static str, f64)> {
        vec![("u", A::to_f64(state.u)), ("v", A::to_f64(state.v))]
    }
}

/// Forward scaling of the continuous-time LIF variables
pub fn scaling_table(spec: &HardwareSpec) -> ForwardScalingTable {
    ForwardScalingTable::new(Variant::Lif.name())
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
        .time_constants(&["tau_v", "tau_j"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{DecayConstant, FixedBias};

    fn run<A: Arithmetic>(
        model: &mut Lif<A>,
        arith: &A,
        inputs: &[A::Value],
    ) -> (Vec<bool>, Vec<A::Value>) {
        model.scale_threshold(arith);
        let mut state = model.bind(&Shape::flat(1).unwrap()).unwrap()[0];
        let mut spikes = Vec::new();
        let mut membrane = Vec::new();
        for (t, &x) in inputs.iter().enumerate() {
            let update = model.update(arith, 0, &state, x, t as u64 + 1);
            state = update.state;
            spikes.push(update.spiked);
            membrane.push(update.membrane);
        }
        (spikes, membrane)
    }

    #[test]
    fn test_float_minimal_scenario() {
        // Full current decay makes u equal to the step's input
        let mut lif = Lif::<FloatArith>::new(1.0, 0.0, 0.0, 9.0);
        let (spikes, membrane) = run(&mut lif, &FloatArith, &[5.0, 5.0, 0.0, 0.0]);
        assert_eq!(spikes, vec![false, true, false, false]);
        assert_eq!(membrane, vec![5.0, 10.0, 0.0, 0.0]);
    }

    #[test]
    fn test_float_current_accumulates_without_decay() {
        let mut lif = Lif::<FloatArith>::new(0.0, 0.0, 0.0, 100.0);
        let (_, membrane) = run(&mut lif, &FloatArith, &[5.0, 5.0, 0.0, 0.0]);
        // u = 5, 10, 10, 10; v integrates u
        assert_eq!(membrane, vec![5.0, 15.0, 25.0, 35.0]);
    }

    #[test]
    fn test_float_no_decay_threshold_ten() {
        // du = dv = 0, vth = 10: the trace [5, 10, 10, 10] is the current,
        // and the voltage it drives crosses twice
        let mut lif = Lif::<FloatArith>::new(0.0, 0.0, 0.0, 10.0);
        lif.scale_threshold(&FloatArith);
        let mut state = lif.bind(&Shape::flat(1).unwrap()).unwrap()[0];
        let (mut current, mut spikes, mut membrane) = (Vec::new(), Vec::new(), Vec::new());
        for (t, x) in [5.0, 5.0, 0.0, 0.0].into_iter().enumerate() {
            let update = lif.update(&FloatArith, 0, &state, x, t as u64 + 1);
            state = update.state;
            current.push(state.u);
            spikes.push(update.spiked);
            membrane.push(update.membrane);
        }
        assert_eq!(current, vec![5.0, 10.0, 10.0, 10.0]);
        // Reset after step 2 starts step 3 from 0; 10 is not above 10
        assert_eq!(membrane, vec![5.0, 15.0, 10.0, 20.0]);
        assert_eq!(spikes, vec![false, true, false, true]);
    }

    #[test]
    fn test_fixed_matches_minimal_scenario() {
        let spec = HardwareSpec::unaligned();
        let arith = FixedArith::new(spec).unwrap();
        let mut lif = Lif::<FixedArith>::new(
            DecayConstant::full(&spec),
            DecayConstant::NONE,
            FixedBias::default(),
            9,
        );
        let (spikes, membrane) = run(&mut lif, &arith, &[5, 5, 0, 0]);
        assert_eq!(spikes, vec![false, true, false, false]);
        assert_eq!(membrane, vec![5, 10, 0, 0]);
    }

    #[test]
    fn test_fixed_alignment_shifts_input_and_threshold() {
        let spec = HardwareSpec::default();
        let arith = FixedArith::new(spec).unwrap();
        let mut lif = Lif::<FixedArith>::new(
            DecayConstant::full(&spec),
            DecayConstant::NONE,
            FixedBias::default(),
            9,
        );
        let (spikes, membrane) = run(&mut lif, &arith, &[5, 5, 0, 0]);
        assert_eq!(spikes, vec![false, true, false, false]);
        assert_eq!(membrane, vec![320, 640, 0, 0]);
    }

    #[test]
    fn test_threshold_scaling_is_idempotent() {
        let arith = FixedArith::default();
        let mut lif = Lif::<FixedArith>::new(
            DecayConstant::NONE,
            DecayConstant::NONE,
            FixedBias::default(),
            9,
        );
        lif.scale_threshold(&arith);
        let once = lif.vth;
        lif.scale_threshold(&arith);
        assert_eq!(lif.vth, once);
        assert_eq!(once, 9 << 6);
        assert!(lif.is_threshold_scaled());
    }

    #[test]
    fn test_fixed_voltage_clips() {
        let spec = HardwareSpec::unaligned();
        let arith = FixedArith::new(spec).unwrap();
        let lif = Lif::<FixedArith>::new(
            DecayConstant::NONE,
            DecayConstant::NONE,
            FixedBias::default(),
            131_071,
        );
        let max = spec.max_val();
        let state = LifState { u: 0, v: max - 3 };
        let next = lif.subthreshold(&arith, 0, &state, 8, 1);
        assert_eq!(next.v, max - 1);
    }

    #[test]
    fn test_validation_rejects_bad_registers() {
        let arith = FixedArith::default();
        let lif = Lif::<FixedArith>::new(
            DecayConstant::NONE,
            DecayConstant::NONE,
            FixedBias::new(5000, 0),
            9,
        );
        assert!(lif.validate(&arith).is_err());

        let lif = Lif::<FloatArith>::new(1.5, 0.0, 0.0, 1.0);
        assert!(lif.validate(&FloatArith).is_err());
    }

    #[test]
    fn test_to_fixed() {
        use fxsnn_scaling::{ScalingSolver, VariableRangeTable};

        let ranges = VariableRangeTable::new(1.0)
            .unwrap()
            .with_range("v", VariableClass::Voltage, 1.0, 1.0)
            .unwrap();
        let params = ScalingSolver::default()
            .minimum_scaling(&ranges, &scaling_table(&HardwareSpec::default()))
            .unwrap()
            .with_amplitude(4096.0);
        let q = Quantizer::new(params, HardwareSpec::default());

        let lif = Lif::<FloatArith>::new(1.0, 0.25, 0.5, 1.0).with_reset(-0.25);
        let fixed = lif.to_fixed(&q).unwrap();
        assert_eq!(fixed.du, DecayConstant::full(&HardwareSpec::default()));
        assert_eq!(fixed.dv.effective(), 1024);
        assert_eq!(fixed.bias.effective(), 2048);
        assert_eq!(fixed.vth, 64);
        assert_eq!(fixed.vrs, -1024);
    }
}
