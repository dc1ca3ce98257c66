//! A quantized fixed-point population reproduces its float reference

use fxsnn_runtime::{
    models::ValueOf, Alif, Atrlif, FixedArith, FloatArith, HardwareSpec, Lif, LifRefractory,
    NeuronModel, NeuronPopulation, Objective, Quantizer, Shape, Simulation, SimulationParams,
    SimulationResult, Variant, VariableClass, VariableRangeTable,
};

const STEPS: usize = 40;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Paired pulses: neuron 0 crosses threshold on every second pulse, neuron 1
/// settles just below it
fn float_inputs() -> Vec<Vec<f64>> {
    (0..STEPS)
        .map(|t| {
            if t % 4 < 2 {
                vec![0.75, 0.6]
            } else {
                vec![0.0, 0.0]
            }
        })
        .collect()
}

fn float_model() -> Lif<FloatArith> {
    Lif::new(1.0, 0.5, 0.0, 1.0)
}

fn run_float() -> SimulationResult {
    let pop = NeuronPopulation::new(float_model(), FloatArith, Shape::flat(2).unwrap()).unwrap();
    Simulation::new(pop, SimulationParams::default().with_membrane_recording(true))
        .run(&float_inputs())
        .unwrap()
}

fn quantizer(spec: HardwareSpec) -> Quantizer {
    let ranges = VariableRangeTable::new(1.0)
        .unwrap()
        .with_range("v", VariableClass::Voltage, 0.375, 1.125)
        .unwrap()
        .with_range("v_th", VariableClass::Threshold, 1.0, 1.0)
        .unwrap()
        .with_range("j", VariableClass::Current, 0.6, 0.75)
        .unwrap()
        .with_range("a_in", VariableClass::Activation, 0.6, 0.75)
        .unwrap();
    Quantizer::solve(Variant::Lif, &ranges, spec, Objective::Maximal).unwrap()
}

fn run_fixed(q: &Quantizer) -> SimulationResult {
    let model = float_model().to_fixed(q).unwrap();
    let pop = NeuronPopulation::new(model, q.arith().unwrap(), Shape::flat(2).unwrap()).unwrap();
    let inputs: Vec<Vec<i32>> = float_inputs()
        .iter()
        .map(|row| q.inputs(row).unwrap())
        .collect();
    Simulation::new(pop, SimulationParams::default().with_membrane_recording(true))
        .run(&inputs)
        .unwrap()
}

#[test]
fn fixed_spike_train_matches_float() {
    init_logging();
    let q = quantizer(HardwareSpec::default());
    let float = run_float();
    let fixed = run_fixed(&q);

    assert_eq!(float.spikes_for_neuron(0), vec![2, 6, 10, 14, 18, 22, 26, 30, 34, 38]);
    assert!(float.spikes_for_neuron(1).is_empty());
    assert_eq!(fixed.export_spikes(), float.export_spikes());

    let comparison = fixed.compare(&float, 0).unwrap();
    assert_eq!(comparison.agreement(), 1.0);
    comparison.validate(1.0).unwrap();
}

#[test]
fn fixed_membrane_tracks_float_after_rescaling() {
    let q = quantizer(HardwareSpec::default());
    let float = run_float();
    let fixed = run_fixed(&q);
    let a = q.params().amplitude();

    for neuron in 0..2 {
        let reference = float.membrane_for_neuron(neuron).unwrap();
        let quantized = fixed.membrane_for_neuron(neuron).unwrap();
        for (t, (f, x)) in reference.iter().zip(&quantized).enumerate() {
            assert!(
                (x / a - f).abs() < 1e-4,
                "neuron {} step {}: fixed {} vs float {}",
                neuron,
                t + 1,
                x / a,
                f
            );
        }
    }
}

#[test]
fn solved_amplitude_keeps_registers_in_range() {
    let spec = HardwareSpec::default();
    let q = quantizer(spec);
    let model = float_model().to_fixed(&q).unwrap();

    assert!(model.vth > 0 && model.vth <= spec.threshold_max());
    let peak_input = q.input(0.75).unwrap() as i64;
    assert!((peak_input << spec.activation_shift) < spec.max_val() as i64);
}

#[test]
fn unaligned_hardware_gives_the_same_spikes() {
    let q = quantizer(HardwareSpec::unaligned().with_headroom_steps(0));
    let fixed = run_fixed(&q);
    assert_eq!(fixed.export_spikes(), run_float().export_spikes());
    assert_eq!(
        q.arith().unwrap(),
        FixedArith::new(HardwareSpec::unaligned().with_headroom_steps(0)).unwrap()
    );
}

/// `amplitudes` for the first `on` steps of every `period`, silence after
fn pulse_train(steps: usize, on: usize, period: usize, amplitudes: &[f64]) -> Vec<Vec<f64>> {
    (0..steps)
        .map(|t| {
            if t % period < on {
                amplitudes.to_vec()
            } else {
                vec![0.0; amplitudes.len()]
            }
        })
        .collect()
}

fn simulate<M: NeuronModel>(
    model: M,
    arith: M::Arith,
    inputs: &[Vec<ValueOf<M>>],
) -> (SimulationResult, NeuronPopulation<M>) {
    let n = inputs[0].len();
    let pop = NeuronPopulation::new(model, arith, Shape::flat(n).unwrap()).unwrap();
    let mut sim = Simulation::new(pop, SimulationParams::default());
    let result = sim.run(inputs).unwrap();
    (result, sim.into_population())
}

fn quantize_inputs(q: &Quantizer, inputs: &[Vec<f64>]) -> Vec<Vec<i32>> {
    inputs.iter().map(|row| q.inputs(row).unwrap()).collect()
}

fn assert_same_spikes(fixed: &SimulationResult, float: &SimulationResult) {
    assert_eq!(fixed.export_spikes(), float.export_spikes());
    fixed.compare(float, 0).unwrap().validate(1.0).unwrap();
}

#[test]
fn refractory_freeze_survives_quantization() {
    init_logging();
    let inputs = pulse_train(30, 8, 10, &[0.6, 0.45]);
    let model = LifRefractory::<FloatArith>::new(1.0, 0.5, 0.0, 1.0, 2);
    let (float, float_pop) = simulate(model.clone(), FloatArith, &inputs);
    // Three steps to charge, two frozen after every spike
    assert_eq!(float.spikes_for_neuron(0), vec![3, 8, 13, 18, 23, 28]);
    assert!(float.spikes_for_neuron(1).is_empty());

    let ranges = VariableRangeTable::new(1.0)
        .unwrap()
        .with_range("v", VariableClass::Voltage, 0.3, 1.05)
        .unwrap()
        .with_range("v_th", VariableClass::Threshold, 1.0, 1.0)
        .unwrap()
        .with_range("a_in", VariableClass::Activation, 0.45, 0.6)
        .unwrap();
    let spec = HardwareSpec::default();
    let q = Quantizer::solve(Variant::LifRefractory, &ranges, spec, Objective::Maximal).unwrap();
    let (fixed, fixed_pop) = simulate(
        model.to_fixed(&q).unwrap(),
        q.arith().unwrap(),
        &quantize_inputs(&q, &inputs),
    );

    assert_same_spikes(&fixed, &float);
    assert_eq!(
        fixed_pop.snapshot().get("t_rp_end"),
        float_pop.snapshot().get("t_rp_end")
    );
}

#[test]
fn alif_adaptation_survives_quantization() {
    init_logging();
    let inputs = pulse_train(40, 15, 20, &[0.9, 0.4]);
    let model = Alif::<FloatArith>::new(1.0, 0.5, 0.5, 0.125, 0.35, 0.0, 1.0);
    let (float, float_pop) = simulate(model.clone(), FloatArith, &inputs);
    // Adaptation stretches the first interval from one step to three
    assert_eq!(
        float.spikes_for_neuron(0),
        vec![2, 5, 8, 11, 14, 22, 25, 28, 31, 34]
    );
    assert!(float.spikes_for_neuron(1).is_empty());

    let ranges = VariableRangeTable::new(1.0)
        .unwrap()
        .with_range("y", VariableClass::Voltage, -0.25, 1.4)
        .unwrap()
        .with_range("w", VariableClass::Voltage, 0.0, 0.65)
        .unwrap()
        .with_range("delta_w", VariableClass::Voltage, 0.35, 0.35)
        .unwrap()
        .with_range("vth", VariableClass::Threshold, 1.0, 1.0)
        .unwrap()
        .with_range("a_in", VariableClass::Activation, 0.4, 0.9)
        .unwrap();
    let q = Quantizer::solve(Variant::Alif, &ranges, HardwareSpec::default(), Objective::Maximal)
        .unwrap();
    let (fixed, fixed_pop) = simulate(
        model.to_fixed(&q).unwrap(),
        q.arith().unwrap(),
        &quantize_inputs(&q, &inputs),
    );

    assert_same_spikes(&fixed, &float);
    let a = q.params().amplitude();
    let float_w = float_pop.snapshot().get("w").unwrap().to_vec();
    let fixed_w = fixed_pop.snapshot().get("w").unwrap().to_vec();
    for (f, x) in float_w.iter().zip(&fixed_w) {
        assert!((x / a - f).abs() < 1e-3, "fixed w {} vs float {}", x / a, f);
    }
}

#[test]
fn adaptive_threshold_survives_quantization() {
    init_logging();
    let inputs = pulse_train(40, 15, 20, &[0.8, 0.45]);
    let model = Atrlif::<FloatArith>::new(1.0, 0.5, 0.5, 0.5, 1.0, 0.5, 0.0);
    let (float, float_pop) = simulate(model.clone(), FloatArith, &inputs);
    assert_eq!(
        float.spikes_for_neuron(0),
        vec![2, 5, 8, 11, 14, 22, 25, 28, 31, 34]
    );
    assert!(float.spikes_for_neuron(1).is_empty());

    let ranges = VariableRangeTable::new(1.0)
        .unwrap()
        .with_range("v", VariableClass::Voltage, 0.0, 1.8)
        .unwrap()
        .with_range("theta_0", VariableClass::Threshold, 1.0, 1.0)
        .unwrap()
        .with_range("theta_step", VariableClass::Threshold, 0.5, 0.5)
        .unwrap()
        .with_range("theta", VariableClass::Threshold, 1.0, 1.6)
        .unwrap()
        .with_range("r", VariableClass::RefractoryState, 0.0, 2.5)
        .unwrap()
        .with_range("a_in", VariableClass::Activation, 0.45, 0.8)
        .unwrap();
    let q = Quantizer::solve(Variant::Atrlif, &ranges, HardwareSpec::default(), Objective::Maximal)
        .unwrap();
    let (fixed, fixed_pop) = simulate(
        model.to_fixed(&q).unwrap(),
        q.arith().unwrap(),
        &quantize_inputs(&q, &inputs),
    );

    assert_same_spikes(&fixed, &float);
    let a = q.params().amplitude();
    for name in ["theta", "r"] {
        let reference = float_pop.snapshot().get(name).unwrap().to_vec();
        let quantized = fixed_pop.snapshot().get(name).unwrap().to_vec();
        for (f, x) in reference.iter().zip(&quantized) {
            assert!((x / a - f).abs() < 1e-3, "fixed {} {} vs float {}", name, x / a, f);
        }
    }
}
