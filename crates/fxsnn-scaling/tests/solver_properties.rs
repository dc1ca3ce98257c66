//! Property checks for the scaling solver

use fxsnn_scaling::{
    ForwardScalingTable, HardwareSpec, Objective, ScalingEntry, ScalingError, ScalingLaw,
    ScalingSolver, VariableClass, VariableRangeTable,
};
use proptest::prelude::*;

const LAWS: [(&str, ScalingLaw, VariableClass); 4] = [
    ("v", ScalingLaw::Amplitude, VariableClass::Voltage),
    ("j", ScalingLaw::AmplitudePerTime, VariableClass::Current),
    ("w", ScalingLaw::AmplitudePerTimeSquared, VariableClass::Weight),
    ("bias", ScalingLaw::AmplitudePerTime, VariableClass::BiasMantissa),
];

fn table() -> ForwardScalingTable {
    LAWS.iter()
        .fold(ForwardScalingTable::new("synthetic"), |t, (name, law, class)| {
            t.entry(*name, *law, *class)
        })
        .time_constants(&["tau_v"])
}

fn law_strategy() -> impl Strategy<Value = ScalingLaw> {
    prop_oneof![
        Just(ScalingLaw::Dimensionless),
        Just(ScalingLaw::Amplitude),
        Just(ScalingLaw::AmplitudePerTime),
        Just(ScalingLaw::AmplitudePerTimeSquared),
        Just(ScalingLaw::Time),
    ]
}

proptest! {
    #[test]
    fn maximum_is_never_below_minimum(
        dt in 1e-4f64..10.0,
        endpoints in prop::collection::vec((0.0f64..1e4, 0.0f64..1e4), 4),
        present in prop::collection::vec(any::<bool>(), 4),
    ) {
        let mut ranges = VariableRangeTable::new(dt).unwrap();
        for (((name, _, class), (a, b)), keep) in LAWS.iter().zip(&endpoints).zip(&present) {
            if *keep {
                ranges.insert(*name, *class, a.min(*b), a.max(*b)).unwrap();
            }
        }

        let solver = ScalingSolver::default();
        match solver.maximum_scaling(&ranges, &table()) {
            Ok(max) => {
                let min = solver.minimum_scaling(&ranges, &table()).unwrap();
                prop_assert!(max.amplitude() >= min.amplitude());
                prop_assert!(max.amplitude() >= 0.0);
                prop_assert_eq!(max.alpha(), 1.0 / dt);
            }
            Err(ScalingError::Infeasible { max_a, min_a, .. }) => prop_assert!(max_a < min_a),
            Err(ScalingError::Unconstrained { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn solved_parameters_respect_ceilings_and_floors(
        v_lo in 0.01f64..1.0,
        v_span in 1.0f64..50.0,
        j_lo in 0.01f64..1.0,
        j_span in 1.0f64..50.0,
    ) {
        let spec = HardwareSpec::default();
        let ranges = VariableRangeTable::new(0.5).unwrap()
            .with_range("v", VariableClass::Voltage, v_lo, v_lo * v_span).unwrap()
            .with_range("j", VariableClass::Current, j_lo, j_lo * j_span).unwrap();
        let solver = ScalingSolver::new(spec);

        for objective in [Objective::Minimal, Objective::Maximal] {
            let params = solver.solve(&ranges, &table(), objective).unwrap();
            for var in ranges.iter() {
                let law = table().get(&var.name).unwrap().law;
                let ceiling = spec.ceiling(var.class) - 1.0;
                let peak = params.forward(law, var.range.max());
                let floor = params.forward(law, var.range.min());
                prop_assert!(peak <= ceiling * (1.0 + 1e-12));
                prop_assert!(floor >= 1.0 - 1e-9);
            }
        }
    }

    #[test]
    fn aligned_registers_never_truncate_to_zero(
        v_lo in 0.01f64..1.0,
        v_span in 1.0f64..50.0,
        vth in 0.01f64..10.0,
        a_in_lo in 0.001f64..1.0,
        shift in 0u32..8,
    ) {
        let spec = HardwareSpec::default()
            .with_threshold_shift(shift)
            .with_activation_shift(shift);
        let table = ForwardScalingTable::new("aligned")
            .entry("v", ScalingLaw::Amplitude, VariableClass::Voltage)
            .with("v_th", ScalingEntry::new(ScalingLaw::Amplitude, VariableClass::Threshold)
                .with_alignment(shift))
            .with("a_in", ScalingEntry::new(ScalingLaw::Amplitude, VariableClass::Activation)
                .with_alignment(shift));
        let ranges = VariableRangeTable::new(1.0).unwrap()
            .with_range("v", VariableClass::Voltage, v_lo, v_lo * v_span).unwrap()
            .with_range("v_th", VariableClass::Threshold, vth, vth).unwrap()
            .with_range("a_in", VariableClass::Activation, a_in_lo, 1.0).unwrap();

        let unit = 2f64.powi(shift as i32);
        match ScalingSolver::new(spec).solve(&ranges, &table, Objective::Minimal) {
            Ok(params) => {
                let vth_reg = (params.forward(ScalingLaw::Amplitude, vth) / unit).round();
                let a_in_reg = (params.forward(ScalingLaw::Amplitude, a_in_lo) / unit).round();
                prop_assert!(vth_reg >= 1.0);
                prop_assert!(a_in_reg >= 1.0);
            }
            Err(ScalingError::Infeasible { max_a, min_a, .. }) => prop_assert!(max_a < min_a),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn forward_then_inverse_round_trips(
        law in law_strategy(),
        dt in 1e-3f64..1.0,
        amplitude in 1e-3f64..1e6,
        value in -1e6f64..1e6,
    ) {
        let ranges = VariableRangeTable::new(dt).unwrap()
            .with_range("v", VariableClass::Voltage, 1.0, 1.0).unwrap();
        let params = ScalingSolver::default()
            .minimum_scaling(&ranges, &table())
            .unwrap()
            .with_amplitude(amplitude);

        let back = params.inverse(law, params.forward(law, value));
        prop_assert!((back - value).abs() <= 1e-9 * value.abs().max(1.0));
    }
}
