//! Neuron population: the per-step dynamics engine
//!
//! Each step computes every neuron's next state from the previous states
//! into a fresh buffer, then commits the whole buffer. A rejected step
//! leaves states and the step counter untouched.

use crate::{
    arith::Arithmetic,
    error::{Result, RuntimeError},
    models::{NeuronModel, NeuronUpdate, ValueOf, Variant},
    shape::Shape,
};
use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Outcome of one population step
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput<V> {
    /// Step index just executed
    pub time_step: u64,
    /// One spike flag per neuron
    pub spikes: Vec<bool>,
    /// Membrane values before reset
    pub membrane: Vec<V>,
}

impl<V> StepOutput<V> {
    /// Number of neurons that spiked
    pub fn spike_count(&self) -> usize {
        self.spikes.iter().filter(|&&s| s).count()
    }
}

/// Read-only copy of all state variables
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct StateSnapshot {
    /// Variant the states belong to
    pub variant: Variant,
    /// Last executed step
    pub time_step: u64,
    /// Variable name to per-neuron values
    pub variables: BTreeMap<String, Vec<f64>>,
}

impl StateSnapshot {
    /// Values of one variable
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.variables.get(name).map(Vec::as_slice)
    }
}

/// A population of identical-variant neurons sharing parameters
#[derive(Debug, Clone)]
pub struct NeuronPopulation<M: NeuronModel> {
    model: M,
    arith: M::Arith,
    shape: Shape,
    states: Vec<M::State>,
    time_step: u64,
}

impl<M: NeuronModel> NeuronPopulation<M> {
    /// Validate the model, align its thresholds and create the initial
    /// states for `shape`
    pub fn new(mut model: M, arith: M::Arith, shape: Shape) -> Result<Self> {
        model.validate(&arith)?;
        model.scale_threshold(&arith);
        let states = model.bind(&shape)?;

        log::debug!(
            "Created {} population of shape {} ({} neurons)",
            M::VARIANT,
            shape,
            states.len()
        );

        Ok(Self {
            model,
            arith,
            shape,
            states,
            time_step: 0,
        })
    }

    /// Check an input vector's length and values without stepping
    pub fn check_input(&self, input: &[ValueOf<M>]) -> Result<()> {
        if input.len() != self.states.len() {
            return Err(RuntimeError::InputLength {
                expected: self.states.len(),
                actual: input.len(),
            });
        }
        input
            .iter()
            .enumerate()
            .try_for_each(|(index, &x)| self.arith.check_input(index, x))
    }

    /// Advance every neuron by one step.
    ///
    /// Returns the spike vector together with the pre-reset membrane values.
    pub fn advance(&mut self, input: &[ValueOf<M>]) -> Result<StepOutput<ValueOf<M>>> {
        self.check_input(input)?;

        let time_step = self.time_step + 1;
        let model = &self.model;
        let arith = &self.arith;

        #[cfg(feature = "parallel")]
        let updates: Vec<NeuronUpdate<M::State, ValueOf<M>>> = self
            .states
            .par_iter()
            .zip(input.par_iter())
            .enumerate()
            .map(|(index, (state, &x))| model.update(arith, index, state, x, time_step))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let updates: Vec<NeuronUpdate<M::State, ValueOf<M>>> = self
            .states
            .iter()
            .zip(input.iter())
            .enumerate()
            .map(|(index, (state, &x))| model.update(arith, index, state, x, time_step))
            .collect();

        let mut spikes = Vec::with_capacity(updates.len());
        let mut membrane = Vec::with_capacity(updates.len());
        for (slot, update) in self.states.iter_mut().zip(updates) {
            *slot = update.state;
            spikes.push(update.spiked);
            membrane.push(update.membrane);
        }
        self.time_step = time_step;

        log::trace!(
            "Step {}: {} of {} neurons spiked",
            time_step,
            spikes.iter().filter(|&&s| s).count(),
            spikes.len()
        );

        Ok(StepOutput {
            time_step,
            spikes,
            membrane,
        })
    }

    /// Advance every neuron by one step and return the spike vector
    pub fn step(&mut self, input: &[ValueOf<M>]) -> Result<Vec<bool>> {
        Ok(self.advance(input)?.spikes)
    }

    /// Last executed step, 0 before the first
    pub fn time_step(&self) -> u64 {
        self.time_step
    }

    /// Set the step counter; the next step runs as `time_step + 1`
    pub fn set_time_step(&mut self, time_step: u64) {
        self.time_step = time_step;
    }

    /// Number of neurons
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True for a population without neurons (never, shapes are non-empty)
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Population shape
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Model with aligned thresholds
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Arithmetic back-end
    pub fn arith(&self) -> &M::Arith {
        &self.arith
    }

    /// Current per-neuron states
    pub fn states(&self) -> &[M::State] {
        &self.states
    }

    /// Membrane values of all neurons as `f64`
    pub fn membrane(&self) -> Vec<f64> {
        self.states
            .iter()
            .map(|s| <M::Arith as Arithmetic>::to_f64(M::membrane(s)))
            .collect()
    }

    /// Copy every state variable out of the engine
    pub fn snapshot(&self) -> StateSnapshot {
        let mut variables: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for state in &self.states {
            for (name, value) in self.model.state_values(state) {
                variables
                    .entry(name.to_string())
                    .or_insert_with(|| Vec::with_capacity(self.states.len()))
                    .push(value);
            }
        }
        StateSnapshot {
            variant: M::VARIANT,
            time_step: self.time_step,
            variables,
        }
    }
}
