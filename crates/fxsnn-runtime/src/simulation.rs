//! Simulation driver and spike-train validation

use crate::{
    arith::Arithmetic,
    error::{Result, RuntimeError},
    models::{NeuronModel, ValueOf},
    population::NeuronPopulation,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Simulation parameters
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationParams {
    /// Record the pre-reset membrane of every neuron at every step
    pub record_membrane: bool,
    /// Stop after this many steps even if more input is available
    pub max_steps: Option<usize>,
}

impl SimulationParams {
    /// Enable membrane recording
    pub fn with_membrane_recording(mut self, enabled: bool) -> Self {
        self.record_membrane = enabled;
        self
    }

    /// Limit the number of executed steps
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = Some(steps);
        self
    }
}

/// Simulation results
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationResult {
    /// Time step of the first recorded row
    pub first_step: u64,
    /// Spike vector per executed step
    pub spikes: Vec<Vec<bool>>,
    /// Pre-reset membrane per executed step (if recorded)
    pub membrane: Vec<Vec<f64>>,
    /// Number of steps executed
    pub steps_executed: usize,
    /// Population size
    pub num_neurons: usize,
    /// Total spike count
    pub total_spikes: usize,
}

impl SimulationResult {
    fn new(first_step: u64, num_neurons: usize) -> Self {
        Self {
            first_step,
            spikes: Vec::new(),
            membrane: Vec::new(),
            steps_executed: 0,
            num_neurons,
            total_spikes: 0,
        }
    }

    /// Steps at which `neuron` spiked
    pub fn spikes_for_neuron(&self, neuron: usize) -> Vec<u64> {
        self.spikes
            .iter()
            .enumerate()
            .filter(|(_, row)| row.get(neuron).copied().unwrap_or(false))
            .map(|(offset, _)| self.first_step + offset as u64)
            .collect()
    }

    /// Spikes per step of one neuron
    pub fn firing_rate(&self, neuron: usize) -> f64 {
        if self.steps_executed == 0 {
            return 0.0;
        }
        self.spikes_for_neuron(neuron).len() as f64 / self.steps_executed as f64
    }

    /// Spikes per step per neuron across the population
    pub fn average_firing_rate(&self) -> f64 {
        if self.steps_executed == 0 || self.num_neurons == 0 {
            return 0.0;
        }
        self.total_spikes as f64 / (self.steps_executed * self.num_neurons) as f64
    }

    /// Recorded pre-reset membrane of one neuron
    pub fn membrane_for_neuron(&self, neuron: usize) -> Option<Vec<f64>> {
        if self.membrane.is_empty() || neuron >= self.num_neurons {
            return None;
        }
        Some(self.membrane.iter().map(|row| row[neuron]).collect())
    }

    /// Export spikes as `(time_step, neuron)` pairs
    pub fn export_spikes(&self) -> Vec<(u64, usize)> {
        self.spikes
            .iter()
            .enumerate()
            .flat_map(|(offset, row)| {
                let step = self.first_step + offset as u64;
                row.iter()
                    .enumerate()
                    .filter(|(_, &s)| s)
                    .map(move |(neuron, _)| (step, neuron))
            })
            .collect()
    }

    /// Compare every neuron's spike train against `reference`
    pub fn compare(&self, reference: &SimulationResult, tolerance_steps: u64) -> Result<SpikeTrainComparison> {
        if self.num_neurons != reference.num_neurons {
            return Err(RuntimeError::shape(format!(
                "cannot compare {} neurons against {}",
                self.num_neurons, reference.num_neurons
            )));
        }
        let mut total = SpikeTrainComparison::default();
        for neuron in 0..self.num_neurons {
            total += compare_spike_trains(
                &reference.spikes_for_neuron(neuron),
                &self.spikes_for_neuron(neuron),
                tolerance_steps,
            );
        }
        Ok(total)
    }
}

/// Match counts between a reference and a candidate spike train
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpikeTrainComparison {
    /// Candidate spikes within tolerance of a reference spike
    pub matched: usize,
    /// Reference spikes without a candidate partner
    pub missing: usize,
    /// Candidate spikes without a reference partner
    pub extra: usize,
}

impl SpikeTrainComparison {
    /// Fraction of spikes that matched; 1.0 when both trains are empty
    pub fn agreement(&self) -> f64 {
        let total = self.matched + self.missing + self.extra;
        if total == 0 {
            1.0
        } else {
            self.matched as f64 / total as f64
        }
    }

    /// Fail with [`RuntimeError::ValidationFailed`] if agreement is below
    /// `required`
    pub fn validate(&self, required: f64) -> Result<()> {
        let agreement = self.agreement();
        if agreement < required {
            log::warn!(
                "Spike agreement {:.3} below {:.3} ({} missing, {} extra)",
                agreement,
                required,
                self.missing,
                self.extra
            );
            return Err(RuntimeError::ValidationFailed { agreement, required });
        }
        Ok(())
    }
}

impl core::ops::AddAssign for SpikeTrainComparison {
    fn add_assign(&mut self, other: Self) {
        self.matched += other.matched;
        self.missing += other.missing;
        self.extra += other.extra;
    }
}

/// Greedily pair spike times of two sorted trains that lie within
/// `tolerance_steps` of each other
pub fn compare_spike_trains(
    reference: &[u64],
    candidate: &[u64],
    tolerance_steps: u64,
) -> SpikeTrainComparison {
    let mut result = SpikeTrainComparison::default();
    let (mut i, mut j) = (0, 0);
    while i < reference.len() && j < candidate.len() {
        let (r, c) = (reference[i], candidate[j]);
        if r.abs_diff(c) <= tolerance_steps {
            result.matched += 1;
            i += 1;
            j += 1;
        } else if c < r {
            result.extra += 1;
            j += 1;
        } else {
            result.missing += 1;
            i += 1;
        }
    }
    result.missing += reference.len() - i;
    result.extra += candidate.len() - j;
    result
}

/// Drives a population over an input sequence
#[derive(Debug)]
pub struct Simulation<M: NeuronModel> {
    population: NeuronPopulation<M>,
    params: SimulationParams,
}

impl<M: NeuronModel> Simulation<M> {
    /// Create a simulation over `population`
    pub fn new(population: NeuronPopulation<M>, params: SimulationParams) -> Self {
        Self { population, params }
    }

    /// Population being simulated
    pub fn population(&self) -> &NeuronPopulation<M> {
        &self.population
    }

    /// Mutable access, e.g. to set the step counter
    pub fn population_mut(&mut self) -> &mut NeuronPopulation<M> {
        &mut self.population
    }

    /// Release the population
    pub fn into_population(self) -> NeuronPopulation<M> {
        self.population
    }

    /// Run one step per input row.
    ///
    /// Every row is checked before the first step so a malformed sequence
    /// leaves the population untouched.
    pub fn run(&mut self, inputs: &[Vec<ValueOf<M>>]) -> Result<SimulationResult> {
        let n = self.population.len();
        for row in inputs {
            self.population.check_input(row)?;
        }

        let num_steps = self
            .params
            .max_steps
            .map_or(inputs.len(), |max| max.min(inputs.len()));
        if num_steps == 0 {
            log::warn!("Simulation has no input steps");
        }

        log::info!(
            "Starting simulation: {} steps of {} {} neurons",
            num_steps,
            n,
            M::VARIANT
        );

        let mut results = SimulationResult::new(self.population.time_step() + 1, n);
        for (step, row) in inputs.iter().take(num_steps).enumerate() {
            let out = self.population.advance(row)?;
            results.total_spikes += out.spike_count();
            results.spikes.push(out.spikes);
            if self.params.record_membrane {
                results.membrane.push(
                    out.membrane
                        .into_iter()
                        .map(<M::Arith as Arithmetic>::to_f64)
                        .collect(),
                );
            }

            if step % (num_steps / 10).max(1) == 0 {
                let progress = (step as f64 / num_steps as f64) * 100.0;
                log::debug!("Simulation progress: {:.1}%", progress);
            }
        }
        results.steps_executed = results.spikes.len();

        log::info!(
            "Simulation completed: {} spikes in {} steps",
            results.total_spikes,
            results.steps_executed
        );

        Ok(results)
    }
}
