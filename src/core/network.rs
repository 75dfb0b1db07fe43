use ndarray::{Array1, Array2};
use tracing::{debug, info};

use crate::aggregate;
use crate::connectivity::Connectivity;
use crate::dynamics::{Integrator, SimulationState};
use crate::error::NetError;
use crate::noise;
use crate::oscillator::InhibitionDrive;
use crate::patterns::{MemoryPatterns, Populations};
use crate::prng::Prng;

/// All scalar parameters of a run.
///
/// `Default` is the reference parameter set of the replicated model.
/// Everything is validated up front; the simulation itself assumes a valid
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct NetConfig {
    pub num_neurons: usize,
    pub num_memories: usize,
    /// Probability that a given neuron encodes a given memory.
    pub sparsity: f64,
    /// Hebbian excitation strength. Also scales the inhibition drive.
    pub excitation: f64,
    /// Gain threshold: firing stays at zero until current exceeds it.
    pub threshold: f64,
    /// Exponent of the power-law gain function.
    pub gain_exp: f64,
    /// Current decay time constant, in seconds.
    pub t_decay: f64,
    pub sin_min: f64,
    pub sin_max: f64,
    /// Inhibition oscillation period, in seconds.
    pub t_oscillation: f64,
    /// Oscillator phase shift, as a fraction of the oscillation period.
    pub phase_shift: f64,
    /// Forward sequence coupling strength.
    pub cont_forward: f64,
    /// Backward sequence coupling strength. Independent of `cont_forward`;
    /// the asymmetry between the two sets the net drift direction through
    /// the memory sequence.
    pub cont_back: f64,
    /// Total simulated time, in seconds.
    pub t_tot: f64,
    /// Integration step, in seconds. Must stay small relative to `t_decay`
    /// for the explicit Euler scheme to remain stable.
    pub t_step: f64,
    pub noise_var: f64,
    /// Firing rate given to the seeded memory's populations at t = 0.
    pub init_rate: f64,
    /// Memory seeded as active at t = 0.
    pub first_memory: usize,
    pub param_noise: f64,
    pub param_current: f64,
    pub seed: u64,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            num_neurons: 100_000,
            num_memories: 16,
            sparsity: 0.01,
            excitation: 13_000.0,
            threshold: 0.0,
            gain_exp: 2.0 / 5.0,
            t_decay: 0.01,
            sin_min: 0.7,
            sin_max: 1.06,
            t_oscillation: 1.0,
            phase_shift: 0.75,
            cont_forward: 1500.0,
            cont_back: 400.0,
            t_tot: 14.0,
            t_step: 0.001,
            noise_var: 65.0,
            init_rate: 1.0,
            first_memory: 7,
            param_noise: 10.0,
            param_current: 4.75,
            seed: 123,
        }
    }
}

impl NetConfig {
    /// Number of integration steps covering `t_tot`.
    pub fn num_iter(&self) -> usize {
        (self.t_tot / self.t_step).round() as usize
    }

    pub fn validate(&self) -> Result<(), NetError> {
        let fail = |what: &str| {
            Err(NetError::InvalidConfig {
                what: what.to_string(),
            })
        };

        if self.num_neurons == 0 {
            return fail("num_neurons must be positive");
        }
        if self.num_memories == 0 {
            return fail("num_memories must be positive");
        }
        if !(0.0..=1.0).contains(&self.sparsity) {
            return fail("sparsity must lie in [0, 1]");
        }
        if self.first_memory >= self.num_memories {
            return fail("first_memory is out of range");
        }
        if !(self.t_tot > 0.0) {
            return fail("t_tot must be positive");
        }
        if !(self.t_step > 0.0) {
            return fail("t_step must be positive");
        }
        if !(self.t_decay > 0.0) {
            return fail("t_decay must be positive");
        }
        if !(self.t_oscillation > 0.0) {
            return fail("t_oscillation must be positive");
        }
        if self.gain_exp == 0.0 {
            return fail("gain_exp must be nonzero");
        }
        if !(self.noise_var >= 0.0) {
            return fail("noise_var must be non-negative");
        }
        if !(self.init_rate >= 0.0) {
            return fail("init_rate must be non-negative");
        }
        if self.sin_min > self.sin_max {
            return fail("sin_min must not exceed sin_max");
        }
        if self.num_iter() == 0 {
            return fail("t_tot is shorter than one time step");
        }

        let scalars = [
            self.sparsity,
            self.excitation,
            self.threshold,
            self.gain_exp,
            self.t_decay,
            self.sin_min,
            self.sin_max,
            self.t_oscillation,
            self.phase_shift,
            self.cont_forward,
            self.cont_back,
            self.t_tot,
            self.t_step,
            self.noise_var,
            self.init_rate,
            self.param_noise,
            self.param_current,
        ];
        if scalars.iter().any(|v| !v.is_finite()) {
            return fail("parameters must be finite");
        }

        Ok(())
    }
}

/// A fully prepared network: everything the integrator consumes, built once
/// and read-only for the run.
#[derive(Debug)]
pub struct Network {
    cfg: NetConfig,
    populations: Populations,
    connectivity: Connectivity,
    drive: InhibitionDrive,
    noise: Array2<f64>,
}

impl Network {
    /// Runs the setup pipeline: pattern draw, population reduction,
    /// connectivity, inhibition series, noise matrix. Fails before any
    /// integration work on invalid parameters or a degenerate pattern draw
    /// that leaves a memory unrepresented.
    pub fn build(cfg: NetConfig) -> Result<Self, NetError> {
        cfg.validate()?;
        let mut rng = Prng::new(cfg.seed);

        let patterns =
            MemoryPatterns::generate(cfg.num_neurons, cfg.num_memories, cfg.sparsity, &mut rng);
        let populations = Populations::reduce(&patterns);
        debug!(
            num_pops = populations.num_pops(),
            num_iter = cfg.num_iter(),
            "network dimensions fixed"
        );

        for (m, encoders) in populations.encoding.iter().enumerate() {
            if encoders.is_empty() {
                return Err(NetError::UnrepresentedMemory { memory: m });
            }
        }

        let connectivity = Connectivity::build(
            &populations,
            cfg.excitation,
            cfg.cont_forward,
            cfg.cont_back,
            cfg.sparsity,
        )?;

        let num_iter = cfg.num_iter();
        let drive = InhibitionDrive::build(
            cfg.sin_min,
            cfg.sin_max,
            cfg.t_oscillation,
            cfg.phase_shift,
            cfg.t_step,
            cfg.excitation,
            num_iter,
        );
        let noise = noise::gaussian_matrix(
            &populations.sizes,
            num_iter,
            cfg.noise_var,
            cfg.param_noise,
            &mut rng,
        )?;

        Ok(Self {
            cfg,
            populations,
            connectivity,
            drive,
            noise,
        })
    }

    pub fn config(&self) -> &NetConfig {
        &self.cfg
    }

    pub fn num_populations(&self) -> usize {
        self.populations.num_pops()
    }

    pub fn populations(&self) -> &Populations {
        &self.populations
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Integrates the full time range and aggregates per memory.
    ///
    /// Consumes the network: trajectory buffers are moved into the output
    /// and a run cannot be resumed. A numeric fault discards everything;
    /// partially filled trajectories are never exposed.
    pub fn run(self) -> Result<RunOutput, NetError> {
        let cfg = self.cfg;
        let num_iter = cfg.num_iter();
        let num_pops = self.populations.num_pops();
        info!(num_pops, num_iter, "integrating dynamics");

        let mut state = SimulationState::seeded(&self.populations, &cfg);
        let mut integrator = Integrator::new(
            &self.connectivity.combined,
            &self.drive.inhibition,
            &self.noise,
            &self.populations.sizes,
            &cfg,
        );

        // Pre-sized: dimensions are fixed once the reduction is done.
        let mut currents = Array2::zeros((num_pops, num_iter));
        let mut currents_by_memory = Array2::zeros((cfg.num_memories, num_iter));
        let mut firing_rates_by_memory = Array2::zeros((cfg.num_memories, num_iter));

        for t in 0..num_iter {
            integrator.step(t, &mut state)?;
            currents.column_mut(t).assign(&state.current);
            aggregate::record_step(
                t,
                &state,
                &self.populations,
                &mut currents_by_memory,
                &mut firing_rates_by_memory,
            );
        }

        info!("integration finished");
        Ok(RunOutput {
            currents,
            currents_by_memory,
            firing_rates_by_memory,
            sine_wave: self.drive.sine_wave,
            inhibition: self.drive.inhibition,
            regular: self.connectivity.regular,
            forward: self.connectivity.forward,
            backward: self.connectivity.backward,
            combined: self.connectivity.combined,
        })
    }
}

/// Everything a completed run hands to downstream consumers (plotting,
/// reporting). Rows are entity indices, populations or memories; columns
/// are time steps. Axis order is part of the contract.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunOutput {
    /// Per-population currents, `num_pops x num_iter`.
    pub currents: Array2<f64>,
    /// Size-weighted per-memory currents, `num_memories x num_iter`.
    pub currents_by_memory: Array2<f64>,
    /// Size-weighted per-memory firing rates, `num_memories x num_iter`.
    pub firing_rates_by_memory: Array2<f64>,
    /// Raw inhibition oscillation, length `num_iter`.
    pub sine_wave: Array1<f64>,
    /// Negated, excitation-scaled wave actually applied per step.
    pub inhibition: Array1<f64>,
    pub regular: Array2<f64>,
    pub forward: Array2<f64>,
    pub backward: Array2<f64>,
    /// regular + forward + backward, the weights without inhibition.
    pub combined: Array2<f64>,
}

/// Scalar digest of a run, for CLI reporting.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub num_populations: usize,
    pub num_iterations: usize,
    pub peak_rate: f64,
    pub peak_memory: usize,
    pub peak_step: usize,
}

impl RunOutput {
    pub fn summary(&self) -> RunSummary {
        let mut peak = (0, 0, f64::NEG_INFINITY);
        for ((m, t), &v) in self.firing_rates_by_memory.indexed_iter() {
            if v > peak.2 {
                peak = (m, t, v);
            }
        }

        RunSummary {
            num_populations: self.currents.nrows(),
            num_iterations: self.currents.ncols(),
            peak_rate: peak.2,
            peak_memory: peak.0,
            peak_step: peak.1,
        }
    }
}
