use ndarray::{Array1, Array2};

use crate::error::NetError;
use crate::network::NetConfig;
use crate::patterns::Populations;

/// Per-population current and firing rate: the only mutable entity in the
/// core. Owned by the integrator for the duration of a run, initialized at
/// run start and dropped when the run ends.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub current: Array1<f64>,
    pub firing_rates: Array1<f64>,
}

impl SimulationState {
    /// Every population starts silent except those encoding `first_memory`,
    /// which are placed on the gain curve at `init_rate`.
    pub fn seeded(pops: &Populations, cfg: &NetConfig) -> Self {
        let mut current = Array1::zeros(pops.num_pops());
        let mut firing_rates = Array1::zeros(pops.num_pops());

        let c_init = cfg.init_rate.powf(1.0 / cfg.gain_exp) - cfg.threshold;
        for &p in &pops.encoding[cfg.first_memory] {
            current[p] = c_init;
            firing_rates[p] = cfg.init_rate;
        }

        Self {
            current,
            firing_rates,
        }
    }
}

/// Explicit two-phase Euler integrator for the leaky population currents.
///
/// Phase 1 updates every current from the firing rates at the start of the
/// step; phase 2 recomputes every firing rate from the just-committed
/// currents. No population ever reads another's mid-step value: phase 1
/// writes into a scratch buffer that is committed only once all
/// populations are done.
///
/// Stability for step sizes small relative to `t_decay` is the caller's
/// responsibility; the integrator only traps the resulting non-finite
/// values.
pub struct Integrator<'a> {
    combined: &'a Array2<f64>,
    inhibition: &'a Array1<f64>,
    noise: &'a Array2<f64>,
    sizes: Array1<f64>,

    num_neurons: f64,
    /// t_step / t_decay, the normalized Euler step.
    time_param: f64,
    threshold: f64,
    gain_exp: f64,
    param_current: f64,

    weighted_rates: Array1<f64>,
    next_current: Array1<f64>,
}

impl<'a> Integrator<'a> {
    pub fn new(
        combined: &'a Array2<f64>,
        inhibition: &'a Array1<f64>,
        noise: &'a Array2<f64>,
        sizes: &[usize],
        cfg: &NetConfig,
    ) -> Self {
        let num_pops = sizes.len();
        Self {
            combined,
            inhibition,
            noise,
            sizes: sizes.iter().map(|&s| s as f64).collect(),
            num_neurons: cfg.num_neurons as f64,
            time_param: cfg.t_step / cfg.t_decay,
            threshold: cfg.threshold,
            gain_exp: cfg.gain_exp,
            param_current: cfg.param_current,
            weighted_rates: Array1::zeros(num_pops),
            next_current: Array1::zeros(num_pops),
        }
    }

    /// Advances the state by one time step.
    ///
    /// The recurrent input to population p is
    ///   sum_q (combined[p,q] + inhibition[t]) / num_neurons
    ///         * sizes[q] * firing_rates[q]
    /// accumulated as one row dot product plus the uniform inhibition term
    /// times the total rate mass.
    pub fn step(&mut self, t: usize, state: &mut SimulationState) -> Result<(), NetError> {
        let num_pops = self.sizes.len();

        // Phase 1: leaky-integrator current update, from start-of-step rates.
        for q in 0..num_pops {
            self.weighted_rates[q] = self.sizes[q] * state.firing_rates[q];
        }
        let rate_mass = self.weighted_rates.sum();
        let inhibition = self.inhibition[t];

        for p in 0..num_pops {
            let recurrent = self.combined.row(p).dot(&self.weighted_rates);
            let input = (recurrent + inhibition * rate_mass) / self.num_neurons;
            let c = state.current[p];
            self.next_current[p] =
                c + self.time_param * (-c + input + self.noise[(p, t)]);
        }
        state.current.assign(&self.next_current);

        // Phase 2: thresholded power-law gain from the committed currents.
        for p in 0..num_pops {
            let c = state.current[p];
            state.firing_rates[p] = if c + self.threshold > 0.0 {
                (c * self.param_current + self.threshold).powf(self.gain_exp)
            } else {
                0.0
            };
        }

        // Strict trapping: a single NaN/Inf aborts the run with its location.
        for p in 0..num_pops {
            if !state.current[p].is_finite() {
                return Err(NetError::IntegrationFault {
                    what: "current",
                    step: t,
                    population: p,
                });
            }
            if !state.firing_rates[p].is_finite() {
                return Err(NetError::IntegrationFault {
                    what: "firing rate",
                    step: t,
                    population: p,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    use crate::connectivity::Connectivity;
    use crate::noise;
    use crate::oscillator::InhibitionDrive;
    use crate::patterns::{MemoryPatterns, Populations};
    use crate::prng::Prng;

    fn base_cfg() -> NetConfig {
        NetConfig {
            num_neurons: 200,
            num_memories: 1,
            sparsity: 0.2,
            excitation: 500.0,
            threshold: 0.0,
            gain_exp: 0.4,
            t_decay: 0.1,
            sin_min: 0.2,
            sin_max: 0.2,
            t_oscillation: 1.0,
            phase_shift: 0.0,
            cont_forward: 0.0,
            cont_back: 0.0,
            t_tot: 10.0,
            t_step: 0.001,
            noise_var: 0.0,
            init_rate: 1.0,
            first_memory: 0,
            param_noise: 10.0,
            param_current: 1.0,
            seed: 123,
        }
    }

    #[test]
    fn seeded_state_places_first_memory_on_the_gain_curve() {
        let pops = Populations {
            rows: arr2(&[[0], [1]]),
            sizes: vec![160, 40],
            encoding: vec![vec![1]],
        };
        let cfg = base_cfg();
        let state = SimulationState::seeded(&pops, &cfg);

        assert_eq!(state.current[0], 0.0);
        assert_eq!(state.firing_rates[0], 0.0);
        // init_rate^(1/gain_exp) - threshold = 1^2.5 - 0 = 1
        assert_eq!(state.current[1], 1.0);
        assert_eq!(state.firing_rates[1], 1.0);
    }

    #[test]
    fn phase_one_reads_start_of_step_rates_only() {
        // Two mutually coupled populations with asymmetric state. If any
        // population saw the other's mid-step value, the hand computation
        // below would not match.
        let combined = arr2(&[[0.0, 8.0], [8.0, 0.0]]);
        let inhibition = arr1(&[0.0]);
        let noise = Array2::zeros((2, 1));
        let sizes = [2usize, 2];

        let mut cfg = base_cfg();
        cfg.num_neurons = 4;
        cfg.t_step = 0.01;
        cfg.t_decay = 0.1;

        let mut state = SimulationState {
            current: arr1(&[1.0, 0.0]),
            firing_rates: arr1(&[3.0, 1.0]),
        };
        let mut integrator = Integrator::new(&combined, &inhibition, &noise, &sizes, &cfg);
        integrator.step(0, &mut state).unwrap();

        // input_0 = 8 * 2 * fr_1 / 4 = 4, input_1 = 8 * 2 * fr_0 / 4 = 12,
        // both from the rates before the step.
        let expected_0 = 1.0 + 0.1 * (-1.0 + 4.0);
        let expected_1 = 0.0 + 0.1 * (-0.0 + 12.0);
        assert!((state.current[0] - expected_0).abs() < 1e-12);
        assert!((state.current[1] - expected_1).abs() < 1e-12);
    }

    #[test]
    fn gain_floor_holds_at_every_step() {
        let cfg = {
            let mut cfg = base_cfg();
            cfg.threshold = 1.0;
            cfg.noise_var = 65.0;
            cfg.num_memories = 2;
            cfg.cont_forward = 100.0;
            cfg.cont_back = 50.0;
            cfg
        };

        let mut rng = Prng::new(cfg.seed);
        let patterns =
            MemoryPatterns::generate(cfg.num_neurons, cfg.num_memories, cfg.sparsity, &mut rng);
        let pops = Populations::reduce(&patterns);
        let conn = Connectivity::build(
            &pops,
            cfg.excitation,
            cfg.cont_forward,
            cfg.cont_back,
            cfg.sparsity,
        )
        .unwrap();
        let drive = InhibitionDrive::build(
            cfg.sin_min,
            cfg.sin_max,
            cfg.t_oscillation,
            cfg.phase_shift,
            cfg.t_step,
            cfg.excitation,
            500,
        );
        let noise =
            noise::gaussian_matrix(&pops.sizes, 500, cfg.noise_var, cfg.param_noise, &mut rng)
                .unwrap();

        let mut state = SimulationState::seeded(&pops, &cfg);
        let mut integrator =
            Integrator::new(&conn.combined, &drive.inhibition, &noise, &pops.sizes, &cfg);

        for t in 0..500 {
            integrator.step(t, &mut state).unwrap();
            for p in 0..pops.num_pops() {
                if state.current[p] + cfg.threshold <= 0.0 {
                    assert_eq!(state.firing_rates[p], 0.0, "step {t}, population {p}");
                } else {
                    assert!(state.firing_rates[p] >= 0.0);
                }
            }
        }
    }

    #[test]
    fn noiseless_flat_inhibition_converges_to_a_fixed_point() {
        // Single memory, no noise, constant inhibition: the Euler scheme
        // must settle where current equals its recurrent input.
        let cfg = base_cfg();
        let num_iter = 10_000;

        let mut rng = Prng::new(cfg.seed);
        let patterns =
            MemoryPatterns::generate(cfg.num_neurons, cfg.num_memories, cfg.sparsity, &mut rng);
        let pops = Populations::reduce(&patterns);
        let conn = Connectivity::build(
            &pops,
            cfg.excitation,
            cfg.cont_forward,
            cfg.cont_back,
            cfg.sparsity,
        )
        .unwrap();
        let drive = InhibitionDrive::build(
            cfg.sin_min,
            cfg.sin_max,
            cfg.t_oscillation,
            cfg.phase_shift,
            cfg.t_step,
            cfg.excitation,
            num_iter,
        );
        let noise =
            noise::gaussian_matrix(&pops.sizes, num_iter, cfg.noise_var, cfg.param_noise, &mut rng)
                .unwrap();

        let mut state = SimulationState::seeded(&pops, &cfg);
        let mut integrator =
            Integrator::new(&conn.combined, &drive.inhibition, &noise, &pops.sizes, &cfg);
        for t in 0..num_iter {
            integrator.step(t, &mut state).unwrap();
        }

        // Recompute the input at the final state and compare against the
        // current: at the fixed point the leak exactly cancels the drive.
        let weighted: Array1<f64> = pops
            .sizes
            .iter()
            .zip(state.firing_rates.iter())
            .map(|(&s, &fr)| s as f64 * fr)
            .collect();
        let rate_mass = weighted.sum();
        for p in 0..pops.num_pops() {
            let input = (conn.combined.row(p).dot(&weighted)
                + drive.inhibition[0] * rate_mass)
                / cfg.num_neurons as f64;
            assert!(
                (input - state.current[p]).abs() < 1e-6,
                "population {p}: input {input} vs current {}",
                state.current[p]
            );
        }
    }

    #[test]
    fn fractional_power_of_negative_base_is_trapped() {
        // threshold > 0 admits currents where the gain base is negative;
        // the resulting NaN must abort with the location identified.
        let combined = arr2(&[[0.0]]);
        let inhibition = arr1(&[0.0]);
        let noise = Array2::zeros((1, 1));
        let sizes = [10usize];

        let mut cfg = base_cfg();
        cfg.threshold = 1.0;
        cfg.param_current = 4.75;

        // current stays near -0.5: the gain condition passes (-0.5 + 1 > 0)
        // but the base -0.5 * 4.75 + 1 is negative.
        let mut state = SimulationState {
            current: arr1(&[-0.5]),
            firing_rates: arr1(&[0.0]),
        };
        let mut integrator = Integrator::new(&combined, &inhibition, &noise, &sizes, &cfg);
        let err = integrator.step(0, &mut state).unwrap_err();
        assert!(matches!(
            err,
            NetError::IntegrationFault {
                what: "firing rate",
                step: 0,
                population: 0,
            }
        ));
    }
}
