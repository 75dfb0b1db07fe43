use std::f64::consts::PI;

use ndarray::Array1;
use tracing::info;

/// Sine wave rescaled to [min, max], sampled at integer step `t` with
/// spacing `dt`. `phase_shift` is expressed in time units.
pub fn sinusoid(min: f64, max: f64, period: f64, t: usize, phase_shift: f64, dt: f64) -> f64 {
    let amplitude = (max - min) / 2.0;
    let frequency = dt / period;
    let shift = min + amplitude;
    amplitude * (2.0 * PI * (t as f64 + phase_shift / dt) * frequency).sin() + shift
}

/// The periodic global inhibition drive.
///
/// `sine_wave` is the raw oscillation, kept for downstream consumers.
/// The integrator reads `inhibition`: the negated wave scaled by the
/// excitation constant. The same scalar is broadcast to every population
/// at a given step, so inhibition is uniform and purely subtractive; its
/// troughs are what allow activity, and its peaks are what force the
/// transition to the next memory.
#[derive(Debug, Clone)]
pub struct InhibitionDrive {
    pub sine_wave: Array1<f64>,
    pub inhibition: Array1<f64>,
}

impl InhibitionDrive {
    /// `phase_shift` is a fraction of the oscillation period, matching the
    /// reference parameterization.
    pub fn build(
        sin_min: f64,
        sin_max: f64,
        t_oscillation: f64,
        phase_shift: f64,
        t_step: f64,
        excitation: f64,
        num_iter: usize,
    ) -> Self {
        info!(num_iter, "computing inhibition series");

        let sine_wave = Array1::from_shape_fn(num_iter, |t| {
            sinusoid(
                sin_min,
                sin_max,
                t_oscillation,
                t,
                phase_shift * t_oscillation,
                t_step,
            )
        });
        let inhibition = sine_wave.mapv(|v| -v * excitation);

        Self {
            sine_wave,
            inhibition,
        }
    }
}
