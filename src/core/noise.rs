use ndarray::Array2;
use tracing::info;

use crate::error::NetError;
use crate::prng::Prng;

/// Gaussian noise for every population and time step, drawn up front.
///
/// Row p holds `num_iter` samples from Normal(0, noise_var * sizes[p]),
/// divided by sizes[p] and scaled by `param_noise`: noise is generated at
/// neuron-count granularity (summing independent per-neuron sources) and
/// then renormalized to per-neuron units, so larger populations fluctuate
/// less in relative terms.
pub fn gaussian_matrix(
    sizes: &[usize],
    num_iter: usize,
    noise_var: f64,
    param_noise: f64,
    rng: &mut Prng,
) -> Result<Array2<f64>, NetError> {
    info!(
        num_pops = sizes.len(),
        num_iter, noise_var, "drawing noise matrix"
    );

    let mut noise = Array2::zeros((sizes.len(), num_iter));
    for (p, &size) in sizes.iter().enumerate() {
        if size == 0 {
            return Err(NetError::EmptyPopulation { population: p });
        }

        let std_dev = (noise_var * size as f64).sqrt();
        let norm = param_noise / size as f64;
        let mut row = noise.row_mut(p);
        for t in 0..num_iter {
            row[t] = rng.next_gaussian(0.0, std_dev) * norm;
        }
    }

    if noise.iter().any(|v| !v.is_finite()) {
        return Err(NetError::NumericFault { stage: "noise" });
    }

    Ok(noise)
}
