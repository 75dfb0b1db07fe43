use ndarray::Array2;

use crate::dynamics::SimulationState;
use crate::patterns::Populations;

/// Collapses per-population state into one value per memory: the
/// population-size-weighted average over the memory's encoding populations.
/// One trajectory per memory, regardless of how many populations encode it.
///
/// Every memory is guaranteed a non-empty encoding set by the network
/// build, so the weight sum is never zero here.
pub fn record_step(
    t: usize,
    state: &SimulationState,
    pops: &Populations,
    currents_by_memory: &mut Array2<f64>,
    firing_rates_by_memory: &mut Array2<f64>,
) {
    for (m, encoders) in pops.encoding.iter().enumerate() {
        let mut weight_sum = 0.0;
        let mut current_acc = 0.0;
        let mut rate_acc = 0.0;

        for &p in encoders {
            let w = pops.sizes[p] as f64;
            weight_sum += w;
            current_acc += w * state.current[p];
            rate_acc += w * state.firing_rates[p];
        }

        currents_by_memory[(m, t)] = current_acc / weight_sum;
        firing_rates_by_memory[(m, t)] = rate_acc / weight_sum;
    }
}
