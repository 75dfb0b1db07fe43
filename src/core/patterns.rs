use hashbrown::HashMap;
use ndarray::Array2;
use tracing::{debug, info};

use crate::prng::Prng;

/// Population id. Stable for the lifetime of a simulation.
pub type PopId = usize;

/// Raw sparse binary memory patterns, `num_neurons x num_memories`.
///
/// Entry (n, m) is 1 when neuron n encodes memory m, drawn i.i.d.
/// Bernoulli(sparsity). Generated once, immutable thereafter.
#[derive(Debug, Clone)]
pub struct MemoryPatterns {
    pub bits: Array2<u8>,
}

impl MemoryPatterns {
    pub fn generate(
        num_neurons: usize,
        num_memories: usize,
        sparsity: f64,
        rng: &mut Prng,
    ) -> Self {
        info!(num_neurons, num_memories, sparsity, "drawing memory patterns");

        // Row-major fill order, so the draw sequence is deterministic.
        let bits = Array2::from_shape_fn((num_neurons, num_memories), |_| {
            u8::from(rng.next_bernoulli(sparsity))
        });
        Self { bits }
    }

    pub fn num_neurons(&self) -> usize {
        self.bits.nrows()
    }

    pub fn num_memories(&self) -> usize {
        self.bits.ncols()
    }

    /// Neurons whose pattern row has a 1 in memory `m`'s column.
    pub fn neurons_encoding(&self, m: usize) -> usize {
        self.bits.column(m).iter().filter(|&&b| b == 1).count()
    }
}

/// Populations: equivalence classes of neurons sharing one pattern row.
///
/// The model's unit of simulation after dimensionality reduction. Ids are
/// assigned in first-occurrence order over the neuron index, so for a fixed
/// pattern draw the reduction is deterministic. The population count is
/// data-dependent and must be read from here, never assumed.
#[derive(Debug, Clone)]
pub struct Populations {
    /// Distinct pattern rows, `num_pops x num_memories`. The class keys.
    pub rows: Array2<u8>,
    /// Neurons mapped to each population. Sums to the neuron count.
    pub sizes: Vec<usize>,
    /// For each memory, the ids of the populations encoding it.
    pub encoding: Vec<Vec<PopId>>,
}

impl Populations {
    pub fn reduce(patterns: &MemoryPatterns) -> Self {
        let num_memories = patterns.num_memories();

        let mut ids: HashMap<Vec<u8>, PopId> = HashMap::new();
        let mut rows: Vec<Vec<u8>> = Vec::new();
        let mut sizes: Vec<usize> = Vec::new();

        for row in patterns.bits.rows() {
            let key = row.to_vec();
            match ids.get(&key) {
                Some(&id) => sizes[id] += 1,
                None => {
                    let id = rows.len();
                    ids.insert(key.clone(), id);
                    rows.push(key);
                    sizes.push(1);
                }
            }
        }

        let num_pops = rows.len();
        debug!(num_pops, "population reduction done");

        let mut encoding = vec![Vec::new(); num_memories];
        for (id, row) in rows.iter().enumerate() {
            for (m, &bit) in row.iter().enumerate() {
                if bit == 1 {
                    encoding[m].push(id);
                }
            }
        }

        let rows = Array2::from_shape_fn((num_pops, num_memories), |(i, m)| rows[i][m]);

        Self {
            rows,
            sizes,
            encoding,
        }
    }

    pub fn num_pops(&self) -> usize {
        self.sizes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reduce(num_neurons: usize, num_memories: usize, sparsity: f64, seed: u64) -> Populations {
        let mut rng = Prng::new(seed);
        let patterns = MemoryPatterns::generate(num_neurons, num_memories, sparsity, &mut rng);
        Populations::reduce(&patterns)
    }

    #[test]
    fn sizes_sum_to_neuron_count() {
        let pops = reduce(500, 4, 0.2, 123);
        assert_eq!(pops.sizes.iter().sum::<usize>(), 500);
    }

    #[test]
    fn encoding_matches_raw_pattern_counts() {
        let mut rng = Prng::new(77);
        let patterns = MemoryPatterns::generate(400, 5, 0.3, &mut rng);
        let pops = Populations::reduce(&patterns);

        for m in 0..5 {
            let reduced: usize = pops.encoding[m].iter().map(|&p| pops.sizes[p]).sum();
            assert_eq!(reduced, patterns.neurons_encoding(m));
        }
    }

    #[test]
    fn encoding_ids_have_the_memory_bit_set() {
        let pops = reduce(300, 4, 0.25, 9);
        for (m, encoders) in pops.encoding.iter().enumerate() {
            for &p in encoders {
                assert_eq!(pops.rows[(p, m)], 1);
            }
        }
    }

    #[test]
    fn degenerate_sparsity_collapses_to_one_population() {
        // sparsity 0 and 1 must not fail; every neuron shares one row.
        for sparsity in [0.0, 1.0] {
            let pops = reduce(100, 3, sparsity, 1);
            assert_eq!(pops.num_pops(), 1);
            assert_eq!(pops.sizes, vec![100]);
        }

        let all_off = reduce(100, 3, 0.0, 1);
        assert!(all_off.encoding.iter().all(|e| e.is_empty()));

        let all_on = reduce(100, 3, 1.0, 1);
        assert!(all_on.encoding.iter().all(|e| e == &vec![0]));
    }

    #[test]
    fn reduction_is_deterministic() {
        let a = reduce(250, 4, 0.15, 42);
        let b = reduce(250, 4, 0.15, 42);
        assert_eq!(a.rows, b.rows);
        assert_eq!(a.sizes, b.sizes);
        assert_eq!(a.encoding, b.encoding);
    }
}
