use ndarray::{Array2, ArrayViewMut1, Zip};
use tracing::info;

use crate::error::NetError;
use crate::patterns::Populations;

/// Hebbian coupling matrices between populations.
///
/// Built once before the run, O(num_pops^2 * num_memories); no incremental
/// update exists. Entries are real-valued couplings, row = presynaptic
/// population, column = postsynaptic population.
#[derive(Debug, Clone)]
pub struct Connectivity {
    /// Balanced covariance rule: positive when two populations jointly
    /// encode (or jointly ignore) many memories, negative otherwise.
    pub regular: Array2<f64>,
    /// Couples a population encoding memory m to populations encoding
    /// m + 1, driving forward transitions through the stored sequence.
    pub forward: Array2<f64>,
    /// Same construction in the reverse direction, independently tunable.
    pub backward: Array2<f64>,
    /// regular + forward + backward. Inhibition varies over time and is
    /// added per step after the division by network size, so it cannot be
    /// folded in here.
    pub combined: Array2<f64>,
}

impl Connectivity {
    pub fn build(
        pops: &Populations,
        excitation: f64,
        cont_forward: f64,
        cont_back: f64,
        sparsity: f64,
    ) -> Result<Self, NetError> {
        let p = pops.num_pops();
        let m = pops.rows.ncols();
        info!(num_pops = p, num_memories = m, "building connectivity");

        let mut regular = Array2::zeros((p, p));
        let mut forward = Array2::zeros((p, p));
        let mut backward = Array2::zeros((p, p));

        let rows = &pops.rows;
        let fill = |i: usize,
                    mut reg_row: ArrayViewMut1<f64>,
                    mut fwd_row: ArrayViewMut1<f64>,
                    mut bwd_row: ArrayViewMut1<f64>| {
            let row_i = rows.row(i);
            for j in 0..p {
                let row_j = rows.row(j);

                let mut reg = 0.0;
                for mu in 0..m {
                    reg += (f64::from(row_i[mu]) - sparsity) * (f64::from(row_j[mu]) - sparsity);
                }

                let mut fwd = 0.0;
                let mut bwd = 0.0;
                for mu in 0..m.saturating_sub(1) {
                    fwd += f64::from(row_i[mu]) * f64::from(row_j[mu + 1]);
                    bwd += f64::from(row_i[mu + 1]) * f64::from(row_j[mu]);
                }

                reg_row[j] = excitation * reg;
                fwd_row[j] = cont_forward * fwd;
                bwd_row[j] = cont_back * bwd;
            }
        };

        // Entries are independent; rows can be filled in any order.
        let zip = Zip::indexed(regular.outer_iter_mut())
            .and(forward.outer_iter_mut())
            .and(backward.outer_iter_mut());

        #[cfg(feature = "parallel")]
        zip.par_for_each(|i, reg_row, fwd_row, bwd_row| fill(i, reg_row, fwd_row, bwd_row));
        #[cfg(not(feature = "parallel"))]
        zip.for_each(|i, reg_row, fwd_row, bwd_row| fill(i, reg_row, fwd_row, bwd_row));

        let combined = &regular + &forward + &backward;

        for mat in [&regular, &forward, &backward, &combined] {
            if mat.iter().any(|v| !v.is_finite()) {
                return Err(NetError::NumericFault {
                    stage: "connectivity",
                });
            }
        }

        Ok(Self {
            regular,
            forward,
            backward,
            combined,
        })
    }
}
