// Minimal PRNG (no external crates).
//
// This is NOT cryptographically secure.
// It is used only for reproducible pattern draws and simulation noise:
// the whole run is deterministic given the seed.

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
    // Box-Muller produces samples in pairs; the second one is kept here.
    spare_gaussian: Option<f64>,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        // Avoid a zero state.
        let state = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self {
            state,
            spare_gaussian: None,
        }
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        // Marsaglia / Vigna family. Simple, fast, decent for simulation noise.
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Uniform in [0, 1) with 53 bits of precision.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        let x = self.next_u64() >> 11;
        (x as f64) / ((1u64 << 53) as f64)
    }

    /// Bernoulli draw: true with probability `p`.
    #[inline]
    pub fn next_bernoulli(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Normal(mean, std_dev) via the Box-Muller transform.
    ///
    /// Both outputs of the transform are consumed, so draws come in
    /// deterministic pairs per two uniforms.
    pub fn next_gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        if let Some(z) = self.spare_gaussian.take() {
            return mean + std_dev * z;
        }

        // 1 - u keeps the log argument strictly positive.
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();

        let mag = (-2.0 * u1.ln()).sqrt();
        let (sin_t, cos_t) = (2.0 * std::f64::consts::PI * u2).sin_cos();

        self.spare_gaussian = Some(mag * sin_t);
        mean + std_dev * mag * cos_t
    }
}
