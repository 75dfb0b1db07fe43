use thiserror::Error;

/// Fatal simulation errors.
///
/// No variant is ever retried: a run is deterministic given its seed, so a
/// failure is reproducible and has to be fixed by changing parameters. A run
/// that fails mid-integration discards its partially filled trajectories.
#[derive(Debug, Error)]
pub enum NetError {
    /// A scalar parameter failed validation, before any simulation work.
    #[error("invalid configuration: {what}")]
    InvalidConfig { what: String },

    /// The pattern draw left a memory with no encoding population, so
    /// per-memory aggregation would be undefined. Caught at setup.
    #[error("memory {memory} is encoded by no population")]
    UnrepresentedMemory { memory: usize },

    /// A zero-size population reached the noise generator. The reduction
    /// never produces one; this is a precondition violation.
    #[error("population {population} has size zero")]
    EmptyPopulation { population: usize },

    /// A non-finite value appeared while precomputing a matrix.
    #[error("non-finite value while building {stage}")]
    NumericFault { stage: &'static str },

    /// A non-finite value appeared during integration. The strict
    /// floating-point semantics of the model: abort at the offending
    /// step and population instead of propagating NaN/Inf.
    #[error("non-finite {what} at step {step}, population {population}")]
    IntegrationFault {
        what: &'static str,
        step: usize,
        population: usize,
    },
}
