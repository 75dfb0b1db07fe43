#[path = "core/aggregate.rs"]
pub mod aggregate;

#[path = "core/connectivity.rs"]
pub mod connectivity;

#[path = "core/dynamics.rs"]
pub mod dynamics;

#[path = "core/error.rs"]
pub mod error;

#[path = "core/network.rs"]
pub mod network;

#[path = "core/noise.rs"]
pub mod noise;

#[path = "core/oscillator.rs"]
pub mod oscillator;

#[path = "core/patterns.rs"]
pub mod patterns;

#[path = "core/prng.rs"]
pub mod prng;
