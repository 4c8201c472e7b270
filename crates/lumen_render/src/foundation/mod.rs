//! Foundation utilities shared by every subsystem
//!
//! Math types, logging setup, and the small deterministic sampler used by
//! the default integrator and the statistical tests.

pub mod logging;
pub mod math;
pub mod sampling;
