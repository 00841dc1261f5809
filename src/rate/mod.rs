//! This module contains the rate pipeline: momentum integrals and their prefactors.
//!
//! `RateCalculator` is the entry point. It borrows an experiment profile, caches the halo
//! normalization and dispatches a batch of masses to the integral matching the mediator
//! hypothesis and detection channel.

mod calculator;
pub mod integral;
mod options;

pub use calculator::RateCalculator;
pub use options::{IntegrationOptions, PhaseGridOptions, RateOptions};
