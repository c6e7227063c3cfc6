// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Leaky integrate-and-fire step rule.
//!
//! One pure function shared by direct stimulation and one-hop propagation:
//!
//! ```text
//! new_potential = potential * λ + input * dt
//! new_potential >= θ  =>  fired, potential resets to 0
//! ```
//!
//! There is no refractory period or threshold adaptation here: the engine
//! models discrete retrieval events, not continuous membrane dynamics, so
//! each call is one well-defined simulation timestep.

/// LIF parameters for a domain's neurons.
#[derive(Debug, Clone)]
pub struct LifParams {
    /// Firing threshold θ
    pub threshold: f64,
    /// Per-step potential decay λ
    pub decay: f64,
    /// Simulation timestep dt
    pub dt: f64,
}

impl Default for LifParams {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            decay: 0.9,
            dt: 1.0,
        }
    }
}

/// Result of one LIF step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifStep {
    pub potential: f64,
    pub fired: bool,
}

/// Apply one integrate-and-fire step. Firing resets the potential to
/// exactly 0.
pub fn step(potential: f64, input: f64, params: &LifParams) -> LifStep {
    let integrated = potential * params.decay + input * params.dt;

    if integrated >= params.threshold {
        LifStep {
            potential: 0.0,
            fired: true,
        }
    } else {
        LifStep {
            potential: integrated,
            fired: false,
        }
    }
}
