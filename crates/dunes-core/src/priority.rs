//! Escape / gather / mate scoring with ordered override rules.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;

/// Behavior category chosen for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    Escape,
    #[default]
    Gather,
    Mate,
}

/// Score snapshot for the three behavior categories.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Priorities {
    pub escape: f32,
    pub gather: f32,
    pub mate: f32,
}

impl Priorities {
    #[must_use]
    pub const fn new(escape: f32, gather: f32, mate: f32) -> Self {
        Self {
            escape,
            gather,
            mate,
        }
    }

    /// Argmax over the scores; ties resolve in the order escape, gather, mate.
    #[must_use]
    pub fn dominant(&self) -> Behavior {
        if self.escape >= self.gather && self.escape >= self.mate {
            Behavior::Escape
        } else if self.gather >= self.mate {
            Behavior::Gather
        } else {
            Behavior::Mate
        }
    }
}

/// Agent facts the override rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityInputs {
    pub energy_fraction: f32,
    pub is_decomposer: bool,
    pub paired: bool,
}

/// Side effects requested by the override rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverrideOutcome {
    /// The current pairing must be cleared on both sides.
    pub break_pairing: bool,
    /// A decomposer should release toxin this tick.
    pub release_toxin: bool,
}

pub type OverrideRule = fn(&mut Priorities, &PriorityInputs, &SimConfig, &mut OverrideOutcome);

/// Override rules in application order.
pub const OVERRIDES: [OverrideRule; 3] = [decomposer_satiation, starvation, toxin_defense];

/// Sated decomposers stop gathering and turn to mating.
pub fn decomposer_satiation(
    scores: &mut Priorities,
    inputs: &PriorityInputs,
    config: &SimConfig,
    _outcome: &mut OverrideOutcome,
) {
    if inputs.is_decomposer && inputs.energy_fraction >= config.decomposer_satiation_fraction {
        scores.gather = 0.0;
        scores.mate = 1.5;
    }
}

/// Starving agents must eat and drop any pairing.
pub fn starvation(
    scores: &mut Priorities,
    inputs: &PriorityInputs,
    config: &SimConfig,
    outcome: &mut OverrideOutcome,
) {
    if inputs.energy_fraction < config.starvation_fraction {
        scores.gather = scores.gather.max(1.6);
        if inputs.paired {
            outcome.break_pairing = true;
        }
    }
}

/// Threatened decomposers escape and defend themselves with toxin.
pub fn toxin_defense(
    scores: &mut Priorities,
    inputs: &PriorityInputs,
    config: &SimConfig,
    outcome: &mut OverrideOutcome,
) {
    if inputs.is_decomposer && scores.escape > config.toxin_escape_threshold {
        scores.escape = 1.8;
        outcome.release_toxin = true;
    }
}

/// `1 - distance / vision`, clamped; zero when nothing threatens.
#[must_use]
pub fn escape_score(threat_distance: Option<f32>, vision: f32) -> f32 {
    match threat_distance {
        Some(distance) if vision > 0.0 => (1.0 - distance / vision).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Hunger-driven gather score with a small noise term.
#[must_use]
pub fn gather_score(energy_fraction: f32, noise: f32) -> f32 {
    (1.5 * (1.0 - energy_fraction) + noise).clamp(0.0, 1.5)
}

/// Runs the override pipeline over `base` and picks the dominant behavior.
#[must_use]
pub fn select_behavior(
    base: Priorities,
    inputs: &PriorityInputs,
    config: &SimConfig,
) -> (Priorities, Behavior, OverrideOutcome) {
    let mut scores = base;
    let mut outcome = OverrideOutcome::default();
    for rule in OVERRIDES {
        rule(&mut scores, inputs, config, &mut outcome);
    }
    (scores, scores.dominant(), outcome)
}
