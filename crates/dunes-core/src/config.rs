//! Immutable simulation configuration.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Position;
use crate::species::Species;

/// Errors raised while validating a [`SimConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Courtship and reproduction knobs that differ per species.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpeciesTuning {
    /// Multiplier applied to the vision-derived call range.
    pub call_range_factor: f32,
    /// Seconds before a caller may call again.
    pub call_cooldown: f32,
    /// Seconds a pairing may last before it is abandoned.
    pub abandon_timeout: f32,
    /// Fraction of energy each parent pays on reproduction.
    pub mating_cost: f32,
    /// Mating distance expressed in multiples of the agent radius.
    pub mate_distance_factor: f32,
}

/// Per-species tuning table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeciesTable {
    pub forager: SpeciesTuning,
    pub predator: SpeciesTuning,
    pub decomposer: SpeciesTuning,
}

impl SpeciesTable {
    #[must_use]
    pub const fn get(&self, species: Species) -> &SpeciesTuning {
        match species {
            Species::Forager => &self.forager,
            Species::Predator => &self.predator,
            Species::Decomposer => &self.decomposer,
        }
    }
}

impl Default for SpeciesTable {
    fn default() -> Self {
        Self {
            forager: SpeciesTuning {
                call_range_factor: 1.0,
                call_cooldown: 6.0,
                abandon_timeout: 20.0,
                mating_cost: 0.24,
                mate_distance_factor: 3.0,
            },
            predator: SpeciesTuning {
                call_range_factor: 1.5,
                call_cooldown: 4.0,
                abandon_timeout: 15.0,
                mating_cost: 0.15,
                mate_distance_factor: 4.0,
            },
            decomposer: SpeciesTuning {
                call_range_factor: 1.0,
                call_cooldown: 6.0,
                abandon_timeout: 25.0,
                mating_cost: 0.2,
                mate_distance_factor: 3.0,
            },
        }
    }
}

/// Static configuration for a Dunes world. Every numeric constant the engine
/// reads lives here; nothing is global.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Width of the world in world units.
    pub world_width: u32,
    /// Height of the world in world units.
    pub world_height: u32,
    /// Optional RNG seed for reproducible worlds.
    pub rng_seed: Option<u64>,
    /// Creatures placed at seeding time.
    pub initial_creatures: usize,
    /// Food items placed at seeding time.
    pub initial_food: usize,
    /// Fraction of seeded creatures that are decomposers.
    pub decomposer_fraction: f32,
    /// Keep-out margin from the world edge when seeding.
    pub spawn_margin: f32,
    /// Maximum number of recent tick summaries retained in-memory.
    pub history_capacity: usize,

    /// Size of one scent cell in world units (must evenly divide width/height).
    pub scent_cell_size: u32,
    /// Diffusion factor exchanging scent between neighboring cells.
    pub scent_diffuse_rate: f32,
    /// Proportional decay applied to every scent cell per update.
    pub scent_decay_rate: f32,
    /// Multiplier on the decay rate for the corpse channel.
    pub corpse_decay_factor: f32,
    /// Multiplier applied to every emission strength.
    pub scent_emit_gain: f32,
    /// Accumulated seconds between scent field updates.
    pub scent_update_interval: f32,
    /// Seconds between an agent's own scent deposits.
    pub agent_scent_interval: f32,
    /// Strength of the ambient scent left by live food.
    pub food_scent_strength: f32,
    /// Strength of the ambient scent left by live corpses.
    pub corpse_scent_strength: f32,

    /// Radius of a size-1.0 body.
    pub base_radius: f32,
    /// Speed of a speed-1.0 body in world units per second.
    pub base_speed: f32,
    /// Energy capacity of a size-1.0 body.
    pub energy_base_max: f32,
    /// Speed multiplier while carrying food.
    pub carry_slowdown: f32,
    /// Energy fraction below which the low-energy speed penalty applies.
    pub low_energy_fraction: f32,
    /// Speed multiplier at zero energy.
    pub low_energy_speed_floor: f32,
    /// Energy drained per second regardless of movement.
    pub idle_energy_cost: f32,
    /// Energy drained per second per unit of speed.
    pub move_energy_cost: f32,
    /// Contact distance for food pickup.
    pub pickup_distance: f32,
    /// Distance from a nest center at which carried food is delivered.
    pub drop_distance: f32,
    /// Energy restored by a delivered food item without stored energy.
    pub delivery_reward: f32,
    /// Whether a delivery respawns a food item elsewhere.
    pub respawn_food_on_delivery: bool,
    /// A cached food target is dropped beyond `vision * food_vision_extension`.
    pub food_vision_extension: f32,

    /// Half-width of the uniform noise added to the gather score.
    pub gather_noise: f32,
    /// Energy fraction below which the starvation override fires.
    pub starvation_fraction: f32,
    /// Energy fraction above which decomposers stop gathering.
    pub decomposer_satiation_fraction: f32,
    /// Escape score that triggers a decomposer toxin release.
    pub toxin_escape_threshold: f32,
    /// Mate drive accrued per second.
    pub mate_drive_rate: f32,
    /// Ceiling of the mate drive.
    pub mate_drive_cap: f32,

    /// Aggression above which a non-decomposer is a predator.
    pub predator_aggression: f32,
    /// Size ratio separating predator from prey.
    pub predation_size_ratio: f32,
    /// Total energy yielded by a kill.
    pub predation_gain: f32,
    /// Fraction of a kill's energy granted immediately.
    pub predation_instant_fraction: f32,
    /// Seconds over which the remainder of a kill is digested.
    pub digest_time: f32,
    /// Energy fraction at or below which predators hibernate.
    pub hibernation_fraction: f32,
    /// Speed multiplier while hibernating.
    pub hibernation_speed_factor: f32,
    /// Metabolism multiplier applied each hibernating tick.
    pub hibernation_metabolism_decay: f32,
    /// Energy fraction below which predators accept plain food.
    pub predator_hunger_fraction: f32,
    /// Fraction of the delivery reward a predator gets from food.
    pub predator_food_reward_factor: f32,
    /// Energy fraction at which predators stop hunting.
    pub predator_satiation_fraction: f32,

    /// Fixed decomposer speed in world units per second.
    pub decomposer_speed: f32,
    /// Decomposers see corpses at `vision * corpse_vision_factor`.
    pub corpse_vision_factor: f32,
    /// Fraction of energy headroom consumed per bite.
    pub decomposer_bite_fraction: f32,
    /// Fraction of a bite absorbed; the rest is excreted as food.
    pub decomposer_absorb_fraction: f32,
    /// Maximum energy stored in one excreted food item.
    pub food_unit_energy: f32,
    /// Excreted remainders below `food_unit_energy * min_food_fraction` are discarded.
    pub min_food_fraction: f32,
    /// Scatter radius for excreted food.
    pub excretion_scatter: f32,
    /// Seconds between toxin releases.
    pub toxin_cooldown: f32,
    /// Corpse energy as a fraction of the dead agent's capacity.
    pub corpse_energy_fraction: f32,

    /// Energy fraction required to become ready to mate.
    pub mating_energy_fraction: f32,
    /// Seconds a call stays open.
    pub call_duration: f32,
    /// Seconds a response stays open.
    pub response_duration: f32,
    /// Standard deviation of the mutation noise.
    pub mutation_sigma: f32,
    /// Spatial jitter applied to child spawn positions.
    pub child_spawn_jitter: f32,
    /// Lower bound of the child's energy fraction.
    pub child_energy_min: f32,
    /// Upper bound of the child's energy fraction.
    pub child_energy_max: f32,
    /// Call range in world units per point of vision.
    pub call_range_per_vision: f32,
    /// Uncalled mates are sought within `vision * mate_search_vision_factor`.
    pub mate_search_vision_factor: f32,
    /// Mate drive multiplier applied to an agent that abandons a pairing.
    pub abandon_drive_factor: f32,

    /// Courtship tuning per species.
    pub species: SpeciesTable,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_width: 1_200,
            world_height: 800,
            rng_seed: None,
            initial_creatures: 40,
            initial_food: 60,
            decomposer_fraction: 0.1,
            spawn_margin: 20.0,
            history_capacity: 256,

            scent_cell_size: 25,
            scent_diffuse_rate: 0.18,
            scent_decay_rate: 0.025,
            corpse_decay_factor: 0.4,
            scent_emit_gain: 0.9,
            scent_update_interval: 0.08,
            agent_scent_interval: 0.9,
            food_scent_strength: 0.3,
            corpse_scent_strength: 0.6,

            base_radius: 6.0,
            base_speed: 60.0,
            energy_base_max: 100.0,
            carry_slowdown: 0.75,
            low_energy_fraction: 0.25,
            low_energy_speed_floor: 0.65,
            idle_energy_cost: 1.2,
            move_energy_cost: 2.0,
            pickup_distance: 8.0,
            drop_distance: 30.0,
            delivery_reward: 35.0,
            respawn_food_on_delivery: true,
            food_vision_extension: 1.5,

            gather_noise: 0.05,
            starvation_fraction: 0.35,
            decomposer_satiation_fraction: 0.9,
            toxin_escape_threshold: 0.5,
            mate_drive_rate: 0.05,
            mate_drive_cap: 0.9,

            predator_aggression: 0.6,
            predation_size_ratio: 1.2,
            predation_gain: 80.0,
            predation_instant_fraction: 0.25,
            digest_time: 10.0,
            hibernation_fraction: 0.2,
            hibernation_speed_factor: 0.2,
            hibernation_metabolism_decay: 0.995,
            predator_hunger_fraction: 0.5,
            predator_food_reward_factor: 0.5,
            predator_satiation_fraction: 0.95,

            decomposer_speed: 40.0,
            corpse_vision_factor: 1.5,
            decomposer_bite_fraction: 0.5,
            decomposer_absorb_fraction: 0.5,
            food_unit_energy: 35.0,
            min_food_fraction: 0.25,
            excretion_scatter: 15.0,
            toxin_cooldown: 4.0,
            corpse_energy_fraction: 0.6,

            mating_energy_fraction: 0.7,
            call_duration: 1.5,
            response_duration: 1.5,
            mutation_sigma: 0.07,
            child_spawn_jitter: 30.0,
            child_energy_min: 0.7,
            child_energy_max: 0.9,
            call_range_per_vision: 3.5,
            mate_search_vision_factor: 0.8,
            abandon_drive_factor: 0.5,

            species: SpeciesTable::default(),
        }
    }
}

fn is_fraction(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

fn all_non_negative(values: &[f32]) -> bool {
    values.iter().all(|value| value.is_finite() && *value >= 0.0)
}

impl SimConfig {
    /// Width of the world as a float, for position math.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.world_width as f32
    }

    /// Height of the world as a float, for position math.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.world_height as f32
    }

    /// Uniform point inside the world, `spawn_margin` away from the edges.
    /// Collapses to the center line on an axis too small for the margin.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        let margin = self.spawn_margin;
        let width = self.width();
        let height = self.height();
        let x = if width > 2.0 * margin {
            rng.random_range(margin..width - margin)
        } else {
            width * 0.5
        };
        let y = if height > 2.0 * margin {
            rng.random_range(margin..height - margin)
        } else {
            height * 0.5
        };
        Position::new(x, y)
    }

    /// Validates the configuration, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world_width == 0 || self.world_height == 0 {
            return Err(ConfigError::Invalid("world dimensions must be non-zero"));
        }
        if self.scent_cell_size == 0 {
            return Err(ConfigError::Invalid("scent_cell_size must be non-zero"));
        }
        if self.world_width % self.scent_cell_size != 0
            || self.world_height % self.scent_cell_size != 0
        {
            return Err(ConfigError::Invalid(
                "world dimensions must be divisible by scent_cell_size",
            ));
        }
        if !(0.0..=0.25).contains(&self.scent_diffuse_rate)
            || !is_fraction(self.scent_decay_rate)
            || !is_fraction(self.scent_decay_rate * self.corpse_decay_factor)
        {
            return Err(ConfigError::Invalid(
                "scent decay must be in [0, 1] and diffusion in [0, 0.25]",
            ));
        }
        if !(self.scent_update_interval.is_finite() && self.scent_update_interval > 0.0)
            || !(self.agent_scent_interval.is_finite() && self.agent_scent_interval > 0.0)
        {
            return Err(ConfigError::Invalid("scent intervals must be positive"));
        }
        if !([self.base_radius, self.base_speed, self.energy_base_max]
            .into_iter()
            .all(|value| value.is_finite() && value > 0.0))
        {
            return Err(ConfigError::Invalid(
                "base radius, speed and energy capacity must be positive",
            ));
        }
        if !all_non_negative(&[
            self.idle_energy_cost,
            self.move_energy_cost,
            self.pickup_distance,
            self.drop_distance,
            self.delivery_reward,
            self.gather_noise,
            self.mate_drive_rate,
            self.mate_drive_cap,
            self.predation_gain,
            self.digest_time,
            self.decomposer_speed,
            self.food_unit_energy,
            self.excretion_scatter,
            self.toxin_cooldown,
            self.call_duration,
            self.response_duration,
            self.mutation_sigma,
            self.child_spawn_jitter,
            self.call_range_per_vision,
            self.mate_search_vision_factor,
            self.spawn_margin,
            self.scent_emit_gain,
            self.food_scent_strength,
            self.corpse_scent_strength,
        ]) {
            return Err(ConfigError::Invalid(
                "costs, distances, rates and durations must be non-negative",
            ));
        }
        if ![
            self.decomposer_fraction,
            self.carry_slowdown,
            self.low_energy_fraction,
            self.low_energy_speed_floor,
            self.starvation_fraction,
            self.decomposer_satiation_fraction,
            self.predation_instant_fraction,
            self.hibernation_fraction,
            self.hibernation_speed_factor,
            self.hibernation_metabolism_decay,
            self.predator_hunger_fraction,
            self.predator_food_reward_factor,
            self.predator_satiation_fraction,
            self.decomposer_bite_fraction,
            self.decomposer_absorb_fraction,
            self.min_food_fraction,
            self.corpse_energy_fraction,
            self.mating_energy_fraction,
            self.abandon_drive_factor,
        ]
        .into_iter()
        .all(is_fraction)
        {
            return Err(ConfigError::Invalid("fractions must lie in [0, 1]"));
        }
        if !(is_fraction(self.child_energy_min)
            && is_fraction(self.child_energy_max)
            && self.child_energy_min <= self.child_energy_max)
        {
            return Err(ConfigError::Invalid(
                "child energy range must satisfy 0 <= min <= max <= 1",
            ));
        }
        if self.food_unit_energy <= 0.0 {
            return Err(ConfigError::Invalid("food_unit_energy must be positive"));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("history_capacity must be positive"));
        }
        for tuning in [
            &self.species.forager,
            &self.species.predator,
            &self.species.decomposer,
        ] {
            if !all_non_negative(&[
                tuning.call_range_factor,
                tuning.call_cooldown,
                tuning.abandon_timeout,
                tuning.mate_distance_factor,
            ]) || !is_fraction(tuning.mating_cost)
            {
                return Err(ConfigError::Invalid(
                    "species tuning must be non-negative with mating_cost in [0, 1]",
                ));
            }
        }
        Ok(())
    }
}
