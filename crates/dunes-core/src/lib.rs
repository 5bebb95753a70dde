//! Core types and simulation engine shared across the Dunes workspace.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

pub mod agent;
pub mod arena;
pub mod config;
pub mod entities;
pub mod genome;
pub mod mating;
pub mod movement;
pub mod nest;
pub mod priority;
pub mod scent;
pub mod senses;
pub mod species;
pub mod world;

pub use agent::{Agent, Courtship, TickContext, TickOutbox};
pub use arena::AgentArena;
pub use config::{ConfigError, SimConfig, SpeciesTable, SpeciesTuning};
pub use entities::{Corpse, Food};
pub use genome::{Genome, GenomeError, Trait, TraitBounds, crossover};
pub use nest::{NestGateway, NestKind, NoNests, Zone, ZoneId};
pub use priority::{Behavior, OverrideOutcome, Priorities, PriorityInputs, select_behavior};
pub use scent::{Gradient, ScentError, ScentField, ScentKind};
pub use species::{Species, SpeciesRoutine};
pub use world::{TickEvents, TickSummary, WorldError, WorldState};

new_key_type! {
    /// Stable handle for agents backed by a generational slot map.
    pub struct AgentId;
    /// Stable handle for food items.
    pub struct FoodId;
    /// Stable handle for corpses.
    pub struct CorpseId;
}

/// High level simulation clock (ticks processed since boot).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the tick counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Point in continuous world space.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Construct a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Squared distance to `other`, for nearest-neighbour comparisons.
    #[must_use]
    pub fn distance_sq(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Arithmetic midpoint between two positions.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::new(f32::midpoint(self.x, other.x), f32::midpoint(self.y, other.y))
    }

    /// Returns this position displaced by `(dx, dy)`.
    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Heading vector. Agents keep it at unit length; zero means "no heading".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    /// Construct a new velocity vector.
    #[must_use]
    pub const fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    /// Unit vector pointing along `angle` radians.
    #[must_use]
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    #[must_use]
    pub fn length(self) -> f32 {
        self.vx.hypot(self.vy)
    }

    /// Unit-length copy, or zero if the vector has no length.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len <= 0.0 || !len.is_finite() {
            return Self::default();
        }
        Self::new(self.vx / len, self.vy / len)
    }

    /// Rotates the vector by `angle` radians.
    #[must_use]
    pub fn rotated(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(self.vx * cos - self.vy * sin, self.vx * sin + self.vy * cos)
    }
}

/// Lineage counter (agents produced by reproduction increment this).
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct Generation(pub u32);

impl Generation {
    /// Advances to the next lineage generation.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_normalizes_and_rotates() {
        let v = Velocity::new(3.0, 4.0).normalized();
        assert!((v.length() - 1.0).abs() < 1e-6);
        assert_eq!(Velocity::default().normalized(), Velocity::default());

        let quarter = Velocity::new(1.0, 0.0).rotated(std::f32::consts::FRAC_PI_2);
        assert!(quarter.vx.abs() < 1e-6);
        assert!((quarter.vy - 1.0).abs() < 1e-6);
    }

    #[test]
    fn position_helpers() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-6);
        assert!((a.distance_sq(b) - 25.0).abs() < 1e-6);
        assert_eq!(a.midpoint(b), Position::new(1.5, 2.0));
        assert_eq!(Generation(3).next(), Generation(4));
        assert_eq!(Tick::zero().next(), Tick(1));
    }
}
