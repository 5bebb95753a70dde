//! Query interface for the static nest zones.
//!
//! The geometry itself lives outside the core; behavior and movement only ask
//! the questions below.

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::species::Species;
use crate::Position;

/// Stable identifier for a nest zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub u32);

/// Which species a zone is home to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestKind {
    Prey,
    Predator,
    Decomposer,
}

impl NestKind {
    /// Home zone kind for a species.
    #[must_use]
    pub const fn home_of(species: Species) -> Self {
        match species {
            Species::Forager => Self::Prey,
            Species::Predator => Self::Predator,
            Species::Decomposer => Self::Decomposer,
        }
    }
}

/// Circular nest zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub kind: NestKind,
    pub center: Position,
    pub radius: f32,
}

impl Zone {
    #[must_use]
    pub const fn new(id: ZoneId, kind: NestKind, center: Position, radius: f32) -> Self {
        Self {
            id,
            kind,
            center,
            radius,
        }
    }

    /// True when `position` lies inside or on the zone boundary.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.center.distance(position) <= self.radius
    }
}

/// Zone membership, access and collision queries consumed by the core.
pub trait NestGateway: Send + Sync {
    /// Home zone for the agent's species, if the layout has one.
    fn get_nest(&self, agent: &Agent) -> Option<Zone>;

    /// Whether the agent may enter `zone`.
    fn can_enter(&self, agent: &Agent, zone: &Zone) -> bool;

    /// Both agents stand in the same zone and both may enter it.
    fn is_safe_zone(&self, a: &Agent, b: &Agent) -> bool;

    /// Corrects a proposed position so the agent stays out of zones it may not enter.
    fn check_wall_collision(&self, agent: &Agent, x: f32, y: f32) -> Position;

    /// Every zone in the layout.
    fn zones(&self) -> &[Zone];

    /// The agent's home zone when it may enter it and currently stands inside it.
    fn home_if_inside(&self, agent: &Agent) -> Option<Zone> {
        self.get_nest(agent)
            .filter(|zone| self.can_enter(agent, zone) && zone.contains(agent.position))
    }
}

/// Gateway for a world without nests: no homes, no walls, no safe zones.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNests;

impl NestGateway for NoNests {
    fn get_nest(&self, _agent: &Agent) -> Option<Zone> {
        None
    }

    fn can_enter(&self, _agent: &Agent, _zone: &Zone) -> bool {
        true
    }

    fn is_safe_zone(&self, _a: &Agent, _b: &Agent) -> bool {
        false
    }

    fn check_wall_collision(&self, _agent: &Agent, x: f32, y: f32) -> Position {
        Position::new(x, y)
    }

    fn zones(&self) -> &[Zone] {
        &[]
    }
}
