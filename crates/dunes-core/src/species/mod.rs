//! Species classification and species-specific behavior routines.

mod decomposer;
mod forager;
mod predator;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, TickContext};
use crate::config::SimConfig;
use crate::genome::Genome;
use crate::movement;
use crate::scent::ScentKind;
use crate::senses;
use crate::AgentId;

pub use decomposer::DecomposerRoutine;
pub use forager::ForagerRoutine;
pub use predator::PredatorRoutine;

pub(crate) use forager::forage_cycle;

/// Closed set of species. Chosen once, when the agent is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Forager,
    Predator,
    Decomposer,
}

impl Species {
    /// Decomposer flag wins; otherwise aggression decides predator versus forager.
    #[must_use]
    pub fn classify(genome: &Genome, config: &SimConfig) -> Self {
        if genome.is_decomposer {
            Self::Decomposer
        } else if genome.aggression > config.predator_aggression {
            Self::Predator
        } else {
            Self::Forager
        }
    }

    /// Scent the species leaves behind.
    #[must_use]
    pub const fn scent_kind(self) -> ScentKind {
        match self {
            Self::Predator => ScentKind::Predator,
            Self::Forager | Self::Decomposer => ScentKind::Prey,
        }
    }

    #[must_use]
    pub fn routine(self) -> &'static dyn SpeciesRoutine {
        match self {
            Self::Forager => &ForagerRoutine,
            Self::Predator => &PredatorRoutine,
            Self::Decomposer => &DecomposerRoutine,
        }
    }
}

/// Execution routines selected by the priority engine.
///
/// Routines only steer and act; the caller performs the single movement step.
pub trait SpeciesRoutine: Send + Sync {
    fn escape(&self, agent: &mut Agent, id: AgentId, ctx: &mut TickContext<'_>);
    fn gather(&self, agent: &mut Agent, id: AgentId, ctx: &mut TickContext<'_>);
    fn neutral(&self, agent: &mut Agent, id: AgentId, ctx: &mut TickContext<'_>);
}

/// Turns away from the nearest visible threat, or down the predator-scent gradient.
/// Returns `false` when there was nothing to flee from.
pub(crate) fn flee(agent: &mut Agent, id: AgentId, ctx: &mut TickContext<'_>) -> bool {
    if let Some(threat) = senses::nearest_threat(agent, id, ctx) {
        agent.velocity = movement::steer_away(agent.velocity, agent.position, threat.position);
        return true;
    }
    follow_gradient(agent, ctx, ScentKind::Predator, false)
}

/// Steers up (or down) the gradient of `kind`. Returns `false` on a flat or border cell.
pub(crate) fn follow_gradient(
    agent: &mut Agent,
    ctx: &TickContext<'_>,
    kind: ScentKind,
    ascend: bool,
) -> bool {
    let Some(gradient) = ctx
        .scent
        .sample_gradient(agent.position.x, agent.position.y, kind)
    else {
        return false;
    };
    let direction = if ascend {
        gradient.ascent()
    } else {
        gradient.descent()
    };
    agent.velocity = movement::steer_along(agent.velocity, direction);
    true
}
