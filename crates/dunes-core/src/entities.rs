//! Passive world items: food and corpses.

use serde::{Deserialize, Serialize};

use crate::Position;

/// Food item that creatures pick up or eat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub position: Position,
    pub alive: bool,
    /// Energy stored by decomposer excretion; plain food yields the delivery reward.
    pub energy: Option<f32>,
}

impl Food {
    #[must_use]
    pub const fn new(position: Position) -> Self {
        Self {
            position,
            alive: true,
            energy: None,
        }
    }

    #[must_use]
    pub const fn with_energy(position: Position, energy: f32) -> Self {
        Self {
            position,
            alive: true,
            energy: Some(energy),
        }
    }
}

/// Depletable carcass left by a dead agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corpse {
    pub position: Position,
    pub radius: f32,
    pub max_radius: f32,
    pub energy: f32,
    pub max_energy: f32,
}

impl Corpse {
    #[must_use]
    pub fn new(position: Position, radius: f32, energy: f32) -> Self {
        let energy = energy.max(0.0);
        Self {
            position,
            radius,
            max_radius: radius,
            energy,
            max_energy: energy,
        }
    }

    #[must_use]
    pub fn alive(&self) -> bool {
        self.energy > 0.0
    }

    /// Removes up to `amount` energy and shrinks the radius to match.
    /// Returns the energy actually taken.
    pub fn consume(&mut self, amount: f32) -> f32 {
        let taken = amount.clamp(0.0, self.energy);
        self.energy -= taken;
        if self.energy <= f32::EPSILON {
            self.energy = 0.0;
        }
        self.radius = if self.max_energy > 0.0 {
            self.max_radius * (self.energy / self.max_energy)
        } else {
            0.0
        };
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpse_shrinks_with_energy() {
        let mut corpse = Corpse::new(Position::new(10.0, 10.0), 8.0, 60.0);
        assert!(corpse.alive());
        let mut last_radius = corpse.radius;
        for _ in 0..5 {
            let taken = corpse.consume(15.0);
            assert!(taken <= 15.0);
            assert!(corpse.radius <= last_radius);
            last_radius = corpse.radius;
        }
        assert!(!corpse.alive());
        assert_eq!(corpse.radius, 0.0);
        assert_eq!(corpse.consume(5.0), 0.0);
    }

    #[test]
    fn partial_bite_scales_radius() {
        let mut corpse = Corpse::new(Position::default(), 10.0, 40.0);
        assert_eq!(corpse.consume(10.0), 10.0);
        assert!((corpse.radius - 7.5).abs() < 1e-6);
    }
}
