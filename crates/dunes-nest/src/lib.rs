//! Static nest-zone geometry for Dunes worlds.
//!
//! [`NestLayout`] owns the circular home zones and answers the membership,
//! access and collision queries the core asks through [`NestGateway`].

use dunes_core::{Agent, NestGateway, NestKind, Position, Species, Zone, ZoneId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gap kept between a pushed-out agent and the zone edge.
const WALL_CLEARANCE: f32 = 0.5;

/// Errors raised while assembling a custom layout.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("zone {0:?} appears more than once")]
    DuplicateZone(ZoneId),
    #[error("zone {id:?} has a non-positive radius {radius}")]
    InvalidRadius { id: ZoneId, radius: f32 },
}

/// Fixed set of home zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestLayout {
    zones: Vec<Zone>,
}

impl NestLayout {
    /// Forager home on the left, predator home on the right, decomposer home near
    /// the bottom edge.
    #[must_use]
    pub fn standard(width: f32, height: f32) -> Self {
        Self {
            zones: vec![
                Zone::new(
                    ZoneId(0),
                    NestKind::Prey,
                    Position::new(width * 0.2, height * 0.5),
                    90.0,
                ),
                Zone::new(
                    ZoneId(1),
                    NestKind::Predator,
                    Position::new(width * 0.8, height * 0.5),
                    90.0,
                ),
                Zone::new(
                    ZoneId(2),
                    NestKind::Decomposer,
                    Position::new(width * 0.5, height * 0.85),
                    70.0,
                ),
            ],
        }
    }

    /// Builds a layout from arbitrary zones. Ids must be unique and radii positive.
    pub fn from_zones(zones: Vec<Zone>) -> Result<Self, LayoutError> {
        for (index, zone) in zones.iter().enumerate() {
            if zone.radius.is_nan() || zone.radius <= 0.0 {
                return Err(LayoutError::InvalidRadius {
                    id: zone.id,
                    radius: zone.radius,
                });
            }
            if zones[..index].iter().any(|other| other.id == zone.id) {
                return Err(LayoutError::DuplicateZone(zone.id));
            }
        }
        Ok(Self { zones })
    }

    #[must_use]
    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.id == id)
    }

    /// Predators are barred from every home but their own.
    #[must_use]
    pub fn admits(species: Species, kind: NestKind) -> bool {
        !(species == Species::Predator && kind != NestKind::Predator)
    }
}

impl NestGateway for NestLayout {
    fn get_nest(&self, agent: &Agent) -> Option<Zone> {
        let home = NestKind::home_of(agent.species);
        self.zones.iter().find(|zone| zone.kind == home).copied()
    }

    fn can_enter(&self, agent: &Agent, zone: &Zone) -> bool {
        Self::admits(agent.species, zone.kind)
    }

    fn is_safe_zone(&self, a: &Agent, b: &Agent) -> bool {
        self.zones.iter().any(|zone| {
            zone.contains(a.position)
                && zone.contains(b.position)
                && self.can_enter(a, zone)
                && self.can_enter(b, zone)
        })
    }

    fn check_wall_collision(&self, agent: &Agent, x: f32, y: f32) -> Position {
        let mut point = Position::new(x, y);
        for zone in self.zones.iter().filter(|zone| !self.can_enter(agent, zone)) {
            let keep_out = zone.radius + agent.radius;
            let distance = zone.center.distance(point);
            if distance >= keep_out {
                continue;
            }
            let (dx, dy) = if distance > f32::EPSILON {
                ((point.x - zone.center.x) / distance, (point.y - zone.center.y) / distance)
            } else {
                let from = agent.position;
                let back = zone.center.distance(from);
                if back > f32::EPSILON {
                    ((from.x - zone.center.x) / back, (from.y - zone.center.y) / back)
                } else {
                    (1.0, 0.0)
                }
            };
            let reach = keep_out + WALL_CLEARANCE;
            point = zone.center.offset(dx * reach, dy * reach);
        }
        point
    }

    fn zones(&self) -> &[Zone] {
        &self.zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dunes_core::{Genome, SimConfig};

    fn agent(aggression: f32, is_decomposer: bool, position: Position) -> Agent {
        Agent::new(
            Genome {
                aggression,
                is_decomposer,
                ..Genome::default()
            },
            position,
            &SimConfig::default(),
        )
    }

    fn layout() -> NestLayout {
        NestLayout::standard(1_200.0, 800.0)
    }

    #[test]
    fn standard_layout_places_three_homes() {
        let layout = layout();
        let zones = layout.zones();
        assert_eq!(zones.len(), 3);
        assert_eq!(zones[0].center, Position::new(240.0, 400.0));
        assert_eq!(zones[1].center, Position::new(960.0, 400.0));
        assert_eq!(zones[2].center, Position::new(600.0, 680.0));
        assert_eq!(zones[2].radius, 70.0);
    }

    #[test]
    fn each_species_gets_its_own_home() {
        let layout = layout();
        let forager = agent(0.2, false, Position::default());
        let predator = agent(0.9, false, Position::default());
        let decomposer = agent(0.9, true, Position::default());
        assert_eq!(layout.get_nest(&forager).map(|z| z.kind), Some(NestKind::Prey));
        assert_eq!(
            layout.get_nest(&predator).map(|z| z.kind),
            Some(NestKind::Predator)
        );
        assert_eq!(
            layout.get_nest(&decomposer).map(|z| z.kind),
            Some(NestKind::Decomposer)
        );
    }

    #[test]
    fn predators_are_kept_out_of_other_homes() {
        let layout = layout();
        let predator = agent(0.9, false, Position::new(240.0, 200.0));
        let forager = agent(0.2, false, Position::new(240.0, 200.0));
        let prey_home = layout.zone(ZoneId(0)).copied().expect("prey zone");
        let decomposer_home = layout.zone(ZoneId(2)).copied().expect("decomposer zone");
        assert!(!layout.can_enter(&predator, &prey_home));
        assert!(!layout.can_enter(&predator, &decomposer_home));
        assert!(layout.can_enter(&forager, &decomposer_home));

        let pushed = layout.check_wall_collision(&predator, 240.0, 330.0);
        let clearance = prey_home.center.distance(pushed);
        assert!((clearance - (90.0 + predator.radius + WALL_CLEARANCE)).abs() < 1e-3);
        assert!(pushed.y < 330.0);

        let free = layout.check_wall_collision(&forager, 240.0, 330.0);
        assert_eq!(free, Position::new(240.0, 330.0));
    }

    #[test]
    fn collision_at_the_exact_center_uses_the_approach_direction() {
        let layout = layout();
        let predator = agent(0.9, false, Position::new(100.0, 400.0));
        let pushed = layout.check_wall_collision(&predator, 240.0, 400.0);
        assert!(pushed.x < 240.0);
        assert!((pushed.y - 400.0).abs() < 1e-3);
    }

    #[test]
    fn safe_zone_requires_shared_admissible_zone() {
        let layout = layout();
        let a = agent(0.2, false, Position::new(240.0, 400.0));
        let b = agent(0.2, false, Position::new(260.0, 410.0));
        assert!(layout.is_safe_zone(&a, &b));

        let intruder = agent(0.9, false, Position::new(250.0, 400.0));
        assert!(!layout.is_safe_zone(&a, &intruder));

        let outside = agent(0.2, false, Position::new(600.0, 100.0));
        assert!(!layout.is_safe_zone(&a, &outside));
        assert!(layout.home_if_inside(&a).is_some());
        assert!(layout.home_if_inside(&outside).is_none());
    }

    #[test]
    fn custom_layouts_are_validated() {
        let zone = Zone::new(ZoneId(4), NestKind::Prey, Position::new(10.0, 10.0), 5.0);
        assert_eq!(
            NestLayout::from_zones(vec![zone, zone]),
            Err(LayoutError::DuplicateZone(ZoneId(4)))
        );
        let flat = Zone { radius: 0.0, ..zone };
        assert!(matches!(
            NestLayout::from_zones(vec![flat]),
            Err(LayoutError::InvalidRadius { .. })
        ));
        let layout = NestLayout::from_zones(vec![zone]).expect("layout");
        assert_eq!(layout.zones().len(), 1);
    }
}
