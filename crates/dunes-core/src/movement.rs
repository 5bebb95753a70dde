//! Steering primitives and position integration.

use rand::Rng;

use crate::agent::Agent;
use crate::config::SimConfig;
use crate::nest::NestGateway;
use crate::species::Species;
use crate::{Position, Velocity};

const HEADING_KEEP: f32 = 0.9;
const HEADING_TURN: f32 = 0.1;

/// Blends the heading 90/10 with `direction` and renormalizes.
#[must_use]
pub fn steer_along(velocity: Velocity, direction: Velocity) -> Velocity {
    let direction = direction.normalized();
    let blended = Velocity::new(
        HEADING_KEEP * velocity.vx + HEADING_TURN * direction.vx,
        HEADING_KEEP * velocity.vy + HEADING_TURN * direction.vy,
    )
    .normalized();
    if blended == Velocity::default() {
        velocity
    } else {
        blended
    }
}

/// Turns the heading toward `target`.
#[must_use]
pub fn steer_toward(velocity: Velocity, from: Position, target: Position) -> Velocity {
    steer_along(velocity, Velocity::new(target.x - from.x, target.y - from.y))
}

/// Turns the heading directly away from `threat`.
#[must_use]
pub fn steer_away(velocity: Velocity, from: Position, threat: Position) -> Velocity {
    steer_along(velocity, Velocity::new(from.x - threat.x, from.y - threat.y))
}

/// Random walk: rotates the heading by up to one radian whenever the timer lapses.
pub fn wander<R: Rng + ?Sized>(agent: &mut Agent, dt: f32, rng: &mut R) {
    if agent.velocity.length() <= f32::EPSILON {
        agent.velocity = Velocity::from_angle(rng.random_range(0.0..std::f32::consts::TAU));
    }
    agent.wander_timer -= dt;
    if agent.wander_timer <= 0.0 {
        agent.wander_timer = rng.random_range(0.4..=1.2);
        let angle = rng.random_range(-1.0..=1.0);
        agent.velocity = agent.velocity.rotated(angle).normalized();
    }
}

/// Current speed after species, carrying, low-energy and hibernation modifiers.
#[must_use]
pub fn effective_speed(agent: &Agent, config: &SimConfig) -> f32 {
    let mut speed = match agent.species {
        Species::Decomposer => config.decomposer_speed,
        _ => agent.base_speed,
    };
    if agent.carrying {
        speed *= config.carry_slowdown;
    }
    let threshold = config.low_energy_fraction * agent.energy_max;
    if threshold > 0.0 && agent.energy < threshold {
        let floor = config.low_energy_speed_floor;
        speed *= floor + (1.0 - floor) * (agent.energy / threshold);
    }
    if agent.hibernating {
        speed *= config.hibernation_speed_factor;
    }
    speed
}

/// Advances the agent one step: nest collision first, then boundary reflection.
pub fn integrate(agent: &mut Agent, dt: f32, config: &SimConfig, nests: &dyn NestGateway) {
    let step = effective_speed(agent, config) * dt;
    let proposed = agent
        .position
        .offset(agent.velocity.vx * step, agent.velocity.vy * step);
    let corrected = nests.check_wall_collision(agent, proposed.x, proposed.y);
    let (x, y, bounced) = reflect(corrected, &mut agent.velocity, config);
    agent.position = Position::new(x, y);
    if bounced {
        agent.velocity = agent.velocity.normalized();
    }
}

fn reflect(position: Position, velocity: &mut Velocity, config: &SimConfig) -> (f32, f32, bool) {
    let width = config.width();
    let height = config.height();
    let mut bounced = false;
    let mut x = position.x;
    let mut y = position.y;
    if x < 0.0 || x > width {
        velocity.vx = -velocity.vx;
        x = x.clamp(0.0, width);
        bounced = true;
    }
    if y < 0.0 || y > height {
        velocity.vy = -velocity.vy;
        y = y.clamp(0.0, height);
        bounced = true;
    }
    (x, y, bounced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Genome;
    use crate::nest::{NoNests, Zone};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    /// Refuses any point with `x > 500`.
    struct Fence;

    impl NestGateway for Fence {
        fn get_nest(&self, _agent: &Agent) -> Option<Zone> {
            None
        }
        fn can_enter(&self, _agent: &Agent, _zone: &Zone) -> bool {
            false
        }
        fn is_safe_zone(&self, _a: &Agent, _b: &Agent) -> bool {
            false
        }
        fn check_wall_collision(&self, _agent: &Agent, x: f32, y: f32) -> Position {
            Position::new(x.min(500.0), y)
        }
        fn zones(&self) -> &[Zone] {
            &[]
        }
    }

    fn agent_at(x: f32, y: f32) -> Agent {
        Agent::new(Genome::default(), Position::new(x, y), &SimConfig::default())
    }

    #[test]
    fn steering_blends_ninety_ten() {
        let v = steer_toward(
            Velocity::new(1.0, 0.0),
            Position::new(0.0, 0.0),
            Position::new(0.0, 10.0),
        );
        let expected = Velocity::new(0.9, 0.1).normalized();
        assert!((v.vx - expected.vx).abs() < 1e-6);
        assert!((v.vy - expected.vy).abs() < 1e-6);

        let same = steer_toward(Velocity::new(0.0, 1.0), Position::default(), Position::default());
        assert_eq!(same, Velocity::new(0.0, 1.0));

        let away = steer_away(Velocity::default(), Position::new(5.0, 0.0), Position::default());
        assert!((away.vx - 1.0).abs() < 1e-6);
    }

    #[test]
    fn boundary_reflects_and_clamps() {
        let config = SimConfig::default();
        let mut agent = agent_at(1.0, 400.0);
        agent.velocity = Velocity::new(-1.0, 0.0);
        integrate(&mut agent, 1.0, &config, &NoNests);
        assert_eq!(agent.position.x, 0.0);
        assert!((agent.velocity.vx - 1.0).abs() < 1e-6);

        let mut corner = agent_at(1_199.0, 799.0);
        corner.velocity = Velocity::new(1.0, 1.0).normalized();
        integrate(&mut corner, 1.0, &config, &NoNests);
        assert_eq!(corner.position, Position::new(1_200.0, 800.0));
        assert!(corner.velocity.vx < 0.0 && corner.velocity.vy < 0.0);
        assert!((corner.velocity.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn nest_collision_applies_before_boundary() {
        let config = SimConfig::default();
        let mut agent = agent_at(495.0, 100.0);
        agent.velocity = Velocity::new(1.0, 0.0);
        integrate(&mut agent, 1.0, &config, &Fence);
        assert_eq!(agent.position.x, 500.0);
    }

    #[test]
    fn speed_modifiers_stack() {
        let config = SimConfig::default();
        let mut agent = agent_at(100.0, 100.0);
        let base = effective_speed(&agent, &config);
        assert!((base - 60.0).abs() < 1e-4);

        agent.carrying = true;
        assert!((effective_speed(&agent, &config) - 45.0).abs() < 1e-4);

        agent.carrying = false;
        agent.energy = 0.0;
        assert!((effective_speed(&agent, &config) - 60.0 * 0.65).abs() < 1e-4);

        agent.energy = agent.energy_max;
        agent.hibernating = true;
        assert!((effective_speed(&agent, &config) - 12.0).abs() < 1e-4);

        let decomposer = Agent::new(
            Genome {
                is_decomposer: true,
                speed: 1.5,
                ..Genome::default()
            },
            Position::new(100.0, 100.0),
            &config,
        );
        assert!((effective_speed(&decomposer, &config) - 40.0).abs() < 1e-4);
    }

    #[test]
    fn wander_turns_by_at_most_one_radian() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut agent = agent_at(100.0, 100.0);
        agent.velocity = Velocity::new(1.0, 0.0);
        agent.wander_timer = 0.0;
        wander(&mut agent, 0.016, &mut rng);
        assert!(agent.wander_timer >= 0.4 && agent.wander_timer <= 1.2);
        assert!(agent.velocity.vx >= 1.0_f32.cos() - 1e-5);

        agent.velocity = Velocity::default();
        wander(&mut agent, 0.016, &mut rng);
        assert!((agent.velocity.length() - 1.0).abs() < 1e-5);
    }
}
