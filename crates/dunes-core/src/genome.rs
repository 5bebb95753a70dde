//! Heritable traits and sexual crossover.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when assembling a genome from loose trait values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenomeError {
    #[error("genome is missing trait `{0}`")]
    MissingTrait(&'static str),
    #[error("trait `{name}` has non-finite value {value}")]
    NonFiniteTrait { name: &'static str, value: f32 },
}

/// Inclusive clamp range applied to a trait after mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraitBounds {
    pub min: f32,
    pub max: f32,
}

impl TraitBounds {
    const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn clamp(self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    #[must_use]
    pub fn contains(self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Numeric traits carried by every genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trait {
    Size,
    Speed,
    Vision,
    Metabolism,
    Aggression,
    Toxin,
}

impl Trait {
    pub const ALL: [Self; 6] = [
        Self::Size,
        Self::Speed,
        Self::Vision,
        Self::Metabolism,
        Self::Aggression,
        Self::Toxin,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Speed => "speed",
            Self::Vision => "vision",
            Self::Metabolism => "metabolism",
            Self::Aggression => "aggression",
            Self::Toxin => "toxin",
        }
    }

    #[must_use]
    pub const fn bounds(self) -> TraitBounds {
        match self {
            Self::Vision => TraitBounds::new(40.0, 160.0),
            Self::Speed | Self::Size => TraitBounds::new(0.5, 1.6),
            Self::Metabolism => TraitBounds::new(0.5, 1.5),
            Self::Aggression => TraitBounds::new(0.0, 1.0),
            Self::Toxin => TraitBounds::new(0.4, 2.0),
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-field genome; every trait is always present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub size: f32,
    pub speed: f32,
    pub vision: f32,
    pub metabolism: f32,
    pub aggression: f32,
    pub toxin: f32,
    pub is_decomposer: bool,
}

impl Default for Genome {
    fn default() -> Self {
        Self {
            size: 1.0,
            speed: 1.0,
            vision: 100.0,
            metabolism: 1.0,
            aggression: 0.3,
            toxin: 1.0,
            is_decomposer: false,
        }
    }
}

impl Genome {
    /// Draws a founder genome for world seeding.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, is_decomposer: bool) -> Self {
        let aggression = rng.random_range(0.0..=1.0);
        let metabolism = if aggression > 0.6 {
            rng.random_range(0.6..=1.4)
        } else {
            rng.random_range(0.8..=1.5)
        };
        Self {
            size: rng.random_range(0.6..=1.6),
            speed: rng.random_range(0.7..=1.4),
            vision: rng.random_range(60.0..=140.0),
            metabolism,
            aggression,
            toxin: rng.random_range(0.6..=1.6),
            is_decomposer,
        }
    }

    /// Builds a genome from named trait values. Unrecognised names are ignored.
    pub fn from_traits<'a, I>(traits: I, is_decomposer: bool) -> Result<Self, GenomeError>
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        let mut values = [None; Trait::ALL.len()];
        for (name, value) in traits {
            if let Some(idx) = Trait::ALL.iter().position(|t| t.name() == name) {
                values[idx] = Some(value);
            }
        }
        let mut genome = Self {
            is_decomposer,
            ..Self::default()
        };
        for (idx, t) in Trait::ALL.into_iter().enumerate() {
            let value = values[idx].ok_or(GenomeError::MissingTrait(t.name()))?;
            if !value.is_finite() {
                return Err(GenomeError::NonFiniteTrait {
                    name: t.name(),
                    value,
                });
            }
            genome.set(t, value);
        }
        Ok(genome)
    }

    #[must_use]
    pub const fn get(&self, t: Trait) -> f32 {
        match t {
            Trait::Size => self.size,
            Trait::Speed => self.speed,
            Trait::Vision => self.vision,
            Trait::Metabolism => self.metabolism,
            Trait::Aggression => self.aggression,
            Trait::Toxin => self.toxin,
        }
    }

    pub fn set(&mut self, t: Trait, value: f32) {
        let slot = match t {
            Trait::Size => &mut self.size,
            Trait::Speed => &mut self.speed,
            Trait::Vision => &mut self.vision,
            Trait::Metabolism => &mut self.metabolism,
            Trait::Aggression => &mut self.aggression,
            Trait::Toxin => &mut self.toxin,
        };
        *slot = value;
    }

    /// Returns a copy with every trait pulled into its bounds.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        for t in Trait::ALL {
            self.set(t, t.bounds().clamp(self.get(t)));
        }
        self
    }
}

/// Standard normal sample scaled by `sigma`, via the Box-Muller transform.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, sigma: f32) -> f32 {
    let u1: f32 = rng.random::<f32>().max(f32::EPSILON);
    let u2: f32 = rng.random::<f32>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
    z * sigma
}

/// Averages two parents trait by trait, adds gaussian noise and clamps.
///
/// The decomposer flag is inherited only when both parents carry it.
pub fn crossover<R: Rng + ?Sized>(a: &Genome, b: &Genome, sigma: f32, rng: &mut R) -> Genome {
    let mut child = Genome {
        is_decomposer: a.is_decomposer && b.is_decomposer,
        ..*a
    };
    for t in Trait::ALL {
        let mean = f32::midpoint(a.get(t), b.get(t));
        child.set(t, t.bounds().clamp(mean + gaussian(rng, sigma)));
    }
    child
}
