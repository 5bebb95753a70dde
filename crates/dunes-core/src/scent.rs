//! Diffusing per-kind scent grids and gradient sensing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::config::SimConfig;
use crate::Velocity;

/// Errors raised by the scent field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScentError {
    /// Grid geometry is unusable.
    #[error("invalid scent geometry: {0}")]
    InvalidGeometry(&'static str),
    /// Diffusion or decay rate out of range.
    #[error("invalid scent rate: {0}")]
    InvalidRate(&'static str),
    /// Scent name that does not map to a channel.
    #[error("unknown scent kind `{0}`")]
    UnknownKind(String),
}

/// Scent channels tracked by the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScentKind {
    Food,
    Predator,
    Prey,
    Toxin,
    Corpse,
}

impl ScentKind {
    pub const ALL: [Self; 5] = [
        Self::Food,
        Self::Predator,
        Self::Prey,
        Self::Toxin,
        Self::Corpse,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Food => 0,
            Self::Predator => 1,
            Self::Prey => 2,
            Self::Toxin => 3,
            Self::Corpse => 4,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Predator => "predator",
            Self::Prey => "prey",
            Self::Toxin => "toxin",
            Self::Corpse => "corpse",
        }
    }
}

impl fmt::Display for ScentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScentKind {
    type Err = ScentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| ScentError::UnknownKind(value.to_owned()))
    }
}

/// Central-difference gradient sampled at one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradient {
    pub dx: f32,
    pub dy: f32,
}

impl Gradient {
    /// Unit heading pointing up the gradient.
    #[must_use]
    pub fn ascent(self) -> Velocity {
        Velocity::new(self.dx, self.dy).normalized()
    }

    /// Unit heading pointing down the gradient.
    #[must_use]
    pub fn descent(self) -> Velocity {
        Velocity::new(-self.dx, -self.dy).normalized()
    }
}

/// Concentration grids, one per [`ScentKind`], with values kept in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StoredScentField")]
pub struct ScentField {
    cols: u32,
    rows: u32,
    cell_size: f32,
    diffuse_rate: f32,
    decay_rate: f32,
    corpse_decay_factor: f32,
    emit_gain: f32,
    layers: Vec<Vec<f32>>,
    #[serde(skip)]
    scratch: Vec<f32>,
}

/// Serialized form of [`ScentField`]; checked and given a fresh scratch buffer on load.
#[derive(Deserialize)]
struct StoredScentField {
    cols: u32,
    rows: u32,
    cell_size: f32,
    diffuse_rate: f32,
    decay_rate: f32,
    corpse_decay_factor: f32,
    emit_gain: f32,
    layers: Vec<Vec<f32>>,
}

impl TryFrom<StoredScentField> for ScentField {
    type Error = ScentError;

    fn try_from(stored: StoredScentField) -> Result<Self, Self::Error> {
        if stored.cols == 0 || stored.rows == 0 {
            return Err(ScentError::InvalidGeometry(
                "world must span at least one cell on each axis",
            ));
        }
        if !(stored.cell_size.is_finite() && stored.cell_size > 0.0) {
            return Err(ScentError::InvalidGeometry("cell size must be positive"));
        }
        if !(0.0..=0.25).contains(&stored.diffuse_rate) {
            return Err(ScentError::InvalidRate("diffusion must lie in [0, 0.25]"));
        }
        if !(0.0..=1.0).contains(&stored.decay_rate)
            || !(0.0..=1.0).contains(&(stored.decay_rate * stored.corpse_decay_factor))
        {
            return Err(ScentError::InvalidRate("decay must lie in [0, 1]"));
        }
        let len = (stored.cols as usize) * (stored.rows as usize);
        if stored.layers.len() != ScentKind::ALL.len()
            || stored.layers.iter().any(|layer| layer.len() != len)
        {
            return Err(ScentError::InvalidGeometry(
                "stored layers do not match the grid dimensions",
            ));
        }
        Ok(Self {
            cols: stored.cols,
            rows: stored.rows,
            cell_size: stored.cell_size,
            diffuse_rate: stored.diffuse_rate,
            decay_rate: stored.decay_rate,
            corpse_decay_factor: stored.corpse_decay_factor,
            emit_gain: stored.emit_gain,
            layers: stored.layers,
            scratch: vec![0.0; len],
        })
    }
}

impl ScentField {
    /// Builds an empty field covering a `width x height` world.
    pub fn new(
        width: u32,
        height: u32,
        cell_size: u32,
        diffuse_rate: f32,
        decay_rate: f32,
    ) -> Result<Self, ScentError> {
        if cell_size == 0 {
            return Err(ScentError::InvalidGeometry("cell size must be non-zero"));
        }
        let cols = width / cell_size;
        let rows = height / cell_size;
        if cols == 0 || rows == 0 {
            return Err(ScentError::InvalidGeometry(
                "world must span at least one cell on each axis",
            ));
        }
        if !(0.0..=0.25).contains(&diffuse_rate) {
            return Err(ScentError::InvalidRate("diffusion must lie in [0, 0.25]"));
        }
        if !(0.0..=1.0).contains(&decay_rate) {
            return Err(ScentError::InvalidRate("decay must lie in [0, 1]"));
        }
        let len = (cols as usize) * (rows as usize);
        Ok(Self {
            cols,
            rows,
            cell_size: cell_size as f32,
            diffuse_rate,
            decay_rate,
            corpse_decay_factor: 0.4,
            emit_gain: 0.9,
            layers: vec![vec![0.0; len]; ScentKind::ALL.len()],
            scratch: vec![0.0; len],
        })
    }

    /// Builds a field from the scent section of a [`SimConfig`].
    pub fn from_config(config: &SimConfig) -> Result<Self, ScentError> {
        let mut field = Self::new(
            config.world_width,
            config.world_height,
            config.scent_cell_size,
            config.scent_diffuse_rate,
            config.scent_decay_rate,
        )?;
        if !(0.0..=1.0).contains(&(config.scent_decay_rate * config.corpse_decay_factor)) {
            return Err(ScentError::InvalidRate("corpse decay must lie in [0, 1]"));
        }
        field.corpse_decay_factor = config.corpse_decay_factor;
        field.emit_gain = config.scent_emit_gain;
        Ok(field)
    }

    #[must_use]
    pub const fn cols(&self) -> u32 {
        self.cols
    }

    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Read-only view of one channel in row-major order.
    #[must_use]
    pub fn layer(&self, kind: ScentKind) -> &[f32] {
        &self.layers[kind.index()]
    }

    /// Sum of every cell in one channel.
    #[must_use]
    pub fn total_mass(&self, kind: ScentKind) -> f32 {
        self.layer(kind).iter().sum()
    }

    fn cell_of(&self, x: f32, y: f32) -> Option<(u32, u32)> {
        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return None;
        }
        let cx = (x / self.cell_size).floor() as u32;
        let cy = (y / self.cell_size).floor() as u32;
        (cx < self.cols && cy < self.rows).then_some((cx, cy))
    }

    #[inline]
    fn offset(&self, cx: u32, cy: u32) -> usize {
        (cy as usize) * (self.cols as usize) + (cx as usize)
    }

    /// Concentration of `kind` at the cell containing `(x, y)`; zero outside the grid.
    #[must_use]
    pub fn concentration(&self, x: f32, y: f32, kind: ScentKind) -> f32 {
        self.cell_of(x, y)
            .map_or(0.0, |(cx, cy)| self.layers[kind.index()][self.offset(cx, cy)])
    }

    /// Deposits `strength * emit_gain` at the cell containing `(x, y)`.
    pub fn emit(&mut self, x: f32, y: f32, kind: ScentKind, strength: f32) {
        let Some((cx, cy)) = self.cell_of(x, y) else {
            return;
        };
        let idx = self.offset(cx, cy);
        let cell = &mut self.layers[kind.index()][idx];
        *cell = (*cell + strength * self.emit_gain).clamp(0.0, 1.0);
    }

    /// Advances every channel by one diffusion and decay step covering `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let cols = self.cols as usize;
        let rows = self.rows as usize;
        for kind in ScentKind::ALL {
            let decay = match kind {
                ScentKind::Corpse => self.decay_rate * self.corpse_decay_factor,
                _ => self.decay_rate,
            };
            let retain = 1.0 - decay;
            let layer = &mut self.layers[kind.index()];
            self.scratch.copy_from_slice(layer);
            if cols >= 3 && rows >= 3 {
                for y in 1..rows - 1 {
                    for x in 1..cols - 1 {
                        let idx = y * cols + x;
                        let center = self.scratch[idx];
                        let neighbours = self.scratch[idx - 1]
                            + self.scratch[idx + 1]
                            + self.scratch[idx - cols]
                            + self.scratch[idx + cols];
                        layer[idx] = center + self.diffuse_rate * (neighbours - 4.0 * center);
                    }
                }
            }
            for cell in layer.iter_mut() {
                *cell = (*cell * retain).clamp(0.0, 1.0);
            }
        }
        trace!(dt, "scent field advanced");
    }

    /// Central-difference gradient at the cell containing `(x, y)`.
    ///
    /// Returns `None` within one cell of the border or on a perfectly flat patch.
    #[must_use]
    pub fn sample_gradient(&self, x: f32, y: f32, kind: ScentKind) -> Option<Gradient> {
        let (cx, cy) = self.cell_of(x, y)?;
        if cx < 1 || cy < 1 || cx + 1 >= self.cols || cy + 1 >= self.rows {
            return None;
        }
        let layer = &self.layers[kind.index()];
        let dx = (layer[self.offset(cx + 1, cy)] - layer[self.offset(cx - 1, cy)]) * 0.5;
        let dy = (layer[self.offset(cx, cy + 1)] - layer[self.offset(cx, cy - 1)]) * 0.5;
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        Some(Gradient { dx, dy })
    }
}
