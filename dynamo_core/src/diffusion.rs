//! Gray-Scott reaction-diffusion on a fixed 2-D grid.
//!
//! ```text
//! A' = A + Da·∇²A - A·B² + f·(1 - A)
//! B' = B + Db·∇²B + A·B² - (f + k)·B
//! ```
//!
//! The Laplacian is a 9-point stencil (orthogonal 0.2, diagonal 0.05,
//! centre -1, normalized by 1.2). Only interior cells are updated; the
//! one-cell border keeps whatever value it was given and acts as a frozen
//! boundary. Updates read the current buffers and write the "next" ones,
//! which are swapped in after the whole grid is done.

use crate::event::{EngineKind, PatternEvent, SimulationEvent};
use crate::params::{bounded, lookup, sanitize_named, Engine, ParamError, ParamSpec};
use dynamo_env::{RandomSource, SeededSource};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_WIDTH: usize = 200;
pub const DEFAULT_HEIGHT: usize = 200;

/// Smallest grid that still has an interior cell.
pub const MIN_DIMENSION: usize = 3;

/// B above this counts a cell as active.
pub const ACTIVE_THRESHOLD: f32 = 0.1;

/// Active-cell count that triggers a pattern event.
pub const ACTIVE_REGION_LIMIT: usize = 1000;

/// Peak B that triggers a pattern event.
pub const MAX_B_THRESHOLD: f32 = 0.8;

pub const PATTERN_COOLDOWN_SECS: f64 = 2.0;

/// Circles stamped per `seed_pattern` call.
pub const SEED_CIRCLES: usize = 3;
pub const SEED_RADIUS_MIN: f64 = 5.0;
pub const SEED_RADIUS_SPAN: f64 = 10.0;

const ORTHOGONAL_WEIGHT: f32 = 0.2;
const DIAGONAL_WEIGHT: f32 = 0.05;
const STENCIL_NORMALIZATION: f32 = 1.2;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("feed", 0.0, 0.1, 0.055),
    ParamSpec::new("kill", 0.0, 0.1, 0.062),
    ParamSpec::new("diffusion_a", 0.0, 1.0, 1.0),
    ParamSpec::new("diffusion_b", 0.0, 1.0, 0.5),
    ParamSpec::display("scale", 1.0, 4.0, 2.0),
];

/// Configuration for the reaction-diffusion engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldParams {
    /// Grid width in cells (fixed for the engine's lifetime)
    pub width: usize,
    /// Grid height in cells (fixed for the engine's lifetime)
    pub height: usize,
    /// f
    pub feed_rate: f32,
    /// k
    pub kill_rate: f32,
    /// Da
    pub diffusion_a: f32,
    /// Db
    pub diffusion_b: f32,
    /// Pixels per cell, display only
    pub display_scale: u32,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            feed_rate: 0.055,
            kill_rate: 0.062,
            diffusion_a: 1.0,
            diffusion_b: 0.5,
            display_scale: 2,
        }
    }
}

impl FieldParams {
    /// Default rates on a `width` x `height` grid.
    pub fn with_dimensions(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

/// Summary statistics of the B field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub active_regions: usize,
    pub max_b: f32,
    pub avg_b: f32,
}

/// Two species on a double-buffered grid, indexed `(row = y, column = x)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcentrationField {
    a: DMatrix<f32>,
    b: DMatrix<f32>,
    next_a: DMatrix<f32>,
    next_b: DMatrix<f32>,
}

impl ConcentrationField {
    /// A = 1, B = 0 everywhere.
    pub fn uniform(width: usize, height: usize) -> Self {
        let width = width.max(MIN_DIMENSION);
        let height = height.max(MIN_DIMENSION);
        let a = DMatrix::from_element(height, width, 1.0);
        let b = DMatrix::zeros(height, width);
        Self {
            next_a: a.clone(),
            next_b: b.clone(),
            a,
            b,
        }
    }

    pub fn width(&self) -> usize {
        self.a.ncols()
    }

    pub fn height(&self) -> usize {
        self.a.nrows()
    }

    pub fn a(&self, x: usize, y: usize) -> f32 {
        self.a[(y, x)]
    }

    pub fn b(&self, x: usize, y: usize) -> f32 {
        self.b[(y, x)]
    }

    pub fn a_grid(&self) -> &DMatrix<f32> {
        &self.a
    }

    pub fn b_grid(&self) -> &DMatrix<f32> {
        &self.b
    }

    /// `(A, B)` of every border cell: top and bottom rows, then left and
    /// right columns.
    pub fn border(&self) -> Vec<(f32, f32)> {
        let (w, h) = (self.width(), self.height());
        let mut cells = Vec::with_capacity(2 * (w + h));
        for x in 0..w {
            cells.push((self.a(x, 0), self.b(x, 0)));
            cells.push((self.a(x, h - 1), self.b(x, h - 1)));
        }
        for y in 0..h {
            cells.push((self.a(0, y), self.b(0, y)));
            cells.push((self.a(w - 1, y), self.b(w - 1, y)));
        }
        cells
    }

    /// Writes one cell (clamped to [0, 1]) in both buffers.
    pub fn set_cell(&mut self, x: usize, y: usize, a: f32, b: f32) {
        let a = a.clamp(0.0, 1.0);
        let b = b.clamp(0.0, 1.0);
        self.a[(y, x)] = a;
        self.next_a[(y, x)] = a;
        self.b[(y, x)] = b;
        self.next_b[(y, x)] = b;
    }

    /// Sets A = 0, B = 1 in every cell strictly inside the circle.
    ///
    /// Border cells are stamped too; they are only exempt from `step`.
    pub fn stamp_circle(&mut self, cx: i64, cy: i64, radius: f64) {
        let reach = radius.ceil() as i64;
        let x_hi = (self.width() as i64 - 1).min(cx + reach);
        let y_hi = (self.height() as i64 - 1).min(cy + reach);
        let r2 = radius * radius;

        for y in (cy - reach).max(0)..=y_hi {
            for x in (cx - reach).max(0)..=x_hi {
                let dx = (x - cx) as f64;
                let dy = (y - cy) as f64;
                if dx * dx + dy * dy < r2 {
                    self.set_cell(x as usize, y as usize, 0.0, 1.0);
                }
            }
        }
    }

    /// One explicit Euler step over the interior, then a buffer swap.
    pub fn step(&mut self, params: &FieldParams) {
        let (height, width) = self.a.shape();
        let f = params.feed_rate;
        let k = params.kill_rate;
        let da = params.diffusion_a;
        let db = params.diffusion_b;

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let a = self.a[(y, x)];
                let b = self.b[(y, x)];
                let lap_a = laplacian(&self.a, x, y);
                let lap_b = laplacian(&self.b, x, y);
                let reaction = a * b * b;

                let next_a = a + da * lap_a - reaction + f * (1.0 - a);
                let next_b = b + db * lap_b + reaction - (f + k) * b;

                self.next_a[(y, x)] = next_a.clamp(0.0, 1.0);
                self.next_b[(y, x)] = next_b.clamp(0.0, 1.0);
            }
        }

        std::mem::swap(&mut self.a, &mut self.next_a);
        std::mem::swap(&mut self.b, &mut self.next_b);
    }

    /// Scans the whole grid (border included).
    pub fn stats(&self) -> FieldStats {
        let mut active_regions = 0;
        let mut total = 0.0f32;
        let mut max_b = 0.0f32;

        for &b in self.b.iter() {
            total += b;
            max_b = max_b.max(b);
            if b > ACTIVE_THRESHOLD {
                active_regions += 1;
            }
        }

        FieldStats {
            active_regions,
            max_b,
            avg_b: total / self.b.len() as f32,
        }
    }
}

fn laplacian(grid: &DMatrix<f32>, x: usize, y: usize) -> f32 {
    let center = -grid[(y, x)];
    let sides = grid[(y - 1, x)] + grid[(y + 1, x)] + grid[(y, x - 1)] + grid[(y, x + 1)];
    let corners = grid[(y - 1, x - 1)]
        + grid[(y - 1, x + 1)]
        + grid[(y + 1, x - 1)]
        + grid[(y + 1, x + 1)];
    (sides * ORTHOGONAL_WEIGHT + corners * DIAGONAL_WEIGHT + center) / STENCIL_NORMALIZATION
}

/// The Gray-Scott engine.
pub struct DiffusionEngine<R = SeededSource> {
    params: FieldParams,
    field: ConcentrationField,

    /// Time of the last pattern event
    last_pattern_at: Option<f64>,

    event_count: u64,

    rng: R,
}

impl DiffusionEngine<SeededSource> {
    /// Creates a seeded field from `seed`.
    pub fn new(params: FieldParams, seed: u64) -> Self {
        Self::with_source(params, SeededSource::new(seed))
    }
}

impl<R: RandomSource> DiffusionEngine<R> {
    /// Creates a field with the initial random pattern stamped in.
    pub fn with_source(params: FieldParams, rng: R) -> Self {
        let mut engine = Self::quiescent(params, rng);
        engine.seed_pattern();
        engine
    }

    /// Creates a uniform A = 1, B = 0 field with nothing stamped.
    pub fn quiescent(params: FieldParams, rng: R) -> Self {
        let params = sanitize(params);
        Self {
            field: ConcentrationField::uniform(params.width, params.height),
            params,
            last_pattern_at: None,
            event_count: 0,
            rng,
        }
    }

    /// Stamps `SEED_CIRCLES` randomly placed circles of radius 5-15.
    pub fn seed_pattern(&mut self) {
        let width = self.field.width() as f64;
        let height = self.field.height() as f64;

        for _ in 0..SEED_CIRCLES {
            let cx = (self.rng.next_f64() * width).floor() as i64;
            let cy = (self.rng.next_f64() * height).floor() as i64;
            let radius = SEED_RADIUS_MIN + self.rng.next_f64() * SEED_RADIUS_SPAN;
            self.field.stamp_circle(cx, cy, radius);
        }
    }

    /// Advances the field by one step.
    pub fn step(&mut self) {
        self.field.step(&self.params);
    }

    /// Fires a pattern event when the field is busy enough and the
    /// cool-down has passed.
    pub fn detect_event(&mut self, now: f64) -> Option<SimulationEvent> {
        if self
            .last_pattern_at
            .is_some_and(|t| now - t < PATTERN_COOLDOWN_SECS)
        {
            return None;
        }

        let stats = self.field.stats();
        if stats.active_regions <= ACTIVE_REGION_LIMIT && stats.max_b <= MAX_B_THRESHOLD {
            return None;
        }

        self.last_pattern_at = Some(now);
        self.event_count += 1;

        info!(
            "Pattern Event | Active: {}, Max: {:.3}, Avg: {:.3}",
            stats.active_regions, stats.max_b, stats.avg_b
        );

        Some(SimulationEvent::Pattern(PatternEvent {
            active_regions: stats.active_regions,
            max_b: stats.max_b,
            avg_b: stats.avg_b,
            feed_rate: self.params.feed_rate,
            kill_rate: self.params.kill_rate,
        }))
    }

    /// `step` followed by `detect_event`.
    pub fn tick(&mut self, now: f64) -> Option<SimulationEvent> {
        self.step();
        self.detect_event(now)
    }

    /// Rate setters clamp into the published range; NaN and infinity are ignored.
    pub fn set_feed_rate(&mut self, value: f32) {
        if let Some(value) = bounded(PARAMS, "feed", f64::from(value)) {
            self.params.feed_rate = value as f32;
        }
    }

    pub fn set_kill_rate(&mut self, value: f32) {
        if let Some(value) = bounded(PARAMS, "kill", f64::from(value)) {
            self.params.kill_rate = value as f32;
        }
    }

    pub fn set_diffusion_a(&mut self, value: f32) {
        if let Some(value) = bounded(PARAMS, "diffusion_a", f64::from(value)) {
            self.params.diffusion_a = value as f32;
        }
    }

    pub fn set_diffusion_b(&mut self, value: f32) {
        if let Some(value) = bounded(PARAMS, "diffusion_b", f64::from(value)) {
            self.params.diffusion_b = value as f32;
        }
    }

    /// Display scale, clamped to [1, 4].
    pub fn set_display_scale(&mut self, value: u32) {
        self.params.display_scale = value.clamp(1, 4);
    }

    pub fn field(&self) -> &ConcentrationField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut ConcentrationField {
        &mut self.field
    }

    pub fn params(&self) -> &FieldParams {
        &self.params
    }

    pub fn stats(&self) -> FieldStats {
        self.field.stats()
    }
}

impl<R: RandomSource> Engine for DiffusionEngine<R> {
    fn kind(&self) -> EngineKind {
        EngineKind::Diffusion
    }

    fn reset(&mut self) {
        self.field = ConcentrationField::uniform(self.params.width, self.params.height);
        self.seed_pattern();
        self.event_count = 0;
        self.last_pattern_at = None;
    }

    fn event_count(&self) -> u64 {
        self.event_count
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn parameter(&self, name: &str) -> Result<f64, ParamError> {
        let spec = lookup(PARAMS, name)?;
        Ok(match spec.name {
            "feed" => f64::from(self.params.feed_rate),
            "kill" => f64::from(self.params.kill_rate),
            "diffusion_a" => f64::from(self.params.diffusion_a),
            "diffusion_b" => f64::from(self.params.diffusion_b),
            _ => f64::from(self.params.display_scale),
        })
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<f64, ParamError> {
        let spec = lookup(PARAMS, name)?;
        let mut applied = spec.apply(value)?;
        match spec.name {
            "feed" => self.set_feed_rate(applied as f32),
            "kill" => self.set_kill_rate(applied as f32),
            "diffusion_a" => self.set_diffusion_a(applied as f32),
            "diffusion_b" => self.set_diffusion_b(applied as f32),
            _ => {
                applied = applied.round();
                self.set_display_scale(applied as u32);
            }
        }
        Ok(applied)
    }
}

/// Clamps rates and display scale; non-finite rates take the default.
fn sanitize(mut params: FieldParams) -> FieldParams {
    let clamp = |name: &str, value: f32| sanitize_named(PARAMS, name, f64::from(value)) as f32;
    params.width = params.width.max(MIN_DIMENSION);
    params.height = params.height.max(MIN_DIMENSION);
    params.feed_rate = clamp("feed", params.feed_rate);
    params.kill_rate = clamp("kill", params.kill_rate);
    params.diffusion_a = clamp("diffusion_a", params.diffusion_a);
    params.diffusion_b = clamp("diffusion_b", params.diffusion_b);
    params.display_scale = params.display_scale.clamp(1, 4);
    params
}
